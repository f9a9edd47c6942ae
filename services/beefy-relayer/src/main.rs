// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! BEEFY Relayer Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use beefy_relayer_config::cli::{create_store, load_config, setup_logger, Opts};
use beefy_relayer_context::{RelayerContext, TaskGroup};
use beefy_relayer_utils::probe;
use tokio::signal::unix;

/// The main entry point for the relayer.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose, "beefy_relayer")?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;
    // persistent storage for the relayer
    let store = create_store(&args)?;
    let ctx = RelayerContext::new(config, store);

    let mut group = TaskGroup::new(ctx.cancellation_token());
    // this does not block, the relays run on background tasks.
    beefy_relayer::service::ignite(&ctx, &mut group).await?;
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        started = true
    );

    // watch for signals
    let mut ctrlc_signal = unix::signal(unix::SignalKind::interrupt())?;
    let mut termination_signal = unix::signal(unix::SignalKind::terminate())?;
    let mut quit_signal = unix::signal(unix::SignalKind::quit())?;
    let shutdown = || {
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            shutdown = true
        );
        tracing::warn!("Shutting down...");
        ctx.shutdown();
    };
    let wait = group.wait();
    tokio::pin!(wait);
    tokio::select! {
        _ = ctrlc_signal.recv() => {
            tracing::warn!("Interrupted (Ctrl+C) ...");
            shutdown();
        },
        _ = termination_signal.recv() => {
            tracing::warn!("Got Terminate signal ...");
            shutdown();
        },
        _ = quit_signal.recv() => {
            tracing::warn!("Quitting ...");
            shutdown();
        },
        result = &mut wait => {
            // a task failed or every relay stopped on its own
            shutdown();
            result?;
            tracing::info!("Clean Exit ..");
            return Ok(());
        },
    }
    // give the tasks time to observe the cancellation and unwind
    wait.await?;
    tracing::info!("Clean Exit ..");
    Ok(())
}
