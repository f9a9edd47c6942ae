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

use crate::RelayerConfig;
use anyhow::Context;
use beefy_relayer_store::SledStore;
use directories_next::ProjectDirs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Qualifier, organization and application used to find the OS specific
/// config and data directories when `--config-dir` is not given.
pub const PACKAGE_ID: [&str; 3] = ["tools", "webb", "beefy-relayer"];

/// Relays BEEFY commitments and parachain messages to Ethereum.
///
/// $ beefy-relayer -vvv -c ./config/local-devnet
#[derive(StructOpt)]
#[structopt(name = "BEEFY Relayer")]
pub struct Opts {
    /// Log verbosity, repeat for more (-v warn .. -vvvv trace).
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: i32,
    /// Directory holding the `*.toml` / `*.json` config files.
    #[structopt(
        short = "c",
        long = "config-dir",
        value_name = "PATH",
        parse(from_os_str)
    )]
    pub config_dir: Option<PathBuf>,
    /// Keep the commitment store in a temporary directory, removed on exit.
    #[structopt(long)]
    pub tmp: bool,
}

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    let [qualifier, organization, application] = PACKAGE_ID;
    ProjectDirs::from(qualifier, organization, application)
        .context("no home directory to derive the project directories from")
}

/// Loads and validates the configuration in `config_dir`, or in the OS
/// config directory if none is given.
pub fn load_config<P>(config_dir: Option<P>) -> anyhow::Result<RelayerConfig>
where
    P: AsRef<Path>,
{
    let dir = match config_dir {
        Some(dir) => dir.as_ref().to_path_buf(),
        None => project_dirs()?.config_dir().to_path_buf(),
    };
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());
    tracing::trace!(dir = %dir.display(), "Loading config");
    let config = crate::utils::load(&dir)
        .with_context(|| format!("invalid config in {}", dir.display()))?;
    tracing::trace!("Config loaded");
    Ok(config)
}

/// Maps the number of `-v` flags to a log level.
pub fn log_level(verbosity: i32) -> tracing::Level {
    use tracing::Level;
    match verbosity {
        i32::MIN..=0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber.
///
/// `filter` is the crate prefix the level applies to, the binary passes
/// `beefy_relayer`. Everything else follows `RUST_LOG`.
pub fn setup_logger(verbosity: i32, filter: &str) -> anyhow::Result<()> {
    let level = log_level(verbosity);
    let directive = format!("{filter}={level}")
        .parse()
        .context("invalid log directive")?;
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(directive);
    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(level)
        .with_env_filter(env_filter);
    // json lines under integration tests, so the harness can parse probes
    #[cfg(feature = "integration-tests")]
    let builder = builder.json().flatten_event(true).with_current_span(false);
    #[cfg(not(feature = "integration-tests"))]
    let builder = builder.pretty();

    builder.init();
    Ok(())
}

/// Opens the commitment store.
///
/// With `--tmp` the store lives in a temporary directory. Otherwise it is
/// the `store` directory next to the config directory, or under the OS data
/// directory when no config directory was given.
pub fn create_store(opts: &Opts) -> anyhow::Result<SledStore> {
    if opts.tmp {
        tracing::debug!("Using a temporary commitment store");
        return Ok(SledStore::temporary()?);
    }
    let path = match opts.config_dir.as_deref() {
        Some(dir) => dir.parent().unwrap_or(dir).join("store"),
        None => project_dirs()?.data_local_dir().join("store"),
    };
    tracing::debug!(path = %path.display(), "Opening commitment store");
    Ok(SledStore::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0), tracing::Level::ERROR);
        assert_eq!(log_level(2), tracing::Level::INFO);
        assert_eq!(log_level(7), tracing::Level::TRACE);
    }

    #[test]
    fn parses_flags() {
        let opts =
            Opts::from_iter(["beefy-relayer", "-vvv", "-c", "/tmp", "--tmp"]);
        assert_eq!(opts.verbose, 3);
        assert_eq!(opts.config_dir, Some(PathBuf::from("/tmp")));
        assert!(opts.tmp);
    }

    #[test]
    fn missing_config_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_config(Some(&missing)).is_err());
    }
}
