// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Tangle.  If not, see <http://www.gnu.org/licenses/>.

use std::sync::Arc;

use beefy_relayer_tx_queue::substrate::ExtrinsicSender;
use beefy_relayer_types::connection::{
    ExtrinsicPool, ExtrinsicSigner, OnFinalized, SubstrateChain,
};
use beefy_relayer_types::parachain::{storage, ParachainPayload, RuntimeCall};
use beefy_relayer_utils::{probe, Error, Result};
use futures::FutureExt;
use sp_core::H256;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Imports Ethereum headers into the parachain and delivers the messages
/// proven against them.
///
/// Payloads are handled strictly one after the other. The header import
/// of a payload is confirmed against chain storage before its messages are
/// sent.
pub struct ParachainWriter<S: ?Sized, G: ?Sized, P: ?Sized> {
    chain: Arc<S>,
    sender: ExtrinsicSender<S, G, P>,
    chain_id: u64,
    payloads: mpsc::Receiver<ParachainPayload>,
    token: CancellationToken,
}

impl<S, G, P> ParachainWriter<S, G, P>
where
    S: SubstrateChain + ?Sized + 'static,
    G: ExtrinsicSigner + ?Sized,
    P: ExtrinsicPool + ?Sized,
{
    /// Reads the account nonce and genesis hash, and creates the writer.
    ///
    /// `chain_id` is the id of the Ethereum network the headers come from.
    pub async fn new(
        chain: Arc<S>,
        signer: Arc<G>,
        pool: Arc<P>,
        chain_id: u64,
        payloads: mpsc::Receiver<ParachainPayload>,
        token: CancellationToken,
    ) -> Result<Self> {
        let sender = ExtrinsicSender::new(chain.clone(), signer, pool).await?;
        Ok(Self {
            chain,
            sender,
            chain_id,
            payloads,
            token,
        })
    }

    /// Runs until the payload channel closes, the token is cancelled or a
    /// submission fails.
    #[tracing::instrument(skip_all, fields(chain_id = self.chain_id))]
    pub async fn run(mut self) -> Result<()> {
        let result = self.write_loop().await;
        tracing::info!(
            reason = ?result.as_ref().err(),
            "Shutting down parachain writer"
        );
        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    async fn write_loop(&mut self) -> Result<()> {
        loop {
            let payload = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Error::Cancelled),
                payload = self.payloads.recv() => payload,
            };
            let Some(payload) = payload else {
                tracing::debug!("Payload channel closed");
                return Ok(());
            };
            let block_number = payload.header.number();
            let message_count = payload.messages.len();
            if let Err(e) = self.write_payload(&payload).await {
                tracing::error!(
                    block_number,
                    message_count,
                    error = %e,
                    "Failure submitting header and messages to the parachain"
                );
                return Err(e);
            }
            tracing::info!(
                block_number,
                message_count,
                "Submitted header and messages to the parachain"
            );
        }
    }

    /// Imports the payload's header, then sends its messages as one batch.
    pub async fn write_payload(
        &mut self,
        payload: &ParachainPayload,
    ) -> Result<()> {
        let import = RuntimeCall::import_header(self.chain_id, &payload.header);
        let confirm = self.confirm_import(payload.header.hash());
        self.sender.submit(&import, confirm).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::ParachainWriter,
            block_number = payload.header.number(),
            imported = true,
        );

        if payload.messages.is_empty() {
            return Ok(());
        }
        let calls = payload
            .messages
            .iter()
            .map(|m| RuntimeCall::submit_message(self.chain_id, m))
            .collect();
        let no_check: OnFinalized = Box::new(|_| async { Ok(()) }.boxed());
        self.sender
            .submit(&RuntimeCall::batch_all(calls), no_check)
            .await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::ParachainWriter,
            block_number = payload.header.number(),
            messages = payload.messages.len(),
        );
        Ok(())
    }

    /// A finality check that the header `hash` is now in the light client's
    /// storage.
    fn confirm_import(&self, hash: H256) -> OnFinalized {
        let chain = self.chain.clone();
        let key = storage::imported_header(self.chain_id, hash);
        Box::new(move |block_hash| {
            async move {
                match chain.storage(&key).await? {
                    Some(_) => Ok(()),
                    None => {
                        tracing::error!(
                            header = ?hash,
                            finalized_in = ?block_hash,
                            "Cannot find header after import"
                        );
                        Err(Error::HeaderNotImported { hash })
                    }
                }
            }
            .boxed()
        })
    }
}
