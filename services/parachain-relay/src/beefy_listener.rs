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

use beefy_proof_generation::packager::create_message_packages;
use beefy_relayer_types::channel::{AuxiliaryDigestItem, DigestLog};
use beefy_relayer_types::connection::{
    EthereumChain, LogFilter, SubstrateChain,
};
use beefy_relayer_types::contracts::{
    ContractFunction, LatestBeefyBlockCall, NewMmrRootEvent,
};
use beefy_relayer_types::package::{
    DigestItemWithData, MessagePackage, ParaBlockWithProofs,
};
use beefy_relayer_utils::{probe, Error, Result};
use ethers::types::Address;
use futures::StreamExt;
use sp_core::H256;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Follows the light client and turns every commitment of the relay chain
/// blocks it verifies into [`MessagePackage`]s.
///
/// On start it scans back `gap_fill_depth` blocks from the light client's
/// latest verified block. After that it scans forward from a cursor each
/// time the light client accepts a new MMR root, so every block is scanned
/// once, in order.
pub struct BeefyListener<S: ?Sized, E: ?Sized> {
    relaychain: Arc<S>,
    ethereum: Arc<E>,
    light_client: Address,
    gap_fill_depth: u32,
    packages: mpsc::Sender<MessagePackage>,
    token: CancellationToken,
}

impl<S, E> BeefyListener<S, E>
where
    S: SubstrateChain + ?Sized,
    E: EthereumChain + ?Sized,
{
    /// Creates a new listener emitting into `packages`.
    pub fn new(
        relaychain: Arc<S>,
        ethereum: Arc<E>,
        light_client: Address,
        gap_fill_depth: u32,
        packages: mpsc::Sender<MessagePackage>,
        token: CancellationToken,
    ) -> Self {
        Self {
            relaychain,
            ethereum,
            light_client,
            gap_fill_depth,
            packages,
            token,
        }
    }

    /// Runs until cancelled or until the first error.
    ///
    /// The package channel is closed when this returns.
    #[tracing::instrument(skip_all, fields(light_client = %self.light_client))]
    pub async fn run(self) -> Result<()> {
        let result = self.listen().await;
        tracing::info!(
            reason = ?result.as_ref().err(),
            "Shutting down beefy listener"
        );
        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    async fn listen(&self) -> Result<()> {
        let output = self
            .ethereum
            .call(&LatestBeefyBlockCall.to_call(self.light_client))
            .await?;
        let latest = relay_block(LatestBeefyBlockCall::decode_output(&output)?)?;
        let mut cursor = self.gap_fill(latest).await?;

        let mut heads = self.ethereum.subscribe_new_heads().await?;
        loop {
            let head = tokio::select! {
                head = heads.next() => head,
                _ = self.token.cancelled() => return Err(Error::Cancelled),
            };
            let eth_block = head.ok_or(Error::SubscriptionClosed)??;
            let logs = self
                .ethereum
                .filter_logs(LogFilter {
                    address: self.light_client,
                    topic0: NewMmrRootEvent::topic(),
                    from_block: eth_block,
                    to_block: eth_block,
                })
                .await?;
            for log in &logs {
                let event = NewMmrRootEvent::decode_log(log)?;
                let verified = relay_block(event.block_number)?;
                if verified <= cursor {
                    tracing::debug!(
                        block_number = verified,
                        cursor,
                        "Ignoring MMR root at or below the cursor"
                    );
                    continue;
                }
                tracing::info!(
                    block_number = verified,
                    eth_block_number = ?event.eth_block_number,
                    eth_tx_hash = ?event.eth_tx_hash,
                    "Light client verified a new MMR root"
                );
                let at = self.relaychain.block_hash(verified).await?;
                self.scan(cursor + 1, verified, at).await?;
                cursor = verified;
            }
        }
    }

    /// Scans the blocks the light client verified before this process
    /// started. Returns the new cursor.
    async fn gap_fill(&self, latest: u32) -> Result<u32> {
        let from = latest.saturating_sub(self.gap_fill_depth).max(1);
        tracing::info!(from, to = latest, "Starting gap fill");
        if latest > 0 {
            let at = self.relaychain.block_hash(latest).await?;
            self.scan(from, latest, at).await?;
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::BeefyListener,
            gap_fill_done = true,
            cursor = latest,
        );
        Ok(latest)
    }

    /// Packages every commitment in `from..=to`, with MMR proofs generated
    /// at the block `at`.
    async fn scan(&self, from: u32, to: u32, at: H256) -> Result<()> {
        for number in from..=to {
            let Some(block) = self.block_with_proofs(number, at).await? else {
                continue;
            };
            for package in create_message_packages(vec![block]) {
                self.emit(number, package).await?;
            }
        }
        Ok(())
    }

    async fn block_with_proofs(
        &self,
        number: u32,
        at: H256,
    ) -> Result<Option<ParaBlockWithProofs>> {
        let hash = self.relaychain.block_hash(number).await?;
        let header = self.relaychain.header(hash).await?;

        let mut items = Vec::new();
        for log in &header.other_logs {
            match AuxiliaryDigestItem::from_digest_log(log) {
                Ok(DigestLog::Commitment(item)) => items.push(item),
                Ok(DigestLog::Foreign) => {}
                Err(e) => tracing::error!(
                    block_number = number,
                    error = %e,
                    "Skipping malformed commitment digest item"
                ),
            }
        }
        if items.is_empty() {
            tracing::trace!(block_number = number, "No commitments");
            return Ok(None);
        }

        let mut digest_items = Vec::with_capacity(items.len());
        for item in items {
            let data = self
                .relaychain
                .offchain_storage(&item.offchain_key())
                .await?
                .ok_or(Error::MissingCommitment)?;
            digest_items.push(DigestItemWithData {
                digest_item: item,
                data,
            });
        }
        let proof = self.relaychain.generate_mmr_proof(number, at).await?;
        Ok(Some(ParaBlockWithProofs {
            block_number: number,
            header,
            digest_items,
            mmr_proof: proof.leaf_proof,
            mmr_root_hash: proof.root,
        }))
    }

    async fn emit(&self, number: u32, package: MessagePackage) -> Result<()> {
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::BeefyListener,
            block_number = number,
            channel = %package.channel_id,
            commitment_hash = ?package.commitment_hash,
        );
        tokio::select! {
            sent = self.packages.send(package) => {
                sent.map_err(|_| Error::ChannelClosed)
            }
            _ = self.token.cancelled() => Err(Error::Cancelled),
        }
    }
}

fn relay_block(number: u64) -> Result<u32> {
    u32::try_from(number)
        .map_err(|_| Error::Generic("relay chain block number overflows u32"))
}
