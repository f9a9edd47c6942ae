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

use std::sync::Arc;

use beefy_relayer_types::connection::{
    ExtrinsicPool, ExtrinsicSigner, OnFinalized, SubstrateChain,
};
use beefy_relayer_types::parachain::{RuntimeCall, SigningParams};
use beefy_relayer_utils::probe;
use sp_core::H256;
use sp_runtime::generic::Era;

use super::MORTAL_PERIOD;

/// Signs and submits extrinsics of one account, one at a time.
///
/// The account nonce is read once when the sender is created and then
/// only advanced locally, after each successful submission. Owning the
/// sender mutably is what serializes submissions.
pub struct ExtrinsicSender<S: ?Sized, G: ?Sized, P: ?Sized> {
    chain: Arc<S>,
    signer: Arc<G>,
    pool: Arc<P>,
    genesis_hash: H256,
    nonce: u32,
}

impl<S, G, P> ExtrinsicSender<S, G, P>
where
    S: SubstrateChain + ?Sized,
    G: ExtrinsicSigner + ?Sized,
    P: ExtrinsicPool + ?Sized,
{
    /// Reads the account nonce and genesis hash, and creates the sender.
    pub async fn new(
        chain: Arc<S>,
        signer: Arc<G>,
        pool: Arc<P>,
    ) -> beefy_relayer_utils::Result<Self> {
        let nonce = chain.account_nonce(&signer.account_id()).await?;
        let genesis_hash = chain.block_hash(0).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxQueue,
            ty = "SUBSTRATE",
            starting = true,
            nonce,
            ?genesis_hash,
        );
        Ok(Self {
            chain,
            signer,
            pool,
            genesis_hash,
            nonce,
        })
    }

    /// The nonce the next extrinsic will be signed with.
    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// The chain this sender submits to.
    pub fn chain(&self) -> &S {
        &self.chain
    }

    async fn signing_params(
        &self,
    ) -> beefy_relayer_utils::Result<SigningParams> {
        let block_hash = self.chain.finalized_head_hash().await?;
        let block = self.chain.block(block_hash).await?;
        let version = self.chain.runtime_version().await?;
        Ok(SigningParams {
            block_hash,
            genesis_hash: self.genesis_hash,
            era: Era::mortal(MORTAL_PERIOD, u64::from(block.header.number)),
            nonce: self.nonce,
            spec_version: version.spec_version,
            transaction_version: version.transaction_version,
            tip: 0,
        })
    }

    /// Signs `call`, submits it and waits until it is finalized and
    /// `on_finalized` has run.
    #[tracing::instrument(
        skip_all,
        fields(call = %format!("{}.{}", call.pallet, call.name), nonce = self.nonce)
    )]
    pub async fn submit(
        &mut self,
        call: &RuntimeCall,
        on_finalized: OnFinalized,
    ) -> beefy_relayer_utils::Result<()> {
        let params = self.signing_params().await?;
        let extrinsic = self.signer.sign(call, &params).map_err(|e| {
            tracing::error!(nonce = self.nonce, error = %e, "Signing failed");
            e
        })?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxQueue,
            ty = "SUBSTRATE",
            pallet = %call.pallet,
            call = %call.name,
            nonce = self.nonce,
            pending = true,
        );
        if let Err(e) = self.pool.submit_and_wait(extrinsic, on_finalized).await
        {
            tracing::error!(
                nonce = self.nonce,
                error = %e,
                "Extrinsic submission failed"
            );
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::TxQueue,
                ty = "SUBSTRATE",
                nonce = self.nonce,
                errored = true,
                error = %e,
            );
            return Err(e);
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxQueue,
            ty = "SUBSTRATE",
            nonce = self.nonce,
            finalized = true,
        );
        self.nonce += 1;
        Ok(())
    }
}
