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

use beefy_proof_generation::channel::{verify_commitment, InboundMessages};
use beefy_proof_generation::simplified::verify_leaf_proof;
use beefy_proof_generation::{eth_h256, packager};
use beefy_relayer_tx_queue::evm::EvmTxDispatcher;
use beefy_relayer_types::channel::ChannelId;
use beefy_relayer_types::connection::{ContractCall, EthereumChain};
use beefy_relayer_types::contracts::{
    ContractFunction, InboundChannelNonceCall, SubmitCall,
};
use beefy_relayer_types::package::MessagePackage;
use beefy_relayer_utils::{probe, Error, Result};
use ethers::types::{Address, U256};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Inbound channel contracts on Ethereum.
#[derive(Debug, Clone, Copy)]
pub struct InboundChannels {
    /// The basic inbound channel.
    pub basic: Address,
    /// The incentivized inbound channel.
    pub incentivized: Address,
}

impl InboundChannels {
    fn address(&self, channel_id: ChannelId) -> Address {
        match channel_id {
            ChannelId::Basic => self.basic,
            ChannelId::Incentivized => self.incentivized,
        }
    }
}

/// Submits message packages to the inbound channel of their commitment.
pub struct EthereumChannelWriter<E: ?Sized> {
    dispatcher: EvmTxDispatcher<E>,
    channels: InboundChannels,
    packages: mpsc::Receiver<MessagePackage>,
    token: CancellationToken,
}

impl<E> EthereumChannelWriter<E>
where
    E: EthereumChain + ?Sized,
{
    /// Creates a new writer reading from `packages`.
    pub fn new(
        dispatcher: EvmTxDispatcher<E>,
        channels: InboundChannels,
        packages: mpsc::Receiver<MessagePackage>,
        token: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            channels,
            packages,
            token,
        }
    }

    /// Runs until the package channel closes, the token is cancelled or a
    /// submission fails.
    ///
    /// On the way out the channel is closed and whatever is buffered is
    /// dropped, so the listener never blocks on a writer that is gone.
    #[tracing::instrument(skip_all)]
    pub async fn run(mut self) -> Result<()> {
        let result = self.write_loop().await;
        self.packages.close();
        let mut dropped = 0;
        while self.packages.try_recv().is_ok() {
            dropped += 1;
        }
        tracing::info!(
            reason = ?result.as_ref().err(),
            dropped,
            "Shutting down ethereum channel writer"
        );
        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    async fn write_loop(&mut self) -> Result<()> {
        loop {
            let package = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Error::Cancelled),
                package = self.packages.recv() => package,
            };
            let Some(package) = package else {
                tracing::debug!("Package channel closed");
                return Ok(());
            };
            self.write_package(&package).await?;
        }
    }

    /// Proves and submits one package.
    ///
    /// A package whose digest or MMR proof does not line up is logged and
    /// skipped. Messages that do not match their commitment, and failed
    /// submissions, are errors.
    pub async fn write_package(&self, package: &MessagePackage) -> Result<()> {
        let messages = verify_commitment(
            package.channel_id,
            package.commitment_hash,
            &package.commitment_data,
        )?;

        let leaf_bytes = match packager::leaf_bytes(package)
            .and_then(|bytes| {
                verify_leaf_proof(&package.mmr_proof, package.mmr_root_hash)
                    .map(|_| bytes)
            }) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    channel = %package.channel_id,
                    commitment_hash = ?package.commitment_hash,
                    error = %e,
                    "Malformed proof, skipping package"
                );
                return Ok(());
            }
        };

        let channel = self.channels.address(package.channel_id);
        let delivered = self.delivered_nonce(channel).await?;
        match messages.last_nonce() {
            Some(last) if last > delivered => {}
            last => {
                tracing::debug!(
                    channel = %package.channel_id,
                    ?last,
                    delivered,
                    "Messages already delivered, skipping package"
                );
                return Ok(());
            }
        }

        let proof = &package.mmr_proof.proof;
        let leaf_index = U256::from(proof.leaf_index);
        let leaf_count = U256::from(proof.leaf_count);
        let items: Vec<_> =
            proof.items.iter().copied().map(eth_h256).collect();
        let count = messages.len();
        let call = match messages {
            InboundMessages::Basic(messages) => submit_call(
                SubmitCall {
                    messages,
                    leaf_bytes,
                    leaf_index,
                    leaf_count,
                    proof: items,
                },
                channel,
            )?,
            InboundMessages::Incentivized(messages) => submit_call(
                SubmitCall {
                    messages,
                    leaf_bytes,
                    leaf_index,
                    leaf_count,
                    proof: items,
                },
                channel,
            )?,
        };

        let tx_hash = self.dispatcher.dispatch(&call).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::ChannelWriter,
            channel = %package.channel_id,
            messages = count,
            %tx_hash,
        );
        Ok(())
    }

    async fn delivered_nonce(&self, channel: Address) -> Result<u64> {
        let output = self
            .dispatcher
            .chain()
            .call(&InboundChannelNonceCall.to_call(channel))
            .await?;
        InboundChannelNonceCall::decode_output(&output)
    }
}

/// Logs the `submit` arguments as JSON and builds the call.
fn submit_call<M>(
    args: SubmitCall<M>,
    channel: Address,
) -> Result<ContractCall>
where
    M: Serialize,
    SubmitCall<M>: ContractFunction,
{
    tracing::debug!(
        input = %serde_json::to_string(&args)?,
        "Submit input"
    );
    Ok(args.to_call(channel))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beefy_relayer_types::channel::{AuxiliaryDigest, AuxiliaryDigestItem};
    use ethers::abi::{self, ParamType};
    use sp_core::H256;

    use super::*;
    use crate::test_utils::*;

    fn channels() -> InboundChannels {
        InboundChannels {
            basic: basic_channel(),
            incentivized: incentivized_channel(),
        }
    }

    fn package_for(
        channel_id: ChannelId,
        (data, hash): (Vec<u8>, H256),
    ) -> MessagePackage {
        let digest = AuxiliaryDigest {
            logs: vec![AuxiliaryDigestItem::Commitment(channel_id, hash)],
        };
        let proof = leaf_proof_for(10, &digest);
        MessagePackage {
            channel_id,
            commitment_hash: hash,
            commitment_data: data,
            digest,
            mmr_proof: proof.leaf_proof,
            mmr_root_hash: proof.root,
        }
    }

    fn package(nonces: &[u64]) -> MessagePackage {
        package_for(ChannelId::Basic, basic_commitment(nonces))
    }

    fn writer(
        ethereum: Arc<MockEthereum>,
    ) -> (EthereumChannelWriter<MockEthereum>, mpsc::Sender<MessagePackage>)
    {
        let (tx, rx) = mpsc::channel(4);
        let writer = EthereumChannelWriter::new(
            EvmTxDispatcher::new(ethereum, None),
            channels(),
            rx,
            CancellationToken::new(),
        );
        (writer, tx)
    }

    fn submitted_messages(call: &ContractCall) -> usize {
        let message = ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Uint(64),
            ParamType::Bytes,
        ]);
        decoded_messages(call, message)
    }

    fn decoded_messages(call: &ContractCall, message: ParamType) -> usize {
        let params = [
            ParamType::Array(Box::new(message)),
            ParamType::Tuple(vec![
                ParamType::Bytes,
                ParamType::Bytes,
                ParamType::Bytes,
            ]),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::FixedBytes(32))),
        ];
        let mut tokens = abi::decode(&params, &call.data[4..]).unwrap();
        tokens.swap_remove(0).into_array().unwrap().len()
    }

    #[tokio::test]
    async fn basic_package_is_submitted_to_the_basic_channel() {
        let ethereum = Arc::new(MockEthereum::default());
        let (writer, tx) = writer(ethereum.clone());
        tx.send(package(&[1])).await.unwrap();
        drop(tx);
        writer.run().await.unwrap();

        let submitted = ethereum.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].to, basic_channel());
        assert_eq!(submitted[0].label, "submit");
        assert_eq!(submitted_messages(&submitted[0]), 1);
    }

    #[tokio::test]
    async fn incentivized_package_is_submitted_to_the_incentivized_channel() {
        let ethereum = Arc::new(MockEthereum::default());
        let (writer, _tx) = writer(ethereum.clone());
        let package = package_for(
            ChannelId::Incentivized,
            incentivized_commitment(&[1, 2]),
        );
        writer.write_package(&package).await.unwrap();

        let submitted = ethereum.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].to, incentivized_channel());
        assert_ne!(submitted[0].to, basic_channel());
        let message = ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Uint(64),
            ParamType::Uint(256),
            ParamType::Bytes,
        ]);
        assert_eq!(decoded_messages(&submitted[0], message), 2);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn leaf_for_another_digest_is_skipped() {
        let ethereum = Arc::new(MockEthereum::default());
        let (writer, _tx) = writer(ethereum.clone());
        let mut package = package(&[1]);
        package.mmr_proof.leaf.digest_hash = H256::repeat_byte(0xdd);
        package.mmr_root_hash = package.mmr_proof.leaf.hash();
        writer.write_package(&package).await.unwrap();
        assert!(ethereum.submitted.lock().is_empty());
        assert!(logs_contain("Malformed proof, skipping package"));
        assert!(logs_contain("Digest hash mismatch"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn wrong_root_is_skipped() {
        let ethereum = Arc::new(MockEthereum::default());
        let (writer, _tx) = writer(ethereum.clone());
        let mut package = package(&[1]);
        package.mmr_root_hash = H256::repeat_byte(0x99);
        writer.write_package(&package).await.unwrap();
        assert!(ethereum.submitted.lock().is_empty());
        assert!(logs_contain("Malformed proof, skipping package"));
    }

    #[tokio::test]
    async fn commitment_mismatch_is_fatal() {
        let ethereum = Arc::new(MockEthereum::default());
        let (writer, _tx) = writer(ethereum);
        let mut package = package(&[1]);
        package.commitment_data = basic_commitment(&[2]).0;
        assert!(matches!(
            writer.write_package(&package).await,
            Err(Error::CommitmentMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn delivered_messages_are_not_resubmitted() {
        let ethereum = Arc::new(MockEthereum {
            inbound_nonce: 3,
            ..Default::default()
        });
        let (writer, _tx) = writer(ethereum.clone());
        writer.write_package(&package(&[2, 3])).await.unwrap();
        assert!(ethereum.submitted.lock().is_empty());
        writer.write_package(&package(&[4])).await.unwrap();
        assert_eq!(ethereum.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_submission_stops_the_writer() {
        let ethereum = Arc::new(MockEthereum {
            fail_submission: true,
            ..Default::default()
        });
        let (writer, tx) = writer(ethereum);
        tx.send(package(&[1])).await.unwrap();
        assert!(matches!(
            writer.run().await,
            Err(Error::TransactionReverted(_))
        ));
        // the receiver is gone, senders notice
        assert!(tx.send(package(&[2])).await.is_err());
    }

    #[tokio::test]
    async fn cancel_drains_buffered_packages() {
        let ethereum = Arc::new(MockEthereum::default());
        let (tx, rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let writer = EthereumChannelWriter::new(
            EvmTxDispatcher::new(ethereum.clone(), None),
            channels(),
            rx,
            token.clone(),
        );
        token.cancel();
        tx.send(package(&[1])).await.unwrap();
        writer.run().await.unwrap();
        assert!(ethereum.submitted.lock().is_empty());
        assert!(tx.is_closed());
    }
}
