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

//! Payloads and extrinsic building blocks for the parachain writer.

use codec::Encode;
use sp_core::hashing::{blake2_128, twox_128};
use sp_core::H256;
use sp_runtime::generic::Era;

/// A source chain header ready for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderData {
    /// An Ethereum header with its ethash proof.
    Ethereum(EthereumHeader),
}

/// An Ethereum header in the light client pallet's encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthereumHeader {
    /// Block hash.
    pub hash: H256,
    /// Block number.
    pub number: u64,
    /// SCALE encoded header, passed through as the call argument.
    pub data: Vec<u8>,
    /// SCALE encoded proof, passed through as the call argument.
    pub proof: Vec<u8>,
}

impl HeaderData {
    /// Hash of the header, used to confirm the import.
    pub fn hash(&self) -> H256 {
        match self {
            HeaderData::Ethereum(header) => header.hash,
        }
    }

    /// Number of the header.
    pub fn number(&self) -> u64 {
        match self {
            HeaderData::Ethereum(header) => header.number,
        }
    }
}

/// A verified Ethereum log that must be dispatched on the parachain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEthereumMessage {
    /// Pallet of the dispatch call.
    pub pallet: String,
    /// Name of the dispatch call.
    pub call: String,
    /// SCALE encoded arguments, without the chain id.
    pub args: Vec<u8>,
}

/// What the parachain writer receives for every Ethereum block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParachainPayload {
    /// The header to import.
    pub header: HeaderData,
    /// Messages proven against that header.
    pub messages: Vec<OutboundEthereumMessage>,
}

/// Arguments of a runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgs {
    /// Arguments, already SCALE encoded in order.
    Encoded(Vec<u8>),
    /// Inner calls of a batch.
    Calls(Vec<RuntimeCall>),
}

/// A runtime call named by pallet and function, resolved against the
/// runtime metadata by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCall {
    /// Pallet name, e.g. `EthereumLightClient`.
    pub pallet: String,
    /// Call name, e.g. `import_header`.
    pub name: String,
    /// Call arguments.
    pub args: CallArgs,
}

impl RuntimeCall {
    /// `EthereumLightClient.import_header(chain_id, header, proof)`.
    pub fn import_header(chain_id: u64, header: &HeaderData) -> Self {
        let HeaderData::Ethereum(eth) = header;
        let mut args = chain_id.encode();
        args.extend_from_slice(&eth.data);
        args.extend_from_slice(&eth.proof);
        Self {
            pallet: "EthereumLightClient".into(),
            name: "import_header".into(),
            args: CallArgs::Encoded(args),
        }
    }

    /// The dispatch call of `message`, with `chain_id` as first argument.
    pub fn submit_message(
        chain_id: u64,
        message: &OutboundEthereumMessage,
    ) -> Self {
        let mut args = chain_id.encode();
        args.extend_from_slice(&message.args);
        Self {
            pallet: message.pallet.clone(),
            name: message.call.clone(),
            args: CallArgs::Encoded(args),
        }
    }

    /// `Utility.batch_all(calls)`.
    pub fn batch_all(calls: Vec<RuntimeCall>) -> Self {
        Self {
            pallet: "Utility".into(),
            name: "batch_all".into(),
            args: CallArgs::Calls(calls),
        }
    }
}

/// Everything besides the call that goes into a signed extrinsic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    /// Block the mortality is anchored at.
    pub block_hash: H256,
    /// Genesis hash of the chain.
    pub genesis_hash: H256,
    /// Mortality.
    pub era: Era,
    /// Account nonce.
    pub nonce: u32,
    /// Runtime spec version.
    pub spec_version: u32,
    /// Runtime transaction version.
    pub transaction_version: u32,
    /// Tip.
    pub tip: u128,
}

/// Storage keys read by the relayer.
pub mod storage {
    use super::*;

    fn prefix(pallet: &str, item: &str) -> Vec<u8> {
        let mut key = twox_128(pallet.as_bytes()).to_vec();
        key.extend_from_slice(&twox_128(item.as_bytes()));
        key
    }

    fn blake2_128_concat(key: &mut Vec<u8>, data: &[u8]) {
        key.extend_from_slice(&blake2_128(data));
        key.extend_from_slice(data);
    }

    /// `System.Account(account_id)`.
    pub fn system_account(account_id: &[u8; 32]) -> Vec<u8> {
        let mut key = prefix("System", "Account");
        blake2_128_concat(&mut key, account_id);
        key
    }

    /// `EthereumLightClient.Headers(chain_id, hash)`, where the chain id is
    /// keyed by its little endian bytes.
    pub fn imported_header(chain_id: u64, hash: H256) -> Vec<u8> {
        let mut key = prefix("EthereumLightClient", "Headers");
        blake2_128_concat(&mut key, &chain_id.to_le_bytes());
        blake2_128_concat(&mut key, hash.as_bytes());
        key
    }
}
