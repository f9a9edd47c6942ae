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

use beefy_relayer_types::beefy::{
    BeefyRelayInfo, BeefySignature, Commitment, SignedCommitment,
};
use beefy_relayer_types::connection::{ContractCall, EthereumChain, LogFilter};
use beefy_relayer_types::contracts::{
    ContractFunction, CreateInitialBitfieldCall, CreateRandomBitfieldCall,
};
use beefy_relayer_types::mmr::MmrLeafProof;
use beefy_relayer_utils::{Error, Result};
use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, Log, H256 as TxHash, U256};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use sp_core::H256;

/// Light client answering both bitfield calls with fixed words.
#[derive(Default)]
pub struct MockLightClient {
    pub initial_bitfield: Vec<U256>,
    pub random_bitfield: Vec<U256>,
    pub fail_submission: bool,
    pub submitted: Mutex<Vec<ContractCall>>,
}

fn encode_bitfield(words: &[U256]) -> Bytes {
    let words = words.iter().copied().map(Token::Uint).collect();
    abi::encode(&[Token::Array(words)]).into()
}

#[async_trait::async_trait]
impl EthereumChain for MockLightClient {
    async fn chain_id(&self) -> Result<u64> {
        Ok(15)
    }

    async fn subscribe_new_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<u64>>> {
        Ok(stream::pending().boxed())
    }

    async fn filter_logs(&self, _filter: LogFilter) -> Result<Vec<Log>> {
        Ok(vec![])
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes> {
        if call.label == CreateInitialBitfieldCall::NAME {
            Ok(encode_bitfield(&self.initial_bitfield))
        } else if call.label == CreateRandomBitfieldCall::NAME {
            Ok(encode_bitfield(&self.random_bitfield))
        } else {
            Ok(Bytes::default())
        }
    }

    async fn estimate_gas(&self, _call: &ContractCall) -> Result<U256> {
        Ok(U256::from(500_000))
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash> {
        if self.fail_submission {
            return Err(Error::TransactionReverted("0x02".into()));
        }
        let mut submitted = self.submitted.lock();
        submitted.push(call.clone());
        Ok(TxHash::from_low_u64_be(submitted.len() as u64))
    }
}

pub fn light_client() -> Address {
    Address::repeat_byte(0xbe)
}

/// Three validators, the first and the last signed.
pub fn witnessed(block_number: u32) -> BeefyRelayInfo {
    let signed = SignedCommitment {
        commitment: Commitment {
            payload: H256::repeat_byte(block_number as u8),
            block_number,
            validator_set_id: 2,
        },
        signatures: vec![
            Some(BeefySignature([1; 65])),
            None,
            Some(BeefySignature([3; 65])),
        ],
    };
    let mut info = BeefyRelayInfo::witnessed(
        signed,
        (1..=3).map(Address::repeat_byte).collect(),
    );
    info.mmr_leaf_proof = Some(MmrLeafProof::default());
    info
}
