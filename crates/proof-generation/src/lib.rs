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

#![deny(unsafe_code)]
//! Pure functions that turn relay chain data into what the Ethereum
//! contracts verify: digest and leaf byte ranges, MMR and validator set
//! Merkle proofs, channel commitment hashes and message packages.

/// Commitment hashes of the outbound channels.
pub mod channel;
/// Splitting of the digest and MMR leaf encodings.
pub mod digest;
/// Message packaging of finalized blocks.
pub mod packager;
/// Simplified MMR proofs.
pub mod simplified;
/// Validator set proofs and bitfields.
pub mod validator;

/// Converts a relay chain hash to its Ethereum counterpart.
pub fn eth_h256(hash: sp_core::H256) -> ethers::types::H256 {
    ethers::types::H256(hash.0)
}

/// Converts an Ethereum hash to its relay chain counterpart.
pub fn sp_h256(hash: ethers::types::H256) -> sp_core::H256 {
    sp_core::H256(hash.0)
}

/// Converts a relay chain U256 to its Ethereum counterpart.
pub fn eth_u256(value: sp_core::U256) -> ethers::types::U256 {
    // SCALE encodes U256 as 32 little endian bytes.
    let bytes = codec::Encode::encode(&value);
    ethers::types::U256::from_little_endian(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_keeps_its_value() {
        let value = sp_core::U256::from(0x1234_5678_9abc_u64) << 100;
        let converted = eth_u256(value);
        assert_eq!(
            converted,
            ethers::types::U256::from(0x1234_5678_9abc_u64) << 100
        );
    }
}
