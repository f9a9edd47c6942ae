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

use beefy_relayer_types::beefy::{BeefyRelayInfo, BeefySignature};
use beefy_relayer_types::contracts::ValidatorProof;
use beefy_relayer_utils::{Error, Result};
use ethers::types::{Address, Bytes, H256, U256};
use sp_runtime::traits::Keccak256;

/// The signature with its recovery id moved into Ethereum's `27/28` range.
pub fn eth_signature(signature: &BeefySignature) -> Bytes {
    let mut bytes = signature.0;
    if bytes[64] < 27 {
        bytes[64] += 27;
    }
    Bytes::from(bytes.to_vec())
}

/// Merkle proof of the address at `position` in the validator set tree.
///
/// Leaves are the keccak hashes of the 20 address bytes.
pub fn validator_merkle_proof(
    addresses: &[Address],
    position: usize,
) -> Result<Vec<H256>> {
    if position >= addresses.len() {
        return Err(Error::ValidatorNotFound(position));
    }
    let leaves = addresses.iter().map(|a| a.as_bytes().to_vec());
    let proof = binary_merkle_tree::merkle_proof::<Keccak256, _, _>(
        leaves,
        position as u32,
    );
    Ok(proof.proof.into_iter().map(crate::eth_h256).collect())
}

/// Root of the validator set tree.
pub fn validator_set_root(addresses: &[Address]) -> H256 {
    let leaves = addresses.iter().map(|a| a.as_bytes().to_vec());
    crate::eth_h256(binary_merkle_tree::merkle_root::<Keccak256, _>(leaves))
}

/// Positions set in `bitfield`, lowest first. Bit `i` of word `w` is
/// position `w * 256 + i`.
pub fn set_bits(bitfield: &[U256]) -> Vec<usize> {
    bitfield
        .iter()
        .enumerate()
        .flat_map(|(w, word)| {
            (0..256)
                .filter(move |i| word.bit(*i))
                .map(move |i| w * 256 + i)
        })
        .collect()
}

/// The `bitsToSet` argument of `createInitialBitfield`.
pub fn bits_to_set(positions: &[usize]) -> Vec<U256> {
    positions.iter().map(|p| U256::from(*p)).collect()
}

/// Renders `bitfield` as a string of `0` and `1`, position 0 first.
pub fn bitfield_to_string(bitfield: &[U256]) -> String {
    bitfield
        .iter()
        .flat_map(|word| (0..256).map(move |i| word.bit(i)))
        .map(|bit| if bit { '1' } else { '0' })
        .collect()
}

/// Collects the signatures, addresses and proofs of the validators picked
/// by `random_bitfield`.
pub fn build_validator_proof(
    info: &BeefyRelayInfo,
    random_bitfield: &[U256],
) -> Result<ValidatorProof> {
    let signatures = &info.signed_commitment.signatures;
    let addresses = &info.validator_addresses;
    let mut proof = ValidatorProof::default();
    for position in set_bits(random_bitfield) {
        let signature = signatures
            .get(position)
            .and_then(Option::as_ref)
            .ok_or(Error::MissingSignature(position))?;
        let address = addresses
            .get(position)
            .copied()
            .ok_or(Error::ValidatorNotFound(position))?;
        proof.signatures.push(eth_signature(signature));
        proof.positions.push(U256::from(position));
        proof.public_keys.push(address);
        proof
            .public_key_merkle_proofs
            .push(validator_merkle_proof(addresses, position)?);
    }
    Ok(proof)
}
