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

//! The inbound channels do not receive the digest or the MMR leaf. They
//! receive the bytes around the hashes they already know, and rebuild both
//! encodings on chain.

use beefy_relayer_types::channel::AuxiliaryDigest;
use beefy_relayer_types::contracts::LeafBytes;
use beefy_relayer_types::mmr::MmrLeaf;
use beefy_relayer_utils::{Error, Result};
use codec::Encode;
use sp_core::H256;

/// Splits `encoded_digest` into the bytes before and after
/// `commitment_hash`.
///
/// The hash has to occur exactly once, otherwise the split is ambiguous.
pub fn split_digest(
    encoded_digest: &[u8],
    commitment_hash: H256,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let needle = commitment_hash.as_bytes();
    let positions: Vec<usize> = encoded_digest
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(i, _)| i)
        .collect();
    match positions.as_slice() {
        [at] => Ok((
            encoded_digest[..*at].to_vec(),
            encoded_digest[at + needle.len()..].to_vec(),
        )),
        other => Err(Error::DigestSplit {
            occurrences: other.len(),
        }),
    }
}

/// Strips the trailing digest hash from `encoded_leaf`.
pub fn split_leaf(encoded_leaf: &[u8], digest_hash: H256) -> Result<Vec<u8>> {
    encoded_leaf
        .strip_suffix(digest_hash.as_bytes())
        .map(<[u8]>::to_vec)
        .ok_or(Error::InvalidLeaf)
}

/// Checks that `leaf` commits to `digest`.
pub fn check_digest_hash(
    digest: &AuxiliaryDigest,
    leaf: &MmrLeaf,
) -> Result<()> {
    let computed = digest.hash();
    if computed != leaf.digest_hash {
        return Err(Error::DigestHashMismatch {
            expected: leaf.digest_hash,
            computed,
        });
    }
    Ok(())
}

/// Builds the digest and leaf byte ranges for `commitment_hash`.
pub fn build_leaf_bytes(
    digest: &AuxiliaryDigest,
    commitment_hash: H256,
    leaf: &MmrLeaf,
) -> Result<LeafBytes> {
    let (digest_prefix, digest_suffix) =
        split_digest(&digest.encode(), commitment_hash)?;
    let leaf_prefix = split_leaf(&leaf.encode(), leaf.digest_hash)?;
    tracing::trace!(
        prefix_len = digest_prefix.len(),
        suffix_len = digest_suffix.len(),
        leaf_prefix_len = leaf_prefix.len(),
        "Split digest and leaf"
    );
    Ok(LeafBytes {
        digest_prefix: digest_prefix.into(),
        digest_suffix: digest_suffix.into(),
        leaf_prefix: leaf_prefix.into(),
    })
}

#[cfg(test)]
mod tests {
    use beefy_relayer_types::channel::{AuxiliaryDigestItem, ChannelId};

    use super::*;

    fn digest() -> AuxiliaryDigest {
        AuxiliaryDigest {
            logs: vec![
                AuxiliaryDigestItem::Commitment(
                    ChannelId::Basic,
                    H256::repeat_byte(0xaa),
                ),
                AuxiliaryDigestItem::Commitment(
                    ChannelId::Incentivized,
                    H256::repeat_byte(0xbb),
                ),
            ],
        }
    }

    #[test]
    fn digest_split_rebuilds_the_encoding() {
        let digest = digest();
        let encoded = digest.encode();
        for hash in [H256::repeat_byte(0xaa), H256::repeat_byte(0xbb)] {
            let (prefix, suffix) = split_digest(&encoded, hash).unwrap();
            let rebuilt = [prefix, hash.as_bytes().to_vec(), suffix].concat();
            assert_eq!(rebuilt, encoded);
        }
    }

    #[test]
    fn digest_split_needs_exactly_one_match() {
        let encoded = digest().encode();
        assert!(matches!(
            split_digest(&encoded, H256::repeat_byte(0xcc)),
            Err(Error::DigestSplit { occurrences: 0 })
        ));

        let twice = AuxiliaryDigest {
            logs: vec![
                AuxiliaryDigestItem::Commitment(
                    ChannelId::Basic,
                    H256::repeat_byte(0xaa),
                ),
                AuxiliaryDigestItem::Commitment(
                    ChannelId::Incentivized,
                    H256::repeat_byte(0xaa),
                ),
            ],
        };
        assert!(matches!(
            split_digest(&twice.encode(), H256::repeat_byte(0xaa)),
            Err(Error::DigestSplit { occurrences: 2 })
        ));
    }

    #[test]
    fn leaf_split_strips_the_digest_hash() {
        let leaf = MmrLeaf {
            digest_hash: H256::repeat_byte(5),
            ..Default::default()
        };
        let encoded = leaf.encode();
        let prefix = split_leaf(&encoded, leaf.digest_hash).unwrap();
        assert_eq!(prefix.len(), encoded.len() - 32);
        assert_eq!(
            [prefix, leaf.digest_hash.as_bytes().to_vec()].concat(),
            encoded
        );
    }

    #[test]
    fn leaf_split_fails_without_trailing_hash() {
        let leaf = MmrLeaf {
            digest_hash: H256::repeat_byte(5),
            ..Default::default()
        };
        assert!(matches!(
            split_leaf(&leaf.encode(), H256::repeat_byte(6)),
            Err(Error::InvalidLeaf)
        ));
    }

    #[test]
    fn leaf_must_commit_to_the_digest() {
        let digest = digest();
        let mut leaf = MmrLeaf {
            digest_hash: digest.hash(),
            ..Default::default()
        };
        check_digest_hash(&digest, &leaf).unwrap();

        // a digest rebuilt without one of its items
        let partial = AuxiliaryDigest {
            logs: digest.logs[..1].to_vec(),
        };
        assert!(matches!(
            check_digest_hash(&partial, &leaf),
            Err(Error::DigestHashMismatch { .. })
        ));
        leaf.digest_hash = H256::zero();
        assert!(check_digest_hash(&digest, &leaf).is_err());
    }

    #[test]
    fn leaf_bytes_for_a_commitment() {
        let leaf = MmrLeaf {
            digest_hash: H256::repeat_byte(5),
            ..Default::default()
        };
        let bytes =
            build_leaf_bytes(&digest(), H256::repeat_byte(0xbb), &leaf)
                .unwrap();
        // vec length, then the first item (1 + 1 + 32), then the
        // second item's variant and channel.
        assert_eq!(bytes.digest_prefix.len(), 1 + 34 + 2);
        assert!(bytes.digest_suffix.is_empty());
        assert_eq!(bytes.leaf_prefix.len(), leaf.encode().len() - 32);
    }
}
