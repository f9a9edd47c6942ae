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

use beefy_relayer_types::contracts::LeafBytes;
use beefy_relayer_types::package::{MessagePackage, ParaBlockWithProofs};
use beefy_relayer_utils::Result;

/// One package per commitment, in block order and then digest order.
pub fn create_message_packages(
    blocks: Vec<ParaBlockWithProofs>,
) -> Vec<MessagePackage> {
    let mut packages = Vec::new();
    for block in blocks {
        let digest = block.digest();
        tracing::trace!(
            block_number = block.block_number,
            commitments = block.digest_items.len(),
            "Packaging block"
        );
        for item in block.digest_items {
            packages.push(MessagePackage {
                channel_id: item.digest_item.channel_id(),
                commitment_hash: item.digest_item.commitment_hash(),
                commitment_data: item.data,
                digest: digest.clone(),
                mmr_proof: block.mmr_proof.clone(),
                mmr_root_hash: block.mmr_root_hash,
            });
        }
    }
    packages
}

/// The digest and leaf byte ranges of `package`, once its leaf is known
/// to commit to its digest.
pub fn leaf_bytes(package: &MessagePackage) -> Result<LeafBytes> {
    crate::digest::check_digest_hash(&package.digest, &package.mmr_proof.leaf)?;
    crate::digest::build_leaf_bytes(
        &package.digest,
        package.commitment_hash,
        &package.mmr_proof.leaf,
    )
}

#[cfg(test)]
mod tests {
    use beefy_relayer_types::channel::{AuxiliaryDigestItem, ChannelId};
    use beefy_relayer_types::connection::BlockHeader;
    use beefy_relayer_types::mmr::MmrLeafProof;
    use beefy_relayer_types::package::DigestItemWithData;
    use sp_core::H256;

    use super::*;

    fn block(number: u32, items: &[(ChannelId, u8)]) -> ParaBlockWithProofs {
        ParaBlockWithProofs {
            block_number: number,
            header: BlockHeader {
                parent_hash: H256::zero(),
                number,
                other_logs: vec![],
            },
            digest_items: items
                .iter()
                .map(|(channel, byte)| DigestItemWithData {
                    digest_item: AuxiliaryDigestItem::Commitment(
                        *channel,
                        H256::repeat_byte(*byte),
                    ),
                    data: vec![*byte],
                })
                .collect(),
            mmr_proof: MmrLeafProof::default(),
            mmr_root_hash: H256::repeat_byte(number as u8),
        }
    }

    #[test]
    fn one_package_per_digest_item_in_order() {
        let blocks = vec![
            block(5, &[(ChannelId::Basic, 1), (ChannelId::Incentivized, 2)]),
            block(6, &[(ChannelId::Basic, 3)]),
        ];
        let packages = create_message_packages(blocks);
        let hashes: Vec<H256> =
            packages.iter().map(|p| p.commitment_hash).collect();
        assert_eq!(
            hashes,
            vec![
                H256::repeat_byte(1),
                H256::repeat_byte(2),
                H256::repeat_byte(3)
            ]
        );
        assert_eq!(packages[1].channel_id, ChannelId::Incentivized);
        assert_eq!(packages[1].commitment_data, vec![2]);
        assert_eq!(packages[0].digest.logs.len(), 2);
        assert_eq!(packages[0].digest, packages[1].digest);
        assert_eq!(packages[2].mmr_root_hash, H256::repeat_byte(6));
    }

    #[test]
    fn no_blocks_no_packages() {
        assert!(create_message_packages(Vec::new()).is_empty());
    }
}
