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

//! The relay chain hands out MMR proofs as left peaks, the path inside the
//! leaf's own peak and the bagged right peaks. The simplified form is the
//! same hashes as one ordered list, plus a bitmask saying which of them sit
//! on the left, so the root is a plain fold.

use beefy_relayer_types::mmr::MmrLeafProof;
use beefy_relayer_utils::{Error, Result};
use sp_core::hashing::keccak_256;
use sp_core::H256;

/// An MMR proof flattened into a fold order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimplifiedMmrProof {
    /// Sibling hashes, from the leaf up to the root.
    pub items: Vec<H256>,
    /// Bit `i` is set when `items[i]` is the left operand.
    pub order: u64,
}

impl SimplifiedMmrProof {
    /// Folds the proof starting from `leaf_hash`.
    pub fn root(&self, leaf_hash: H256) -> H256 {
        self.items
            .iter()
            .enumerate()
            .fold(leaf_hash, |acc, (i, item)| {
                if self.order >> i & 1 == 1 {
                    merge(item, &acc)
                } else {
                    merge(&acc, item)
                }
            })
    }
}

fn merge(left: &H256, right: &H256) -> H256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_bytes());
    buf[32..].copy_from_slice(right.as_bytes());
    H256(keccak_256(&buf))
}

fn leaf_index_to_pos(index: u64) -> u64 {
    leaf_count_to_mmr_size(index + 1) - u64::from((index + 1).trailing_zeros())
        - 1
}

fn leaf_count_to_mmr_size(leaf_count: u64) -> u64 {
    2 * leaf_count - u64::from(leaf_count.count_ones())
}

fn pos_height_in_tree(pos: u64) -> u32 {
    let all_ones = |n: u64| n != 0 && n.count_zeros() == n.leading_zeros();
    let jump_left = |n: u64| {
        let bit_length = 64 - n.leading_zeros();
        n - ((1 << (bit_length - 1)) - 1)
    };
    let mut pos = pos + 1;
    while !all_ones(pos) {
        pos = jump_left(pos);
    }
    64 - pos.leading_zeros() - 1
}

fn parent_offset(height: u32) -> u64 {
    2 << height
}

fn sibling_offset(height: u32) -> u64 {
    (2 << height) - 1
}

fn left_peak_height_pos(mmr_size: u64) -> (u32, u64) {
    let left_pos = |height: u32| (1u64 << (height + 1)) - 2;
    let mut height = 1;
    let mut prev_pos = 0;
    let mut pos = left_pos(height);
    while pos < mmr_size {
        height += 1;
        prev_pos = pos;
        pos = left_pos(height);
    }
    (height - 1, prev_pos)
}

fn right_peak(
    mut height: u32,
    mut pos: u64,
    mmr_size: u64,
) -> Option<(u32, u64)> {
    pos += sibling_offset(height);
    while pos > mmr_size - 1 {
        if height == 0 {
            return None;
        }
        pos -= parent_offset(height - 1);
        height -= 1;
    }
    Some((height, pos))
}

/// Peak positions of an MMR of `mmr_size` nodes, left to right.
fn peaks(mmr_size: u64) -> Vec<u64> {
    if mmr_size == 0 {
        return Vec::new();
    }
    let (mut height, mut pos) = left_peak_height_pos(mmr_size);
    let mut peaks = vec![pos];
    while height > 0 {
        match right_peak(height, pos, mmr_size) {
            Some((h, p)) => {
                height = h;
                pos = p;
                peaks.push(pos);
            }
            None => break,
        }
    }
    peaks
}

/// Converts a relay chain MMR proof of the leaf at `leaf_index` into its
/// simplified form.
pub fn simplify(
    leaf_index: u64,
    leaf_count: u64,
    items: &[H256],
) -> Result<SimplifiedMmrProof> {
    if leaf_index >= leaf_count {
        return Err(Error::InvalidProof);
    }
    let leaf_pos = leaf_index_to_pos(leaf_index);
    let peaks = peaks(leaf_count_to_mmr_size(leaf_count));
    let own_peak = peaks
        .iter()
        .copied()
        .find(|peak| *peak >= leaf_pos)
        .ok_or(Error::InvalidProof)?;
    let left_peaks = peaks.iter().filter(|p| **p < own_peak).count();
    let has_right_peaks = peaks.iter().any(|p| *p > own_peak);
    let path_len = pos_height_in_tree(own_peak) as usize;
    if items.len() != left_peaks + path_len + usize::from(has_right_peaks) {
        return Err(Error::InvalidProof);
    }

    let mut simplified = SimplifiedMmrProof::default();
    let mut push = |item: H256, on_left: bool| {
        if on_left {
            simplified.order |= 1 << simplified.items.len();
        }
        simplified.items.push(item);
    };

    // the path inside the leaf's peak comes right after the left peaks
    let mut pos = leaf_pos;
    let mut height = 0;
    for sibling in &items[left_peaks..left_peaks + path_len] {
        let is_right_child = pos_height_in_tree(pos + 1) > height;
        push(*sibling, is_right_child);
        pos = if is_right_child {
            pos + 1
        } else {
            pos + parent_offset(height)
        };
        height += 1;
    }
    if has_right_peaks {
        push(items[left_peaks + path_len], true);
    }
    for peak in items[..left_peaks].iter().rev() {
        push(*peak, false);
    }
    Ok(simplified)
}

/// Checks that `leaf_proof` proves its leaf against `root`.
pub fn verify_leaf_proof(
    leaf_proof: &MmrLeafProof,
    root: H256,
) -> Result<SimplifiedMmrProof> {
    let proof = &leaf_proof.proof;
    let simplified = simplify(proof.leaf_index, proof.leaf_count, &proof.items)?;
    let computed = simplified.root(leaf_proof.leaf.hash());
    if computed != root {
        tracing::warn!(
            leaf_index = proof.leaf_index,
            leaf_count = proof.leaf_count,
            ?computed,
            expected = ?root,
            "MMR proof does not rebuild the root"
        );
        return Err(Error::InvalidProof);
    }
    Ok(simplified)
}
