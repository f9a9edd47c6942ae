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
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

use std::fmt;

use url::Url;

/// A transaction hash rendered as a terminal hyperlink to a block explorer.
///
/// Falls back to the plain hash when no explorer is configured.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TxLink<'a> {
    tx_hash: String,
    explorer: Option<&'a Url>,
}

impl<'a> TxLink<'a> {
    /// Create a link for the given hash, using `explorer` as the base URL.
    pub fn new(tx_hash: impl fmt::LowerHex, explorer: Option<&'a Url>) -> Self {
        Self {
            tx_hash: format!("{tx_hash:#x}"),
            explorer,
        }
    }

    fn url(&self) -> Option<String> {
        let base = self.explorer?;
        let mut url = base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push("tx")
            .push(&self.tx_hash);
        Some(url.to_string())
    }
}

impl fmt::Display for TxLink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url() {
            Some(url) => write!(
                f,
                "\u{1b}]8;;{}\u{1b}\\{}\u{1b}]8;;\u{1b}\\",
                url, self.tx_hash
            ),
            None => write!(f, "{}", self.tx_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hash_without_explorer() {
        let link = TxLink::new(ethers::types::H256::repeat_byte(0xab), None);
        assert_eq!(link.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn hyperlink_with_explorer() {
        let explorer = Url::parse("https://etherscan.io/").unwrap();
        let link =
            TxLink::new(ethers::types::H256::zero(), Some(&explorer));
        let hash = format!("0x{}", "00".repeat(32));
        let rendered = link.to_string();
        assert!(rendered
            .contains(&format!("https://etherscan.io/tx/{hash}")));
        assert!(rendered.starts_with("\u{1b}]8;;"));
    }
}
