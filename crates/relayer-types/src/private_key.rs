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

use std::process::Command;
use std::str::FromStr;

use ethers::types::H256;
use serde::Deserialize;

/// PrivateKey represents the Ethereum signing key of the relayer.
///
/// It deserializes from one of:
/// * a `0x` prefixed hex string,
/// * `$NAME`, the hex string is read from the `NAME` env var,
/// * `> command`, the hex string is the trimmed stdout of `command`.
#[derive(Clone)]
pub struct PrivateKey(H256);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").finish()
    }
}

impl From<H256> for PrivateKey {
    fn from(secret: H256) -> Self {
        PrivateKey(secret)
    }
}

impl std::ops::Deref for PrivateKey {
    type Target = H256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn parse_hex<E: serde::de::Error>(value: &str) -> Result<H256, E> {
    H256::from_str(value).map_err(|e| {
        E::custom(format!(
            "{e}\n expected a 66 chars string (including the 0x prefix) but found {} chars",
            value.len()
        ))
    })
}

fn run_command<E: serde::de::Error>(command: &str) -> Result<String, E> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| E::custom("empty private key command"))?;
    tracing::trace!("Reading private key from command {}", program);
    let output = Command::new(program).args(parts).output().map_err(|e| {
        E::custom(format!("error while running {program}: {e}"))
    })?;
    if !output.status.success() {
        return Err(E::custom(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    String::from_utf8(output.stdout)
        .map(|s| s.trim().to_owned())
        .map_err(|e| E::custom(format!("{program} output is not utf8: {e}")))
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PrivateKeyVistor;
        impl<'de> serde::de::Visitor<'de> for PrivateKeyVistor {
            type Value = H256;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "hex string, an env var or a command producing a hex string",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value.starts_with("0x") {
                    parse_hex(value)
                } else if let Some(var) = value.strip_prefix('$') {
                    tracing::trace!("Reading {} from env", var);
                    let val = std::env::var(var).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "error while loading this env {var}: {e}",
                        ))
                    })?;
                    parse_hex(val.trim())
                } else if let Some(command) = value.strip_prefix('>') {
                    let val = run_command(command.trim())?;
                    parse_hex(&val)
                } else {
                    Err(serde::de::Error::custom(
                        "private key must start with 0x, $ or >",
                    ))
                }
            }
        }

        let secret = deserializer.deserialize_str(PrivateKeyVistor)?;
        Ok(Self(secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        key: PrivateKey,
    }

    const KEY: &str =
        "0x8917174396171783496173419137618235192359106130478137647163400318";

    #[test]
    fn parses_hex_key() {
        let holder: Holder =
            serde_json::from_str(&format!(r#"{{"key":"{KEY}"}}"#)).unwrap();
        assert_eq!(*holder.key, H256::from_str(KEY).unwrap());
    }

    #[test]
    fn parses_key_from_env() {
        std::env::set_var("BEEFY_TEST_PRIVATE_KEY", KEY);
        let holder: Holder =
            serde_json::from_str(r#"{"key":"$BEEFY_TEST_PRIVATE_KEY"}"#)
                .unwrap();
        assert_eq!(*holder.key, H256::from_str(KEY).unwrap());
    }

    #[test]
    fn parses_key_from_command() {
        let holder: Holder =
            serde_json::from_str(&format!(r#"{{"key":"> echo {KEY}"}}"#))
                .unwrap();
        assert_eq!(*holder.key, H256::from_str(KEY).unwrap());
    }

    #[test]
    fn rejects_unknown_format() {
        let res = serde_json::from_str::<Holder>(r#"{"key":"abandon"}"#);
        assert!(res.is_err());
    }
}
