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

use serde::{Deserialize, Serialize};

/// A websocket endpoint, wrapping [`url::Url`].
///
/// Both chain connections of the relayer are subscription based, so only
/// `ws` and `wss` schemes are accepted. The value may also name an env var
/// with a `$` prefix.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct WsUrl(url::Url);

impl WsUrl {
    /// Returns the inner [`url::Url`].
    pub fn as_url(&self) -> &url::Url {
        &self.0
    }

    fn check_scheme(url: url::Url) -> Result<Self, String> {
        match url.scheme() {
            "ws" | "wss" => Ok(Self(url)),
            other => Err(format!(
                "expected a ws:// or wss:// endpoint, got {other}://"
            )),
        }
    }
}

impl std::fmt::Display for WsUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials are never printed.
        write!(f, "{}://", self.0.scheme())?;
        if let Some(host) = self.0.host_str() {
            write!(f, "{host}")?;
        }
        if let Some(port) = self.0.port_or_known_default() {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.0.path())
    }
}

impl std::fmt::Debug for WsUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::str::FromStr for WsUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = url::Url::parse(s).map_err(|e| format!("{e:?}"))?;
        Self::check_scheme(url)
    }
}

impl From<WsUrl> for url::Url {
    fn from(ws_url: WsUrl) -> Self {
        ws_url.0
    }
}

impl std::ops::Deref for WsUrl {
    type Target = url::Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for WsUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct WsUrlVistor;
        impl<'de> serde::de::Visitor<'de> for WsUrlVistor {
            type Value = WsUrl;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "ws url string or an env var containing a ws url string in it",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Some(var) = value.strip_prefix('$') {
                    tracing::trace!("Reading {} from env", var);
                    let val = std::env::var(var).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "error while loading this env {var}: {e}",
                        ))
                    })?;
                    val.parse().map_err(serde::de::Error::custom)
                } else {
                    value.parse().map_err(serde::de::Error::custom)
                }
            }
        }

        deserializer.deserialize_str(WsUrlVistor)
    }
}
