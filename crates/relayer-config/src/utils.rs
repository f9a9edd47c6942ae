use config::{Config, File};
use std::path::{Path, PathBuf};

use super::*;

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(
    base_dir: P,
) -> beefy_relayer_utils::Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(beefy_relayer_utils::Error::from))
        .collect()
}

/// Try to parse the [`RelayerConfig`] from the given config file(s).
pub fn parse_from_files(
    files: &[PathBuf],
) -> beefy_relayer_utils::Result<RelayerConfig> {
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        let ext = config_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    // also merge in the environment (with a prefix of BEEFY).
    let builder = builder
        .add_source(config::Environment::with_prefix("BEEFY").separator("_"));
    let cfg = builder.build()?;
    let config: Result<
        RelayerConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Load the configuration files and
///
/// Returns `Ok(RelayerConfig)` on success, or `Err(Error)` on failure.
///
/// # Arguments
///
/// * `path` - The path to the configuration directory
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> beefy_relayer_utils::Result<RelayerConfig> {
    parse_from_files(&search_config_files(path)?)
}

/// The postloading_process exists to validate configuration and warn about
/// settings that are legal but likely wrong.
pub fn postloading_process(
    config: RelayerConfig,
) -> beefy_relayer_utils::Result<RelayerConfig> {
    tracing::trace!("Checking configration sanity ...");
    config.verify()?;

    if config.parachain_relay.enabled
        && config.beefy_relay.enabled
        && config.parachain_relay.beefy_light_client
            != config.beefy_relay.beefy_light_client
    {
        tracing::warn!(
            "!!WARNING!!: parachain-relay and beefy-relay point at different light clients ({:?} and {:?})",
            config.parachain_relay.beefy_light_client,
            config.beefy_relay.beefy_light_client,
        );
    }
    if config.parachain_relay.channel_capacity == 0
        || config.beefy_relay.channel_capacity == 0
    {
        return Err(beefy_relayer_utils::Error::Generic(
            "channel-capacity must be greater than zero",
        ));
    }

    tracing::trace!(
        "postloaded config: {}",
        serde_json::to_string_pretty(&config)?
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str =
        "0x8917174396171783496173419137618235192359106130478137647163400318";

    fn write_config(body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), body).unwrap();
        dir
    }

    #[test]
    fn loads_with_defaults() {
        let dir = write_config(&format!(
            r#"
            [ethereum]
            ws-endpoint = "ws://localhost:8546"
            private-key = "{KEY}"

            [relaychain]
            ws-endpoint = "ws://localhost:9944"

            [beefy-relay]
            enabled = true
            beefy-light-client = "0x0000000000000000000000000000000000000001"
            "#
        ));
        let config = load(dir.path()).unwrap();
        assert!(config.beefy_relay.enabled);
        assert!(!config.parachain_relay.enabled);
        assert_eq!(config.beefy_relay.rate_limit(), Duration::from_secs(2));
        assert_eq!(config.beefy_relay.poll_interval(), Duration::from_secs(6));
        assert_eq!(config.parachain_relay.gap_fill_depth, 128);
        assert_eq!(config.ethereum.gas_limit, 0);
    }

    #[test]
    fn rejects_missing_private_key() {
        let dir = write_config(
            r#"
            [ethereum]
            ws-endpoint = "ws://localhost:8546"

            [relaychain]
            ws-endpoint = "ws://localhost:9944"

            [beefy-relay]
            enabled = true
            beefy-light-client = "0x0000000000000000000000000000000000000001"
            "#,
        );
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, beefy_relayer_utils::Error::MissingSecrets));
    }

    #[test]
    fn rejects_enabled_relay_without_contracts() {
        let dir = write_config(&format!(
            r#"
            [ethereum]
            ws-endpoint = "ws://localhost:8546"
            private-key = "{KEY}"

            [relaychain]
            ws-endpoint = "ws://localhost:9944"

            [parachain-relay]
            enabled = true
            beefy-light-client = "0x0000000000000000000000000000000000000001"
            "#
        ));
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn rejects_nothing_enabled() {
        let dir = write_config(&format!(
            r#"
            [ethereum]
            ws-endpoint = "ws://localhost:8546"
            private-key = "{KEY}"

            [relaychain]
            ws-endpoint = "ws://localhost:9944"
            "#
        ));
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let dir = write_config(
            r#"
            [ethereum]
            ws-endpoint = "http://localhost:8546"

            [relaychain]
            ws-endpoint = "ws://localhost:9944"
            "#,
        );
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("ethereum.ws-endpoint"));
    }
}
