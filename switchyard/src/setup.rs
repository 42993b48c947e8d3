use anyhow::{Context, Result};
use switchyard_config::Config;

/// Validates the configuration before anything is started.
pub fn check_config(config: &Config) -> Result<()> {
    config.validate().context("invalid configuration")?;

    let filters = config.derive_config();
    if filters.test_host_prefix.is_empty() {
        switchyard_log::warn!("test host filter disabled, empty prefix configured");
    }

    Ok(())
}

/// Print spawn infos to the log.
pub fn dump_spawn_infos(config: &Config) {
    match config.path() {
        Some(path) => switchyard_log::info!("launching switchyard from config {}", path.display()),
        None => switchyard_log::info!("launching switchyard without config file"),
    }

    switchyard_log::info!("  release: {}", switchyard_log::RELEASE);

    let kafka = config.kafka();
    switchyard_log::info!("  brokers: {}", kafka.brokers);
    switchyard_log::info!("  topic: {}", kafka.topic);
    switchyard_log::info!("  record format: {:?}", config.record_format());
    switchyard_log::info!("  sink: {} at {}", config.sink_kind(), config.backend());
    if config.dry_run() {
        switchyard_log::info!("  dry run: points are formatted but not sent");
    }
    switchyard_log::info!("  log level: {}", config.logging().level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_names_binary_version() {
        let expected = format!("switchyard@{}", env!("CARGO_PKG_VERSION"));
        assert!(switchyard_log::RELEASE.starts_with(&expected));
    }

    #[test]
    fn test_check_config_rejects_empty_backend() {
        let config = Config::from_yaml_str("sink:\n  backend: \"\"\n").unwrap();
        assert!(check_config(&config).is_err());
    }
}
