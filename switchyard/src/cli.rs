use anyhow::{Context, Result};
use clap::ArgMatches;
use switchyard_config::{Config, OverridableConfig, extract_config_env_vars};

use crate::cliapp::make_app;
use crate::setup;

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let app = make_app();
    let matches = app.get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    config.apply_override(extract_config_env_vars())?;

    if let Some(matches) = matches.subcommand_matches("run") {
        config.apply_override(extract_config_args(matches))?;
        switchyard_log::init(config.logging());
        setup::check_config(&config)?;
        run(config)
    } else if let Some(matches) = matches.subcommand_matches("config") {
        manage_config(&config, matches)
    } else {
        unreachable!();
    }
}

/// Extracts overrides from the arguments of the `run` subcommand.
///
/// Flags that are not given leave the configured values untouched.
pub fn extract_config_args(matches: &ArgMatches) -> OverridableConfig {
    let value = |name: &str| matches.get_one::<String>(name).cloned();
    let flag = |name: &str| matches.get_flag(name).then(|| "true".to_owned());

    OverridableConfig {
        dry_run: flag("dry_run"),
        echo: flag("echo"),
        enrich: flag("enrich"),
        group_base: value("group"),
        brokers: value("brokers"),
        topic: value("topic"),
        sink: value("sink"),
        backend: value("backend"),
        database: value("database"),
        record_format: value("format"),
        ..Default::default()
    }
}

pub fn manage_config(config: &Config, matches: &ArgMatches) -> Result<()> {
    if matches.subcommand_matches("show").is_some() {
        let yaml = config
            .to_yaml_string()
            .context("failed to serialize the configuration")?;

        #[allow(clippy::print_stdout)]
        {
            print!("{yaml}");
        }
        Ok(())
    } else {
        unreachable!();
    }
}

pub fn run(config: Config) -> Result<()> {
    setup::dump_spawn_infos(&config);
    switchyard_server::run(config)
}
