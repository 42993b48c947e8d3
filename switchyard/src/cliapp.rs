//! The definition of the command line app.
use clap::{Arg, ArgAction, Command, ValueHint};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ABOUT: &str = "Switchyard turns router access logs into metric points.";

pub fn make_app() -> Command {
    Command::new("switchyard")
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .propagate_version(true)
        .max_term_width(79)
        .version(VERSION)
        .about(ABOUT)
        .arg(
            Arg::new("config")
                .value_name("FILE")
                .long("config")
                .short('c')
                .global(true)
                .env("SWITCHYARD_CONFIG")
                .value_hint(ValueHint::FilePath)
                .help("The path to the YAML config file."),
        )
        .subcommand(
            Command::new("run")
                .about("Run the pipeline")
                .after_help(
                    "This consumes the configured topic in the foreground until the process \
                     receives SIGINT or SIGTERM. Pending deliveries are flushed before exit.",
                )
                .arg(
                    Arg::new("sink")
                        .long("sink")
                        .value_name("KIND")
                        .value_parser(["put", "line", "http"])
                        .help("The metric backend protocol."),
                )
                .arg(
                    Arg::new("backend")
                        .long("backend")
                        .value_name("ADDR")
                        .help("Address or URL of the metric backend."),
                )
                .arg(
                    Arg::new("database")
                        .long("database")
                        .value_name("NAME")
                        .help("The database written to by the http sink."),
                )
                .arg(
                    Arg::new("brokers")
                        .long("brokers")
                        .value_name("HOSTS")
                        .help("Comma separated list of Kafka brokers."),
                )
                .arg(
                    Arg::new("topic")
                        .long("topic")
                        .value_name("TOPIC")
                        .help("The topic to consume."),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .value_name("NAME")
                        .help("Base name of the consumer group."),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .value_parser(["tokens", "json"])
                        .help("The shape of records on the topic."),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Format points but never send them."),
                )
                .arg(
                    Arg::new("echo")
                        .long("echo")
                        .action(ArgAction::SetTrue)
                        .help("Log every record and formatted line."),
                )
                .arg(
                    Arg::new("enrich")
                        .long("enrich")
                        .action(ArgAction::SetTrue)
                        .help("Attach forwarded-for address and TLS version to points."),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect the configuration")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Show the effective configuration")
                        .after_help(
                            "This prints the configuration after applying the config file \
                             and environment variables.",
                        ),
                ),
        )
}
