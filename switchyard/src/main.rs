//! Switchyard turns router access logs read from a Kafka topic into metric points.
//!
//! Every record on the topic is one access-log line, either as whitespace-delimited `key=value`
//! tokens or as a flat JSON object. Records that pass the filters derive a fixed set of points
//! (durations, status, request and client-closed counters) which are written to one of three
//! backends:
//!
//!  - `put`: one put-protocol line per point over a TCP connection.
//!  - `line`: one line-protocol line per point over UDP.
//!  - `http`: one line-protocol batch per record, posted to an HTTP write endpoint.
//!
//! # Configuration
//!
//! Values are read from an optional YAML file, then from environment variables, and finally
//! from command line arguments. Later sources take precedence. Run `switchyard config show` to
//! print the effective configuration.
//!
//! # Workspace Crates
//!
//!  - `switchyard`: Main entry point and command line interface.
//!  - [`switchyard-accesslog`]: Record parsing, filters and metric derivation.
//!  - [`switchyard-common`]: Shared counters.
//!  - [`switchyard-config`]: Static configuration for the CLI and server.
//!  - [`switchyard-kafka`]: Consumer group plumbing.
//!  - [`switchyard-log`]: Logging setup and facade.
//!  - [`switchyard-protocol`]: Metric point model and wire formats.
//!  - [`switchyard-server`]: The pipeline and its lifecycle.
//!  - [`switchyard-sink`]: Backend adapters.
//!
//! [`switchyard-accesslog`]: ../switchyard_accesslog/index.html
//! [`switchyard-common`]: ../switchyard_common/index.html
//! [`switchyard-config`]: ../switchyard_config/index.html
//! [`switchyard-kafka`]: ../switchyard_kafka/index.html
//! [`switchyard-log`]: ../switchyard_log/index.html
//! [`switchyard-protocol`]: ../switchyard_protocol/index.html
//! [`switchyard-server`]: ../switchyard_server/index.html
//! [`switchyard-sink`]: ../switchyard_sink/index.html

mod cli;
mod cliapp;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            switchyard_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
