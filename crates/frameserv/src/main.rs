mod client;
mod cmd;
mod exit;
mod logging;
mod output;
mod pattern;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "frameserv", version, about = "Render frame streaming server and client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "FRAMESERV_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cmd::FrameSelector;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "frameserv",
            "serve",
            "--port",
            "0",
            "--start",
            "-2",
            "--end",
            "10",
            "--continuous",
            "--accept-timeout",
            "250ms",
        ])
        .expect("serve args should parse");

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.port, 0);
                assert_eq!(args.start, -2);
                assert!(args.continuous);
                assert_eq!(args.accept_timeout, Duration::from_millis(250));
                assert_eq!(args.request_timeout, Duration::from_secs(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_width() {
        let err = Cli::try_parse_from(["frameserv", "serve", "--width", "0"])
            .expect_err("zero width should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_fetch_all() {
        let cli = Cli::try_parse_from([
            "frameserv", "fetch", "all", "--count", "3", "--port", "9000", "--timeout", "2s",
        ])
        .expect("fetch args should parse");
        match cli.command {
            Command::Fetch(args) => {
                assert_eq!(args.frame, FrameSelector::All);
                assert_eq!(args.count, Some(3));
                assert_eq!(args.client.port, 9000);
                assert_eq!(args.client.timeout, Duration::from_secs(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_negative_frame() {
        let cli = Cli::try_parse_from(["frameserv", "fetch", "-4"]).expect("fetch args should parse");
        assert!(matches!(
            cli.command,
            Command::Fetch(ref args) if args.frame == FrameSelector::Single(-4)
        ));
    }

    #[test]
    fn parses_reconfigure_query() {
        let cli = Cli::try_parse_from(["frameserv", "reconfigure", "quality=high&end=20"])
            .expect("reconfigure args should parse");
        assert!(matches!(cli.command, Command::Reconfigure(_)));
    }
}
