use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod close;
pub mod fetch;
pub mod info;
pub mod reconfigure;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a synthetic render loop behind the frame server.
    Serve(ServeArgs),
    /// Show the render info of a running frame server.
    Info(InfoArgs),
    /// Download frames as .ppm files.
    Fetch(FetchArgs),
    /// Send a reconfigure request; the running render is stopped.
    Reconfigure(ReconfigureArgs),
    /// Stop the running render.
    Close(CloseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Fetch(args) => fetch::run(args, format),
        Command::Reconfigure(args) => reconfigure::run(args, format),
        Command::Close(args) => close::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where a client command finds the frame server.
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Frame server host.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Frame server port.
    #[arg(long, short = 'p', env = "FRAMESERV_PORT", default_value_t = frameserv_server::DEFAULT_PORT)]
    pub port: u16,
    /// Connect and read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TCP port to listen on (0 picks a free port).
    #[arg(long, short = 'p', env = "FRAMESERV_PORT", default_value_t = frameserv_server::DEFAULT_PORT)]
    pub port: u16,
    /// Interface to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// First frame of the render.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub start: i32,
    /// Last frame of the render (inclusive).
    #[arg(long, default_value_t = 250, allow_negative_numbers = true)]
    pub end: i32,
    /// Frames per second reported on the info page.
    #[arg(long, default_value_t = 25)]
    pub rate: i32,
    /// Frame width in pixels.
    #[arg(long, default_value_t = 320, value_parser = clap::value_parser!(u32).range(1..=16384))]
    pub width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u32).range(1..=16384))]
    pub height: u32,
    /// Stream consecutive frames on one connection by default.
    #[arg(long)]
    pub continuous: bool,
    /// Wait for an incoming connection before re-checking for Ctrl-C (e.g. 1s).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub accept_timeout: Duration,
    /// Wait for a connected peer's request (e.g. 10s).
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub request_timeout: Duration,
    /// Start the render again after a reconfigure request instead of exiting.
    #[arg(long)]
    pub restart_on_reconfigure: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Frame number, or `all` for the continuous stream.
    #[arg(allow_negative_numbers = true)]
    pub frame: FrameSelector,
    /// Directory to write .ppm files into.
    #[arg(long, short = 'o', default_value = ".")]
    pub output: PathBuf,
    /// Stop after this many frames of the continuous stream.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct ReconfigureArgs {
    /// Query handed verbatim to the render host (e.g. `quality=high`).
    pub query: String,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Which frames `fetch` asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSelector {
    Single(i32),
    All,
}

impl std::str::FromStr for FrameSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse()
            .map(Self::Single)
            .map_err(|_| format!("expected a frame number or `all`, got `{s}`"))
    }
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn frame_selector() {
        assert_eq!("all".parse::<FrameSelector>().unwrap(), FrameSelector::All);
        assert_eq!("42".parse::<FrameSelector>().unwrap(), FrameSelector::Single(42));
        assert!("forty".parse::<FrameSelector>().is_err());
    }
}
