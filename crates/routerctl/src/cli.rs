use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use routerctl_core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_USERNAME};

pub fn parse_duration(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}

/// Flybox home router administration client
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results and errors as JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that talks to the router.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Router hostname or IP address.
    /// Defaults to the default gateway of this machine.
    #[arg(long, global = true, env = "ROUTERCTL_HOST")]
    pub host: Option<String>,

    /// Router account name.
    #[arg(
        short,
        long,
        global = true,
        env = "ROUTERCTL_USERNAME",
        default_value = DEFAULT_USERNAME
    )]
    pub username: String,

    /// Read password from stdin.
    /// Useful for scripting: echo "password" | routerctl --password-stdin info
    /// The ROUTERCTL_PASSWORD environment variable takes precedence.
    #[arg(long, global = true)]
    pub password_stdin: bool,

    /// Timeout in seconds for each HTTP request
    #[arg(long, global = true, value_parser = parse_duration, default_value = "10")]
    pub timeout: Duration,

    /// Login attempts before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub attempts: u32,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show device and radio information
    Info,

    /// Restart the router
    Restart,

    /// List devices connected to the router
    Devices {
        /// Include devices that are no longer active
        #[arg(short, long)]
        all: bool,
    },

    /// Show the MAC filter of each SSID
    Macfilter,

    /// Show version information for CLI and core library
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["routerctl", "info"]).unwrap();
        assert_eq!(cli.command, Command::Info);
        assert!(!cli.json);
        assert_eq!(cli.connection.timeout, Duration::from_secs(10));
        assert_eq!(cli.connection.attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "routerctl",
            "devices",
            "--all",
            "-j",
            "--host",
            "192.168.8.1",
            "-u",
            "root",
            "--timeout",
            "3",
            "--attempts",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.command, Command::Devices { all: true });
        assert!(cli.json);
        assert_eq!(cli.connection.host.as_deref(), Some("192.168.8.1"));
        assert_eq!(cli.connection.username, "root");
        assert_eq!(cli.connection.timeout, Duration::from_secs(3));
        assert_eq!(cli.connection.attempts, 5);
    }

    #[test]
    fn test_cli_rejects_bad_timeout() {
        assert!(Cli::try_parse_from(["routerctl", "--timeout", "soon", "info"]).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("-1").is_err());
    }
}
