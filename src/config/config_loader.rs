use std::ffi::OsString;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::Level;

use super::config_model::{BasicAuth, Ftp, Push, RelayConfig, Server};
use crate::domain::value_objects::uploads::PushMode;

const DEFAULT_FTP_PORT: u16 = 21;
/// 1 TiB.
pub const MAX_BODY_LIMIT_MB: u64 = 1 << 20;

/// Receives files over HTTP and forwards them to an FTP server
#[derive(Debug, Parser)]
#[command(name = "push-relay", author, version, about, long_about = None)]
pub struct Cli {
    /// Hostname of the FTP server (host or host:port)
    #[arg(short = 's', long, env = "FTP_HOST")]
    pub ftp_host: String,

    /// Username for the given FTP host
    #[arg(short = 'u', long, env = "FTP_USER")]
    pub ftp_user: String,

    /// Password for the given FTP host
    #[arg(short = 'p', long, env = "FTP_PASSWORD", hide_env_values = true)]
    pub ftp_password: String,

    /// Directory where received files are uploaded
    #[arg(short = 'd', long, env = "FTP_DIRECTORY", default_value = ".")]
    pub ftp_directory: String,

    /// Port for the web server
    #[arg(long, env = "RELAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Username for HTTP basic auth
    #[arg(long, env = "AUTH_USERNAME", default_value = "substitutes")]
    pub username: String,

    /// Password for HTTP basic auth
    #[arg(
        long,
        env = "AUTH_PASSWORD",
        default_value = "substitutes",
        hide_env_values = true
    )]
    pub password: String,

    /// How the uploaded `push` field is interpreted
    #[arg(long, env = "PUSH_MODE", value_enum, default_value_t = PushMode::Auto)]
    pub push_mode: PushMode,

    /// Maximum request body size in MiB
    #[arg(
        long,
        env = "BODY_LIMIT_MB",
        default_value_t = 512,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BODY_LIMIT_MB)
    )]
    pub body_limit: u64,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn load() -> Result<RelayConfig> {
    dotenvy::dotenv().ok();

    from_cli(Cli::parse())
}

pub fn load_from<I, T>(args: I) -> Result<RelayConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    from_cli(Cli::try_parse_from(args)?)
}

fn from_cli(cli: Cli) -> Result<RelayConfig> {
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    Ok(RelayConfig {
        server: Server {
            port: cli.port,
            body_limit: cli.body_limit,
        },
        auth: BasicAuth {
            username: cli.username,
            password: cli.password,
        },
        ftp: Ftp {
            host: normalize_ftp_host(&cli.ftp_host)?,
            username: cli.ftp_user,
            password: cli.ftp_password,
        },
        push: Push {
            base_directory: cli.ftp_directory,
            mode: cli.push_mode,
        },
        log_level,
    })
}

fn normalize_ftp_host(raw: &str) -> Result<String> {
    let host = raw.trim();
    if host.is_empty() {
        bail!("--ftp-host must not be empty");
    }

    // Bracketed IPv6 literals carry their port after the closing bracket.
    let has_port = match host.rfind(']') {
        Some(end) => host[end..].contains(':'),
        None => host.matches(':').count() == 1,
    };

    if has_port {
        Ok(host.to_string())
    } else if host.contains(':') && !host.starts_with('[') {
        Ok(format!("[{}]:{}", host, DEFAULT_FTP_PORT))
    } else {
        Ok(format!("{}:{}", host, DEFAULT_FTP_PORT))
    }
}
