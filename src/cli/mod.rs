//! CLI entry point for Hearth.

pub mod auth;

use clap::{Parser, Subcommand};

/// Hearth marketplace CLI
#[derive(Parser, Debug)]
#[command(name = "hearth", version, about = "Hearth marketplace session CLI")]
pub struct Cli {
    /// Backend base URL (overrides HEARTH_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// Authenticated GET against the backend
    Get(GetArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Show the stored session
    Status,
    /// Exchange the refresh token for a new pair
    Refresh,
    /// Clear the stored session
    Logout,
}

/// Arguments for `hearth auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,

    /// Account password (prompted when omitted)
    #[arg(short, long, env = "HEARTH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for `hearth get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Request path, e.g. /services
    pub path: String,

    /// Query parameters as key=value
    #[arg(short, long = "query", value_parser = parse_query_pair)]
    pub query: Vec<(String, String)>,
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_auth_login_with_email() {
        let cli = Cli::try_parse_from([
            "hearth", "auth", "login", "--email", "dana@example.com", "-p", "pw",
        ])
        .unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Login(args) => {
                    assert_eq!(args.email, "dana@example.com");
                    assert_eq!(args.password.as_deref(), Some("pw"));
                }
                other => panic!("expected Login, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    fn auth_command(args: &[&str]) -> AuthCommands {
        match Cli::try_parse_from(args.iter().copied()).unwrap().command {
            Commands::Auth(auth) => auth.command,
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_auth_status() {
        assert!(matches!(
            auth_command(&["hearth", "auth", "status"]),
            AuthCommands::Status
        ));
    }

    #[test]
    fn parse_auth_refresh_and_logout() {
        assert!(matches!(
            auth_command(&["hearth", "auth", "refresh"]),
            AuthCommands::Refresh
        ));
        assert!(matches!(
            auth_command(&["hearth", "auth", "logout"]),
            AuthCommands::Logout
        ));
    }

    #[test]
    fn parse_get_with_query_and_global_url() {
        let cli = Cli::try_parse_from([
            "hearth",
            "get",
            "/services",
            "-q",
            "page=2",
            "--query",
            "category=plumbing",
            "--api-url",
            "https://api.example.com",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("https://api.example.com"));
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.path, "/services");
                assert_eq!(
                    args.query,
                    vec![
                        ("page".to_string(), "2".to_string()),
                        ("category".to_string(), "plumbing".to_string()),
                    ]
                );
            }
            other => panic!("expected Get, got {other:?}"),
        }
    }

    #[test]
    fn parse_get_rejects_bad_query() {
        assert!(Cli::try_parse_from(["hearth", "get", "/x", "-q", "novalue"]).is_err());
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["hearth"]).is_err());
    }

    #[test]
    fn parse_auth_login_missing_email_is_error() {
        assert!(Cli::try_parse_from(["hearth", "auth", "login"]).is_err());
    }
}
