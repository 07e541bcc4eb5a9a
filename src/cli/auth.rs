//! CLI command handlers for login, status, refresh, logout, and GET.

use std::io::Write;
use std::sync::Arc;

use crate::auth::{AuthError, Session};
use crate::client::ApiRequest;
use crate::config::HearthConfig;
use crate::error::HearthError;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load configuration from the environment, applying a `--api-url` override.
pub fn load_config(api_url: Option<&str>) -> Result<HearthConfig, Box<dyn std::error::Error>> {
    let mut config = HearthConfig::from_env()?;
    if let Some(url) = api_url {
        let overridden = HearthConfig::new(url);
        config.base_url = overridden.base_url;
    }
    Ok(config)
}

fn open_session(config: &HearthConfig) -> Result<Arc<Session>, Box<dyn std::error::Error>> {
    Ok(Session::from_config(config)?)
}

/// Handle `hearth auth login`.
pub async fn handle_login(config: &HearthConfig, email: &str, password: Option<&str>) -> CliResult {
    let password = match password {
        Some(p) => p.to_string(),
        None => prompt("Password: ")?,
    };
    if password.is_empty() {
        eprintln!("❌ No password provided.");
        std::process::exit(1);
    }

    let session = open_session(config)?;
    let identity = session.login(email, &password).await?;
    println!("✅ Signed in as {} <{}> ({})", display_name(&identity.name), identity.email, identity.role);
    Ok(())
}

/// Handle `hearth auth status`.
pub async fn handle_status(config: &HearthConfig) -> CliResult {
    let session = open_session(config)?;

    println!("🔐 Session Status\n");
    println!("  Backend: {}", config.base_url);
    println!("  Storage: {}", config.storage_dir.display());

    match session.identity() {
        Some(identity) => {
            println!("  User:    {} <{}>", display_name(&identity.name), identity.email);
            println!("  Id:      {}", identity.id);
            println!("  Role:    {}", identity.role);
            let expiry = match identity.expires_at {
                Some(exp) if exp > chrono::Utc::now() => {
                    format!("✅ valid until {}", exp.format("%Y-%m-%d %H:%M"))
                }
                Some(_) => "⚠️  access token expired (refreshes on next request)".to_string(),
                None => "✅ no expiry claim".to_string(),
            };
            println!("  Token:   {expiry}");
        }
        None => println!("  ❌ Not signed in"),
    }
    Ok(())
}

/// Handle `hearth auth refresh`.
pub async fn handle_refresh(config: &HearthConfig) -> CliResult {
    let session = open_session(config)?;
    if session.refresh_access_token().await {
        println!("✅ Session refreshed");
        Ok(())
    } else {
        eprintln!("❌ Refresh failed; sign in again with `hearth auth login`");
        std::process::exit(1);
    }
}

/// Handle `hearth auth logout`.
pub async fn handle_logout(config: &HearthConfig) -> CliResult {
    let session = open_session(config)?;
    session.logout();
    println!("✅ Signed out");
    Ok(())
}

/// Handle `hearth get <path>`.
pub async fn handle_get(config: &HearthConfig, path: &str, query: &[(String, String)]) -> CliResult {
    let session = open_session(config)?;
    session.ensure_fresh().await;

    let request = query
        .iter()
        .fold(ApiRequest::get(path), |req, (key, value)| req.query(key, value));
    let body = session.client().send_value(&request).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Guidance to print under a failed command, when the error is one of ours.
pub fn recovery_hint(err: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    if let Some(err) = err.downcast_ref::<HearthError>() {
        return Some(err.recovery_suggestion().hint());
    }
    err.downcast_ref::<AuthError>()
        .map(|err| err.recovery_suggestion().hint())
}

fn prompt(label: &str) -> Result<String, std::io::Error> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(no name)"
    } else {
        name
    }
}
