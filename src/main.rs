//! Hearth CLI binary entry point.

use hearth::cli::{auth, AuthCommands, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match auth::load_config(cli.api_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => {
                auth::handle_login(&config, &args.email, args.password.as_deref()).await
            }
            AuthCommands::Status => auth::handle_status(&config).await,
            AuthCommands::Refresh => auth::handle_refresh(&config).await,
            AuthCommands::Logout => auth::handle_logout(&config).await,
        },
        Commands::Get(args) => auth::handle_get(&config, &args.path, &args.query).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(hint) = auth::recovery_hint(e.as_ref()) {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}
