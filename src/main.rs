//! ytc - command-line client for YouTrack.

use clap::{Parser, Subcommand};

use youtrack_client::api::{self, Connection};
use youtrack_client::config::Config;
use youtrack_client::error::Result;
use youtrack_client::logging;

#[derive(Parser)]
#[command(name = "ytc")]
#[command(about = "Command-line client for the YouTrack REST API")]
#[command(version)]
struct Cli {
    /// Profile to use instead of the default one
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an issue with its fields
    Issue {
        /// Issue ID, e.g. ABC-12
        id: String,
    },

    /// Count issues matching a search query
    Count {
        /// Search query
        filter: String,
        /// Return the first answer even if the server is still counting
        #[arg(long)]
        no_wait: bool,
    },

    /// List the comments of an issue
    Comments {
        /// Issue ID
        id: String,
    },

    /// Print the server build number
    Build,

    /// List all users
    Users,

    /// Manage stored tokens and passwords
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store the token (or password) for a profile in the OS keychain
    Set {
        /// Profile name
        profile: String,
        /// Token or password
        secret: String,
    },

    /// Remove the stored token for a profile
    Delete {
        /// Profile name
        profile: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init() {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("{}", action);
            }
            1
        }
    };

    logging::shutdown();
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Token { action } => run_token(&action)?,
        Commands::Issue { id } => {
            let issue = connect(profile).await?.get_issue(&id).await?;
            println!("{}", issue);
            for (name, value) in &issue.fields {
                println!("  {}: {}", name, value.values().join(", "));
            }
        }
        Commands::Count { filter, no_wait } => {
            let count = connect(profile)
                .await?
                .get_number_of_issues(&filter, !no_wait)
                .await?;
            println!("{}", count);
        }
        Commands::Comments { id } => {
            for comment in connect(profile).await?.get_comments(&id).await? {
                println!(
                    "{}: {}",
                    comment.author().unwrap_or("?"),
                    comment.text().unwrap_or_default()
                );
            }
        }
        Commands::Build => {
            println!("{}", connect(profile).await?.get_build_number().await?);
        }
        Commands::Users => {
            for user in connect(profile).await?.get_users(&[]).await? {
                println!("{}\t{}", user.login, user.full_name);
            }
        }
    }

    Ok(())
}

async fn connect(profile: Option<&str>) -> Result<Connection> {
    let config = Config::load()?;
    let profile = config.resolve_profile(profile)?;
    Ok(Connection::from_profile(profile, &config.settings).await?)
}

fn run_token(action: &TokenAction) -> Result<()> {
    match action {
        TokenAction::Set { profile, secret } => {
            api::store_secret(profile, secret)?;
            println!("Stored secret for profile '{}'", profile);
        }
        TokenAction::Delete { profile } => {
            api::delete_secret(profile)?;
            println!("Deleted secret for profile '{}'", profile);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_token_set_parses_without_profile_flag() {
        let cli = Cli::try_parse_from(["ytc", "token", "set", "work", "perm:abc"]).unwrap();
        assert!(cli.profile.is_none());
        match cli.command {
            Commands::Token {
                action: TokenAction::Set { profile, secret },
            } => {
                assert_eq!(profile, "work");
                assert_eq!(secret, "perm:abc");
            }
            _ => panic!("expected token set"),
        }
    }

    #[test]
    fn test_global_profile_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["ytc", "count", "#Unresolved", "--no-wait", "-p", "work"]).unwrap();
        assert_eq!(cli.profile.as_deref(), Some("work"));
        assert!(matches!(cli.command, Commands::Count { no_wait: true, .. }));
    }
}
