//! CLI module for Muse
//!
//! Provides commands:
//! - `serve`: Run the HTTP server (default)
//! - `usage`: Show a caller's stored usage counter
//! - `keys generate`: Mint an API key and print its config entry

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use muse_core::{AuthStore, QuotaGate};

/// Muse generation backend CLI
#[derive(Parser, Debug)]
#[command(name = "muse")]
#[command(about = "Quota-gated generative AI backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Show the usage counter for a caller
    Usage {
        /// Caller id
        caller_id: String,
    },
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Generate a new API key for a caller
    Generate {
        /// Caller id the key resolves to
        caller_id: String,
        /// Free-form label shown in logs
        #[arg(long, default_value = "default")]
        label: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None | Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Usage { caller_id }) => show_usage(&caller_id).await,
        Some(Commands::Keys {
            command: KeysCommand::Generate { caller_id, label },
        }) => generate_key(&caller_id, &label),
    }
}

async fn show_usage(caller_id: &str) -> Result<()> {
    let config = crate::server::load_config()?;
    let store = crate::server::open_usage_store(&config).await?;
    let gate = QuotaGate::new(store, config.quota.free_limit);

    let summary = gate
        .usage(caller_id)
        .await
        .with_context(|| format!("Failed to read usage for {}", caller_id))?;
    let is_pro = config
        .subscriptions
        .pro_callers
        .iter()
        .any(|id| id == caller_id);

    println!("caller:    {}", caller_id);
    println!("count:     {}", summary.count);
    println!("limit:     {}", summary.limit);
    println!("remaining: {}", summary.remaining);
    println!("pro:       {}", is_pro);
    Ok(())
}

fn generate_key(caller_id: &str, label: &str) -> Result<()> {
    let store = AuthStore::new(true);
    let (raw_key, key_hash) = store
        .generate_api_key(caller_id, label)
        .context("Failed to generate API key")?;

    println!("API key (shown once): {}", raw_key);
    println!();
    println!("Add to config/local.toml:");
    println!();
    println!("[[server.auth.keys]]");
    println!("caller_id = \"{}\"", caller_id);
    println!("key_hash = \"{}\"", key_hash);
    println!("label = \"{}\"", label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["muse"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_keys_generate_parses_label() {
        let cli = Cli::try_parse_from(["muse", "keys", "generate", "user_1", "--label", "web"]).unwrap();
        match cli.command {
            Some(Commands::Keys {
                command: KeysCommand::Generate { caller_id, label },
            }) => {
                assert_eq!(caller_id, "user_1");
                assert_eq!(label, "web");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_usage_requires_caller() {
        assert!(Cli::try_parse_from(["muse", "usage"]).is_err());
    }
}
