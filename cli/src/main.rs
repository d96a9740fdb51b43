use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tracing::{error, info};

use digest_core::client::{InvocationRequest, ModelOutput};
use digest_core::config::{get_default_config_file, APP_NAME};
use digest_core::errors::{DigestError, DigestResult};
use digest_core::{DigestApp, DigestConfig, GeminiClient, ModelInvoker};
use digest_history::FileStore;

mod app;
mod cli;
mod logging;
mod output;
mod session_manager;

use crate::cli::Args;
use crate::output::{print_history, print_usage_instructions};
use crate::session_manager::SessionManager;

/// Stands in for the Gemini client when no API key is configured, so that
/// account commands keep working offline.
struct MissingApiKey;

#[async_trait]
impl ModelInvoker for MissingApiKey {
    async fn invoke(&self, _request: &InvocationRequest) -> DigestResult<ModelOutput> {
        Err(DigestError::ConfigError(
            "API key is required; set GEMINI_API_KEY or pass --api-key".to_string(),
        ))
    }
}

fn load_config(args: &Args) -> Result<DigestConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let file_config = DigestConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(file_config.merge(&args.config_overrides()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so that clap sees GEMINI_API_KEY
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = load_config(&args)?;
    logging::init(config.log_level.as_deref())?;

    let data_dir = config.data_dir()?;
    let store = Arc::new(FileStore::open(&data_dir)?);
    info!("Using data directory {}", data_dir.display());

    let invoker: Arc<dyn ModelInvoker> = match GeminiClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) if args.needs_model() => {
            eprintln!("{}", format!("Error initializing Gemini client: {}", e).red());
            return Err(e.into());
        }
        Err(_) => Arc::new(MissingApiKey),
    };

    let html = args.html;
    let mut app = DigestApp::new(config, invoker, store.clone(), store);
    app.start().await;

    if args.logout {
        SessionManager::logout(&mut app).await;
    }
    if let Some(name) = args.login.clone() {
        SessionManager::login(&mut app, Some(name)).await?;
    }
    if args.toggle_theme {
        let theme = app.toggle_theme().await;
        println!("Theme set to {}.", theme);
    }
    if args.clear_history {
        SessionManager::clear_history(&mut app).await?;
    }
    if args.history {
        print_history(app.history(), app.theme());
    }

    if args.interactive {
        if let Err(e) = crate::app::run_interactive_chat(&mut app, html).await {
            error!("Error in interactive chat: {:#}", e);
            eprintln!("{}", format!("Interactive chat failed: {:#}", e).red());
        }
    } else if let Some(query) = args.query.clone() {
        if let Err(e) = crate::app::run_single_query(query, &mut app, html).await {
            error!("Error processing query: {:#}", e);
            eprintln!("{}", format!("Error: {:#}", e).red());
        }
    } else if !args.has_account_action() {
        print_usage_instructions();
    }

    Ok(())
}
