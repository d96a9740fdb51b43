use anyhow::{bail, Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Password};

use digest_core::DigestApp;

/// Handles sign-in and history operations for the CLI
pub struct SessionManager;

impl SessionManager {
    /// Prompts for whatever of name and password is missing, then signs in
    pub async fn login(app: &mut DigestApp, name: Option<String>) -> Result<()> {
        let name = match name {
            Some(name) => name,
            None => Input::<String>::new()
                .with_prompt("Name")
                .interact_text()
                .context("Failed to read name")?,
        };
        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?;

        app.sign_in(&name, &password)
            .await
            .context("Sign-in failed")?;

        let count = app.history().len();
        println!(
            "Signed in as {} ({} saved {}).",
            name.trim().blue(),
            count,
            if count == 1 { "summary" } else { "summaries" }
        );
        Ok(())
    }

    pub async fn logout(app: &mut DigestApp) {
        match app.user().map(|user| user.name.clone()) {
            Some(name) => {
                app.sign_out().await;
                println!("Signed out {}.", name.blue());
            }
            None => println!("Not signed in."),
        }
    }

    /// Asks for confirmation before deleting the signed-in user's history
    pub async fn clear_history(app: &mut DigestApp) -> Result<()> {
        if app.user().is_none() {
            println!("Sign in to keep a history.");
            return Ok(());
        }

        let confirmed = Confirm::new()
            .with_prompt("Are you sure you want to clear your history?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if confirmed {
            app.clear_history().await;
            println!("History cleared.");
        }
        Ok(())
    }

    /// Reopens the entry numbered `position` in the newest-first listing
    pub fn open_history(app: &mut DigestApp, position: &str) -> Result<()> {
        let index = history_index(position, app.history().len())?;
        app.open_history_item(index)?;
        Ok(())
    }
}

/// Maps a listing number (1 is the newest entry) to a stored index
fn history_index(position: &str, len: usize) -> Result<usize> {
    let n: usize = position
        .trim()
        .parse()
        .with_context(|| format!("Not a history number: {}", position.trim()))?;
    if n == 0 || n > len {
        bail!("No history entry numbered {} ({} saved)", n, len);
    }
    Ok(len - n)
}
