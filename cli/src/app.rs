use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, error, info};

use digest_core::model::Role;
use digest_core::DigestApp;

use crate::output::{print_history, print_interactive_help, print_reply};
use crate::session_manager::SessionManager;

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Sends one query and prints the reply, which may be an error turn
async fn submit_and_print(app: &mut DigestApp, query: &str, html: bool) -> Result<()> {
    let progress = spinner("Generating summary...")?;
    let result = app.submit(query).await;
    progress.finish_and_clear();

    let reply = result?;
    print_reply(&reply, app.theme(), html);
    Ok(())
}

/// Runs a single query mode, sending one prompt and displaying the answer
pub async fn run_single_query(query: String, app: &mut DigestApp, html: bool) -> Result<()> {
    info!("Running single query: {}", query);
    submit_and_print(app, &query, html).await
}

/// Reprints the transcript after a history entry is reopened
fn print_transcript(app: &DigestApp, html: bool) {
    for message in app.session().transcript() {
        match message.role {
            Role::User => println!("{}: {}", "You".green().bold(), message.content),
            Role::Model => print_reply(message, app.theme(), html),
        }
    }
}

/// Runs an interactive chat session
pub async fn run_interactive_chat(app: &mut DigestApp, html: bool) -> Result<()> {
    println!("Starting interactive ThreadDigest session.");
    match app.user() {
        Some(user) => println!("Signed in as {}.", user.name.blue()),
        None => println!("Not signed in: answers will not be saved. Use /login to sign in."),
    }
    println!("Type /help for commands, 'exit' or 'quit' to end the session.");
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Exiting chat session.");
            break;
        }

        if let Some(command) = input.strip_prefix('/') {
            if let Err(e) = run_command(app, command, html).await {
                error!("Command failed: {:#}", e);
                eprintln!("{}", format!("Error: {:#}", e).red());
            }
            continue;
        }

        debug!("Submitting query: {}", input);
        if let Err(e) = submit_and_print(app, input, html).await {
            error!("Failed to submit query: {:#}", e);
            eprintln!("Error: {:#}", e);
        }

        println!();
    }

    Ok(())
}

async fn run_command(app: &mut DigestApp, command: &str, html: bool) -> Result<()> {
    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    match name {
        "new" => {
            app.new_session();
            println!("Started a new session.");
        }
        "history" => print_history(app.history(), app.theme()),
        "open" => {
            SessionManager::open_history(app, argument)?;
            print_transcript(app, html);
        }
        "clear" => SessionManager::clear_history(app).await?,
        "login" => {
            let name = (!argument.is_empty()).then(|| argument.to_string());
            SessionManager::login(app, name).await?;
        }
        "logout" => SessionManager::logout(app).await,
        "theme" => {
            let theme = app.toggle_theme().await;
            println!("Theme set to {}.", theme);
        }
        "help" => print_interactive_help(),
        other => {
            println!("Unknown command: /{}", other);
            print_interactive_help();
        }
    }
    Ok(())
}
