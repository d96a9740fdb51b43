use clap::Parser;
use digest_core::config::DigestConfig;
use std::path::PathBuf;

/// Summarize a link or answer a question with search-grounded Gemini
#[derive(Parser, Debug)]
#[command(name = "thread-digest", author, version, about, long_about = None)]
pub struct Args {
    /// A URL to summarize or a question to answer
    #[arg(index = 1)]
    pub query: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Sign in under this name (the password is prompted for)
    #[arg(long, value_name = "NAME")]
    pub login: Option<String>,

    /// Forget the signed-in identity
    #[arg(long, default_value_t = false)]
    pub logout: bool,

    /// List the signed-in user's history
    #[arg(long, default_value_t = false)]
    pub history: bool,

    /// Delete the signed-in user's history
    #[arg(long, default_value_t = false)]
    pub clear_history: bool,

    /// Switch between the dark and light palettes
    #[arg(long, default_value_t = false)]
    pub toggle_theme: bool,

    /// Print answers as an HTML fragment instead of terminal text
    #[arg(long, default_value_t = false)]
    pub html: bool,

    /// Gemini API key
    #[arg(short = 'k', long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Seconds to wait for the model before giving up
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Remove the first line of the answer when it is reused as the title
    #[arg(long, default_value_t = false)]
    pub strip_fallback_title: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for history and preferences
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Settings given on the command line, to be merged over the config file
    pub fn config_overrides(&self) -> DigestConfig {
        DigestConfig {
            api_key: self.api_key.clone(),
            model_name: self.model.clone(),
            thinking_budget: None,
            request_timeout_secs: self.timeout,
            strip_fallback_title: self.strip_fallback_title.then_some(true),
            data_dir: self.data_dir.clone(),
            log_level: self.verbose.then(|| "debug".to_string()),
        }
    }

    /// Whether this invocation needs to talk to the model
    pub fn needs_model(&self) -> bool {
        self.interactive || self.query.is_some()
    }

    pub fn has_account_action(&self) -> bool {
        self.login.is_some()
            || self.logout
            || self.history
            || self.clear_history
            || self.toggle_theme
    }
}
