//! CLI command handlers.

pub mod auth;
pub mod cache;
pub mod dashboard;
pub mod probe;
pub mod slips;
pub mod tags;

use anyhow::{Context as _, Result};
use console::Style;
use serde::Serialize;
use slipshot_client::SlipshotClient;
use slipshot_config::SlipshotConfig;

/// Environment variable holding the password for non-interactive login.
pub const PASSWORD_ENV: &str = "SLIPSHOT_PASSWORD";

/// Shared context for all commands.
pub struct Context {
    /// Client for the configured backend.
    pub client: SlipshotClient,
    /// Effective configuration after CLI overrides.
    pub config: SlipshotConfig,
    /// User to sign in as before the command runs.
    pub username: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Sign in when a username was given.
    ///
    /// Session cookies live only as long as the process, so commands that
    /// hit authenticated endpoints call this first.
    pub async fn ensure_session(&self) -> Result<()> {
        let Some(username) = &self.username else {
            if self.verbose {
                let dim = Style::new().dim();
                eprintln!("{}", dim.apply_to("No --username given, continuing unauthenticated"));
            }
            return Ok(());
        };
        let password = read_password(username)?;
        self.client.auth().login(username.as_str(), password).await?;
        Ok(())
    }

    /// Print a value as pretty JSON.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Password from `SLIPSHOT_PASSWORD`, else an interactive prompt.
pub fn read_password(username: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV)
        && !password.is_empty()
    {
        return Ok(password);
    }
    rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")
}

/// Print a section heading.
pub fn heading(title: &str) {
    let dim = Style::new().dim();
    println!("{}", console::style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
}

/// Truncate to `max_len` characters, marking the cut with `...`.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
