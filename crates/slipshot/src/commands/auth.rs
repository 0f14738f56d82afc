//! Auth command - sign in, sign out and session inspection.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use super::{Context, heading, read_password};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in and report the session state
    Login,

    /// Sign out and drop cached resources
    Logout,

    /// Ask the backend whether the session is authenticated
    Status,

    /// Show the signed-in user's profile
    Whoami,

    /// Renew the session explicitly
    Renew,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login => cmd_login(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Whoami => cmd_whoami(ctx).await,
        AuthCommand::Renew => cmd_renew(ctx).await,
    }
}

async fn cmd_login(ctx: &Context) -> Result<()> {
    let Some(username) = &ctx.username else {
        bail!("Pass --username (or set SLIPSHOT_USERNAME) to sign in");
    };
    let password = read_password(username)?;
    ctx.client.auth().login(username.as_str(), password).await?;

    if ctx.json_output {
        return ctx.print_json(&json!({ "authenticated": true, "username": username }));
    }
    let green = Style::new().green();
    println!("{} Signed in as {}", green.apply_to("✓"), username);
    println!(
        "{}",
        Style::new()
            .dim()
            .apply_to("The session lasts for this process only; pass --username to other commands.")
    );
    Ok(())
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    ctx.client.auth().logout().await?;

    if ctx.json_output {
        return ctx.print_json(&json!({ "authenticated": false }));
    }
    println!("Signed out. Cached resources cleared.");
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let status = ctx.client.auth().check().await?;
    let session = ctx.client.session();

    if ctx.json_output {
        return ctx.print_json(&json!({
            "authenticated": status.authenticated,
            "refresh_available": status.refresh_available,
            "detail": status.detail,
            "session": {
                "valid": !session.is_expired,
                "refreshing": session.is_refreshing,
                "consecutive_failures": session.consecutive_failures,
                "renewals": session.attempts,
            }
        }));
    }

    heading("Auth Status");
    let state = if status.authenticated {
        Style::new().green().apply_to("authenticated")
    } else {
        Style::new().red().apply_to("not authenticated")
    };
    println!("  Backend:          {}", state);
    println!("  Renewal possible: {}", status.refresh_available);
    if let Some(detail) = &status.detail {
        println!("  Detail:           {}", detail);
    }
    println!("  Local session:    {}", if session.is_expired { "expired" } else { "valid" });
    if ctx.verbose {
        println!("  Renewals:         {}", session.attempts);
        println!("  Failures:         {}", session.consecutive_failures);
    }
    Ok(())
}

async fn cmd_whoami(ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let me = ctx.client.auth().me().await?;

    if ctx.json_output {
        return ctx.print_json(&me);
    }
    heading("Profile");
    println!("  Username: {}", me.username);
    if !me.email.is_empty() {
        println!("  Email:    {}", me.email);
    }
    let name = format!("{} {}", me.first_name, me.last_name);
    if !name.trim().is_empty() {
        println!("  Name:     {}", name.trim());
    }
    if me.is_staff {
        println!("  Staff:    yes");
    }
    Ok(())
}

async fn cmd_renew(ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let outcome = ctx.client.auth().renew().await;
    let session = ctx.client.session();

    if ctx.json_output {
        return ctx.print_json(&json!({
            "renewed": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
            "consecutive_failures": session.consecutive_failures,
            "expired": session.is_expired,
        }));
    }
    match outcome {
        Ok(()) => {
            println!("{} Session renewed", Style::new().green().apply_to("✓"));
            Ok(())
        }
        Err(e) => bail!("Renewal failed: {}", e),
    }
}
