//! Probe command - step-by-step authentication diagnostics.
//!
//! Signs in, checks the session, loads the profile, renews the session
//! explicitly and checks again, reporting each step as it goes. A failing
//! step does not stop the later ones.

use std::time::Instant;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use serde::Serialize;
use slipshot_session::{RenewError, RenewResult};

use super::{Context, heading, read_password};

/// Arguments for the probe command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Skip the explicit renewal step
    #[arg(long)]
    pub no_renew: bool,
}

/// Result of one probe step.
#[derive(Debug, Serialize)]
pub struct Step {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
    pub elapsed_ms: u128,
}

/// Run the probe command.
pub async fn run(args: ProbeArgs, ctx: &Context) -> Result<()> {
    let Some(username) = &ctx.username else {
        bail!("Pass --username (or set SLIPSHOT_USERNAME) to probe the login flow");
    };
    let password = read_password(username)?;
    let auth = ctx.client.auth();
    let mut steps = Vec::new();

    if !ctx.json_output {
        heading(&format!("Probing {}", ctx.config.server().base_url));
    }

    let started = Instant::now();
    let login = auth.login(username.as_str(), password).await;
    steps.push(report(
        ctx,
        Step {
            name: "login",
            ok: login.is_ok(),
            detail: match &login {
                Ok(()) => format!("signed in as {}", username),
                Err(e) => e.to_string(),
            },
            elapsed_ms: started.elapsed().as_millis(),
        },
    ));

    steps.push(check_step(ctx, "auth check").await);

    let started = Instant::now();
    let me = auth.me().await;
    steps.push(report(
        ctx,
        Step {
            name: "profile",
            ok: me.is_ok(),
            detail: match &me {
                Ok(profile) => format!("user {} (id {})", profile.username, profile.id),
                Err(e) => e.to_string(),
            },
            elapsed_ms: started.elapsed().as_millis(),
        },
    ));

    if !args.no_renew {
        let started = Instant::now();
        let renewed = auth.renew().await;
        steps.push(report(
            ctx,
            Step {
                name: "renew",
                ok: renewed.is_ok(),
                detail: describe_renewal(&renewed),
                elapsed_ms: started.elapsed().as_millis(),
            },
        ));
        steps.push(check_step(ctx, "auth check after renew").await);
    }

    let failed = steps.iter().filter(|s| !s.ok).count();
    if ctx.json_output {
        ctx.print_json(&steps)?;
    } else {
        let session = ctx.client.session();
        println!();
        println!(
            "{}",
            Style::new().dim().apply_to(format!(
                "renewals: {}, consecutive failures: {}, session {}",
                session.attempts,
                session.consecutive_failures,
                if session.is_expired { "expired" } else { "valid" }
            ))
        );
    }

    if failed > 0 {
        bail!("{} of {} probe steps failed", failed, steps.len());
    }
    Ok(())
}

async fn check_step(ctx: &Context, name: &'static str) -> Step {
    let started = Instant::now();
    let status = ctx.client.auth().check().await;
    let step = Step {
        name,
        ok: matches!(&status, Ok(s) if s.authenticated),
        detail: match &status {
            Ok(s) if s.authenticated => "authenticated".to_string(),
            Ok(s) if s.refresh_available => "not authenticated, renewal available".to_string(),
            Ok(s) => s
                .detail
                .clone()
                .unwrap_or_else(|| "not authenticated".to_string()),
            Err(e) => e.to_string(),
        },
        elapsed_ms: started.elapsed().as_millis(),
    };
    report(ctx, step)
}

fn describe_renewal(result: &RenewResult) -> String {
    match result {
        Ok(()) => "session renewed".to_string(),
        Err(RenewError::Cooldown { remaining }) => {
            format!("in cooldown for another {}ms", remaining.as_millis())
        }
        Err(e) => e.to_string(),
    }
}

fn report(ctx: &Context, step: Step) -> Step {
    if !ctx.json_output {
        let mark = if step.ok {
            Style::new().green().apply_to("✓")
        } else {
            Style::new().red().apply_to("✗")
        };
        let dim = Style::new().dim();
        println!(
            "{} {:<24} {} {}",
            mark,
            step.name,
            step.detail,
            dim.apply_to(format!("({}ms)", step.elapsed_ms))
        );
    }
    step
}
