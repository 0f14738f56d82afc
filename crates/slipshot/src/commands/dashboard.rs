//! Dashboard command - period aggregates.

use anyhow::Result;
use clap::Args;
use console::Style;
use slipshot_client::{DashboardQuery, PeriodType};

use super::{Context, heading, truncate};

/// Arguments for the dashboard command.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Period granularity: day, week, month or year (default: saved preference)
    #[arg(long)]
    pub period: Option<PeriodType>,

    /// Period value, e.g. 2025-01 for a month (omit for all time)
    #[arg(long)]
    pub value: Option<String>,

    /// Remember this period as the default
    #[arg(long)]
    pub save: bool,

    /// Bypass the cache
    #[arg(long)]
    pub refresh: bool,
}

/// Run the dashboard command.
pub async fn run(args: DashboardArgs, ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let dashboard = ctx.client.dashboard();

    let query = match args.period {
        Some(period_type) => DashboardQuery {
            period_type,
            period_value: args.value,
        },
        None => {
            let mut saved = dashboard.saved_query();
            if args.value.is_some() {
                saved.period_value = args.value;
            }
            saved
        }
    };
    if args.save {
        dashboard.save_query(&query)?;
    }

    let data = if args.refresh {
        dashboard.refresh(&query).await?
    } else {
        dashboard.get(&query).await?
    };
    if ctx.json_output {
        return ctx.print_json(&data);
    }

    let dim = Style::new().dim();
    let title = match &query.period_value {
        Some(value) => format!("Dashboard ({} {})", query.period_type.as_str(), value),
        None => "Dashboard (all time)".to_string(),
    };
    heading(&title);
    println!("  Income:  {}", Style::new().green().apply_to(format!("{:.2}", data.income)));
    println!("  Expense: {}", Style::new().red().apply_to(format!("{:.2}", data.expense)));
    println!("  Balance: {:.2}", data.balance);
    println!("  Slips:   {}", data.slip_count);

    if !data.tag_breakdown.is_empty() {
        println!();
        println!("{}", console::style("By tag").bold());
        for entry in &data.tag_breakdown {
            println!(
                "  {:<24} {:>10.2} {}",
                truncate(&entry.tag_name, 24),
                entry.amount,
                dim.apply_to(format!("({})", entry.count))
            );
        }
    }

    if ctx.verbose && !data.recent_slips.is_empty() {
        println!();
        println!("{}", console::style("Recent").bold());
        for slip in &data.recent_slips {
            println!(
                "  {} {:>10.2} {}",
                dim.apply_to(&slip.date),
                slip.amount,
                truncate(&slip.account_name, 30)
            );
        }
    }
    Ok(())
}
