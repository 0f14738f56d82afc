//! Slips command - transaction listing and entry.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use console::Style;
use serde_json::json;
use slipshot_client::{CreateSlipRequest, Slip, SlipQuery, SlipType, UpdateSlipRequest};

use super::{Context, heading, truncate};

/// Arguments for the slips command.
#[derive(Args, Debug)]
pub struct SlipsArgs {
    #[command(subcommand)]
    pub command: SlipsCommand,
}

/// Transaction direction as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Kind {
    Income,
    Expense,
}

impl From<Kind> for SlipType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Income => SlipType::Income,
            Kind::Expense => SlipType::Expense,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SlipsCommand {
    /// List slips
    List {
        /// Range start (YYYY-MM-DD), requires --end
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Range end (YYYY-MM-DD), requires --start
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Only slips with this tag ID
        #[arg(long)]
        tag: Option<i64>,

        /// Only income or expense slips
        #[arg(long, value_enum)]
        kind: Option<Kind>,

        /// Maximum slips to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Show a single slip
    Show {
        /// Slip ID
        id: i64,
    },

    /// Record a slip
    Add {
        /// Decimal amount, e.g. 120.50
        amount: String,

        /// Transaction date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Counterparty account name
        #[arg(long)]
        account: Option<String>,

        /// Tag ID
        #[arg(long)]
        tag: Option<i64>,

        /// Income or expense
        #[arg(long, value_enum, default_value = "expense")]
        kind: Kind,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// Change fields of a slip
    Edit {
        /// Slip ID
        id: i64,

        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        account: Option<String>,

        #[arg(long)]
        tag: Option<i64>,

        #[arg(long, value_enum)]
        kind: Option<Kind>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a slip
    Delete {
        /// Slip ID
        id: i64,
    },
}

/// Run the slips command.
pub async fn run(args: SlipsArgs, ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let slips = ctx.client.slips();
    let green = Style::new().green();

    match args.command {
        SlipsCommand::List {
            start,
            end,
            tag,
            kind,
            limit,
            refresh,
        } => {
            let query = SlipQuery {
                start,
                end,
                tag,
                slip_type: kind.map(SlipType::from),
            };
            let list = if refresh {
                slips.refresh(&query).await?
            } else {
                slips.list(&query).await?
            };
            if ctx.json_output {
                return ctx.print_json(&list);
            }

            heading("Slips");
            let dim = Style::new().dim();
            if list.is_empty() {
                println!("{}", dim.apply_to("No slips found"));
            }
            for slip in list.iter().take(limit) {
                print_row(slip);
            }
            if list.len() > limit {
                println!();
                println!("{}", dim.apply_to(format!("... and {} more", list.len() - limit)));
            }
        }
        SlipsCommand::Show { id } => {
            let slip = slips.get(id).await?;
            if ctx.json_output {
                return ctx.print_json(&slip);
            }
            heading("Slip");
            println!("  ID:      {}", slip.id);
            println!("  Account: {}", slip.account_name);
            println!("  Amount:  {} ({})", slip.amount, slip.slip_type.as_str());
            match &slip.time {
                Some(time) => println!("  When:    {} {}", slip.date, time),
                None => println!("  When:    {}", slip.date),
            }
            if let Some(tag) = &slip.tag {
                println!("  Tag:     {}", tag.name);
            }
            if !slip.note.is_empty() {
                println!("  Note:    {}", slip.note);
            }
        }
        SlipsCommand::Add {
            amount,
            date,
            account,
            tag,
            kind,
            note,
        } => {
            let slip = slips
                .create(CreateSlipRequest {
                    account_name: account,
                    amount,
                    date,
                    note,
                    tag_id: tag,
                    slip_type: Some(kind.into()),
                    ..Default::default()
                })
                .await?;
            if ctx.json_output {
                return ctx.print_json(&slip);
            }
            println!("{} Slip recorded: {}", green.apply_to("✓"), slip.id);
        }
        SlipsCommand::Edit {
            id,
            amount,
            date,
            account,
            tag,
            kind,
            note,
        } => {
            let slip = slips
                .update(
                    id,
                    UpdateSlipRequest {
                        account_name: account,
                        amount,
                        date,
                        note,
                        tag_id: tag,
                        slip_type: kind.map(SlipType::from),
                        ..Default::default()
                    },
                )
                .await?;
            if ctx.json_output {
                return ctx.print_json(&slip);
            }
            println!("{} Slip {} updated", green.apply_to("✓"), slip.id);
        }
        SlipsCommand::Delete { id } => {
            slips.delete(id).await?;
            if ctx.json_output {
                return ctx.print_json(&json!({ "deleted": id }));
            }
            println!("{} Slip {} deleted", green.apply_to("✓"), id);
        }
    }
    Ok(())
}

fn print_row(slip: &Slip) {
    let dim = Style::new().dim();
    let amount = match slip.slip_type {
        SlipType::Income => Style::new().green().apply_to(format!("+{:>10}", slip.amount)),
        SlipType::Expense => Style::new().red().apply_to(format!("-{:>10}", slip.amount)),
    };
    let tag = slip.tag.as_ref().map(|t| t.name.as_str()).unwrap_or("-");
    println!(
        "{} {} {}  {}",
        dim.apply_to(format!("[{:>5}] {}", slip.id, slip.date)),
        amount,
        truncate(&slip.account_name, 30),
        dim.apply_to(tag)
    );
}
