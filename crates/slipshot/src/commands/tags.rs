//! Tags command - category management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use super::{Context, heading};

/// Arguments for the tags command.
#[derive(Args, Debug)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    /// List tags
    List {
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Create a tag
    Add {
        /// Tag name
        name: String,
    },

    /// Rename a tag
    Rename {
        /// Tag ID
        id: i64,
        /// New name
        name: String,
    },

    /// Delete a tag
    Delete {
        /// Tag ID
        id: i64,
    },
}

/// Run the tags command.
pub async fn run(args: TagsArgs, ctx: &Context) -> Result<()> {
    ctx.ensure_session().await?;
    let tags = ctx.client.tags();
    let green = Style::new().green();

    match args.command {
        TagsCommand::List { refresh } => {
            let list = if refresh {
                tags.refresh().await?
            } else {
                tags.list().await?
            };
            if ctx.json_output {
                return ctx.print_json(&list);
            }
            heading("Tags");
            if list.is_empty() {
                println!("{}", Style::new().dim().apply_to("No tags yet"));
            }
            for tag in &list {
                println!("  {:>5}  {}", tag.id, tag.name);
            }
        }
        TagsCommand::Add { name } => {
            let tag = tags.create(name).await?;
            if ctx.json_output {
                return ctx.print_json(&tag);
            }
            println!("{} Tag created: {} ({})", green.apply_to("✓"), tag.name, tag.id);
        }
        TagsCommand::Rename { id, name } => {
            let tag = tags.rename(id, name).await?;
            if ctx.json_output {
                return ctx.print_json(&tag);
            }
            println!("{} Tag {} renamed to {}", green.apply_to("✓"), tag.id, tag.name);
        }
        TagsCommand::Delete { id } => {
            tags.delete(id).await?;
            if ctx.json_output {
                return ctx.print_json(&json!({ "deleted": id }));
            }
            println!("{} Tag {} deleted", green.apply_to("✓"), id);
        }
    }
    Ok(())
}
