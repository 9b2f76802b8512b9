//! # mnemon
//!
//! Command-line entry point: loads settings, opens the log database, installs
//! the logging pipeline and runs a subcommand.

#![deny(unsafe_code)]

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mnemon_logstore::LogPage;
use mnemon_settings::MnemonSettings;

/// mnemon log and configuration tool.
#[derive(Parser, Debug)]
#[command(name = "mnemon", about = "mnemon log and configuration tool")]
struct Cli {
    /// Settings file (defaults to `~/.mnemon/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log database (overrides `logging.dbPath`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored log rows for a server, newest first.
    Logs {
        /// Server to list; empty lists rows logged without a server.
        #[arg(long, default_value = "")]
        server: String,

        /// Minimum level (trace, debug, info, warn, error).
        #[arg(long, default_value = "")]
        level: String,

        /// Page size (0 for the default page size).
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Rows to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Print `{"rows": [...], "total": N}` instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the response mode in effect for a channel.
    Mode {
        /// Server the channel belongs to.
        #[arg(long, default_value = "")]
        server: String,

        /// Channel to resolve.
        #[arg(long, default_value = "")]
        channel: String,
    },
}

fn load_settings(cli: &Cli) -> Result<MnemonSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(mnemon_settings::settings_path);
    let mut settings = mnemon_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(db_path) = &cli.db_path {
        settings.logging.db_path.clone_from(db_path);
    }
    Ok(settings)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let store = Arc::new(
        mnemon_logstore::open_store(&settings.logging).with_context(|| {
            format!(
                "Failed to open log database {}",
                settings.logging.db_path.display()
            )
        })?,
    );
    let _log_guard = mnemon_logstore::init_subscriber(&settings.logging, Arc::clone(&store))
        .context("Failed to initialize logging")?;

    match cli.command {
        Command::Logs {
            server,
            level,
            limit,
            offset,
            json,
        } => {
            let page = store
                .list(&server, &level, limit, offset)
                .context("Failed to list logs")?;
            tracing::debug!(
                server = %server,
                rows = page.rows.len(),
                total = page.total,
                "listed logs"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print!("{}", render_table(&page));
            }
        }
        Command::Mode { server, channel } => {
            println!("{}", settings.resolve_response_mode(&server, &channel));
        }
    }
    Ok(())
}

/// Render a page as aligned columns followed by a row count line.
fn render_table(page: &LogPage) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<24}  {:<5}  {:<20}  {:<20}  {}",
        "ID", "TIME", "LEVEL", "SERVER", "CHANNEL", "MESSAGE"
    );
    for row in &page.rows {
        let _ = write!(
            out,
            "{:>6}  {:<24}  {:<5}  {:<20}  {:<20}  {}",
            row.id,
            row.ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            row.level,
            row.server_id.as_deref().unwrap_or("-"),
            row.channel_id.as_deref().unwrap_or("-"),
            row.msg,
        );
        if !row.attrs.is_empty() {
            let _ = write!(out, "  {}", row.attrs);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "({} of {} rows)", page.rows.len(), page.total);
    out
}
