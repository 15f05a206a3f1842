//! # Main — CLI Entry Point
//!
//! Routes subcommands to the execution functions in `cli.rs` and handles
//! the shared concerns: `.env` loading, structured logging, and the scan
//! state file location.
//!
//! ## Subcommands
//!
//! Project discovery: `search` (keyword, optionally watching on a 40-second
//! auto-refresh), `lookup` (exact single ID, exempt from the cooldown),
//! `scan` (batch of up to 20 forward from an anchor), `next` / `prev`
//! (cooldown-gated continues from the persisted cursor), `status` (local
//! cursor state). Bidding: `generate`, `place-bid`, `tracker`,
//! `set-status`. Session: `login`, `logout`.
//!
//! ## Global Options
//!
//! - `--server` / `BIDREACH_SERVER`: backend base URL; falls back to the
//!   saved session's server after login.
//! - `--state-file`: scan cursor + cooldown deadline location (default
//!   `~/.bidreach/scan.json`).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "bidreach", about = "Search marketplace projects and manage bids")]
struct Cli {
    /// Backend base URL (or set BIDREACH_SERVER env var)
    #[arg(long, env = "BIDREACH_SERVER")]
    server: Option<String>,

    /// Path to the scan state file (cursor + cooldown deadline)
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Keyword search with project-type and price filters
    Search {
        /// Search keywords (defaults to the standing keyword list)
        #[arg(long)]
        query: Option<String>,
        /// Project type: fixed or hourly
        #[arg(long, default_value = "fixed")]
        project_type: String,
        #[arg(long)]
        min_price: Option<i64>,
        #[arg(long)]
        max_price: Option<i64>,
        #[arg(long)]
        min_hourly: Option<i64>,
        #[arg(long)]
        max_hourly: Option<i64>,
        /// Maximum results to request
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Keep the search alive, re-fetching every 40 seconds
        #[arg(long)]
        watch: bool,
    },
    /// Look up one project by exact ID (exempt from the scan cooldown)
    Lookup {
        /// Project ID (minimum 1)
        id: u64,
    },
    /// Scan a batch of up to 20 projects forward from an anchor ID
    Scan {
        /// Anchor project ID (minimum 1)
        id: u64,
    },
    /// Continue the scan forward from the last checked ID
    Next,
    /// Continue the scan backward from the last checked ID
    Prev,
    /// Show the local scan cursor and cooldown state
    Status,
    /// Fetch the bid tracker for a month
    Tracker {
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
        /// User whose buckets to show in the admin shape
        #[arg(long)]
        user: Option<String>,
    },
    /// Update one bid's status and reconcile local aggregates
    SetStatus {
        /// Bid ID
        #[arg(long)]
        bid: String,
        /// New status: pending, bid_seen, response_received, or awarded
        #[arg(long)]
        status: String,
        /// ISO date key of the bucket holding the bid (e.g. 2024-05-01)
        #[arg(long)]
        date: String,
        /// Owning user ID (required for the admin shape)
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Generate AI proposal text for a project
    Generate {
        /// Project ID
        id: u64,
        /// Use the graphics-work prompt
        #[arg(long)]
        graphics: bool,
        /// JSON file with user details fed to the generator
        #[arg(long)]
        details: Option<PathBuf>,
    },
    /// Place a bid on a project
    PlaceBid {
        /// Project ID
        id: u64,
        /// Bid amount in dollars (minimum 5)
        #[arg(long)]
        amount: f64,
        /// Delivery time in days (minimum 1)
        #[arg(long, default_value_t = 2)]
        period: u32,
        /// Bidding profile ID (required)
        #[arg(long)]
        profile: String,
        /// Display name of the bidding profile
        #[arg(long)]
        profile_name: Option<String>,
        /// Proposal text; generated via the AI backend when omitted
        #[arg(long)]
        text: Option<String>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging: LOG_FORMAT=json for machine consumption,
    // human-readable on stderr otherwise.
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Login { email, password } => cli::run_login(&cli, email, password),
        Commands::Logout => cli::run_logout(),
        Commands::Search { .. } => cli::run_search(&cli),
        Commands::Lookup { id } => cli::run_lookup(&cli, *id),
        Commands::Scan { id } => cli::run_scan(&cli, *id),
        Commands::Next => cli::run_continue(&cli, bidreach::scan::Direction::Forward),
        Commands::Prev => cli::run_continue(&cli, bidreach::scan::Direction::Backward),
        Commands::Status => cli::run_status(&cli),
        Commands::Tracker { year, month, user } => {
            cli::run_tracker(&cli, *year, *month, user.as_deref())
        }
        Commands::SetStatus {
            bid,
            status,
            date,
            user,
            year,
            month,
        } => cli::run_set_status(&cli, bid, status, date, user.as_deref(), *year, *month),
        Commands::Generate {
            id,
            graphics,
            details,
        } => cli::run_generate(&cli, *id, *graphics, details.as_deref()),
        Commands::PlaceBid {
            id,
            amount,
            period,
            profile,
            profile_name,
            text,
        } => cli::run_place_bid(
            &cli,
            *id,
            *amount,
            *period,
            profile,
            profile_name.as_deref(),
            text.as_deref(),
        ),
    }
}
