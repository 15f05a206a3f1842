//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand: session resolution, scan state
//! loading and persistence, gate checks, backend calls, and output
//! formatting.
//!
//! Validation happens here before any request is issued (invalid ID,
//! amount below minimum, missing profile) so a doomed call never leaves
//! the process.

use anyhow::{bail, Result};
use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use bidreach::client::{MarketClient, PlaceBidRequest, Project, SearchQuery};
use bidreach::error::ApiError;
use bidreach::reconcile::apply_status_change;
use bidreach::refresh::RefreshGate;
use bidreach::scan::{BatchReport, Direction, ScanState};
use bidreach::session::{self, Identity, SessionConfig};
use bidreach::statefile;
use bidreach::tracker::{BidStatus, DateBucket, StatusCounts, TrackerSnapshot};

use super::{Cli, Commands};

/// Standing keyword list used when `search` is run without `--query`.
const DEFAULT_QUERY: &str = "logo design, website development, php, photoshop, wordpress, \
    ios development, mobile app development, react native, wordpress plugin, java, python, \
    banner design, seo, nodejs, shopify, reactjs, fullstack development, web api, mongodb, \
    flutter, frontend design, kubernetes, figma";

// ── Shared plumbing ─────────────────────────────────────────────

/// Resolve the backend URL and bearer token: explicit `--server` wins,
/// then the saved session. A missing session is fine for anonymous
/// operations; a missing server is not.
fn resolve_client(cli: &Cli) -> Result<MarketClient> {
    let saved = session::load_config().ok();
    let server = cli
        .server
        .clone()
        .or_else(|| saved.as_ref().map(|c| c.server.clone()))
        .ok_or_else(|| {
            anyhow::anyhow!("No backend configured. Pass --server or run `bidreach login`.")
        })?;
    let mut client = MarketClient::new(&server);
    if let Some(config) = saved {
        client = client.with_token(config.token);
    }
    Ok(client)
}

/// Viewer identity from the saved session, degrading to an anonymous
/// "user" role when the token cannot be decoded.
fn resolve_identity() -> Result<Identity> {
    let config = session::load_config()?;
    Ok(session::identity_from_token(&config.token, &config.email))
}

fn state_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.state_file {
        Some(path) => Ok(path.clone()),
        None => statefile::default_path(),
    }
}

fn validate_project_id(id: u64) -> Result<()> {
    if id < 1 {
        bail!("{}", ApiError::validation("Enter a valid project ID (minimum 1)"));
    }
    Ok(())
}

// ── Session ─────────────────────────────────────────────────────

pub fn run_login(cli: &Cli, email: &str, password: &str) -> Result<()> {
    let server = cli
        .server
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--server (or BIDREACH_SERVER) is required for login"))?;
    let client = MarketClient::new(&server);
    let response = client.login(email, password)?;
    if !response.success {
        bail!(
            "{}",
            response.error.unwrap_or_else(|| "Invalid credentials".to_string())
        );
    }
    session::save_config(&SessionConfig {
        server,
        token: response.token.clone(),
        email: email.to_string(),
    })?;
    let identity = session::identity_from_token(&response.token, email);
    info!(user_id = %identity.user_id, role = %identity.role, "logged in");
    println!("Logged in as {} ({})", identity.email, identity.role);
    Ok(())
}

pub fn run_logout() -> Result<()> {
    session::clear_config()?;
    println!("Session cleared");
    Ok(())
}

// ── Keyword search ──────────────────────────────────────────────

pub fn run_search(cli: &Cli) -> Result<()> {
    let Commands::Search {
        query,
        project_type,
        min_price,
        max_price,
        min_hourly,
        max_hourly,
        limit,
        watch,
    } = &cli.command
    else {
        unreachable!("dispatched from Commands::Search");
    };

    let keywords = query.as_deref().unwrap_or(DEFAULT_QUERY).trim().to_string();
    if keywords.is_empty() {
        bail!("{}", ApiError::validation("Search keywords must not be empty"));
    }
    let search = SearchQuery {
        query: keywords,
        project_type: project_type.clone(),
        min_price: *min_price,
        max_price: *max_price,
        min_hourly: *min_hourly,
        max_hourly: *max_hourly,
        limit: *limit,
    };

    let client = resolve_client(cli)?;
    let projects = client.keyword_search(&search)?;
    print_projects(&projects);

    if !watch {
        return Ok(());
    }

    // Watch mode: the gate decides when the next re-fetch is due, and it
    // never fires while a request is in flight. Ctrl-C to stop.
    let mut gate = RefreshGate::new();
    gate.arm(Utc::now());
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        let now = Utc::now();
        if !gate.try_fire(now) {
            continue;
        }
        match client.keyword_search(&search) {
            Ok(projects) => {
                println!("── refreshed {} ──", now.format("%H:%M:%S"));
                print_projects(&projects);
            }
            Err(e) => warn!(error = %e, "auto-refresh failed"),
        }
        gate.complete(Utc::now());
    }
}

// ── ID-based discovery ──────────────────────────────────────────

pub fn run_lookup(cli: &Cli, id: u64) -> Result<()> {
    validate_project_id(id)?;
    let client = resolve_client(cli)?;
    let path = state_path(cli)?;
    let mut state = statefile::load_or_default(&path);

    match client.single_project(id) {
        Ok(project) => {
            state.record_lookup(id, true);
            statefile::save(&path, &state)?;
            println!("Found project {id}");
            print_projects(std::slice::from_ref(&project));
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            state.record_lookup(id, false);
            statefile::save(&path, &state)?;
            println!("Project {id} does not exist or is not accessible");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn run_scan(cli: &Cli, anchor: u64) -> Result<()> {
    validate_project_id(anchor)?;
    let path = state_path(cli)?;
    let mut state = statefile::load_or_default(&path);
    if let Err(gate) = state.plan_batch(Utc::now()) {
        bail!("{gate}");
    }
    perform_batch(cli, &path, &mut state, anchor, Direction::Forward)
}

pub fn run_continue(cli: &Cli, direction: Direction) -> Result<()> {
    let path = state_path(cli)?;
    let mut state = statefile::load_or_default(&path);
    let planned = match direction {
        Direction::Forward => state.plan_continue_forward(Utc::now()),
        Direction::Backward => state.plan_continue_backward(Utc::now()),
    };
    let anchor = match planned {
        Ok(anchor) => anchor,
        Err(gate) => bail!("{gate}"),
    };
    perform_batch(cli, &path, &mut state, anchor, direction)
}

/// Issue one batch scan and record its outcome. The cursor is only touched
/// after the call resolves, and the cooldown starts on both paths.
fn perform_batch(
    cli: &Cli,
    path: &Path,
    state: &mut ScanState,
    anchor: u64,
    direction: Direction,
) -> Result<()> {
    let client = resolve_client(cli)?;
    info!(anchor, direction = direction.as_str(), "batch scan");

    match client.scan_with_id(anchor, direction) {
        Ok(outcome) => {
            state.record_batch(
                &BatchReport {
                    start_id: outcome.start_id,
                    last_checked_id: outcome.last_checked_id,
                    total_found: outcome.total_found,
                    direction: outcome.direction,
                },
                Utc::now(),
            );
            statefile::save(path, state)?;
            println!(
                "Found {} projects (ID range {} - {}, checked {} IDs, last {})",
                outcome.total_found,
                outcome.start_id,
                outcome.end_id,
                outcome.checked_ids.len(),
                outcome.last_checked_id,
            );
            print_projects(&outcome.projects);
            if state.end_of_range {
                println!("End of range: fewer than a full batch came back");
            }
            Ok(())
        }
        Err(failure) => {
            state.record_batch_failure(anchor, direction, failure.last_checked_id, Utc::now());
            statefile::save(path, state)?;
            if failure.kind.is_not_found() {
                println!(
                    "{} (searched from ID {anchor} {}, last checked {})",
                    failure.kind,
                    direction.as_str(),
                    state.last_checked_id.unwrap_or(anchor),
                );
                Ok(())
            } else {
                Err(failure.into())
            }
        }
    }
}

pub fn run_status(cli: &Cli) -> Result<()> {
    let path = state_path(cli)?;
    let state = statefile::load_or_default(&path);
    let now = Utc::now();

    let fmt = |v: Option<u64>| v.map_or_else(|| "none".to_string(), |id| id.to_string());
    println!("start id:        {}", fmt(state.start_id));
    println!("last checked id: {}", fmt(state.last_checked_id));
    println!("direction:       {}", state.direction.as_str());
    println!("last results:    {}", state.last_result_count);
    println!("end of range:    {}", state.end_of_range);
    println!(
        "cooldown:        {}",
        match state.cooldown.remaining_seconds(now) {
            0 => "ready".to_string(),
            secs => format!("{secs}s remaining"),
        }
    );
    println!("next anchor:     {}", fmt(state.forward_anchor()));
    println!("prev anchor:     {}", fmt(state.backward_anchor()));
    Ok(())
}

// ── Bid tracking ────────────────────────────────────────────────

pub fn run_tracker(
    cli: &Cli,
    year: Option<i32>,
    month: Option<u32>,
    selected_user: Option<&str>,
) -> Result<()> {
    let identity = resolve_identity()?;
    let client = resolve_client(cli)?;
    let now = Utc::now();
    let snapshot = client.fetch_tracker(
        year.unwrap_or_else(|| now.year()),
        month.unwrap_or_else(|| now.month()),
        &identity.user_id,
        &identity.role,
    )?;
    print_snapshot(&snapshot, selected_user);
    Ok(())
}

pub fn run_set_status(
    cli: &Cli,
    bid_id: &str,
    status: &str,
    date_key: &str,
    selected_user: Option<&str>,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    let Some(new_status) = BidStatus::parse(status) else {
        bail!(
            "{}",
            ApiError::validation(format!(
                "Unknown status '{status}' (expected pending, bid_seen, response_received, or awarded)"
            ))
        );
    };

    let identity = resolve_identity()?;
    let client = resolve_client(cli)?;
    let now = Utc::now();
    let snapshot = client.fetch_tracker(
        year.unwrap_or_else(|| now.year()),
        month.unwrap_or_else(|| now.month()),
        &identity.user_id,
        &identity.role,
    )?;

    // Local aggregates are only patched after the backend acknowledges
    // the write; a refusal leaves the snapshot untouched.
    if !client.update_bid_status(bid_id, new_status)? {
        bail!("Backend refused the status update for bid {bid_id}");
    }
    let owner = selected_user.or(match &snapshot {
        TrackerSnapshot::Admin(_) => None,
        TrackerSnapshot::User(_) => Some(identity.user_id.as_str()),
    });
    let patched = apply_status_change(&snapshot, bid_id, new_status, date_key, owner);
    info!(bid_id, status = new_status.as_str(), "status updated");
    println!("Bid {bid_id} set to {}", new_status.as_str());
    print_snapshot(&patched, selected_user);
    Ok(())
}

// ── Proposals ───────────────────────────────────────────────────

pub fn run_generate(cli: &Cli, id: u64, graphics: bool, details: Option<&Path>) -> Result<()> {
    validate_project_id(id)?;
    let user_details = match details {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => serde_json::json!({}),
    };
    let client = resolve_client(cli)?;
    let project = client.single_project(id)?;
    let bid = client.generate_bid(&project, &user_details, graphics)?;
    println!("{bid}");
    Ok(())
}

pub fn run_place_bid(
    cli: &Cli,
    id: u64,
    amount: f64,
    period: u32,
    profile: &str,
    profile_name: Option<&str>,
    text: Option<&str>,
) -> Result<()> {
    validate_project_id(id)?;
    if amount < 5.0 {
        bail!("{}", ApiError::validation("Enter a valid bid amount (minimum $5)"));
    }
    if period < 1 {
        bail!("{}", ApiError::validation("Enter a valid delivery time (minimum 1 day)"));
    }
    if profile.is_empty() {
        bail!("{}", ApiError::validation("Select a profile before placing the bid"));
    }
    let identity = resolve_identity()?;

    let client = resolve_client(cli)?;
    let project = client.single_project(id)?;
    let bid_text = match text {
        Some(text) => text.to_string(),
        None => client.generate_bid(&project, &serde_json::json!({}), false)?,
    };

    let request = PlaceBidRequest {
        project_id: project.id,
        bid: bid_text,
        amount,
        period,
        project_title: project.title.clone(),
        project_url: project.url(),
        user_id: identity.user_id.clone(),
        user_email: identity.email.clone(),
        role: identity.role.clone(),
        profile_id: profile.to_string(),
        profile_name: profile_name.unwrap_or(profile).to_string(),
    };

    match client.place_bid(&request) {
        Ok(response) => {
            println!(
                "{}",
                response.message.unwrap_or_else(|| "Bid placed".to_string())
            );
            Ok(())
        }
        Err(ApiError::RateLimited { retry_after_secs }) => {
            bail!(
                "Bid service is rate limited, retry in {}s",
                retry_after_secs.unwrap_or(60)
            );
        }
        Err(e) => Err(e.into()),
    }
}

// ── Output ──────────────────────────────────────────────────────

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects");
        return;
    }
    for project in projects {
        let avg = project
            .suggested_amount()
            .map_or_else(String::new, |amount| format!(" (~${amount:.0})"));
        println!("{:>10}  {}{}", project.id, project.title, avg);
        println!("{:>10}  {}", "", project.url());
    }
}

fn print_counts(label: &str, counts: &StatusCounts) {
    println!(
        "{label}: {} pending, {} seen, {} responded, {} awarded",
        counts.pending, counts.bid_seen, counts.response_received, counts.awarded
    );
}

fn print_date_bucket(bucket: &DateBucket) {
    print_counts(&format!("  {}", bucket.date), &bucket.status_counts);
    for bid in &bucket.bids {
        println!(
            "    [{}] {} (${:.0}, {})",
            bid.status.as_str(),
            bid.title,
            bid.amount,
            bid.id
        );
    }
}

fn print_snapshot(snapshot: &TrackerSnapshot, selected_user: Option<&str>) {
    match snapshot {
        TrackerSnapshot::Admin(snap) => {
            for user in &snap.users {
                if selected_user.is_some_and(|id| id != user.user_id) {
                    continue;
                }
                println!("{} ({} bids)", user.username, user.total_bids);
                print_counts("  totals", &user.status_counts);
                for bucket in user.dates.values() {
                    print_date_bucket(bucket);
                }
            }
        }
        TrackerSnapshot::User(snap) => {
            print_counts("month totals", &snap.month_totals.status_counts);
            for bucket in snap.dates.values() {
                print_date_bucket(bucket);
            }
        }
    }
}
