//! CLI administration tool for linkbio.
//!
//! Provides commands for inspecting links and visits, running an expiration
//! sweep by hand, and performing database operations without going through the
//! HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Delete expired links now
//! cargo run --bin admin -- sweep
//!
//! # List a user's links
//! cargo run --bin admin -- links list --owner alice
//!
//! # Show recent visits for a link
//! cargo run --bin admin -- visits 42 --page-size 20
//!
//! # View totals
//! cargo run --bin admin -- stats
//!
//! # Check database connection / apply migrations
//! cargo run --bin admin -- db check
//! cargo run --bin admin -- db migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`, or `DB_HOST` / `DB_PORT` / `DB_USER` / `DB_PASSWORD` / `DB_NAME`
//! - `CLEANUP_TIMEOUT_SECS` (optional): deadline for `sweep`

use linkbio::api::dto::pagination::PaginationParams;
use linkbio::application::services::{CleanupService, LinkService, SweepOutcome, VisitService};
use linkbio::config::{Config, mask_connection_string};
use linkbio::infrastructure::persistence::{PgLinkRepository, PgVisitRepository};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing linkbio.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Delete all expired links now
    Sweep {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Inspect links
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// List visits recorded for a link
    Visits {
        /// Link ID
        link_id: String,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        page_size: i64,
    },

    /// Show totals
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link inspection subcommands.
#[derive(Subcommand)]
enum LinksAction {
    /// List links owned by a user, newest first
    List {
        /// Owning user identifier
        #[arg(short, long)]
        owner: String,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        page_size: i64,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = Config::load_database_url()?;

    let pool = PgPool::connect(&database_url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to database at {}",
                mask_connection_string(&database_url)
            )
        })?;

    match cli.command {
        Commands::Sweep { yes } => handle_sweep(&pool, yes).await?,
        Commands::Links { action } => handle_links_action(action, &pool).await?,
        Commands::Visits {
            link_id,
            page,
            page_size,
        } => list_visits(&pool, &link_id, page, page_size).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

fn limit_offset(page: i64, page_size: i64) -> (i64, i64) {
    PaginationParams {
        page: Some(page),
        page_size: Some(page_size),
    }
    .limit_offset()
}

/// Runs one expiration sweep after confirmation.
///
/// Uses the same bounded sweep as the server's background sweeper.
async fn handle_sweep(pool: &PgPool, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Sweep Expired Links".bright_blue().bold());
    println!();

    let expired: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM links WHERE expires_at IS NOT NULL AND expires_at < NOW()",
    )
    .fetch_one(pool)
    .await?;

    if expired == 0 {
        println!("{}", "  Nothing to sweep".yellow());
        return Ok(());
    }

    println!(
        "  Expired links: {}",
        expired.to_string().bright_yellow().bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete these links? Their visits are kept.")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let timeout_secs = std::env::var("CLEANUP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    let repo = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));
    let cleanup = CleanupService::new(
        repo,
        Duration::from_secs(timeout_secs),
        Duration::from_secs(timeout_secs),
    );

    match cleanup.sweep_once().await {
        SweepOutcome::Deleted(n) => {
            println!();
            println!(
                "{} {}",
                "✅ Deleted".green().bold(),
                format!("{} link(s)", n).bright_white().bold()
            );
        }
        SweepOutcome::Failed => anyhow::bail!("Sweep failed, see log output"),
        SweepOutcome::TimedOut => anyhow::bail!("Sweep timed out after {}s", timeout_secs),
    }
    println!();

    Ok(())
}

/// Dispatches link inspection commands.
async fn handle_links_action(action: LinksAction, pool: &PgPool) -> Result<()> {
    match action {
        LinksAction::List {
            owner,
            page,
            page_size,
        } => list_links(pool, &owner, page, page_size).await,
    }
}

/// Lists a user's links.
///
/// # Output Format
///
/// ```text
/// 🔗 Links for alice
///
///   ID     Title                     Clicks   Expires
///   ────────────────────────────────────────────────────────────
///   12     Portfolio                 57       never
///   9      Old promo                 3        2024-01-16 14:20
/// ```
async fn list_links(pool: &PgPool, owner: &str, page: i64, page_size: i64) -> Result<()> {
    println!(
        "{} {}",
        "🔗 Links for".bright_blue().bold(),
        owner.cyan().bold()
    );
    println!();

    let service = LinkService::new(Arc::new(PgLinkRepository::new(Arc::new(pool.clone()))));
    let (limit, offset) = limit_offset(page, page_size);

    let links = service
        .list_links(owner, limit, offset)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list links: {}", e))?;

    if links.is_empty() {
        println!("{}", "  No links found".yellow());
        return Ok(());
    }

    println!(
        "  {:<6} {:<25} {:<8} {:<16}",
        "ID".bright_white().bold(),
        "Title".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "Expires".bright_white().bold()
    );
    println!("  {}", "─".repeat(60).bright_black());

    for link in &links {
        let expires = match link.expires_at {
            None => "never".bright_black(),
            Some(_) if link.is_expired() => "expired".red(),
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string().normal(),
        };

        println!(
            "  {:<6} {:<25} {:<8} {}",
            link.id.to_string().bright_black(),
            truncate(&link.title, 25).cyan(),
            link.clicks.to_string().bright_green(),
            expires
        );
    }

    println!();
    println!(
        "  Page {} · {} link(s)",
        page.max(1),
        links.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Lists recent visits for a link, including links that were since deleted.
async fn list_visits(pool: &PgPool, link_id: &str, page: i64, page_size: i64) -> Result<()> {
    println!(
        "{} {}",
        "👣 Visits for link".bright_blue().bold(),
        link_id.cyan().bold()
    );
    println!();

    let pool = Arc::new(pool.clone());
    let service = VisitService::new(
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgVisitRepository::new(pool)),
    );
    let (limit, offset) = limit_offset(page, page_size);

    let visits = service
        .list_visits(link_id, limit, offset)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list visits: {}", e))?;

    if visits.is_empty() {
        println!("{}", "  No visits recorded".yellow());
        return Ok(());
    }

    println!(
        "  {:<20} {:<16} {:<30} {}",
        "Time".bright_white().bold(),
        "IP".bright_white().bold(),
        "Referrer".bright_white().bold(),
        "User agent".bright_white().bold()
    );
    println!("  {}", "─".repeat(90).bright_black());

    for visit in &visits {
        println!(
            "  {:<20} {:<16} {:<30} {}",
            visit
                .visited_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .bright_black(),
            visit.ip.cyan(),
            truncate(&visit.referrer, 30),
            truncate(&visit.user_agent, 40).bright_black()
        );
    }

    println!();

    Ok(())
}

/// Displays system statistics.
///
/// Shows:
/// - Total number of links, and how many are past expiry
/// - Total number of recorded visits
/// - Visits whose link no longer exists
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await?;

    let expired_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM links WHERE expires_at IS NOT NULL AND expires_at < NOW()",
    )
    .fetch_one(pool)
    .await?;

    let visits_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
        .fetch_one(pool)
        .await?;

    let orphaned_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM visits v WHERE NOT EXISTS (SELECT 1 FROM links l WHERE l.id = v.link_id)",
    )
    .fetch_one(pool)
    .await?;

    println!(
        "  Links:           {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Awaiting sweep:  {}",
        expired_count.to_string().bright_yellow().bold()
    );
    println!(
        "  Visits:          {}",
        visits_count.to_string().bright_green().bold()
    );
    println!(
        "  Orphaned visits: {}",
        orphaned_count.to_string().bright_black().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
        DbAction::Migrate => {
            println!("{}", "📦 Applying migrations...".bright_blue());

            sqlx::migrate!("./migrations")
                .run(pool)
                .await
                .context("Failed to run migrations")?;

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}

/// Shortens `s` to at most `max` characters, marking the cut with `…`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }

    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
