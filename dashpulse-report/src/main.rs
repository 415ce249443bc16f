//! dashpulse-report - Dashboard usage report CLI
//!
//! Reads visit, user directory and org unit exports from JSON files and
//! prints who used a dashboard, when, and how well each district is
//! covered.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use dashpulse_core::analytics::{
    flagged_users, generate_report, AccessRecency, LoginStatus, RecencyThresholds, Report,
    ReportInputs, ReportQuery, UserRecency,
};
use dashpulse_core::format::{format_date, format_relative_time_opt};
use dashpulse_core::ingest::{
    parse_timestamp, DirectoryParser, FeedParser, OrgUnitParser, ParseResult, VisitRowParser,
};
use dashpulse_core::{local_date, Config, DirectoryFilter, ReportWindow};

#[derive(Parser, Debug)]
#[command(name = "dashpulse-report")]
#[command(about = "Dashboard usage analytics report")]
#[command(version)]
struct Args {
    /// Visit export (SQL view grid or array of rows)
    #[arg(long)]
    visits: PathBuf,

    /// User directory export
    #[arg(long)]
    users: Option<PathBuf>,

    /// Org unit export (tree or level listing)
    #[arg(long)]
    org_units: Option<PathBuf>,

    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Last day of the window (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Report the N days ending on the --as-of date instead of --start/--end
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Reference time for recency (RFC 3339 or YYYY-MM-DD, default: now)
    #[arg(long)]
    as_of: Option<String>,

    /// Org unit level to report engagement for
    #[arg(long)]
    level: Option<u32>,

    /// Number of top users to list
    #[arg(long)]
    top: Option<usize>,

    /// Dashboard id, used as a label
    #[arg(long)]
    dashboard: Option<String>,

    /// Only users in this group (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,

    /// Only users in or below this org unit (repeatable)
    #[arg(long = "org-unit")]
    org_unit_filter: Vec<String>,

    /// Keep disabled user accounts
    #[arg(long)]
    include_disabled: bool,

    /// List users by login status: never, inactive (repeatable)
    #[arg(long = "login-status")]
    login_status: Vec<String>,

    /// Export format (md = markdown, json = JSON)
    #[arg(long)]
    export: Option<String>,

    /// Config file (default: ~/.config/dashpulse/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    let _log_guard = dashpulse_core::logging::init(&config.logging).ok();

    // Validate arguments before touching any file
    let export = ExportFormat::parse(args.export.as_deref())?;
    let offset = config.report.offset();
    let as_of = match &args.as_of {
        Some(raw) => parse_timestamp(raw, &offset)
            .with_context(|| format!("invalid --as-of '{}', use RFC 3339 or YYYY-MM-DD", raw))?,
        None => Utc::now(),
    };
    let window = match args.days {
        Some(days) => {
            if args.start.is_some() || args.end.is_some() {
                anyhow::bail!("--days cannot be combined with --start or --end");
            }
            ReportWindow::trailing_days(local_date(as_of, &offset), days)
                .context("invalid --days window")?
        }
        None => parse_window(args.start.as_deref(), args.end.as_deref())?,
    };
    let statuses = args
        .login_status
        .iter()
        .map(|s| parse_login_status(s))
        .collect::<Result<Vec<_>>>()?;

    // Load feeds
    let visit_rows = load_feed(&VisitRowParser::new(), &args.visits)?;
    let directory = match &args.users {
        Some(path) => load_feed(&DirectoryParser::new(offset), path)?,
        None => Vec::new(),
    };
    let org_units = match &args.org_units {
        Some(path) => load_feed(&OrgUnitParser::new(), path)?,
        None => Vec::new(),
    };

    let filter = DirectoryFilter::new()
        .with_user_groups(args.groups.iter().cloned())
        .with_org_units(args.org_unit_filter.iter().cloned())
        .include_disabled(args.include_disabled);

    let inputs = ReportInputs {
        visit_rows,
        directory: filter.apply(&directory),
        org_units,
    };

    let mut query = ReportQuery::new(as_of).with_window(window);
    if let Some(dashboard) = &args.dashboard {
        query = query.with_dashboard(dashboard.clone());
    }
    if let Some(level) = args.level {
        query = query.with_org_unit_level(level);
    }
    if let Some(top) = args.top {
        query = query.with_top_users(top);
    }

    let report = generate_report(&query, &inputs, &config);

    let thresholds = RecencyThresholds::from(&config.recency);
    let flagged: Option<Vec<UserRecency>> = if statuses.is_empty() {
        None
    } else {
        Some(flagged_users(&inputs.directory, &statuses, as_of, &thresholds))
    };
    let flagged = flagged.as_deref();

    match export {
        ExportFormat::Json => print_json(&report, flagged)?,
        ExportFormat::Markdown => print_markdown(&report, flagged),
        ExportFormat::Terminal => print_terminal(&report, flagged),
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Terminal,
    Markdown,
    Json,
}

impl ExportFormat {
    fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Ok(ExportFormat::Terminal),
            Some("md") => Ok(ExportFormat::Markdown),
            Some("json") => Ok(ExportFormat::Json),
            Some(other) => anyhow::bail!("Unknown export format: {}. Use 'md' or 'json'", other),
        }
    }
}

fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<ReportWindow> {
    let (Some(start), Some(end)) = (start, end) else {
        anyhow::bail!("Both --start and --end are required (format: YYYY-MM-DD), or use --days");
    };
    let start = parse_date(start, "--start")?;
    let end = parse_date(end, "--end")?;
    ReportWindow::new(start, end).context("invalid reporting window")
}

fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date '{}'. Use YYYY-MM-DD", flag, raw))
}

fn parse_login_status(raw: &str) -> Result<LoginStatus> {
    match raw {
        "never" => Ok(LoginStatus::NeverLoggedIn),
        "inactive" => Ok(LoginStatus::Inactive),
        other => anyhow::bail!("Unknown login status: {}. Use 'never' or 'inactive'", other),
    }
}

/// Parse one feed file, logging and reporting dropped records.
fn load_feed<P: FeedParser>(parser: &P, path: &Path) -> Result<Vec<P::Record>> {
    let ParseResult {
        records,
        skipped,
        warnings,
    } = parser
        .parse_file(path)
        .with_context(|| format!("failed to read {} feed from {}", parser.feed(), path.display()))?;

    for warning in &warnings {
        tracing::warn!(feed = %parser.feed(), "{}", warning);
    }
    if skipped > 0 {
        eprintln!(
            "warning: skipped {} malformed {} record(s) in {}",
            skipped,
            parser.feed(),
            path.display()
        );
    }
    Ok(records)
}

fn window_label(report: &Report) -> String {
    match &report.window {
        Some(w) => format!("{} to {}", format_date(w.start()), format_date(w.end())),
        None => "no window".to_string(),
    }
}

fn flagged_days(user: &UserRecency) -> String {
    match user.days_since_last_login {
        Some(days) => format!("{} days", days),
        None => "never logged in".to_string(),
    }
}

fn print_terminal(report: &Report, flagged: Option<&[UserRecency]>) {
    let title = match &report.dashboard_id {
        Some(id) => format!("Dashboard {}: {}", id, window_label(report)),
        None => format!("Dashboard usage: {}", window_label(report)),
    };

    // Header
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", title);
    println!("╰{}╯", "─".repeat(60));
    println!();

    let stats = &report.dashboard;
    if stats.total_visits == 0 {
        println!("  No visits found for this window.");
        println!();
    } else {
        println!("SUMMARY");
        println!(
            "   Visits:   {:<12} Users: {}",
            stats.total_visits, stats.unique_users
        );
        println!(
            "   Active days: {:<9} Busiest weekday: {}",
            stats.active_days(),
            stats.format_busiest_day()
        );
        println!();

        println!("TOP USERS");
        for (i, user) in stats.top_users.iter().enumerate() {
            let name = match (&user.first_name, &user.surname) {
                (Some(first), Some(last)) => format!("{} ({} {})", user.username, first, last),
                _ => user.username.clone(),
            };
            println!("   {}. {:<36} {} visits", i + 1, name, user.visits);
        }
        println!();

        println!("PEAK ACTIVITY");
        println!("   Day:   {}", stats.format_top_day());
        println!("   Week:  {}", stats.format_top_week());
        println!("   Month: {}", stats.format_top_month());
        println!();

        println!("USERS");
        for user in &report.linked_users {
            let marker = if user.matched { " " } else { "?" };
            println!(
                "  {}{:<20} {:>5} visits  last login {}",
                marker,
                user.display_name,
                user.visits,
                format_relative_time_opt(user.last_login, report.as_of)
            );
        }
        println!();
    }

    if report.recency_summary.total > 0 {
        println!("LOGIN RECENCY ({} users)", report.recency_summary.total);
        for recency in AccessRecency::ALL {
            println!(
                "   {:<18} {:>5}  ({}%)",
                recency.label(),
                report.recency_summary.count(recency),
                report.recency_summary.percent(recency)
            );
        }
        println!();
    }

    if !report.districts.is_empty() {
        println!("DISTRICT ENGAGEMENT");
        println!(
            "   {:<24} {:>6} {:>7} {:>7}  {:<11} {}",
            "Org unit", "Users", "Active", "Access", "Last", "Weekly"
        );
        for district in &report.districts {
            let weekly = if district.is_consistently_active {
                "consistent".to_string()
            } else {
                format!("{} active week(s)", district.active_weeks)
            };
            println!(
                "   {:<24} {:>6} {:>7} {:>7}  {:<11} {}",
                district.org_unit_name,
                district.total_users,
                district.active_users,
                district.access_percentage,
                district.last_activity,
                weekly
            );
        }
        println!();
    }

    if let Some(flagged) = flagged {
        println!("USERS BY LOGIN STATUS ({})", flagged.len());
        if flagged.is_empty() {
            println!("   No users match.");
        }
        for user in flagged {
            println!(
                "   {:<24} {:<9} {:<16} {}",
                user.display_name,
                user.activity_status,
                flagged_days(user),
                format_relative_time_opt(user.last_login, report.as_of)
            );
        }
        println!();
    }

    if !report.issues.is_empty() {
        println!("DATA ISSUES ({})", report.issues.len());
        for issue in &report.issues {
            println!("   - {}", issue);
        }
        println!();
    }
}

fn print_markdown(report: &Report, flagged: Option<&[UserRecency]>) {
    match &report.dashboard_id {
        Some(id) => println!("# Dashboard {} usage", id),
        None => println!("# Dashboard usage"),
    }
    println!();
    println!("*{}*", window_label(report));
    println!();

    let stats = &report.dashboard;
    if stats.total_visits == 0 {
        println!("*No visits found for this window.*");
        println!();
    } else {
        // Summary table
        println!("## Summary");
        println!();
        println!("| Metric | Value |");
        println!("|--------|-------|");
        println!("| Visits | {} |", stats.total_visits);
        println!("| Users | {} |", stats.unique_users);
        println!("| Active Days | {} |", stats.active_days());
        println!("| Busiest Day | {} |", stats.format_top_day());
        println!("| Busiest Week | {} |", stats.format_top_week());
        println!("| Busiest Month | {} |", stats.format_top_month());
        println!("| Busiest Weekday | {} |", stats.format_busiest_day());
        println!();

        println!("## Top Users");
        println!();
        for (i, user) in stats.top_users.iter().enumerate() {
            println!("{}. **{}** - {} visits", i + 1, user.username, user.visits);
        }
        println!();

        println!("## Users");
        println!();
        println!("| User | Visits | Last Visit | Roles | Groups | Org Units |");
        println!("|------|--------|------------|-------|--------|-----------|");
        for user in &report.linked_users {
            println!(
                "| {} | {} | {} | {} | {} | {} |",
                user.display_name,
                user.visits,
                user.last_visit.format("%Y-%m-%d %H:%M"),
                user.roles_display(),
                user.groups_display(),
                user.org_units_display()
            );
        }
        println!();
    }

    if report.recency_summary.total > 0 {
        println!("## Login Recency");
        println!();
        println!("| Last Login | Users | Share |");
        println!("|------------|-------|-------|");
        for recency in AccessRecency::ALL {
            println!(
                "| {} | {} | {}% |",
                recency.label(),
                report.recency_summary.count(recency),
                report.recency_summary.percent(recency)
            );
        }
        println!();
    }

    if !report.districts.is_empty() {
        println!("## District Engagement");
        println!();
        println!("| Org Unit | Users | Active | Access | Last Activity | Consistently Active |");
        println!("|----------|-------|--------|--------|---------------|---------------------|");
        for district in &report.districts {
            println!(
                "| {} | {} | {} | {} | {} | {} |",
                district.org_unit_name,
                district.total_users,
                district.active_users,
                district.access_percentage,
                district.last_activity,
                if district.is_consistently_active { "yes" } else { "no" }
            );
        }
        println!();
    }

    if let Some(flagged) = flagged {
        println!("## Users by Login Status");
        println!();
        if flagged.is_empty() {
            println!("*No users match.*");
        }
        for user in flagged {
            println!(
                "- {} ({}, {}, last login: {})",
                user.display_name,
                user.activity_status,
                flagged_days(user),
                format_relative_time_opt(user.last_login, report.as_of)
            );
        }
        println!();
    }

    if !report.issues.is_empty() {
        println!("## Data Issues");
        println!();
        for issue in &report.issues {
            println!("- {}", issue);
        }
        println!();
    }

    println!("---");
    println!("*Generated by dashpulse-report*");
}

/// `flaggedUsers` is present, possibly empty, whenever login statuses were requested.
fn print_json(report: &Report, flagged: Option<&[UserRecency]>) -> Result<()> {
    let mut json = serde_json::to_value(report).context("failed to serialize report")?;
    if let Some(flagged) = flagged {
        json["flaggedUsers"] = serde_json::to_value(flagged)?;
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
