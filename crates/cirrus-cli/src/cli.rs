//! CLI argument definitions for Cirrus.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `forecast` | Fetch and reconcile forecast records for a point |
//! | `alerts` | Full pass: fetch, reconcile, evaluate rules, enqueue alerts |
//! | `outbox` | Drain pending alerts or show delivery counts |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db` | `sqlite:cirrus.db` | Sqlite database URL |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Deterministic offline adapters |
//! | `--utc-offset-hours` | `9` | Civil zone of the target locations |
//!
//! # Examples
//!
//! ```bash
//! # Reconciled records for Seoul
//! cirrus forecast --lat 37.5665 --lon 126.9780 --pretty
//!
//! # Evaluate rules and enqueue alerts
//! cirrus alerts --lat 37.5665 --lon 126.9780 --name seoul
//!
//! # Deliver pending alerts
//! cirrus outbox drain
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Cirrus - weather forecast ingestion and alerting CLI
///
/// Fetches forecasts from heterogeneous upstreams, reconciles them into
/// canonical per-slot records with day-over-day deltas, evaluates alert
/// rules, and delivers alerts through a durable outbox.
#[derive(Debug, Parser)]
#[command(
    name = "cirrus",
    author,
    version,
    about = "Weather forecast ingestion and alerting CLI"
)]
pub struct Cli {
    /// Sqlite database URL for records and the alert outbox.
    #[arg(long, global = true, default_value = "sqlite:cirrus.db")]
    pub db: String,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use deterministic offline adapters instead of real upstreams.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Civil zone of the target locations, hours east of UTC.
    #[arg(long, global = true, default_value_t = 9)]
    pub utc_offset_hours: i8,

    #[command(subcommand)]
    pub command: Command,
}

/// Forecast provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderSelector {
    /// Grid-based hourly feed with issuance fallback.
    Kma,
    /// Point-based three-hourly feed.
    Openweather,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and reconcile forecast records for one point.
    ///
    /// Runs issuance selection and reconciliation, then prints the
    /// canonical records as JSON.
    ///
    /// # Examples
    ///
    ///   cirrus forecast --lat 37.5665 --lon 126.9780
    ///   cirrus forecast --lat 37.5665 --lon 126.9780 --provider openweather
    Forecast(ForecastArgs),

    /// Full alerting pass for one point.
    ///
    /// Fetches, reconciles, evaluates the threshold rules, and enqueues
    /// the resulting alerts in the outbox atomically with the records.
    ///
    /// # Examples
    ///
    ///   cirrus alerts --lat 37.5665 --lon 126.9780 --name seoul
    Alerts(ForecastArgs),

    /// Alert outbox management.
    Outbox(OutboxArgs),
}

/// Arguments shared by `forecast` and `alerts`.
#[derive(Debug, Args)]
pub struct ForecastArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Location name used in alert messages.
    #[arg(long, default_value = "unnamed")]
    pub name: String,

    /// Stable location identifier; also the broker partition key.
    #[arg(long, default_value_t = 1)]
    pub location_id: i64,

    /// Forecast provider to use.
    #[arg(long, value_enum, default_value_t = ProviderSelector::Kma)]
    pub provider: ProviderSelector,
}

/// Arguments for the `outbox` command group.
#[derive(Debug, Args)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub command: OutboxCommand,
}

/// Outbox subcommands.
#[derive(Debug, Subcommand)]
pub enum OutboxCommand {
    /// Publish pending alerts to the broker.
    ///
    /// Each alert gets up to three attempts; exhausted alerts go to the
    /// dead-letter topic and are marked FAILED.
    Drain(DrainArgs),

    /// Show per-status row counts.
    Status,
}

/// Arguments for `outbox drain`.
#[derive(Debug, Args)]
pub struct DrainArgs {
    /// HTTP endpoint to publish alerts to. Without it, drains to an
    /// in-process broker (useful with --mock).
    #[arg(long)]
    pub broker_url: Option<String>,

    /// Maximum alerts to claim in this drain.
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,
}
