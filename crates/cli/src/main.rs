//! Operator CLI for restoring archived log chunks.

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::io::Write;
use std::path::{Path, PathBuf};
use thaw_core::config::AppConfig;
use thaw_core::{ChunkRef, Leniency, MatcherExpression, TimeRange};
use thaw_reconciler::{CancellationToken, ReconcileOptions, ReconcileRequest, Reconciler};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `THAW_` variables consumed by flags rather than the config tree.
const FLAG_ENV_KEYS: &[&str] = &["config", "tenants", "from", "to", "query"];

#[derive(Parser)]
#[command(name = "thawctl")]
#[command(about = "Restore archived log chunks from object storage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Config file path (TOML). Environment variables override file values.
    #[arg(long, env = "THAW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct SelectionArgs {
    /// Tenant to reconcile (repeatable or comma-separated)
    #[arg(long = "tenant", env = "THAW_TENANTS", value_delimiter = ',', required = true)]
    tenants: Vec<String>,

    /// Window start (RFC 3339)
    #[arg(long, env = "THAW_FROM", value_parser = parse_rfc3339)]
    from: OffsetDateTime,

    /// Window end (RFC 3339, inclusive)
    #[arg(long, env = "THAW_TO", value_parser = parse_rfc3339)]
    to: OffsetDateTime,

    /// Stream selector, optionally followed by a pipeline (ignored)
    #[arg(long, env = "THAW_QUERY", value_parser = parse_query)]
    query: MatcherExpression,
}

impl SelectionArgs {
    fn range(&self) -> Result<TimeRange> {
        TimeRange::from_datetimes(self.from, self.to).context("invalid time window")
    }

    /// Tenants in flag order with repeats removed.
    fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = Vec::with_capacity(self.tenants.len());
        for tenant in &self.tenants {
            let tenant = tenant.trim();
            if !tenants.iter().any(|seen| seen == tenant) {
                tenants.push(tenant.to_string());
            }
        }
        tenants
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe matching chunks and restore the archived ones
    Restore {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Days restored copies stay readable (default: 3)
        #[arg(long, allow_negative_numbers = true)]
        retention_days: Option<i64>,

        /// Retrieval tier: Standard or Bulk (default: Standard)
        #[arg(long)]
        tier: Option<String>,

        /// Maximum concurrent object store calls
        #[arg(long)]
        concurrency: Option<usize>,

        /// Probe and report only
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Reject out-of-range retention and unknown tiers instead of adjusting them
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// List matching chunk references and their storage keys as JSON lines
    Chunks {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the storage key of one chunk reference
    Key {
        #[arg(long)]
        tenant: String,

        /// Stream fingerprint (hex)
        #[arg(long, value_parser = parse_hex_u64)]
        fingerprint: u64,

        /// First sample timestamp (ms)
        #[arg(long, allow_negative_numbers = true)]
        from: i64,

        /// Last sample timestamp (ms)
        #[arg(long, allow_negative_numbers = true)]
        through: i64,

        /// Chunk checksum (hex)
        #[arg(long, value_parser = parse_hex_u32)]
        checksum: u32,
    },
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| format!("invalid RFC 3339 time: {e}"))
}

fn parse_query(value: &str) -> Result<MatcherExpression, String> {
    MatcherExpression::parse(value).map_err(|e| e.to_string())
}

fn parse_hex_u64(value: &str) -> Result<u64, String> {
    let digits = value.trim_start_matches("0x");
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value: {e}"))
}

fn parse_hex_u32(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0x");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { command } = Cli::parse();

    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match command {
        Commands::Restore {
            selection,
            retention_days,
            tier,
            concurrency,
            dry_run,
            strict,
            format,
            config,
        } => {
            let overrides = RestoreOverrides {
                retention_days,
                tier,
                concurrency,
                dry_run,
                strict,
            };
            handle_restore_command(&selection, overrides, format, &config).await
        }
        Commands::Chunks { selection, config } => {
            handle_chunks_command(&selection, &config).await
        }
        Commands::Key {
            tenant,
            fingerprint,
            from,
            through,
            checksum,
        } => handle_key_command(tenant, fingerprint, from, through, checksum),
    }
}

/// Restore settings given on the command line.
struct RestoreOverrides {
    retention_days: Option<i64>,
    tier: Option<String>,
    concurrency: Option<usize>,
    dry_run: bool,
    strict: bool,
}

impl RestoreOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(days) = self.retention_days {
            config.restore.retention_days = days;
        }
        if let Some(tier) = self.tier {
            config.restore.tier = tier;
        }
        if let Some(concurrency) = self.concurrency {
            config.restore.concurrency = concurrency;
        }
        if self.dry_run {
            config.restore.dry_run = true;
        }
        if self.strict {
            config.restore.leniency = Leniency::Strict;
        }
    }
}

async fn handle_restore_command(
    selection: &SelectionArgs,
    overrides: RestoreOverrides,
    format: OutputFormat,
    config_args: &ConfigArgs,
) -> Result<()> {
    let mut config = load_config(config_args.config.as_deref())?;
    overrides.apply(&mut config);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    let range = selection.range()?;

    let store = thaw_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    if let Err(e) = store.health_check().await {
        tracing::warn!(
            storage = store.backend_name(),
            error = %e,
            "Storage health check failed, objects will be probed individually"
        );
    }
    let index = thaw_index::from_config(&config.index);
    tracing::info!(
        storage = store.backend_name(),
        index = index.backend_name(),
        "Backends ready"
    );

    let reconciler = Reconciler::new(index, store, ReconcileOptions::from_config(&config.restore));
    let request = ReconcileRequest {
        retention_days: config.restore.retention_days,
        tier: config.restore.tier.clone(),
        ..ReconcileRequest::new(selection.tenants(), range, selection.query.clone())
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, letting in-flight requests finish");
                cancel.cancel();
            }
        }
    });

    let report = reconciler
        .reconcile(request, cancel)
        .await
        .context("reconciliation failed")?;

    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Text => write!(stdout, "{}", output::TextReport(&report))?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

async fn handle_chunks_command(selection: &SelectionArgs, config_args: &ConfigArgs) -> Result<()> {
    let config = load_config(config_args.config.as_deref())?;
    let range = selection.range()?;
    let index = thaw_index::from_config(&config.index);

    let mut stdout = std::io::stdout().lock();
    for tenant in selection.tenants() {
        let groups = index
            .resolve(&tenant, range, &selection.query)
            .await
            .with_context(|| format!("failed to resolve chunks for tenant {tenant}"))?;
        for chunk in groups.into_iter().flatten() {
            serde_json::to_writer(&mut stdout, &output::chunk_line(&chunk))?;
            writeln!(stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn handle_key_command(
    tenant: String,
    fingerprint: u64,
    from: i64,
    through: i64,
    checksum: u32,
) -> Result<()> {
    let chunk = ChunkRef::new(tenant, fingerprint, from, through, checksum)
        .context("invalid chunk reference")?;
    println!("{}", chunk.storage_key());
    Ok(())
}

/// Load configuration from an optional TOML file merged with `THAW_` env vars.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        tracing::info!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed("THAW_").ignore(FLAG_ENV_KEYS).split("__"))
        .extract()
        .context("failed to load configuration")
}
