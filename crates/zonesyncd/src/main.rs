// # zonesyncd - DNS Sync Daemon
//
// The zonesyncd daemon is a thin integration layer:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers
// 4. Running one reconcile cycle per interval until SIGINT/SIGTERM
//
// All synchronization logic lives in zonesync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### DNS Provider
// - `ZONESYNC_PROVIDER_TYPE`: Provider type (digitalocean, memory)
// - `ZONESYNC_PROVIDER_API_TOKEN`: API token (falls back to `DO_TOKEN`)
// - `ZONESYNC_PROVIDER_BASE_URL`: API base URL override (optional)
// - `ZONESYNC_MEMORY_ZONES`: Comma-separated zones (memory provider only)
//
// ### Desired State
// - `ZONESYNC_DESIRED_PATH`: JSON file holding an array of endpoints
// - `ZONESYNC_DOMAIN_FILTER`: Comma-separated zone suffixes (empty = all)
// - `ZONESYNC_POLICY`: sync, upsert-only (default) or create-only
//
// ### Engine
// - `ZONESYNC_INTERVAL_SECS`: Seconds between cycles (10-3600, default 60)
// - `ZONESYNC_ZONE_CONCURRENCY`: Zones processed in parallel (default 1)
// - `ZONESYNC_DRY_RUN`: Log mutations instead of issuing them
// - `ZONESYNC_ZONE_MISS`: log (default) or silent
// - `ZONESYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export ZONESYNC_PROVIDER_TYPE=digitalocean
// export DO_TOKEN=your_token
// export ZONESYNC_DOMAIN_FILTER=example.com
// export ZONESYNC_DESIRED_PATH=/etc/zonesync/desired.json
//
// zonesyncd
// ```

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use zonesync_core::{
    ApplyReport, CancelSignal, DomainFilter, EngineConfig, Endpoint, Plan, PlanPolicy,
    ProviderConfig, ProviderRegistry, SyncConfig, SyncEngine, ZoneMissPolicy, cancel_pair,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for an in-flight cycle to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    provider_type: String,
    provider_api_token: Option<String>,
    provider_base_url: Option<String>,
    memory_zones: Vec<String>,
    domain_filter: Vec<String>,
    desired_path: Option<PathBuf>,
    policy: PlanPolicy,
    interval_secs: u64,
    zone_concurrency: usize,
    dry_run: bool,
    zone_miss: ZoneMissPolicy,
    log_level: String,
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("{} must be true or false. Got: {}", key, other),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let policy = match lookup("ZONESYNC_POLICY").as_deref().map(str::trim) {
            None | Some("") | Some("upsert-only") => PlanPolicy::UpsertOnly,
            Some("sync") => PlanPolicy::Sync,
            Some("create-only") => PlanPolicy::CreateOnly,
            Some(other) => anyhow::bail!(
                "ZONESYNC_POLICY '{}' is not valid. Valid policies: sync, upsert-only, create-only",
                other
            ),
        };

        let zone_miss = match lookup("ZONESYNC_ZONE_MISS").as_deref().map(str::trim) {
            None | Some("") | Some("log") => ZoneMissPolicy::Log,
            Some("silent") => ZoneMissPolicy::Silent,
            Some(other) => anyhow::bail!(
                "ZONESYNC_ZONE_MISS '{}' is not valid. Valid values: log, silent",
                other
            ),
        };

        Ok(Self {
            provider_type: lookup("ZONESYNC_PROVIDER_TYPE")
                .unwrap_or_else(|| "digitalocean".to_string()),
            provider_api_token: lookup("ZONESYNC_PROVIDER_API_TOKEN")
                .or_else(|| lookup("DO_TOKEN"))
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            provider_base_url: lookup("ZONESYNC_PROVIDER_BASE_URL"),
            memory_zones: split_list(lookup("ZONESYNC_MEMORY_ZONES")),
            domain_filter: split_list(lookup("ZONESYNC_DOMAIN_FILTER")),
            desired_path: lookup("ZONESYNC_DESIRED_PATH").map(PathBuf::from),
            policy,
            interval_secs: lookup("ZONESYNC_INTERVAL_SECS")
                .map(|s| s.trim().parse())
                .transpose()
                .context("ZONESYNC_INTERVAL_SECS must be a number of seconds")?
                .unwrap_or(60),
            zone_concurrency: lookup("ZONESYNC_ZONE_CONCURRENCY")
                .map(|s| s.trim().parse())
                .transpose()
                .context("ZONESYNC_ZONE_CONCURRENCY must be a positive number")?
                .unwrap_or(1),
            dry_run: lookup("ZONESYNC_DRY_RUN")
                .map(|s| parse_bool("ZONESYNC_DRY_RUN", &s))
                .transpose()?
                .unwrap_or(false),
            zone_miss,
            log_level: lookup("ZONESYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "digitalocean" => {
                if self.provider_api_token.is_none() {
                    anyhow::bail!(
                        "ZONESYNC_PROVIDER_API_TOKEN (or DO_TOKEN) is required for the digitalocean provider. \
                        Set it via: export DO_TOKEN=your_token"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "ZONESYNC_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: digitalocean, memory",
                self.provider_type
            ),
        }

        match &self.desired_path {
            None => anyhow::bail!(
                "ZONESYNC_DESIRED_PATH is required. \
                Set it via: export ZONESYNC_DESIRED_PATH=/etc/zonesync/desired.json"
            ),
            Some(path) if !path.is_file() => anyhow::bail!(
                "ZONESYNC_DESIRED_PATH does not point to a file: {}",
                path.display()
            ),
            Some(_) => {}
        }

        if !(10..=3600).contains(&self.interval_secs) {
            anyhow::bail!(
                "ZONESYNC_INTERVAL_SECS must be between 10 and 3600 seconds. Got: {}",
                self.interval_secs
            );
        }

        if self.zone_concurrency == 0 || self.zone_concurrency > 64 {
            anyhow::bail!(
                "ZONESYNC_ZONE_CONCURRENCY must be between 1 and 64. Got: {}",
                self.zone_concurrency
            );
        }

        if let Some(url) = &self.provider_base_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!(
                "ZONESYNC_PROVIDER_BASE_URL must use HTTP or HTTPS scheme. Got: {}",
                url
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ZONESYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Core configuration for the engine and provider
    fn sync_config(&self) -> SyncConfig {
        let provider = match self.provider_type.as_str() {
            "memory" => ProviderConfig::Memory {
                zones: self.memory_zones.clone(),
                page_size: None,
            },
            _ => ProviderConfig::DigitalOcean {
                api_token: self.provider_api_token.clone().unwrap_or_default(),
                base_url: self.provider_base_url.clone(),
                page_size: None,
            },
        };

        SyncConfig::new(provider)
            .with_domain_filter(DomainFilter::new(&self.domain_filter))
            .with_engine(EngineConfig {
                zone_concurrency: self.zone_concurrency,
                dry_run: self.dry_run,
                zone_miss: self.zone_miss,
                ..EngineConfig::default()
            })
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting zonesyncd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => SyncExitCode::CleanShutdown,
            Err(e) if e.downcast_ref::<zonesync_core::Error>().is_some_and(is_startup_error) => {
                error!("Startup error: {:#}", e);
                SyncExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                SyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

fn is_startup_error(e: &zonesync_core::Error) -> bool {
    matches!(
        e,
        zonesync_core::Error::Credential(_) | zonesync_core::Error::Config(_)
    )
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Create provider registry with built-in providers
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "digitalocean")]
    {
        info!("Registering DigitalOcean provider");
        zonesync_provider_digitalocean::register(&registry);
    }

    let sync_config = config.sync_config();
    sync_config.validate()?;

    let provider = registry.create_provider(&sync_config.provider)?;
    info!("Provider: {}", provider.provider_name());
    if sync_config.domain_filter.is_empty() {
        warn!("No domain filter set, every zone of the account is managed");
    } else {
        info!("Managing zones under: {}", sync_config.domain_filter.suffixes().join(", "));
    }
    if sync_config.engine.dry_run {
        warn!("Running in DRY-RUN mode - no changes will be made");
    }

    let (engine, mut events) =
        SyncEngine::new(provider, sync_config.domain_filter, sync_config.engine)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Engine event");
        }
    });

    let desired_path = config
        .desired_path
        .clone()
        .context("ZONESYNC_DESIRED_PATH is required")?;
    let plan = Plan::new(config.policy);
    let interval = Duration::from_secs(config.interval_secs);

    let shutdown = shutdown_signal()?;
    let (cancel_handle, cancel) = cancel_pair();

    let worker = tokio::spawn(reconcile_loop(engine, plan, desired_path, interval, cancel));

    info!("Daemon initialized, reconciling every {}s", config.interval_secs);

    let signal = shutdown.await;
    info!("Received shutdown signal: {}", signal);
    cancel_handle.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, worker).await {
        Ok(Ok(())) => {
            info!("Shutting down daemon");
            Ok(())
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("Reconcile loop failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT)),
    }
}

/// Run a cycle on every tick until cancelled
async fn reconcile_loop(
    engine: SyncEngine,
    plan: Plan,
    desired_path: PathBuf,
    interval: Duration,
    mut cancel: CancelSignal,
) {
    let mut ticks = IntervalStream::new(tokio::time::interval(interval));
    let cycle_cancel = cancel.clone();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                match run_cycle(&engine, &plan, &desired_path, &cycle_cancel).await {
                    Ok(report) => info!(
                        created = report.created,
                        updated = report.updated,
                        deleted = report.deleted,
                        skipped = report.skipped,
                        "Cycle complete"
                    ),
                    Err(e) if is_cancelled(&e) => {
                        info!("Cycle cancelled");
                        break;
                    }
                    // The next cycle re-lists and re-plans from scratch
                    Err(e) => error!("Cycle failed: {:#}", e),
                }
            }
        }
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<zonesync_core::Error>(),
        Some(zonesync_core::Error::Cancelled)
    )
}

/// One reconcile pass: read desired state, observe, plan, apply
async fn run_cycle(
    engine: &SyncEngine,
    plan: &Plan,
    desired_path: &Path,
    cancel: &CancelSignal,
) -> Result<ApplyReport> {
    let desired = load_desired(desired_path).await?;
    debug!("Loaded {} desired endpoint(s)", desired.len());

    let report = engine.reconcile(&desired, plan, cancel).await?;
    Ok(report)
}

/// Read the desired endpoint list from a JSON file
async fn load_desired(path: &Path) -> Result<Vec<Endpoint>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read desired state {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse desired state {}", path.display()))
}

/// Resolve once SIGTERM or SIGINT is received
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Resolve once CTRL-C is received
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}
