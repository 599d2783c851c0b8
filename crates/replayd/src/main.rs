// # replayd - Replay Catalog Daemon
//
// This daemon is a thin integration layer. All catalog logic lives in
// replay-core; nothing here decides what a pass does.
//
// The replayd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering resolvers and catalog stores
// 4. Starting the catalog engine and stopping it on SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Replays
// - `REPLAY_DIRECTORY`: Directory holding the replay files
// - `REPLAY_UPDATE_INTERVAL_SECS`: Seconds between periodic passes (default 60, 0 disables)
//
// ### Participant Resolver
// - `REPLAY_RESOLVER_TYPE`: Resolver type (development, postgres)
// - `REPLAY_POSTGRES_CONNECTION_STRING`: Connection string (for postgres), either a
//   `postgres://` URL or `Host=..;Username=..;Password=..;Database=..` pairs
// - `REPLAY_POSTGRES_TIMEOUT_SECS`: Connect + query timeout (for postgres, default 30)
//
// ### Catalog Store
// - `REPLAY_CATALOG_STORE_TYPE`: Type of catalog store (file, memory)
// - `REPLAY_CATALOG_PATH`: Path to catalog file (for file store)
//
// ### Logging
// - `REPLAY_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export REPLAY_DIRECTORY=/srv/ss14/replays
// export REPLAY_RESOLVER_TYPE=postgres
// export REPLAY_POSTGRES_CONNECTION_STRING=postgres://replays@db/ss14
// export REPLAY_CATALOG_STORE_TYPE=file
// export REPLAY_CATALOG_PATH=/var/lib/replayd/catalog.json
//
// replayd
// ```

use anyhow::Result;
use replay_core::{CatalogConfig, CatalogEngine, CatalogStoreConfig, ComponentRegistry, ResolverConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ReplaydExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ReplaydExitCode> for ExitCode {
    fn from(code: ReplaydExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    replay_directory: Option<PathBuf>,
    update_interval_secs: u64,
    resolver_type: String,
    postgres_connection_string: Option<String>,
    postgres_timeout_secs: u64,
    catalog_store_type: String,
    catalog_path: Option<PathBuf>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            replay_directory: var("REPLAY_DIRECTORY").map(PathBuf::from),
            update_interval_secs: parse_var(&var, "REPLAY_UPDATE_INTERVAL_SECS")?.unwrap_or(60),
            resolver_type: var("REPLAY_RESOLVER_TYPE").unwrap_or_else(|| "development".to_string()),
            postgres_connection_string: var("REPLAY_POSTGRES_CONNECTION_STRING"),
            postgres_timeout_secs: parse_var(&var, "REPLAY_POSTGRES_TIMEOUT_SECS")?.unwrap_or(30),
            catalog_store_type: var("REPLAY_CATALOG_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            catalog_path: var("REPLAY_CATALOG_PATH").map(PathBuf::from),
            log_level: var("REPLAY_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// A missing replay directory or connection string is NOT rejected here:
    /// the engine reports both on every pass and keeps pruning meanwhile.
    fn validate(&self) -> Result<()> {
        match self.resolver_type.as_str() {
            "development" | "postgres" => {}
            _ => anyhow::bail!(
                "REPLAY_RESOLVER_TYPE '{}' is not supported. \
                Supported types: development, postgres",
                self.resolver_type
            ),
        }

        match self.catalog_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "REPLAY_CATALOG_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.catalog_store_type
            ),
        }

        if self.catalog_store_type == "file" && self.catalog_path.is_none() {
            anyhow::bail!(
                "REPLAY_CATALOG_PATH is required when REPLAY_CATALOG_STORE_TYPE=file. \
                Set it via: export REPLAY_CATALOG_PATH=/var/lib/replayd/catalog.json"
            );
        }

        if self.resolver_type == "postgres" && self.postgres_timeout_secs == 0 {
            anyhow::bail!("REPLAY_POSTGRES_TIMEOUT_SECS must be greater than 0");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "REPLAY_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the engine configuration
    fn catalog_config(&self) -> CatalogConfig {
        let resolver = match self.resolver_type.as_str() {
            "postgres" => ResolverConfig::Postgres {
                connection_string: self.postgres_connection_string.clone(),
                query_timeout_secs: self.postgres_timeout_secs,
            },
            _ => ResolverConfig::Development,
        };

        let catalog_store = match (self.catalog_store_type.as_str(), &self.catalog_path) {
            ("file", Some(path)) => CatalogStoreConfig::File { path: path.clone() },
            _ => CatalogStoreConfig::Memory,
        };

        CatalogConfig::new(self.replay_directory.clone().unwrap_or_default())
            .with_update_interval_secs(self.update_interval_secs)
            .with_resolver(resolver)
            .with_catalog_store(catalog_store)
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional numeric variable
fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", name, value, e))
        })
        .transpose()
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ReplaydExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ReplaydExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ReplaydExitCode::ConfigError.into();
    }

    info!("Starting replayd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ReplaydExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, shutdown) = match start_daemon(&config).await {
            Ok(started) => started,
            Err(e) => {
                error!("Startup error: {}", e);
                return ReplaydExitCode::ConfigError;
            }
        };

        if let Err(e) = engine.run_until(shutdown.recv()).await {
            error!("Daemon error: {}", e);
            ReplaydExitCode::RuntimeError
        } else {
            ReplaydExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the engine and install signal handlers
async fn start_daemon(config: &Config) -> Result<(CatalogEngine, ShutdownSignal)> {
    let registry = ComponentRegistry::with_builtins();

    #[cfg(feature = "postgres")]
    {
        info!("Registering PostgreSQL resolver");
        replay_roster_postgres::register(&registry);
    }

    let catalog_config = config.catalog_config();
    catalog_config.validate()?;

    info!("Resolver type: {}", catalog_config.resolver.type_name());
    info!("Catalog store type: {}", catalog_config.catalog_store.type_name());

    let catalog = registry
        .create_catalog_store(&catalog_config.catalog_store)
        .await?;
    let resolver = registry.create_resolver(&catalog_config.resolver)?;

    let replay_directory = catalog_config.replay_directory.clone();
    if replay_directory.as_os_str().is_empty() {
        warn!("REPLAY_DIRECTORY is not set, every pass will fail until it is configured");
    } else {
        info!("Replay directory: {}", replay_directory.display());
    }

    let (engine, mut events) = CatalogEngine::new(catalog, resolver, catalog_config)?;

    #[cfg(feature = "notify")]
    let engine = if replay_directory.as_os_str().is_empty() {
        engine
    } else {
        engine.with_trigger(Box::new(replay_trigger_notify::NotifyTrigger::new(
            replay_directory,
        )))
    };

    // Events are only logged here; drains until the engine is dropped
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let shutdown = ShutdownSignal::install()?;

    info!("Daemon initialized successfully");
    Ok((engine, shutdown))
}

/// Shutdown signal handlers (SIGTERM, SIGINT)
///
/// Installed before the engine starts so that a failure to set them up is a
/// startup error rather than a daemon that cannot be stopped cleanly.
#[cfg(unix)]
struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self { sigterm, sigint })
    }

    async fn recv(mut self) {
        let signal = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", signal);
    }
}

/// Shutdown signal handler (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignal;

#[cfg(not(unix))]
impl ShutdownSignal {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
