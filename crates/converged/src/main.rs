// # converged - desired-state applier
//
// Thin integration layer around converge-core:
// 1. Read configuration from environment variables
// 2. Construct the collection client and executor
// 3. Reconcile every record set in the plan file
// 4. Report per-record outcomes and exit
//
// DO NOT add reconciliation, retry, or locking logic here; all of that lives
// in converge-core. This binary only wires configuration to the library.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Account
// - `CONVERGE_ACCOUNT_NAME`: Name of the hosting account
// - `CONVERGE_PRIVATE_KEY`: Contents of the private key used to authenticate
// - `CONVERGE_ACCESS_TOKEN`: Temporary access token (alternative to the key)
// - `CONVERGE_READ_ONLY`: Set to "1" to disable API write calls
// - `CONVERGE_TEST_MODE`: Set to "1" to use the remote API's test mode
//
// ### Client
// - `CONVERGE_CLIENT_TYPE`: Collection client backend (memory)
// - `CONVERGE_SEED_PATH`: JSON file seeding the memory backend's collections
//
// ### Plan
// - `CONVERGE_PLAN_PATH`: JSON file with the desired DNS record sets
//
// ### Executor
// - `CONVERGE_TIMEOUT_SECS`: Retry deadline per record set
// - `CONVERGE_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export CONVERGE_ACCOUNT_NAME=demo
// export CONVERGE_ACCESS_TOKEN=token123
// export CONVERGE_PLAN_PATH=/etc/converge/plan.json
//
// converged
// ```

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use converge_core::config::{ApiMode, AuthConfig, ClientConfig, RetryConfig};
use converge_core::resources::{DnsEntry, DnsRecordSet, DnsRecordSpec};
use converge_core::traits::Resource;
use converge_core::{KeyedMutex, ReconcileEvent, Reconciler};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean apply
/// - 1: Configuration or startup error
/// - 2: Runtime error (apply failures)
#[derive(Debug, Clone, Copy)]
enum AppExitCode {
    /// All record sets converged
    CleanApply = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// One or more record sets failed to converge
    RuntimeError = 2,
}

impl From<AppExitCode> for ExitCode {
    fn from(code: AppExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    account_name: String,
    private_key: Option<String>,
    access_token: Option<String>,
    read_only: bool,
    test_mode: bool,
    client_type: String,
    seed_path: Option<String>,
    plan_path: String,
    timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            account_name: env::var("CONVERGE_ACCOUNT_NAME")
                .context("CONVERGE_ACCOUNT_NAME is required")?,
            private_key: env::var("CONVERGE_PRIVATE_KEY").ok(),
            access_token: env::var("CONVERGE_ACCESS_TOKEN").ok(),
            read_only: env_bool("CONVERGE_READ_ONLY"),
            test_mode: env_bool("CONVERGE_TEST_MODE"),
            client_type: env::var("CONVERGE_CLIENT_TYPE").unwrap_or_else(|_| "memory".to_string()),
            seed_path: env::var("CONVERGE_SEED_PATH").ok(),
            plan_path: env::var("CONVERGE_PLAN_PATH").context("CONVERGE_PLAN_PATH is required")?,
            timeout_secs: env::var("CONVERGE_TIMEOUT_SECS")
                .ok()
                .map(|s| s.parse().context("CONVERGE_TIMEOUT_SECS must be a number"))
                .transpose()?,
            log_level: env::var("CONVERGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Build the library client configuration
    fn client_config(&self) -> Result<ClientConfig> {
        let auth = resolve_auth(self.private_key.clone(), self.access_token.clone())?;
        let config = ClientConfig {
            account_name: self.account_name.clone(),
            auth,
            mode: if self.read_only {
                ApiMode::ReadOnly
            } else {
                ApiMode::ReadWrite
            },
            test_mode: self.test_mode,
        };
        config.validate()?;
        Ok(config)
    }

    fn retry_config(&self) -> RetryConfig {
        let mut retry = RetryConfig::default();
        if let Some(timeout_secs) = self.timeout_secs {
            retry.timeout_secs = timeout_secs;
        }
        retry
    }
}

fn env_bool(key: &str) -> bool {
    env::var(key).map(|v| v == "1").unwrap_or(false)
}

/// Pick the credential method; exactly one must be configured
fn resolve_auth(private_key: Option<String>, access_token: Option<String>) -> Result<AuthConfig> {
    match (private_key, access_token) {
        (Some(_), Some(_)) => {
            bail!("CONVERGE_PRIVATE_KEY and CONVERGE_ACCESS_TOKEN are mutually exclusive")
        }
        (Some(pem), None) => Ok(AuthConfig::PrivateKey { pem }),
        (None, Some(token)) => Ok(AuthConfig::AccessToken { token }),
        (None, None) => {
            bail!("either CONVERGE_PRIVATE_KEY or CONVERGE_ACCESS_TOKEN must be provided")
        }
    }
}

/// Desired record sets to apply
#[derive(Debug, serde::Deserialize)]
struct Plan {
    records: Vec<DnsRecordSpec>,
}

impl Plan {
    fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file {}", path))?;
        let plan: Plan = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse plan file {}", path))?;
        if plan.records.is_empty() {
            bail!("plan file {} contains no records", path);
        }
        Ok(plan)
    }
}

/// Seed collections for the memory backend, keyed by domain
#[derive(Debug, Default, serde::Deserialize)]
struct Seed {
    #[serde(default)]
    zones: HashMap<String, Vec<DnsEntry>>,
}

impl Seed {
    fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse seed file {}", path))
    }
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Log reconciliation events as they arrive
fn spawn_event_logger(
    mut events: tokio::sync::mpsc::Receiver<ReconcileEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ReconcileEvent::AttemptStarted { key, attempt } => {
                    info!("{}: attempt {}", key, attempt);
                }
                ReconcileEvent::AttemptFailed {
                    key,
                    error,
                    retryable,
                } => {
                    if retryable {
                        info!("{}: transient failure, will retry: {}", key, error);
                    } else {
                        warn!("{}: failed: {}", key, error);
                    }
                }
                ReconcileEvent::Converged { key, removed, added } => {
                    info!("{}: converged (-{} +{})", key, removed, added);
                }
                ReconcileEvent::Unchanged { key } => {
                    info!("{}: already up to date", key);
                }
                ReconcileEvent::TimedOut { key, last_error } => {
                    warn!("{}: gave up retrying: {}", key, last_error);
                }
            }
        }
    })
}

/// Apply the plan through the memory backend
#[cfg(feature = "memory")]
async fn apply_with_memory_client(config: &Config, plan: Plan) -> Result<usize> {
    use converge_client_memory::MemoryCollectionClient;

    let client_config = config.client_config()?;
    if client_config.test_mode {
        info!("test mode enabled, changes are not billable");
    }

    let client: MemoryCollectionClient<DnsEntry> =
        MemoryCollectionClient::with_mode(client_config.mode);
    if let Some(seed_path) = &config.seed_path {
        let seed = Seed::load(seed_path)?;
        for (domain, entries) in seed.zones {
            client.seed(&domain, entries).await;
        }
    }

    let retry = config.retry_config();
    retry.validate()?;

    let locks = Arc::new(KeyedMutex::new());
    let (reconciler, events) = Reconciler::new(Arc::new(client.clone()), locks)
        .with_policy(retry.policy())
        .with_event_channel(1000);
    let logger = spawn_event_logger(events);

    let resource = DnsRecordSet::new(Arc::new(reconciler));

    let mut failures = 0usize;
    for spec in plan.records {
        let id = spec.record_id();
        match resource.update(&id, &spec).await {
            Ok(()) => match resource.read(&id).await {
                Ok(Some(state)) => {
                    info!("{}: {} entries, ttl {}", id, state.content.len(), state.expire);
                }
                Ok(None) => info!("{}: removed", id),
                Err(e) => {
                    error!("{}: converged but read-back failed: {}", id, e);
                    failures += 1;
                }
            },
            Err(e) => {
                error!("{}: {}", id, e);
                failures += 1;
            }
        }
    }

    drop(resource);
    let _ = logger.await;

    Ok(failures)
}

async fn run(config: Config) -> Result<usize> {
    let plan = Plan::load(&config.plan_path)?;
    info!(
        "applying {} record set(s) for account {}",
        plan.records.len(),
        config.account_name
    );

    match config.client_type.as_str() {
        #[cfg(feature = "memory")]
        "memory" => apply_with_memory_client(&config, plan).await,
        other => bail!("unsupported client type: {}", other),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging may not be configured yet; print directly
            eprintln!("configuration error: {:#}", e);
            return AppExitCode::ConfigError.into();
        }
    };
    init_logging(&config.log_level);

    match run(config).await {
        Ok(0) => {
            info!("all record sets converged");
            AppExitCode::CleanApply.into()
        }
        Ok(failures) => {
            error!("{} record set(s) failed to converge", failures);
            AppExitCode::RuntimeError.into()
        }
        Err(e) => {
            error!("apply aborted: {:#}", e);
            AppExitCode::ConfigError.into()
        }
    }
}
