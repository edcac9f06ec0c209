//! Reconciliation run configuration.

use rand::distributions::Alphanumeric;
use rand::Rng;
use roster_core::{MergeOptions, ProtectedFields, RosterRow};
use roster_store::RetryConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Length of generated default credentials.
pub const GENERATED_CREDENTIAL_LEN: usize = 16;

/// Protected-field defaults applied to newly created entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateDefaults {
    /// Fixed credential for every new entry. A random one is generated per
    /// entry when unset.
    #[serde(default, skip_serializing)]
    pub default_credential: Option<String>,
    /// Positions (case-insensitive) that make a new entry a reward manager.
    #[serde(default)]
    pub manager_titles: Vec<String>,
    /// Reward budget granted to new managers.
    #[serde(default)]
    pub manager_budget: Decimal,
}

impl CreateDefaults {
    /// Whether `position` is one of the configured manager titles.
    #[must_use]
    pub fn is_manager_position(&self, position: Option<&str>) -> bool {
        let Some(position) = position.map(str::trim).filter(|p| !p.is_empty()) else {
            return false;
        };
        self.manager_titles
            .iter()
            .any(|title| title.trim().eq_ignore_ascii_case(position))
    }

    /// Protected fields for a brand-new entry built from `row`.
    #[must_use]
    pub fn protected_fields(&self, row: &RosterRow) -> ProtectedFields {
        let is_manager = self.is_manager_position(row.position.as_deref());
        ProtectedFields {
            credential_secret: self
                .default_credential
                .clone()
                .unwrap_or_else(generate_credential),
            reward_balance: Decimal::ZERO,
            reward_budget: if is_manager {
                self.manager_budget
            } else {
                Decimal::ZERO
            },
            is_reward_manager: is_manager,
            history: Default::default(),
        }
    }
}

/// Generate a random alphanumeric credential.
#[must_use]
pub fn generate_credential() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_CREDENTIAL_LEN)
        .map(char::from)
        .collect()
}

/// Configuration for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Classify and report without writing.
    #[serde(default)]
    pub dry_run: bool,
    /// Maximum number of concurrent store writers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries for a transient store failure (reads and writes).
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// First backoff delay in milliseconds.
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Entries requested per scan page.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: u32,
    /// Whether the normalized-name tier is consulted.
    #[serde(default = "default_true")]
    pub name_matching: bool,
    /// Whether a row's status code may deactivate or reactivate an entry.
    #[serde(default = "default_true")]
    pub apply_source_status: bool,
    /// Defaults for created entries.
    #[serde(default)]
    pub create_defaults: CreateDefaults,
}

fn default_concurrency() -> usize {
    8
}

fn default_retry_limit() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_scan_page_size() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: default_concurrency(),
            retry_limit: default_retry_limit(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            scan_page_size: default_scan_page_size(),
            name_matching: true,
            apply_source_status: true,
            create_defaults: CreateDefaults::default(),
        }
    }
}

impl ReconcileConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `ROSTER_DRY_RUN`: classify only (default: false)
    /// - `ROSTER_CONCURRENCY`: concurrent writers (default: 8)
    /// - `ROSTER_RETRY_LIMIT`: retries per transient failure (default: 3)
    /// - `ROSTER_RETRY_INITIAL_DELAY_MS`: first backoff delay (default: 100)
    /// - `ROSTER_RETRY_MAX_DELAY_MS`: backoff cap (default: 5000)
    /// - `ROSTER_SCAN_PAGE_SIZE`: entries per scan page (default: 500)
    /// - `ROSTER_NAME_MATCHING`: enable the name tier (default: true)
    /// - `ROSTER_APPLY_SOURCE_STATUS`: honor row status codes (default: true)
    /// - `ROSTER_DEFAULT_CREDENTIAL`: fixed credential for new entries
    /// - `ROSTER_MANAGER_TITLES`: comma-separated manager positions
    /// - `ROSTER_MANAGER_BUDGET`: reward budget for new managers (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            dry_run: env_bool("ROSTER_DRY_RUN", false)?,
            concurrency: env_parse("ROSTER_CONCURRENCY", default_concurrency())?,
            retry_limit: env_parse("ROSTER_RETRY_LIMIT", default_retry_limit())?,
            retry_initial_delay_ms: env_parse(
                "ROSTER_RETRY_INITIAL_DELAY_MS",
                default_retry_initial_delay_ms(),
            )?,
            retry_max_delay_ms: env_parse(
                "ROSTER_RETRY_MAX_DELAY_MS",
                default_retry_max_delay_ms(),
            )?,
            scan_page_size: env_parse("ROSTER_SCAN_PAGE_SIZE", default_scan_page_size())?,
            name_matching: env_bool("ROSTER_NAME_MATCHING", true)?,
            apply_source_status: env_bool("ROSTER_APPLY_SOURCE_STATUS", true)?,
            create_defaults: CreateDefaults {
                default_credential: env::var("ROSTER_DEFAULT_CREDENTIAL")
                    .ok()
                    .filter(|v| !v.is_empty()),
                manager_titles: env::var("ROSTER_MANAGER_TITLES")
                    .map(|v| parse_list(&v))
                    .unwrap_or_default(),
                manager_budget: env_parse("ROSTER_MANAGER_BUDGET", Decimal::ZERO)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("ROSTER_CONCURRENCY", "must be at least 1"));
        }
        if self.scan_page_size == 0 {
            return Err(ConfigError::invalid("ROSTER_SCAN_PAGE_SIZE", "must be at least 1"));
        }
        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return Err(ConfigError::invalid(
                "ROSTER_RETRY_MAX_DELAY_MS",
                format!(
                    "{} is below the initial delay of {}",
                    self.retry_max_delay_ms, self.retry_initial_delay_ms
                ),
            ));
        }
        if self.create_defaults.manager_budget.is_sign_negative() {
            return Err(ConfigError::invalid("ROSTER_MANAGER_BUDGET", "must not be negative"));
        }
        if matches!(&self.create_defaults.default_credential, Some(c) if c.trim().is_empty()) {
            return Err(ConfigError::invalid("ROSTER_DEFAULT_CREDENTIAL", "must not be blank"));
        }
        Ok(())
    }

    /// Backoff settings for store calls.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(self.retry_limit)
            .with_delays(
                Duration::from_millis(self.retry_initial_delay_ms),
                Duration::from_millis(self.retry_max_delay_ms),
            )
    }

    /// Options for merging a row into an existing entry.
    #[must_use]
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            apply_source_status: self.apply_source_status,
        }
    }

    /// Enable or disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the number of concurrent writers.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Set the backoff delays.
    #[must_use]
    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_initial_delay_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
        self.retry_max_delay_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the scan page size.
    #[must_use]
    pub fn with_scan_page_size(mut self, page_size: u32) -> Self {
        self.scan_page_size = page_size;
        self
    }

    /// Enable or disable the name tier.
    #[must_use]
    pub fn with_name_matching(mut self, enabled: bool) -> Self {
        self.name_matching = enabled;
        self
    }

    /// Enable or disable status codes driving activation.
    #[must_use]
    pub fn with_apply_source_status(mut self, enabled: bool) -> Self {
        self.apply_source_status = enabled;
        self
    }

    /// Set the create defaults.
    #[must_use]
    pub fn with_create_defaults(mut self, defaults: CreateDefaults) -> Self {
        self.create_defaults = defaults;
        self
    }
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|e: T::Err| {
            ConfigError::invalid(var, format!("'{v}': {e}"))
        }),
        _ => Ok(default),
    }
}

fn env_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => parse_bool(&v)
            .ok_or_else(|| ConfigError::invalid(var, format!("'{v}' is not a boolean"))),
        _ => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
