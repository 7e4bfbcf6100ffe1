//! Configuration types for the reconciliation executor
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::{RetryClassifier, RetryPolicy};

/// Remote API client configuration
///
/// Consumed once at process start to construct the client handle passed into
/// every executor invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the hosting account
    pub account_name: String,

    /// Credential material
    pub auth: AuthConfig,

    /// Whether API write calls are allowed
    #[serde(default)]
    pub mode: ApiMode,

    /// Use the remote API's test mode (no billable changes)
    #[serde(default)]
    pub test_mode: bool,
}

impl ClientConfig {
    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.account_name.is_empty() {
            return Err(crate::Error::config("Account name cannot be empty"));
        }
        self.auth.validate()
    }
}

/// Credential material for the remote API
///
/// Exactly one method is used; the variants make private key and access token
/// mutually exclusive by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Sign requests with an account private key
    PrivateKey {
        /// Contents of the private key file (PEM)
        pem: String,
    },

    /// Authenticate with a pre-issued access token
    AccessToken {
        /// Temporary access token
        token: String,
    },
}

impl AuthConfig {
    /// Validate the credential configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AuthConfig::PrivateKey { pem } if pem.is_empty() => {
                Err(crate::Error::config("Private key cannot be empty"))
            }
            AuthConfig::AccessToken { token } if token.is_empty() => {
                Err(crate::Error::config("Access token cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Whether the client may issue write calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMode {
    /// Normal operation
    #[default]
    ReadWrite,
    /// Disable API write calls
    ReadOnly,
}

/// Retry deadline and backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Overall deadline for one reconciliation (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay before the second attempt (in milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between attempts (in seconds)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Backoff growth factor per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    /// Validate the retry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Retry timeout must be > 0"));
        }
        if self.multiplier < 1.0 {
            return Err(crate::Error::config("Backoff multiplier must be >= 1.0"));
        }
        Ok(())
    }

    /// Convert into the executor's retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_secs),
            multiplier: self.multiplier,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            multiplier: default_multiplier(),
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Retry deadline and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Extra transient-failure signatures, appended to the built-in set
    #[serde(default)]
    pub transient_signatures: Vec<String>,

    /// Capacity of the event channel, when one is attached
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcilerConfig {
    /// Validate the executor configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.retry.validate()
    }

    /// Build the classifier: defaults plus any configured extra signatures
    pub fn classifier(&self) -> RetryClassifier {
        RetryClassifier::new().with_signatures(self.transient_signatures.iter().cloned())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            transient_signatures: Vec::new(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_secs() -> u64 {
    10
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_event_channel_capacity() -> usize {
    1000
}
