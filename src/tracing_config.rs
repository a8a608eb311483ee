//! Tracing subscriber configuration
//!
//! The library only emits trace events; subscriber setup lives here and is
//! invoked by the CLI (or another embedding application) at startup.

use crate::error::{DeforestError, Result};

/// Tracing configuration builder
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Environment filter string; overrides verbosity when set
    pub env_filter: Option<String>,
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-3+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set a custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Convert the verbosity level to a tracing filter directive
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Install a global fmt subscriber for this configuration
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A subscriber is already installed
    pub fn init(self) -> Result<()> {
        let directives = self
            .env_filter
            .clone()
            .unwrap_or_else(|| self.verbosity_to_filter().to_string());

        let filter = tracing_subscriber::EnvFilter::try_new(&directives)
            .map_err(|e| DeforestError::invalid_config(format!("Invalid trace filter: {}", e)))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| {
                DeforestError::invalid_config(format!("Failed to install tracing subscriber: {}", e))
            })
    }
}
