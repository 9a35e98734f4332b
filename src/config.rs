//! Window configuration.
//!
//! [`WindowConfig`] is a plain serde-friendly struct so hosts can load it
//! from their own configuration files; [`WindowConfigBuilder`] offers the
//! fluent form. Either way, [`WindowConfig::validate`] runs before a window
//! accepts the settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    credit::DEFAULT_INITIAL_CREDITS,
    queue::{DEFAULT_MAX_QUEUE_LENGTH, MAX_QUEUE_CAPACITY},
};

/// Page served to clients of a window configured with a panel name.
pub const PANEL_PAGE: &str = "file:$jsrootsys/files/panel.htm";

/// Highest number of initial send credits a window may grant.
pub const MAX_INITIAL_CREDITS: u64 = 10_000;

/// Errors raised by invalid or ill-timed configuration.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The queue length was zero or exceeded [`MAX_QUEUE_CAPACITY`].
    #[error("invalid queue length {0}; must be between 1 and {max}", max = MAX_QUEUE_CAPACITY)]
    InvalidQueueLength(usize),
    /// The initial credit allowance was zero or exceeded [`MAX_INITIAL_CREDITS`].
    #[error("invalid initial credits {0}; must be between 1 and {max}", max = MAX_INITIAL_CREDITS)]
    InvalidCredits(u64),
    /// The panel cannot change while clients are attached.
    #[error("cannot configure panel when connection exists")]
    PanelWithConnections,
}

/// Settings of a single window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum number of simultaneous connections; zero means unlimited.
    pub connection_limit: usize,
    /// Maximum number of frames queued per connection.
    pub max_queue_length: usize,
    /// Send credits granted to each new connection.
    pub initial_credits: u64,
    /// Accept only clients presenting a key registered by the manager.
    pub native_only: bool,
    /// Panel clients are asked to show after the handshake.
    pub panel_name: Option<String>,
    /// Page served to clients opening the window.
    pub default_page: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            connection_limit: 0,
            max_queue_length: DEFAULT_MAX_QUEUE_LENGTH,
            initial_credits: DEFAULT_INITIAL_CREDITS,
            native_only: false,
            panel_name: None,
            default_page: String::new(),
        }
    }
}

impl WindowConfig {
    /// Begin building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> WindowConfigBuilder { WindowConfigBuilder::default() }

    /// Check that every value lies within its supported range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidQueueLength`] or
    /// [`ConfigError::InvalidCredits`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_length == 0 || self.max_queue_length > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidQueueLength(self.max_queue_length));
        }
        if self.initial_credits == 0 || self.initial_credits > MAX_INITIAL_CREDITS {
            return Err(ConfigError::InvalidCredits(self.initial_credits));
        }
        Ok(())
    }
}

/// Builder for [`WindowConfig`].
#[derive(Debug, Default)]
pub struct WindowConfigBuilder {
    config: WindowConfig,
}

impl WindowConfigBuilder {
    /// Limit the number of simultaneous connections; zero disables the limit.
    #[must_use]
    pub fn connection_limit(mut self, limit: usize) -> Self {
        self.config.connection_limit = limit;
        self
    }

    /// Set the per-connection queue depth.
    #[must_use]
    pub fn max_queue_length(mut self, len: usize) -> Self {
        self.config.max_queue_length = len;
        self
    }

    /// Set the credits granted to each new connection.
    #[must_use]
    pub fn initial_credits(mut self, credits: u64) -> Self {
        self.config.initial_credits = credits;
        self
    }

    /// Refuse clients without a registered key.
    #[must_use]
    pub fn native_only(mut self, native_only: bool) -> Self {
        self.config.native_only = native_only;
        self
    }

    /// Show `name` as a panel; also switches the default page to
    /// [`PANEL_PAGE`].
    #[must_use]
    pub fn panel_name(mut self, name: impl Into<String>) -> Self {
        self.config.panel_name = Some(name.into());
        self.config.default_page = PANEL_PAGE.to_owned();
        self
    }

    /// Set the page served to clients.
    #[must_use]
    pub fn default_page(mut self, page: impl Into<String>) -> Self {
        self.config.default_page = page.into();
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a value is out of range.
    pub fn build(self) -> Result<WindowConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(0)]
    #[case::too_long(MAX_QUEUE_CAPACITY + 1)]
    fn rejects_invalid_queue_length(#[case] len: usize) {
        let result = WindowConfig::builder().max_queue_length(len).build();
        assert_eq!(result, Err(ConfigError::InvalidQueueLength(len)));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::too_many(MAX_INITIAL_CREDITS + 1)]
    fn rejects_invalid_credits(#[case] credits: u64) {
        let result = WindowConfig::builder().initial_credits(credits).build();
        assert_eq!(result, Err(ConfigError::InvalidCredits(credits)));
    }

    #[test]
    fn panel_name_selects_panel_page() {
        let config = WindowConfig::builder()
            .panel_name("fit")
            .build()
            .expect("defaults are valid");
        assert_eq!(config.panel_name.as_deref(), Some("fit"));
        assert_eq!(config.default_page, PANEL_PAGE);
    }

    #[test]
    fn defaults_are_valid() {
        let config = WindowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_queue_length, DEFAULT_MAX_QUEUE_LENGTH);
        assert_eq!(config.initial_credits, DEFAULT_INITIAL_CREDITS);
    }
}
