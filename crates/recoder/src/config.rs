// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recoder configuration - single source of truth for names and settings.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: well-known type names, method names and default
//!   prefixes the rewrite pass emits and the runtime resolves
//! - **Level 2 (Dynamic)**: [`RecoderConfig`], loaded from TOML and/or
//!   `RECODER_*` environment variables
//!
//! # Example
//!
//! ```ignore
//! use recoder::config::RecoderConfig;
//!
//! let config = RecoderConfig::from_file("recoder.toml")?.with_env_overrides()?;
//! assert!(!config.require_dispatch);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// =======================================================================
// Well-known types
// =======================================================================

/// Root of every reference type.
pub const OBJECT: &str = "java/lang/Object";

/// Base type of every record. Eligibility for rewriting is decided on it.
pub const RECORD: &str = "java/lang/Record";

/// String type (component type of text components).
pub const STRING: &str = "java/lang/String";

/// Method handle type (argument of `provideGetter`).
pub const METHOD_HANDLE: &str = "java/lang/invoke/MethodHandle";

/// Runtime class of component keys, as seen from generated code.
pub const COMPONENT_KEY: &str = "recoder/ComponentKey";

/// Runtime class of the key registry, as seen from generated code.
pub const COMPONENT_KEY_REGISTRY: &str = "recoder/ComponentKeyRegistry";

// =======================================================================
// Well-known members
// =======================================================================

/// Instance initializer name.
pub const INIT: &str = "<init>";

/// Static initializer name.
pub const CLINIT: &str = "<clinit>";

/// Registry lookup used by generated static initializers.
pub const GET_KEY_FOR_NAME: &str = "getKeyForName";

/// Accessor binding used by generated static initializers.
pub const PROVIDE_GETTER: &str = "provideGetter";

/// Staging call used by extended constructors.
pub const QUEUE_NEXT: &str = "queueNext";

/// Argument check run by extended constructors before anything is staged.
pub const CHECK_VALUE: &str = "checkValue";

/// Staging read used by canonical constructors.
pub const GET_NEXT: &str = "getNext";

/// Entrypoint key under which registration callbacks are collected.
pub const ENTRYPOINT_KEY: &str = "recoder:register";

// =======================================================================
// Defaults
// =======================================================================

/// Default prefix of synthetic backing fields.
pub const DEFAULT_FIELD_PREFIX: &str = "keyedField-";

/// Default prefix of synthetic static key slots.
pub const DEFAULT_KEY_SLOT_PREFIX: &str = "key-";

/// Maximum interpreter call depth.
pub const MAX_CALL_DEPTH: usize = 256;

// =======================================================================
// Runtime configuration
// =======================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Rewrite pass configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoderConfig {
    /// Prefix of synthetic backing fields (followed by a UUID).
    pub field_prefix: String,

    /// Prefix of synthetic static key slots (followed by the same UUID).
    pub key_slot_prefix: String,

    /// Abort when any of equals/hashCode/toString dispatch is missing.
    ///
    /// Off by default: a missing derived method is simply not extended.
    pub require_dispatch: bool,

    /// Write every rewritten definition to this directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for RecoderConfig {
    fn default() -> Self {
        Self {
            field_prefix: DEFAULT_FIELD_PREFIX.to_string(),
            key_slot_prefix: DEFAULT_KEY_SLOT_PREFIX.to_string(),
            require_dispatch: false,
            export_dir: None,
        }
    }
}

impl RecoderConfig {
    /// Environment variable overriding [`Self::field_prefix`].
    pub const ENV_FIELD_PREFIX: &'static str = "RECODER_FIELD_PREFIX";
    /// Environment variable overriding [`Self::key_slot_prefix`].
    pub const ENV_KEY_SLOT_PREFIX: &'static str = "RECODER_KEY_SLOT_PREFIX";
    /// Environment variable overriding [`Self::require_dispatch`].
    pub const ENV_REQUIRE_DISPATCH: &'static str = "RECODER_REQUIRE_DISPATCH";
    /// Environment variable overriding [`Self::export_dir`].
    pub const ENV_EXPORT_DIR: &'static str = "RECODER_EXPORT_DIR";

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `RECODER_*` overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `RECODER_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(prefix) = lookup(Self::ENV_FIELD_PREFIX) {
            self.field_prefix = prefix;
        }
        if let Some(prefix) = lookup(Self::ENV_KEY_SLOT_PREFIX) {
            self.key_slot_prefix = prefix;
        }
        if let Some(value) = lookup(Self::ENV_REQUIRE_DISPATCH) {
            self.require_dispatch = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: Self::ENV_REQUIRE_DISPATCH,
                        value,
                    })
                }
            };
        }
        if let Some(dir) = lookup(Self::ENV_EXPORT_DIR) {
            self.export_dir = if dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (what, prefix) in [
            ("field_prefix", &self.field_prefix),
            ("key_slot_prefix", &self.key_slot_prefix),
        ] {
            if prefix.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", what)));
            }
            // Prefixes end up inside member names: no separators or descriptor syntax.
            if let Some(bad) = prefix.chars().find(|c| ".;[/<>()".contains(*c)) {
                return Err(ConfigError::Invalid(format!(
                    "{} contains illegal character '{}'",
                    what, bad
                )));
            }
        }
        if self.field_prefix == self.key_slot_prefix {
            return Err(ConfigError::Invalid(
                "field_prefix and key_slot_prefix must differ".into(),
            ));
        }
        Ok(())
    }
}
