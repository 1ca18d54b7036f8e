//! Plugin host error types

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::unit::UnitState;

/// Coarse classification used in start-up reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Plugin location unreadable or ambiguous
    Discovery,
    /// Bundle could not be turned into a unit
    Load,
    /// Start hook or extension registration failed
    Start,
    /// Stop hook failed
    Stop,
    /// An extension's route-building code failed
    ExtensionConstruction,
    /// Lifecycle API used out of order
    Lifecycle,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovery => "discovery",
            Self::Load => "load",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::ExtensionConstruction => "extension-construction",
            Self::Lifecycle => "lifecycle",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

/// A non-fatal failure attributed to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_error(unit: &str, error: &PluginHostError) -> Self {
        Self::new(unit, error.kind(), error.to_string())
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.unit, self.kind, self.message)
    }
}

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// Plugin directory exists but cannot be read
    #[error("Plugin directory unreadable: {path}: {source}")]
    DirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two bundles declare the same plugin id
    #[error("Duplicate plugin id '{id}' in {first} and {second}")]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Bundle manifest missing required fields or not valid TOML
    #[error("Invalid plugin manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    /// Bundle `config.toml` is not valid TOML
    #[error("Invalid config for plugin '{id}' in {path}: {reason}")]
    BundleConfig {
        id: String,
        path: PathBuf,
        reason: String,
    },

    /// Plugin library not found in bundle directory
    #[error("Plugin library not found in {dir}")]
    LibraryNotFound { dir: PathBuf },

    /// Entry point symbol not present in the unit's namespace
    #[error("Entry point '{entry}' not found for plugin '{id}'")]
    EntryPointMissing { id: String, entry: String },

    /// Namespace could not be created
    #[error("Failed to create namespace for plugin '{id}': {reason}")]
    Namespace { id: String, reason: String },

    /// API version mismatch between harbor and plugin
    #[error("API version mismatch: harbor expects {expected}, plugin has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// A unit for this descriptor still holds its namespace
    #[error("Plugin '{id}' is already loaded")]
    AlreadyLoaded { id: String },

    /// Start hook returned an error or panicked
    #[error("Plugin '{id}' failed to start: {reason}")]
    StartFailed { id: String, reason: String },

    /// Extension registration returned an error or panicked
    #[error("Plugin '{id}' failed to register extensions: {reason}")]
    ExtensionRegistration { id: String, reason: String },

    /// Stop hook returned an error or panicked
    #[error("Plugin '{id}' failed to stop: {reason}")]
    StopFailed { id: String, reason: String },

    /// An extension's route-building code returned an error or panicked
    #[error("Extension '{extension}' of plugin '{id}' failed to build routes: {reason}")]
    ExtensionConstruction {
        id: String,
        extension: String,
        reason: String,
    },

    /// Plugin not found
    #[error("Plugin '{id}' not found")]
    NotFound { id: String },

    /// Lifecycle transition not allowed from the current state
    #[error("Plugin '{id}' cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: UnitState,
        to: UnitState,
    },

    /// Handler registry written after aggregation
    #[error("Handler registry is sealed; handler '{key}' rejected")]
    RegistrySealed { key: String },

    /// Host start-up already ran
    #[error("Plugin host already started")]
    AlreadyStarted,

    /// One or more units failed to stop during shutdown
    #[error("{} plugin(s) failed to stop: {}", failures.len(), join_failures(failures))]
    Shutdown { failures: Vec<UnitFailure> },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[UnitFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PluginHostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DirUnreadable { .. } | Self::DuplicateId { .. } => ErrorKind::Discovery,
            Self::InvalidManifest { .. }
            | Self::BundleConfig { .. }
            | Self::LibraryNotFound { .. }
            | Self::EntryPointMissing { .. }
            | Self::Namespace { .. }
            | Self::ApiVersionMismatch { .. }
            | Self::AlreadyLoaded { .. } => ErrorKind::Load,
            Self::StartFailed { .. } | Self::ExtensionRegistration { .. } => ErrorKind::Start,
            Self::StopFailed { .. } | Self::Shutdown { .. } => ErrorKind::Stop,
            Self::ExtensionConstruction { .. } => ErrorKind::ExtensionConstruction,
            Self::NotFound { .. }
            | Self::InvalidTransition { .. }
            | Self::RegistrySealed { .. }
            | Self::AlreadyStarted => ErrorKind::Lifecycle,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
