//! # Error Handling
//!
//! This module defines the centralized error type for `packsync`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! the engine can observe, each variant carrying enough context (package
//! identity, field name, git command, path) to produce a useful message.
//!
//! Errors fall in two groups:
//!
//! - **Fatal to initialization**: `SpecValidation`, `InvalidIdentity`,
//!   `ConfigParse` and `CycleDetected`. These abort the build of the package
//!   graph before any walk happens.
//! - **Local to one package or entry**: `Hook`, `Activation`, `GitCommand`,
//!   `GitClone`, `Timeout` and `Filesystem`. The engine logs them, marks the
//!   affected node, and keeps going with everything else.
//!
//! The `Result` type alias is used throughout the library.

use thiserror::Error;

/// Main error type for packsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// A package declaration has a field with the wrong type, an unknown
    /// field, or an otherwise invalid value.
    #[error("Invalid package spec '{spec}': field '{field}' {message}")]
    SpecValidation {
        spec: String,
        field: String,
        message: String,
    },

    /// A package identity does not have the `namespace/name` shape.
    #[error("Invalid package identity '{identity}'{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    InvalidIdentity {
        identity: String,
        /// Optional hint for how to fix the identity
        hint: Option<String>,
    },

    /// The configuration file could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The dependents relation contains a cycle.
    #[error("Cycle detected in package dependencies: {cycle}")]
    CycleDetected { cycle: String },

    /// A user hook failed or panicked.
    #[error("Hook failed for {package} ({stage}): {message}")]
    Hook {
        package: String,
        stage: String,
        message: String,
    },

    /// A package could not be brought into the runtime environment.
    #[error("Activation failed for {package}: {message}")]
    Activation { package: String, message: String },

    /// A git command exited unsuccessfully or could not be spawned.
    #[error("Git command failed in {dir}: {command} - {output}")]
    GitCommand {
        command: String,
        dir: String,
        output: String,
    },

    /// Cloning a package source failed.
    #[error("Git clone error for {url}{}: {message}", branch.as_ref().map(|b| format!("@{}", b)).unwrap_or_default())]
    GitClone {
        url: String,
        branch: Option<String>,
        message: String,
    },

    /// A sync job did not finish in time.
    #[error("Sync of {package} timed out after {seconds}s")]
    Timeout { package: String, seconds: u64 },

    /// A filesystem collaborator operation failed.
    #[error("Filesystem operation error: {path} - {message}")]
    Filesystem { path: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
