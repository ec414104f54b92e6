//! Defines the custom error types for the ispdb sanity checker.

use std::{io, net::AddrParseError};
use thiserror::Error;

/// The primary error type for crate-level failures.
///
/// Network trouble while probing or resolving never surfaces here; it is
/// absorbed by the probe layer (see [`ProbeError`]) or turned into a
/// warning/error sentence by the checker.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., resolvers, TLS).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing the TOML configuration file.
    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error parsing an IP address (e.g., a configured DNS server).
    #[error("Address Parsing Error: {0}")]
    AddrParse(#[from] AddrParseError),

    /// The configuration snapshot handed over by the caller is unusable.
    #[error("Invalid Snapshot: {0}")]
    InvalidSnapshot(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Recoverable failures of a single probe.
///
/// Every variant maps to the "no connection" outcome of a probe; the checker
/// never sees these values directly.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Connecting, reading or writing did not finish within the probe timeout.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Socket-level failure (refused, reset, unreachable, EOF).
    #[error("connection failed: {0}")]
    Connection(#[from] io::Error),

    /// The server answered, but not the way the protocol requires.
    #[error("protocol rejected: {0}")]
    Rejected(String),

    /// The TLS handshake could not be completed.
    #[error("TLS handshake failed: {0}")]
    Tls(String),

    /// An upgrade was requested on a connection that is already encrypted.
    #[error("TLS session already established")]
    AlreadyEncrypted,
}
