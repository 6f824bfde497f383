#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod notifier;
pub use notifier::{
    DEFAULT_BLOCK_ENDPOINT, DEFAULT_HEARTBEAT_ENDPOINT, DEFAULT_NOTIFICATION_ENDPOINT,
    DEFAULT_TRANSACTION_ENDPOINT, NotifierConfig,
};

/// Errors loading a [`NotifierConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The document was not valid JSON, or had a field of the wrong type.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A setting that must be positive was zero.
    #[error("{field} must be non-zero")]
    Zero {
        /// The offending field, as named in the JSON document.
        field: &'static str,
    },
}

impl ConfigError {
    /// Zero setting error.
    pub const fn zero(field: &'static str) -> Self {
        Self::Zero { field }
    }
}
