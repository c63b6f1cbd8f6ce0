//! Steepshot core - Steem/Golos blockchain client
//!
//! This library implements the blockchain API client layer of the Steepshot
//! social client: request models, chain-specific operation encoding,
//! transaction signing and broadcast, error classification, and the
//! presenter/session core with its reconnect loop.
//!
//! The UI layer plugs in through three seams: a connectivity probe, a crash
//! reporter, and a session store. Every public operation returns
//! [`error::OperationResult`], whose error side is always safe to render
//! directly.

// Configuration and chain constants
pub mod chains;
pub mod config;

// Key material
pub mod keys;

// Request models and operation encoding
pub mod models;
pub mod operations;

// Transaction serialization, signing and submission
pub mod broadcast;
pub mod serializer;
pub mod signing;

// JSON-RPC transport and the error taxonomy
pub mod error;
pub mod rpc;

// Chain clients
pub mod client;
pub mod golos_client;
pub mod steem_client;

// Steepshot media backend
pub mod upload;

// Session state and the presenter core
pub mod connectivity;
pub mod presenter;
pub mod session;

// Re-export commonly used types
pub use chains::KnownChains;
pub use client::{make_client, ChainApiClient};
pub use error::{OperationError, OperationResult};
pub use presenter::{Presenter, SessionEvent};
pub use session::UserInfo;
