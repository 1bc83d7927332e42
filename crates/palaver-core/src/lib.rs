//! Domain layer for palaver.
//!
//! Holds the canonical conversation model, the conversation key resolver,
//! and the traits that the infrastructure layer implements: the raw
//! key-value substrate, the user directory, the per-owner conversation
//! store and the notification sink.

pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod notification;
pub mod storage;
pub mod user;

pub use error::{PalaverError, Result};
