//! Shared configuration and error handling for Teamforge
//!
//! This crate provides common functionality used across the Teamforge workspace:
//! - Configuration management following 12-factor principles
//! - Error types shared by the engine and its store adapters
//! - State machine error types

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use state::StateError;
