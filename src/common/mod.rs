//! Common utilities and shared functionality
//!
//! Configuration loading and the traits shared by the engine components.

pub mod config;
pub mod traits;
