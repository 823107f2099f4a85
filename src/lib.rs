// ABOUTME: Library root for scpu - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod resize;
pub mod runner;
pub mod session;
pub mod ssh;
pub mod terminal;
