//! sitewatch - website uptime dashboard engine.
//!
//! Polls a monitoring backend for per-site metrics, aggregates them into a
//! dashboard snapshot and raises notifications when sites go down or recover.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod models;
pub mod notifier;
pub mod scheduler;
pub mod session;
pub mod web;
