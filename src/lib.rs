//! Persistent schema for the P-Programist course / vacancy / news bot.
//!
//! The bot itself lives elsewhere and calls into [`db`] with a pool it opens
//! once at start-up. [`seed`] holds the guarded reset used in development.

pub mod config;
pub mod db;
pub mod model;
pub mod seed;
