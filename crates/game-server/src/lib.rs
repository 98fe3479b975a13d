//! game-server
//!
//! Multi-client async TCP matchmaking server for five-in-a-line.

pub mod config;
pub mod types;
pub mod registry;
pub mod game;
pub mod relay;
pub mod outcome_log;
pub mod server;

// per-connection tasks, driven only by `server`
mod client;
