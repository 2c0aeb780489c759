//! BusTrack Server - Real-time bus tracking demo.
//!
//! This crate provides the server component of BusTrack, responsible for:
//! - Registering and authenticating rider accounts
//! - Issuing and validating signed session tokens
//! - Broadcasting simulated bus positions to subscribed clients
//!
//! # Architecture
//!
//! The server keeps everything in memory: an account directory, a static
//! catalog of bus stops, and a registry of named subscription groups that
//! WebSocket clients join. A background task synthesizes a bus position on
//! a fixed period and fans it out to the tracking group. Nothing is
//! persisted across restarts.

pub mod config;
pub mod directory;
pub mod error;
pub mod rooms;
pub mod routes;
pub mod simulator;
pub mod stops;
pub mod token;
pub mod types;
