//! # Pavlov TV API
//!
//! This crate is a client-side telemetry bridge for the Pavlov TV replay
//! viewer. It polls the viewer's local HTTP API from one worker per
//! endpoint, feeds every parsed outcome to a caller-supplied sink, and
//! derives a connection-health state (Disconnected / Unresponsive /
//! Connected) from the most recent successful response and a
//! process-liveness probe.
//!
//! It also carries the command surface (load replay, seek, pause) and a
//! client for the master replay catalog.
//!
//! For usage details, see the example in `demos/simple.rs`.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod http;
pub mod model;
pub mod process;
pub mod sink;
pub mod utils;

mod monitor;
mod poller;
