//! threadtop - per-thread CPU and allocation monitor library.
//!
//! - `collector` - telemetry sources (`/proc`, scripted frames)
//! - `engine` - sampling, deltas, noise floor, ranking and rendering
//! - `command` - live commands typed into a running monitor

pub mod collector;
pub mod command;
pub mod engine;
pub mod fmt;
