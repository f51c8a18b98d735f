//! Telemetry from the Linux `/proc` filesystem.
//!
//! `parser` holds pure parsers over file contents; `threads` holds the
//! [`ProcfsSource`] that walks `/proc/<pid>/task`.

pub mod parser;
mod threads;

pub use threads::ProcfsSource;
