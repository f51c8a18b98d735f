//! Test doubles for the collector layer.
//!
//! `MockFs` fakes `/proc` for [`ProcfsSource`](super::ProcfsSource);
//! `ScriptedSource` replays hand-written counter frames straight into the
//! engine.

mod filesystem;
mod scripted;

pub use filesystem::{MockFs, stat_line};
pub use scripted::{Frame, ScriptedSource, ScriptedThread};
