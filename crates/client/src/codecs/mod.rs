//! One submodule per data channel, each exposing `parse_update` and,
//! where the channel accepts client requests, `stringify_request`.
//! Parsing is hand-rolled against `serde_json::Value` rather than
//! `#[derive(Deserialize)]` so a malformed field produces an error that
//! names it, instead of serde's generic "invalid type" report.

pub mod media_entries;
pub mod media_stats;
pub mod participants;
pub mod session_control;
pub mod video_assignment;
