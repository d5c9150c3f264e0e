//! Wire types shared by the conference session orchestrator.
//!
//! Every struct here is a direct mirror of the JSON shapes documented for
//! each data-channel label. Parsing/validation rules (required vs. optional
//! fields, the single-resource invariant on `media-stats`, request ID
//! non-zero checks, …) live in `meet-media-client`'s codecs, not here: this
//! crate only describes the shapes.

pub mod config;
pub mod media_entries;
pub mod media_stats;
pub mod participants;
pub mod session_control;
pub mod status;
pub mod video_assignment;

pub use config::Config;
pub use status::Status;
