use std::collections::{HashMap, HashSet};

use crate::status::Status;

/// Server-provided allowlist of `RTCStats` section types and, per section,
/// which attribute names may be uploaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatsConfiguration {
    pub upload_interval_seconds: i32,
    pub allowlist: HashMap<String, HashSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatsResponse {
    pub request_id: i64,
    pub status: Status,
    pub is_upload_media_stats_response: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatsUpdate {
    pub response: Option<MediaStatsResponse>,
    /// `None` when the message carried no `resources` field at all;
    /// `Some` always wraps exactly one element once parsed.
    pub configuration: Option<MediaStatsConfiguration>,
}

/// One `RTCStats`-derived section filtered through the allowlist.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaStatsSection {
    pub section_type: String,
    pub id: String,
    /// Attribute name -> canonical decimal string value.
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadMediaStatsRequest {
    pub sections: Vec<MediaStatsSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaStatsRequest {
    pub request_id: i64,
    pub upload_media_stats: UploadMediaStatsRequest,
}
