/// One audio/video source contributed to the conference.
///
/// Field set mirrors the upstream resource closely; several fields are
/// carried through even though the client has no present use for them,
/// because the server still sends them and the embedder may want them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaEntry {
    /// `conferenceRecords/{conference_record}/participants/{participant}`.
    /// Unused for now; carried through for parity with the wire format.
    pub participant: Option<String>,
    pub participant_key: Option<String>,
    /// Participant session name. Unused for now.
    pub session: Option<String>,
    pub session_name: Option<String>,
    /// CSRC of this entry's audio track, 0 if none.
    pub audio_csrc: u32,
    /// CSRCs of this entry's video track(s), if any.
    pub video_csrcs: Vec<u32>,
    pub presenter: bool,
    pub screenshare: bool,
    pub audio_muted: bool,
    pub video_muted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntriesResourceSnapshot {
    pub id: i64,
    pub media_entry: Option<MediaEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntriesDeletedResource {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaEntriesUpdate {
    pub resources: Vec<MediaEntriesResourceSnapshot>,
    pub deleted_resources: Vec<MediaEntriesDeletedResource>,
}
