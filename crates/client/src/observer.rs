use meet_media_protocol::{
    media_entries::MediaEntriesUpdate, media_stats::MediaStatsUpdate,
    participants::ParticipantsUpdate, session_control::SessionControlUpdate,
    video_assignment::VideoAssignmentUpdate, Status,
};

/// One parsed update, tagged by the channel it arrived on.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceUpdate {
    SessionControl(SessionControlUpdate),
    MediaStats(MediaStatsUpdate),
    Participants(ParticipantsUpdate),
    MediaEntries(MediaEntriesUpdate),
    VideoAssignment(VideoAssignmentUpdate),
}

/// 16-bit PCM audio contributed by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// CSRC identifying the contributing media entry.
    pub source_csrc: u32,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

/// A YUV420-convertible video frame contributed by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub source_csrc: u32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// The embedder's push surface. Every method is invoked on
/// an unspecified internal thread, but never concurrently with itself for
/// the same kind of event on the same channel; implementations should not
/// assume which thread, only that calls for a given (method, channel)
/// pair are serialized.
pub trait Observer: Send + Sync {
    /// Fires exactly once, iff the session reaches `Joined`.
    fn on_joined(&self) {}

    /// Fires exactly once, terminal. `status.is_ok()` means the conference
    /// ended or the embedder left cleanly.
    fn on_disconnected(&self, status: Status);

    /// Fires for every parsed update, on every channel, before this core's
    /// own handling of `session-control`/`media-stats` variants runs.
    fn on_resource_update(&self, update: ResourceUpdate) {
        let _ = update;
    }

    fn on_audio_frame(&self, frame: AudioFrame) {
        let _ = frame;
    }

    fn on_video_frame(&self, frame: VideoFrame) {
        let _ = frame;
    }
}
