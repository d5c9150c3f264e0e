//! Owns each opened data channel, demultiplexes inbound messages to the
//! matching codec, and stamps/serializes outbound requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;

use meet_media_protocol::config::ChannelLabel;
use meet_media_protocol::media_stats::{MediaStatsRequest, UploadMediaStatsRequest};
use meet_media_protocol::session_control::SessionControlRequest;
use meet_media_protocol::video_assignment::{SetVideoAssignmentRequest, VideoAssignmentRequest};

use crate::codecs;
use crate::error::{ClientError, ClientResult};
use crate::observer::ResourceUpdate;

/// Receives parsed updates as they arrive, one per channel message. The
/// session state machine implements this to run its own session-control/
/// media-stats handling before forwarding to the embedder.
pub trait UpdateSink: Send + Sync {
    fn handle_update(&self, label: ChannelLabel, update: ResourceUpdate);
}

/// The two client-initiated request shapes the embedder can drive
/// directly. `media-stats` uploads are deliberately absent here — the
/// stats collector sends those through [`Dispatcher::send_media_stats_upload`]
/// and an embedder-initiated send on that channel is rejected as an
/// internal error before it ever reaches the dispatcher.
pub enum OutboundRequest {
    Leave,
    SetVideoAssignment(SetVideoAssignmentRequest),
}

struct ChannelState {
    handle: Arc<RTCDataChannel>,
    next_request_id: AtomicI64,
}

impl ChannelState {
    fn new(handle: Arc<RTCDataChannel>) -> Self {
        ChannelState {
            handle,
            next_request_id: AtomicI64::new(1),
        }
    }

    /// Strictly increasing, starting at 1, independent per channel.
    fn stamp_request_id(&self) -> i64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }
}

pub struct Dispatcher {
    channels: Mutex<HashMap<ChannelLabel, Arc<ChannelState>>>,
    update_sink: Weak<dyn UpdateSink>,
}

impl Dispatcher {
    pub fn new(update_sink: Weak<dyn UpdateSink>) -> Self {
        Dispatcher {
            channels: Mutex::new(HashMap::new()),
            update_sink,
        }
    }

    /// Adopts a freshly opened channel and installs its inbound message
    /// handler. Must be called once per label before any request is sent
    /// on it.
    pub fn register_channel(self: &Arc<Self>, label: ChannelLabel, handle: Arc<RTCDataChannel>) {
        self.channels
            .lock()
            .unwrap()
            .insert(label, Arc::new(ChannelState::new(Arc::clone(&handle))));

        let this = Arc::clone(self);
        handle.on_message(Box::new(move |message: DataChannelMessage| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                this.on_message(label, &message.data);
            })
        }));
    }

    /// Routes an inbound message to its channel's codec; on parse failure
    /// logs and drops the message without affecting the session.
    fn on_message(&self, label: ChannelLabel, bytes: &[u8]) {
        let update = match parse_channel_message(label, bytes) {
            Ok(update) => update,
            Err(e) => {
                tracing::error!(channel = label.as_str(), error = %e, "dropping malformed message");
                return;
            }
        };
        match self.update_sink.upgrade() {
            Some(sink) => sink.handle_update(label, update),
            None => tracing::warn!(channel = label.as_str(), "update arrived after session was dropped"),
        }
    }

    /// Dispatches by request variant to the matching channel's codec,
    /// stamps a fresh request ID, and sends the serialized bytes. Fails
    /// fast if the channel is not open.
    pub async fn send_request(&self, request: OutboundRequest) -> ClientResult<()> {
        match request {
            OutboundRequest::Leave => {
                let channel = self.channel(ChannelLabel::SessionControl)?;
                let request_id = channel.stamp_request_id();
                let payload = codecs::session_control::stringify_request(&SessionControlRequest {
                    request_id,
                    leave: true,
                })?;
                Self::send_text(&channel.handle, payload).await
            }
            OutboundRequest::SetVideoAssignment(set_assignment) => {
                let channel = self.channel(ChannelLabel::VideoAssignment)?;
                let request_id = channel.stamp_request_id();
                let payload = codecs::video_assignment::stringify_request(&VideoAssignmentRequest {
                    request_id,
                    set_assignment,
                })?;
                Self::send_text(&channel.handle, payload).await
            }
        }
    }

    /// Driven only by the stats collector (C5), never directly by the
    /// embedder.
    pub async fn send_media_stats_upload(&self, upload: UploadMediaStatsRequest) -> ClientResult<()> {
        let channel = self.channel(ChannelLabel::MediaStats)?;
        let request_id = channel.stamp_request_id();
        let payload = codecs::media_stats::stringify_request(&MediaStatsRequest {
            request_id,
            upload_media_stats: upload,
        })?;
        Self::send_text(&channel.handle, payload).await
    }

    fn channel(&self, label: ChannelLabel) -> ClientResult<Arc<ChannelState>> {
        self.channels
            .lock()
            .unwrap()
            .get(&label)
            .cloned()
            .ok_or_else(|| ClientError::internal(format!("{} channel is not open", label.as_str())))
    }

    async fn send_text(handle: &Arc<RTCDataChannel>, payload: String) -> ClientResult<()> {
        handle
            .send_text(payload)
            .await
            .map_err(|e| ClientError::internal(e.to_string()))?;
        Ok(())
    }
}

fn parse_channel_message(label: ChannelLabel, bytes: &[u8]) -> ClientResult<ResourceUpdate> {
    Ok(match label {
        ChannelLabel::SessionControl => {
            ResourceUpdate::SessionControl(codecs::session_control::parse_update(bytes)?)
        }
        ChannelLabel::MediaStats => ResourceUpdate::MediaStats(codecs::media_stats::parse_update(bytes)?),
        ChannelLabel::Participants => {
            ResourceUpdate::Participants(codecs::participants::parse_update(bytes)?)
        }
        ChannelLabel::MediaEntries => {
            ResourceUpdate::MediaEntries(codecs::media_entries::parse_update(bytes)?)
        }
        ChannelLabel::VideoAssignment => {
            ResourceUpdate::VideoAssignment(codecs::video_assignment::parse_update(bytes)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        updates: StdMutex<Vec<(ChannelLabel, ResourceUpdate)>>,
    }

    impl UpdateSink for RecordingSink {
        fn handle_update(&self, label: ChannelLabel, update: ResourceUpdate) {
            self.updates.lock().unwrap().push((label, update));
        }
    }

    #[test]
    fn parses_session_control_message() {
        let bytes = br#"{"resources":[{"id":0,"sessionStatus":{"connectionState":"STATE_JOINED"}}]}"#;
        let update = parse_channel_message(ChannelLabel::SessionControl, bytes).unwrap();
        assert!(matches!(update, ResourceUpdate::SessionControl(_)));
    }

    #[test]
    fn malformed_media_stats_is_an_error_not_a_panic() {
        let bytes = br#"{"resources":[]}"#;
        assert!(parse_channel_message(ChannelLabel::MediaStats, bytes).is_err());
    }

    #[test]
    fn channel_lookup_fails_fast_when_unregistered() {
        let sink: Arc<dyn UpdateSink> = Arc::new(RecordingSink {
            updates: StdMutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(Arc::downgrade(&sink));
        assert!(dispatcher.channel(ChannelLabel::SessionControl).is_err());
    }
}
