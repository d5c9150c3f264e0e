//! A thin facade over a `webrtc` peer connection.
//!
//! The facade owns the WebRTC handle for the conference's lifetime, drives
//! the SDP offer/answer exchange through a [`JoinConnector`], and surfaces
//! the two events the session state machine actually acts on: a track
//! becoming available and the connection entering its closed state.
//! Everything else WebRTC reports (ICE state, renegotiation, selected
//! candidate pair) is logged and otherwise discarded — the facade
//! deliberately flattens what could have been a deep inheritance
//! hierarchy of connection-state callbacks into these two.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::stats::StatsReport;

use meet_media_protocol::Status;

use crate::error::{ClientError, ClientResult};
use crate::http_connector::JoinConnector;

/// A remote track signaled while setting the remote description. The
/// facade does not retain this after the callback returns.
pub struct SignaledTrack {
    pub mid: String,
    pub media_type: RTPCodecType,
    pub track: Arc<webrtc::track::track_remote::TrackRemote>,
}

pub type TrackSignaledCallback = Box<dyn Fn(SignaledTrack) + Send + Sync>;
pub type DisconnectCallback = Box<dyn Fn(Status) + Send + Sync>;

/// The facade's contract, abstracted so the session state machine can be
/// tested against a fake instead of a live WebRTC stack.
#[async_trait]
pub trait PeerConnectionFacade: Send + Sync {
    /// Installs the underlying WebRTC handle. Must be called exactly once
    /// before any other method; not thread-safe.
    fn set_peer_connection(&self, handle: Arc<RTCPeerConnection>) -> ClientResult<()>;

    /// Single-subscriber slots; the callback must outlive this facade.
    fn set_disconnect_callback(&self, callback: DisconnectCallback);
    fn set_track_signaled_callback(&self, callback: TrackSignaledCallback);

    /// Opens a client-initiated data channel. Must be called before
    /// `connect` so the channel is included in the local offer.
    async fn open_data_channel(&self, label: &str) -> ClientResult<Arc<RTCDataChannel>>;

    /// Drives the offer/answer exchange through `join_connector`. Blocks
    /// until the local offer is created, sent, answered, and the remote
    /// description applied, or one of those steps fails.
    async fn connect(
        &self,
        join_endpoint: &str,
        conference_id: &str,
        access_token: &str,
    ) -> ClientResult<()>;

    /// Idempotent; closes the WebRTC handle. Must not be called from the
    /// WebRTC signaling thread (enforced by the state machine, not here).
    async fn close(&self);

    /// Forwards to the WebRTC handle; silently a no-op once closed.
    async fn get_stats(&self) -> StatsReport;
}

/// Default facade, backed by the `webrtc` crate.
///
/// The callback slots are independently `Arc`-wrapped (rather than cloning
/// `Arc<Self>` into the WebRTC callbacks) so installing handlers doesn't
/// require `self` to already be behind an `Arc`.
pub struct WebRtcPeerConnectionFacade {
    peer_connection: OnceLock<Arc<RTCPeerConnection>>,
    join_connector: Arc<dyn JoinConnector>,
    disconnect_callback: Arc<Mutex<Option<DisconnectCallback>>>,
    track_signaled_callback: Arc<Mutex<Option<TrackSignaledCallback>>>,
    closed: AtomicBool,
}

impl WebRtcPeerConnectionFacade {
    pub fn new(join_connector: Arc<dyn JoinConnector>) -> Self {
        WebRtcPeerConnectionFacade {
            peer_connection: OnceLock::new(),
            join_connector,
            disconnect_callback: Arc::new(Mutex::new(None)),
            track_signaled_callback: Arc::new(Mutex::new(None)),
            closed: AtomicBool::new(false),
        }
    }

    fn handle(&self) -> ClientResult<&Arc<RTCPeerConnection>> {
        self.peer_connection
            .get()
            .ok_or_else(|| ClientError::internal("peer connection not set"))
    }

    /// Wires the handlers this facade reacts to. Called once, from inside
    /// `set_peer_connection`.
    fn install_handlers(&self, handle: &Arc<RTCPeerConnection>) {
        let disconnect_callback = Arc::clone(&self.disconnect_callback);
        handle.on_peer_connection_state_change(Box::new(move |state| {
            if state == RTCPeerConnectionState::Closed {
                let callback = disconnect_callback.lock().unwrap();
                match callback.as_ref() {
                    Some(cb) => cb(Status::internal("Peer connection closed.")),
                    None => tracing::warn!("peer connection closed without a disconnect callback"),
                }
            } else {
                tracing::debug!(?state, "peer connection state changed");
            }
            Box::pin(async {})
        }));

        let track_signaled_callback = Arc::clone(&self.track_signaled_callback);
        handle.on_track(Box::new(move |track, _receiver, transceiver| {
            let track_signaled_callback = Arc::clone(&track_signaled_callback);
            Box::pin(async move {
                let mid = transceiver.mid().await;
                let mid = if mid.is_empty() {
                    tracing::error!("MID is not set for transceiver");
                    "unset".to_string()
                } else {
                    mid
                };
                let media_type = track.kind();
                let signaled = SignaledTrack {
                    mid,
                    media_type,
                    track,
                };
                let callback = track_signaled_callback.lock().unwrap();
                match callback.as_ref() {
                    Some(cb) => cb(signaled),
                    None => tracing::warn!("track signaled without a callback installed"),
                }
            })
        }));

        handle.on_data_channel(Box::new(move |data_channel| {
            tracing::error!(
                label = data_channel.label(),
                "data channel opened from server; closing it"
            );
            Box::pin(async move {
                let _ = data_channel.close().await;
            })
        }));
    }
}

#[async_trait]
impl PeerConnectionFacade for WebRtcPeerConnectionFacade {
    fn set_peer_connection(&self, handle: Arc<RTCPeerConnection>) -> ClientResult<()> {
        self.install_handlers(&handle);
        self.peer_connection
            .set(handle)
            .map_err(|_| ClientError::internal("peer connection already set"))
    }

    fn set_disconnect_callback(&self, callback: DisconnectCallback) {
        *self.disconnect_callback.lock().unwrap() = Some(callback);
    }

    fn set_track_signaled_callback(&self, callback: TrackSignaledCallback) {
        *self.track_signaled_callback.lock().unwrap() = Some(callback);
    }

    async fn open_data_channel(&self, label: &str) -> ClientResult<Arc<RTCDataChannel>> {
        let handle = self.handle()?;
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        handle
            .create_data_channel(label, Some(init))
            .await
            .map_err(|e| ClientError::internal(format!("creating data channel {label}: {e}")))
    }

    async fn connect(
        &self,
        join_endpoint: &str,
        conference_id: &str,
        access_token: &str,
    ) -> ClientResult<()> {
        let handle = self.handle()?;

        let offer = handle
            .create_offer(None)
            .await
            .map_err(|e| ClientError::internal(format!("creating local offer: {e}")))?;
        handle
            .set_local_description(offer)
            .await
            .map_err(|e| ClientError::internal(format!("setting local description: {e}")))?;
        let local_description = handle
            .local_description()
            .await
            .ok_or_else(|| ClientError::internal("no local description after setting offer"))?;

        let answer_sdp = self
            .join_connector
            .connect_active_conference(
                join_endpoint,
                conference_id,
                access_token,
                &local_description.sdp,
            )
            .await?;

        let answer = RTCSessionDescription::answer(answer_sdp)
            .map_err(|e| ClientError::internal(format!("parsing answer SDP: {e}")))?;
        handle
            .set_remote_description(answer)
            .await
            .map_err(|e| ClientError::internal(format!("setting remote description: {e}")))?;

        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::warn!("peer connection facade close() called twice");
            return;
        }
        if let Some(handle) = self.peer_connection.get() {
            if let Err(e) = handle.close().await {
                tracing::error!(error = %e, "failed to close peer connection");
            }
        }
    }

    async fn get_stats(&self) -> StatsReport {
        if self.closed.load(Ordering::Acquire) {
            return StatsReport {
                reports: Default::default(),
            };
        }
        match self.peer_connection.get() {
            Some(handle) => handle.get_stats().await,
            None => StatsReport {
                reports: Default::default(),
            },
        }
    }
}

/// Builds an `RTCPeerConnection` with default codecs and interceptors and
/// a public STUN server. Constructing and configuring the underlying
/// WebRTC engine is an embedder concern, not this crate's; this helper
/// exists only so `crates/demos` has something concrete to hand to
/// [`PeerConnectionFacade::set_peer_connection`].
pub async fn build_default_peer_connection() -> ClientResult<Arc<RTCPeerConnection>> {
    use webrtc::api::interceptor_registry::register_default_interceptors;
    use webrtc::api::media_engine::MediaEngine;
    use webrtc::api::APIBuilder;
    use webrtc::ice_transport::ice_server::RTCIceServer;
    use webrtc::interceptor::registry::Registry;
    use webrtc::peer_connection::configuration::RTCConfiguration;

    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(|e| ClientError::internal(format!("registering default codecs: {e}")))?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)
        .map_err(|e| ClientError::internal(format!("registering interceptors: {e}")))?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let config = RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: vec!["stun:stun.l.google.com:19302".to_owned()],
            ..Default::default()
        }],
        ..Default::default()
    };

    let peer_connection = api
        .new_peer_connection(config)
        .await
        .map_err(|e| ClientError::internal(format!("creating peer connection: {e}")))?;
    Ok(Arc::new(peer_connection))
}
