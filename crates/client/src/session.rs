//! The top-level orchestrator. Accepts `connect`/`leave`/`send-request`
//! from the embedder, sequences the join connector and peer-connection
//! facade for join, and transitions Ready → Connecting → Joining →
//! Joined → Disconnected on signals from the dispatcher, the facade, or
//! the embedder, guaranteeing single-shot disconnect with teardown of
//! the facade, dispatcher, and stats collector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, oneshot};

use meet_media_protocol::config::ChannelLabel;
use meet_media_protocol::media_stats::MediaStatsUpdate;
use meet_media_protocol::session_control::{ConnectionState, SessionControlUpdate};
use meet_media_protocol::{Config, Status};

use crate::dispatcher::{Dispatcher, OutboundRequest, UpdateSink};
use crate::error::{ClientError, ClientResult};
use crate::observer::{AudioFrame, Observer, ResourceUpdate, VideoFrame};
use crate::http_connector::JoinConnector;
use crate::peer_connection::{PeerConnectionFacade, SignaledTrack, WebRtcPeerConnectionFacade};
use crate::stats_collector::StatsCollector;

/// Session state. Created `Ready`; monotonically advances; `Disconnected`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Connecting,
    Joining,
    Joined,
    Disconnected,
}

/// Work posted to the single dedicated worker task: all blocking or
/// state-advancing work is expressed as a job drained in order by one
/// task, giving the same total-ordering guarantee as a single worker
/// thread without needing a coroutine scheduler.
enum WorkerJob {
    Connect,
    Leave,
    Disconnect(Status),
    SendRequest(OutboundRequest, oneshot::Sender<ClientResult<()>>),
}

/// The conference session orchestrator.
pub struct Session {
    config: Config,
    observer: Arc<dyn Observer>,
    peer_connection: Arc<dyn PeerConnectionFacade>,
    dispatcher: Arc<Dispatcher>,
    stats_collector: Arc<StatsCollector>,
    state: Mutex<SessionState>,
    disconnected_once: AtomicBool,
    joined_once: AtomicBool,
    worker_tx: mpsc::UnboundedSender<WorkerJob>,
}

impl Session {
    /// Builds a session wired to a live WebRTC facade. `join_connector`
    /// defaults to [`crate::http_connector::ReqwestJoinConnector`] in
    /// ordinary use; tests substitute a fake.
    ///
    /// The peer-connection facade's callbacks capture only a weak
    /// back-reference to this session plus the facade's own liveness,
    /// avoiding the ownership cycle a strong reference would create.
    pub fn new(config: Config, observer: Arc<dyn Observer>, join_connector: Arc<dyn JoinConnector>) -> Arc<Self> {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();

        let session = Arc::new_cyclic(|weak: &Weak<Session>| {
            let peer_connection: Arc<dyn PeerConnectionFacade> =
                Arc::new(WebRtcPeerConnectionFacade::new(join_connector));

            let update_sink: Weak<dyn UpdateSink> = weak.clone();
            let dispatcher = Arc::new(Dispatcher::new(update_sink));

            let stats_collector = Arc::new(StatsCollector::new(
                Arc::clone(&peer_connection),
                Arc::clone(&dispatcher),
            ));

            Session {
                config,
                observer,
                peer_connection,
                dispatcher,
                stats_collector,
                state: Mutex::new(SessionState::Ready),
                disconnected_once: AtomicBool::new(false),
                joined_once: AtomicBool::new(false),
                worker_tx,
            }
        });

        let disconnect_weak = Arc::downgrade(&session);
        session
            .peer_connection
            .set_disconnect_callback(Box::new(move |status| {
                if let Some(session) = disconnect_weak.upgrade() {
                    session.disconnect(status);
                }
            }));

        let track_weak = Arc::downgrade(&session);
        session
            .peer_connection
            .set_track_signaled_callback(Box::new(move |track| {
                if let Some(session) = track_weak.upgrade() {
                    session.handle_track_signaled(track);
                }
            }));

        let worker_session = Arc::clone(&session);
        tokio::spawn(async move {
            worker_session.run_worker(worker_rx).await;
        });

        session
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Installs the externally-built WebRTC handle into this session's
    /// peer-connection facade. Building the `RTCPeerConnection` itself
    /// (media engine, ICE servers, interceptors) is the embedder's
    /// responsibility, not this crate's; this call must happen exactly
    /// once, before `connect`.
    pub fn set_peer_connection(
        &self,
        handle: Arc<webrtc::peer_connection::RTCPeerConnection>,
    ) -> ClientResult<()> {
        self.peer_connection.set_peer_connection(handle)
    }

    /// Rejected with `failed-precondition` unless the session is `Ready`.
    /// The blocking join sequencing itself runs on the worker so this
    /// call never blocks on the network.
    pub fn connect(&self) -> ClientResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Ready {
                return Err(ClientError::FailedPrecondition(
                    "connect requires the session to be Ready".into(),
                ));
            }
            *state = SessionState::Connecting;
        }
        self.worker_tx
            .send(WorkerJob::Connect)
            .map_err(|_| ClientError::internal("worker unavailable"))
    }

    /// Best-effort send of a `leave` request; the session is forcibly
    /// disconnected afterward unless it was `Joined`, in which case it
    /// waits for the server's `Disconnected` snapshot.
    pub fn leave(&self) -> ClientResult<()> {
        self.worker_tx
            .send(WorkerJob::Leave)
            .map_err(|_| ClientError::internal("worker unavailable"))
    }

    /// Forces disconnection with the supplied status. Idempotent and
    /// exactly-once observable; posts to the worker so it is never
    /// executed inline on the WebRTC signaling or network thread.
    pub fn disconnect(&self, status: Status) {
        let _ = self.worker_tx.send(WorkerJob::Disconnect(status));
    }

    /// Embedder-driven requests on `session-control`/`video-assignment`.
    /// `media-stats` uploads have no variant here by construction — the
    /// stats collector alone drives that channel; the embedder must not
    /// drive stats uploads directly.
    pub async fn send_request(&self, request: OutboundRequest) -> ClientResult<()> {
        if *self.state.lock().unwrap() == SessionState::Disconnected {
            return Err(ClientError::FailedPrecondition(
                "session is disconnected".into(),
            ));
        }
        let (tx, rx) = oneshot::channel();
        self.worker_tx
            .send(WorkerJob::SendRequest(request, tx))
            .map_err(|_| ClientError::internal("worker unavailable"))?;
        rx.await.map_err(|_| ClientError::internal("worker dropped the response"))?
    }

    async fn run_worker(self: Arc<Self>, mut jobs: mpsc::UnboundedReceiver<WorkerJob>) {
        while let Some(job) = jobs.recv().await {
            match job {
                WorkerJob::Connect => self.handle_connect().await,
                WorkerJob::Leave => self.handle_leave().await,
                WorkerJob::Disconnect(status) => self.do_disconnect(status).await,
                WorkerJob::SendRequest(request, reply) => {
                    let result = self.dispatcher.send_request(request).await;
                    let _ = reply.send(result);
                }
            }
        }
    }

    async fn handle_connect(&self) {
        for label in self.config.channels() {
            match self.peer_connection.open_data_channel(label.as_str()).await {
                Ok(handle) => self.dispatcher.register_channel(label, handle),
                Err(e) => {
                    tracing::error!(channel = label.as_str(), error = %e, "failed to open data channel");
                    self.do_disconnect(e.to_status()).await;
                    return;
                }
            }
        }

        let join_endpoint = self.config.join_endpoint.clone().unwrap_or_default();
        let conference_id = self.config.conference_id.clone().unwrap_or_default();
        let access_token = self.config.access_token.clone().unwrap_or_default();

        match self
            .peer_connection
            .connect(&join_endpoint, &conference_id, &access_token)
            .await
        {
            Ok(()) => {
                *self.state.lock().unwrap() = SessionState::Joining;
            }
            Err(e) => {
                tracing::error!(error = %e, "join sequencing failed");
                self.do_disconnect(e.to_status()).await;
            }
        }
    }

    async fn handle_leave(&self) {
        let state = *self.state.lock().unwrap();
        if state == SessionState::Disconnected {
            tracing::warn!("leave called after the session already disconnected");
            return;
        }
        if let Err(e) = self.dispatcher.send_request(OutboundRequest::Leave).await {
            tracing::warn!(error = %e, "failed to send leave request");
        }
        if state != SessionState::Joined {
            self.do_disconnect(Status::internal("leave called outside Joined")).await;
        }
        // Joined: the server's Disconnected snapshot drives the actual
        // teardown via `handle_session_control_update`.
    }

    async fn do_disconnect(&self, status: Status) {
        if self.disconnected_once.swap(true, Ordering::AcqRel) {
            tracing::warn!("disconnect called more than once; ignoring");
            return;
        }
        *self.state.lock().unwrap() = SessionState::Disconnected;
        self.stats_collector.stop();
        self.peer_connection.close().await;
        self.observer.on_disconnected(status);
    }

    fn handle_session_control_update(&self, update: &SessionControlUpdate) {
        for resource in &update.resources {
            match resource.session_status.connection_state {
                ConnectionState::Joined => self.on_joined_snapshot(),
                ConnectionState::Disconnected => self.disconnect(Status::ok()),
                ConnectionState::Waiting | ConnectionState::Unknown => {}
            }
        }
    }

    fn on_joined_snapshot(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != SessionState::Joining {
            return;
        }
        *state = SessionState::Joined;
        drop(state);
        if !self.joined_once.swap(true, Ordering::AcqRel) {
            self.observer.on_joined();
        }
    }

    fn handle_media_stats_update(&self, update: &MediaStatsUpdate) {
        if let Some(configuration) = &update.configuration {
            self.stats_collector.start(configuration.clone());
        }
    }

    /// Reads RTP packets off a newly signaled track and forwards them as
    /// typed frames — media frames bypass the JSON channels entirely.
    /// Actual media decoding is out of this core's scope; payload bytes
    /// are forwarded as received.
    fn handle_track_signaled(&self, track: SignaledTrack) {
        tracing::info!(mid = %track.mid, ?track.media_type, "track signaled");
        let observer = Arc::clone(&self.observer);
        tokio::spawn(async move { forward_track(track, observer).await });
    }
}

impl UpdateSink for Session {
    fn handle_update(&self, label: ChannelLabel, update: ResourceUpdate) {
        // Fired to the embedder before this core's own handling of the
        // session-control/media-stats variants.
        self.observer.on_resource_update(update.clone());
        match &update {
            ResourceUpdate::SessionControl(u) => self.handle_session_control_update(u),
            ResourceUpdate::MediaStats(u) => self.handle_media_stats_update(u),
            ResourceUpdate::Participants(_)
            | ResourceUpdate::MediaEntries(_)
            | ResourceUpdate::VideoAssignment(_) => {}
        }
    }
}

async fn forward_track(track: SignaledTrack, observer: Arc<dyn Observer>) {
    use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

    let source_csrc = track.track.ssrc();
    let codec = track.track.codec();
    loop {
        match track.track.read_rtp().await {
            Ok((packet, _attributes)) => match track.media_type {
                RTPCodecType::Audio => {
                    let samples = packet
                        .payload
                        .chunks_exact(2)
                        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                        .collect();
                    observer.on_audio_frame(AudioFrame {
                        source_csrc,
                        sample_rate_hz: codec.capability.clock_rate,
                        channels: codec.capability.channels,
                        samples,
                    });
                }
                RTPCodecType::Video => {
                    observer.on_video_frame(VideoFrame {
                        source_csrc,
                        width: 0,
                        height: 0,
                        data: packet.payload.to_vec(),
                    });
                }
                RTPCodecType::Unspecified => {}
            },
            Err(e) => {
                tracing::debug!(mid = %track.mid, error = %e, "track read ended");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex as StdMutex;
    use webrtc::stats::StatsReport;

    struct RecordingObserver {
        joined: AtomicUsize,
        disconnected: AtomicUsize,
        last_status: StdMutex<Option<Status>>,
    }

    impl RecordingObserver {
        fn new() -> Self {
            RecordingObserver {
                joined: AtomicUsize::new(0),
                disconnected: AtomicUsize::new(0),
                last_status: StdMutex::new(None),
            }
        }
    }

    impl Observer for RecordingObserver {
        fn on_joined(&self) {
            self.joined.fetch_add(1, AtomicOrdering::SeqCst);
        }

        fn on_disconnected(&self, status: Status) {
            self.disconnected.fetch_add(1, AtomicOrdering::SeqCst);
            *self.last_status.lock().unwrap() = Some(status);
        }
    }

    struct NullJoinConnector;

    #[async_trait]
    impl JoinConnector for NullJoinConnector {
        async fn connect_active_conference(
            &self,
            _join_endpoint: &str,
            _conference_id: &str,
            _access_token: &str,
            _sdp_offer: &str,
        ) -> ClientResult<String> {
            Err(ClientError::internal("no network in tests"))
        }
    }

    fn new_test_session() -> (Arc<Session>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let session = Session::new(
            Config::default(),
            observer.clone() as Arc<dyn Observer>,
            Arc::new(NullJoinConnector),
        );
        (session, observer)
    }

    #[tokio::test]
    async fn starts_ready() {
        let (session, _observer) = new_test_session();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn connect_twice_is_rejected() {
        let (session, _observer) = new_test_session();
        // Manually advance state without a running worker, mirroring the
        // precondition check `connect` performs before posting work.
        *session.state.lock().unwrap() = SessionState::Connecting;
        assert!(matches!(
            session.connect(),
            Err(ClientError::FailedPrecondition(_))
        ));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (session, observer) = new_test_session();
        session.do_disconnect(Status::ok()).await;
        session.do_disconnect(Status::internal("ignored")).await;
        assert_eq!(observer.disconnected.load(AtomicOrdering::SeqCst), 1);
        assert!(observer.last_status.lock().unwrap().as_ref().unwrap().is_ok());
    }

    #[tokio::test]
    async fn joined_snapshot_fires_on_joined_once() {
        let (session, observer) = new_test_session();
        *session.state.lock().unwrap() = SessionState::Joining;
        session.on_joined_snapshot();
        session.on_joined_snapshot();
        assert_eq!(observer.joined.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Joined);
    }

    #[tokio::test]
    async fn joined_snapshot_ignored_outside_joining() {
        let (session, observer) = new_test_session();
        // Still Ready: a stray snapshot must not advance state.
        session.on_joined_snapshot();
        assert_eq!(observer.joined.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(session.state(), SessionState::Ready);
    }

}
