//! `meet-media-client`: the conference session orchestrator.
//!
//! This crate owns the whole orchestration surface: the HTTP join
//! connector, the peer-connection facade, the five resource channel
//! codecs, the data-channel dispatcher, the stats collector, and the
//! session state machine that ties them together behind a single
//! [`Observer`] push surface.
//!
//! The WebRTC engine itself, the media sample sinks, and the embedding
//! application's CLI/config/logging are collaborators, not part of this
//! crate.

pub mod codecs;
pub mod dispatcher;
pub mod error;
pub mod http_connector;
pub mod observer;
pub mod peer_connection;
pub mod session;
pub mod stats_collector;

pub use dispatcher::{Dispatcher, OutboundRequest, UpdateSink};
pub use error::{ClientError, ClientResult};
pub use http_connector::{JoinConnector, ReqwestJoinConnector};
pub use observer::{AudioFrame, Observer, ResourceUpdate, VideoFrame};
pub use peer_connection::{
    build_default_peer_connection, PeerConnectionFacade, SignaledTrack, WebRtcPeerConnectionFacade,
};
pub use session::{Session, SessionState};
pub use stats_collector::StatsCollector;
