//! Sample consumer for `meet-media-client`: joins a conference, tracks
//! participant/media-entry bookkeeping via [`ResourceManager`], and dumps
//! audio/video frames to per-contributing-source files under
//! `--output-dir`. None of this is part of the hard core; it only
//! exercises the public API.

mod cli;
mod output_writer;
mod resource_manager;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use meet_media_client::{
    AudioFrame, ClientResult, Observer, ReqwestJoinConnector, ResourceUpdate, Session, VideoFrame,
};
use meet_media_protocol::config::ChannelLabel;
use meet_media_protocol::{Config, Status};

use output_writer::{file_writer_provider, write_pcm16, write_yuv420, FileOutputWriter, OutputWriter};
use resource_manager::ResourceManager;

struct DemoObserver {
    resource_manager: Mutex<ResourceManager>,
    writer_provider: Box<dyn Fn(&str) -> FileOutputWriter + Send + Sync>,
    audio_writers: Mutex<HashMap<u32, FileOutputWriter>>,
    video_writers: Mutex<HashMap<u32, FileOutputWriter>>,
    disconnected: Arc<Notify>,
}

impl DemoObserver {
    fn identifier_or_csrc(&self, csrc: u32) -> String {
        match self.resource_manager.lock().unwrap().output_file_identifier(csrc) {
            Ok(id) => id,
            Err(_) => format!("unknown_csrc_{csrc}"),
        }
    }
}

impl Observer for DemoObserver {
    fn on_joined(&self) {
        info!("joined conference");
    }

    fn on_disconnected(&self, status: Status) {
        if status.is_ok() {
            info!("disconnected cleanly");
        } else {
            error!(code = status.code, message = %status.message, "disconnected with an error");
        }
        self.disconnected.notify_one();
    }

    fn on_resource_update(&self, update: ResourceUpdate) {
        match update {
            ResourceUpdate::Participants(u) => self.resource_manager.lock().unwrap().on_participants_update(&u),
            ResourceUpdate::MediaEntries(u) => self.resource_manager.lock().unwrap().on_media_entries_update(&u),
            ResourceUpdate::SessionControl(_) | ResourceUpdate::MediaStats(_) | ResourceUpdate::VideoAssignment(_) => {}
        }
    }

    fn on_audio_frame(&self, frame: AudioFrame) {
        let identifier = format!("{}.pcm", self.identifier_or_csrc(frame.source_csrc));
        let mut writers = self.audio_writers.lock().unwrap();
        let writer = writers
            .entry(frame.source_csrc)
            .or_insert_with(|| (self.writer_provider)(&identifier));
        if let Err(e) = write_pcm16(&frame.samples, writer) {
            warn!(csrc = frame.source_csrc, error = %e, "failed to write audio frame");
        }
    }

    fn on_video_frame(&self, frame: VideoFrame) {
        let identifier = format!("{}.yuv", self.identifier_or_csrc(frame.source_csrc));
        let mut writers = self.video_writers.lock().unwrap();
        let writer = writers
            .entry(frame.source_csrc)
            .or_insert_with(|| (self.writer_provider)(&identifier));
        if let Err(e) = write_yuv420(&frame.data, writer) {
            warn!(csrc = frame.source_csrc, error = %e, "failed to write video frame");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::parse_args()?;
    info!(
        join_endpoint = %args.join_endpoint,
        conference_id = %args.conference_id,
        "starting meet-media-demo"
    );

    let output_dir = PathBuf::from(&args.output_dir);
    output_writer::ensure_output_dir(&output_dir)?;

    let mut enabled_channels = std::collections::HashSet::new();
    if args.enable_participants {
        enabled_channels.insert(ChannelLabel::Participants);
    }
    if args.enable_media_entries {
        enabled_channels.insert(ChannelLabel::MediaEntries);
    }
    if args.enable_video_assignment {
        enabled_channels.insert(ChannelLabel::VideoAssignment);
    }

    let config = Config {
        ca_cert_path: args.ca_cert_path.clone(),
        join_endpoint: Some(args.join_endpoint.clone()),
        conference_id: Some(args.conference_id.clone()),
        access_token: Some(args.access_token.clone()),
        enabled_channels,
    };

    let event_log = Box::new(FileOutputWriter::new(output_dir.join("events.log")));
    let disconnected = Arc::new(Notify::new());
    let observer = Arc::new(DemoObserver {
        resource_manager: Mutex::new(ResourceManager::new(event_log)),
        writer_provider: Box::new(file_writer_provider(output_dir.clone())),
        audio_writers: Mutex::new(HashMap::new()),
        video_writers: Mutex::new(HashMap::new()),
        disconnected: Arc::clone(&disconnected),
    });

    let join_connector = Arc::new(
        ReqwestJoinConnector::new(args.ca_cert_path.as_deref()).context("building join connector")?,
    );

    let session = Session::new(config, observer, join_connector);
    let peer_connection = meet_media_client::build_default_peer_connection()
        .await
        .context("building peer connection")?;
    // Wiring the live WebRTC handle into the session's facade is the
    // embedder's job; this demo does the minimal version of that wiring
    // so `connect()` has something to drive.
    wire_peer_connection(&session, peer_connection).await?;

    session.connect().context("connect() rejected")?;

    tokio::select! {
        _ = disconnected.notified() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C, leaving conference");
            let _ = session.leave();
            disconnected.notified().await;
        }
    }

    info!("meet-media-demo exiting");
    Ok(())
}

async fn wire_peer_connection(
    session: &Arc<Session>,
    handle: Arc<webrtc::peer_connection::RTCPeerConnection>,
) -> ClientResult<()> {
    session.set_peer_connection(handle)
}
