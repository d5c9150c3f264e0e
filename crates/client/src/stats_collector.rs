use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use webrtc::stats::{StatsReport, StatsReportType};

use meet_media_protocol::media_stats::{
    MediaStatsConfiguration, MediaStatsSection, UploadMediaStatsRequest,
};

use crate::dispatcher::Dispatcher;
use crate::error::ClientResult;
use crate::peer_connection::PeerConnectionFacade;

/// One `RTCStats` entry reduced to a string-keyed attribute bag,
/// independent of which concrete `webrtc` stats struct produced it. This
/// is the shape the allowlist filter actually operates over, which keeps
/// the filtering algorithm itself free of any live peer connection.
#[derive(Debug, Clone)]
pub struct RawStatsSection {
    pub id: String,
    pub section_type: String,
    pub attributes: serde_json::Map<String, Value>,
}

fn section_type_name(report: &StatsReportType) -> &'static str {
    match report {
        StatsReportType::CandidatePair(_) => "candidate-pair",
        StatsReportType::CertificateStats(_) => "certificate",
        StatsReportType::Codec(_) => "codec",
        StatsReportType::DataChannel(_) => "data-channel",
        StatsReportType::LocalCandidate(_) => "local-candidate",
        StatsReportType::PeerConnection(_) => "peer-connection",
        StatsReportType::RemoteCandidate(_) => "remote-candidate",
        StatsReportType::SCTPTransport(_) => "sctp-transport",
        StatsReportType::Transport(_) => "transport",
    }
}

/// `RTCStats` base fields present on every section's full serialization;
/// these are carried separately (`RawStatsSection::id`) or not at all, and
/// must never leak into the allowlist-filtered attribute values.
const BASE_STATS_FIELDS: [&str; 3] = ["id", "type", "timestamp"];

/// Flattens a live `StatsReport` into attribute bags keyed by the section
/// type the allowlist references.
pub fn raw_sections_from_report(report: &StatsReport) -> Vec<RawStatsSection> {
    report
        .reports
        .iter()
        .filter_map(|(id, entry)| {
            let section_type = section_type_name(entry).to_string();
            match serde_json::to_value(entry) {
                Ok(Value::Object(mut attributes)) => {
                    for field in BASE_STATS_FIELDS {
                        attributes.remove(field);
                    }
                    Some(RawStatsSection {
                        id: id.clone(),
                        section_type,
                        attributes,
                    })
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize stats entry");
                    None
                }
            }
        })
        .collect()
}

/// Canonical decimal-string form of a scalar attribute value. Non-scalar
/// values have no canonical form and are skipped, same as a value that
/// is simply absent.
fn canonical_value_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// The allowlist-filtering algorithm: for each reported section whose
/// type is in the allowlist, keep only the attributes both present on
/// the section and named in that type's allowed set. A section that
/// ends up with no surviving attributes is dropped entirely.
pub fn filter_sections(
    raw: &[RawStatsSection],
    allowlist: &HashMap<String, HashSet<String>>,
) -> Vec<MediaStatsSection> {
    let mut sections = Vec::new();
    for section in raw {
        let Some(allowed_attributes) = allowlist.get(&section.section_type) else {
            continue;
        };
        let mut values = HashMap::new();
        for attribute_name in allowed_attributes {
            if let Some(value) = section.attributes.get(attribute_name) {
                if let Some(canonical) = canonical_value_string(value) {
                    values.insert(attribute_name.clone(), canonical);
                }
            }
        }
        if !values.is_empty() {
            sections.push(MediaStatsSection {
                section_type: section.section_type.clone(),
                id: section.id.clone(),
                values,
            });
        }
    }
    sections
}

/// Periodically queries the peer connection for a stats report, filters
/// it, and submits an `upload-media-stats` request on the `media-stats`
/// channel. Scheduling is a self-perpetuating loop guarded by a liveness
/// flag rather than a cancellable timer handle.
pub struct StatsCollector {
    peer_connection: Arc<dyn PeerConnectionFacade>,
    dispatcher: Arc<Dispatcher>,
    alive: Arc<AtomicBool>,
    started: AtomicBool,
}

impl StatsCollector {
    pub fn new(peer_connection: Arc<dyn PeerConnectionFacade>, dispatcher: Arc<Dispatcher>) -> Self {
        StatsCollector {
            peer_connection,
            dispatcher,
            alive: Arc::new(AtomicBool::new(true)),
            started: AtomicBool::new(false),
        }
    }

    /// Starts the periodic upload loop. A zero interval disables uploads
    /// entirely, treating it as a "configuration arrived but nothing to
    /// do" no-op. The configuration is delivered exactly once and is
    /// immutable thereafter, so a second call is a no-op.
    pub fn start(self: &Arc<Self>, configuration: MediaStatsConfiguration) {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!("media-stats configuration arrived more than once; ignoring");
            return;
        }
        if configuration.upload_interval_seconds <= 0 {
            tracing::warn!("media-stats upload interval is zero; uploads disabled");
            return;
        }
        let interval = Duration::from_secs(configuration.upload_interval_seconds as u64);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !this.alive.load(Ordering::Acquire) {
                    break;
                }
                if let Err(e) = this.collect_once(&configuration).await {
                    tracing::warn!(error = %e, "media stats upload failed");
                }
            }
        });
    }

    async fn collect_once(&self, configuration: &MediaStatsConfiguration) -> ClientResult<()> {
        let report = self.peer_connection.get_stats().await;
        let raw = raw_sections_from_report(&report);
        let sections = filter_sections(&raw, &configuration.allowlist);
        if sections.is_empty() {
            return Ok(());
        }
        self.dispatcher
            .send_media_stats_upload(UploadMediaStatsRequest { sections })
            .await
    }

    /// Cancels the upload loop. Idempotent; called once from session
    /// teardown when the peer connection closes.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use webrtc::stats::{CodecStats, RTCStatsType};

    #[test]
    fn raw_sections_strip_base_stats_fields() {
        let mut reports = HashMap::new();
        reports.insert(
            "1".to_string(),
            StatsReportType::Codec(CodecStats {
                timestamp: Instant::now(),
                stats_type: RTCStatsType::Codec,
                id: "1".to_string(),
                payload_type: 111,
                mime_type: "video/VP8".to_string(),
                channels: 0,
                clock_rate: 90000,
                sdp_fmtp_line: String::new(),
            }),
        );
        let report = StatsReport { reports };

        let raw = raw_sections_from_report(&report);
        assert_eq!(raw.len(), 1);
        assert!(!raw[0].attributes.contains_key("id"));
        assert!(!raw[0].attributes.contains_key("type"));
        assert!(!raw[0].attributes.contains_key("timestamp"));

        let mut allowlist = HashMap::new();
        allowlist.insert(
            "codec".to_string(),
            HashSet::from([
                "id".to_string(),
                "mimeType".to_string(),
                "payloadType".to_string(),
            ]),
        );
        let sections = filter_sections(&raw, &allowlist);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "1");
        assert_eq!(sections[0].values.len(), 2);
        assert_eq!(sections[0].values["mimeType"], "video/VP8");
        assert_eq!(sections[0].values["payloadType"], "111");
        assert!(!sections[0].values.contains_key("id"));
    }

    fn section(id: &str, section_type: &str, attrs: serde_json::Value) -> RawStatsSection {
        RawStatsSection {
            id: id.to_string(),
            section_type: section_type.to_string(),
            attributes: attrs.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn keeps_only_allowlisted_attributes() {
        let raw = vec![section(
            "rtp-1",
            "outbound-rtp",
            json!({"packetsSent": 42, "bytesSent": 1000, "ssrc": 12345}),
        )];
        let mut allowlist = HashMap::new();
        allowlist.insert(
            "outbound-rtp".to_string(),
            HashSet::from(["packetsSent".to_string()]),
        );

        let sections = filter_sections(&raw, &allowlist);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].values.len(), 1);
        assert_eq!(sections[0].values["packetsSent"], "42");
    }

    #[test]
    fn drops_section_type_not_in_allowlist() {
        let raw = vec![section("cp-1", "candidate-pair", json!({"bytesSent": 1}))];
        let allowlist = HashMap::new();
        assert!(filter_sections(&raw, &allowlist).is_empty());
    }

    #[test]
    fn drops_section_with_no_surviving_attributes() {
        let raw = vec![section("rtp-1", "outbound-rtp", json!({"ssrc": 1}))];
        let mut allowlist = HashMap::new();
        allowlist.insert(
            "outbound-rtp".to_string(),
            HashSet::from(["packetsSent".to_string()]),
        );
        assert!(filter_sections(&raw, &allowlist).is_empty());
    }

    #[test]
    fn missing_attribute_value_is_skipped_not_empty_string() {
        let raw = vec![section(
            "rtp-1",
            "outbound-rtp",
            json!({"packetsSent": null}),
        )];
        let mut allowlist = HashMap::new();
        allowlist.insert(
            "outbound-rtp".to_string(),
            HashSet::from(["packetsSent".to_string()]),
        );
        assert!(filter_sections(&raw, &allowlist).is_empty());
    }

    #[test]
    fn canonical_numeric_string_has_no_separators() {
        let raw = vec![section(
            "rtp-1",
            "outbound-rtp",
            json!({"bytesSent": 1000000}),
        )];
        let mut allowlist = HashMap::new();
        allowlist.insert(
            "outbound-rtp".to_string(),
            HashSet::from(["bytesSent".to_string()]),
        );
        let sections = filter_sections(&raw, &allowlist);
        assert_eq!(sections[0].values["bytesSent"], "1000000");
    }
}
