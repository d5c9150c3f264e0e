use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Data-channel label. `SessionControl` and `MediaStats` are opened
/// unconditionally by the client; the rest are gated by
/// [`Config::enabled_channels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelLabel {
    SessionControl,
    MediaStats,
    Participants,
    MediaEntries,
    VideoAssignment,
}

impl ChannelLabel {
    /// The literal string used as the WebRTC data channel label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelLabel::SessionControl => "session-control",
            ChannelLabel::MediaStats => "media-stats",
            ChannelLabel::Participants => "participants",
            ChannelLabel::MediaEntries => "media-entries",
            ChannelLabel::VideoAssignment => "video-assignment",
        }
    }

    /// Channels opened regardless of embedder configuration.
    pub fn required() -> [ChannelLabel; 2] {
        [ChannelLabel::SessionControl, ChannelLabel::MediaStats]
    }
}

/// Top-level configuration recognized by the client.
///
/// All fields are optional so a `Config::default()` (or an empty TOML
/// document) is always valid; callers fill in what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to a CA bundle used to validate the join endpoint's certificate.
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    /// Base URL for the Meet join endpoint, e.g. `https://meet.googleapis.com`.
    #[serde(default)]
    pub join_endpoint: Option<String>,
    /// Conference space ID.
    #[serde(default)]
    pub conference_id: Option<String>,
    /// OAuth bearer token presented to the join endpoint.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Optional data channels to open in addition to the required two.
    #[serde(default)]
    pub enabled_channels: HashSet<ChannelLabel>,
}

impl Config {
    /// All channels this configuration will open: the two required ones
    /// plus whatever optional channels were enabled.
    pub fn channels(&self) -> Vec<ChannelLabel> {
        let mut channels: Vec<ChannelLabel> = ChannelLabel::required().to_vec();
        for label in &self.enabled_channels {
            if !channels.contains(label) {
                channels.push(*label);
            }
        }
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.ca_cert_path.is_none());
        assert!(config.join_endpoint.is_none());
        assert!(config.enabled_channels.is_empty());
    }

    #[test]
    fn channels_always_includes_required() {
        let config = Config::default();
        let channels = config.channels();
        assert!(channels.contains(&ChannelLabel::SessionControl));
        assert!(channels.contains(&ChannelLabel::MediaStats));
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn channels_includes_enabled_optional_channels() {
        let mut config = Config::default();
        config.enabled_channels.insert(ChannelLabel::Participants);
        let channels = config.channels();
        assert_eq!(channels.len(), 3);
        assert!(channels.contains(&ChannelLabel::Participants));
    }

    #[test]
    fn channel_label_as_str_matches_wire_labels() {
        assert_eq!(ChannelLabel::SessionControl.as_str(), "session-control");
        assert_eq!(ChannelLabel::MediaStats.as_str(), "media-stats");
        assert_eq!(ChannelLabel::VideoAssignment.as_str(), "video-assignment");
    }
}
