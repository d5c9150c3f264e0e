//! A sample participant/media-entry bookkeeping layer: a collaborator
//! outside the hard core that consumes
//! [`meet_media_client::ResourceUpdate`] and has no effect on the session
//! state machine.
//!
//! Not thread-safe: callers are expected to drive it from a single task
//! (here, the demo binary's observer callback).

use std::collections::HashMap;

use meet_media_protocol::media_entries::MediaEntriesUpdate;
use meet_media_protocol::participants::{ParticipantKind, ParticipantsUpdate};

use crate::output_writer::OutputWriter;

type ParticipantKey = String;
type ParticipantSessionName = String;
type ContributingSource = u32;
type ParticipantId = i64;
type MediaEntryId = i64;

struct Participant {
    participant_key: ParticipantKey,
    participant_id: ParticipantId,
    display_name: String,
}

struct MediaEntry {
    participant_session_name: ParticipantSessionName,
    participant_key: ParticipantKey,
    media_entry_id: MediaEntryId,
    audio_csrc: ContributingSource,
    video_csrcs: Vec<ContributingSource>,
}

/// Tracks participant and media-entry metadata and writes a human-readable
/// event log, matching `ResourceManager`'s two responsibilities.
pub struct ResourceManager {
    event_log: Box<dyn OutputWriter>,

    participants_by_key: HashMap<ParticipantKey, Participant>,
    participants_by_id: HashMap<ParticipantId, ParticipantKey>,

    media_entries_by_session_name: HashMap<ParticipantSessionName, MediaEntry>,
    media_entries_by_id: HashMap<MediaEntryId, ParticipantSessionName>,
    media_entries_by_csrc: HashMap<ContributingSource, ParticipantSessionName>,
}

impl ResourceManager {
    pub fn new(event_log: Box<dyn OutputWriter>) -> Self {
        ResourceManager {
            event_log,
            participants_by_key: HashMap::new(),
            participants_by_id: HashMap::new(),
            media_entries_by_session_name: HashMap::new(),
            media_entries_by_id: HashMap::new(),
            media_entries_by_csrc: HashMap::new(),
        }
    }

    /// `participants/{participant}` -> `{participant}`.
    fn parse_participant_key(participant_key: Option<&str>) -> anyhow::Result<String> {
        let participant_key =
            participant_key.ok_or_else(|| anyhow::anyhow!("participant key is empty"))?;
        let parts: Vec<&str> = participant_key.split('/').collect();
        if parts.len() != 2 {
            anyhow::bail!("participant key is not in the expected format: {participant_key}");
        }
        Ok(parts[1].to_string())
    }

    /// `participants/{participant}/participantSessions/{session}` -> `{session}`.
    fn parse_participant_session_name(session_name: Option<&str>) -> anyhow::Result<String> {
        let session_name =
            session_name.ok_or_else(|| anyhow::anyhow!("participant session name is empty"))?;
        let parts: Vec<&str> = session_name.split('/').collect();
        if parts.len() != 4 {
            anyhow::bail!("participant session name is not in the expected format: {session_name}");
        }
        Ok(parts[3].to_string())
    }

    pub fn on_participants_update(&mut self, update: &ParticipantsUpdate) {
        for resource in &update.resources {
            let Some(participant) = &resource.participant else {
                tracing::error!(id = resource.id, "participant resource has no participant; skipping");
                continue;
            };

            let participant_key = match Self::parse_participant_key(participant.participant_key.as_deref()) {
                Ok(key) => key,
                Err(e) => {
                    tracing::error!(error = %e, "failed to parse participant key");
                    continue;
                }
            };

            let display_name = match &participant.kind {
                Some(ParticipantKind::SignedIn(u)) => u.display_name.clone(),
                Some(ParticipantKind::Anonymous(u)) => u.display_name.clone(),
                Some(ParticipantKind::Phone(u)) => u.display_name.clone(),
                None => {
                    tracing::error!(id = resource.id, "participant resource has no user; skipping");
                    continue;
                }
            };

            let event = Participant {
                participant_key: participant_key.clone(),
                participant_id: resource.id,
                display_name,
            };

            let line = format!(
                "event=updated participant resource,display_name={},participant_key={},participant_id={}\n",
                event.display_name, event.participant_key, event.participant_id
            );
            if let Err(e) = self.event_log.write(line.as_bytes()) {
                tracing::warn!(error = %e, "failed to write participant event");
            }

            self.participants_by_id
                .insert(event.participant_id, event.participant_key.clone());
            self.participants_by_key.insert(participant_key, event);
        }

        for resource in &update.deleted_resources {
            let line = format!("event=deleted participant resource,participant_id={}\n", resource.id);
            if let Err(e) = self.event_log.write(line.as_bytes()) {
                tracing::warn!(error = %e, "failed to write participant deletion event");
            }

            match self.participants_by_id.remove(&resource.id) {
                Some(key) => {
                    self.participants_by_key.remove(&key);
                }
                None => tracing::warn!(id = resource.id, "deleted participant resource was not found"),
            }
        }
    }

    pub fn on_media_entries_update(&mut self, update: &MediaEntriesUpdate) {
        for resource in &update.resources {
            let Some(media_entry) = &resource.media_entry else {
                tracing::error!(id = resource.id, "media entry resource has no media entry; skipping");
                continue;
            };

            let participant_session_name =
                match Self::parse_participant_session_name(media_entry.session_name.as_deref()) {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to parse participant session name");
                        continue;
                    }
                };
            let participant_key = match Self::parse_participant_key(media_entry.participant_key.as_deref()) {
                Ok(key) => key,
                Err(e) => {
                    tracing::error!(error = %e, "failed to parse participant key");
                    continue;
                }
            };

            let entry = MediaEntry {
                participant_session_name: participant_session_name.clone(),
                participant_key,
                media_entry_id: resource.id,
                audio_csrc: media_entry.audio_csrc,
                video_csrcs: media_entry.video_csrcs.clone(),
            };

            let video_csrcs_joined = entry
                .video_csrcs
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("|");
            let line = format!(
                "event=updated media entry resource,participant_session_name={},participant_key={},media_entry_id={},audio_csrc={},video_csrcs={},audio_muted={},video_muted={}\n",
                entry.participant_session_name,
                entry.participant_key,
                entry.media_entry_id,
                entry.audio_csrc,
                video_csrcs_joined,
                media_entry.audio_muted,
                media_entry.video_muted,
            );
            if let Err(e) = self.event_log.write(line.as_bytes()) {
                tracing::warn!(error = %e, "failed to write media entry event");
            }

            self.media_entries_by_csrc
                .insert(entry.audio_csrc, participant_session_name.clone());
            for csrc in &entry.video_csrcs {
                self.media_entries_by_csrc.insert(*csrc, participant_session_name.clone());
            }
            self.media_entries_by_id
                .insert(entry.media_entry_id, participant_session_name.clone());
            self.media_entries_by_session_name.insert(participant_session_name, entry);
        }

        for resource in &update.deleted_resources {
            let line = format!("event=deleted media entry resource,media_entry_id={}\n", resource.id);
            if let Err(e) = self.event_log.write(line.as_bytes()) {
                tracing::warn!(error = %e, "failed to write media entry deletion event");
            }

            match self.media_entries_by_id.remove(&resource.id) {
                Some(session_name) => {
                    if let Some(entry) = self.media_entries_by_session_name.remove(&session_name) {
                        self.media_entries_by_csrc.remove(&entry.audio_csrc);
                        for csrc in &entry.video_csrcs {
                            self.media_entries_by_csrc.remove(csrc);
                        }
                    }
                }
                None => tracing::warn!(id = resource.id, "deleted media entry resource was not found"),
            }
        }
    }

    /// Builds `<display_name>_<participant_key>_<participant_session_name>`
    /// for the media entry contributing the given CSRC, matching
    /// `GetOutputFileIdentifier`.
    pub fn output_file_identifier(&self, contributing_source: ContributingSource) -> anyhow::Result<String> {
        let session_name = self
            .media_entries_by_csrc
            .get(&contributing_source)
            .ok_or_else(|| anyhow::anyhow!("media entry not found for CSRC: {contributing_source}"))?;
        let entry = self
            .media_entries_by_session_name
            .get(session_name)
            .ok_or_else(|| anyhow::anyhow!("media entry not found for CSRC: {contributing_source}"))?;
        let participant = self
            .participants_by_key
            .get(&entry.participant_key)
            .ok_or_else(|| anyhow::anyhow!("participant not found for CSRC: {contributing_source}"))?;
        Ok(format!(
            "{}_{}_{}",
            participant.display_name, participant.participant_key, entry.participant_session_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meet_media_protocol::media_entries::{MediaEntriesResourceSnapshot, MediaEntry as WireMediaEntry};
    use meet_media_protocol::participants::{
        AnonymousUser, Participant as WireParticipant, ParticipantResourceSnapshot,
    };
    use std::sync::{Arc, Mutex};

    struct RecordingWriter(Arc<Mutex<Vec<u8>>>);

    impl OutputWriter for RecordingWriter {
        fn write(&mut self, content: &[u8]) -> anyhow::Result<()> {
            self.0.lock().unwrap().extend_from_slice(content);
            Ok(())
        }
        fn close(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn manager() -> (ResourceManager, Arc<Mutex<Vec<u8>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (ResourceManager::new(Box::new(RecordingWriter(log.clone()))), log)
    }

    #[test]
    fn tracks_participant_then_resolves_identifier_via_csrc() {
        let (mut manager, log) = manager();

        let participants = ParticipantsUpdate {
            resources: vec![ParticipantResourceSnapshot {
                id: 1,
                participant: Some(WireParticipant {
                    participant_id: 0,
                    name: None,
                    participant_key: Some("participants/abc".to_string()),
                    kind: Some(ParticipantKind::Anonymous(AnonymousUser {
                        display_name: "Ada".to_string(),
                    })),
                }),
            }],
            deleted_resources: vec![],
        };
        manager.on_participants_update(&participants);

        let media_entries = MediaEntriesUpdate {
            resources: vec![MediaEntriesResourceSnapshot {
                id: 9,
                media_entry: Some(WireMediaEntry {
                    participant: None,
                    participant_key: Some("participants/abc".to_string()),
                    session: None,
                    session_name: Some("participants/abc/participantSessions/1".to_string()),
                    audio_csrc: 111,
                    video_csrcs: vec![222],
                    presenter: false,
                    screenshare: false,
                    audio_muted: false,
                    video_muted: false,
                }),
            }],
            deleted_resources: vec![],
        };
        manager.on_media_entries_update(&media_entries);

        assert_eq!(
            manager.output_file_identifier(111).unwrap(),
            "Ada_abc_1"
        );
        assert_eq!(manager.output_file_identifier(222).unwrap(), "Ada_abc_1");
        assert!(manager.output_file_identifier(333).is_err());

        let logged = String::from_utf8(log.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("updated participant resource"));
        assert!(logged.contains("updated media entry resource"));
    }

    #[test]
    fn deleting_participant_removes_key_lookup() {
        let (mut manager, _log) = manager();
        let participants = ParticipantsUpdate {
            resources: vec![ParticipantResourceSnapshot {
                id: 1,
                participant: Some(WireParticipant {
                    participant_id: 0,
                    name: None,
                    participant_key: Some("participants/abc".to_string()),
                    kind: Some(ParticipantKind::Anonymous(AnonymousUser {
                        display_name: "Ada".to_string(),
                    })),
                }),
            }],
            deleted_resources: vec![],
        };
        manager.on_participants_update(&participants);
        assert!(manager.participants_by_key.contains_key("abc"));

        let deletion = ParticipantsUpdate {
            resources: vec![],
            deleted_resources: vec![meet_media_protocol::participants::ParticipantDeletedResource { id: 1 }],
        };
        manager.on_participants_update(&deletion);
        assert!(!manager.participants_by_key.contains_key("abc"));
    }
}
