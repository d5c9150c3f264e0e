use serde_json::Value;

use meet_media_protocol::media_entries::{
    MediaEntriesDeletedResource, MediaEntriesResourceSnapshot, MediaEntriesUpdate, MediaEntry,
};

use crate::error::{ClientError, ClientResult};

fn bad(field: &str) -> ClientError {
    ClientError::InvalidArgument(format!("media-entries: {field}"))
}

/// No client requests are defined on this channel, so this codec only
/// implements `parse_update`.
pub fn parse_update(bytes: &[u8]) -> ClientResult<MediaEntriesUpdate> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| bad("top-level value must be an object"))?;

    let mut resources = Vec::new();
    if let Some(value) = object.get("resources") {
        for entry in value.as_array().ok_or_else(|| bad("`resources` must be an array"))? {
            let entry_object = entry
                .as_object()
                .ok_or_else(|| bad("resource entry must be an object"))?;
            let id = entry_object.get("id").and_then(Value::as_i64).unwrap_or(0);
            let media_entry = entry_object
                .get("mediaEntry")
                .map(parse_media_entry)
                .transpose()?;
            resources.push(MediaEntriesResourceSnapshot { id, media_entry });
        }
    }

    let mut deleted_resources = Vec::new();
    if let Some(value) = object.get("deletedResources") {
        for entry in value
            .as_array()
            .ok_or_else(|| bad("`deletedResources` must be an array"))?
        {
            let entry_object = entry
                .as_object()
                .ok_or_else(|| bad("deleted resource entry must be an object"))?;
            let id = entry_object.get("id").and_then(Value::as_i64).unwrap_or(0);
            deleted_resources.push(MediaEntriesDeletedResource { id });
        }
    }

    Ok(MediaEntriesUpdate {
        resources,
        deleted_resources,
    })
}

fn parse_media_entry(value: &Value) -> ClientResult<MediaEntry> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("`mediaEntry` must be an object"))?;

    let participant = object
        .get("participant")
        .and_then(Value::as_str)
        .map(String::from);
    let participant_key = object
        .get("participantKey")
        .and_then(Value::as_str)
        .map(String::from);
    let session = object.get("session").and_then(Value::as_str).map(String::from);
    let session_name = object
        .get("sessionName")
        .and_then(Value::as_str)
        .map(String::from);
    let audio_csrc = object.get("audioCsrc").and_then(Value::as_u64).unwrap_or(0) as u32;
    let video_csrcs = match object.get("videoCsrcs") {
        Some(value) => {
            let elements = value.as_array().ok_or_else(|| bad("videoCsrcs must be an array"))?;
            let mut csrcs = Vec::with_capacity(elements.len());
            for element in elements {
                let csrc = element
                    .as_u64()
                    .ok_or_else(|| bad("videoCsrcs element must be an unsigned integer"))?;
                csrcs.push(csrc as u32);
            }
            csrcs
        }
        None => Vec::new(),
    };
    let presenter = object.get("presenter").and_then(Value::as_bool).unwrap_or(false);
    let screenshare = object.get("screenshare").and_then(Value::as_bool).unwrap_or(false);
    let audio_muted = object.get("audioMuted").and_then(Value::as_bool).unwrap_or(false);
    let video_muted = object.get("videoMuted").and_then(Value::as_bool).unwrap_or(false);

    Ok(MediaEntry {
        participant,
        participant_key,
        session,
        session_name,
        audio_csrc,
        video_csrcs,
        presenter,
        screenshare,
        audio_muted,
        video_muted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_with_csrcs() {
        let json = r#"{"resources":[{"id":9,"mediaEntry":{
            "participantKey":"participants/abc",
            "audioCsrc":111,
            "videoCsrcs":[222,333],
            "presenter":true
        }}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(update.resources.len(), 1);
        let entry = update.resources[0].media_entry.as_ref().unwrap();
        assert_eq!(entry.audio_csrc, 111);
        assert_eq!(entry.video_csrcs, vec![222, 333]);
        assert!(entry.presenter);
        assert!(!entry.screenshare);
    }

    #[test]
    fn parses_deleted_resources() {
        let json = r#"{"deletedResources":[{"id":7}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(update.deleted_resources.len(), 1);
        assert_eq!(update.deleted_resources[0].id, 7);
    }

    #[test]
    fn missing_resources_defaults_empty() {
        let update = parse_update(b"{}").unwrap();
        assert!(update.resources.is_empty());
        assert!(update.deleted_resources.is_empty());
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = parse_update(b"[]").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_non_array_video_csrcs() {
        let json = r#"{"resources":[{"id":9,"mediaEntry":{"videoCsrcs":"not-an-array"}}]}"#;
        let err = parse_update(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_non_integer_video_csrc_element() {
        let json = r#"{"resources":[{"id":9,"mediaEntry":{"videoCsrcs":[222,"bad"]}}]}"#;
        let err = parse_update(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }
}
