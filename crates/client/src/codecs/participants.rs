use serde_json::Value;

use meet_media_protocol::participants::{
    AnonymousUser, Participant, ParticipantDeletedResource, ParticipantKind,
    ParticipantResourceSnapshot, ParticipantsUpdate, PhoneUser, SignedInUser,
};

use crate::error::{ClientError, ClientResult};

fn bad(field: &str) -> ClientError {
    ClientError::InvalidArgument(format!("participants: {field}"))
}

/// No client requests are defined on this channel, so this codec only
/// implements `parse_update`.
pub fn parse_update(bytes: &[u8]) -> ClientResult<ParticipantsUpdate> {
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
            let participant = entry_object
                .get("participant")
                .map(parse_participant)
                .transpose()?;
            resources.push(ParticipantResourceSnapshot { id, participant });
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
            deleted_resources.push(ParticipantDeletedResource { id });
        }
    }

    Ok(ParticipantsUpdate {
        resources,
        deleted_resources,
    })
}

fn parse_participant(value: &Value) -> ClientResult<Participant> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("`participant` must be an object"))?;
    let participant_id = object.get("participantId").and_then(Value::as_i64).unwrap_or(0);
    let name = object.get("name").and_then(Value::as_str).map(String::from);
    let participant_key = object
        .get("participantKey")
        .and_then(Value::as_str)
        .map(String::from);

    let kind = if let Some(v) = object.get("signedInUser") {
        let o = v.as_object().ok_or_else(|| bad("`signedInUser` must be an object"))?;
        Some(ParticipantKind::SignedIn(SignedInUser {
            user: field_str(o, "user"),
            display_name: field_str(o, "displayName"),
        }))
    } else if let Some(v) = object.get("anonymousUser") {
        let o = v.as_object().ok_or_else(|| bad("`anonymousUser` must be an object"))?;
        Some(ParticipantKind::Anonymous(AnonymousUser {
            display_name: field_str(o, "displayName"),
        }))
    } else if let Some(v) = object.get("phoneUser") {
        let o = v.as_object().ok_or_else(|| bad("`phoneUser` must be an object"))?;
        Some(ParticipantKind::Phone(PhoneUser {
            display_name: field_str(o, "displayName"),
        }))
    } else {
        None
    };

    Ok(Participant {
        participant_id,
        name,
        participant_key,
        kind,
    })
}

fn field_str(object: &serde_json::Map<String, Value>, key: &str) -> String {
    object.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_in_user() {
        let json = r#"{"resources":[{"id":3,"participant":{
            "participantKey":"participants/abc",
            "signedInUser":{"user":"users/42","displayName":"Ada"}
        }}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(update.resources.len(), 1);
        let participant = update.resources[0].participant.as_ref().unwrap();
        match participant.kind.as_ref().unwrap() {
            ParticipantKind::SignedIn(user) => assert_eq!(user.display_name, "Ada"),
            _ => panic!("expected signed-in user"),
        }
    }

    #[test]
    fn parses_deleted_resources() {
        let json = r#"{"deletedResources":[{"id":3}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(update.deleted_resources.len(), 1);
        assert_eq!(update.deleted_resources[0].id, 3);
    }

    #[test]
    fn missing_resources_defaults_empty() {
        let update = parse_update(b"{}").unwrap();
        assert!(update.resources.is_empty());
        assert!(update.deleted_resources.is_empty());
    }
}
