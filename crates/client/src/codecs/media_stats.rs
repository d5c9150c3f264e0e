use std::collections::{HashMap, HashSet};

use serde_json::Value;

use meet_media_protocol::media_stats::{
    MediaStatsConfiguration, MediaStatsRequest, MediaStatsResponse, MediaStatsUpdate,
};
use meet_media_protocol::Status;

use crate::error::{ClientError, ClientResult};

fn bad(field: &str) -> ClientError {
    ClientError::InvalidArgument(format!("media-stats: {field}"))
}

/// Stricter than `session-control`: `requestId` and, when present,
/// `status`'s two subfields are all mandatory; any deviation is a hard
/// parse error.
pub fn parse_update(bytes: &[u8]) -> ClientResult<MediaStatsUpdate> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| bad("top-level value must be an object"))?;

    let response = object.get("response").map(parse_response).transpose()?;

    let configuration = match object.get("resources") {
        Some(value) => {
            let array = value
                .as_array()
                .ok_or_else(|| bad("`resources` must be an array"))?;
            if array.len() != 1 {
                return Err(bad(&format!(
                    "`resources` must have exactly one element, got {}",
                    array.len()
                )));
            }
            Some(parse_configuration(&array[0])?)
        }
        None => None,
    };

    Ok(MediaStatsUpdate {
        response,
        configuration,
    })
}

fn parse_response(value: &Value) -> ClientResult<MediaStatsResponse> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("`response` must be an object"))?;
    let request_id = object
        .get("requestId")
        .and_then(Value::as_i64)
        .ok_or_else(|| bad("response.requestId is required"))?;
    let status = match object.get("status") {
        Some(value) => {
            let status_object = value.as_object().ok_or_else(|| bad("`status` must be an object"))?;
            let code = status_object
                .get("code")
                .and_then(Value::as_i64)
                .ok_or_else(|| bad("status.code is required"))? as i32;
            let message = status_object
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| bad("status.message is required"))?
                .to_string();
            Status { code, message }
        }
        None => Status::ok(),
    };
    let is_upload_media_stats_response = object.contains_key("uploadMediaStats");
    Ok(MediaStatsResponse {
        request_id,
        status,
        is_upload_media_stats_response,
    })
}

fn parse_configuration(value: &Value) -> ClientResult<MediaStatsConfiguration> {
    let entry_object = value
        .as_object()
        .ok_or_else(|| bad("resource entry must be an object"))?;
    let configuration_value = entry_object
        .get("configuration")
        .ok_or_else(|| bad("resource missing `configuration`"))?;
    let configuration_object = configuration_value
        .as_object()
        .ok_or_else(|| bad("`configuration` must be an object"))?;

    let upload_interval_seconds = configuration_object
        .get("uploadIntervalSeconds")
        .and_then(Value::as_i64)
        .ok_or_else(|| bad("configuration.uploadIntervalSeconds is required"))? as i32;

    let allowlist_value = configuration_object
        .get("allowlist")
        .ok_or_else(|| bad("configuration.allowlist is required"))?;
    let allowlist_object = allowlist_value
        .as_object()
        .ok_or_else(|| bad("`allowlist` must be an object"))?;

    let mut allowlist = HashMap::new();
    for (section_type, entry) in allowlist_object {
        let entry_object = entry
            .as_object()
            .ok_or_else(|| bad(&format!("allowlist[{section_type}] must be an object")))?;
        let keys_array = entry_object
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| bad(&format!("allowlist[{section_type}].keys is required")))?;
        let mut keys = HashSet::new();
        for key in keys_array {
            let key_str = key
                .as_str()
                .ok_or_else(|| bad(&format!("allowlist[{section_type}].keys must be strings")))?;
            keys.insert(key_str.to_string());
        }
        allowlist.insert(section_type.clone(), keys);
    }

    Ok(MediaStatsConfiguration {
        upload_interval_seconds,
        allowlist,
    })
}

/// Builds `{"request": {"requestId", "uploadMediaStats": {"sections": […
/// {"id", "<type>": {…}} …]}}}`; each section's values are nested under
/// its own type tag.
pub fn stringify_request(request: &MediaStatsRequest) -> ClientResult<String> {
    if request.request_id == 0 {
        return Err(bad("requestId must be non-zero"));
    }
    let mut sections = Vec::new();
    for section in &request.upload_media_stats.sections {
        let values: serde_json::Map<String, Value> = section
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let mut section_object = serde_json::Map::new();
        section_object.insert("id".into(), Value::String(section.id.clone()));
        section_object.insert(section.section_type.clone(), Value::Object(values));
        sections.push(Value::Object(section_object));
    }
    let envelope = serde_json::json!({
        "request": {
            "requestId": request.request_id,
            "uploadMediaStats": { "sections": sections }
        }
    });
    Ok(envelope.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meet_media_protocol::media_stats::{MediaStatsSection, UploadMediaStatsRequest};

    #[test]
    fn response_missing_request_id_is_hard_error() {
        let json = r#"{"response":{"status":{"code":0,"message":""}}}"#;
        assert!(parse_update(json.as_bytes()).is_err());
    }

    #[test]
    fn status_missing_message_is_hard_error() {
        let json = r#"{"response":{"requestId":1,"status":{"code":0}}}"#;
        assert!(parse_update(json.as_bytes()).is_err());
    }

    #[test]
    fn resources_with_two_elements_is_hard_error() {
        let json = r#"{"resources":[
            {"id":0,"configuration":{"uploadIntervalSeconds":5,"allowlist":{}}},
            {"id":0,"configuration":{"uploadIntervalSeconds":5,"allowlist":{}}}
        ]}"#;
        assert!(parse_update(json.as_bytes()).is_err());
    }

    #[test]
    fn parses_configuration_with_allowlist() {
        let json = r#"{"resources":[{"id":0,"configuration":{
            "uploadIntervalSeconds":10,
            "allowlist":{"outbound-rtp":{"keys":["packetsSent","bytesSent"]}}
        }}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        let configuration = update.configuration.unwrap();
        assert_eq!(configuration.upload_interval_seconds, 10);
        assert_eq!(configuration.allowlist["outbound-rtp"].len(), 2);
    }

    #[test]
    fn stringify_nests_values_under_section_type() {
        let mut values = std::collections::HashMap::new();
        values.insert("packetsSent".to_string(), "42".to_string());
        let request = MediaStatsRequest {
            request_id: 3,
            upload_media_stats: UploadMediaStatsRequest {
                sections: vec![MediaStatsSection {
                    section_type: "outbound-rtp".to_string(),
                    id: "rtp-1".to_string(),
                    values,
                }],
            },
        };
        let json = stringify_request(&request).unwrap();
        assert!(json.contains(r#""requestId":3"#));
        assert!(json.contains(r#""outbound-rtp":{"packetsSent":"42"}"#));
    }

    #[test]
    fn stringify_rejects_zero_request_id() {
        let request = MediaStatsRequest {
            request_id: 0,
            upload_media_stats: UploadMediaStatsRequest { sections: vec![] },
        };
        assert!(stringify_request(&request).is_err());
    }
}
