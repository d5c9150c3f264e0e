use serde_json::Value;

use meet_media_protocol::video_assignment::{
    SetVideoAssignmentRequest, VideoAssignmentConfiguration, VideoAssignmentRequest,
    VideoAssignmentResponse, VideoAssignmentUpdate, VideoCsrcToMidAssignment,
};
use meet_media_protocol::Status;

use crate::error::{ClientError, ClientResult};

fn bad(field: &str) -> ClientError {
    ClientError::InvalidArgument(format!("video-assignment: {field}"))
}

/// Analogous to `media-stats`: `requestId` is mandatory on a response, and
/// `resources` must carry exactly one element when present.
pub fn parse_update(bytes: &[u8]) -> ClientResult<VideoAssignmentUpdate> {
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

    Ok(VideoAssignmentUpdate {
        response,
        configuration,
    })
}

fn parse_response(value: &Value) -> ClientResult<VideoAssignmentResponse> {
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
    Ok(VideoAssignmentResponse { request_id, status })
}

fn parse_configuration(value: &Value) -> ClientResult<VideoAssignmentConfiguration> {
    let entry_object = value
        .as_object()
        .ok_or_else(|| bad("resource entry must be an object"))?;
    let configuration_value = entry_object
        .get("configuration")
        .ok_or_else(|| bad("resource missing `configuration`"))?;
    let configuration_object = configuration_value
        .as_object()
        .ok_or_else(|| bad("`configuration` must be an object"))?;

    let mut assignments = Vec::new();
    if let Some(value) = configuration_object.get("videoCsrcToMidAssignments") {
        for entry in value
            .as_array()
            .ok_or_else(|| bad("`videoCsrcToMidAssignments` must be an array"))?
        {
            let entry_object = entry
                .as_object()
                .ok_or_else(|| bad("assignment entry must be an object"))?;
            let video_csrc = entry_object
                .get("videoCsrc")
                .and_then(Value::as_u64)
                .ok_or_else(|| bad("assignment.videoCsrc is required"))? as u32;
            let receiver_mid = entry_object
                .get("receiverMid")
                .and_then(Value::as_str)
                .ok_or_else(|| bad("assignment.receiverMid is required"))?
                .to_string();
            assignments.push(VideoCsrcToMidAssignment {
                video_csrc,
                receiver_mid,
            });
        }
    }

    Ok(VideoAssignmentConfiguration { assignments })
}

/// Builds `{"request": {"requestId", "setAssignment": {…}}}`; request IDs
/// must be non-zero, same rule as `media-stats`.
pub fn stringify_request(request: &VideoAssignmentRequest) -> ClientResult<String> {
    if request.request_id == 0 {
        return Err(bad("requestId must be non-zero"));
    }
    let set_assignment = &request.set_assignment;
    let mut set_assignment_object = serde_json::Map::new();
    if let Some(height) = set_assignment.max_video_resolution_height_px {
        set_assignment_object.insert("maxVideoResolutionHeightPx".into(), Value::from(height));
    }
    if let Some(width) = set_assignment.max_video_resolution_width_px {
        set_assignment_object.insert("maxVideoResolutionWidthPx".into(), Value::from(width));
    }
    set_assignment_object.insert(
        "targetEntries".into(),
        Value::Array(set_assignment.target_entries.iter().map(|id| Value::from(*id)).collect()),
    );

    let envelope = serde_json::json!({
        "request": {
            "requestId": request.request_id,
            "setAssignment": set_assignment_object
        }
    });
    Ok(envelope.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_missing_request_id_is_hard_error() {
        let json = r#"{"response":{"status":{"code":0,"message":""}}}"#;
        assert!(parse_update(json.as_bytes()).is_err());
    }

    #[test]
    fn resources_with_zero_elements_is_hard_error() {
        let json = r#"{"resources":[]}"#;
        assert!(parse_update(json.as_bytes()).is_err());
    }

    #[test]
    fn parses_configuration_assignments() {
        let json = r#"{"resources":[{"id":0,"configuration":{
            "videoCsrcToMidAssignments":[{"videoCsrc":55,"receiverMid":"1"}]
        }}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        let configuration = update.configuration.unwrap();
        assert_eq!(configuration.assignments.len(), 1);
        assert_eq!(configuration.assignments[0].video_csrc, 55);
        assert_eq!(configuration.assignments[0].receiver_mid, "1");
    }

    #[test]
    fn stringify_rejects_zero_request_id() {
        let request = VideoAssignmentRequest {
            request_id: 0,
            set_assignment: SetVideoAssignmentRequest::default(),
        };
        assert!(stringify_request(&request).is_err());
    }

    #[test]
    fn stringify_includes_target_entries() {
        let request = VideoAssignmentRequest {
            request_id: 7,
            set_assignment: SetVideoAssignmentRequest {
                max_video_resolution_height_px: Some(720),
                max_video_resolution_width_px: None,
                target_entries: vec![1, 2, 3],
            },
        };
        let json = stringify_request(&request).unwrap();
        assert!(json.contains(r#""requestId":7"#));
        assert!(json.contains(r#""maxVideoResolutionHeightPx":720"#));
        assert!(json.contains(r#""targetEntries":[1,2,3]"#));
    }
}
