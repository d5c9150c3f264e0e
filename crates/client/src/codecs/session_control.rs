use serde_json::Value;

use meet_media_protocol::session_control::{
    ConnectionState, DisconnectReason, SessionControlRequest, SessionControlResourceSnapshot,
    SessionControlResponse, SessionControlUpdate, SessionStatus,
};
use meet_media_protocol::Status;

use crate::error::{ClientError, ClientResult};

fn bad(field: &str) -> ClientError {
    ClientError::InvalidArgument(format!("session-control: {field}"))
}

pub fn parse_update(bytes: &[u8]) -> ClientResult<SessionControlUpdate> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| bad("top-level value must be an object"))?;

    let response = object.get("response").map(parse_response).transpose()?;

    let mut resources = Vec::new();
    if let Some(value) = object.get("resources") {
        let array = value
            .as_array()
            .ok_or_else(|| bad("`resources` must be an array"))?;
        for entry in array {
            resources.push(parse_resource(entry)?);
        }
    }

    Ok(SessionControlUpdate { response, resources })
}

fn parse_response(value: &Value) -> ClientResult<SessionControlResponse> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("`response` must be an object"))?;
    // Missing requestId is tolerated here, and only here.
    let request_id = object.get("requestId").and_then(Value::as_i64).unwrap_or(0);
    let status = match object.get("status") {
        Some(value) => parse_status(value)?,
        None => Status::ok(),
    };
    let is_leave_response = object.contains_key("leave");
    Ok(SessionControlResponse {
        request_id,
        status,
        is_leave_response,
    })
}

fn parse_status(value: &Value) -> ClientResult<Status> {
    let object = value.as_object().ok_or_else(|| bad("`status` must be an object"))?;
    let code = object.get("code").and_then(Value::as_i64).unwrap_or(0) as i32;
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    Ok(Status { code, message })
}

fn parse_resource(value: &Value) -> ClientResult<SessionControlResourceSnapshot> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("resource entry must be an object"))?;
    let id = object.get("id").and_then(Value::as_i64).unwrap_or(0);
    let session_status = match object.get("sessionStatus") {
        Some(value) => parse_session_status(value)?,
        None => SessionStatus::default(),
    };
    Ok(SessionControlResourceSnapshot { id, session_status })
}

fn parse_session_status(value: &Value) -> ClientResult<SessionStatus> {
    let object = value
        .as_object()
        .ok_or_else(|| bad("`sessionStatus` must be an object"))?;
    let connection_state = object
        .get("connectionState")
        .and_then(Value::as_str)
        .map(ConnectionState::from_wire)
        .unwrap_or_default();
    let disconnect_reason = object
        .get("disconnectReason")
        .and_then(Value::as_str)
        .and_then(DisconnectReason::from_wire);
    Ok(SessionStatus {
        connection_state,
        disconnect_reason,
    })
}

/// Builds `{"request": {"requestId": …, "leave": {}}}`; rejects a zero
/// request ID.
pub fn stringify_request(request: &SessionControlRequest) -> ClientResult<String> {
    if request.request_id == 0 {
        return Err(ClientError::InvalidArgument(
            "session-control: requestId must be non-zero".into(),
        ));
    }
    let mut inner = serde_json::Map::new();
    inner.insert("requestId".into(), serde_json::json!(request.request_id));
    if request.leave {
        inner.insert("leave".into(), serde_json::json!({}));
    }
    Ok(serde_json::json!({ "request": inner }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_joined_snapshot() {
        let json = r#"{"resources":[{"id":0,"sessionStatus":{"connectionState":"STATE_JOINED"}}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(update.resources.len(), 1);
        assert_eq!(
            update.resources[0].session_status.connection_state,
            ConnectionState::Joined
        );
        assert!(update.resources[0].session_status.disconnect_reason.is_none());
    }

    #[test]
    fn unrecognized_connection_state_is_unknown() {
        let json = r#"{"resources":[{"id":0,"sessionStatus":{"connectionState":"STATE_BOGUS"}}]}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        assert_eq!(
            update.resources[0].session_status.connection_state,
            ConnectionState::Unknown
        );
    }

    #[test]
    fn response_missing_request_id_defaults_to_zero() {
        let json = r#"{"response":{"leave":{}}}"#;
        let update = parse_update(json.as_bytes()).unwrap();
        let response = update.response.unwrap();
        assert_eq!(response.request_id, 0);
        assert!(response.is_leave_response);
        assert!(response.status.is_ok());
    }

    #[test]
    fn stringify_rejects_zero_request_id() {
        let request = SessionControlRequest {
            request_id: 0,
            leave: true,
        };
        assert!(stringify_request(&request).is_err());
    }

    #[test]
    fn stringify_leave_request_shape() {
        let request = SessionControlRequest {
            request_id: 7,
            leave: true,
        };
        let json = stringify_request(&request).unwrap();
        assert!(json.contains(r#""requestId":7"#));
        assert!(json.contains(r#""leave":{}"#));
    }
}
