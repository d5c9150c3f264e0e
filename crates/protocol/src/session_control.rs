use crate::status::Status;

/// `sessionStatus.connectionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Waiting,
    Joined,
    Disconnected,
}

impl ConnectionState {
    pub fn from_wire(token: &str) -> ConnectionState {
        match token {
            "STATE_WAITING" => ConnectionState::Waiting,
            "STATE_JOINED" => ConnectionState::Joined,
            "STATE_DISCONNECTED" => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }
}

/// `sessionStatus.disconnectReason`, set iff state is `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientLeft,
    UserStopped,
    ConferenceEnded,
    SessionUnhealthy,
}

impl DisconnectReason {
    pub fn from_wire(token: &str) -> Option<DisconnectReason> {
        match token {
            "REASON_CLIENT_LEFT" => Some(DisconnectReason::ClientLeft),
            "REASON_USER_STOPPED" => Some(DisconnectReason::UserStopped),
            "REASON_CONFERENCE_ENDED" => Some(DisconnectReason::ConferenceEnded),
            "REASON_SESSION_UNHEALTHY" => Some(DisconnectReason::SessionUnhealthy),
            _ => None,
        }
    }
}

/// The singleton `session-control` resource (always id 0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub connection_state: ConnectionState,
    pub disconnect_reason: Option<DisconnectReason>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionControlResourceSnapshot {
    pub id: i64,
    pub session_status: SessionStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionControlResponse {
    /// Defaults to 0 when the wire message omits `requestId` — tolerated
    /// only on this channel, unlike the others.
    pub request_id: i64,
    pub status: Status,
    pub is_leave_response: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionControlUpdate {
    pub response: Option<SessionControlResponse>,
    pub resources: Vec<SessionControlResourceSnapshot>,
}

/// Client -> server request on `session-control`. The only variant today
/// is `leave`; the envelope still carries a request ID for correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionControlRequest {
    pub request_id: i64,
    pub leave: bool,
}
