/// A participant signed in with a Google account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    /// `users/{user}`.
    pub user: String,
    pub display_name: String,
}

/// A participant who joined without signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousUser {
    pub display_name: String,
}

/// A participant dialed in by phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneUser {
    /// Partially redacted phone number, used as the display name.
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantKind {
    SignedIn(SignedInUser),
    Anonymous(AnonymousUser),
    Phone(PhoneUser),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Participant {
    /// Legacy numeric ID, preserved for deletion updates.
    pub participant_id: i64,
    /// `conferenceRecords/{conference_record}/participants/{participant}`.
    /// Unused for now; carried through for parity with the wire format.
    pub name: Option<String>,
    /// `participants/{participant}`.
    pub participant_key: Option<String>,
    pub kind: Option<ParticipantKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantResourceSnapshot {
    pub id: i64,
    pub participant: Option<Participant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDeletedResource {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantsUpdate {
    pub resources: Vec<ParticipantResourceSnapshot>,
    pub deleted_resources: Vec<ParticipantDeletedResource>,
}
