#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Maximum characters stored per chat message.
pub const MAX_MESSAGE_CONTENT_CHARS: usize = 255;
/// Maximum characters in a directory username.
pub const MAX_USERNAME_CHARS: usize = 50;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("user id is invalid")]
    InvalidUserId,
    #[error("username is invalid")]
    InvalidUsername,
    #[error("role is invalid")]
    InvalidRole,
    #[error("recipient group is invalid")]
    InvalidRecipientGroup,
    #[error("message content is invalid")]
    InvalidMessageContent,
}

/// Identifier assigned to a user by the external user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidUserId)
        }
    }
}

impl TryFrom<&str> for UserId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidUserId)?;
        Self::try_from(parsed)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_username(&value)?;
        Ok(Self(value))
    }
}

/// Closed set of directory roles. Recipient groups target these 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Ceo,
    Hr,
    Finance,
    EventManager,
    Employee,
}

impl Role {
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::Ceo,
        Self::Hr,
        Self::Finance,
        Self::EventManager,
        Self::Employee,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Ceo => "CEO",
            Self::Hr => "HR",
            Self::Finance => "FINANCE",
            Self::EventManager => "EVENT_MANAGER",
            Self::Employee => "EMPLOYEE",
        }
    }

    /// Parses a role name in any letter case.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRole`] if the canonical form is not a known role.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let canonical = canonicalize_group_name(value);
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == canonical)
            .ok_or(DomainError::InvalidRole)
    }
}

impl TryFrom<String> for Role {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        String::from(value.as_str())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience of a chat message: everyone connected, or every holder of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecipientGroup {
    All,
    Role(Role),
}

impl RecipientGroup {
    const ALL_NAME: &'static str = "ALL";

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => Self::ALL_NAME,
            Self::Role(role) => role.as_str(),
        }
    }

    /// Parses a recipient group in any letter case.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRecipientGroup`] for names outside the closed set.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let canonical = canonicalize_group_name(value);
        if canonical == Self::ALL_NAME {
            return Ok(Self::All);
        }
        Role::parse(&canonical)
            .map(Self::Role)
            .map_err(|_| DomainError::InvalidRecipientGroup)
    }

    /// Whether a message tagged with `self` is visible in the history of `viewer`.
    #[must_use]
    pub fn includes(self, viewer: Self) -> bool {
        self == Self::All || self == viewer
    }
}

impl TryFrom<String> for RecipientGroup {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecipientGroup> for String {
    fn from(value: RecipientGroup) -> Self {
        String::from(value.as_str())
    }
}

impl From<Role> for RecipientGroup {
    fn from(value: Role) -> Self {
        Self::Role(value)
    }
}

impl core::fmt::Display for RecipientGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single canonical form for role and group names at every ingress point.
#[must_use]
pub fn canonicalize_group_name(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_message_content(&value)?;
        Ok(Self(value))
    }
}

/// Renders the line pushed to live sessions.
#[must_use]
pub fn render_chat_line(sender: &Username, content: &MessageContent) -> String {
    format!("{}: {}", sender.as_str(), content.as_str())
}

fn validate_username(value: &str) -> Result<(), DomainError> {
    let chars = value.chars().count();
    if !(1..=MAX_USERNAME_CHARS).contains(&chars) {
        return Err(DomainError::InvalidUsername);
    }
    if value.chars().any(char::is_control) {
        return Err(DomainError::InvalidUsername);
    }
    Ok(())
}

fn validate_message_content(value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() || value.chars().count() > MAX_MESSAGE_CONTENT_CHARS {
        return Err(DomainError::InvalidMessageContent);
    }
    if value.contains('\0') {
        return Err(DomainError::InvalidMessageContent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        canonicalize_group_name, render_chat_line, DomainError, MessageContent,
        RecipientGroup, Role, UserId, Username, MAX_MESSAGE_CONTENT_CHARS,
    };

    #[test]
    fn user_id_rejects_non_positive_and_garbage() {
        assert_eq!(UserId::try_from(7).unwrap().get(), 7);
        assert_eq!(UserId::try_from("42").unwrap().to_string(), "42");
        assert_eq!(UserId::try_from(0).unwrap_err(), DomainError::InvalidUserId);
        assert_eq!(UserId::try_from("-3").unwrap_err(), DomainError::InvalidUserId);
        assert_eq!(UserId::try_from("abc").unwrap_err(), DomainError::InvalidUserId);
    }

    #[test]
    fn username_invariants_enforced() {
        assert_eq!(
            Username::try_from(String::from("alice")).unwrap().as_str(),
            "alice"
        );
        assert!(Username::try_from(String::new()).is_err());
        assert!(Username::try_from("a".repeat(51)).is_err());
        assert!(Username::try_from(String::from("bad\nname")).is_err());
    }

    #[test]
    fn canonicalization_trims_and_uppercases() {
        assert_eq!(canonicalize_group_name("  finance "), "FINANCE");
        assert_eq!(canonicalize_group_name("event_manager"), "EVENT_MANAGER");
    }

    #[test]
    fn lowercase_group_parses_identically_to_uppercase() {
        assert_eq!(
            RecipientGroup::parse("finance").unwrap(),
            RecipientGroup::parse("FINANCE").unwrap()
        );
        assert_eq!(
            RecipientGroup::parse("Finance").unwrap(),
            RecipientGroup::Role(Role::Finance)
        );
        assert_eq!(RecipientGroup::parse("all").unwrap(), RecipientGroup::All);
    }

    #[test]
    fn unknown_groups_and_roles_are_rejected() {
        assert_eq!(
            RecipientGroup::parse("interns").unwrap_err(),
            DomainError::InvalidRecipientGroup
        );
        assert_eq!(RecipientGroup::parse("").unwrap_err(), DomainError::InvalidRecipientGroup);
        assert_eq!(Role::parse("all").unwrap_err(), DomainError::InvalidRole);
    }

    #[test]
    fn every_role_round_trips_through_its_canonical_name() {
        for role in Role::ALL {
            assert_eq!(Role::parse(&role.as_str().to_ascii_lowercase()).unwrap(), role);
            assert_eq!(RecipientGroup::from(role).as_str(), role.as_str());
        }
    }

    #[test]
    fn groups_serialize_as_canonical_strings() {
        let encoded = serde_json::to_string(&RecipientGroup::Role(Role::EventManager)).unwrap();
        assert_eq!(encoded, "\"EVENT_MANAGER\"");
        let decoded: RecipientGroup = serde_json::from_str("\"hr\"").unwrap();
        assert_eq!(decoded, RecipientGroup::Role(Role::Hr));
        assert!(serde_json::from_str::<RecipientGroup>("\"nobody\"").is_err());
    }

    #[test]
    fn history_visibility_is_role_or_all() {
        let hr = RecipientGroup::Role(Role::Hr);
        assert!(RecipientGroup::All.includes(hr));
        assert!(hr.includes(hr));
        assert!(!RecipientGroup::Role(Role::Finance).includes(hr));
    }

    #[test]
    fn message_content_enforces_bounds() {
        assert!(MessageContent::try_from(String::from("hello")).is_ok());
        assert!(MessageContent::try_from("x".repeat(MAX_MESSAGE_CONTENT_CHARS)).is_ok());
        assert_eq!(
            MessageContent::try_from("x".repeat(MAX_MESSAGE_CONTENT_CHARS + 1)).unwrap_err(),
            DomainError::InvalidMessageContent
        );
        assert!(MessageContent::try_from(String::from("   ")).is_err());
        assert!(MessageContent::try_from(String::from("nul\0byte")).is_err());
    }

    #[test]
    fn chat_line_is_sender_colon_content() {
        let sender = Username::try_from(String::from("A")).unwrap();
        let content = MessageContent::try_from(String::from("hello")).unwrap();
        assert_eq!(render_chat_line(&sender, &content), "A: hello");
    }
}
