use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{Event, EventGroup, EventStatus, Guest, Participant, Role, User},
};

#[derive(Debug, Deserialize, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() || self.password.is_empty() || self.email.trim().is_empty() {
            return Err(ApiError::bad_request("Username, password and email are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoginQuery {
    /// Client route to return to, e.g. `/events/<id>`; triggers auto-join.
    pub redirect: Option<String>,
}

impl LoginQuery {
    pub fn event_id(&self) -> Option<Uuid> {
        let rest = self.redirect.as_deref()?.strip_prefix("/events/")?;
        let segment = rest.split(['/', '?', '#']).next()?;
        segment.parse().ok()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: &Uuid, username: &str, iat: usize, exp: usize) -> Self {
        Self {
            user_id: *user_id,
            username: username.to_string(),
            iat,
            exp,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewEventDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub access_code: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl NewEventDto {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::bad_request("Event name is required"));
        }
        if self.access_code.trim().is_empty() {
            return Err(ApiError::bad_request("Access code is required"));
        }
        if self.end_time <= self.start_time {
            return Err(ApiError::bad_request("Event must end after it starts"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JoinRequest {
    #[serde(alias = "accessCode", alias = "code")]
    pub access_code: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GuestJoinRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewGroupDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// External id events use to reference the group; generated when absent.
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub organized_events: Vec<Uuid>,
    pub participated_events: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: User, organized_events: Vec<Uuid>, participated_events: Vec<Uuid>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            organized_events,
            participated_events,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EventView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub group: Option<String>,
    pub organizer: Uuid,
    pub participants: Vec<Participant>,
    pub guests: Vec<Guest>,
    pub created_at: DateTime<Utc>,
}

impl EventView {
    /// Access code hidden.
    pub fn public(event: Event) -> Self {
        Self::build(event, false)
    }

    /// Access code included; only for the event's organizer.
    pub fn for_organizer(event: Event) -> Self {
        Self::build(event, true)
    }

    pub fn for_viewer(event: Event, viewer: Option<Uuid>) -> Self {
        let is_organizer = viewer.is_some_and(|id| event.is_organized_by(id));
        Self::build(event, is_organizer)
    }

    fn build(event: Event, with_code: bool) -> Self {
        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            start_time: event.start_time,
            end_time: event.end_time,
            status: event.status,
            access_code: with_code.then_some(event.access_code),
            group: event.group,
            organizer: event.organizer,
            participants: event.participants,
            guests: event.guests,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub message: String,
    pub event: EventView,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub message: String,
    pub events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEventResponse {
    pub message: String,
    pub event_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub message: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub username: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub message: String,
    pub participants: Vec<ParticipantView>,
    pub guests: Vec<Guest>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContactView {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub message: String,
    pub users: Vec<ContactView>,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub message: String,
    pub groups: Vec<EventGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGroupResponse {
    pub message: String,
    pub group_id: String,
}
