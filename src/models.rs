use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    #[default]
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Participant => "participant",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organizer" => Ok(Role::Organizer),
            "participant" => Ok(Role::Participant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    Closed,
    Open,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Closed => "CLOSED",
            EventStatus::Open => "OPEN",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLOSED" => Ok(EventStatus::Closed),
            "OPEN" => Ok(EventStatus::Open),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

/// Stored account. Clients only ever see [`crate::dto::UserView`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub pwd_hash: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub access_code: String,
    /// External id of the [`EventGroup`] this event is tagged with.
    pub group: Option<String>,
    pub organizer: Uuid,
    pub participants: Vec<Participant>,
    pub guests: Vec<Guest>,
    pub created_at: DateTime<Utc>,
}

/// Why an authenticated join was refused. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    AlreadyOpen,
    AlreadyJoined,
    InvalidCode,
}

impl Event {
    /// CLOSED events whose window `[start_time, end_time)` contains `now`.
    pub fn is_due_to_open(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Closed && self.start_time <= now && now < self.end_time
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_organized_by(&self, user_id: Uuid) -> bool {
        self.organizer == user_id
    }

    pub fn check_join(&self, user_id: Uuid, access_code: &str) -> Result<(), JoinRejection> {
        if self.status == EventStatus::Open {
            return Err(JoinRejection::AlreadyOpen);
        }
        if self.has_participant(user_id) {
            return Err(JoinRejection::AlreadyJoined);
        }
        if self.access_code != access_code {
            return Err(JoinRejection::InvalidCode);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGroup {
    /// Row identity, internal only.
    #[serde(skip)]
    pub row_id: Uuid,
    /// The string id events use to reference this group.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub organizer: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event_at(now: DateTime<Utc>, start: i64, end: i64) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Meetup".into(),
            description: None,
            start_time: now + Duration::minutes(start),
            end_time: now + Duration::minutes(end),
            status: EventStatus::Closed,
            access_code: "ABC123".into(),
            group: None,
            organizer: Uuid::new_v4(),
            participants: Vec::new(),
            guests: Vec::new(),
            created_at: now,
        }
    }

    #[test]
    fn opens_only_inside_window() {
        let now = Utc::now();
        assert!(event_at(now, -60, 60).is_due_to_open(now));
        assert!(event_at(now, 0, 60).is_due_to_open(now));
        assert!(!event_at(now, 1, 60).is_due_to_open(now));
        assert!(!event_at(now, -60, 0).is_due_to_open(now));

        let mut open = event_at(now, -60, 60);
        open.status = EventStatus::Open;
        assert!(!open.is_due_to_open(now));
    }

    #[test]
    fn expires_strictly_after_end() {
        let now = Utc::now();
        assert!(event_at(now, -120, -1).is_expired(now));
        assert!(!event_at(now, -120, 0).is_expired(now));
        assert!(!event_at(now, -120, 10).is_expired(now));
    }

    #[test]
    fn join_checks_run_in_order() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let mut event = event_at(now, 10, 60);

        assert_eq!(event.check_join(user, "nope"), Err(JoinRejection::InvalidCode));
        assert_eq!(event.check_join(user, "ABC123"), Ok(()));

        event.participants.push(Participant { user_id: user, joined_at: now });
        assert_eq!(event.check_join(user, "nope"), Err(JoinRejection::AlreadyJoined));

        event.status = EventStatus::Open;
        assert_eq!(event.check_join(user, "ABC123"), Err(JoinRejection::AlreadyOpen));
        assert_eq!(event.check_join(Uuid::new_v4(), "nope"), Err(JoinRejection::AlreadyOpen));
    }

    #[test]
    fn status_and_role_parse() {
        assert_eq!("OPEN".parse::<EventStatus>(), Ok(EventStatus::Open));
        assert_eq!("CLOSED".parse::<EventStatus>(), Ok(EventStatus::Closed));
        assert!("open".parse::<EventStatus>().is_err());
        assert_eq!("organizer".parse::<Role>(), Ok(Role::Organizer));
        assert_eq!(Role::default(), Role::Participant);
        assert_eq!(
            serde_json::to_string(&EventStatus::Closed).unwrap(),
            "\"CLOSED\""
        );
    }
}
