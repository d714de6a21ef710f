//! In-process [`Store`] used when no `DATABASE_URL` is configured and by
//! the test suites. Enforces the same unique keys as the SQL schema.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Event, EventGroup, EventStatus, Guest, Participant, User};

use super::{
    DbError, DbResult, Filter, GroupFilter, Store, ACCESS_CODE_KEY, EMAIL_KEY, GROUP_ID_KEY,
    USERNAME_KEY,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    events: Vec<Event>,
    groups: Vec<EventGroup>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(constraint: &str) -> DbError {
    DbError::Conflict {
        constraint: constraint.to_string(),
    }
}

fn sorted_events(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.created_at.cmp(&b.created_at)));
    events
}

impl Store for MemoryStore {
    fn insert_user(&self, user: User) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.users.iter().any(|u| u.username == user.username) {
                return Err(conflict(USERNAME_KEY));
            }
            if tables.users.iter().any(|u| u.email == user.email) {
                return Err(conflict(EMAIL_KEY));
            }
            tables.users.push(user);
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<User>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.users.iter().find(|u| u.id == id).cloned())
        })
    }

    fn find_user_by_username<'a>(&'a self, username: &'a str) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.users.iter().find(|u| u.username == username).cloned())
        })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'_, DbResult<Vec<User>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .users
                .iter()
                .filter(|u| ids.contains(&u.id))
                .cloned()
                .collect())
        })
    }

    fn insert_event(&self, event: Event) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.events.iter().any(|e| e.access_code == event.access_code) {
                return Err(conflict(ACCESS_CODE_KEY));
            }
            tables.events.push(event);
            Ok(())
        })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Event>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.events.iter().find(|e| e.id == id).cloned())
        })
    }

    fn list_events(&self, filter: Filter) -> BoxFuture<'_, DbResult<Vec<Event>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let events = tables
                .events
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect();
            Ok(sorted_events(events))
        })
    }

    fn delete_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<bool>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let before = tables.events.len();
            tables.events.retain(|e| e.id != id);
            Ok(tables.events.len() < before)
        })
    }

    fn add_participant(&self, event_id: Uuid, participant: Participant) -> BoxFuture<'_, DbResult<bool>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let event = tables
                .events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or_else(|| DbError::Query(format!("event {event_id} does not exist")))?;
            if event.has_participant(participant.user_id) {
                return Ok(false);
            }
            event.participants.push(participant);
            Ok(true)
        })
    }

    fn add_guest(&self, event_id: Uuid, guest: Guest) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let event = tables
                .events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or_else(|| DbError::Query(format!("event {event_id} does not exist")))?;
            event.guests.push(guest);
            Ok(())
        })
    }

    fn open_started_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let mut opened = 0;
            for event in tables.events.iter_mut().filter(|e| e.is_due_to_open(now)) {
                event.status = EventStatus::Open;
                opened += 1;
            }
            Ok(opened)
        })
    }

    fn delete_expired_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let before = tables.events.len();
            tables.events.retain(|e| !e.is_expired(now));
            Ok((before - tables.events.len()) as u64)
        })
    }

    fn insert_group(&self, group: EventGroup) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.groups.iter().any(|g| g.id == group.id) {
                return Err(conflict(GROUP_ID_KEY));
            }
            tables.groups.push(group);
            Ok(())
        })
    }

    fn list_groups(&self, filter: GroupFilter) -> BoxFuture<'_, DbResult<Vec<EventGroup>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .groups
                .iter()
                .filter(|g| filter.matches(g))
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.into(),
            pwd_hash: "hash".into(),
            email: format!("{name}@example.com"),
            role: Role::Participant,
            created_at: Utc::now(),
        }
    }

    fn event(organizer: Uuid, code: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: format!("event {code}"),
            description: None,
            start_time: start,
            end_time: end,
            status: EventStatus::Closed,
            access_code: code.into(),
            group: None,
            organizer,
            participants: Vec::new(),
            guests: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[actix_rt::test]
    async fn rejects_duplicate_usernames_and_emails() {
        let store = MemoryStore::new();
        store.insert_user(user("alice")).await.unwrap();

        let err = store.insert_user(user("alice")).await.unwrap_err();
        assert!(err.is_conflict_on(USERNAME_KEY));

        let mut other = user("bob");
        other.email = "alice@example.com".into();
        let err = store.insert_user(other).await.unwrap_err();
        assert!(err.is_conflict_on(EMAIL_KEY));
    }

    #[actix_rt::test]
    async fn access_codes_are_reusable_after_delete() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = event(Uuid::new_v4(), "ABC", now, now + Duration::hours(1));
        let first_id = first.id;
        store.insert_event(first).await.unwrap();

        let dup = event(Uuid::new_v4(), "ABC", now, now + Duration::hours(1));
        assert!(store.insert_event(dup.clone()).await.unwrap_err().is_conflict_on(ACCESS_CODE_KEY));

        assert!(store.delete_event(first_id).await.unwrap());
        store.insert_event(dup).await.unwrap();
    }

    #[actix_rt::test]
    async fn participants_are_unique_per_event() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let e = event(Uuid::new_v4(), "X", now, now + Duration::hours(1));
        let id = e.id;
        store.insert_event(e).await.unwrap();

        let who = Uuid::new_v4();
        let p = Participant { user_id: who, joined_at: now };
        assert!(store.add_participant(id, p.clone()).await.unwrap());
        assert!(!store.add_participant(id, p).await.unwrap());

        let stored = store.find_event(id).await.unwrap().unwrap();
        assert_eq!(stored.participants.len(), 1);
    }

    #[actix_rt::test]
    async fn sweep_queries_open_and_delete() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let org = Uuid::new_v4();
        let running = event(org, "RUN", now - Duration::hours(1), now + Duration::hours(1));
        let future = event(org, "FUT", now + Duration::hours(1), now + Duration::hours(2));
        let past = event(org, "OLD", now - Duration::hours(2), now - Duration::minutes(1));
        let (running_id, future_id, past_id) = (running.id, future.id, past.id);
        for e in [running, future, past] {
            store.insert_event(e).await.unwrap();
        }

        assert_eq!(store.open_started_events(now).await.unwrap(), 1);
        assert_eq!(store.open_started_events(now).await.unwrap(), 0);
        assert_eq!(store.delete_expired_events(now).await.unwrap(), 1);

        let running = store.find_event(running_id).await.unwrap().unwrap();
        assert_eq!(running.status, EventStatus::Open);
        let future = store.find_event(future_id).await.unwrap().unwrap();
        assert_eq!(future.status, EventStatus::Closed);
        assert!(store.find_event(past_id).await.unwrap().is_none());
    }
}
