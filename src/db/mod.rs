pub mod event;
pub mod group;
pub mod memory;
pub mod user;

use chrono::{DateTime, Utc};
use derive_more::Display;
use futures::future::BoxFuture;
use log::info;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{
    models::{Event, EventGroup, Guest, Participant, User},
    PGPool,
};

pub use memory::MemoryStore;

pub const USERNAME_KEY: &str = "users_username_key";
pub const EMAIL_KEY: &str = "users_email_key";
pub const ACCESS_CODE_KEY: &str = "events_access_code_key";
pub const GROUP_ID_KEY: &str = "event_groups_external_id_key";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum DbError {
    /// A unique constraint rejected the write.
    #[display(fmt = "duplicate value violates {}", constraint)]
    Conflict { constraint: String },

    #[display(fmt = "{}", _0)]
    Query(String),
}

impl std::error::Error for DbError {}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return DbError::Conflict {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        DbError::Query(err.to_string())
    }
}

impl DbError {
    pub fn is_conflict_on(&self, key: &str) -> bool {
        matches!(self, DbError::Conflict { constraint } if constraint == key)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Predicates over the event collection.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Not organized by, and not yet joined by, the user.
    Joinable(Uuid),
    OrganizedBy(Uuid),
    AttendedBy(Uuid),
    GroupOrganizedBy(String, Uuid),
    GroupNotJoinedBy(String, Uuid),
    Groups(Vec<String>),
}

impl Filter {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Filter::Joinable(user) => !event.is_organized_by(*user) && !event.has_participant(*user),
            Filter::OrganizedBy(user) => event.is_organized_by(*user),
            Filter::AttendedBy(user) => event.has_participant(*user),
            Filter::GroupOrganizedBy(group, user) => {
                event.group.as_deref() == Some(group.as_str()) && event.is_organized_by(*user)
            }
            Filter::GroupNotJoinedBy(group, user) => {
                event.group.as_deref() == Some(group.as_str()) && !event.has_participant(*user)
            }
            Filter::Groups(groups) => event
                .group
                .as_ref()
                .is_some_and(|g| groups.iter().any(|candidate| candidate == g)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GroupFilter {
    OrganizedBy(Uuid),
    NotOrganizedBy(Uuid),
}

impl GroupFilter {
    pub fn matches(&self, group: &EventGroup) -> bool {
        match self {
            GroupFilter::OrganizedBy(user) => group.organizer == *user,
            GroupFilter::NotOrganizedBy(user) => group.organizer != *user,
        }
    }
}

/// Outcome of one lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounts {
    pub opened: u64,
    pub deleted: u64,
}

/// Persistence seam shared by the Postgres store and [`MemoryStore`].
///
/// Lists come back ordered by `start_time` (events) or `created_at`
/// (groups); participants and guests keep their join order.
pub trait Store: Send + Sync {
    fn insert_user(&self, user: User) -> BoxFuture<'_, DbResult<()>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<User>>>;
    fn find_user_by_username<'a>(&'a self, username: &'a str) -> BoxFuture<'a, DbResult<Option<User>>>;
    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'_, DbResult<Vec<User>>>;

    fn insert_event(&self, event: Event) -> BoxFuture<'_, DbResult<()>>;
    fn find_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Event>>>;
    fn list_events(&self, filter: Filter) -> BoxFuture<'_, DbResult<Vec<Event>>>;
    fn delete_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<bool>>;
    /// Returns `false` when the user was already a participant.
    fn add_participant(&self, event_id: Uuid, participant: Participant) -> BoxFuture<'_, DbResult<bool>>;
    fn add_guest(&self, event_id: Uuid, guest: Guest) -> BoxFuture<'_, DbResult<()>>;
    fn open_started_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>>;
    fn delete_expired_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>>;

    fn insert_group(&self, group: EventGroup) -> BoxFuture<'_, DbResult<()>>;
    fn list_groups(&self, filter: GroupFilter) -> BoxFuture<'_, DbResult<Vec<EventGroup>>>;
}

/// [`Store`] backed by PostgreSQL. Queries live in the `user`, `event`
/// and `group` submodules.
#[derive(Clone)]
pub struct PgStore {
    pool: PGPool,
}

impl PgStore {
    pub fn new(pool: PGPool) -> Self {
        Self { pool }
    }
}

impl Store for PgStore {
    fn insert_user(&self, user: User) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(user::create(user, &self.pool))
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<User>>> {
        Box::pin(user::get_by_id(id, &self.pool))
    }

    fn find_user_by_username<'a>(&'a self, username: &'a str) -> BoxFuture<'a, DbResult<Option<User>>> {
        Box::pin(user::get_by_username(username, &self.pool))
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'_, DbResult<Vec<User>>> {
        Box::pin(user::get_many(ids, &self.pool))
    }

    fn insert_event(&self, event: Event) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(event::create(event, &self.pool))
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Event>>> {
        Box::pin(event::get_by_id(id, &self.pool))
    }

    fn list_events(&self, filter: Filter) -> BoxFuture<'_, DbResult<Vec<Event>>> {
        Box::pin(event::filter(filter, &self.pool))
    }

    fn delete_event(&self, id: Uuid) -> BoxFuture<'_, DbResult<bool>> {
        Box::pin(event::delete(id, &self.pool))
    }

    fn add_participant(&self, event_id: Uuid, participant: Participant) -> BoxFuture<'_, DbResult<bool>> {
        Box::pin(event::add_participant(event_id, participant, &self.pool))
    }

    fn add_guest(&self, event_id: Uuid, guest: Guest) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(event::add_guest(event_id, guest, &self.pool))
    }

    fn open_started_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>> {
        Box::pin(event::open_started(now, &self.pool))
    }

    fn delete_expired_events(&self, now: DateTime<Utc>) -> BoxFuture<'_, DbResult<u64>> {
        Box::pin(event::delete_expired(now, &self.pool))
    }

    fn insert_group(&self, group: EventGroup) -> BoxFuture<'_, DbResult<()>> {
        Box::pin(group::create(group, &self.pool))
    }

    fn list_groups(&self, filter: GroupFilter) -> BoxFuture<'_, DbResult<Vec<EventGroup>>> {
        Box::pin(group::filter(filter, &self.pool))
    }
}

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    info!("{}", "Connect with postgresql".to_string());
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");
    Ok(pool)
}
