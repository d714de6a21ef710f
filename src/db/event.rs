use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{prelude::FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    models::{Event, EventStatus, Guest, Participant},
    PGPool,
};

use super::{DbError, DbResult, Filter};

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    access_code: String,
    group_id: Option<String>,
    organizer: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    event_id: Uuid,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct GuestRow {
    event_id: Uuid,
    name: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status: EventStatus = row.status.parse().map_err(DbError::Query)?;
        Ok(Event {
            id: row.id,
            name: row.name,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            access_code: row.access_code,
            group: row.group_id,
            organizer: row.organizer,
            participants: Vec::new(),
            guests: Vec::new(),
            created_at: row.created_at,
        })
    }
}

pub async fn create(event: Event, pool: &PGPool) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO events (id, name, description, start_time, end_time, status, access_code, group_id, organizer, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(event.id)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.start_time)
    .bind(event.end_time)
    .bind(event.status.as_str())
    .bind(&event.access_code)
    .bind(&event.group)
    .bind(event.organizer)
    .bind(event.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

// /events/{id}
pub async fn get_by_id(id: Uuid, pool: &PGPool) -> DbResult<Option<Event>> {
    let row = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let mut events = vec![Event::try_from(row)?];
            load_attendance(&mut events, pool).await?;
            Ok(events.pop())
        }
        None => Ok(None),
    }
}

pub async fn filter(filter: Filter, pool: &PGPool) -> DbResult<Vec<Event>> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT e.* FROM events e WHERE ");
    match filter {
        Filter::Joinable(user) => {
            query_builder
                .push("e.organizer <> ")
                .push_bind(user)
                .push(" AND NOT EXISTS (SELECT 1 FROM event_participants p WHERE p.event_id = e.id AND p.user_id = ")
                .push_bind(user)
                .push(")");
        }
        Filter::OrganizedBy(user) => {
            query_builder.push("e.organizer = ").push_bind(user);
        }
        Filter::AttendedBy(user) => {
            query_builder
                .push("EXISTS (SELECT 1 FROM event_participants p WHERE p.event_id = e.id AND p.user_id = ")
                .push_bind(user)
                .push(")");
        }
        Filter::GroupOrganizedBy(group, user) => {
            query_builder
                .push("e.group_id = ")
                .push_bind(group)
                .push(" AND e.organizer = ")
                .push_bind(user);
        }
        Filter::GroupNotJoinedBy(group, user) => {
            query_builder
                .push("e.group_id = ")
                .push_bind(group)
                .push(" AND NOT EXISTS (SELECT 1 FROM event_participants p WHERE p.event_id = e.id AND p.user_id = ")
                .push_bind(user)
                .push(")");
        }
        Filter::Groups(groups) => {
            query_builder.push("e.group_id = ANY(").push_bind(groups).push(")");
        }
    }
    query_builder.push(" ORDER BY e.start_time, e.created_at");

    let rows: Vec<EventRow> = query_builder.build_query_as().fetch_all(pool).await?;
    let mut events = rows
        .into_iter()
        .map(Event::try_from)
        .collect::<DbResult<Vec<Event>>>()?;
    load_attendance(&mut events, pool).await?;
    Ok(events)
}

/// Fills `participants` and `guests` for a batch of events with two queries.
async fn load_attendance(events: &mut [Event], pool: &PGPool) -> DbResult<()> {
    if events.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();

    let participants = sqlx::query_as::<_, ParticipantRow>(
        "SELECT event_id, user_id, joined_at FROM event_participants
        WHERE event_id = ANY($1) ORDER BY joined_at",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let guests = sqlx::query_as::<_, GuestRow>(
        "SELECT event_id, name, joined_at FROM event_guests
        WHERE event_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let index: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    for row in participants {
        if let Some(&i) = index.get(&row.event_id) {
            events[i].participants.push(Participant {
                user_id: row.user_id,
                joined_at: row.joined_at,
            });
        }
    }
    for row in guests {
        if let Some(&i) = index.get(&row.event_id) {
            events[i].guests.push(Guest {
                name: row.name,
                joined_at: row.joined_at,
            });
        }
    }
    Ok(())
}

pub async fn delete(id: Uuid, pool: &PGPool) -> DbResult<bool> {
    let res = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn add_participant(event_id: Uuid, participant: Participant, pool: &PGPool) -> DbResult<bool> {
    let res = sqlx::query(
        "INSERT INTO event_participants (event_id, user_id, joined_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (event_id, user_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(participant.user_id)
    .bind(participant.joined_at)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn add_guest(event_id: Uuid, guest: Guest, pool: &PGPool) -> DbResult<()> {
    sqlx::query("INSERT INTO event_guests (event_id, name, joined_at) VALUES ($1, $2, $3)")
        .bind(event_id)
        .bind(&guest.name)
        .bind(guest.joined_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn open_started(now: DateTime<Utc>, pool: &PGPool) -> DbResult<u64> {
    let res = sqlx::query(
        "UPDATE events SET status = 'OPEN'
        WHERE status = 'CLOSED' AND start_time <= $1 AND end_time > $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn delete_expired(now: DateTime<Utc>, pool: &PGPool) -> DbResult<u64> {
    let res = sqlx::query("DELETE FROM events WHERE end_time < $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
