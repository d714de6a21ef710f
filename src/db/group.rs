use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{models::EventGroup, PGPool};

use super::{DbResult, GroupFilter};

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    external_id: String,
    name: String,
    description: Option<String>,
    organizer: Uuid,
    created_at: DateTime<Utc>,
}

impl From<GroupRow> for EventGroup {
    fn from(row: GroupRow) -> Self {
        EventGroup {
            row_id: row.id,
            id: row.external_id,
            name: row.name,
            description: row.description,
            organizer: row.organizer,
            created_at: row.created_at,
        }
    }
}

pub async fn create(group: EventGroup, pool: &PGPool) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO event_groups (id, external_id, name, description, organizer, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(group.row_id)
    .bind(&group.id)
    .bind(&group.name)
    .bind(&group.description)
    .bind(group.organizer)
    .bind(group.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn filter(filter: GroupFilter, pool: &PGPool) -> DbResult<Vec<EventGroup>> {
    let sql = match filter {
        GroupFilter::OrganizedBy(_) => "SELECT * FROM event_groups WHERE organizer = $1 ORDER BY created_at",
        GroupFilter::NotOrganizedBy(_) => "SELECT * FROM event_groups WHERE organizer <> $1 ORDER BY created_at",
    };
    let user = match filter {
        GroupFilter::OrganizedBy(user) | GroupFilter::NotOrganizedBy(user) => user,
    };
    let rows = sqlx::query_as::<_, GroupRow>(sql)
        .bind(user)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(EventGroup::from).collect())
}
