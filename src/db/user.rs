use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    models::{Role, User},
    PGPool,
};

use super::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    pwd_hash: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(DbError::Query)?;
        Ok(User {
            id: row.id,
            username: row.username,
            pwd_hash: row.pwd_hash,
            email: row.email,
            role,
            created_at: row.created_at,
        })
    }
}

pub async fn create(user: User, pool: &PGPool) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO users (id, username, pwd_hash, email, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.pwd_hash)
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> DbResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub async fn get_by_username(username: &str, pool: &PGPool) -> DbResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

// /groups/admin/export/participants/{id}, /events/{id}/participants
pub async fn get_many(ids: Vec<Uuid>, pool: &PGPool) -> DbResult<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE id = ANY($1) ORDER BY created_at",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(User::try_from).collect()
}
