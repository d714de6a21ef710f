pub mod auth;
pub mod crypto;
pub mod event;
pub mod group;
pub mod log;
pub mod sweep;
pub mod user;

use uuid::Uuid;

use crate::{app::AppState, errors::ApiError};

/// Admin listings keyed by a path user id only serve the caller's own data.
async fn require_self(user_id: Uuid, caller: Uuid, state: &AppState, context: &str) -> Result<(), ApiError> {
    if user_id != caller {
        return Err(ApiError::forbidden("Unauthorized to view another user's data"));
    }
    state
        .store
        .find_user(user_id)
        .await
        .map_err(|e| ApiError::internal(context, e))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(())
}
