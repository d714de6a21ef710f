use std::collections::HashSet;

use log::info;
use uuid::Uuid;

use crate::{
    app::AppState,
    db::{self, Filter, GroupFilter},
    dto::{ContactView, EventView, NewGroupDto},
    errors::ApiError,
    models::EventGroup,
};

use super::require_self;

pub async fn create(organizer: Uuid, dto: NewGroupDto, state: &AppState) -> Result<String, ApiError> {
    if dto.name.trim().is_empty() {
        return Err(ApiError::bad_request("Group name is required"));
    }
    let external_id = dto
        .group
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let group = EventGroup {
        row_id: Uuid::new_v4(),
        id: external_id.clone(),
        name: dto.name.trim().to_string(),
        description: dto.description,
        organizer,
        created_at: state.clock.now(),
    };
    match state.store.insert_group(group).await {
        Ok(()) => {
            info!("user {} created group {}", organizer, external_id);
            Ok(external_id)
        }
        Err(err) if err.is_conflict_on(db::GROUP_ID_KEY) => Err(ApiError::bad_request("Group id already in use")),
        Err(err) => Err(ApiError::internal("Server error creating group", err)),
    }
}

/// Groups organized by someone other than the caller.
pub async fn list_others(caller: Uuid, state: &AppState) -> Result<Vec<EventGroup>, ApiError> {
    state
        .store
        .list_groups(GroupFilter::NotOrganizedBy(caller))
        .await
        .map_err(|e| ApiError::internal("Server error fetching groups", e))
}

/// Events in `group` the caller has not joined yet.
pub async fn events(group: String, caller: Uuid, state: &AppState) -> Result<Vec<EventView>, ApiError> {
    let events = state
        .store
        .list_events(Filter::GroupNotJoinedBy(group, caller))
        .await
        .map_err(|e| ApiError::internal("Server error fetching group details", e))?;
    Ok(events.into_iter().map(EventView::public).collect())
}

pub async fn organized_by(user_id: Uuid, caller: Uuid, state: &AppState) -> Result<Vec<EventGroup>, ApiError> {
    let context = "Server error fetching user groups";
    require_self(user_id, caller, state, context).await?;
    state
        .store
        .list_groups(GroupFilter::OrganizedBy(user_id))
        .await
        .map_err(|e| ApiError::internal(context, e))
}

/// Distinct registered participants across every event tagged with one
/// of the user's groups, in first-join order.
pub async fn export_participants(user_id: Uuid, caller: Uuid, state: &AppState) -> Result<Vec<ContactView>, ApiError> {
    let context = "Server error fetching participants";
    require_self(user_id, caller, state, context).await?;

    let groups = state
        .store
        .list_groups(GroupFilter::OrganizedBy(user_id))
        .await
        .map_err(|e| ApiError::internal(context, e))?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let events = state
        .store
        .list_events(Filter::Groups(groups.into_iter().map(|g| g.id).collect()))
        .await
        .map_err(|e| ApiError::internal(context, e))?;

    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = events
        .iter()
        .flat_map(|e| e.participants.iter().map(|p| p.user_id))
        .filter(|id| seen.insert(*id))
        .collect();
    let users = state
        .store
        .find_users(ids.clone())
        .await
        .map_err(|e| ApiError::internal(context, e))?;

    Ok(ids
        .iter()
        .filter_map(|id| users.iter().find(|u| u.id == *id))
        .map(|u| ContactView {
            username: u.username.clone(),
            email: u.email.clone(),
        })
        .collect())
}
