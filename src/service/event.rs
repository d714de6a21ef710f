use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use crate::{
    app::AppState,
    db::{self, Filter},
    dto::{EventView, NewEventDto, ParticipantView},
    errors::ApiError,
    models::{Event, EventStatus, Guest, JoinRejection, Participant},
};

use super::require_self;

async fn find(id: Uuid, state: &AppState, context: &str) -> Result<Event, ApiError> {
    state
        .store
        .find_event(id)
        .await
        .map_err(|e| ApiError::internal(context, e))?
        .ok_or_else(|| ApiError::not_found("Event not found"))
}

async fn list(filter: Filter, state: &AppState, context: &str) -> Result<Vec<Event>, ApiError> {
    state
        .store
        .list_events(filter)
        .await
        .map_err(|e| ApiError::internal(context, e))
}

/// New events start CLOSED with no attendance.
pub async fn create(organizer: Uuid, dto: NewEventDto, state: &AppState) -> Result<Uuid, ApiError> {
    dto.validate()?;
    let event = Event {
        id: Uuid::new_v4(),
        name: dto.name.trim().to_string(),
        description: dto.description,
        start_time: dto.start_time,
        end_time: dto.end_time,
        status: EventStatus::Closed,
        access_code: dto.access_code,
        group: dto
            .group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty()),
        organizer,
        participants: Vec::new(),
        guests: Vec::new(),
        created_at: state.clock.now(),
    };
    let id = event.id;
    match state.store.insert_event(event).await {
        Ok(()) => {
            info!("user {} created event {}", organizer, id);
            Ok(id)
        }
        Err(err) if err.is_conflict_on(db::ACCESS_CODE_KEY) => {
            Err(ApiError::bad_request("Access code already in use"))
        }
        Err(err) => Err(ApiError::internal("Server error creating event", err)),
    }
}

/// Events the caller neither organizes nor has joined.
pub async fn list_joinable(user_id: Uuid, state: &AppState) -> Result<Vec<EventView>, ApiError> {
    let events = list(Filter::Joinable(user_id), state, "Server error fetching events").await?;
    Ok(events.into_iter().map(EventView::public).collect())
}

pub async fn detail(id: Uuid, viewer: Option<Uuid>, state: &AppState) -> Result<EventView, ApiError> {
    let event = find(id, state, "Server error fetching event details").await?;
    Ok(EventView::for_viewer(event, viewer))
}

/// Authenticated join gated by the access code; returns the join time.
pub async fn join(
    event_id: Uuid,
    user_id: Uuid,
    access_code: &str,
    state: &AppState,
) -> Result<DateTime<Utc>, ApiError> {
    let event = find(event_id, state, "Server error joining event").await?;
    event.check_join(user_id, access_code)?;

    let joined_at = state.clock.now();
    let added = state
        .store
        .add_participant(event_id, Participant { user_id, joined_at })
        .await
        .map_err(|e| ApiError::internal("Server error joining event", e))?;
    if !added {
        return Err(JoinRejection::AlreadyJoined.into());
    }
    info!("user {} joined event {}", user_id, event_id);
    Ok(joined_at)
}

/// Guests are recorded by name only, without duplicate or status checks.
pub async fn join_guest(event_id: Uuid, name: &str, state: &AppState) -> Result<Guest, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required for guest access."));
    }
    find(event_id, state, "Server error joining event as a guest").await?;

    let guest = Guest {
        name: name.to_string(),
        joined_at: state.clock.now(),
    };
    state
        .store
        .add_guest(event_id, guest.clone())
        .await
        .map_err(|e| ApiError::internal("Server error joining event as a guest", e))?;
    info!("guest '{}' joined event {}", guest.name, event_id);
    Ok(guest)
}

/// Registered participants resolved to contact details, in join order,
/// followed by the event's guests.
pub async fn participants(
    event_id: Uuid,
    state: &AppState,
) -> Result<(Vec<ParticipantView>, Vec<Guest>), ApiError> {
    let context = "Server error fetching participants";
    let event = find(event_id, state, context).await?;
    let users = state
        .store
        .find_users(event.participants.iter().map(|p| p.user_id).collect())
        .await
        .map_err(|e| ApiError::internal(context, e))?;

    let participants = event
        .participants
        .iter()
        .filter_map(|p| {
            users.iter().find(|u| u.id == p.user_id).map(|u| ParticipantView {
                username: u.username.clone(),
                email: u.email.clone(),
                joined_at: p.joined_at,
            })
        })
        .collect();
    Ok((participants, event.guests))
}

pub async fn delete(event_id: Uuid, user_id: Uuid, state: &AppState) -> Result<(), ApiError> {
    let event = find(event_id, state, "Server error deleting event").await?;
    if !event.is_organized_by(user_id) {
        return Err(ApiError::forbidden("Unauthorized to delete event"));
    }
    state
        .store
        .delete_event(event_id)
        .await
        .map_err(|e| ApiError::internal("Server error deleting event", e))?;
    info!("user {} deleted event {}", user_id, event_id);
    Ok(())
}

pub async fn organized_by(user_id: Uuid, caller: Uuid, state: &AppState) -> Result<Vec<EventView>, ApiError> {
    let context = "Server error fetching user events";
    require_self(user_id, caller, state, context).await?;
    let events = list(Filter::OrganizedBy(user_id), state, context).await?;
    Ok(events.into_iter().map(EventView::for_organizer).collect())
}

pub async fn admin_detail(event_id: Uuid, caller: Uuid, state: &AppState) -> Result<EventView, ApiError> {
    let event = find(event_id, state, "Server error fetching event details").await?;
    if !event.is_organized_by(caller) {
        return Err(ApiError::forbidden("Unauthorized to view event"));
    }
    Ok(EventView::for_organizer(event))
}

/// The caller's own events tagged with `group`.
pub async fn in_group_for_organizer(
    group: String,
    caller: Uuid,
    state: &AppState,
) -> Result<Vec<EventView>, ApiError> {
    let events = list(
        Filter::GroupOrganizedBy(group, caller),
        state,
        "Server error fetching group events",
    )
    .await?;
    Ok(events.into_iter().map(EventView::for_organizer).collect())
}

pub async fn attended_by(user_id: Uuid, caller: Uuid, state: &AppState) -> Result<Vec<EventView>, ApiError> {
    let context = "Server error fetching attended events";
    require_self(user_id, caller, state, context).await?;
    let events = list(Filter::AttendedBy(user_id), state, context).await?;
    Ok(events.into_iter().map(EventView::public).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{
        sweep::Sweeper,
        testing::{event_input, state, user},
    };
    use chrono::Duration;

    #[actix_rt::test]
    async fn only_the_organizer_can_delete() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let other = user(&state, "other").await;
        let id = create(owner, event_input(&state, "DEL", 1, 2), &state).await.unwrap();

        let err = delete(id, other, &state).await.unwrap_err();
        assert_eq!(err, ApiError::forbidden("Unauthorized to delete event"));
        assert!(state.store.find_event(id).await.unwrap().is_some());

        delete(id, owner, &state).await.unwrap();
        assert!(state.store.find_event(id).await.unwrap().is_none());
        assert_eq!(
            delete(id, owner, &state).await.unwrap_err(),
            ApiError::not_found("Event not found")
        );
    }

    #[actix_rt::test]
    async fn second_join_reports_already_joined() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let alice = user(&state, "alice").await;
        let id = create(owner, event_input(&state, "TWICE", 1, 2), &state).await.unwrap();

        let joined_at = join(id, alice, "TWICE", &state).await.unwrap();
        assert_eq!(joined_at, state.clock.now());
        let err = join(id, alice, "TWICE", &state).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("User already joined"));

        let event = state.store.find_event(id).await.unwrap().unwrap();
        assert_eq!(event.participants.len(), 1);
    }

    #[actix_rt::test]
    async fn wrong_code_fails_in_every_status() {
        let (state, clock) = state();
        let owner = user(&state, "owner").await;
        let alice = user(&state, "alice").await;
        let id = create(owner, event_input(&state, "RIGHT", 1, 3), &state).await.unwrap();

        let err = join(id, alice, "WRONG", &state).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized("Invalid access code".into()));

        clock.advance(Duration::hours(2));
        Sweeper::new(state.store.clone(), state.clock.clone(), std::time::Duration::from_secs(60))
            .tick()
            .await
            .unwrap();
        assert!(join(id, alice, "WRONG", &state).await.is_err());

        let event = state.store.find_event(id).await.unwrap().unwrap();
        assert!(event.participants.is_empty());
    }

    #[actix_rt::test]
    async fn open_events_refuse_joins() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let alice = user(&state, "alice").await;
        let id = create(owner, event_input(&state, "ABC123", -1, 1), &state).await.unwrap();
        Sweeper::new(state.store.clone(), state.clock.clone(), std::time::Duration::from_secs(60))
            .tick()
            .await
            .unwrap();

        let err = join(id, alice, "ABC123", &state).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("Event is already open"));
    }

    #[actix_rt::test]
    async fn guest_join_appends_by_name() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let id = create(owner, event_input(&state, "G", 1, 2), &state).await.unwrap();

        let guest = join_guest(id, "  Alice ", &state).await.unwrap();
        assert_eq!(guest.name, "Alice");
        join_guest(id, "Alice", &state).await.unwrap();

        let event = state.store.find_event(id).await.unwrap().unwrap();
        assert_eq!(event.guests.len(), 2);
        assert_eq!(event.guests[0], Guest { name: "Alice".into(), joined_at: state.clock.now() });

        assert_eq!(
            join_guest(id, "   ", &state).await.unwrap_err(),
            ApiError::bad_request("Name is required for guest access.")
        );
        assert_eq!(
            join_guest(Uuid::new_v4(), "Bob", &state).await.unwrap_err(),
            ApiError::not_found("Event not found")
        );
    }

    #[actix_rt::test]
    async fn browse_hides_own_and_joined_events() {
        let (state, _) = state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;
        let first = create(a, event_input(&state, "ONE", 1, 2), &state).await.unwrap();
        let second = create(a, event_input(&state, "TWO", 1, 2), &state).await.unwrap();

        assert!(list_joinable(a, &state).await.unwrap().is_empty());
        let visible: Vec<Uuid> = list_joinable(b, &state).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(visible, vec![first, second]);

        join(first, b, "ONE", &state).await.unwrap();
        let visible: Vec<Uuid> = list_joinable(b, &state).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(visible, vec![second]);
        assert!(list_joinable(b, &state).await.unwrap().iter().all(|e| e.access_code.is_none()));
    }

    #[actix_rt::test]
    async fn duplicate_access_code_is_a_bad_request() {
        let (state, _) = state();
        let a = user(&state, "a").await;
        create(a, event_input(&state, "SAME", 1, 2), &state).await.unwrap();
        let err = create(a, event_input(&state, "SAME", 3, 4), &state).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("Access code already in use"));
    }

    #[actix_rt::test]
    async fn participants_merge_users_and_guests() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let alice = user(&state, "alice").await;
        let id = create(owner, event_input(&state, "P", 1, 2), &state).await.unwrap();
        join(id, alice, "P", &state).await.unwrap();
        join_guest(id, "Bob", &state).await.unwrap();

        let (people, guests) = participants(id, &state).await.unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].username, "alice");
        assert_eq!(people[0].email, "alice@example.com");
        assert_eq!(guests.len(), 1);
        assert_eq!(guests[0].name, "Bob");
    }

    #[actix_rt::test]
    async fn detail_shows_code_to_organizer_only() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let other = user(&state, "other").await;
        let id = create(owner, event_input(&state, "SECRET", 1, 2), &state).await.unwrap();

        assert_eq!(detail(id, Some(owner), &state).await.unwrap().access_code.as_deref(), Some("SECRET"));
        assert!(detail(id, Some(other), &state).await.unwrap().access_code.is_none());
        assert!(detail(id, None, &state).await.unwrap().access_code.is_none());

        assert!(admin_detail(id, owner, &state).await.is_ok());
        assert_eq!(
            admin_detail(id, other, &state).await.unwrap_err(),
            ApiError::forbidden("Unauthorized to view event")
        );
    }

    #[actix_rt::test]
    async fn admin_listings_are_scoped_to_caller() {
        let (state, _) = state();
        let owner = user(&state, "owner").await;
        let alice = user(&state, "alice").await;
        let mut input = event_input(&state, "GRP", 1, 2);
        input.group = Some("spring".into());
        let id = create(owner, input, &state).await.unwrap();
        join(id, alice, "GRP", &state).await.unwrap();

        assert_eq!(organized_by(owner, owner, &state).await.unwrap().len(), 1);
        assert_eq!(
            organized_by(owner, alice, &state).await.unwrap_err(),
            ApiError::forbidden("Unauthorized to view another user's data")
        );
        assert_eq!(attended_by(alice, alice, &state).await.unwrap()[0].id, id);
        assert_eq!(in_group_for_organizer("spring".into(), owner, &state).await.unwrap().len(), 1);
        assert!(in_group_for_organizer("spring".into(), alice, &state).await.unwrap().is_empty());
    }
}
