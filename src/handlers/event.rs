use actix_web::{delete, get, post, web, HttpResponse};
use uuid::Uuid;

use crate::{
    app::AppState,
    dto::{
        CreatedEventResponse, EventResponse, EventsResponse, GuestJoinRequest, JoinRequest, JoinResponse,
        MessageResponse, NewEventDto, ParticipantsResponse,
    },
    errors::ApiError,
    service::{self, auth::UserAuthData},
};

fn events_found(events: Vec<crate::dto::EventView>) -> HttpResponse {
    HttpResponse::Ok().json(EventsResponse {
        message: "Events found".to_string(),
        events,
    })
}

#[get("/events")]
pub async fn get_all(auth: UserAuthData, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let events = service::event::list_joinable(auth.user_id, state.get_ref()).await?;
    Ok(events_found(events))
}

#[post("/events")]
pub async fn create(
    auth: UserAuthData,
    dto: web::Json<NewEventDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let event_id = service::event::create(auth.user_id, dto.into_inner(), state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(CreatedEventResponse {
        message: format!("Event created successfully. Your event id is: {event_id}"),
        event_id,
    }))
}

/// Public; the access code is only included for the organizer.
#[get("/events/{id}")]
pub async fn get_by_id(
    id: web::Path<Uuid>,
    auth: Option<UserAuthData>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let viewer = auth.map(|a| a.user_id);
    let event = service::event::detail(id.into_inner(), viewer, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EventResponse {
        message: "Event found".to_string(),
        event,
    }))
}

// landing page of the QR / guest link
#[get("/events/{id}/join")]
pub async fn join_page(
    id: web::Path<Uuid>,
    auth: Option<UserAuthData>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let viewer = auth.map(|a| a.user_id);
    let event = service::event::detail(id.into_inner(), viewer, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EventResponse {
        message: "Join event".to_string(),
        event,
    }))
}

#[post("/events/{id}/join-guest")]
pub async fn join_guest(
    id: web::Path<Uuid>,
    dto: web::Json<GuestJoinRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    service::event::join_guest(id.into_inner(), &dto.name, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully joined the event as a guest.")))
}

#[post("/events/{id}/join")]
pub async fn join(
    id: web::Path<Uuid>,
    auth: UserAuthData,
    dto: web::Json<JoinRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let joined_at = service::event::join(id.into_inner(), auth.user_id, &dto.access_code, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(JoinResponse {
        message: "Joined event successfully".to_string(),
        joined_at,
    }))
}

#[get("/events/{id}/participants")]
pub async fn participants(
    id: web::Path<Uuid>,
    _auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (participants, guests) = service::event::participants(id.into_inner(), state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ParticipantsResponse {
        message: "Event participants".to_string(),
        participants,
        guests,
    }))
}

#[delete("/events/{id}")]
pub async fn remove(
    id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    service::event::delete(id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Event deleted successfully")))
}

#[get("/events/admin/groups/{group_id}")]
pub async fn admin_by_group(
    group_id: web::Path<String>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let events = service::event::in_group_for_organizer(group_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(events_found(events))
}

#[get("/events/admin/{user_id}")]
pub async fn admin_by_user(
    user_id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let events = service::event::organized_by(user_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(events_found(events))
}

#[get("/events/details/admin/{id}")]
pub async fn admin_detail(
    id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let event = service::event::admin_detail(id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EventResponse {
        message: "Event found".to_string(),
        event,
    }))
}

#[get("/events/attended/{user_id}")]
pub async fn attended(
    user_id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let events = service::event::attended_by(user_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EventsResponse {
        message: "Attended events found".to_string(),
        events,
    }))
}

/// Literal-prefixed routes; must be registered before [`init_routes`].
pub fn init_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admin_by_group)
        .service(admin_by_user)
        .service(admin_detail)
        .service(attended);
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(get_by_id)
        .service(join_page)
        .service(join_guest)
        .service(join)
        .service(participants)
        .service(remove);
}
