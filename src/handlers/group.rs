use actix_web::{get, post, web, HttpResponse};
use uuid::Uuid;

use crate::{
    app::AppState,
    dto::{CreatedGroupResponse, EventsResponse, ExportResponse, GroupsResponse, NewGroupDto},
    errors::ApiError,
    service::{self, auth::UserAuthData},
};

#[post("/group")]
pub async fn create(
    auth: UserAuthData,
    dto: web::Json<NewGroupDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let group_id = service::group::create(auth.user_id, dto.into_inner(), state.get_ref()).await?;
    Ok(HttpResponse::Created().json(CreatedGroupResponse {
        message: format!("Group created successfully. Your group id is: {group_id}"),
        group_id,
    }))
}

#[get("/groups")]
pub async fn get_all(auth: UserAuthData, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let groups = service::group::list_others(auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(GroupsResponse {
        message: "Groups found".to_string(),
        groups,
    }))
}

#[get("/groups/details/{group_id}")]
pub async fn details(
    group_id: web::Path<String>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let events = service::group::events(group_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(EventsResponse {
        message: "Events found".to_string(),
        events,
    }))
}

#[get("/groups/admin/export/participants/{user_id}")]
pub async fn export_participants(
    user_id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let users = service::group::export_participants(user_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ExportResponse {
        message: "Participants found".to_string(),
        users,
    }))
}

#[get("/groups/admin/{user_id}")]
pub async fn admin_by_user(
    user_id: web::Path<Uuid>,
    auth: UserAuthData,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let groups = service::group::organized_by(user_id.into_inner(), auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(GroupsResponse {
        message: "Groups found".to_string(),
        groups,
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(get_all)
        .service(details)
        .service(export_participants)
        .service(admin_by_user);
}
