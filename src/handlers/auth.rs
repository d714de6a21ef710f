use actix_web::{post, web, HttpResponse};
use log::info;

use crate::{
    app::AppState,
    dto::{LoginQuery, LoginRequest, MessageResponse, RegisterRequest},
    errors::ApiError,
    service,
};

#[post("/login")]
pub async fn login(
    dto: web::Json<LoginRequest>,
    query: web::Query<LoginQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let response = service::user::login(dto.into_inner(), query.into_inner(), state.get_ref()).await?;
    info!("RESPONSE /LOGIN: user {}", response.user.id);
    Ok(HttpResponse::Ok().json(response))
}

#[post("/register")]
pub async fn register(dto: web::Json<RegisterRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    service::user::register(dto.into_inner(), state.get_ref()).await?;
    Ok(HttpResponse::Created().json(MessageResponse::new("Registration successful!")))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(register);
}
