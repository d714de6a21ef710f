use actix_web::{get, web, HttpResponse};

use crate::{
    app::AppState,
    dto::UserResponse,
    errors::ApiError,
    service::{self, auth::UserAuthData},
};

#[get("/user")]
pub async fn me(auth: UserAuthData, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = service::user::current(auth.user_id, state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(UserResponse {
        message: "User info".to_string(),
        user,
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(me);
}
