use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{error::InternalError, http::header, middleware::DefaultHeaders, web, HttpResponse};

use crate::{
    clock::Clock,
    config::Config,
    db::Store,
    dto::MessageResponse,
    handlers,
    service::auth::jwt::JwtKeys,
};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub keys: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            store,
            clock,
            keys: Arc::new(JwtKeys::new(&config.jwt_secret, config.token_ttl)),
        }
    }
}

/// Registers all routes plus JSON error bodies for malformed input.
/// Literal route segments are registered before `{id}` patterns.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        let body = MessageResponse::new(format!("Invalid request body: {err}"));
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        let body = MessageResponse::new("Not found");
        InternalError::from_response(err, HttpResponse::NotFound().json(body)).into()
    }))
    .configure(handlers::auth::init_routes)
    .configure(handlers::user::init_routes)
    .configure(handlers::event::init_admin_routes)
    .configure(handlers::event::init_routes)
    .configure(handlers::group::init_routes);
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Frame-Options", "DENY"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}

/// Cross-origin access for the browser client: listed origins only,
/// JSON bodies and bearer tokens.
pub fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(86400)
}
