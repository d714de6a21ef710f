use std::{io, sync::Arc};

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};

use event_registration::{
    app::{self, AppState},
    clock::{Clock, SystemClock},
    config::Config,
    db::{init_db_pool, MemoryStore, PgStore, Store},
    service::{self, auth::AuthMiddleware, sweep::Sweeper},
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    service::log::init_logger();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(db_url) => {
            let pool = init_db_pool(db_url, config.database_max_connections)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(store.clone(), clock.clone(), &config);
    let keys = state.keys.clone();
    let origins = config.cors_allowed_origins.clone();

    let sweep = Sweeper::new(store, clock, config.sweep_interval).start();

    info!("Server starting on {}:{}", config.host, config.port);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(AuthMiddleware { keys: keys.clone() })
            .wrap(app::security_headers())
            .wrap(app::cors(&origins))
            .wrap(service::log::LoggerMiddleware)
            .configure(app::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    sweep.stop().await;
    server
}
