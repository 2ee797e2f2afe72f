use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use flagstaff::app_config;
use flagstaff::audit::AuditRecorder;
use flagstaff::flags::{FlagCache, FlagService, FlagStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::new().default_filter_or("info"));
    app_config::init();

    let config = app_config::get_config();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.");
    let db = flagstaff::db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let cache = FlagCache::new(&redis_url, &config.cache).expect("Invalid REDIS_URL");

    // All handles are built here once and passed down; components hold no
    // process-wide connection state.
    let service = FlagService::new(
        FlagStore::new(db.clone()),
        cache,
        AuditRecorder::new(db),
        &config.limits,
    );

    log::info!("Listening on {}", config.server.bind);

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(service.clone()))
            .wrap(Logger::default())
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .configure(flagstaff::web::configure)
    })
    .bind(&config.server.bind)?
    .run()
    .await
}
