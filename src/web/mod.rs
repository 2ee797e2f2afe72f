pub mod audit;
pub mod error;
pub mod flags;

use actix_web::{get, HttpResponse, Responder};

/// Configures the web app by adding services from each web file.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    flags::configure(conf);
    audit::configure(conf);
    conf.service(health);
}

/// Liveness probe for deploy orchestration.
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
