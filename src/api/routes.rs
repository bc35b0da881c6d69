use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/mine_block", web::get().to(handlers::mine_block))
        .route("/get_chain", web::get().to(handlers::get_chain))
        .route("/get_validation", web::get().to(handlers::get_validation));
}
