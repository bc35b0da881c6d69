use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use config::ServerConfig;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::mine_block,
        api::handlers::get_chain,
        api::handlers::get_validation
    ),
    components(
        schemas(
            blockchain::Block,
            api::handlers::MineResponse,
            api::handlers::ChainResponse,
            api::handlers::ValidationResponse
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger endpoints")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "A minimal proof-of-work ledger API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.as_str()));

    // The ledger lives for the whole process and is shared by every worker
    let ledger = web::Data::new(blockchain::Ledger::new());

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
