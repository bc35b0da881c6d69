use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::blockchain::{Block, Ledger};

/// Shared ledger handed to every handler
pub type LedgerData = web::Data<Ledger>;

/// Errors returned by the API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Mining task failed: {0}")]
    MiningFailed(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MiningFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The index of the new block
    pub index: u64,

    /// When the new block was created
    pub timestamp: String,

    /// The proof of work of the new block
    pub proof: i64,

    /// The digest of the new block
    pub hash: String,

    /// The digest of the block before it
    pub previous_hash: String,
}

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

/// Response for the validation endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// "Valid" or "Invalid"
    pub message: String,
}

/// Mine a new block
///
/// Solves the proof of work against the last block and appends the result
#[utoipa::path(
    get,
    path = "/mine_block",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Mining task failed")
    )
)]
pub async fn mine_block(ledger: LedgerData) -> Result<HttpResponse, ApiError> {
    let ledger = ledger.into_inner();

    // The puzzle search blocks, keep it off the request workers
    let mined = web::block(move || ledger.mine_block()).await?;

    let response = MineResponse {
        message: "Congratulations, you just mined a block!".to_string(),
        index: mined.block.index,
        timestamp: mined.block.timestamp,
        proof: mined.block.proof,
        hash: mined.hash,
        previous_hash: mined.block.previous_hash,
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Get the full chain
///
/// Returns every block and the chain length
#[utoipa::path(
    get,
    path = "/get_chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(ledger: LedgerData) -> HttpResponse {
    let chain = ledger.get_chain();

    let response = ChainResponse {
        length: chain.len(),
        chain,
    };

    HttpResponse::Ok().json(response)
}

/// Check if the chain is valid
///
/// Validates every link and proof of work in the chain
#[utoipa::path(
    get,
    path = "/get_validation",
    responses(
        (status = 200, description = "Chain validation status", body = ValidationResponse)
    )
)]
pub async fn get_validation(ledger: LedgerData) -> HttpResponse {
    let message = if ledger.is_chain_valid() { "Valid" } else { "Invalid" };

    HttpResponse::Ok().json(ValidationResponse {
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::blockchain::hasher::digest_of_block;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_get_chain_returns_genesis() {
        let ledger = web::Data::new(Ledger::new());
        let app = test::init_service(App::new().app_data(ledger.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/get_chain").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["length"], 1);
        assert_eq!(body["chain"][0]["index"], 1);
        assert_eq!(body["chain"][0]["proof"], 1);
        assert_eq!(body["chain"][0]["previous_hash"], "0");
    }

    #[actix_web::test]
    async fn test_mine_block() {
        let ledger = web::Data::new(Ledger::new());
        let genesis = ledger.last_block();
        let app = test::init_service(App::new().app_data(ledger.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/mine_block").to_request();
        let body: MineResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.message, "Congratulations, you just mined a block!");
        assert_eq!(body.index, 2);
        assert_eq!(body.proof, 533);
        assert_eq!(body.previous_hash, digest_of_block(&genesis));
        assert_eq!(body.hash, digest_of_block(&ledger.last_block()));

        let req = test::TestRequest::get().uri("/get_chain").to_request();
        let body: ChainResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.length, 2);
    }

    #[actix_web::test]
    async fn test_get_validation() {
        let ledger = web::Data::new(Ledger::new());
        let app = test::init_service(App::new().app_data(ledger.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/get_validation").to_request();
        let body: ValidationResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.message, "Valid");

        // A block that does not link to its predecessor
        ledger.create_block(533, "0".to_string());

        let req = test::TestRequest::get().uri("/get_validation").to_request();
        let body: ValidationResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.message, "Invalid");
    }
}
