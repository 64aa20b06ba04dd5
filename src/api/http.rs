use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::config::ApiConfig;
use crate::database::{AddressTxRow, Database, DbError};
use crate::error::{LedgerError, ValidationError};
use crate::models::{AddressNetFlow, AddressValidator, Direction, XTZ_SYMBOL};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Validation(ValidationError::InvalidAddress(_)) => (StatusCode::BAD_REQUEST, "invalid_address"),
            ApiError::Validation(_) | ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            ApiError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<ApiError> for LedgerError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Database(e) => LedgerError::from(e),
            ApiError::Validation(e) => LedgerError::Validation(e),
            ApiError::InvalidParameter(msg) => LedgerError::Validation(ValidationError::OutOfRange(msg)),
            ApiError::Server(msg) => LedgerError::System(crate::error::SystemError::ResourceExhausted(msg)),
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Response structure for status endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub last_processed_level: u64,
    pub total_records: u64,
    pub last_updated: u64,
    pub database_status: String,
}

/// Response structure for address transactions endpoint
#[derive(Debug, Serialize)]
pub struct AddressTransactionsResponse {
    pub address: String,
    pub direction: Option<Direction>,
    pub transactions: Vec<AddressTxRow>,
    pub total_count: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

/// Query parameters for address transactions endpoint
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub direction: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

/// Query parameters for net-flow endpoint
#[derive(Debug, Deserialize)]
pub struct NetFlowQuery {
    pub symbol: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

/// HTTP API server
pub struct ApiServer {
    database: Arc<Database>,
    config: ApiConfig,
}

impl ApiServer {
    pub fn new(database: Arc<Database>, config: ApiConfig) -> Self {
        Self { database, config }
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Build the router with all routes and middleware
    pub fn router(&self) -> Router {
        let app_state = AppState {
            database: self.database.clone(),
            default_page_size: self.config.default_page_size,
            max_page_size: self.config.max_page_size,
        };

        Router::new()
            .route("/status", get(get_status))
            .route("/addresses/:address/transactions", get(get_address_transactions))
            .route("/addresses/:address/net-flow", get(get_address_net_flow))
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
            .with_state(app_state)
    }

    /// Bind and serve until the process is stopped
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("HTTP API server starting on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {}", e)))?;

        Ok(())
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::InvalidParameter(rejection.body_text()))
}

fn validated_address(raw: &str) -> Result<String, ApiError> {
    let address = AddressValidator::normalize(raw);
    AddressValidator::validate(&address)?;
    Ok(address)
}

/// GET /status - indexer cursor and record count
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let indexer_state = state.database.get_indexer_state()?;
    let total_records = state.database.get_record_count()?;

    Ok(Json(StatusResponse {
        status: "healthy".to_string(),
        last_processed_level: indexer_state.last_processed_level,
        total_records,
        last_updated: indexer_state.last_updated,
        database_status: "connected".to_string(),
    }))
}

/// GET /addresses/:address/transactions - stored records for one address
pub async fn get_address_transactions(
    Path(address): Path<String>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<AddressTransactionsResponse>, ApiError> {
    let address = validated_address(&address)?;
    let params = query_params(query)?;

    let direction = params
        .direction
        .as_deref()
        .map(Direction::from_str)
        .transpose()?;

    let limit = params.limit.unwrap_or(state.default_page_size);
    if limit == 0 {
        return Err(ApiError::InvalidParameter("Limit must be greater than 0".to_string()));
    }
    if limit > state.max_page_size {
        return Err(ApiError::InvalidParameter(format!(
            "Limit cannot exceed {}",
            state.max_page_size
        )));
    }

    let transactions = state.database.get_address_txs(&address, direction, limit, params.offset)?;
    let total_count = state.database.count_address_txs(&address, direction)?;
    let has_more = (params.offset as u64 + transactions.len() as u64) < total_count;

    Ok(Json(AddressTransactionsResponse {
        address,
        direction,
        transactions,
        total_count,
        limit,
        offset: params.offset,
        has_more,
    }))
}

/// GET /addresses/:address/net-flow - incoming minus outgoing for one symbol
pub async fn get_address_net_flow(
    Path(address): Path<String>,
    query: Result<Query<NetFlowQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<AddressNetFlow>, ApiError> {
    let address = validated_address(&address)?;
    let params = query_params(query)?;

    let symbol = params
        .symbol
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| XTZ_SYMBOL.to_string());
    if symbol.is_empty() {
        return Err(ApiError::InvalidParameter("Symbol must not be empty".to_string()));
    }

    Ok(Json(state.database.get_net_flow(&address, &symbol)?))
}
