//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, ProductId};
use serde::Serialize;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable caller identity on the request.
    #[error("Authentication required")]
    Unauthorized,

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, product_id) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = ErrorBody {
            success: false,
            message,
            product_id,
        };
        (status, Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String, Option<ProductId>) {
    match &err {
        DomainError::Order(order_err) => {
            let status = match order_err {
                OrderError::InvalidOrderData { .. } | OrderError::InvalidAddress { .. } => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::ProductNotFound { .. } | OrderError::OrderNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
            };
            (status, order_err.to_string(), order_err.product_id())
        }
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string(), None),
        DomainError::Transaction(cause) => {
            tracing::error!(error = %cause, "storage failure while handling request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The request could not be completed, please try again".to_string(),
                None,
            )
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Domain(err.into())
    }
}
