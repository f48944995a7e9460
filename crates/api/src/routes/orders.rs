//! Checkout, order query and status update endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{
    AddressId, Checkout, CheckoutRequest, Money, OrderDetails, OrderError, OrderId, OrderItemId,
    OrderService, OrderStatus, PaymentStatus, ProductId, StatusOutcome, StatusUpdateRequest,
    UserId,
};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::identity::Authenticated;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            order_service: OrderService::new(store),
        }
    }
}

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Admin only: list every account's orders. Set by its presence
    /// (`?all`, `?all=1`, `?all=true`); `0` and `false` turn it off.
    #[serde(default)]
    pub all: Option<String>,
}

impl ListParams {
    pub fn wants_all(&self) -> bool {
        self.all
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub total_amount: Money,
    pub message: String,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<OrderResponse>,
}

#[derive(Serialize)]
pub struct SingleOrderResponse {
    pub success: bool,
    pub order: OrderResponse,
}

#[derive(Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub updated: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total_amount: Money,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: String,
    pub customer: CustomerResponse,
    pub shipping_address: ShippingAddressResponse,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct ShippingAddressResponse {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub subtotal: Money,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let OrderDetails {
            order,
            customer,
            shipping,
            items,
        } = details;

        Self {
            order_id: order.order_id,
            user_id: order.user_id,
            address_id: order.address_id,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at.to_rfc3339(),
            customer: CustomerResponse {
                username: customer.username,
                full_name: customer.full_name,
                email: customer.email,
            },
            shipping_address: ShippingAddressResponse {
                address_line1: shipping.address_line1,
                address_line2: shipping.address_line2,
                city: shipping.city,
                state: shipping.state,
                postal_code: shipping.postal_code,
            },
            items: items
                .into_iter()
                .map(|line| OrderItemResponse {
                    order_item_id: line.order_item_id,
                    product_id: line.product_id,
                    product_name: line.product_name,
                    image_url: line.image_url,
                    quantity: line.quantity,
                    price_at_purchase: line.price_at_purchase,
                    subtotal: line.subtotal,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders places an order from the caller's cart.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let Json(req) = payload.map_err(invalid_body)?;
    let checkout = Checkout::try_from(req)?;

    let placed = state.order_service.place_order(&caller, &checkout).await?;

    let response = OrderPlacedResponse {
        success: true,
        order_id: placed.order_id,
        total_amount: placed.total_amount,
        message: "Order placed successfully".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /orders lists the caller's orders; `?all` lists every order for admins.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let orders = if params.wants_all() {
        state.order_service.list_all_orders(&caller).await?
    } else {
        state.order_service.list_orders_for_user(&caller).await?
    };

    Ok(Json(OrderListResponse {
        success: true,
        orders: orders.into_iter().map(OrderResponse::from).collect(),
    }))
}

/// GET /orders/{id} loads a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SingleOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let details = state.order_service.get_order(&caller, order_id).await?;

    Ok(Json(SingleOrderResponse {
        success: true,
        order: details.into(),
    }))
}

/// PUT /orders changes an order's status and/or payment status. Admin only.
#[tracing::instrument(skip(state, caller, payload))]
pub async fn update_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let Json(req) = payload.map_err(invalid_body)?;

    let response = match state.order_service.update_status(&caller, &req).await? {
        StatusOutcome::Updated(_) => StatusUpdateResponse {
            success: true,
            updated: true,
            message: "Order status updated".to_string(),
        },
        StatusOutcome::NoOp => StatusUpdateResponse {
            success: true,
            updated: false,
            message: "No recognized status values to update".to_string(),
        },
    };

    Ok(Json(response))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    OrderError::InvalidOrderData {
        reason: rejection.body_text(),
    }
    .into()
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse::<i64>()
        .ok()
        .map(OrderId::new)
        .filter(OrderId::is_valid)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid order ID: {id}")))
}
