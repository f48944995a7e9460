//! Admin status update input.

use common::{OrderId, OrderStatus, PaymentStatus};
use serde::Deserialize;
use store::StatusUpdate;

/// Status update request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub order_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl StatusUpdateRequest {
    pub fn order_id(&self) -> OrderId {
        OrderId::new(self.order_id)
    }

    /// The columns this request would change.
    ///
    /// Values outside the status vocabularies are dropped, not rejected.
    pub fn recognized(&self) -> StatusUpdate {
        StatusUpdate {
            status: self
                .status
                .as_deref()
                .and_then(|s| OrderStatus::parse(s.trim())),
            payment_status: self
                .payment_status
                .as_deref()
                .and_then(|s| PaymentStatus::parse(s.trim())),
        }
    }
}

/// Result of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// At least one column was written.
    Updated(StatusUpdate),
    /// Nothing recognizable was requested; storage was not touched.
    NoOp,
}
