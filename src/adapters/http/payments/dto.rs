//! Request/response DTOs for the payment endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::handlers::payment::PaymentStatusView;
use crate::domain::payment::PendingPayment;

/// POST /api/payments/checkout request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    pub restaurant_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
}

/// Response for a freshly opened checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub pending_payment_id: String,
    pub provider_intent_id: String,
    pub client_secret: String,
}

/// POST /api/payments/{id}/amount request body.
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustAmountRequest {
    pub amount_minor: i64,
}

/// Summary of a pending payment after a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummaryResponse {
    pub pending_payment_id: String,
    pub provider_intent_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub expires_at: String,
}

impl From<&PendingPayment> for PaymentSummaryResponse {
    fn from(payment: &PendingPayment) -> Self {
        Self {
            pending_payment_id: payment.id.to_string(),
            provider_intent_id: payment.provider_intent_id.clone(),
            amount_minor: payment.amount.minor_units(),
            currency: payment.currency.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            expires_at: payment.expires_at.to_string(),
        }
    }
}

/// GET /api/payments/{id}/status response body.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<i64>,
}

impl From<PaymentStatusView> for PaymentStatusResponse {
    fn from(view: PaymentStatusView) -> Self {
        match view {
            PaymentStatusView::Completed {
                order_id,
                order_number,
            } => Self {
                status: "completed".to_string(),
                order_id: Some(order_id.to_string()),
                order_number: Some(order_number.value()),
            },
            PaymentStatusView::Expired => Self {
                status: "expired".to_string(),
                order_id: None,
                order_number: None,
            },
            PaymentStatusView::Pending => Self {
                status: "pending".to_string(),
                order_id: None,
                order_number: None,
            },
        }
    }
}

/// Machine-readable error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
