//! Payment-flow error types.
//!
//! Errors raised by checkout creation, amount adjustment, webhook
//! reconciliation, and status polling.
//!
//! # Retry discipline
//!
//! | Category | Variants | Retry? |
//! |----------|----------|--------|
//! | Validation | InvalidAmount, UnsupportedCurrency, MalformedId | never |
//! | Not found | NotFound, RestaurantNotFound | never |
//! | State conflict | InvalidState, UnknownIntent, StaleConfirmation, AmountMismatch | never - reported for operator review |
//! | Infrastructure | GatewayFailed, Infrastructure | caller may retry |

use crate::domain::foundation::{DomainError, ErrorCode, PendingPaymentId, RestaurantId};

/// Payment pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFlowError {
    /// Pending payment was not found.
    NotFound(PendingPaymentId),

    /// Restaurant has no payment profile.
    RestaurantNotFound(RestaurantId),

    /// Amount must be a strictly positive number of minor units.
    InvalidAmount(i64),

    /// Currency code is not in the supported set.
    UnsupportedCurrency(String),

    /// Identifier failed format validation before any lookup.
    MalformedId(String),

    /// The payment is no longer in a state that permits the operation.
    InvalidState {
        current: String,
        attempted: String,
    },

    /// Confirmation referenced an intent with no ledger entry.
    UnknownIntent(String),

    /// Confirmation arrived for an already-terminal payment.
    StaleConfirmation {
        provider_intent_id: String,
        status: String,
    },

    /// Reported amount or currency differs from the ledger.
    AmountMismatch {
        provider_intent_id: String,
        ledger_minor: i64,
        reported_minor: i64,
        ledger_currency: String,
        reported_currency: String,
    },

    /// Webhook signature verification failed.
    InvalidWebhookSignature,

    /// Payment provider call failed.
    GatewayFailed {
        reason: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl PaymentFlowError {
    pub fn not_found(id: PendingPaymentId) -> Self {
        PaymentFlowError::NotFound(id)
    }

    pub fn restaurant_not_found(id: RestaurantId) -> Self {
        PaymentFlowError::RestaurantNotFound(id)
    }

    pub fn invalid_amount(minor_units: i64) -> Self {
        PaymentFlowError::InvalidAmount(minor_units)
    }

    pub fn unsupported_currency(code: impl Into<String>) -> Self {
        PaymentFlowError::UnsupportedCurrency(code.into())
    }

    pub fn malformed_id(raw: impl Into<String>) -> Self {
        PaymentFlowError::MalformedId(raw.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        PaymentFlowError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn unknown_intent(provider_intent_id: impl Into<String>) -> Self {
        PaymentFlowError::UnknownIntent(provider_intent_id.into())
    }

    pub fn stale_confirmation(
        provider_intent_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        PaymentFlowError::StaleConfirmation {
            provider_intent_id: provider_intent_id.into(),
            status: status.into(),
        }
    }

    pub fn invalid_webhook_signature() -> Self {
        PaymentFlowError::InvalidWebhookSignature
    }

    pub fn gateway_failed(reason: impl Into<String>) -> Self {
        PaymentFlowError::GatewayFailed {
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentFlowError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentFlowError::NotFound(_) => ErrorCode::PaymentNotFound,
            PaymentFlowError::RestaurantNotFound(_) => ErrorCode::RestaurantNotFound,
            PaymentFlowError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PaymentFlowError::UnsupportedCurrency(_) => ErrorCode::UnsupportedCurrency,
            PaymentFlowError::MalformedId(_) => ErrorCode::MalformedId,
            PaymentFlowError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PaymentFlowError::UnknownIntent(_) => ErrorCode::UnknownIntent,
            PaymentFlowError::StaleConfirmation { .. } => ErrorCode::StaleConfirmation,
            PaymentFlowError::AmountMismatch { .. } => ErrorCode::AmountMismatch,
            PaymentFlowError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            PaymentFlowError::GatewayFailed { .. } => ErrorCode::GatewayError,
            PaymentFlowError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            PaymentFlowError::NotFound(id) => format!("Pending payment not found: {}", id),
            PaymentFlowError::RestaurantNotFound(id) => {
                format!("No payment profile for restaurant: {}", id)
            }
            PaymentFlowError::InvalidAmount(minor) => {
                format!("Amount must be positive, got {}", minor)
            }
            PaymentFlowError::UnsupportedCurrency(code) => {
                format!("Unsupported currency: {}", code)
            }
            PaymentFlowError::MalformedId(raw) => {
                format!("Malformed pending payment id: {}", raw)
            }
            PaymentFlowError::InvalidState { current, attempted } => {
                format!("Cannot {} a payment in {} state", attempted, current)
            }
            PaymentFlowError::UnknownIntent(intent) => {
                format!("No pending payment for provider intent {}", intent)
            }
            PaymentFlowError::StaleConfirmation {
                provider_intent_id,
                status,
            } => format!(
                "Confirmation for intent {} arrived after the payment reached {} state",
                provider_intent_id, status
            ),
            PaymentFlowError::AmountMismatch {
                provider_intent_id,
                ledger_minor,
                reported_minor,
                ledger_currency,
                reported_currency,
            } => format!(
                "Intent {} reported {} {} but the ledger expects {} {}",
                provider_intent_id,
                reported_minor,
                reported_currency,
                ledger_minor,
                ledger_currency
            ),
            PaymentFlowError::InvalidWebhookSignature => {
                "Invalid webhook signature".to_string()
            }
            PaymentFlowError::GatewayFailed { reason } => {
                format!("Payment provider call failed: {}", reason)
            }
            PaymentFlowError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may safely retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentFlowError::Infrastructure(_) | PaymentFlowError::GatewayFailed { .. }
        )
    }
}

impl std::fmt::Display for PaymentFlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentFlowError {}

impl From<DomainError> for PaymentFlowError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidAmount => PaymentFlowError::InvalidAmount(0),
            ErrorCode::UnsupportedCurrency => {
                PaymentFlowError::UnsupportedCurrency(err.message)
            }
            ErrorCode::MalformedId => PaymentFlowError::MalformedId(err.message),
            ErrorCode::InvalidStateTransition => PaymentFlowError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            ErrorCode::GatewayError => PaymentFlowError::GatewayFailed {
                reason: err.message,
            },
            _ => PaymentFlowError::Infrastructure(err.to_string()),
        }
    }
}

impl From<PaymentFlowError> for DomainError {
    fn from(err: PaymentFlowError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_carries_both_states() {
        let err = PaymentFlowError::invalid_state("completed", "adjust amount on");
        assert!(matches!(
            err,
            PaymentFlowError::InvalidState { ref current, ref attempted }
            if current == "completed" && attempted == "adjust amount on"
        ));
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn amount_mismatch_message_names_both_amounts() {
        let err = PaymentFlowError::AmountMismatch {
            provider_intent_id: "pi_1".to_string(),
            ledger_minor: 1200,
            reported_minor: 1000,
            ledger_currency: "JOD".to_string(),
            reported_currency: "JOD".to_string(),
        };
        let msg = err.message();
        assert!(msg.contains("1200"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("pi_1"));
    }

    #[test]
    fn stale_confirmation_names_intent_and_state() {
        let err = PaymentFlowError::stale_confirmation("pi_9", "expired");
        let msg = err.message();
        assert!(msg.contains("pi_9"));
        assert!(msg.contains("expired"));
        assert_eq!(err.code(), ErrorCode::StaleConfirmation);
    }

    #[test]
    fn only_infrastructure_class_errors_are_retryable() {
        assert!(PaymentFlowError::infrastructure("store down").is_retryable());
        assert!(PaymentFlowError::gateway_failed("timeout").is_retryable());

        assert!(!PaymentFlowError::invalid_amount(-1).is_retryable());
        assert!(!PaymentFlowError::unknown_intent("pi_1").is_retryable());
        assert!(!PaymentFlowError::stale_confirmation("pi_1", "expired").is_retryable());
        assert!(!PaymentFlowError::invalid_state("completed", "adjust").is_retryable());
    }

    #[test]
    fn display_matches_message() {
        let err = PaymentFlowError::unsupported_currency("XYZ");
        assert_eq!(format!("{}", err), err.message());
    }

    #[test]
    fn converts_to_domain_error_with_same_code() {
        let err = PaymentFlowError::unknown_intent("pi_1");
        let domain_err: DomainError = err.clone().into();
        assert_eq!(domain_err.code, err.code());
    }
}
