use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use dropship_engine::{AccountApiError, CartApiError, OrderFlowError, WalletApiError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    Busy(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the logs
        let message = match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("💻️ Internal server error. {self}");
                "An internal error occurred. Please try again later.".to_string()
            },
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The {0} header is missing.")]
    MissingHeader(&'static str),
    #[error("The {header} header is invalid. {reason}")]
    InvalidHeader { header: &'static str, reason: String },
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        match e {
            CartApiError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
            CartApiError::ItemNotFound(_) | CartApiError::LineNotFound(_) => Self::NotFound(e.to_string()),
            CartApiError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            CartApiError::Conflict(_) => Self::Busy(e.to_string()),
            CartApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::EmptyCart | OrderFlowError::MissingTrackingRef | OrderFlowError::AmountOverflow(_) => {
                Self::ValidationError(e.to_string())
            },
            OrderFlowError::InsufficientStock { .. } |
            OrderFlowError::OutOfStock { .. } |
            OrderFlowError::InvalidState { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::InsufficientFunds { .. } => Self::PaymentRequired(e.to_string()),
            OrderFlowError::OrderNotFound(_) => Self::NotFound(e.to_string()),
            OrderFlowError::Conflict(_) => Self::Busy(e.to_string()),
            OrderFlowError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::OrderNotFound(_) => Self::NotFound(e.to_string()),
            AccountApiError::QueryError(_) => Self::ValidationError(e.to_string()),
            AccountApiError::Conflict(_) => Self::Busy(e.to_string()),
            AccountApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<WalletApiError> for ServerError {
    fn from(e: WalletApiError) -> Self {
        match e {
            WalletApiError::InvalidAmount(_) |
            WalletApiError::AmountTooLarge { .. } |
            WalletApiError::AmountOverflow(_) |
            WalletApiError::MissingBankDetails |
            WalletApiError::MissingRejectionReason => Self::ValidationError(e.to_string()),
            WalletApiError::InsufficientFunds { .. } => Self::PaymentRequired(e.to_string()),
            WalletApiError::WithdrawalNotFound(_) => Self::NotFound(e.to_string()),
            WalletApiError::WithdrawalAlreadyProcessed { .. } => Self::Conflict(e.to_string()),
            WalletApiError::BalanceMismatch { .. } => Self::BackendError(e.to_string()),
            WalletApiError::Conflict(_) => Self::Busy(e.to_string()),
            WalletApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}
