use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::family::ProductFamily;

/// User-correctable input problems. These block the operation and never leave
/// partial state behind.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("client name is required")]
    EmptyClientName,
    #[error("proposal must contain at least one line item")]
    EmptyLineItems,
    #[error("contract term of {term_months} months is unavailable for plan `{plan}`")]
    UnavailableTerm { plan: String, term_months: u32 },
    #[error("unsupported contract term of {0} months (expected 12|24|36|48|60)")]
    UnsupportedTerm(u32),
    #[error("contract term `{0}` is not a number of months (expected 12|24|36|48|60)")]
    UnparseableTerm(String),
    #[error("lineage `{base_id}` does not belong to the {family} family")]
    LineageFamilyMismatch { base_id: String, family: ProductFamily },
    #[error("draft belongs to lineage `{draft}` but was saved onto `{requested}`")]
    LineageConflict { draft: String, requested: String },
    #[error("director discount must be within 0..=100, got {0}")]
    DiscountOutOfRange(Decimal),
    #[error("`{field}` must be a non-negative percentage, got {value}")]
    InvalidPercentage { field: &'static str, value: Decimal },
    #[error("invalid partner commission table: {0}")]
    CommissionTable(String),
    #[error("invalid payback table: {0}")]
    PaybackTable(String),
    #[error("invalid plan catalog: {0}")]
    Catalog(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("role `{role}` is not allowed to {action}")]
    PermissionDenied { role: String, action: &'static str },
    #[error("no plan with capacity tier {capacity_tier} in the {family} catalog")]
    PlanNotFound { family: ProductFamily, capacity_tier: u32 },
    #[error("proposal `{0}` was not found")]
    ProposalNotFound(String),
    #[error("{prefix} proposal numbering is exhausted (sequence {sequence} exceeds 4 digits)")]
    SequenceExhausted { prefix: String, sequence: u32 },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures reported by proposal and settings stores.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record conflict: {0}")]
    Conflict(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<ValidationError> for ApplicationError {
    fn from(value: ValidationError) -> Self {
        Self::Domain(DomainError::Validation(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "Your role does not allow this operation.",
            Self::ServiceUnavailable { .. } => {
                "The proposal store is temporarily unavailable. Your draft was kept; please retry."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "validation",
            Self::Forbidden { .. } => "permission",
            Self::ServiceUnavailable { .. } => "persistence",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::PermissionDenied { .. }) => {
                Self::Forbidden { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Persistence(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: unassigned(),
            },
        }
    }
}
