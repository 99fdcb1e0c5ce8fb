pub mod error;
pub mod fixed_rate;
pub mod mortgage;
pub mod types;

pub use error::MortgageError;
pub use fixed_rate::{FixedRateLoan, PaymentRecord};
pub use mortgage::{amortize, create_mortgage, LoanPlan, Mortgage, RatePeriod, ResolvedPeriod};
pub use types::*;

/// Standard result type for all mortgage operations
pub type MortgageResult<T> = Result<T, MortgageError>;
