use thiserror::Error;

use crate::types::Months;

/// Semantic errors in a loan plan.
///
/// These describe well-typed input that cannot form a valid mortgage and are
/// meant to be shown to whoever supplied the plan. Contract violations by the
/// calling code (zero term, empty plan, out-of-range month lookups) panic
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MortgageError {
    #[error("only the last rate period can have unspecified length (period {index} of {count})")]
    UnspecifiedPeriodNotLast { index: usize, count: usize },

    #[error("rate periods exceed term: {months} months scheduled against a {term}-month term")]
    PeriodsExceedTerm { months: Months, term: Months },

    #[error("rate periods do not add up to loan term: {months} of {term} months scheduled")]
    PeriodsDoNotAddUp { months: Months, term: Months },

    #[error("unspecified rate period has no remaining term: {term} months already scheduled")]
    EmptyTrailingPeriod { term: Months },
}
