//! Adjustable-rate (multi-period) mortgages.
//!
//! A loan plan is a principal, a term in months and an ordered list of rate
//! periods. Each period is amortized as a fresh fixed-rate loan over the
//! *remaining* term and balance, so the level payment is recomputed whenever
//! the rate changes; only the first `months` payments of each such loan are
//! kept. The resulting slices are concatenated into one schedule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageError;
use crate::fixed_rate::{FixedRateLoan, PaymentRecord, RESIDUAL_TOLERANCE};
use crate::types::{with_metadata, ComputationOutput, Money, Months, Rate};
use crate::MortgageResult;

/// One interest-rate period of a loan plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePeriod {
    /// Annual rate (0.05 = 5%).
    pub rate: Rate,
    /// Length in months. `None` runs to the end of the term and is only
    /// allowed on the last period.
    #[serde(default)]
    pub period: Option<Months>,
}

impl RatePeriod {
    pub fn fixed(rate: Rate, months: Months) -> Self {
        Self {
            rate,
            period: Some(months),
        }
    }

    /// A period lasting for whatever is left of the term.
    pub fn remainder(rate: Rate) -> Self {
        Self { rate, period: None }
    }
}

/// Input describing a mortgage to amortize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPlan {
    pub principal: Money,
    pub term: Months,
    pub periods: Vec<RatePeriod>,
}

/// A rate period with its length resolved against the loan term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeriod {
    pub rate: Rate,
    pub months: Months,
}

/// A fully amortized mortgage. Immutable once built.
#[derive(Debug, Clone)]
pub struct Mortgage {
    principal: Money,
    term: Months,
    periods: Vec<ResolvedPeriod>,
    schedule: Vec<PaymentRecord>,
    total_interest: Money,
    sub_loans: Vec<FixedRateLoan>,
}

impl Mortgage {
    /// Validate a rate plan against `term` and build the mortgage.
    ///
    /// Returns an error when the periods do not tile the term exactly or when
    /// an open-ended period is not last.
    ///
    /// # Panics
    ///
    /// Panics if `principal` is not positive, `term` is zero, `periods` is
    /// empty or a period has an explicit length of zero.
    pub fn create(
        principal: Money,
        term: Months,
        periods: &[RatePeriod],
    ) -> MortgageResult<Self> {
        assert!(
            principal > Decimal::ZERO,
            "principal must be positive, got {principal}"
        );
        assert!(term > 0, "term must be at least one month");
        assert!(!periods.is_empty(), "at least one rate period is required");

        let resolved = resolve_periods(term, periods)?;
        Ok(Self::from_resolved(principal, term, resolved))
    }

    fn from_resolved(principal: Money, term: Months, periods: Vec<ResolvedPeriod>) -> Self {
        let mut mortgage = Self {
            principal,
            term,
            periods,
            schedule: Vec::with_capacity(term as usize),
            total_interest: Decimal::ZERO,
            sub_loans: Vec::new(),
        };
        mortgage.init_schedule();
        mortgage
    }

    fn init_schedule(&mut self) {
        let mut principal_left = self.principal;
        let mut term_left = self.term;

        for period in &self.periods {
            let loan = FixedRateLoan::new(principal_left, term_left, period.rate);
            principal_left = loan.principal_left_after_month(period.months);
            term_left -= period.months;
            self.schedule.extend(loan.schedule_prefix(period.months));
            self.sub_loans.push(loan);
        }

        assert_eq!(term_left, 0, "rate periods left {term_left} months unscheduled");
        assert!(
            principal_left.abs() < RESIDUAL_TOLERANCE * self.principal,
            "{principal_left} left unpaid on {} at the end of the term",
            self.principal
        );

        self.total_interest = self.schedule.iter().map(|r| r.interest).sum();
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn term(&self) -> Months {
        self.term
    }

    /// Sum of the interest portion of every payment.
    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    /// Sum of every payment.
    pub fn total_paid(&self) -> Money {
        self.schedule.iter().map(|r| r.total).sum()
    }

    /// Unpaid principal after the final payment, left over from cent rounding.
    pub fn residual_principal(&self) -> Money {
        self.schedule
            .last()
            .map(|r| r.pafter)
            .unwrap_or(self.principal)
    }

    /// Independent copy of the full payment schedule, one record per month.
    pub fn schedule(&self) -> Vec<PaymentRecord> {
        self.schedule.clone()
    }

    /// Copy of the rate plan with every period length resolved.
    pub fn periods(&self) -> Vec<ResolvedPeriod> {
        self.periods.clone()
    }

    /// The fixed-rate loans each rate period was cut from, in plan order.
    /// Each one runs over the full remaining term, past its period's end.
    pub fn sub_loans(&self) -> &[FixedRateLoan] {
        &self.sub_loans
    }
}

/// Build a mortgage from a [`LoanPlan`].
///
/// # Panics
///
/// Under the same conditions as [`Mortgage::create`].
pub fn create_mortgage(plan: &LoanPlan) -> MortgageResult<Mortgage> {
    Mortgage::create(plan.principal, plan.term, &plan.periods)
}

/// Resolve every period length, checking the plan tiles `term` exactly.
fn resolve_periods(term: Months, periods: &[RatePeriod]) -> MortgageResult<Vec<ResolvedPeriod>> {
    let count = periods.len();
    let mut resolved = Vec::with_capacity(count);
    let mut term_so_far: Months = 0;

    for (i, period) in periods.iter().enumerate() {
        let months = match period.period {
            None if i + 1 != count => {
                return Err(MortgageError::UnspecifiedPeriodNotLast {
                    index: i + 1,
                    count,
                });
            }
            None => {
                let rest = term - term_so_far;
                if rest == 0 {
                    return Err(MortgageError::EmptyTrailingPeriod { term });
                }
                rest
            }
            Some(months) => {
                assert!(months > 0, "rate period {} has zero length", i + 1);
                let total = term_so_far.saturating_add(months);
                if total > term {
                    return Err(MortgageError::PeriodsExceedTerm {
                        months: total,
                        term,
                    });
                }
                months
            }
        };

        term_so_far += months;
        resolved.push(ResolvedPeriod {
            rate: period.rate,
            months,
        });
    }

    if term_so_far != term {
        return Err(MortgageError::PeriodsDoNotAddUp {
            months: term_so_far,
            term,
        });
    }

    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Level payment in force during one rate period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodPayment {
    pub rate: Rate,
    pub months: Months,
    pub payment: Money,
}

/// Serializable summary of an amortized mortgage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub principal: Money,
    pub term: Months,
    pub payments: Vec<PeriodPayment>,
    pub total_interest: Money,
    pub total_paid: Money,
    pub residual_principal: Money,
    pub schedule: Vec<PaymentRecord>,
}

impl From<&Mortgage> for AmortizationOutput {
    fn from(m: &Mortgage) -> Self {
        let payments = m
            .periods
            .iter()
            .zip(&m.sub_loans)
            .map(|(p, loan)| PeriodPayment {
                rate: p.rate,
                months: p.months,
                payment: loan.payment(),
            })
            .collect();

        AmortizationOutput {
            principal: m.principal(),
            term: m.term(),
            payments,
            total_interest: m.total_interest(),
            total_paid: m.total_paid(),
            residual_principal: m.residual_principal(),
            schedule: m.schedule(),
        }
    }
}

/// Amortize a loan plan and wrap the result with methodology and warnings.
///
/// # Panics
///
/// Under the same conditions as [`Mortgage::create`].
pub fn amortize(plan: &LoanPlan) -> MortgageResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mortgage = create_mortgage(plan)?;

    for (i, p) in mortgage.periods.iter().enumerate() {
        if p.rate.is_zero() {
            warnings.push(format!(
                "Rate period {}: zero interest rate amortized linearly over the remaining term",
                i + 1
            ));
        }
    }

    let residual = mortgage.residual_principal();
    if !residual.is_zero() {
        warnings.push(format!(
            "Cent rounding leaves {residual} of principal after the final payment"
        ));
    }

    let output = AmortizationOutput::from(&mortgage);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Period Mortgage Amortization",
        &serde_json::json!({
            "principal": plan.principal.to_string(),
            "term_months": plan.term,
            "periods": mortgage.periods,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn arm_periods() -> Vec<RatePeriod> {
        vec![
            RatePeriod::fixed(dec!(0.04), 60),
            RatePeriod::remainder(dec!(0.06)),
        ]
    }

    #[test]
    fn test_resolve_trailing_remainder() {
        let resolved = resolve_periods(360, &arm_periods()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].months, 60);
        assert_eq!(resolved[1].months, 300);
        assert_eq!(resolved[1].rate, dec!(0.06));
    }

    #[test]
    fn test_resolve_all_fixed() {
        let periods = vec![
            RatePeriod::fixed(dec!(0.03), 12),
            RatePeriod::fixed(dec!(0.05), 12),
        ];
        let resolved = resolve_periods(24, &periods).unwrap();
        assert_eq!(resolved.iter().map(|p| p.months).sum::<Months>(), 24);
    }

    #[test]
    fn test_resolve_single_remainder_covers_term() {
        let resolved = resolve_periods(180, &[RatePeriod::remainder(dec!(0.05))]).unwrap();
        assert_eq!(resolved[0].months, 180);
    }

    #[test]
    fn test_resolve_unspecified_not_last() {
        let periods = vec![
            RatePeriod::remainder(dec!(0.04)),
            RatePeriod::fixed(dec!(0.06), 60),
        ];
        let err = resolve_periods(360, &periods).unwrap_err();
        assert_eq!(
            err,
            MortgageError::UnspecifiedPeriodNotLast { index: 1, count: 2 }
        );
    }

    #[test]
    fn test_resolve_exceeds_term() {
        let periods = vec![
            RatePeriod::fixed(dec!(0.04), 300),
            RatePeriod::fixed(dec!(0.06), 100),
        ];
        let err = resolve_periods(360, &periods).unwrap_err();
        assert_eq!(
            err,
            MortgageError::PeriodsExceedTerm {
                months: 400,
                term: 360
            }
        );
    }

    #[test]
    fn test_resolve_short_of_term() {
        let err = resolve_periods(360, &[RatePeriod::fixed(dec!(0.04), 120)]).unwrap_err();
        assert_eq!(
            err,
            MortgageError::PeriodsDoNotAddUp {
                months: 120,
                term: 360
            }
        );
    }

    #[test]
    fn test_resolve_empty_trailing_period() {
        let periods = vec![
            RatePeriod::fixed(dec!(0.04), 360),
            RatePeriod::remainder(dec!(0.06)),
        ];
        let err = resolve_periods(360, &periods).unwrap_err();
        assert_eq!(err, MortgageError::EmptyTrailingPeriod { term: 360 });
    }

    #[test]
    #[should_panic(expected = "rate period 2 has zero length")]
    fn test_resolve_zero_length_panics() {
        let periods = vec![
            RatePeriod::fixed(dec!(0.04), 12),
            RatePeriod::fixed(dec!(0.06), 0),
        ];
        let _ = resolve_periods(24, &periods);
    }

    #[test]
    fn test_sub_loans_retained_per_period() {
        let m = Mortgage::create(dec!(300000), 360, &arm_periods()).unwrap();
        let subs = m.sub_loans();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].term(), 360);
        assert_eq!(subs[1].term(), 300);
        assert_eq!(subs[1].principal(), subs[0].principal_left_after_month(60));
    }

    #[test]
    fn test_total_interest_matches_schedule() {
        let m = Mortgage::create(dec!(300000), 360, &arm_periods()).unwrap();
        let sum: Decimal = m.schedule().iter().map(|r| r.interest).sum();
        assert_eq!(m.total_interest(), sum);
        assert_eq!(m.total_paid(), dec!(300000) - m.residual_principal() + sum);
    }

    #[test]
    fn test_amortize_envelope() {
        let plan = LoanPlan {
            principal: dec!(300000),
            term: 360,
            periods: arm_periods(),
        };
        let out = amortize(&plan).unwrap();
        assert_eq!(out.methodology, "Multi-Period Mortgage Amortization");
        assert_eq!(out.result.schedule.len(), 360);
        assert_eq!(out.result.payments.len(), 2);
        assert_eq!(out.result.payments[1].months, 300);
        assert_eq!(out.assumptions["term_months"], 360);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_amortize_warns_on_zero_rate() {
        let plan = LoanPlan {
            principal: dec!(12000),
            term: 12,
            periods: vec![RatePeriod::remainder(Decimal::ZERO)],
        };
        let out = amortize(&plan).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("zero interest rate")));
        assert_eq!(out.result.residual_principal, Decimal::ZERO);
        assert_eq!(out.result.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_amortize_propagates_plan_errors() {
        let plan = LoanPlan {
            principal: dec!(100000),
            term: 120,
            periods: vec![RatePeriod::fixed(dec!(0.05), 60)],
        };
        assert!(matches!(
            amortize(&plan),
            Err(MortgageError::PeriodsDoNotAddUp { .. })
        ));
    }
}
