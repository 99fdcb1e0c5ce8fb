//! Level-payment amortization for a single constant interest rate.
//!
//! A [`FixedRateLoan`] computes the standard amortizing monthly payment for a
//! principal, term and annual rate, then walks the loan month by month to
//! split each payment into interest and principal. Interest and the payment
//! itself are rounded to cents; principal balances carry whatever drift that
//! rounding leaves behind.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{round_cents, Money, Months, Rate};

/// Largest final balance, as a fraction of the original principal, that cent
/// rounding is allowed to leave unpaid.
pub(crate) const RESIDUAL_TOLERANCE: Decimal = dec!(0.01);

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// One monthly payment in an amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Total payment for the month.
    pub total: Money,
    /// Interest portion of the payment.
    pub interest: Money,
    /// Principal portion of the payment.
    pub principal: Money,
    /// Monthly interest rate (annual rate / 12).
    pub mrate: Rate,
    /// Unpaid principal before the payment.
    pub pbefore: Money,
    /// Unpaid principal after the payment.
    pub pafter: Money,
}

/// A loan amortized at one rate for its whole term.
#[derive(Debug, Clone, Serialize)]
pub struct FixedRateLoan {
    principal: Money,
    term: Months,
    rate: Rate,
    monthly_rate: Rate,
    payment: Money,
    schedule: Vec<PaymentRecord>,
}

impl FixedRateLoan {
    /// Build the full amortization schedule for `principal` over `term`
    /// months at annual `rate`.
    ///
    /// A zero rate amortizes linearly: each payment is `principal / term`
    /// rounded to cents.
    ///
    /// # Panics
    ///
    /// Panics if `principal` is not positive, if `term` is zero, or if cent
    /// rounding leaves more than 1% of the principal unpaid after the last
    /// payment.
    pub fn new(principal: Money, term: Months, rate: Rate) -> Self {
        assert!(
            principal > Decimal::ZERO,
            "principal must be positive, got {principal}"
        );
        assert!(term > 0, "term must be at least one month");

        let monthly_rate = rate / MONTHS_PER_YEAR;
        let payment = level_payment(principal, term, monthly_rate);

        let mut schedule = Vec::with_capacity(term as usize);
        let mut pleft = principal;
        for _ in 0..term {
            let interest = round_cents(monthly_rate * pleft);
            let paid = payment - interest;
            schedule.push(PaymentRecord {
                total: payment,
                interest,
                principal: paid,
                mrate: monthly_rate,
                pbefore: pleft,
                pafter: pleft - paid,
            });
            pleft -= paid;
        }

        assert!(
            pleft.abs() / principal < RESIDUAL_TOLERANCE,
            "{pleft} left unpaid after {term} months on {principal} at {rate}"
        );

        Self {
            principal,
            term,
            rate,
            monthly_rate,
            payment,
            schedule,
        }
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn term(&self) -> Months {
        self.term
    }

    /// Annual rate.
    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn monthly_rate(&self) -> Rate {
        self.monthly_rate
    }

    /// Level monthly payment, rounded to cents.
    pub fn payment(&self) -> Money {
        self.payment
    }

    /// Unpaid principal after month `month`; month 0 is the original principal.
    ///
    /// # Panics
    ///
    /// Panics if `month` is past the end of the term.
    pub fn principal_left_after_month(&self, month: Months) -> Money {
        assert!(
            month <= self.term,
            "month {month} is outside a {}-month term",
            self.term
        );
        match month {
            0 => self.principal,
            m => self.schedule[m as usize - 1].pafter,
        }
    }

    /// Independent copy of the full schedule.
    pub fn schedule(&self) -> Vec<PaymentRecord> {
        self.schedule.clone()
    }

    /// Copy of the first `months` payments.
    ///
    /// # Panics
    ///
    /// Panics if `months` is past the end of the term.
    pub fn schedule_prefix(&self, months: Months) -> Vec<PaymentRecord> {
        assert!(
            months <= self.term,
            "cannot take {months} payments from a {}-month term",
            self.term
        );
        self.schedule[..months as usize].to_vec()
    }
}

/// Standard amortizing payment `r * P / (1 - (1 + r)^-n)`, rounded to cents.
fn level_payment(principal: Money, term: Months, monthly_rate: Rate) -> Money {
    if monthly_rate.is_zero() {
        return round_cents(principal / Decimal::from(term));
    }

    // (1 + r)^n / ((1 + r)^n - 1) == 1 / (1 - (1 + r)^-n)
    let growth = (Decimal::ONE + monthly_rate).powu(u64::from(term));
    round_cents(monthly_rate * principal * growth / (growth - Decimal::ONE))
}
