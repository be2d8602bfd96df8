use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Rent,
    PaintingFee,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Cash,
    BankTransfer,
    CreditCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub payment_type: PaymentType,
    pub reference_month: NaiveDate,
    pub amount: Money,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub method: Option<PaymentMethod>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs for the computed-on-read late fee. Never stored; `amount` is
/// never mutated to reflect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateFee {
    pub penalty: Money,
    pub interest_per_day: Money,
    pub days_overdue: i64,
}

impl LateFee {
    pub fn total(&self, amount: Money) -> Money {
        let mut total = amount + self.penalty;
        if self.days_overdue > 0 {
            let mut accrued = Money::ZERO;
            for _ in 0..self.days_overdue {
                accrued += self.interest_per_day;
            }
            total += accrued;
        }
        total
    }
}

impl Payment {
    pub(crate) fn new(
        lease_id: Uuid,
        payment_type: PaymentType,
        reference_month: NaiveDate,
        amount: Money,
        due_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            lease_id,
            payment_type,
            reference_month,
            amount,
            status: PaymentStatus::Pending,
            due_date,
            payment_date: None,
            method: None,
            proof_url: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_be_paid(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Overdue)
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        (today - self.due_date).num_days().max(0)
    }

    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }

    pub fn is_overdue_as_of(&self, today: NaiveDate) -> bool {
        matches!(self.status, PaymentStatus::Pending) && self.due_date < today
    }

    pub fn mark_paid(&mut self, payment_date: NaiveDate, method: PaymentMethod) -> Result<(), AppError> {
        if !self.can_be_paid() {
            return Err(AppError::PaymentNotPayable(format!(
                "payment {} is not in a payable state",
                self.id
            )));
        }
        if payment_date > Utc::now().date_naive() {
            return Err(AppError::validation("paymentDate must not be in the future"));
        }
        self.status = PaymentStatus::Paid;
        self.payment_date = Some(payment_date);
        self.method = Some(method);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        if !matches!(self.status, PaymentStatus::Pending | PaymentStatus::Overdue) {
            return Err(AppError::PaymentNotPayable(format!(
                "payment {} can only be cancelled from pending/overdue",
                self.id
            )));
        }
        self.status = PaymentStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Used by the overdue sweep. Returns `true` if the status actually
    /// changed, so callers can count affected rows for idempotence.
    pub fn mark_overdue_if_due(&mut self, today: NaiveDate) -> bool {
        if self.is_overdue_as_of(today) {
            self.status = PaymentStatus::Overdue;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// `penalty = amount * 0.02`; `interestPerDay = (amount * 0.01) / 30`.
    /// Only meaningful while `status == Overdue`; callers are expected to
    /// check that themselves since this is a pure computation.
    pub fn late_fee(&self, today: NaiveDate) -> LateFee {
        let penalty = self.amount.percentage_of(dec!(0.02));
        let interest_per_day = Money::from_decimal(self.amount.as_decimal() * dec!(0.01) / dec!(30));
        LateFee {
            penalty,
            interest_per_day,
            days_overdue: self.days_overdue(today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(due_date: NaiveDate) -> Payment {
        Payment::new(
            Uuid::new_v4(),
            PaymentType::Rent,
            due_date,
            "1000.00".parse().unwrap(),
            due_date,
        )
    }

    #[test]
    fn mark_paid_requires_payable_status() {
        let mut p = payment(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap());
        p.cancel().unwrap();
        assert!(p.mark_paid(Utc::now().date_naive(), PaymentMethod::Pix).is_err());
    }

    #[test]
    fn mark_paid_rejects_future_payment_date() {
        let mut p = payment(NaiveDate::from_ymd_opt(2020, 2, 5).unwrap());
        let future = Utc::now().date_naive() + chrono::Duration::days(5);
        assert!(p.mark_paid(future, PaymentMethod::Cash).is_err());
    }

    #[test]
    fn mark_overdue_if_due_is_idempotent() {
        let past_due = Utc::now().date_naive() - chrono::Duration::days(1);
        let mut p = payment(past_due);
        let today = Utc::now().date_naive();
        assert!(p.mark_overdue_if_due(today));
        assert!(!p.mark_overdue_if_due(today));
    }

    #[test]
    fn late_fee_computation_does_not_mutate_amount() {
        let past_due = Utc::now().date_naive() - chrono::Duration::days(10);
        let mut p = payment(past_due);
        let today = Utc::now().date_naive();
        p.mark_overdue_if_due(today);
        let fee = p.late_fee(today);
        assert_eq!(fee.penalty, "20.00".parse().unwrap());
        assert_eq!(fee.days_overdue, 10);
        assert_eq!(p.amount, "1000.00".parse().unwrap());
        assert!(fee.total(p.amount) > p.amount);
    }
}
