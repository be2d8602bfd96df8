use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::domain::calendar::add_months_clamped;
use crate::error::AppError;

pub const LEASE_TERM_MONTHS: u32 = 6;
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Active,
    ExpiringSoon,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub signed_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_due_day: u32,
    pub monthly_rent: Money,
    pub painting_fee_total: Money,
    pub painting_fee_installments: u32,
    pub painting_fee_paid: Money,
    pub status: LeaseStatus,
    pub parent_lease_id: Option<Uuid>,
    pub generation: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewLeaseParams {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub signed_date: NaiveDate,
    pub start_date: NaiveDate,
    pub payment_due_day: u32,
    pub monthly_rent: Money,
    pub painting_fee_total: Money,
    pub painting_fee_installments: u32,
    pub parent_lease_id: Option<Uuid>,
    pub generation: u32,
}

fn validate_common(
    payment_due_day: u32,
    monthly_rent: Money,
    painting_fee_total: Money,
    painting_fee_installments: u32,
) -> Result<(), AppError> {
    if !(1..=31).contains(&payment_due_day) {
        return Err(AppError::validation("paymentDueDay must be in [1, 31]"));
    }
    if !monthly_rent.is_positive() {
        return Err(AppError::validation("monthlyRent must be > 0"));
    }
    if painting_fee_total.is_negative() {
        return Err(AppError::validation("paintingFeeTotal must be >= 0"));
    }
    if !(1..=4).contains(&painting_fee_installments) {
        return Err(AppError::validation(
            "paintingFeeInstallments must be in {1,2,3,4}",
        ));
    }
    Ok(())
}

impl Lease {
    pub fn new(params: NewLeaseParams) -> Result<Self, AppError> {
        validate_common(
            params.payment_due_day,
            params.monthly_rent,
            params.painting_fee_total,
            params.painting_fee_installments,
        )?;
        if params.signed_date > params.start_date {
            return Err(AppError::validation("signedDate must be <= startDate"));
        }
        if params.generation == 0 {
            return Err(AppError::validation("generation must be >= 1"));
        }
        let end_date = add_months_clamped(params.start_date, LEASE_TERM_MONTHS);
        if params.start_date >= end_date {
            return Err(AppError::validation("startDate must be < endDate"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            unit_id: params.unit_id,
            tenant_id: params.tenant_id,
            signed_date: params.signed_date,
            start_date: params.start_date,
            end_date,
            payment_due_day: params.payment_due_day,
            monthly_rent: params.monthly_rent,
            painting_fee_total: params.painting_fee_total,
            painting_fee_installments: params.painting_fee_installments,
            painting_fee_paid: Money::ZERO,
            status: LeaseStatus::Active,
            parent_lease_id: params.parent_lease_id,
            generation: params.generation,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expiring_soon(&self, today: NaiveDate) -> bool {
        let days_until_end = (self.end_date - today).num_days();
        days_until_end > 0 && days_until_end <= EXPIRING_SOON_WINDOW_DAYS
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }

    pub fn can_be_renewed(&self) -> bool {
        matches!(self.status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
    }

    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }

    pub fn remaining_painting_fee(&self) -> Money {
        self.painting_fee_total - self.painting_fee_paid
    }

    pub fn next_generation_applies_annual_adjustment(&self) -> bool {
        should_apply_annual_adjustment(self.generation + 1)
    }

    pub fn promote_to_expiring_soon(&mut self) {
        self.status = LeaseStatus::ExpiringSoon;
        self.updated_at = Utc::now();
    }

    pub fn mark_expired(&mut self) {
        self.status = LeaseStatus::Expired;
        self.updated_at = Utc::now();
    }

    pub fn mark_cancelled(&mut self) {
        self.status = LeaseStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// `delta > 0` and the running total never exceeds `paintingFeeTotal`.
    pub fn apply_painting_fee_payment(&mut self, delta: Money) -> Result<(), AppError> {
        if !delta.is_positive() {
            return Err(AppError::validation("painting fee delta must be > 0"));
        }
        let new_total = self.painting_fee_paid + delta;
        if new_total > self.painting_fee_total {
            return Err(AppError::validation(
                "painting fee paid would exceed paintingFeeTotal",
            ));
        }
        self.painting_fee_paid = new_total;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// `generation > 1 ∧ generation mod 2 = 0`. Fixed 6-month terms are
/// assumed; if terms ever vary this should be rebased on cumulative
/// months instead.
pub fn should_apply_annual_adjustment(generation: u32) -> bool {
    generation > 1 && generation % 2 == 0
}
