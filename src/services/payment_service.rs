//! Marks payments paid/cancelled, exposes the overdue sweep, and
//! surfaces the inputs to the computed-on-read late fee.

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::payment::LateFee;
use crate::domain::{Payment, PaymentMethod};
use crate::error::AppResult;
use crate::repository::{PaymentRepository, PaymentStats};

pub struct PaymentService<R> {
    repo: R,
}

impl<R> PaymentService<R>
where
    R: PaymentRepository + Clone + Send + Sync + 'static,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get_by_id(&self, payment_id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        self.repo.get_by_id(payment_id, cancel).await
    }

    pub async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        self.repo.list_by_lease(lease_id, cancel).await
    }

    pub async fn get_overdue(&self, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        self.repo.get_overdue(cancel).await
    }

    pub async fn get_upcoming(&self, days_ahead: i64, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        self.repo.get_upcoming(days_ahead, cancel).await
    }

    pub async fn stats_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<PaymentStats> {
        self.repo.stats_by_lease(lease_id, cancel).await
    }

    /// When the payment is a painting-fee installment, the owning lease's
    /// `paintingFeePaid` is incremented in the same transaction by the
    /// repository implementation.
    pub async fn mark_paid(
        &self,
        payment_id: Uuid,
        payment_date: NaiveDate,
        method: PaymentMethod,
        cancel: CancellationToken,
    ) -> AppResult<Payment> {
        let payment = self.repo.mark_paid(payment_id, payment_date, method, cancel).await?;
        tracing::info!(
            payment_id = %payment.id,
            lease_id = %payment.lease_id,
            amount = %payment.amount,
            method = ?method,
            "payment marked paid"
        );
        Ok(payment)
    }

    /// Permitted only from {pending, overdue}.
    pub async fn cancel(&self, payment_id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        let payment = self.repo.cancel(payment_id, cancel).await?;
        tracing::info!(payment_id = %payment.id, "payment cancelled");
        Ok(payment)
    }

    /// Idempotent: the second call in a row changes no further rows.
    pub async fn sweep_overdue(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        let count = self.repo.sweep_overdue(today, cancel).await?;
        if count > 0 {
            tracing::info!(count, "payments swept to overdue");
        }
        Ok(count)
    }

    /// Computes the late-fee inputs for an overdue payment without
    /// mutating its stored `amount`. Late fees are never posted
    /// automatically; this is a read-only projection.
    pub async fn late_fee(&self, payment_id: Uuid, today: NaiveDate, cancel: CancellationToken) -> AppResult<LateFee> {
        let payment = self.repo.get_by_id(payment_id, cancel).await?;
        Ok(payment.late_fee(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::domain::lease::NewLeaseParams;
    use crate::domain::{Lease, Tenant, Unit};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{LeaseRepository, TenantRepository, UnitRepository};

    fn no_cancel() -> CancellationToken {
        CancellationToken::new()
    }

    async fn seed_lease(repo: &MemoryStore) -> Lease {
        let unit = Unit::new("101", 1, "1000.00".parse().unwrap(), "1000.00".parse().unwrap(), false, None).unwrap();
        let unit_id = unit.id;
        UnitRepository::create(repo, unit, no_cancel()).await.unwrap();
        let tenant = Tenant::new("Jane Doe", "123.456.789-01", "555-0100", None, None, None).unwrap();
        let tenant_id = tenant.id;
        TenantRepository::create(repo, tenant, no_cancel()).await.unwrap();

        let lease = Lease::new(NewLeaseParams {
            unit_id,
            tenant_id,
            signed_date: chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            payment_due_day: 5,
            monthly_rent: "1000.00".parse().unwrap(),
            painting_fee_total: "250.00".parse().unwrap(),
            painting_fee_installments: 2,
            parent_lease_id: None,
            generation: 1,
        })
        .unwrap();
        let payments = crate::domain::payment_schedule::generate(&lease);
        let (lease, _) = LeaseRepository::create_with_payments(repo, lease, payments, no_cancel()).await.unwrap();
        lease
    }

    #[tokio::test]
    async fn scenario_3_mark_painting_fee_paid_reconciles() {
        let repo = MemoryStore::new();
        let lease = seed_lease(&repo).await;
        let payments = LeaseRepository::get_by_id(&repo, lease.id, no_cancel()).await;
        assert!(payments.is_ok());

        let fee_payment = PaymentRepository::list_by_lease(&repo, lease.id, no_cancel())
            .await
            .unwrap()
            .into_iter()
            .find(|p| matches!(p.payment_type, crate::domain::payment::PaymentType::PaintingFee))
            .unwrap();

        let service = PaymentService::new(repo.clone());
        service
            .mark_paid(fee_payment.id, chrono::Utc::now().date_naive(), PaymentMethod::Pix, no_cancel())
            .await
            .unwrap();

        let lease_after = LeaseRepository::get_by_id(&repo, lease.id, no_cancel()).await.unwrap();
        assert_eq!(lease_after.painting_fee_paid, "125.00".parse().unwrap());
        assert_eq!(lease_after.remaining_painting_fee(), "125.00".parse().unwrap());
    }

    #[tokio::test]
    async fn mark_paid_fails_once_cancelled() {
        let repo = MemoryStore::new();
        let lease = seed_lease(&repo).await;
        let payment = PaymentRepository::list_by_lease(&repo, lease.id, no_cancel()).await.unwrap()[0].clone();
        let service = PaymentService::new(repo.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = service
            .mark_paid(payment.id, chrono::Utc::now().date_naive(), PaymentMethod::Cash, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Cancelled));
    }

    #[tokio::test]
    async fn scenario_5_overdue_sweep_is_idempotent() {
        let repo = MemoryStore::new();
        let lease = seed_lease(&repo).await;
        let mut payments = PaymentRepository::list_by_lease(&repo, lease.id, no_cancel()).await.unwrap();
        payments.sort_by_key(|p| p.due_date);
        let target = payments[0].clone();

        // Force the payment's due date into the past isn't possible through
        // the public API (it's computed by the generator); exercise the
        // sweep against the actual schedule instead by sweeping with a
        // "today" far enough past every due date.
        let far_future = target.due_date + chrono::Duration::days(400);
        let service = PaymentService::new(repo.clone());
        let first = service.sweep_overdue(far_future, no_cancel()).await.unwrap();
        let second = service.sweep_overdue(far_future, no_cancel()).await.unwrap();
        assert!(first > 0);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn cancel_is_rejected_once_paid() {
        let repo = MemoryStore::new();
        let lease = seed_lease(&repo).await;
        let payment = PaymentRepository::list_by_lease(&repo, lease.id, no_cancel()).await.unwrap()[0].clone();
        let service = PaymentService::new(repo.clone());
        service
            .mark_paid(payment.id, chrono::Utc::now().date_naive(), PaymentMethod::Cash, no_cancel())
            .await
            .unwrap();
        assert!(service.cancel(payment.id, no_cancel()).await.is_err());
    }

    #[tokio::test]
    async fn late_fee_matches_spec_formula() {
        let repo = MemoryStore::new();
        let lease = seed_lease(&repo).await;
        let payment = PaymentRepository::list_by_lease(&repo, lease.id, no_cancel()).await.unwrap()[0].clone();
        let service = PaymentService::new(repo.clone());
        let today = payment.due_date + chrono::Duration::days(10);
        let fee = service.late_fee(payment.id, today, no_cancel()).await.unwrap();
        assert_eq!(fee.penalty, Money::from_decimal(payment.amount.as_decimal() * rust_decimal_macros::dec!(0.02)));
        assert_eq!(fee.days_overdue, 10);
    }
}
