//! Orchestrates lease creation, the atomic renewal protocol, cancellation,
//! painting-fee reconciliation, and the two lease-side sweeps.

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decimal::Money;
use crate::domain::lease::{should_apply_annual_adjustment, NewLeaseParams};
use crate::domain::rent_adjustment::RentAdjustment;
use crate::domain::unit::UnitStatus;
use crate::domain::{payment_schedule, Lease, Payment};
use crate::error::{AppError, AppResult};
use crate::repository::{LeaseFilter, LeaseRepository, TenantRepository, UnitRepository};

pub struct CreateLeaseInput {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub signed_date: NaiveDate,
    pub start_date: NaiveDate,
    pub payment_due_day: u32,
    pub monthly_rent: Money,
    pub painting_fee_total: Money,
    pub painting_fee_installments: u32,
}

pub struct RenewLeaseInput {
    pub lease_id: Uuid,
    pub new_monthly_rent: Option<Money>,
    pub painting_fee_total: Money,
    pub painting_fee_installments: u32,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    pub promoted_expiring_soon: u64,
    pub auto_renewed: u64,
}

pub struct LeaseService<R> {
    repo: R,
}

impl<R> LeaseService<R>
where
    R: LeaseRepository + UnitRepository + TenantRepository + Clone + Send + Sync + 'static,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateLeaseInput, cancel: CancellationToken) -> AppResult<(Lease, Vec<Payment>)> {
        if input.signed_date > input.start_date {
            return Err(AppError::validation("signedDate must be <= startDate"));
        }

        let unit = UnitRepository::get_by_id(&self.repo, input.unit_id, cancel.clone()).await?;
        if !matches!(unit.status, UnitStatus::Available) {
            return Err(AppError::UnitUnavailable(format!(
                "unit {} is not available",
                input.unit_id
            )));
        }

        TenantRepository::get_by_id(&self.repo, input.tenant_id, cancel.clone()).await?;
        if self
            .repo
            .has_active_or_expiring_for_tenant(input.tenant_id, cancel.clone())
            .await?
        {
            return Err(AppError::TenantHasActiveLease(format!(
                "tenant {} already has an active lease",
                input.tenant_id
            )));
        }

        let lease = Lease::new(NewLeaseParams {
            unit_id: input.unit_id,
            tenant_id: input.tenant_id,
            signed_date: input.signed_date,
            start_date: input.start_date,
            payment_due_day: input.payment_due_day,
            monthly_rent: input.monthly_rent,
            painting_fee_total: input.painting_fee_total,
            painting_fee_installments: input.painting_fee_installments,
            parent_lease_id: None,
            generation: 1,
        })?;
        let payments = payment_schedule::generate(&lease);

        let (lease, payments) = self.repo.create_with_payments(lease, payments, cancel).await?;
        tracing::info!(
            lease_id = %lease.id,
            unit_id = %lease.unit_id,
            tenant_id = %lease.tenant_id,
            payment_count = payments.len(),
            "lease created"
        );
        Ok((lease, payments))
    }

    pub async fn renew(&self, input: RenewLeaseInput, cancel: CancellationToken) -> AppResult<Lease> {
        let old_lease = LeaseRepository::get_by_id(&self.repo, input.lease_id, cancel.clone()).await?;
        if !old_lease.can_be_renewed() {
            return Err(AppError::LeaseNotRenewable(format!(
                "lease {} cannot be renewed from status {:?}",
                old_lease.id, old_lease.status
            )));
        }

        let new_monthly_rent = input.new_monthly_rent.unwrap_or(old_lease.monthly_rent);
        let new_generation = old_lease.generation + 1;

        let new_lease = Lease::new(NewLeaseParams {
            unit_id: old_lease.unit_id,
            tenant_id: old_lease.tenant_id,
            signed_date: old_lease.end_date,
            start_date: old_lease.end_date,
            payment_due_day: old_lease.payment_due_day,
            monthly_rent: new_monthly_rent,
            painting_fee_total: input.painting_fee_total,
            painting_fee_installments: input.painting_fee_installments,
            parent_lease_id: Some(old_lease.id),
            generation: new_generation,
        })?;
        let new_payments = payment_schedule::generate(&new_lease);

        let adjustment = if new_monthly_rent != old_lease.monthly_rent {
            Some(RentAdjustment::new(
                new_lease.id,
                old_lease.monthly_rent,
                new_monthly_rent,
                input.reason,
                input.actor,
            ))
        } else {
            None
        };

        let (_, new_lease, _) = self
            .repo
            .renew(old_lease.id, new_lease, new_payments, adjustment, cancel)
            .await?;
        tracing::info!(
            old_lease_id = %old_lease.id,
            new_lease_id = %new_lease.id,
            generation = new_lease.generation,
            "lease renewed"
        );
        Ok(new_lease)
    }

    pub async fn cancel(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<()> {
        let lease = LeaseRepository::get_by_id(&self.repo, lease_id, cancel.clone()).await?;
        if matches!(
            lease.status,
            crate::domain::LeaseStatus::Cancelled | crate::domain::LeaseStatus::Expired
        ) {
            return Err(AppError::LeaseNotRenewable(format!(
                "lease {lease_id} is already terminal"
            )));
        }
        let (lease, cancelled_payments) = self.repo.cancel(lease_id, cancel).await?;
        tracing::info!(
            lease_id = %lease.id,
            cancelled_payments = cancelled_payments.len(),
            "lease cancelled"
        );
        Ok(())
    }

    pub async fn update_painting_fee_paid(&self, lease_id: Uuid, delta: Money, cancel: CancellationToken) -> AppResult<Lease> {
        self.repo.update_painting_fee_paid(lease_id, delta, cancel).await
    }

    pub async fn get_by_id(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Lease> {
        LeaseRepository::get_by_id(&self.repo, lease_id, cancel).await
    }

    pub async fn list(&self, filter: LeaseFilter, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        self.repo.list(filter, cancel).await
    }

    pub async fn get_expiring_soon(&self, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        self.repo.get_expiring_soon(cancel).await
    }

    /// Idempotent: running it twice in a row changes no further rows.
    pub async fn promote_expiring_soon(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        let count = self.repo.promote_expiring_soon(today, cancel).await?;
        if count > 0 {
            tracing::info!(count, "leases promoted to expiring_soon");
        }
        Ok(count)
    }

    /// Skips leases whose next generation would be an annual-adjustment
    /// generation — those require an explicit command with
    /// `newMonthlyRent`.
    pub async fn auto_renew(&self, cancel: CancellationToken) -> AppResult<u64> {
        let candidates = self.repo.get_expiring_soon(cancel.clone()).await?;
        let mut renewed = 0u64;
        for lease in candidates {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            if !lease.can_be_renewed() {
                continue;
            }
            if should_apply_annual_adjustment(lease.generation + 1) {
                continue;
            }
            let result = self
                .renew(
                    RenewLeaseInput {
                        lease_id: lease.id,
                        new_monthly_rent: None,
                        painting_fee_total: Money::ZERO,
                        painting_fee_installments: 1,
                        reason: Some("automatic renewal".to_string()),
                        actor: None,
                    },
                    cancel.clone(),
                )
                .await;
            match result {
                Ok(_) => renewed += 1,
                Err(err) => {
                    tracing::warn!(lease_id = %lease.id, error = %err, "auto-renew failed for lease");
                }
            }
        }
        Ok(renewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tenant, Unit};
    use crate::repository::memory::MemoryStore;

    fn no_cancel() -> CancellationToken {
        CancellationToken::new()
    }

    async fn seed(repo: &MemoryStore) -> (Uuid, Uuid) {
        let unit = Unit::new("101", 1, "1000.00".parse().unwrap(), "1000.00".parse().unwrap(), false, None).unwrap();
        let unit_id = unit.id;
        UnitRepository::create(repo, unit, no_cancel()).await.unwrap();

        let tenant = Tenant::new("Jane Doe", "123.456.789-01", "555-0100", None, None, None).unwrap();
        let tenant_id = tenant.id;
        TenantRepository::create(repo, tenant, no_cancel()).await.unwrap();

        (unit_id, tenant_id)
    }

    #[tokio::test]
    async fn scenario_1_create_lease_happy_path() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo.clone());

        let (lease, payments) = service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: "250.00".parse().unwrap(),
                    painting_fee_installments: 2,
                },
                no_cancel(),
            )
            .await
            .unwrap();

        assert_eq!(lease.end_date, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        assert_eq!(payments.len(), 8);
        let unit = UnitRepository::get_by_id(&repo, unit_id, no_cancel()).await.unwrap();
        assert!(matches!(unit.status, UnitStatus::Occupied));
    }

    #[tokio::test]
    async fn create_fails_once_cancelled() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn create_fails_when_unit_unavailable() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        UnitRepository::update_status(&repo, unit_id, UnitStatus::Maintenance, no_cancel())
            .await
            .unwrap();
        let service = LeaseService::new(repo);

        let err = service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnitUnavailable(_)));
    }

    #[tokio::test]
    async fn create_fails_when_tenant_already_has_active_lease() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo.clone());
        service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap();

        let unit2 = Unit::new("102", 1, "900.00".parse().unwrap(), "900.00".parse().unwrap(), false, None).unwrap();
        let unit2_id = unit2.id;
        UnitRepository::create(&repo, unit2, no_cancel()).await.unwrap();

        let err = service
            .create(
                CreateLeaseInput {
                    unit_id: unit2_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "900.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TenantHasActiveLease(_)));
    }

    #[tokio::test]
    async fn scenario_4_renewal_with_adjustment() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo.clone());

        let (lease, _) = service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap();
        assert_eq!(lease.end_date, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());

        let renewed = service
            .renew(
                RenewLeaseInput {
                    lease_id: lease.id,
                    new_monthly_rent: Some("1100.00".parse().unwrap()),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                    reason: Some("annual".to_string()),
                    actor: None,
                },
                no_cancel(),
            )
            .await
            .unwrap();

        assert_eq!(renewed.generation, 2);
        assert_eq!(renewed.parent_lease_id, Some(lease.id));
        assert_eq!(renewed.start_date, lease.end_date);
        assert_eq!(renewed.end_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(renewed.monthly_rent, "1100.00".parse().unwrap());

        let old_lease = LeaseRepository::get_by_id(&repo, lease.id, no_cancel()).await.unwrap();
        assert!(matches!(old_lease.status, crate::domain::LeaseStatus::Expired));

        let adjustments = crate::repository::RentAdjustmentRepository::list_by_lease(&repo, renewed.id, no_cancel())
            .await
            .unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].previous_rent_value, "1000.00".parse().unwrap());
        assert_eq!(adjustments[0].new_rent_value, "1100.00".parse().unwrap());
    }

    #[tokio::test]
    async fn scenario_6_cancel_lease_atomicity_and_unit_reuse() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo.clone());

        let (lease, _) = service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap();

        service.cancel(lease.id, no_cancel()).await.unwrap();

        let cancelled = LeaseRepository::get_by_id(&repo, lease.id, no_cancel()).await.unwrap();
        assert!(matches!(cancelled.status, crate::domain::LeaseStatus::Cancelled));
        let payments = crate::repository::PaymentRepository::list_by_lease(&repo, lease.id, no_cancel())
            .await
            .unwrap();
        assert!(payments
            .iter()
            .all(|p| matches!(p.status, crate::domain::PaymentStatus::Cancelled)));
        let unit = UnitRepository::get_by_id(&repo, unit_id, no_cancel()).await.unwrap();
        assert!(matches!(unit.status, UnitStatus::Available));

        let tenant2 = Tenant::new("John Roe", "987.654.321-00", "555-0200", None, None, None).unwrap();
        let tenant2_id = tenant2.id;
        TenantRepository::create(&repo, tenant2, no_cancel()).await.unwrap();
        service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id: tenant2_id,
                    signed_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn promote_expiring_soon_is_idempotent() {
        let repo = MemoryStore::new();
        let (unit_id, tenant_id) = seed(&repo).await;
        let service = LeaseService::new(repo.clone());
        let near_end = chrono::Utc::now().date_naive() - chrono::Duration::days(150);
        service
            .create(
                CreateLeaseInput {
                    unit_id,
                    tenant_id,
                    signed_date: near_end,
                    start_date: near_end,
                    payment_due_day: 5,
                    monthly_rent: "1000.00".parse().unwrap(),
                    painting_fee_total: Money::ZERO,
                    painting_fee_installments: 1,
                },
                no_cancel(),
            )
            .await
            .unwrap();

        let today = chrono::Utc::now().date_naive();
        let first = service.promote_expiring_soon(today, no_cancel()).await.unwrap();
        let second = service.promote_expiring_soon(today, no_cancel()).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }
}
