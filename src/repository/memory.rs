//! `tokio::sync::Mutex`-backed double of the five repository traits, used
//! exclusively by the test suite so service-layer logic (including the
//! transactional multi-entity operations) can be exercised deterministically
//! without a live database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decimal::Money;
use crate::domain::{
    Lease, LeaseStatus, Payment, PaymentMethod, PaymentStatus, PaymentType, RentAdjustment, Tenant,
    Unit, UnitStatus,
};
use crate::error::{check_cancelled, AppError, AppResult};

use super::traits::{
    LeaseFilter, LeaseRepository, OccupancyStats, PaymentRepository, PaymentStats,
    RentAdjustmentRepository, TenantRepository, UnitRepository,
};

#[derive(Default)]
struct Inner {
    units: HashMap<Uuid, Unit>,
    tenants: HashMap<Uuid, Tenant>,
    leases: HashMap<Uuid, Lease>,
    payments: HashMap<Uuid, Payment>,
    rent_adjustments: HashMap<Uuid, RentAdjustment>,
}

/// Single shared store implementing every repository trait, so the
/// multi-entity transactions of lease/payment lifecycle operations can be
/// modeled as one mutex-guarded critical section — the in-memory analogue
/// of the `sqlx::Transaction` used by `pg::PgStore`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitRepository for MemoryStore {
    async fn create(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        if inner.units.values().any(|u| u.number == unit.number) {
            return Err(AppError::validation(format!(
                "unit number {} already exists",
                unit.number
            )));
        }
        inner.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .units
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("unit {id} not found")))
    }

    async fn get_by_number(&self, number: &str, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .units
            .values()
            .find(|u| u.number == number)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("unit {number} not found")))
    }

    async fn list(&self, status: Option<UnitStatus>, floor: Option<u32>, cancel: CancellationToken) -> AppResult<Vec<Unit>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner
            .units
            .values()
            .filter(|u| status.map(|s| s == u.status).unwrap_or(true))
            .filter(|u| floor.map(|f| f == u.floor).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        if !inner.units.contains_key(&unit.id) {
            return Err(AppError::not_found(format!("unit {} not found", unit.id)));
        }
        inner.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn update_status(&self, id: Uuid, status: UnitStatus, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let unit = inner
            .units
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("unit {id} not found")))?;
        unit.set_status(status);
        Ok(unit.clone())
    }

    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        if inner.leases.values().any(|l| l.unit_id == id) {
            return Err(AppError::validation(
                "unit cannot be deleted while referenced by a lease",
            ));
        }
        inner
            .units
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("unit {id} not found")))?;
        Ok(())
    }

    async fn occupancy_stats(&self, cancel: CancellationToken) -> AppResult<OccupancyStats> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        let mut stats = OccupancyStats::default();
        for unit in inner.units.values() {
            stats.total += 1;
            match unit.status {
                UnitStatus::Available => stats.available += 1,
                UnitStatus::Occupied => stats.occupied += 1,
                UnitStatus::Maintenance => stats.maintenance += 1,
                UnitStatus::Renovation => stats.renovation += 1,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn create(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        if inner.tenants.values().any(|t| t.national_id() == tenant.national_id()) {
            return Err(AppError::validation("national ID already registered"));
        }
        inner.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .tenants
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("tenant {id} not found")))
    }

    async fn get_by_national_id(&self, national_id: &str, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .tenants
            .values()
            .find(|t| t.national_id() == national_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("tenant {national_id} not found")))
    }

    async fn list(&self, cancel: CancellationToken) -> AppResult<Vec<Tenant>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner.tenants.values().cloned().collect())
    }

    async fn search_by_name(&self, query: &str, cancel: CancellationToken) -> AppResult<Vec<Tenant>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        let needle = query.to_lowercase();
        Ok(inner
            .tenants
            .values()
            .filter(|t| t.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn update(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        if !inner.tenants.contains_key(&tenant.id) {
            return Err(AppError::not_found(format!("tenant {} not found", tenant.id)));
        }
        inner.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let has_active_lease = inner.leases.values().any(|l| {
            l.tenant_id == id && matches!(l.status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
        });
        if has_active_lease {
            return Err(AppError::validation(
                "tenant cannot be deleted while holding an active lease",
            ));
        }
        inner
            .tenants
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("tenant {id} not found")))?;
        Ok(())
    }
}

#[async_trait]
impl LeaseRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Lease> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .leases
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("lease {id} not found")))
    }

    async fn list(&self, filter: LeaseFilter, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner
            .leases
            .values()
            .filter(|l| filter.status.map(|s| s == l.status).unwrap_or(true))
            .filter(|l| filter.unit_id.map(|id| id == l.unit_id).unwrap_or(true))
            .filter(|l| filter.tenant_id.map(|id| id == l.tenant_id).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn get_expiring_soon(&self, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner
            .leases
            .values()
            .filter(|l| matches!(l.status, LeaseStatus::ExpiringSoon))
            .cloned()
            .collect())
    }

    async fn has_active_or_expiring_for_unit(&self, unit_id: Uuid, cancel: CancellationToken) -> AppResult<bool> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner.leases.values().any(|l| {
            l.unit_id == unit_id && matches!(l.status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
        }))
    }

    async fn has_active_or_expiring_for_tenant(&self, tenant_id: Uuid, cancel: CancellationToken) -> AppResult<bool> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner.leases.values().any(|l| {
            l.tenant_id == tenant_id && matches!(l.status, LeaseStatus::Active | LeaseStatus::ExpiringSoon)
        }))
    }

    async fn create_with_payments(
        &self,
        lease: Lease,
        payments: Vec<Payment>,
        cancel: CancellationToken,
    ) -> AppResult<(Lease, Vec<Payment>)> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let unit = inner
            .units
            .get_mut(&lease.unit_id)
            .ok_or_else(|| AppError::not_found(format!("unit {} not found", lease.unit_id)))?;
        unit.mark_occupied();
        inner.leases.insert(lease.id, lease.clone());
        for payment in &payments {
            inner.payments.insert(payment.id, payment.clone());
        }
        Ok((lease, payments))
    }

    async fn renew(
        &self,
        old_lease_id: Uuid,
        new_lease: Lease,
        new_payments: Vec<Payment>,
        adjustment: Option<RentAdjustment>,
        cancel: CancellationToken,
    ) -> AppResult<(Lease, Lease, Vec<Payment>)> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        {
            let old_lease = inner
                .leases
                .get_mut(&old_lease_id)
                .ok_or_else(|| AppError::not_found(format!("lease {old_lease_id} not found")))?;
            old_lease.mark_expired();
        }
        let old_lease = inner.leases.get(&old_lease_id).cloned().unwrap();
        inner.leases.insert(new_lease.id, new_lease.clone());
        for payment in &new_payments {
            inner.payments.insert(payment.id, payment.clone());
        }
        if let Some(adjustment) = adjustment {
            inner.rent_adjustments.insert(adjustment.id, adjustment);
        }
        Ok((old_lease, new_lease, new_payments))
    }

    async fn cancel(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<(Lease, Vec<Payment>)> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        {
            let lease = inner
                .leases
                .get_mut(&lease_id)
                .ok_or_else(|| AppError::not_found(format!("lease {lease_id} not found")))?;
            lease.mark_cancelled();
        }
        let unit_id = inner.leases.get(&lease_id).unwrap().unit_id;
        let payment_ids: Vec<Uuid> = inner
            .payments
            .values()
            .filter(|p| p.lease_id == lease_id && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Overdue))
            .map(|p| p.id)
            .collect();
        for id in &payment_ids {
            if let Some(payment) = inner.payments.get_mut(id) {
                let _ = payment.cancel();
            }
        }
        if let Some(unit) = inner.units.get_mut(&unit_id) {
            unit.mark_available();
        }
        let lease = inner.leases.get(&lease_id).cloned().unwrap();
        let cancelled_payments = inner
            .payments
            .values()
            .filter(|p| p.lease_id == lease_id && payment_ids.contains(&p.id))
            .cloned()
            .collect();
        Ok((lease, cancelled_payments))
    }

    async fn update_painting_fee_paid(&self, lease_id: Uuid, delta: Money, cancel: CancellationToken) -> AppResult<Lease> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let lease = inner
            .leases
            .get_mut(&lease_id)
            .ok_or_else(|| AppError::not_found(format!("lease {lease_id} not found")))?;
        lease.apply_painting_fee_payment(delta)?;
        Ok(lease.clone())
    }

    async fn promote_expiring_soon(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for lease in inner.leases.values_mut() {
            if matches!(lease.status, LeaseStatus::Active) && lease.is_expiring_soon(today) {
                lease.promote_to_expiring_soon();
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        inner
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("payment {id} not found")))
    }

    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| p.lease_id == lease_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.due_date);
        Ok(payments)
    }

    async fn get_overdue(&self, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner
            .payments
            .values()
            .filter(|p| matches!(p.status, PaymentStatus::Overdue))
            .cloned()
            .collect())
    }

    async fn get_upcoming(&self, days_ahead: i64, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        let today = chrono::Utc::now().date_naive();
        let horizon = today + chrono::Duration::days(days_ahead);
        Ok(inner
            .payments
            .values()
            .filter(|p| matches!(p.status, PaymentStatus::Pending))
            .filter(|p| p.due_date >= today && p.due_date <= horizon)
            .cloned()
            .collect())
    }

    async fn stats_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<PaymentStats> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        let mut stats = PaymentStats::default();
        for payment in inner.payments.values().filter(|p| p.lease_id == lease_id) {
            stats.total_count += 1;
            match payment.status {
                PaymentStatus::Paid => {
                    stats.paid_count += 1;
                    stats.total_paid_amount += payment.amount;
                }
                PaymentStatus::Overdue => stats.overdue_count += 1,
                PaymentStatus::Pending => stats.pending_count += 1,
                PaymentStatus::Cancelled => stats.cancelled_count += 1,
            }
        }
        Ok(stats)
    }

    async fn mark_paid(
        &self,
        payment_id: Uuid,
        payment_date: NaiveDate,
        method: PaymentMethod,
        cancel: CancellationToken,
    ) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let (lease_id, amount, payment_type) = {
            let payment = inner
                .payments
                .get_mut(&payment_id)
                .ok_or_else(|| AppError::not_found(format!("payment {payment_id} not found")))?;
            payment.mark_paid(payment_date, method)?;
            (payment.lease_id, payment.amount, payment.payment_type)
        };
        if matches!(payment_type, PaymentType::PaintingFee) {
            if let Some(lease) = inner.leases.get_mut(&lease_id) {
                let capped = amount.min(lease.remaining_painting_fee());
                if capped.is_positive() {
                    lease.apply_painting_fee_payment(capped)?;
                }
            }
        }
        Ok(inner.payments.get(&payment_id).cloned().unwrap())
    }

    async fn cancel(&self, payment_id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| AppError::not_found(format!("payment {payment_id} not found")))?;
        payment.cancel()?;
        Ok(payment.clone())
    }

    async fn sweep_overdue(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        check_cancelled(&cancel)?;
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for payment in inner.payments.values_mut() {
            if payment.mark_overdue_if_due(today) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl RentAdjustmentRepository for MemoryStore {
    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<RentAdjustment>> {
        check_cancelled(&cancel)?;
        let inner = self.inner.lock().await;
        Ok(inner
            .rent_adjustments
            .values()
            .filter(|a| a.lease_id == lease_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn create_unit_rejects_duplicate_number() {
        let store = MemoryStore::new();
        let unit = Unit::new("101", 1, "800.00".parse().unwrap(), "800.00".parse().unwrap(), false, None).unwrap();
        UnitRepository::create(&store, unit.clone(), no_cancel()).await.unwrap();
        let dup = Unit::new("101", 2, "900.00".parse().unwrap(), "900.00".parse().unwrap(), false, None).unwrap();
        assert!(UnitRepository::create(&store, dup, no_cancel()).await.is_err());
    }

    #[tokio::test]
    async fn create_unit_rejects_once_cancelled() {
        let store = MemoryStore::new();
        let unit = Unit::new("101", 1, "800.00".parse().unwrap(), "800.00".parse().unwrap(), false, None).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = UnitRepository::create(&store, unit, cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn cancel_lease_frees_unit_and_cancels_open_payments() {
        use crate::domain::lease::NewLeaseParams;

        let store = MemoryStore::new();
        let unit = Unit::new("201", 2, "800.00".parse().unwrap(), "800.00".parse().unwrap(), false, None).unwrap();
        let unit_id = unit.id;
        UnitRepository::create(&store, unit, no_cancel()).await.unwrap();

        let lease = Lease::new(NewLeaseParams {
            unit_id,
            tenant_id: Uuid::new_v4(),
            signed_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            payment_due_day: 5,
            monthly_rent: "800.00".parse().unwrap(),
            painting_fee_total: Money::ZERO,
            painting_fee_installments: 1,
            parent_lease_id: None,
            generation: 1,
        })
        .unwrap();
        let payments = crate::domain::payment_schedule::generate(&lease);
        let (lease, _) = LeaseRepository::create_with_payments(&store, lease, payments, no_cancel())
            .await
            .unwrap();

        let (cancelled, _) = LeaseRepository::cancel(&store, lease.id, no_cancel()).await.unwrap();
        assert!(matches!(cancelled.status, LeaseStatus::Cancelled));
        let unit_after = UnitRepository::get_by_id(&store, unit_id, no_cancel()).await.unwrap();
        assert!(matches!(unit_after.status, UnitStatus::Available));
        let payments_after = PaymentRepository::list_by_lease(&store, lease.id, no_cancel()).await.unwrap();
        assert!(payments_after.iter().all(|p| matches!(p.status, PaymentStatus::Cancelled)));
    }
}
