use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decimal::Money;
use crate::domain::{Lease, LeaseStatus, Payment, PaymentMethod, RentAdjustment, Tenant, Unit, UnitStatus};
use crate::error::AppResult;

#[derive(Debug, Clone, Default)]
pub struct LeaseFilter {
    pub status: Option<LeaseStatus>,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub lease_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyStats {
    pub total: u64,
    pub available: u64,
    pub occupied: u64,
    pub maintenance: u64,
    pub renovation: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentStats {
    pub total_count: u64,
    pub paid_count: u64,
    pub overdue_count: u64,
    pub pending_count: u64,
    pub cancelled_count: u64,
    pub total_paid_amount: Money,
}

/// Every method takes a `CancellationToken` propagated from the caller.
/// Implementations check it at each I/O boundary and return
/// `AppError::Cancelled` once it fires.
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn create(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit>;
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Unit>;
    async fn get_by_number(&self, number: &str, cancel: CancellationToken) -> AppResult<Unit>;
    async fn list(&self, status: Option<UnitStatus>, floor: Option<u32>, cancel: CancellationToken) -> AppResult<Vec<Unit>>;
    async fn update(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit>;
    async fn update_status(&self, id: Uuid, status: UnitStatus, cancel: CancellationToken) -> AppResult<Unit>;
    /// Fails with `ValidationError` if the unit is referenced by any lease.
    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()>;
    async fn occupancy_stats(&self, cancel: CancellationToken) -> AppResult<OccupancyStats>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant>;
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Tenant>;
    async fn get_by_national_id(&self, national_id: &str, cancel: CancellationToken) -> AppResult<Tenant>;
    async fn list(&self, cancel: CancellationToken) -> AppResult<Vec<Tenant>>;
    async fn search_by_name(&self, query: &str, cancel: CancellationToken) -> AppResult<Vec<Tenant>>;
    async fn update(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant>;
    /// Fails with `ValidationError` if the tenant is referenced by a lease
    /// with status in {active, expiring_soon}.
    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()>;
}

#[async_trait]
pub trait LeaseRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Lease>;
    async fn list(&self, filter: LeaseFilter, cancel: CancellationToken) -> AppResult<Vec<Lease>>;
    async fn get_expiring_soon(&self, cancel: CancellationToken) -> AppResult<Vec<Lease>>;
    async fn has_active_or_expiring_for_unit(&self, unit_id: Uuid, cancel: CancellationToken) -> AppResult<bool>;
    async fn has_active_or_expiring_for_tenant(&self, tenant_id: Uuid, cancel: CancellationToken) -> AppResult<bool>;

    /// Inserts `lease` and `payments`, and flips the owning unit to
    /// `occupied`, as a single transaction.
    async fn create_with_payments(
        &self,
        lease: Lease,
        payments: Vec<Payment>,
        cancel: CancellationToken,
    ) -> AppResult<(Lease, Vec<Payment>)>;

    /// Marks `old_lease_id` expired, inserts `new_lease` with its
    /// payments, and optionally a rent adjustment row, as a single
    /// transaction. The unit stays occupied.
    async fn renew(
        &self,
        old_lease_id: Uuid,
        new_lease: Lease,
        new_payments: Vec<Payment>,
        adjustment: Option<RentAdjustment>,
        cancel: CancellationToken,
    ) -> AppResult<(Lease, Lease, Vec<Payment>)>;

    /// Marks the lease cancelled, cancels every pending/overdue payment of
    /// it, and frees the unit, as a single transaction.
    async fn cancel(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<(Lease, Vec<Payment>)>;

    /// `delta` must be strictly positive and must not push the running
    /// total past `paintingFeeTotal`; both implementations enforce this
    /// before writing.
    async fn update_painting_fee_paid(&self, lease_id: Uuid, delta: Money, cancel: CancellationToken) -> AppResult<Lease>;

    /// For every lease `active` with `daysUntilEnd ∈ (0, 45]`, set
    /// `expiring_soon`. Returns the number of rows changed.
    async fn promote_expiring_soon(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Payment>;
    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<Payment>>;
    async fn get_overdue(&self, cancel: CancellationToken) -> AppResult<Vec<Payment>>;
    async fn get_upcoming(&self, days_ahead: i64, cancel: CancellationToken) -> AppResult<Vec<Payment>>;
    async fn stats_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<PaymentStats>;

    /// Marks the payment paid. `payment_date` must not be after today;
    /// both implementations reject it otherwise. If the payment's type is
    /// `painting_fee`, also increments the owning lease's
    /// `paintingFeePaid`, in the same transaction.
    async fn mark_paid(
        &self,
        payment_id: Uuid,
        payment_date: NaiveDate,
        method: PaymentMethod,
        cancel: CancellationToken,
    ) -> AppResult<Payment>;

    async fn cancel(&self, payment_id: Uuid, cancel: CancellationToken) -> AppResult<Payment>;

    /// For every `pending` payment with `dueDate < today`, set `overdue`.
    /// Returns the number of rows changed.
    async fn sweep_overdue(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64>;
}

#[async_trait]
pub trait RentAdjustmentRepository: Send + Sync {
    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<RentAdjustment>>;
}
