//! `sqlx`-backed Postgres implementation of the repository traits.
//!
//! The schema has five tables (the auth/user table belongs to the
//! excluded HTTP layer): `units`, `tenants`, `leases`,
//! `payments`, `lease_rent_adjustments`. DDL is documented here, not
//! executed — migration tooling is explicitly out of scope.
//!
//! ```sql
//! CREATE TABLE units (
//!     id UUID PRIMARY KEY,
//!     number TEXT NOT NULL UNIQUE,
//!     floor INTEGER NOT NULL CHECK (floor > 0),
//!     status TEXT NOT NULL CHECK (status IN ('available','occupied','maintenance','renovation')),
//!     is_renovated BOOLEAN NOT NULL,
//!     base_rent NUMERIC(12,2) NOT NULL CHECK (base_rent > 0),
//!     renovated_rent NUMERIC(12,2) NOT NULL,
//!     current_rent NUMERIC(12,2) NOT NULL,
//!     notes TEXT,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE tenants (
//!     id UUID PRIMARY KEY,
//!     full_name TEXT NOT NULL,
//!     national_id TEXT NOT NULL UNIQUE,
//!     phone TEXT NOT NULL,
//!     email TEXT,
//!     document_type TEXT,
//!     document_number TEXT,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE leases (
//!     id UUID PRIMARY KEY,
//!     unit_id UUID NOT NULL REFERENCES units(id) ON DELETE RESTRICT,
//!     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE RESTRICT,
//!     signed_date DATE NOT NULL,
//!     start_date DATE NOT NULL,
//!     end_date DATE NOT NULL CHECK (start_date < end_date),
//!     payment_due_day INTEGER NOT NULL CHECK (payment_due_day BETWEEN 1 AND 31),
//!     monthly_rent NUMERIC(12,2) NOT NULL CHECK (monthly_rent > 0),
//!     painting_fee_total NUMERIC(12,2) NOT NULL,
//!     painting_fee_installments INTEGER NOT NULL CHECK (painting_fee_installments BETWEEN 1 AND 4),
//!     painting_fee_paid NUMERIC(12,2) NOT NULL CHECK (painting_fee_paid <= painting_fee_total),
//!     status TEXT NOT NULL CHECK (status IN ('active','expiring_soon','expired','cancelled')),
//!     parent_lease_id UUID REFERENCES leases(id),
//!     generation INTEGER NOT NULL CHECK (generation >= 1),
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX leases_unit_active_idx ON leases (unit_id)
//!     WHERE status IN ('active', 'expiring_soon');
//! CREATE UNIQUE INDEX leases_tenant_active_idx ON leases (tenant_id)
//!     WHERE status IN ('active', 'expiring_soon');
//!
//! CREATE TABLE payments (
//!     id UUID PRIMARY KEY,
//!     lease_id UUID NOT NULL REFERENCES leases(id) ON DELETE RESTRICT,
//!     type TEXT NOT NULL CHECK (type IN ('rent','painting_fee','adjustment')),
//!     reference_month DATE NOT NULL,
//!     amount NUMERIC(12,2) NOT NULL CHECK (amount > 0),
//!     status TEXT NOT NULL CHECK (status IN ('pending','paid','overdue','cancelled')),
//!     due_date DATE NOT NULL,
//!     payment_date DATE,
//!     method TEXT CHECK (method IN ('pix','cash','bank_transfer','credit_card')),
//!     proof_url TEXT,
//!     notes TEXT,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE lease_rent_adjustments (
//!     id UUID PRIMARY KEY,
//!     lease_id UUID NOT NULL REFERENCES leases(id) ON DELETE CASCADE,
//!     previous_rent_value NUMERIC(12,2) NOT NULL,
//!     new_rent_value NUMERIC(12,2) NOT NULL,
//!     adjustment_percentage NUMERIC(8,4) NOT NULL,
//!     applied_at TIMESTAMPTZ NOT NULL,
//!     reason TEXT,
//!     actor TEXT
//! );
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decimal::Money;
use crate::domain::{
    Lease, LeaseStatus, Payment, PaymentMethod, PaymentStatus, PaymentType, RentAdjustment, Tenant,
    Unit, UnitStatus,
};
use crate::error::{check_cancelled, map_db_error, AppError, AppResult};

use super::traits::{
    LeaseFilter, LeaseRepository, OccupancyStats, PaymentRepository, PaymentStats,
    RentAdjustmentRepository, TenantRepository, UnitRepository,
};

/// Thin wrapper around a connection pool; every trait in this module is
/// implemented on it so the service layer depends only on the trait
/// objects, never on `sqlx` directly.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unit_status_str(status: UnitStatus) -> &'static str {
    match status {
        UnitStatus::Available => "available",
        UnitStatus::Occupied => "occupied",
        UnitStatus::Maintenance => "maintenance",
        UnitStatus::Renovation => "renovation",
    }
}

fn parse_unit_status(value: &str) -> AppResult<UnitStatus> {
    match value {
        "available" => Ok(UnitStatus::Available),
        "occupied" => Ok(UnitStatus::Occupied),
        "maintenance" => Ok(UnitStatus::Maintenance),
        "renovation" => Ok(UnitStatus::Renovation),
        other => Err(AppError::StoreError(format!("unknown unit status {other}"))),
    }
}

fn lease_status_str(status: LeaseStatus) -> &'static str {
    match status {
        LeaseStatus::Active => "active",
        LeaseStatus::ExpiringSoon => "expiring_soon",
        LeaseStatus::Expired => "expired",
        LeaseStatus::Cancelled => "cancelled",
    }
}

fn parse_lease_status(value: &str) -> AppResult<LeaseStatus> {
    match value {
        "active" => Ok(LeaseStatus::Active),
        "expiring_soon" => Ok(LeaseStatus::ExpiringSoon),
        "expired" => Ok(LeaseStatus::Expired),
        "cancelled" => Ok(LeaseStatus::Cancelled),
        other => Err(AppError::StoreError(format!("unknown lease status {other}"))),
    }
}

fn payment_type_str(t: PaymentType) -> &'static str {
    match t {
        PaymentType::Rent => "rent",
        PaymentType::PaintingFee => "painting_fee",
        PaymentType::Adjustment => "adjustment",
    }
}

fn parse_payment_type(value: &str) -> AppResult<PaymentType> {
    match value {
        "rent" => Ok(PaymentType::Rent),
        "painting_fee" => Ok(PaymentType::PaintingFee),
        "adjustment" => Ok(PaymentType::Adjustment),
        other => Err(AppError::StoreError(format!("unknown payment type {other}"))),
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Overdue => "overdue",
        PaymentStatus::Cancelled => "cancelled",
    }
}

fn parse_payment_status(value: &str) -> AppResult<PaymentStatus> {
    match value {
        "pending" => Ok(PaymentStatus::Pending),
        "paid" => Ok(PaymentStatus::Paid),
        "overdue" => Ok(PaymentStatus::Overdue),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        other => Err(AppError::StoreError(format!("unknown payment status {other}"))),
    }
}

fn payment_method_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Pix => "pix",
        PaymentMethod::Cash => "cash",
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::CreditCard => "credit_card",
    }
}

fn parse_payment_method(value: &str) -> AppResult<PaymentMethod> {
    match value {
        "pix" => Ok(PaymentMethod::Pix),
        "cash" => Ok(PaymentMethod::Cash),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "credit_card" => Ok(PaymentMethod::CreditCard),
        other => Err(AppError::StoreError(format!("unknown payment method {other}"))),
    }
}

fn unit_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Unit> {
    Ok(Unit {
        id: row.try_get("id").map_err(map_db_error)?,
        number: row.try_get("number").map_err(map_db_error)?,
        floor: row.try_get::<i32, _>("floor").map_err(map_db_error)? as u32,
        status: parse_unit_status(&row.try_get::<String, _>("status").map_err(map_db_error)?)?,
        is_renovated: row.try_get("is_renovated").map_err(map_db_error)?,
        base_rent: Money::from_decimal(row.try_get::<Decimal, _>("base_rent").map_err(map_db_error)?),
        renovated_rent: Money::from_decimal(row.try_get::<Decimal, _>("renovated_rent").map_err(map_db_error)?),
        current_rent: Money::from_decimal(row.try_get::<Decimal, _>("current_rent").map_err(map_db_error)?),
        notes: row.try_get("notes").map_err(map_db_error)?,
        created_at: row.try_get("created_at").map_err(map_db_error)?,
        updated_at: row.try_get("updated_at").map_err(map_db_error)?,
    })
}

fn tenant_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Tenant> {
    let national_id: String = row.try_get("national_id").map_err(map_db_error)?;
    let full_name: String = row.try_get("full_name").map_err(map_db_error)?;
    let phone: String = row.try_get("phone").map_err(map_db_error)?;
    let mut tenant = Tenant::new(
        full_name,
        national_id,
        phone,
        row.try_get("email").map_err(map_db_error)?,
        row.try_get("document_type").map_err(map_db_error)?,
        row.try_get("document_number").map_err(map_db_error)?,
    )
    .map_err(|_| AppError::StoreError("stored tenant failed re-validation".to_string()))?;
    tenant.id = row.try_get("id").map_err(map_db_error)?;
    tenant.created_at = row.try_get("created_at").map_err(map_db_error)?;
    tenant.updated_at = row.try_get("updated_at").map_err(map_db_error)?;
    Ok(tenant)
}

fn lease_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Lease> {
    Ok(Lease {
        id: row.try_get("id").map_err(map_db_error)?,
        unit_id: row.try_get("unit_id").map_err(map_db_error)?,
        tenant_id: row.try_get("tenant_id").map_err(map_db_error)?,
        signed_date: row.try_get("signed_date").map_err(map_db_error)?,
        start_date: row.try_get("start_date").map_err(map_db_error)?,
        end_date: row.try_get("end_date").map_err(map_db_error)?,
        payment_due_day: row.try_get::<i32, _>("payment_due_day").map_err(map_db_error)? as u32,
        monthly_rent: Money::from_decimal(row.try_get::<Decimal, _>("monthly_rent").map_err(map_db_error)?),
        painting_fee_total: Money::from_decimal(
            row.try_get::<Decimal, _>("painting_fee_total").map_err(map_db_error)?,
        ),
        painting_fee_installments: row
            .try_get::<i32, _>("painting_fee_installments")
            .map_err(map_db_error)? as u32,
        painting_fee_paid: Money::from_decimal(
            row.try_get::<Decimal, _>("painting_fee_paid").map_err(map_db_error)?,
        ),
        status: parse_lease_status(&row.try_get::<String, _>("status").map_err(map_db_error)?)?,
        parent_lease_id: row.try_get("parent_lease_id").map_err(map_db_error)?,
        generation: row.try_get::<i32, _>("generation").map_err(map_db_error)? as u32,
        created_at: row.try_get("created_at").map_err(map_db_error)?,
        updated_at: row.try_get("updated_at").map_err(map_db_error)?,
    })
}

fn payment_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Payment> {
    let method: Option<String> = row.try_get("method").map_err(map_db_error)?;
    Ok(Payment {
        id: row.try_get("id").map_err(map_db_error)?,
        lease_id: row.try_get("lease_id").map_err(map_db_error)?,
        payment_type: parse_payment_type(&row.try_get::<String, _>("type").map_err(map_db_error)?)?,
        reference_month: row.try_get("reference_month").map_err(map_db_error)?,
        amount: Money::from_decimal(row.try_get::<Decimal, _>("amount").map_err(map_db_error)?),
        status: parse_payment_status(&row.try_get::<String, _>("status").map_err(map_db_error)?)?,
        due_date: row.try_get("due_date").map_err(map_db_error)?,
        payment_date: row.try_get("payment_date").map_err(map_db_error)?,
        method: method.map(|m| parse_payment_method(&m)).transpose()?,
        proof_url: row.try_get("proof_url").map_err(map_db_error)?,
        notes: row.try_get("notes").map_err(map_db_error)?,
        created_at: row.try_get("created_at").map_err(map_db_error)?,
        updated_at: row.try_get("updated_at").map_err(map_db_error)?,
    })
}

fn rent_adjustment_from_row(row: &sqlx::postgres::PgRow) -> AppResult<RentAdjustment> {
    Ok(RentAdjustment {
        id: row.try_get("id").map_err(map_db_error)?,
        lease_id: row.try_get("lease_id").map_err(map_db_error)?,
        previous_rent_value: Money::from_decimal(
            row.try_get::<Decimal, _>("previous_rent_value").map_err(map_db_error)?,
        ),
        new_rent_value: Money::from_decimal(row.try_get::<Decimal, _>("new_rent_value").map_err(map_db_error)?),
        adjustment_percentage: row.try_get("adjustment_percentage").map_err(map_db_error)?,
        applied_at: row.try_get("applied_at").map_err(map_db_error)?,
        reason: row.try_get("reason").map_err(map_db_error)?,
        actor: row.try_get("actor").map_err(map_db_error)?,
    })
}

async fn insert_payment(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO payments (id, lease_id, type, reference_month, amount, status, due_date, \
         payment_date, method, proof_url, notes, created_at, updated_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
    )
    .bind(payment.id)
    .bind(payment.lease_id)
    .bind(payment_type_str(payment.payment_type))
    .bind(payment.reference_month)
    .bind(payment.amount.as_decimal())
    .bind(payment_status_str(payment.status))
    .bind(payment.due_date)
    .bind(payment.payment_date)
    .bind(payment.method.map(payment_method_str))
    .bind(&payment.proof_url)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

async fn insert_lease(tx: &mut Transaction<'_, Postgres>, lease: &Lease) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO leases (id, unit_id, tenant_id, signed_date, start_date, end_date, \
         payment_due_day, monthly_rent, painting_fee_total, painting_fee_installments, \
         painting_fee_paid, status, parent_lease_id, generation, created_at, updated_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)",
    )
    .bind(lease.id)
    .bind(lease.unit_id)
    .bind(lease.tenant_id)
    .bind(lease.signed_date)
    .bind(lease.start_date)
    .bind(lease.end_date)
    .bind(lease.payment_due_day as i32)
    .bind(lease.monthly_rent.as_decimal())
    .bind(lease.painting_fee_total.as_decimal())
    .bind(lease.painting_fee_installments as i32)
    .bind(lease.painting_fee_paid.as_decimal())
    .bind(lease_status_str(lease.status))
    .bind(lease.parent_lease_id)
    .bind(lease.generation as i32)
    .bind(lease.created_at)
    .bind(lease.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

#[async_trait]
impl UnitRepository for PgStore {
    async fn create(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        sqlx::query(
            "INSERT INTO units (id, number, floor, status, is_renovated, base_rent, \
             renovated_rent, current_rent, notes, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
        )
        .bind(unit.id)
        .bind(&unit.number)
        .bind(unit.floor as i32)
        .bind(unit_status_str(unit.status))
        .bind(unit.is_renovated)
        .bind(unit.base_rent.as_decimal())
        .bind(unit.renovated_rent.as_decimal())
        .bind(unit.current_rent.as_decimal())
        .bind(&unit.notes)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(unit)
    }

    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("unit {id} not found")))?;
        unit_from_row(&row)
    }

    async fn get_by_number(&self, number: &str, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM units WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("unit {number} not found")))?;
        unit_from_row(&row)
    }

    async fn list(&self, status: Option<UnitStatus>, floor: Option<u32>, cancel: CancellationToken) -> AppResult<Vec<Unit>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query(
            "SELECT * FROM units \
             WHERE ($1::text IS NULL OR status = $1) \
             AND ($2::int IS NULL OR floor = $2) \
             ORDER BY number",
        )
        .bind(status.map(unit_status_str))
        .bind(floor.map(|f| f as i32))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.iter().map(unit_from_row).collect()
    }

    async fn update(&self, unit: Unit, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let result = sqlx::query(
            "UPDATE units SET number = $2, floor = $3, status = $4, is_renovated = $5, \
             base_rent = $6, renovated_rent = $7, current_rent = $8, notes = $9, updated_at = $10 \
             WHERE id = $1",
        )
        .bind(unit.id)
        .bind(&unit.number)
        .bind(unit.floor as i32)
        .bind(unit_status_str(unit.status))
        .bind(unit.is_renovated)
        .bind(unit.base_rent.as_decimal())
        .bind(unit.renovated_rent.as_decimal())
        .bind(unit.current_rent.as_decimal())
        .bind(&unit.notes)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("unit {} not found", unit.id)));
        }
        Ok(unit)
    }

    async fn update_status(&self, id: Uuid, status: UnitStatus, cancel: CancellationToken) -> AppResult<Unit> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("UPDATE units SET status = $2, updated_at = now() WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(unit_status_str(status))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("unit {id} not found")))?;
        unit_from_row(&row)
    }

    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()> {
        check_cancelled(&cancel)?;
        let in_use: bool = sqlx::query("SELECT EXISTS(SELECT 1 FROM leases WHERE unit_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?
            .try_get(0)
            .map_err(map_db_error)?;
        if in_use {
            return Err(AppError::validation(
                "unit cannot be deleted while referenced by a lease",
            ));
        }
        check_cancelled(&cancel)?;
        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("unit {id} not found")));
        }
        Ok(())
    }

    async fn occupancy_stats(&self, cancel: CancellationToken) -> AppResult<OccupancyStats> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM units GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        let mut stats = OccupancyStats::default();
        for row in rows {
            let status: String = row.try_get("status").map_err(map_db_error)?;
            let count: i64 = row.try_get("count").map_err(map_db_error)?;
            stats.total += count as u64;
            match status.as_str() {
                "available" => stats.available += count as u64,
                "occupied" => stats.occupied += count as u64,
                "maintenance" => stats.maintenance += count as u64,
                "renovation" => stats.renovation += count as u64,
                _ => {}
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl TenantRepository for PgStore {
    async fn create(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        sqlx::query(
            "INSERT INTO tenants (id, full_name, national_id, phone, email, document_type, \
             document_number, created_at, updated_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(tenant.id)
        .bind(&tenant.full_name)
        .bind(tenant.national_id())
        .bind(&tenant.phone)
        .bind(&tenant.email)
        .bind(&tenant.document_type)
        .bind(&tenant.document_number)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(tenant)
    }

    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("tenant {id} not found")))?;
        tenant_from_row(&row)
    }

    async fn get_by_national_id(&self, national_id: &str, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM tenants WHERE national_id = $1")
            .bind(national_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("tenant {national_id} not found")))?;
        tenant_from_row(&row)
    }

    async fn list(&self, cancel: CancellationToken) -> AppResult<Vec<Tenant>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT * FROM tenants ORDER BY full_name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(tenant_from_row).collect()
    }

    async fn search_by_name(&self, query: &str, cancel: CancellationToken) -> AppResult<Vec<Tenant>> {
        check_cancelled(&cancel)?;
        let pattern = format!("%{}%", query);
        let rows = sqlx::query("SELECT * FROM tenants WHERE full_name ILIKE $1 ORDER BY full_name")
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(tenant_from_row).collect()
    }

    async fn update(&self, tenant: Tenant, cancel: CancellationToken) -> AppResult<Tenant> {
        check_cancelled(&cancel)?;
        let result = sqlx::query(
            "UPDATE tenants SET full_name = $2, phone = $3, email = $4, document_type = $5, \
             document_number = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(tenant.id)
        .bind(&tenant.full_name)
        .bind(&tenant.phone)
        .bind(&tenant.email)
        .bind(&tenant.document_type)
        .bind(&tenant.document_number)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("tenant {} not found", tenant.id)));
        }
        Ok(tenant)
    }

    async fn delete(&self, id: Uuid, cancel: CancellationToken) -> AppResult<()> {
        check_cancelled(&cancel)?;
        let has_active_lease: bool = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM leases WHERE tenant_id = $1 AND status IN ('active','expiring_soon'))",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?
        .try_get(0)
        .map_err(map_db_error)?;
        if has_active_lease {
            return Err(AppError::validation(
                "tenant cannot be deleted while holding an active lease",
            ));
        }
        check_cancelled(&cancel)?;
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("tenant {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseRepository for PgStore {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Lease> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM leases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("lease {id} not found")))?;
        lease_from_row(&row)
    }

    async fn list(&self, filter: LeaseFilter, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query(
            "SELECT * FROM leases \
             WHERE ($1::text IS NULL OR status = $1) \
             AND ($2::uuid IS NULL OR unit_id = $2) \
             AND ($3::uuid IS NULL OR tenant_id = $3) \
             ORDER BY start_date DESC",
        )
        .bind(filter.status.map(lease_status_str))
        .bind(filter.unit_id)
        .bind(filter.tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.iter().map(lease_from_row).collect()
    }

    async fn get_expiring_soon(&self, cancel: CancellationToken) -> AppResult<Vec<Lease>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT * FROM leases WHERE status = 'expiring_soon' ORDER BY end_date")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(lease_from_row).collect()
    }

    async fn has_active_or_expiring_for_unit(&self, unit_id: Uuid, cancel: CancellationToken) -> AppResult<bool> {
        check_cancelled(&cancel)?;
        sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM leases WHERE unit_id = $1 AND status IN ('active','expiring_soon'))",
        )
        .bind(unit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?
        .try_get(0)
        .map_err(map_db_error)
    }

    async fn has_active_or_expiring_for_tenant(&self, tenant_id: Uuid, cancel: CancellationToken) -> AppResult<bool> {
        check_cancelled(&cancel)?;
        sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM leases WHERE tenant_id = $1 AND status IN ('active','expiring_soon'))",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?
        .try_get(0)
        .map_err(map_db_error)
    }

    async fn create_with_payments(
        &self,
        lease: Lease,
        payments: Vec<Payment>,
        cancel: CancellationToken,
    ) -> AppResult<(Lease, Vec<Payment>)> {
        check_cancelled(&cancel)?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        insert_lease(&mut tx, &lease).await?;
        check_cancelled(&cancel)?;
        for payment in &payments {
            insert_payment(&mut tx, payment).await?;
        }
        check_cancelled(&cancel)?;
        sqlx::query("UPDATE units SET status = 'occupied', updated_at = now() WHERE id = $1")
            .bind(lease.unit_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
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
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let old_row = sqlx::query(
            "UPDATE leases SET status = 'expired', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(old_lease_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::not_found(format!("lease {old_lease_id} not found")))?;
        let old_lease = lease_from_row(&old_row)?;

        check_cancelled(&cancel)?;
        insert_lease(&mut tx, &new_lease).await?;
        for payment in &new_payments {
            insert_payment(&mut tx, payment).await?;
        }

        if let Some(adjustment) = &adjustment {
            check_cancelled(&cancel)?;
            sqlx::query(
                "INSERT INTO lease_rent_adjustments (id, lease_id, previous_rent_value, \
                 new_rent_value, adjustment_percentage, applied_at, reason, actor) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
            )
            .bind(adjustment.id)
            .bind(adjustment.lease_id)
            .bind(adjustment.previous_rent_value.as_decimal())
            .bind(adjustment.new_rent_value.as_decimal())
            .bind(adjustment.adjustment_percentage)
            .bind(adjustment.applied_at)
            .bind(&adjustment.reason)
            .bind(&adjustment.actor)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok((old_lease, new_lease, new_payments))
    }

    async fn cancel(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<(Lease, Vec<Payment>)> {
        check_cancelled(&cancel)?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let lease_row = sqlx::query(
            "UPDATE leases SET status = 'cancelled', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(lease_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::not_found(format!("lease {lease_id} not found")))?;
        let lease = lease_from_row(&lease_row)?;

        check_cancelled(&cancel)?;
        let cancelled_rows = sqlx::query(
            "UPDATE payments SET status = 'cancelled', updated_at = now() \
             WHERE lease_id = $1 AND status IN ('pending','overdue') RETURNING *",
        )
        .bind(lease_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;
        let cancelled_payments: Vec<Payment> = cancelled_rows.iter().map(payment_from_row).collect::<Result<_, _>>()?;

        check_cancelled(&cancel)?;
        sqlx::query("UPDATE units SET status = 'available', updated_at = now() WHERE id = $1")
            .bind(lease.unit_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok((lease, cancelled_payments))
    }

    async fn update_painting_fee_paid(&self, lease_id: Uuid, delta: Money, cancel: CancellationToken) -> AppResult<Lease> {
        check_cancelled(&cancel)?;
        if !delta.is_positive() {
            return Err(AppError::validation("painting fee delta must be > 0"));
        }
        let row = sqlx::query(
            "UPDATE leases SET painting_fee_paid = painting_fee_paid + $2, updated_at = now() \
             WHERE id = $1 AND painting_fee_paid + $2 <= painting_fee_total RETURNING *",
        )
        .bind(lease_id)
        .bind(delta.as_decimal())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::validation("painting fee paid would exceed paintingFeeTotal, or lease not found")
        })?;
        lease_from_row(&row)
    }

    async fn promote_expiring_soon(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        check_cancelled(&cancel)?;
        let result = sqlx::query(
            "UPDATE leases SET status = 'expiring_soon', updated_at = now() \
             WHERE status = 'active' \
             AND end_date > $1 AND end_date <= $1 + INTERVAL '45 days'",
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn get_by_id(&self, id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let row = sqlx::query("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found(format!("payment {id} not found")))?;
        payment_from_row(&row)
    }

    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT * FROM payments WHERE lease_id = $1 ORDER BY due_date")
            .bind(lease_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn get_overdue(&self, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT * FROM payments WHERE status = 'overdue' ORDER BY due_date")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn get_upcoming(&self, days_ahead: i64, cancel: CancellationToken) -> AppResult<Vec<Payment>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query(
            "SELECT * FROM payments WHERE status = 'pending' \
             AND due_date BETWEEN CURRENT_DATE AND CURRENT_DATE + ($1 || ' days')::interval \
             ORDER BY due_date",
        )
        .bind(days_ahead.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn stats_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<PaymentStats> {
        check_cancelled(&cancel)?;
        let row = sqlx::query(
            "SELECT \
               COUNT(*) AS total_count, \
               COUNT(*) FILTER (WHERE status = 'paid') AS paid_count, \
               COUNT(*) FILTER (WHERE status = 'overdue') AS overdue_count, \
               COUNT(*) FILTER (WHERE status = 'pending') AS pending_count, \
               COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_count, \
               COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0) AS total_paid_amount \
             FROM payments WHERE lease_id = $1",
        )
        .bind(lease_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(PaymentStats {
            total_count: row.try_get::<i64, _>("total_count").map_err(map_db_error)? as u64,
            paid_count: row.try_get::<i64, _>("paid_count").map_err(map_db_error)? as u64,
            overdue_count: row.try_get::<i64, _>("overdue_count").map_err(map_db_error)? as u64,
            pending_count: row.try_get::<i64, _>("pending_count").map_err(map_db_error)? as u64,
            cancelled_count: row.try_get::<i64, _>("cancelled_count").map_err(map_db_error)? as u64,
            total_paid_amount: Money::from_decimal(
                row.try_get::<Decimal, _>("total_paid_amount").map_err(map_db_error)?,
            ),
        })
    }

    async fn mark_paid(
        &self,
        payment_id: Uuid,
        payment_date: NaiveDate,
        method: PaymentMethod,
        cancel: CancellationToken,
    ) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query(
            "UPDATE payments SET status = 'paid', payment_date = $2, method = $3, updated_at = now() \
             WHERE id = $1 AND status IN ('pending','overdue') AND $2 <= CURRENT_DATE RETURNING *",
        )
        .bind(payment_id)
        .bind(payment_date)
        .bind(payment_method_str(method))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::PaymentNotPayable(format!(
                "payment {payment_id} is not in a payable state, or paymentDate is in the future"
            ))
        })?;
        let payment = payment_from_row(&row)?;

        if matches!(payment.payment_type, PaymentType::PaintingFee) {
            check_cancelled(&cancel)?;
            sqlx::query(
                "UPDATE leases SET painting_fee_paid = LEAST(painting_fee_total, painting_fee_paid + $2), \
                 updated_at = now() WHERE id = $1",
            )
            .bind(payment.lease_id)
            .bind(payment.amount.as_decimal())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(payment)
    }

    async fn cancel(&self, payment_id: Uuid, cancel: CancellationToken) -> AppResult<Payment> {
        check_cancelled(&cancel)?;
        let row = sqlx::query(
            "UPDATE payments SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status IN ('pending','overdue') RETURNING *",
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::PaymentNotPayable(format!("payment {payment_id} is not cancellable")))?;
        payment_from_row(&row)
    }

    async fn sweep_overdue(&self, today: NaiveDate, cancel: CancellationToken) -> AppResult<u64> {
        check_cancelled(&cancel)?;
        let result = sqlx::query(
            "UPDATE payments SET status = 'overdue', updated_at = now() \
             WHERE status = 'pending' AND due_date < $1",
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RentAdjustmentRepository for PgStore {
    async fn list_by_lease(&self, lease_id: Uuid, cancel: CancellationToken) -> AppResult<Vec<RentAdjustment>> {
        check_cancelled(&cancel)?;
        let rows = sqlx::query("SELECT * FROM lease_rent_adjustments WHERE lease_id = $1 ORDER BY applied_at")
            .bind(lease_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.iter().map(rent_adjustment_from_row).collect()
    }
}
