use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// Audit record created on renewal when rent changes. Immutable once
/// written — no mutator methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentAdjustment {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub previous_rent_value: Money,
    pub new_rent_value: Money,
    pub adjustment_percentage: Decimal,
    pub applied_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

impl RentAdjustment {
    pub fn new(
        lease_id: Uuid,
        previous_rent_value: Money,
        new_rent_value: Money,
        reason: Option<String>,
        actor: Option<String>,
    ) -> Self {
        let adjustment_percentage = if previous_rent_value.is_zero() {
            Decimal::ZERO
        } else {
            (new_rent_value.as_decimal() - previous_rent_value.as_decimal())
                / previous_rent_value.as_decimal()
                * dec!(100)
        };
        Self {
            id: Uuid::new_v4(),
            lease_id,
            previous_rent_value,
            new_rent_value,
            adjustment_percentage,
            applied_at: Utc::now(),
            reason,
            actor,
        }
    }
}
