use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
    Renovation,
}

/// A single rentable room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub number: String,
    pub floor: u32,
    pub status: UnitStatus,
    pub is_renovated: bool,
    pub base_rent: Money,
    pub renovated_rent: Money,
    pub current_rent: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Validates `renovatedRent >= baseRent > 0` and derives `currentRent`
    /// from `isRenovated` so the two never drift apart.
    pub fn new(
        number: impl Into<String>,
        floor: u32,
        base_rent: Money,
        renovated_rent: Money,
        is_renovated: bool,
        notes: Option<String>,
    ) -> Result<Self, AppError> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(AppError::validation("unit number must not be empty"));
        }
        if floor == 0 {
            return Err(AppError::validation("floor must be a positive integer"));
        }
        if !base_rent.is_positive() {
            return Err(AppError::validation("baseRent must be > 0"));
        }
        if renovated_rent < base_rent {
            return Err(AppError::validation("renovatedRent must be >= baseRent"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            number,
            floor,
            status: UnitStatus::Available,
            is_renovated,
            base_rent,
            renovated_rent,
            current_rent: if is_renovated { renovated_rent } else { base_rent },
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    fn recompute_current_rent(&mut self) {
        self.current_rent = if self.is_renovated {
            self.renovated_rent
        } else {
            self.base_rent
        };
    }

    pub fn set_renovated(&mut self, is_renovated: bool) {
        self.is_renovated = is_renovated;
        self.recompute_current_rent();
        self.updated_at = Utc::now();
    }

    pub fn update_rents(&mut self, base_rent: Money, renovated_rent: Money) -> Result<(), AppError> {
        if !base_rent.is_positive() {
            return Err(AppError::validation("baseRent must be > 0"));
        }
        if renovated_rent < base_rent {
            return Err(AppError::validation("renovatedRent must be >= baseRent"));
        }
        self.base_rent = base_rent;
        self.renovated_rent = renovated_rent;
        self.recompute_current_rent();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_status(&mut self, status: UnitStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Called by the lease service, never from outside it.
    pub fn mark_occupied(&mut self) {
        self.set_status(UnitStatus::Occupied);
    }

    pub fn mark_available(&mut self) {
        self.set_status(UnitStatus::Available);
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, UnitStatus::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(v: &str) -> Money {
        v.parse().unwrap()
    }

    #[test]
    fn current_rent_mirrors_is_renovated() {
        let unit = Unit::new("101", 1, money("800.00"), money("950.00"), true, None).unwrap();
        assert_eq!(unit.current_rent, money("950.00"));

        let unit = Unit::new("102", 1, money("800.00"), money("950.00"), false, None).unwrap();
        assert_eq!(unit.current_rent, money("800.00"));
    }

    #[test]
    fn rejects_renovated_rent_below_base_rent() {
        let err = Unit::new("103", 1, money("800.00"), money("700.00"), false, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn rejects_non_positive_base_rent() {
        assert!(Unit::new("104", 1, money("0.00"), money("0.00"), false, None).is_err());
    }

    #[test]
    fn set_renovated_recomputes_current_rent() {
        let mut unit = Unit::new("105", 2, money("800.00"), money("950.00"), false, None).unwrap();
        assert_eq!(unit.current_rent, money("800.00"));
        unit.set_renovated(true);
        assert_eq!(unit.current_rent, money("950.00"));
    }
}
