//! Pure domain entities and value objects. Nothing in this module performs
//! I/O; constructors validate and either return a valid entity or an
//! `AppError::ValidationError`, and mutator methods enforce the same
//! invariants on every transition.

pub mod calendar;
pub mod lease;
pub mod payment;
pub mod payment_schedule;
pub mod rent_adjustment;
pub mod tenant;
pub mod unit;

pub use lease::{Lease, LeaseStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus, PaymentType};
pub use rent_adjustment::RentAdjustment;
pub use tenant::Tenant;
pub use unit::{Unit, UnitStatus};
