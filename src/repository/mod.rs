//! Repository traits behind which the service layer is written, plus two
//! implementations: `pg` (the real `sqlx`-backed Postgres store) and
//! `memory` (a `tokio::sync::Mutex`-backed double used by the test suite,
//! since the toolchain this crate is built with never touches a live
//! database during tests).

pub mod memory;
pub mod pg;
pub mod traits;

pub use traits::{
    LeaseFilter, LeaseRepository, OccupancyStats, PaymentFilter, PaymentRepository, PaymentStats,
    RentAdjustmentRepository, TenantRepository, UnitRepository,
};
