pub mod lease_service;
pub mod maintenance_worker;
pub mod payment_service;

pub use lease_service::LeaseService;
pub use maintenance_worker::MaintenanceWorker;
pub use payment_service::PaymentService;
