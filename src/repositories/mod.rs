//! Repository layer for database operations
//!
//! Each repository wraps the shared SeaORM pool and exposes org-scoped
//! methods. Soft-deleted rows are filtered out of every finder; cross-org
//! lookups return `None` so existence never leaks between organizations.

pub mod bike;
pub mod booking;
pub mod organization;
pub mod payment;

pub use bike::BikeRepository;
pub use booking::BookingRepository;
pub use organization::OrganizationRepository;
pub use payment::PaymentRepository;
