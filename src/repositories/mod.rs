//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the ledger entities. Every accessor that touches tenant
//! data takes the organization ID and applies it as an equality filter in
//! the same query, so a row belonging to another organization behaves
//! exactly like a missing row. Handlers never issue entity queries directly.

pub mod booking;
pub mod customer;
pub mod organization;
pub mod product;
pub mod sale;
pub mod transaction;
pub mod trip;

pub use booking::BookingRepository;
pub use customer::CustomerRepository;
pub use organization::OrganizationRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use transaction::TransactionRepository;
pub use trip::TripRepository;
