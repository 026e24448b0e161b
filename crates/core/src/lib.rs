//! Domain core for the property catalog.
//!
//! Everything in this crate is free of I/O: listing types, the approval state
//! machine, slug normalisation, geo math, quota policy, the search predicate
//! and the async traits (ports) that storage and collaborator adapters
//! implement.

pub mod audit;
pub mod error;
pub mod geo;
pub mod hashing;
pub mod listing;
pub mod notification;
pub mod ports;
pub mod quota;
pub mod roles;
pub mod search;
pub mod slug;
pub mod status;
pub mod types;
pub mod views;
pub mod workflow;
