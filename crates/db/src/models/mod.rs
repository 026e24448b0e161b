//! Row structs for the catalog tables.
//!
//! Each row derives `FromRow` and converts into the matching
//! `estate_core` type. Conversions that can meet an unknown SMALLINT id are
//! fallible and report [`StoreError::Corrupt`](estate_core::error::StoreError).

pub mod image;
pub mod inquiry;
pub mod listing;
pub mod subscription;
pub mod user;
