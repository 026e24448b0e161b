//! Bearer-token authentication primitives.
//!
//! - [`jwt`] -- HS256 access-token generation and validation.

pub mod jwt;
