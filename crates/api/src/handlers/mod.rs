pub mod admin;
pub mod listings;
