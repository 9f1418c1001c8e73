//! Read-only reference data the validators check records against.

pub mod asim;
pub mod entities;
pub mod schema;
pub mod sentinel;
