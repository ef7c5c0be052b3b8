//! Shared wire types.

mod user;

pub use user::*;
