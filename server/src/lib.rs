//! Quorum Board server.
//!
//! A small forum-style API: namespaced item collections with replies,
//! permission-labelled reads, ownership-gated writes, partitioned
//! sticky/normal pagination, and time-boxed moderation (kicks and
//! bans) enforced on every mutation.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod items;
pub mod moderation;
pub mod pagination;
pub mod permissions;
