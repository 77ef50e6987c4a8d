//! inventory-gate: request-scoped authorization in front of the inventory check-in
//! service. Identity, storage and queries live in an external backend reached over
//! HTTP; this crate resolves sessions, decides access and forwards validated calls.

pub mod backend;
pub mod catalog;
pub mod checkin;
pub mod config;
pub mod error;
pub mod identity;
pub mod server;
