//! Application layer: one engine per workflow component.
//!
//! Engines take the authenticated [`Caller`](crate::domain::access::Caller)
//! explicitly, check its capabilities, and drive the storage ports. They hold
//! no state of their own beyond store handles, so cloning one is cheap.

pub mod accounts;
pub mod booking;
pub mod catalog;
pub mod contact;
pub mod dispatch;
pub mod ledger;
pub mod platform;
pub mod reviews;
pub mod stats;
pub mod tasks;

pub use platform::{Platform, PlatformSettings};
