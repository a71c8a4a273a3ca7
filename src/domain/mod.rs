//! Entities, value objects and storage ports of the workflow core.

pub mod access;
pub mod account;
pub mod booking;
pub mod catalog;
pub mod dispatch;
pub mod ids;
pub mod ledger;
pub mod lifecycle;
pub mod ports;
pub mod review;
pub mod task;
