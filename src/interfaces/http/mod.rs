//! JSON-over-HTTP surface of the platform.

pub mod responses;
pub mod router;
pub mod server;

pub use router::handle;
pub use server::run;
