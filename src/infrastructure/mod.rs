pub mod in_memory;
pub mod password;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod seed;
pub mod token;
