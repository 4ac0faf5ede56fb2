//! Concrete implementations of the domain ports plus the HTTP surface.

pub mod http;
pub mod local_storage;
pub mod memory;
pub mod redis_stream;
#[cfg(feature = "s3")]
pub mod s3;
pub mod sqlite;
