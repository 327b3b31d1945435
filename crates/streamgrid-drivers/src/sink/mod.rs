//! Sink drivers, one module per transport.

pub mod db;
pub mod http;
pub mod kafka;
pub mod log;
pub mod s3;
pub mod stan;
pub mod volume;
