//! Logging bootstrap.

pub mod logger;

pub use logger::LoggerImpl;
