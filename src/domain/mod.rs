//! Domain layer: plain models, domain errors, and the ports (traits) that
//! adapters implement. Nothing in here depends on any concrete adapter.

pub mod errors;
pub mod models;
pub mod ports;
