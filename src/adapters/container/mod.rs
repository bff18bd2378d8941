//! Container runtime adapters.

pub mod bollard_runtime;
pub mod fake_runtime;

pub use bollard_runtime::BollardRuntime;
pub use fake_runtime::{FakeOutcome, FakeRuntime};
