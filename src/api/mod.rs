//! REST/HTTP edge (§6.1), a thin `axum` surface over the services layer.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
