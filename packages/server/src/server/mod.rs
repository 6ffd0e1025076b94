// HTTP server setup (Axum + WebSocket progress streams)
pub mod app;
pub mod routes;

pub use app::*;
