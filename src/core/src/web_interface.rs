//! HTTP surface: dashboard, JSON snapshots and the `/feed` websocket.
pub mod feed;
pub mod routes;
pub mod web_server;

pub use web_server::WebServer;
