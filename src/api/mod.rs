//! HTTP surface for the presentation layer.
pub mod handlers;
pub mod routes;
