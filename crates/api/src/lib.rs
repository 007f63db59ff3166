//! HTTP API: router, auth middleware, request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;
