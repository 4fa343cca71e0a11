//! Service-level routes: liveness and proxy diagnostics.

pub mod health_check;
pub mod proxy_check;
