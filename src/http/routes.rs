//! Route templates.
//!
//! These strings double as the `route` metric label, so every series is keyed
//! by a template and never by a raw request path.

pub const API_PREFIX: &str = "/api/v1";
pub const HEALTHZ: &str = "/api/v1/healthz";
pub const LIVEZ: &str = "/api/v1/livez";
pub const INFO: &str = "/api/v1/info";

/// Route label for requests that matched no route.
pub const UNMATCHED: &str = "unmatched";
