//! Integration tests entrypoint

#[path = "support/mod.rs"]
mod support;

#[path = "integration/dispatch_flow_test.rs"]
mod dispatch_flow_test;

#[path = "integration/audit_backend_test.rs"]
mod audit_backend_test;

#[path = "integration/http_api_test.rs"]
mod http_api_test;
