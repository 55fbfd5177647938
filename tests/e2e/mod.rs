//! End-to-end tests against a running relay

mod relay_e2e;
