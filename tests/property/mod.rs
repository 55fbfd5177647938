//! Property-based tests

mod chat_reconcile;
mod convergence;
