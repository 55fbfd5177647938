//! Integration tests for the session flow and external services

mod session_flow;
