//! Integration tests for the Clausecraft generation pipeline

mod cancellation_flow;
mod config_integration;
mod edit_flow;
mod retry_flow;
mod test_utils;
