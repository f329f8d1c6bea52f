//! Integration tests for listing discovery and sync
//!
//! These tests use wiremock to serve mock directory listings and files and
//! exercise discovery, sync, and whole invocations end-to-end.

mod common;
mod discovery_tests;
mod fetch_tests;
mod sync_tests;
