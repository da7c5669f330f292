//! Integration tests for the deal crawler
//!
//! These tests use wiremock to create mock HTTP servers and scripted
//! in-process fetchers to test full crawl runs end-to-end.

mod common;
mod crawl_tests;
mod dataset_tests;
mod server_tests;
