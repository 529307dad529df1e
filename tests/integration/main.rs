//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the news-wire API and drive full
//! cycles end-to-end against SQLite stores.

mod common;
mod controller_tests;
mod cycle_tests;
mod dedup_tests;
