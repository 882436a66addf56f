// Testing Tools Library
//
// This crate provides testing utilities for the number stream server.
// Currently includes:
// - sse-test-client: scenario-driven checks against a running server

pub mod output;
pub mod scenarios;
pub mod sse_client;
