//! HTTP client for the coordinator API

pub mod client;
mod edge_stacks;

pub use client::HttpClient;
