//! converge-cli
//!
//! Command-line front end for converge-engine. The binary lives in
//! `main.rs`; configuration loading is exposed here so it can be tested.

pub mod config;
