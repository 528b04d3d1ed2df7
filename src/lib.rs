//! Linkgate - self-destructing short links
//!
//! Tokens redirect to an owner-chosen destination, gated by a time window,
//! a click quota, one-shot "phantom" consumption and an optional password.
//! Resolution counts each genuine access exactly once and never counts
//! browser or router prefetches.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Command-line management
//!
//! # Architecture
//! - `resolver`: prefetch classification, access policy, lifecycle, token resolution
//! - `storage`: the `LinkStore` boundary (SeaORM and in-memory stores)
//! - `services`: owner-side link management and plan tiers
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod resolver;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
