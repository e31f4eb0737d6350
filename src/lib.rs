//! # Terminal Operator Library
//!
//! Core functionality for the Terminal operator: CRD types, the per-kind
//! reconciliation engine, the Terminal API client, and the metrics/probe
//! surface. The binaries in `main.rs` and `crdgen.rs` are thin wrappers
//! around these modules, and tests drive the engine through the injected
//! `TerminalApi`/`ReferenceResolver` traits.

pub mod config;
pub mod controller;
pub mod crd;
pub mod metrics;
pub mod server;
pub mod terminal;
