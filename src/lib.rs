//! Operational agents built on one pipeline: collect diagnostics, render a
//! prompt, generate a report with an LLM backend, deliver it best-effort.

pub mod agent;
pub mod backend;
pub mod cli;
pub mod collect;
pub mod config;
pub mod report;
pub mod utils;
