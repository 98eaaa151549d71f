//! # OSINT Harness
//!
//! Rate-limited multi-source threat-intelligence aggregation with case
//! similarity search.
//!
//! A query (IP, domain, email, file hash, URL, or free text) is classified,
//! fanned out concurrently to every configured provider that accepts its
//! type, and the per-provider outcomes are merged into one result. Saved
//! investigations are embedded so that related cases can be surfaced later.
//!
//! ## Architecture
//!
//! ```text
//!  query ─▶ classify ─▶ ┌────────────────┐   ┌───────────────────────┐
//!                       │ QueryDispatcher│──▶│ shodan · virustotal · │
//!                       └───────┬────────┘   │ hibp · censys ·       │
//!                               │            │ greynoise · intelx    │
//!                               ▼            └───────────────────────┘
//!                       ┌──────────────┐
//!                       │ RiskAnalyzer │
//!                       └───────┬──────┘
//!                               ▼
//!                       ┌──────────────┐    ┌──────────────────────┐
//!                       │ CaseService  │───▶│ SQLite cases/vectors │
//!                       └──────────────┘    └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! osint init                          # create database
//! osint sources                       # which providers have credentials
//! osint investigate 8.8.8.8 --save    # query, analyze, save as a case
//! osint similar <case-id>             # related investigations
//! osint serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`credentials`] | Provider API keys from the environment |
//! | [`ratelimit`] | Sliding-window request limiter |
//! | [`sources`] | Provider clients |
//! | [`registry`] | Shared client instances per credential |
//! | [`dispatch`] | Concurrent fan-out and result aggregation |
//! | [`analysis`] | Risk analysis collaborator |
//! | [`embedding`] | Embedding providers |
//! | [`cases`] | Case lifecycle and similarity lookups |
//! | [`investigate`] | One-shot investigation entry point |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |

pub mod analysis;
pub mod app;
pub mod cases;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod db;
pub mod dispatch;
pub mod embedding;
pub mod investigate;
pub mod migrate;
pub mod ratelimit;
pub mod registry;
pub mod server;
pub mod sources;
pub mod sqlite_store;
