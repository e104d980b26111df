//! # Info Sieve
//!
//! A scheduled ingestion service that pulls candidate links from Hacker News
//! and RSS/Atom feeds, has an LLM score each new one against a fixed rubric,
//! and keeps only the items whose total clears a threshold.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐   ┌──────────┐
//! │ Connectors  │──▶│ Dedup + Pace │──▶│  Scorer  │──▶│   Gate   │
//! │  HN / RSS   │   │  (url seen?) │   │ (Gemini) │   │ ≥ thresh │
//! └─────────────┘   └──────────────┘   └──────────┘   └────┬─────┘
//!                                                          ▼
//!                      ┌──────────┐                   ┌──────────┐
//!                      │   HTTP   │◀──────────────────│  SQLite  │
//!                      │ read API │                   │  items   │
//!                      └──────────┘                   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sieve init                    # create database
//! sieve sync                    # one fetch cycle over every source
//! sieve sync lobsters --dry-run # what would be scored
//! sieve items --min-score 80    # list stored items
//! sieve run                     # scheduler + HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Items, score breakdowns, stored rows, stats |
//! | [`error`] | Typed errors for fetch, scoring, storage, ask |
//! | [`traits`] | `Connector` and `Scorer` seams, connector registry |
//! | [`connector_hn`] | Hacker News top stories |
//! | [`connector_rss`] | RSS/Atom feeds |
//! | [`scorer`] | Gemini client, prompts, JSON reply extraction |
//! | [`ratelimit`] | Pacing between scoring calls |
//! | [`gate`] | Dedup check and threshold gate |
//! | [`ingest`] | One fetch cycle over all connectors |
//! | [`scheduler`] | Periodic cycles with shutdown |
//! | [`store`] | Item store trait, SQLite and in-memory backends |
//! | [`ask`] | Question answering about a stored item |
//! | [`server`] | HTTP read API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod config;
pub mod connector_hn;
pub mod connector_rss;
pub mod db;
pub mod error;
pub mod gate;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod ratelimit;
pub mod scheduler;
pub mod scorer;
pub mod server;
pub mod sources;
pub mod stats;
pub mod store;
pub mod traits;
