//! # weft
//!
//! The application layer of weft: HTTP API, CLI and configuration around
//! the synchronous `weft-core` engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    apps/weft (THE BINARY)                │
//! │                                                          │
//! │   ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   │
//! │   │    CLI      │   │  HTTP API   │   │   Config     │   │
//! │   │   (clap)    │   │   (axum)    │   │   (toml)     │   │
//! │   └──────┬──────┘   └──────┬──────┘   └──────┬───────┘   │
//! │          └─────────────────┼─────────────────┘           │
//! │                            ▼                             │
//! │                    ┌───────────────┐                     │
//! │                    │   weft-core   │                     │
//! │                    │  (THE LOGIC)  │                     │
//! │                    └───────────────┘                     │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod config;
