//! DataBot - Business assistant with bounded conversation memory
//!
//! DataBot answers French-language questions about a small sales table. A
//! question is matched against a handful of keywords and answered from the
//! table; when a hosted language model is configured the question goes
//! through the model first, with the local answer as fallback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────────────────────┐
//! │  CLI (chat)  │   │            HTTP API (axum)               │
//! └──────┬───────┘   │  AppState { bot, memory: Mutex<..> }     │
//!        │           └──────────────────┬───────────────────────┘
//!        └──────────────┬───────────────┘
//!                       ▼
//!              ┌─────────────────┐      ┌──────────────────────┐
//!              │     DataBot     │─────▶│ TextGenerator (LLM)  │
//!              │  intent + data  │      └──────────────────────┘
//!              └───┬─────────┬───┘
//!                  ▼         ▼
//!       ┌────────────┐  ┌──────────────────────┐
//!       │ SalesTable │  │ ConversationMemory   │──▶ JSON snapshot
//!       └────────────┘  └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`memory`]: bounded conversation log with snapshots
//! - [`sales`]: product table, aggregations and report
//! - [`agent`]: keyword routing, text generation, the assistant
//! - [`gateway`]: HTTP handlers and server
//! - [`api`]: application router assembly
//! - [`config`]: configuration management

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod sales;

pub use config::DataBotConfig;
pub use error::{Error, Result};
