//! HTTP gateway for DataBot
//!
//! Serves the assistant and the sales data to a dashboard front-end. Session
//! state travels in [`AppState`], passed to every handler.

mod handler;
mod server;

pub use handler::{assistant_router, AppState};
pub use server::serve;
