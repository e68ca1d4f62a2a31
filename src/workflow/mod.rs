//! Conversation state machine: collect name → university chat → goodbye.
//!
//! Each node pairs a handler (mutates a copy of the session state, may call
//! the RAG endpoint) with a pure router (maps the updated state to the next
//! node). The executor dispatches both and contains handler failures so a
//! broken turn degrades to an apology instead of an error response.

pub mod executor;
pub mod nodes;
pub mod routes;

pub use executor::WorkflowExecutor;
