//! Workflow executor: dispatches a node's handler and router, contains
//! handler failures, and chases one transition so entry messages land in the
//! same turn.

use crate::rag::RagClient;
use crate::session::{NodeId, SessionState};
use crate::workflow::{nodes, routes};
use std::sync::Arc;
use tracing::{error, info};

/// Generic apology surfaced when a handler fails.
pub const GENERIC_APOLOGY: &str = "I'm sorry, I encountered an error. Please try again.";

/// Executes conversation nodes against a session state.
pub struct WorkflowExecutor {
    rag: Arc<RagClient>,
}

impl WorkflowExecutor {
    #[must_use]
    pub fn new(rag: Arc<RagClient>) -> Self {
        Self { rag }
    }

    /// Execute one node: handler, then (on non-empty input) its router.
    ///
    /// The returned state always carries a valid `current_node`. A handler
    /// failure never propagates: it is recorded in `state.error` and the
    /// turn degrades to a generic apology on the unchanged node.
    pub async fn execute(
        &self,
        node: NodeId,
        state: &SessionState,
        user_input: Option<&str>,
    ) -> SessionState {
        let input = user_input.map(str::trim).filter(|s| !s.is_empty());
        info!("executing node: {node} (input: {})", input.is_some());

        let result = match node {
            NodeId::CollectName => nodes::collect_name(state.clone(), input),
            NodeId::UniversityChat => {
                nodes::university_chat(&self.rag, state.clone(), input).await
            }
            NodeId::Goodbye => nodes::goodbye(state.clone(), input),
        };

        let mut updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                error!("error executing node '{node}': {e}");
                let mut fallback = state.clone();
                fallback.error = Some(format!("error in {node}: {e}"));
                fallback.next_question = GENERIC_APOLOGY.to_owned();
                fallback.current_node = node;
                return fallback;
            }
        };

        let next = if input.is_some() {
            routes::route(node, &updated)
        } else {
            node
        };

        if next != node {
            info!("router moved {node} -> {next}");
            updated.retry_count = 0;
        }
        updated.current_node = next;
        updated
    }

    /// Run one full conversation turn from the state's current node.
    ///
    /// When the router moves to a different node, that node is executed once
    /// more with no input so its entry message (greeting, farewell) is part
    /// of the same turn. Entry executions carry no input and therefore never
    /// route further.
    pub async fn run_turn(&self, state: &SessionState, user_input: Option<&str>) -> SessionState {
        let entered = state.current_node;
        let mut updated = self.execute(entered, state, user_input).await;

        if updated.current_node != entered {
            let next = updated.current_node;
            updated = self.execute(next, &updated, None).await;
        }

        updated
    }
}
