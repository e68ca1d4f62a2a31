//! Node handler functions.
//!
//! Handlers take the session state by value, mutate the copy, and return it.
//! Called with no input they emit their entry message and leave routing
//! alone; called with input they record it and do the node's work.

use crate::error::Result;
use crate::rag::RagClient;
use crate::session::{HistoryEntry, NodeId, SessionState};

/// Entry prompt of the name-collection node.
pub const NAME_PROMPT: &str = "Hello! I'm your university assistant. What's your name?";

/// Re-prompt when the provided name is too short.
pub const NAME_REPROMPT: &str = "Could you please provide your full name?";

/// Substituted when the RAG endpoint produced no usable answer.
pub const RAG_APOLOGY: &str = "I'm sorry, I'm having trouble accessing the university \
     information right now. Could you try asking again?";

/// Minimum length of a usable name, after trimming.
const MIN_NAME_LEN: usize = 2;

/// Reset the retry counter when a handler runs for a node the state was not
/// in yet (direct entry without going through the executor's router).
fn enter(state: &mut SessionState, node: NodeId) {
    if state.current_node != node {
        state.current_node = node;
        state.retry_count = 0;
    }
}

/// Personalized greeting for the chat node.
fn greeting(name: &str) -> String {
    format!("Hi {name}! How can I help you with university-related questions today?")
}

/// Farewell message, including the user's name when known.
fn farewell(name: Option<&str>) -> String {
    match name {
        Some(name) => {
            format!("Thank you for using the university assistant, {name}! Have a great day!")
        }
        None => "Thank you for using the university assistant! Have a great day!".to_owned(),
    }
}

/// Collect the user's name for personalized interaction.
pub fn collect_name(mut state: SessionState, user_input: Option<&str>) -> Result<SessionState> {
    enter(&mut state, NodeId::CollectName);

    let Some(input) = user_input else {
        state.next_question = NAME_PROMPT.to_owned();
        state.history.push(HistoryEntry::assistant(NAME_PROMPT));
        return Ok(state);
    };

    state.history.push(HistoryEntry::user(input));

    let name = input.trim();
    if name.chars().count() < MIN_NAME_LEN {
        state.retry_count += 1;
        state.next_question = NAME_REPROMPT.to_owned();
        state.history.push(HistoryEntry::assistant(NAME_REPROMPT));
        return Ok(state);
    }

    state.name = Some(name.to_owned());
    Ok(state)
}

/// Answer university questions through the RAG endpoint.
pub async fn university_chat(
    rag: &RagClient,
    mut state: SessionState,
    user_input: Option<&str>,
) -> Result<SessionState> {
    enter(&mut state, NodeId::UniversityChat);

    let Some(input) = user_input else {
        let message = greeting(state.name.as_deref().unwrap_or("there"));
        state.next_question = message.clone();
        state.history.push(HistoryEntry::assistant(message));
        return Ok(state);
    };

    state.history.push(HistoryEntry::user(input));
    state.last_query = input.to_owned();

    // Farewell turns never spend a RAG request; the router moves to goodbye.
    if super::routes::has_goodbye_intent(input) {
        return Ok(state);
    }

    let answer = rag.query(input, Some(&state.session_id)).await;
    let response = if answer.trim().is_empty() {
        RAG_APOLOGY.to_owned()
    } else {
        answer
    };

    state.next_question = response.clone();
    state.history.push(HistoryEntry::assistant(response));
    Ok(state)
}

/// End the conversation.
pub fn goodbye(mut state: SessionState, _user_input: Option<&str>) -> Result<SessionState> {
    enter(&mut state, NodeId::Goodbye);

    let message = farewell(state.name.as_deref());
    state.next_question = message.clone();
    state.history.push(HistoryEntry::assistant(message));
    state.conversation_ended = true;
    Ok(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::session::Speaker;

    #[test]
    fn collect_name_entry_emits_prompt() {
        let state = collect_name(SessionState::new(), None).unwrap();
        assert_eq!(state.next_question, NAME_PROMPT);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].speaker, Speaker::Assistant);
        assert!(state.name.is_none());
    }

    #[test]
    fn collect_name_rejects_short_names() {
        let state = collect_name(SessionState::new(), Some("a")).unwrap();
        assert!(state.name.is_none());
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.next_question, NAME_REPROMPT);

        let state = collect_name(state, Some("b")).unwrap();
        assert_eq!(state.retry_count, 2);
    }

    #[test]
    fn collect_name_stores_trimmed_name() {
        let state = collect_name(SessionState::new(), Some("  Alice  ")).unwrap();
        assert_eq!(state.name.as_deref(), Some("Alice"));
        assert_eq!(state.retry_count, 0);
        // The user's utterance is recorded verbatim.
        assert_eq!(state.history.last().unwrap().text, "  Alice  ");
    }

    #[test]
    fn goodbye_marks_conversation_ended() {
        let mut state = SessionState::new();
        state.name = Some("Alice".to_owned());
        let state = goodbye(state, None).unwrap();
        assert!(state.conversation_ended);
        assert!(state.next_question.contains("Alice"));
    }

    #[test]
    fn goodbye_without_name_omits_it() {
        let state = goodbye(SessionState::new(), None).unwrap();
        assert!(state.conversation_ended);
        assert_eq!(
            state.next_question,
            "Thank you for using the university assistant! Have a great day!"
        );
    }

    #[test]
    fn farewell_is_idempotent_on_ended_flag() {
        let state = goodbye(SessionState::new(), None).unwrap();
        let state = goodbye(state, Some("hello again")).unwrap();
        assert!(state.conversation_ended);
    }
}
