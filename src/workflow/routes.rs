//! Pure router functions: updated state → next node.

use crate::session::{NodeId, SessionState};

/// Keywords that signal the user wants to end the conversation.
///
/// Matched case-insensitively as substrings of the user's utterance.
pub const GOODBYE_KEYWORDS: &[&str] = &[
    "bye", "goodbye", "see you", "thanks", "thank you", "exit", "quit", "end", "stop",
];

/// Whether an utterance carries goodbye intent.
#[must_use]
pub fn has_goodbye_intent(text: &str) -> bool {
    let lowered = text.to_lowercase();
    GOODBYE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Route out of the name-collection node once a name was stored.
#[must_use]
pub fn collect_name_router(state: &SessionState) -> NodeId {
    if state.name.is_some() {
        NodeId::UniversityChat
    } else {
        NodeId::CollectName
    }
}

/// Route out of the chat node when the last utterance said goodbye.
#[must_use]
pub fn university_chat_router(state: &SessionState) -> NodeId {
    if has_goodbye_intent(&state.last_query) {
        NodeId::Goodbye
    } else {
        NodeId::UniversityChat
    }
}

/// The goodbye node is terminal.
#[must_use]
pub fn goodbye_router(_state: &SessionState) -> NodeId {
    NodeId::Goodbye
}

/// Dispatch to the router belonging to `node`.
#[must_use]
pub fn route(node: NodeId, state: &SessionState) -> NodeId {
    match node {
        NodeId::CollectName => collect_name_router(state),
        NodeId::UniversityChat => university_chat_router(state),
        NodeId::Goodbye => goodbye_router(state),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn goodbye_intent_is_case_insensitive() {
        assert!(has_goodbye_intent("THANKS"));
        assert!(has_goodbye_intent("Bye for now"));
        assert!(has_goodbye_intent("I think I'll QUIT here"));
        assert!(!has_goodbye_intent("tell me about admissions"));
    }

    #[test]
    fn goodbye_intent_matches_substrings() {
        assert!(has_goodbye_intent("thank you, that was helpful"));
        assert!(has_goodbye_intent("see you tomorrow"));
    }

    #[test]
    fn collect_name_routes_on_stored_name() {
        let mut state = SessionState::new();
        assert_eq!(collect_name_router(&state), NodeId::CollectName);
        state.name = Some("Alice".to_owned());
        assert_eq!(collect_name_router(&state), NodeId::UniversityChat);
    }

    #[test]
    fn university_chat_routes_on_last_query() {
        let mut state = SessionState::new();
        state.last_query = "what are the tuition fees?".to_owned();
        assert_eq!(university_chat_router(&state), NodeId::UniversityChat);
        state.last_query = "thank you, bye".to_owned();
        assert_eq!(university_chat_router(&state), NodeId::Goodbye);
    }

    #[test]
    fn goodbye_is_terminal() {
        let state = SessionState::new();
        assert_eq!(goodbye_router(&state), NodeId::Goodbye);
        assert_eq!(route(NodeId::Goodbye, &state), NodeId::Goodbye);
    }
}
