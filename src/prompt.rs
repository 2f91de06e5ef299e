use crate::chat::ChatMessage;
use crate::index::ScoredChunk;
use crate::rag::ConversationTurn;

/// Placeholder replaced by the retrieved chunk texts
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "Use the following pieces of context to answer the \
user's question. If you don't know the answer, just say that you don't know, don't try to \
make up an answer.\n----------------\n{context}";

const CONDENSE_PROMPT: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

/// Template for the system message that frames every generation request
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    system: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        PromptTemplate {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Use a custom system prompt; context is appended when the placeholder is missing
    pub fn new(system: impl Into<String>) -> Self {
        let mut system = system.into();
        if !system.contains(CONTEXT_PLACEHOLDER) {
            system.push_str("\n\n");
            system.push_str(CONTEXT_PLACEHOLDER);
        }
        PromptTemplate { system }
    }

    /// Render the system message for a set of retrieved chunks
    pub fn render_system(&self, chunks: &[ScoredChunk]) -> String {
        let context = chunks
            .iter()
            .map(|c| c.chunk.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.system.replace(CONTEXT_PLACEHOLDER, &context)
    }

    /// Assemble the full request: system framing, history, then the question
    pub fn build_messages(
        &self,
        chunks: &[ScoredChunk],
        history: &[ConversationTurn],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(self.render_system(chunks)));
        for turn in history {
            messages.push(ChatMessage::user(turn.question.as_str()));
            messages.push(ChatMessage::assistant(turn.answer.as_str()));
        }
        messages.push(ChatMessage::user(question));
        messages
    }
}

/// Messages asking the model to rewrite a follow-up as a standalone question
pub fn condense_messages(history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
    let transcript = history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::system(CONDENSE_PROMPT),
        ChatMessage::user(format!(
            "Chat History:\n{}\nFollow Up Input: {}\nStandalone question:",
            transcript, question
        )),
    ]
}
