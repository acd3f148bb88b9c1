use serde::{Deserialize, Serialize};

/// `special_context` value for records produced without a context prefix.
pub const NO_CONTEXT_MARKER: &str = "no_prompt";

/// One line of the questions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub category: String,
}

/// One line of the contexts file: a named prompt prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub context: String,
    pub category: String,
}

/// One line of the output file. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question: String,
    pub category: String,
    pub response: String,
    pub num_prompt_tokens: u64,
    pub num_response_tokens: u64,
    pub special_context: String,
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f64,
}

/// Model parameters shared by every request of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f64,
}

/// A single-message completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u64,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            prompt: prompt.into(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
    Text(String),
    /// Tool calls, reasoning blocks and anything else that is not plain text.
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Raw provider response: content segments in order plus token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: Vec<ContentSegment>,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn text(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: vec![ContentSegment::Text(text.into())],
            usage,
        }
    }

    /// Text of the first content segment, if that segment is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentSegment::Text(text)) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_ignores_later_segments() {
        let completion = Completion {
            content: vec![ContentSegment::Other, ContentSegment::Text("late".into())],
            usage: TokenUsage::default(),
        };
        assert_eq!(completion.first_text(), None);
        assert_eq!(
            Completion::text("A1", TokenUsage::default()).first_text(),
            Some("A1")
        );
    }

    #[test]
    fn question_lines_tolerate_extra_keys() {
        let question: Question =
            serde_json::from_str(r#"{"question":"Q","category":"C","id":7}"#).unwrap();
        assert_eq!(question.question, "Q");
        assert_eq!(question.category, "C");
    }
}
