//! Agent routing and flashcard generation
//!
//! A lightweight keyword classifier routes each chat query to one of three
//! agents (learning, flashcard, study), each of which is just a system prompt
//! over the shared chat model. Flashcard output is requested as JSON and
//! repaired before parsing, with deterministic fallback cards when the model
//! produces nothing usable.

use serde::Serialize;

use crate::error::Result;
use crate::llm::LlmService;

const LEARNING_PROMPT: &str = "You are an educational AI assistant. Help students with learning concepts, \
     study strategies, and academic questions. Provide clear, encouraging responses.";

const FLASHCARD_PROMPT: &str = "You are a flashcard generator. Create educational flashcards in JSON format. \
     Always respond with a JSON array of objects with 'question' and 'answer' keys.";

const STUDY_PROMPT: &str = "You are a study coach. Help students with study techniques, time management, \
     and learning strategies. Provide practical, actionable advice.";

const FALLBACK_RESPONSE: &str =
    "I'm here to help with your learning. Could you please rephrase your question?";

const MAX_CARD_FIELD_LEN: usize = 500;

/// Chat query intent, decided by keyword scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Flashcard,
    Study,
    Learning,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Flashcard => "flashcard",
            Intent::Study => "study",
            Intent::Learning => "learning",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            Intent::Flashcard => FLASHCARD_PROMPT,
            Intent::Study => STUDY_PROMPT,
            Intent::Learning => LEARNING_PROMPT,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Intent::Flashcard => &["flashcard", "card", "quiz", "test", "review", "memorize"],
            Intent::Study => &[
                "study", "learn", "practice", "technique", "method", "strategy", "time",
            ],
            Intent::Learning => &[
                "explain", "what", "how", "why", "concept", "understand", "help",
            ],
        }
    }
}

/// Classify a query by counting keyword hits per intent.
/// Ties break toward flashcard, then study; no hits means learning.
pub fn classify_intent(query: &str) -> Intent {
    let query_lower = query.to_lowercase();
    let mut best = Intent::Learning;
    let mut best_score = 0usize;
    for intent in [Intent::Flashcard, Intent::Study, Intent::Learning] {
        let score = intent
            .keywords()
            .iter()
            .filter(|kw| query_lower.contains(**kw))
            .count();
        if score > best_score {
            best = intent;
            best_score = score;
        }
    }
    best
}

/// A simple Q/A pair produced by the flashcard agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedCard {
    pub question: String,
    pub answer: String,
}

/// Routes queries to the right agent and runs it
#[derive(Clone)]
pub struct Supervisor {
    llm: LlmService,
}

impl Supervisor {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    /// Agent names and their descriptions
    pub fn available_agents() -> Vec<(&'static str, &'static str)> {
        vec![
            ("learning", "General learning assistance"),
            ("flashcard", "Flashcard generation"),
            ("study", "Study coaching and techniques"),
        ]
    }

    /// Route a chat query to the matching agent and return its reply.
    /// Never fails toward the caller: errors become the fallback response.
    pub async fn respond(&self, user_id: Option<i64>, query: &str, context: &str) -> String {
        let intent = classify_intent(query);
        tracing::info!(intent = intent.as_str(), "Routing chat query");

        if intent == Intent::Flashcard {
            let topic = strip_flashcard_words(query);
            let cards = self.generate_flashcards(user_id, &topic, 5).await;
            return format!("Generated {} flashcards about {}", cards.len(), topic);
        }

        let prompt = if context.is_empty() {
            query.to_string()
        } else {
            format!("Context: {}\n\nQuestion: {}", context, query)
        };

        match self
            .llm
            .complete(user_id, intent.system_prompt(), &prompt)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Agent completion failed");
                FALLBACK_RESPONSE.to_string()
            }
        }
    }

    /// Ask the model for `num_cards` flashcards about a topic.
    /// Falls back to stock cards if the model output cannot be parsed.
    pub async fn generate_flashcards(
        &self,
        user_id: Option<i64>,
        topic: &str,
        num_cards: usize,
    ) -> Vec<GeneratedCard> {
        let prompt = format!(
            "Generate exactly {} flashcards about: {}. Return only valid JSON array format: \
             [{{\"question\": \"...\", \"answer\": \"...\"}}]",
            num_cards, topic
        );

        let response = match self.llm.complete(user_id, FLASHCARD_PROMPT, &prompt).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Flashcard generation failed");
                return fallback_cards(topic, num_cards);
            }
        };

        match extract_cards(&response, num_cards) {
            Ok(cards) if !cards.is_empty() => cards,
            _ => fallback_cards(topic, num_cards),
        }
    }
}

/// Strip routing keywords to recover the topic from a flashcard request
fn strip_flashcard_words(query: &str) -> String {
    query
        .replace("flashcard", "")
        .replace("card", "")
        .trim()
        .to_string()
}

/// Extract a card list from model output: locate the JSON array, repair
/// common model mistakes (trailing commas, embedded newlines), then parse
/// and validate each element.
pub fn extract_cards(response: &str, num_cards: usize) -> Result<Vec<GeneratedCard>> {
    let start = response.find('[');
    let end = response.rfind(']');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => return Ok(Vec::new()),
    };

    let mut json_str: String = response[start..=end]
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let parsed: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(_) => {
            json_str = json_str.replace(",}", "}").replace(",]", "]");
            serde_json::from_str(&json_str)
                .map_err(|e| crate::error::Error::Llm(format!("unparseable card JSON: {}", e)))?
        }
    };

    let mut cards = Vec::new();
    if let Some(items) = parsed.as_array() {
        for item in items {
            let question = item.get("question").and_then(|v| v.as_str());
            let answer = item.get("answer").and_then(|v| v.as_str());
            if let (Some(question), Some(answer)) = (question, answer) {
                cards.push(GeneratedCard {
                    question: truncate(question.trim(), MAX_CARD_FIELD_LEN),
                    answer: truncate(answer.trim(), MAX_CARD_FIELD_LEN),
                });
            }
            if cards.len() == num_cards {
                break;
            }
        }
    }
    Ok(cards)
}

/// Stock cards returned when generation fails outright
pub fn fallback_cards(topic: &str, num_cards: usize) -> Vec<GeneratedCard> {
    let mut cards = vec![
        GeneratedCard {
            question: format!("What is {}?", topic),
            answer: format!(
                "A concept related to {}. Please regenerate for better content.",
                topic
            ),
        },
        GeneratedCard {
            question: format!("Why is {} important?", topic),
            answer: format!(
                "{} is important for learning. Please regenerate for detailed content.",
                topic
            ),
        },
    ];
    cards.truncate(num_cards);
    cards
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_flashcard() {
        assert_eq!(classify_intent("make me flashcards about rust"), Intent::Flashcard);
        assert_eq!(classify_intent("quiz me on spanish"), Intent::Flashcard);
    }

    #[test]
    fn test_classify_study() {
        assert_eq!(
            classify_intent("give me a study technique for time management"),
            Intent::Study
        );
    }

    #[test]
    fn test_classify_learning_default() {
        assert_eq!(classify_intent(""), Intent::Learning);
        assert_eq!(classify_intent("bonjour"), Intent::Learning);
        assert_eq!(classify_intent("explain this concept"), Intent::Learning);
    }

    #[test]
    fn test_extract_cards_clean_json() {
        let response = r#"Here you go: [{"question": "Q1", "answer": "A1"}, {"question": "Q2", "answer": "A2"}]"#;
        let cards = extract_cards(response, 5).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "Q1");
        assert_eq!(cards[1].answer, "A2");
    }

    #[test]
    fn test_extract_cards_repairs_trailing_comma() {
        let response = r#"[{"question": "Q", "answer": "A",},]"#;
        let cards = extract_cards(response, 5).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn test_extract_cards_skips_malformed_entries() {
        let response = r#"[{"question": "Q", "answer": "A"}, {"question": "only q"}, 42]"#;
        let cards = extract_cards(response, 5).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn test_extract_cards_respects_limit() {
        let response = r#"[{"question": "1", "answer": "a"}, {"question": "2", "answer": "b"}, {"question": "3", "answer": "c"}]"#;
        let cards = extract_cards(response, 2).unwrap();
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn test_extract_cards_no_array() {
        let cards = extract_cards("sorry, I can't do that", 5).unwrap();
        assert!(cards.is_empty());
    }

    #[test]
    fn test_fallback_cards() {
        let cards = fallback_cards("rust", 5);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "What is rust?");

        let cards = fallback_cards("rust", 1);
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn test_strip_flashcard_words() {
        assert_eq!(strip_flashcard_words("flashcard rust ownership"), "rust ownership");
    }
}
