use serde::{Deserialize, Serialize};

/// A single detected quiz question with its chosen answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question number as printed on screen, e.g. "13".
    pub number: String,
    pub question: String,
    /// Chosen answer, e.g. "A", "B" or "True".
    pub answer: String,
}

/// Outcome of one successful screen analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub questions: Vec<QuizQuestion>,
    /// Unix timestamp of when the result was produced.
    pub timestamp: i64,
    #[serde(default)]
    pub total_questions: usize,
}

impl QuizResult {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let total_questions = questions.len();
        Self {
            questions,
            timestamp: chrono::Utc::now().timestamp(),
            total_questions,
        }
    }

    /// Compact popup rendering: one truncated question line followed by the
    /// answer line, no header.
    pub fn format_display(&self) -> String {
        let mut lines = Vec::new();
        for q in &self.questions {
            let words: Vec<&str> = q.question.split_whitespace().collect();
            let short: String = if words.len() > 7 {
                format!("{}...", words[..7].join(" "))
            } else {
                words.join(" ")
            };
            lines.push(format!("Question {}: {}", q.number, short));
            lines.push(format!("-> {}", q.answer));
        }
        lines.join("\n").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(number: &str, text: &str, answer: &str) -> QuizQuestion {
        QuizQuestion {
            number: number.into(),
            question: text.into(),
            answer: answer.into(),
        }
    }

    #[test]
    fn format_display_truncates_long_questions() {
        let result = QuizResult::new(vec![question(
            "3",
            "one two three four five six seven eight nine",
            "B",
        )]);
        let text = result.format_display();
        assert!(text.contains("Question 3: one two three four five six seven..."));
        assert!(text.ends_with("-> B"));
    }

    #[test]
    fn format_display_keeps_short_questions_intact() {
        let result = QuizResult::new(vec![question("1", "What is Rust?", "A")]);
        assert_eq!(result.format_display(), "Question 1: What is Rust?\n-> A");
    }

    #[test]
    fn total_questions_tracks_len() {
        let result = QuizResult::new(vec![
            question("1", "q", "A"),
            question("2", "q", "B"),
        ]);
        assert_eq!(result.total_questions, 2);
    }
}
