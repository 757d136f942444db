use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

/// A quiz item. Closed over the three kinds the platform supports, so a new
/// kind is a compile-time exhaustiveness failure everywhere it matters.
///
/// The serde representation matches the persisted quiz-file format: a `type`
/// tag plus per-variant fields (`ShortAnswer` keeps its historical
/// `correct_answer` / `grading_instructions` names).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Question {
    MultipleChoice {
        question: String,
        correct_answers: Vec<String>,
        wrong_answers: Vec<String>,
        explanation: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    TrueFalseQuestion {
        question: String,
        correct_answers: Vec<String>,
        wrong_answers: Vec<String>,
        explanation: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    ShortAnswer {
        question: String,
        correct_answer: Vec<String>,
        explanation: String,
        #[serde(default)]
        grading_instructions: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Question::MultipleChoice { question, .. }
            | Question::TrueFalseQuestion { question, .. }
            | Question::ShortAnswer { question, .. } => question,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            Question::MultipleChoice { explanation, .. }
            | Question::TrueFalseQuestion { explanation, .. }
            | Question::ShortAnswer { explanation, .. } => explanation,
        }
    }

    /// Sampling weight. Invariant: never negative (clamped on construction
    /// paths; a zero weight removes the item from the sampling mass).
    pub fn weight(&self) -> f64 {
        let w = match self {
            Question::MultipleChoice { weight, .. }
            | Question::TrueFalseQuestion { weight, .. }
            | Question::ShortAnswer { weight, .. } => *weight,
        };
        w.max(0.0)
    }

    /// Short-answer items are excluded from the first pick of a session.
    pub fn is_short_answer(&self) -> bool {
        matches!(self, Question::ShortAnswer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_defaults_to_one() {
        let q: Question = serde_json::from_str(
            r#"{"type":"MultipleChoice","question":"q","correct_answers":["a"],"wrong_answers":["b"],"explanation":"e"}"#,
        )
        .unwrap();
        assert_eq!(q.weight(), 1.0);
    }

    #[test]
    fn test_negative_weight_clamped() {
        let q = Question::ShortAnswer {
            question: "q".into(),
            correct_answer: vec!["a".into()],
            explanation: "e".into(),
            grading_instructions: String::new(),
            weight: -2.0,
        };
        assert_eq!(q.weight(), 0.0);
    }

    #[test]
    fn test_type_tag_round_trip() {
        let q = Question::TrueFalseQuestion {
            question: "The sky is green.".into(),
            correct_answers: vec!["False".into()],
            wrong_answers: vec!["True".into()],
            explanation: "It is blue.".into(),
            weight: 1.0,
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains(r#""type":"TrueFalseQuestion""#));
        let back: Question = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Question::TrueFalseQuestion { .. }));
    }
}
