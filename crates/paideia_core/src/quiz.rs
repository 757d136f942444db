//! Quiz document model and weighted question selection.
//!
//! A `QuizDocument` is plain serialisable data: the authoring agent mutates it
//! through tools, the worker persists it as JSON, the request layer samples
//! questions from it. Selection is two-step: pick a section weighted by its
//! average eligible question weight, then a question inside it weighted by its
//! own weight.

use crate::question::Question;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("quiz has no sections")]
    NoSections,
    #[error("quiz has no questions in any section")]
    NoQuestions,
    #[error("section index {0} out of range")]
    SectionOutOfRange(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            questions: Vec::new(),
        }
    }

    /// Average weight of the questions eligible under `first_question`.
    /// A section with zero eligible questions contributes zero sampling mass.
    fn eligible_mass(&self, first_question: bool) -> f64 {
        let eligible: Vec<f64> = self
            .questions
            .iter()
            .filter(|q| !(first_question && q.is_short_answer()))
            .map(|q| q.weight())
            .collect();
        if eligible.is_empty() {
            return 0.0;
        }
        eligible.iter().sum::<f64>() / eligible.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_material: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl QuizDocument {
    pub fn new(title: impl Into<String>, source_material: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_material: source_material.into(),
            sections: Vec::new(),
        }
    }

    pub fn total_question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    pub fn add_section(&mut self, name: impl Into<String>) -> usize {
        self.sections.push(Section::new(name));
        self.sections.len() - 1
    }

    pub fn section_mut(&mut self, idx: usize) -> Result<&mut Section, QuizError> {
        self.sections
            .get_mut(idx)
            .ok_or(QuizError::SectionOutOfRange(idx))
    }

    pub fn question(&self, section_idx: usize, question_idx: usize) -> Option<&Question> {
        self.sections.get(section_idx)?.questions.get(question_idx)
    }

    /// Pick `(section_idx, question_idx)` by weight.
    ///
    /// When `first_question` is set, short-answer items are excluded; if that
    /// leaves nothing eligible the pool silently widens to every question
    /// (logged, never an error). A pool whose weights sum to zero falls back
    /// to a uniform pick among the eligible items.
    pub fn pick_question(&self, first_question: bool) -> Result<(usize, usize), QuizError> {
        if self.sections.is_empty() {
            return Err(QuizError::NoSections);
        }
        if self.total_question_count() == 0 {
            return Err(QuizError::NoQuestions);
        }

        if first_question {
            let any_eligible = self
                .sections
                .iter()
                .flat_map(|s| &s.questions)
                .any(|q| !q.is_short_answer());
            if !any_eligible {
                tracing::warn!(
                    "first-question preference cannot be met, widening to all questions"
                );
                return self.pick_question(false);
            }
        }

        let mut rng = rand::thread_rng();

        let section_idx = {
            let masses: Vec<f64> = self
                .sections
                .iter()
                .map(|s| s.eligible_mass(first_question))
                .collect();
            let candidates: Vec<usize> = (0..masses.len()).filter(|&i| masses[i] > 0.0).collect();
            if candidates.is_empty() {
                // Every eligible question has zero weight; pick uniformly among
                // sections that hold at least one eligible question.
                let nonempty: Vec<usize> = (0..self.sections.len())
                    .filter(|&i| {
                        self.sections[i]
                            .questions
                            .iter()
                            .any(|q| !(first_question && q.is_short_answer()))
                    })
                    .collect();
                *nonempty.choose(&mut rng).ok_or(QuizError::NoQuestions)?
            } else {
                let weights: Vec<f64> = candidates.iter().map(|&i| masses[i]).collect();
                let dist = WeightedIndex::new(&weights).map_err(|_| QuizError::NoQuestions)?;
                candidates[dist.sample(&mut rng)]
            }
        };

        let section = &self.sections[section_idx];
        let eligible: Vec<usize> = (0..section.questions.len())
            .filter(|&j| !(first_question && section.questions[j].is_short_answer()))
            .collect();
        debug_assert!(!eligible.is_empty());

        let weights: Vec<f64> = eligible
            .iter()
            .map(|&j| section.questions[j].weight())
            .collect();
        let question_idx = if weights.iter().sum::<f64>() > 0.0 {
            let dist = WeightedIndex::new(&weights).map_err(|_| QuizError::NoQuestions)?;
            eligible[dist.sample(&mut rng)]
        } else {
            *eligible.choose(&mut rng).ok_or(QuizError::NoQuestions)?
        };

        Ok((section_idx, question_idx))
    }
}

/// Suggested item count for a generated quiz: sub-linear in source length.
/// `clamp(round(k × √word_count), min, max)`.
pub fn suggested_size(source: &str, k: f64, min: usize, max: usize) -> usize {
    let words = source.split_whitespace().count();
    let size = (k * (words as f64).sqrt()).round() as usize;
    size.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(text: &str, weight: f64) -> Question {
        Question::MultipleChoice {
            question: text.into(),
            correct_answers: vec!["a".into()],
            wrong_answers: vec!["b".into(), "c".into()],
            explanation: "e".into(),
            weight,
        }
    }

    fn short(text: &str) -> Question {
        Question::ShortAnswer {
            question: text.into(),
            correct_answer: vec!["a".into()],
            explanation: "e".into(),
            grading_instructions: "g".into(),
            weight: 1.0,
        }
    }

    #[test]
    fn test_suggested_size_midrange() {
        let source = "word ".repeat(2500);
        let size = suggested_size(&source, 0.35, 6, 30);
        // 0.35 × √2500 = 17.5; either rounding is acceptable
        assert!((17..=18).contains(&size));
    }

    #[test]
    fn test_suggested_size_clamps() {
        assert_eq!(suggested_size("one two three", 0.35, 6, 30), 6);
        let long = "word ".repeat(100_000);
        assert_eq!(suggested_size(&long, 0.35, 6, 30), 30);
    }

    #[test]
    fn test_pick_errors_on_empty() {
        let doc = QuizDocument::new("t", "s");
        assert!(matches!(doc.pick_question(false), Err(QuizError::NoSections)));

        let mut doc = QuizDocument::new("t", "s");
        doc.add_section("empty");
        assert!(matches!(doc.pick_question(false), Err(QuizError::NoQuestions)));
    }

    #[test]
    fn test_first_pick_avoids_short_answer() {
        let mut doc = QuizDocument::new("t", "s");
        let idx = doc.add_section("mixed");
        doc.sections[idx].questions.push(short("sa"));
        doc.sections[idx].questions.push(mcq("mc", 1.0));
        for _ in 0..50 {
            let (s, q) = doc.pick_question(true).unwrap();
            assert!(!doc.question(s, q).unwrap().is_short_answer());
        }
    }

    #[test]
    fn test_first_pick_widens_when_only_short_answers() {
        let mut doc = QuizDocument::new("t", "s");
        let idx = doc.add_section("only short");
        doc.sections[idx].questions.push(short("sa"));
        let (s, q) = doc.pick_question(true).unwrap();
        assert_eq!((s, q), (0, 0));
    }

    #[test]
    fn test_zero_weight_section_never_picked() {
        let mut doc = QuizDocument::new("t", "s");
        let a = doc.add_section("dead");
        doc.sections[a].questions.push(mcq("never", 0.0));
        let b = doc.add_section("live");
        doc.sections[b].questions.push(mcq("always", 1.0));
        for _ in 0..50 {
            let (s, _) = doc.pick_question(false).unwrap();
            assert_eq!(s, b);
        }
    }

    #[test]
    fn test_all_zero_weights_uniform_fallback() {
        let mut doc = QuizDocument::new("t", "s");
        let idx = doc.add_section("flat");
        doc.sections[idx].questions.push(mcq("x", 0.0));
        doc.sections[idx].questions.push(mcq("y", 0.0));
        // Should not error even though the total mass is zero.
        let (s, q) = doc.pick_question(false).unwrap();
        assert_eq!(s, 0);
        assert!(q < 2);
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let mut doc = QuizDocument::new("Biology Basics", "cells and things");
        let a = doc.add_section("Cells");
        doc.sections[a].questions.push(mcq("What is a cell?", 1.0));
        doc.sections[a].questions.push(Question::TrueFalseQuestion {
            question: "Mitochondria make ATP.".into(),
            correct_answers: vec!["True".into()],
            wrong_answers: vec!["False".into()],
            explanation: "They are the powerhouse.".into(),
            weight: 2.0,
        });
        doc.sections[a].questions.push(short("Define osmosis."));
        let b = doc.add_section("Genetics");
        doc.sections[b].questions.push(mcq("What is DNA?", 0.5));
        doc.sections[b].questions.push(mcq("What is RNA?", 1.5));

        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: QuizDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(back.title, doc.title);
        assert_eq!(back.sections.len(), 2);
        assert_eq!(back.sections[0].questions.len(), 3);
        assert_eq!(back.sections[1].questions.len(), 2);
        for (orig, round) in doc
            .sections
            .iter()
            .flat_map(|s| &s.questions)
            .zip(back.sections.iter().flat_map(|s| &s.questions))
        {
            assert_eq!(orig.text(), round.text());
            assert_eq!(orig.explanation(), round.explanation());
            assert_eq!(orig.weight(), round.weight());
        }
        if let Question::MultipleChoice { correct_answers, wrong_answers, .. } =
            &back.sections[0].questions[0]
        {
            assert_eq!(correct_answers, &vec!["a".to_string()]);
            assert_eq!(wrong_answers, &vec!["b".to_string(), "c".to_string()]);
        } else {
            panic!("expected MultipleChoice");
        }
    }
}
