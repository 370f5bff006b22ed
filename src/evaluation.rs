use std::collections::BTreeMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::quiz::QuizQuestion;

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Количество правильных:\s*(\d+)\s*из\s*(\d+)").expect("valid score regex"));
static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Количество правильных:\s*(\d+(?:[.,]\d+)?)\s*%").expect("valid percentage regex"));
static RECOMMENDATIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Рекомендации:\s*(.*)").expect("valid recommendations regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
}

/// The user's answers keyed by question number, serialized as
/// `{"1": {"question": ..., "answer": ...}, ...}` for the evaluator prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet {
    answers: BTreeMap<u32, AnsweredQuestion>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question: &QuizQuestion, answer: impl Into<String>) {
        self.answers.insert(
            question.number(),
            AnsweredQuestion {
                question: question.title(),
                answer: answer.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn get(&self, number: u32) -> Option<&AnsweredQuestion> {
        self.answers.get(&number)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse answer sheet")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize answer sheet")
    }
}

/// Parsed reply to an answer check: `Количество правильных: N из M`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: u32,
    pub total: u32,
    pub recommendations: String,
}

impl Evaluation {
    /// Returns `None` when the reply does not carry a score, e.g. when the
    /// evaluator gave up and returned its diagnostic text.
    pub fn parse(reply: &str) -> Option<Self> {
        let caps = SCORE_RE.captures(reply)?;
        let correct = caps[1].parse().ok()?;
        let total = caps[2].parse().ok()?;
        Some(Self {
            correct,
            total,
            recommendations: recommendations(reply),
        })
    }

    /// Correct and incorrect shares in percent, rounded to whole numbers.
    pub fn percentages(&self) -> (f64, f64) {
        if self.total == 0 {
            return (0.0, 100.0);
        }
        let correct = (f64::from(self.correct.min(self.total)) * 100.0 / f64::from(self.total))
            .round();
        (correct, 100.0 - correct)
    }
}

/// Parsed reply to a result summary: `Количество правильных: N%`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub correct_percentage: f64,
    pub recommendations: String,
}

impl ResultSummary {
    pub fn parse(reply: &str) -> Option<Self> {
        let caps = PERCENT_RE.captures(reply)?;
        let correct_percentage = caps[1].replace(',', ".").parse().ok()?;
        Some(Self {
            correct_percentage,
            recommendations: recommendations(reply),
        })
    }
}

fn recommendations(reply: &str) -> String {
    RECOMMENDATIONS_RE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
