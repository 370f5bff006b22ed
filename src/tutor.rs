use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::evaluation::AnswerSheet;
use crate::llm::{CompletionBackend, CompletionOutcome, RetryPolicy, complete_with_retry};
use crate::prompts;
use crate::quiz::clean_questions_text;

pub const MATERIAL_ATTEMPTS: u32 = 30;
pub const DEFAULT_ATTEMPTS: u32 = 10;

const MATERIAL_FAILURE: &str = "Error generating lesson material";
const QUESTIONS_FAILURE: &str = "Error generating quiz questions";
const EVALUATION_FAILURE: &str = "Error checking answers";

/// Retry budgets for each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicies {
    pub material: RetryPolicy,
    pub questions: RetryPolicy,
    pub answers: RetryPolicy,
    pub result: RetryPolicy,
}

impl Default for CallPolicies {
    fn default() -> Self {
        Self {
            material: RetryPolicy::with_attempts(MATERIAL_ATTEMPTS),
            questions: RetryPolicy::with_attempts(DEFAULT_ATTEMPTS),
            answers: RetryPolicy::with_attempts(DEFAULT_ATTEMPTS),
            result: RetryPolicy::with_attempts(DEFAULT_ATTEMPTS),
        }
    }
}

/// Generates lessons, quizzes and feedback through a completion backend.
///
/// Every method returns display text: either the model's reply or, once the
/// retry budget is spent, a diagnostic line naming the attempt count and the
/// last error.
pub struct Tutor<B, R = StdRng> {
    backend: B,
    rng: Mutex<R>,
    policies: CallPolicies,
}

impl<B: CompletionBackend> Tutor<B, StdRng> {
    pub fn new(backend: B) -> Self {
        Self::with_rng(backend, StdRng::from_os_rng())
    }
}

impl<B: CompletionBackend, R: Rng> Tutor<B, R> {
    pub fn with_rng(backend: B, rng: R) -> Self {
        Self {
            backend,
            rng: Mutex::new(rng),
            policies: CallPolicies::default(),
        }
    }

    pub fn with_policies(mut self, policies: CallPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policies(&self) -> &CallPolicies {
        &self.policies
    }

    fn with_rng_locked<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng)
    }

    /// Lesson text on the syntax of `language` for the given day.
    pub async fn generate_material(&self, language: &str, difficulty: &str) -> String {
        let prompt =
            self.with_rng_locked(|rng| prompts::material_prompt(rng, language, difficulty));
        complete_with_retry(
            &self.backend,
            "generate_material",
            &prompt,
            &self.policies.material,
        )
        .await
        .into_text(MATERIAL_FAILURE)
    }

    /// Raw 15-question quiz as returned by the model.
    pub async fn generate_questions(
        &self,
        language: &str,
        material: &str,
        difficulty: &str,
    ) -> String {
        self.request_questions(language, material, difficulty)
            .await
            .into_text(QUESTIONS_FAILURE)
    }

    /// Like [`Tutor::generate_questions`], but a successful reply is passed
    /// through [`clean_questions_text`]. Diagnostics are returned untouched.
    pub async fn generate_quiz(&self, language: &str, material: &str, difficulty: &str) -> String {
        match self.request_questions(language, material, difficulty).await {
            CompletionOutcome::Completed(raw) => clean_questions_text(&raw),
            exhausted => exhausted.into_text(QUESTIONS_FAILURE),
        }
    }

    async fn request_questions(
        &self,
        language: &str,
        material: &str,
        difficulty: &str,
    ) -> CompletionOutcome {
        let prompt = prompts::questions_prompt(language, material, difficulty);
        complete_with_retry(
            &self.backend,
            "generate_questions",
            &prompt,
            &self.policies.questions,
        )
        .await
    }

    /// Scores answers; the reply is expected to read
    /// `Количество правильных: N из 15` followed by `Рекомендации: ...`.
    pub async fn evaluate_answers(&self, language: &str, questions_with_answers: &str) -> String {
        let prompt = prompts::evaluation_prompt(language, questions_with_answers);
        complete_with_retry(
            &self.backend,
            "evaluate_answers",
            &prompt,
            &self.policies.answers,
        )
        .await
        .into_text(EVALUATION_FAILURE)
    }

    pub async fn evaluate_sheet(&self, language: &str, sheet: &AnswerSheet) -> Result<String> {
        let answers = sheet.to_json()?;
        Ok(self.evaluate_answers(language, &answers).await)
    }

    /// Congratulatory feedback for a finished course; the reply is expected
    /// to read `Количество правильных: N%` followed by `Рекомендации: ...`.
    pub async fn evaluate_result(
        &self,
        language: &str,
        correct_percentage: f64,
        incorrect_percentage: f64,
    ) -> String {
        let prompt = self.with_rng_locked(|rng| {
            prompts::result_prompt(rng, language, correct_percentage, incorrect_percentage)
        });
        complete_with_retry(
            &self.backend,
            "evaluate_result",
            &prompt,
            &self.policies.result,
        )
        .await
        .into_text(EVALUATION_FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionError;
    use crate::llm::backend::testing::ScriptedBackend;
    use crate::quiz::QuizQuestion;

    fn tutor(backend: &ScriptedBackend) -> Tutor<&ScriptedBackend> {
        Tutor::with_rng(backend, StdRng::seed_from_u64(11))
    }

    #[tokio::test(start_paused = true)]
    async fn material_uses_one_template_verbatim() {
        let backend = ScriptedBackend::new(vec![Ok("Переменные в Python...".into())]);
        let text = tutor(&backend).generate_material("Python", "1").await;

        assert_eq!(text, "Переменные в Python...");
        let sent = backend.prompts();
        assert_eq!(sent.len(), 1);
        let candidates: Vec<String> = prompts::material_templates()
            .iter()
            .map(|t| prompts::render(t, &[("language", "Python"), ("difficulty", "1")]))
            .collect();
        assert!(candidates.contains(&sent[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn material_budget_is_thirty_attempts() {
        let backend = ScriptedBackend::failing(30, CompletionError::Request("offline".into()));
        let text = tutor(&backend).generate_material("Go", "2").await;

        assert_eq!(backend.calls(), 30);
        assert_eq!(
            text,
            "Error generating lesson material after 30 attempts: offline"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn questions_budget_is_ten_attempts() {
        let backend = ScriptedBackend::failing(10, CompletionError::from_message("429"));
        let text = tutor(&backend).generate_questions("Go", "material", "2").await;

        assert_eq!(backend.calls(), 10);
        assert!(text.starts_with("Error generating quiz questions after 10 attempts: "));
        assert!(text.contains("429"));
    }

    #[tokio::test(start_paused = true)]
    async fn raw_questions_are_not_cleaned() {
        let raw = "# Тест\n\n1. Q?\n   A) a";
        let backend = ScriptedBackend::new(vec![Ok(raw.into())]);
        let text = tutor(&backend).generate_questions("Go", "m", "1").await;
        assert_eq!(text, raw);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_quiz_cleans_successful_reply() {
        let raw = "# Тест\n\n1. Q?\n   A) a\n\n11. Task\nПример: ...";
        let backend = ScriptedBackend::new(vec![Err(CompletionError::EmptyResponse), Ok(raw.into())]);
        let text = tutor(&backend).generate_quiz("Go", "m", "1").await;

        assert_eq!(backend.calls(), 2);
        assert_eq!(text, "1. Q?\n   A) a\n\n11. Task");
    }

    #[tokio::test(start_paused = true)]
    async fn generate_quiz_keeps_diagnostic_on_failure() {
        let policies = CallPolicies {
            questions: RetryPolicy::with_attempts(2),
            ..CallPolicies::default()
        };
        let backend = ScriptedBackend::failing(2, CompletionError::Request("down".into()));
        let text = tutor(&backend)
            .with_policies(policies)
            .generate_quiz("Go", "m", "1")
            .await;

        assert_eq!(text, "Error generating quiz questions after 2 attempts: down");
    }

    #[tokio::test(start_paused = true)]
    async fn evaluate_sheet_embeds_json() {
        let backend = ScriptedBackend::new(vec![Ok(
            "Количество правильных: 1 из 15\nРекомендации: ...".into(),
        )]);
        let mut sheet = AnswerSheet::new();
        sheet.record(
            &QuizQuestion::Practical {
                number: 12,
                prompt: "Сложите два числа.".into(),
            },
            "a + b",
        );

        let reply = tutor(&backend).evaluate_sheet("Rust", &sheet).await.unwrap();

        assert!(reply.starts_with("Количество правильных: 1 из 15"));
        let sent = backend.prompts();
        let prompt = &sent[0];
        assert!(prompt.contains(r#""12":{"question":"12. Сложите два числа.","answer":"a + b"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn evaluation_failures_share_prefix() {
        let backend = ScriptedBackend::failing(20, CompletionError::Request("bad".into()));
        let tutor = tutor(&backend);

        let answers = tutor.evaluate_answers("Rust", "{}").await;
        let result = tutor.evaluate_result("Rust", 60.0, 40.0).await;

        assert_eq!(backend.calls(), 20);
        assert_eq!(answers, "Error checking answers after 10 attempts: bad");
        assert_eq!(result, answers);
    }

    #[tokio::test(start_paused = true)]
    async fn result_prompt_mentions_percentages() {
        let backend =
            ScriptedBackend::new(vec![Ok("Количество правильных: 60%\nРекомендации: ok".into())]);
        tutor(&backend).evaluate_result("Kotlin", 60.0, 40.0).await;

        let sent = backend.prompts();
        let prompt = &sent[0];
        assert!(prompt.contains("Kotlin"));
        assert!(prompt.contains("60%"));
        assert!(prompt.contains("40%"));
    }

    #[test]
    fn default_budgets() {
        let policies = CallPolicies::default();
        assert_eq!(policies.material.max_attempts, 30);
        assert_eq!(policies.questions.max_attempts, 10);
        assert_eq!(policies.answers.max_attempts, 10);
        assert_eq!(policies.result.max_attempts, 10);
    }
}
