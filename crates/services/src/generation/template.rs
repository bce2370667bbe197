use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use assess_core::model::{QuestionDraft, QuestionKind};

use super::{GenerationRequest, QuestionGenerator, check_drafts};
use crate::error::GenerationError;

/// Builds questions from fixed templates, without any network access.
///
/// Kinds rotate multiple-choice, true/false, short-answer. Choice order is
/// shuffled with a seeded RNG, so the same seed and request always produce
/// the same drafts.
#[derive(Debug, Clone, Copy)]
pub struct TemplateQuestionGenerator {
    seed: u64,
}

impl Default for TemplateQuestionGenerator {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

impl TemplateQuestionGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn multiple_choice(request: &GenerationRequest, n: usize, rng: &mut StdRng) -> QuestionDraft {
        let topic = &request.topic;
        let correct = format!("Key principle {n} of {topic}");
        let mut choices = vec![
            correct.clone(),
            format!("A common misconception about {topic} ({n})"),
            format!("An idea unrelated to {topic} ({n})"),
            format!("None of these apply to {topic} ({n})"),
        ];
        choices.shuffle(rng);
        QuestionDraft {
            text: format!(
                "[{}] Which option states key principle {n} of {topic}?",
                request.difficulty
            ),
            kind: QuestionKind::MultipleChoice,
            choices,
            correct_answer: correct,
            points: request.difficulty.points(),
        }
    }

    fn true_false(request: &GenerationRequest, n: usize) -> QuestionDraft {
        QuestionDraft {
            text: format!(
                "[{}] True or false: statement {n} about {} is covered at this level.",
                request.difficulty, request.topic
            ),
            kind: QuestionKind::TrueFalse,
            choices: Vec::new(),
            correct_answer: "true".into(),
            points: request.difficulty.points(),
        }
    }

    fn short_answer(request: &GenerationRequest, n: usize) -> QuestionDraft {
        QuestionDraft {
            text: format!(
                "[{}] Question {n}: name the subject of this assessment exactly as written.",
                request.difficulty
            ),
            kind: QuestionKind::ShortAnswer,
            choices: Vec::new(),
            correct_answer: request.topic.clone(),
            points: request.difficulty.points(),
        }
    }

    /// Synchronous core of `generate`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Question` if a template yields an invalid draft.
    pub fn build(&self, request: &GenerationRequest) -> Result<Vec<QuestionDraft>, GenerationError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let drafts: Vec<_> = (1..=request.count)
            .map(|n| match n % 3 {
                1 => Self::multiple_choice(request, n, &mut rng),
                2 => Self::true_false(request, n),
                _ => Self::short_answer(request, n),
            })
            .collect();
        check_drafts(&drafts)?;
        Ok(drafts)
    }
}

#[async_trait]
impl QuestionGenerator for TemplateQuestionGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        self.build(request)
    }
}
