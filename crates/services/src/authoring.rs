use std::sync::Arc;

use assess_core::model::{
    AssessmentDefinition, AssessmentId, AssessmentSettings, QuestionDraft, QuestionId,
};
use storage::repository::{AssessmentRepository, NewAssessmentRecord};

use crate::Clock;
use crate::error::AuthoringError;
use crate::generation::{GenerationRequest, QuestionGenerator};

/// Creates assessment definitions from hand-written or generated drafts.
#[derive(Clone)]
pub struct AssessmentAuthoringService {
    clock: Clock,
    assessments: Arc<dyn AssessmentRepository>,
    generator: Arc<dyn QuestionGenerator>,
}

impl AssessmentAuthoringService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assessments: Arc<dyn AssessmentRepository>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        Self {
            clock,
            assessments,
            generator,
        }
    }

    /// Validate and store a new assessment.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Question` or `AuthoringError::Assessment` for
    /// validation failures and `AuthoringError::Storage` if persistence fails.
    pub async fn create_assessment(
        &self,
        title: String,
        description: Option<String>,
        drafts: Vec<QuestionDraft>,
        settings: AssessmentSettings,
    ) -> Result<AssessmentId, AuthoringError> {
        let now = self.clock.now();
        // Validate with a placeholder id; storage assigns the real one.
        let questions = drafts
            .iter()
            .cloned()
            .zip(1_u64..)
            .map(|(draft, id)| draft.validate(QuestionId::new(id)))
            .collect::<Result<Vec<_>, _>>()?;
        let definition = AssessmentDefinition::new(
            AssessmentId::new(1),
            title,
            description,
            questions,
            settings,
            now,
        )?;

        let id = self
            .assessments
            .insert_new_assessment(NewAssessmentRecord {
                title: definition.title().to_string(),
                description: definition.description().map(str::to_owned),
                questions: drafts,
                settings,
                created_at: now,
            })
            .await?;
        tracing::info!(assessment_id = %id, questions = definition.question_count(), "assessment created");
        Ok(id)
    }

    /// Ask the generator for drafts without storing anything.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Generation` if the generator fails.
    pub async fn preview(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, AuthoringError> {
        Ok(self.generator.generate(request).await?)
    }

    /// Generate questions and store them as a new assessment.
    ///
    /// Without a title, one is derived from the topic and difficulty.
    ///
    /// # Errors
    ///
    /// See `preview` and `create_assessment`.
    pub async fn generate_assessment(
        &self,
        request: &GenerationRequest,
        title: Option<String>,
        settings: AssessmentSettings,
    ) -> Result<AssessmentId, AuthoringError> {
        let drafts = self.preview(request).await?;
        let title =
            title.unwrap_or_else(|| format!("{} ({})", request.topic, request.difficulty));
        let description = Some(format!(
            "{} questions on {} at {} level.",
            drafts.len(),
            request.topic,
            request.difficulty
        ));
        self.create_assessment(title, description, drafts, settings)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{Difficulty, TemplateQuestionGenerator};
    use assess_core::model::QuestionKind;
    use assess_core::time::fixed_clock;
    use storage::repository::Storage;

    fn service(storage: &Storage) -> AssessmentAuthoringService {
        AssessmentAuthoringService::new(
            fixed_clock(),
            Arc::clone(&storage.assessments),
            Arc::new(TemplateQuestionGenerator::default()),
        )
    }

    #[tokio::test]
    async fn generated_assessment_is_stored() {
        let storage = Storage::in_memory();
        let request = GenerationRequest::new("Lifetimes", Difficulty::Beginner, 4).unwrap();
        let id = service(&storage)
            .generate_assessment(&request, None, AssessmentSettings::practice())
            .await
            .unwrap();

        let stored = storage.assessments.get_assessment(id).await.unwrap();
        assert_eq!(stored.title(), "Lifetimes (beginner)");
        assert_eq!(stored.question_count(), 4);
        assert_eq!(stored.total_points(), 4);
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_storage() {
        let storage = Storage::in_memory();
        let err = service(&storage)
            .create_assessment(
                "Broken".into(),
                None,
                vec![QuestionDraft {
                    text: "Pick one".into(),
                    kind: QuestionKind::MultipleChoice,
                    choices: vec!["a".into()],
                    correct_answer: "a".into(),
                    points: 1,
                }],
                AssessmentSettings::practice(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthoringError::Question(_)));
        assert!(storage.assessments.list_assessments(10).await.unwrap().is_empty());
    }
}
