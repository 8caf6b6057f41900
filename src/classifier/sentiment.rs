use super::provider::{ClassifierError, GenerationOptions, ImageInput, VisionModel};
use crate::category::{CategorySet, Classification};
use std::sync::Arc;
use tracing::debug;

/// Classifies images into a [`CategorySet`] by asking a vision model and
/// extracting the category out of its free-text answer.
#[derive(Clone)]
pub struct SentimentClassifier {
    model: Arc<dyn VisionModel>,
    categories: CategorySet,
    options: GenerationOptions,
}

impl SentimentClassifier {
    pub fn new(
        model: Arc<dyn VisionModel>,
        categories: CategorySet,
        options: GenerationOptions,
    ) -> Self {
        Self {
            model,
            categories,
            options,
        }
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub async fn classify(&self, image: &ImageInput) -> Result<Classification, ClassifierError> {
        let text = self
            .model
            .generate(self.categories.prompt(), Some(image), &self.options)
            .await?;
        let classification = self.categories.classify_text(text);
        debug!(
            provider = self.model.name(),
            model = self.model.model(),
            category = %classification.category,
            "Image classified"
        );
        Ok(classification)
    }

    /// Forwards a free-form text prompt to the model.
    pub async fn analyze_text(&self, text: &str) -> Result<String, ClassifierError> {
        self.model.generate(text, None, &self.options).await
    }
}
