//! Sentiment categories and the extraction of a category out of free-text model output.
//!
//! The model is asked to answer with one of a fixed, ordered list of labels, but its
//! answer is free text. The category is the first label of the list that appears
//! anywhere in that text. When several labels appear, list order decides, not the
//! position in the text.

use serde::Serialize;
use thiserror::Error;

/// Label returned when the model output does not mention any known category.
pub const DEFAULT_UNKNOWN_LABEL: &str = "unknown";

/// Reserved for addressing every category of an album at once.
pub const ALL_CATEGORIES: &str = "all";

/// Placeholder replaced by the quoted, comma separated label list in prompt templates.
pub const LABELS_PLACEHOLDER: &str = "{labels}";

const JAPANESE_LABELS: &[&str] = &["嬉しい", "笑顔", "真顔", "泣き顔"];
const ENGLISH_LABELS: &[&str] = &["smile", "funny", "straight", "crying"];

const JAPANESE_PROMPT_TEMPLATE: &str =
    "この画像の感情を分析し、{labels} のいずれかに分類してください。";
const ENGLISH_PROMPT_TEMPLATE: &str =
    "Analyze the emotion of the people in this image and classify it as one of {labels}. Answer with the category only.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LabelPreset {
    #[default]
    Japanese,
    English,
}

impl LabelPreset {
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            LabelPreset::Japanese => JAPANESE_LABELS,
            LabelPreset::English => ENGLISH_LABELS,
        }
    }

    pub fn prompt_template(&self) -> &'static str {
        match self {
            LabelPreset::Japanese => JAPANESE_PROMPT_TEMPLATE,
            LabelPreset::English => ENGLISH_PROMPT_TEMPLATE,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategorySetError {
    #[error("At least one category label is required")]
    Empty,

    #[error("Category labels must not be empty")]
    EmptyLabel,

    #[error("Category label '{0}' must not contain '/' or be a relative path segment")]
    InvalidLabel(String),

    #[error("Category label '{0}' is listed more than once")]
    Duplicate(String),

    #[error("Unknown label '{0}' clashes with a category label")]
    UnknownClash(String),

    #[error("'{0}' is reserved and cannot be used as a label")]
    Reserved(String),
}

/// An ordered, closed set of category labels plus the sentinel used when none matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Vec<String>,
    unknown_label: String,
    prompt: String,
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: String,
    /// Raw model output the category was extracted from.
    pub model_text: String,
}

impl CategorySet {
    /// Builds a category set with the English prompt template.
    pub fn new(
        labels: Vec<String>,
        unknown_label: impl Into<String>,
    ) -> Result<Self, CategorySetError> {
        Self::with_prompt_template(labels, unknown_label, ENGLISH_PROMPT_TEMPLATE)
    }

    pub fn with_prompt_template(
        labels: Vec<String>,
        unknown_label: impl Into<String>,
        prompt_template: &str,
    ) -> Result<Self, CategorySetError> {
        let unknown_label = unknown_label.into();
        if labels.is_empty() {
            return Err(CategorySetError::Empty);
        }
        for (index, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(CategorySetError::EmptyLabel);
            }
            if !is_path_safe(label) {
                return Err(CategorySetError::InvalidLabel(label.clone()));
            }
            if label == ALL_CATEGORIES {
                return Err(CategorySetError::Reserved(label.clone()));
            }
            if labels[..index].contains(label) {
                return Err(CategorySetError::Duplicate(label.clone()));
            }
        }
        if unknown_label.is_empty() {
            return Err(CategorySetError::EmptyLabel);
        }
        if !is_path_safe(&unknown_label) {
            return Err(CategorySetError::InvalidLabel(unknown_label));
        }
        if unknown_label == ALL_CATEGORIES {
            return Err(CategorySetError::Reserved(unknown_label));
        }
        if labels.contains(&unknown_label) {
            return Err(CategorySetError::UnknownClash(unknown_label));
        }

        let prompt = render_prompt(prompt_template, &labels);

        Ok(Self {
            labels,
            unknown_label,
            prompt,
        })
    }

    pub fn from_preset(preset: LabelPreset) -> Self {
        let labels: Vec<String> = preset.labels().iter().map(|l| l.to_string()).collect();
        Self {
            prompt: render_prompt(preset.prompt_template(), &labels),
            labels,
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn unknown_label(&self) -> &str {
        &self.unknown_label
    }

    /// The natural-language instruction sent to the model together with each image.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the first label, in list order, contained in `text`. Case-sensitive.
    pub fn extract<'a>(&'a self, text: &str) -> &'a str {
        self.labels
            .iter()
            .find(|label| text.contains(label.as_str()))
            .map(|label| label.as_str())
            .unwrap_or(self.unknown_label.as_str())
    }

    pub fn classify_text(&self, model_text: String) -> Classification {
        Classification {
            category: self.extract(&model_text).to_string(),
            model_text,
        }
    }
}

/// Labels become a directory of the photo object path.
fn is_path_safe(label: &str) -> bool {
    !label.contains('/') && label != "." && label != ".."
}

fn render_prompt(template: &str, labels: &[String]) -> String {
    let quoted = labels
        .iter()
        .map(|l| format!("'{}'", l))
        .collect::<Vec<_>>()
        .join(", ");
    template.replace(LABELS_PLACEHOLDER, &quoted)
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::from_preset(LabelPreset::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> CategorySet {
        CategorySet::from_preset(LabelPreset::English)
    }

    #[test]
    fn extracts_single_label() {
        let set = english();
        for label in ENGLISH_LABELS {
            let text = format!("The person in this picture looks {} to me.", label);
            assert_eq!(set.extract(&text), *label);
        }
    }

    #[test]
    fn extracts_label_embedded_in_japanese_text() {
        assert_eq!(english().extract("この画像はsmileです"), "smile");
    }

    #[test]
    fn falls_back_to_unknown() {
        let set = english();
        assert_eq!(set.extract("I cannot tell."), DEFAULT_UNKNOWN_LABEL);
        assert_eq!(set.extract(""), DEFAULT_UNKNOWN_LABEL);
    }

    #[test]
    fn list_order_wins_over_text_position() {
        let set = english();
        assert_eq!(set.extract("crying at first, then a smile"), "smile");
        assert_eq!(set.extract("straight face, kind of funny"), "funny");
    }

    #[test]
    fn extraction_is_case_sensitive() {
        assert_eq!(english().extract("SMILE"), DEFAULT_UNKNOWN_LABEL);
    }

    #[test]
    fn japanese_preset() {
        let set = CategorySet::default();
        assert_eq!(set.labels().len(), 4);
        assert_eq!(set.extract("この写真は「笑顔」に分類されます。"), "笑顔");
        assert_eq!(set.extract("泣き顔ですが嬉しいようです"), "嬉しい");
        assert_eq!(
            set.prompt(),
            "この画像の感情を分析し、'嬉しい', '笑顔', '真顔', '泣き顔' のいずれかに分類してください。"
        );
    }

    #[test]
    fn custom_labels_build_prompt() {
        let set = CategorySet::new(vec!["happy".into(), "sad".into()], "other").unwrap();
        assert!(set.prompt().contains("'happy', 'sad'"));
        assert_eq!(set.extract("quite sad"), "sad");
        assert_eq!(set.extract("neutral"), "other");
        assert_eq!(set.labels(), ["happy".to_string(), "sad".to_string()]);
        assert_eq!(set.unknown_label(), "other");
    }

    #[test]
    fn rejects_invalid_label_sets() {
        assert_eq!(
            CategorySet::new(vec![], "unknown"),
            Err(CategorySetError::Empty)
        );
        assert_eq!(
            CategorySet::new(vec!["a".into(), "".into()], "unknown"),
            Err(CategorySetError::EmptyLabel)
        );
        assert_eq!(
            CategorySet::new(vec!["a".into(), "a".into()], "unknown"),
            Err(CategorySetError::Duplicate("a".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["a/b".into()], "unknown"),
            Err(CategorySetError::InvalidLabel("a/b".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["a".into()], "a"),
            Err(CategorySetError::UnknownClash("a".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["a".into(), "all".into()], "unknown"),
            Err(CategorySetError::Reserved("all".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["..".into(), "smile".into()], "unknown"),
            Err(CategorySetError::InvalidLabel("..".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["smile".into(), ".".into()], "unknown"),
            Err(CategorySetError::InvalidLabel(".".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["smile".into()], ".."),
            Err(CategorySetError::InvalidLabel("..".into()))
        );
        assert_eq!(
            CategorySet::new(vec!["smile".into()], "."),
            Err(CategorySetError::InvalidLabel(".".into()))
        );
        assert!(CategorySet::new(vec!["..smile".into()], "un.known").is_ok());
    }

    #[test]
    fn classify_text_keeps_model_output() {
        let classification = english().classify_text("definitely crying".to_string());
        assert_eq!(classification.category, "crying");
        assert_eq!(classification.model_text, "definitely crying");
    }
}
