use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{ResumeFormat, ResumeMetadata};

/// Request to match already-extracted resume text
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    /// Blank text is left to the document extractor (`EmptyDocument`)
    #[serde(alias = "resumeText")]
    pub resume_text: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub format: Option<ResumeFormat>,
    /// Caller-supplied preferences; skips the extraction step when present
    #[serde(default, alias = "resumeMetadata")]
    pub resume_metadata: Option<ResumeMetadata>,
    #[validate(range(min = 1, max = 100))]
    #[serde(default, alias = "topK")]
    pub top_k: Option<usize>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, alias = "similarityThreshold")]
    pub similarity_threshold: Option<f64>,
}

/// Query string for raw-body uploads
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadQuery {
    #[validate(length(min = 1))]
    pub filename: String,
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub top_k: Option<usize>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_request_accepts_camel_case_aliases() {
        let req: MatchRequest = serde_json::from_value(serde_json::json!({
            "resumeText": "Rust engineer",
            "topK": 5,
            "similarityThreshold": 0.4
        }))
        .unwrap();

        assert_eq!(req.top_k, Some(5));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_bounds_rejected() {
        let req = MatchRequest {
            resume_text: "Rust engineer".to_string(),
            filename: None,
            format: None,
            resume_metadata: None,
            top_k: None,
            similarity_threshold: Some(1.5),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_text_passes_validation() {
        let req = MatchRequest {
            resume_text: String::new(),
            filename: None,
            format: None,
            resume_metadata: None,
            top_k: Some(0),
            similarity_threshold: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(!fields.contains_key("resume_text"));
        assert!(fields.contains_key("top_k"));
    }
}
