//! Preference extraction.
//!
//! The language model is reached through [`PreferenceSource`]; its output is
//! validated here into a strongly-typed `ResumeMetadata`. A failing source is
//! retried once and then degrades to empty metadata so matching can proceed
//! unfiltered.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::document::truncate_chars;
use crate::core::trace::StageOutcome;
use crate::models::domain::ordered_set;
use crate::models::ResumeMetadata;
use crate::services::{with_retry, RetryPolicy, ServiceError};

/// System prompt describing the fixed extraction schema
pub const EXTRACTION_PROMPT: &str = r#"You extract job-search preferences from a resume.
Return ONLY a JSON object with exactly these keys:
{
  "h1b_sponsorship_needed": true | false | null,
  "preferred_location": string | null,
  "preferred_job_categories": [string],
  "preferred_employment_type": [string],
  "ideal_companies": [string],
  "equity_preference": number between 0 and 1 | null
}
Use null or an empty list when the resume does not state a preference.
Use "Remote" as preferred_location only when the candidate asks for remote work.
Employment types use the forms "Full-time", "Part-time", "Contract", "Internship"."#;

/// A language-model backed extractor of structured preferences
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    async fn extract(&self, resume_text: &str) -> Result<ResumeMetadata, ServiceError>;
}

/// Preference Extractor stage: retry once, then degrade to empty metadata
#[derive(Clone)]
pub struct PreferenceExtractor {
    source: Arc<dyn PreferenceSource>,
    policy: RetryPolicy,
    max_input_chars: usize,
}

impl PreferenceExtractor {
    pub fn new(source: Arc<dyn PreferenceSource>, policy: RetryPolicy, max_input_chars: usize) -> Self {
        Self {
            source,
            policy,
            max_input_chars,
        }
    }

    /// Always yields fully-populated metadata; never fails the request
    pub async fn extract(&self, resume_text: &str) -> StageOutcome<ResumeMetadata> {
        let (input, _) = truncate_chars(resume_text.to_string(), self.max_input_chars);

        let result = with_retry("preference extraction", self.policy, || {
            self.source.extract(&input)
        })
        .await;

        match result {
            Ok(metadata) => {
                let metadata = metadata.normalized();
                debug!("Extracted resume preferences: {:?}", metadata);
                StageOutcome::Complete(metadata)
            }
            Err(e) => {
                warn!("Preference extraction unavailable, continuing unfiltered: {}", e);
                StageOutcome::Degraded {
                    value: ResumeMetadata::empty(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Loose view of the model output; every field tolerates null or a wrong shape
#[derive(Debug, Default, Deserialize)]
struct RawPreferences {
    #[serde(default)]
    h1b_sponsorship_needed: Value,
    #[serde(default)]
    preferred_location: Value,
    #[serde(default)]
    preferred_job_categories: Value,
    #[serde(default)]
    preferred_employment_type: Value,
    #[serde(default)]
    ideal_companies: Value,
    #[serde(default)]
    equity_preference: Value,
}

/// Validate model output against the extraction schema
pub fn parse_preferences(text: &str) -> Result<ResumeMetadata, ServiceError> {
    let value: Value = serde_json::from_str(strip_json_fences(text))
        .map_err(|e| ServiceError::InvalidResponse(format!("Preferences are not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(ServiceError::InvalidResponse(
            "Preferences must be a JSON object".to_string(),
        ));
    }

    let raw: RawPreferences = serde_json::from_value(value)
        .map_err(|e| ServiceError::InvalidResponse(format!("Unexpected preferences shape: {}", e)))?;

    Ok(ResumeMetadata {
        h1b_sponsorship_needed: bool_field(&raw.h1b_sponsorship_needed),
        preferred_location: string_field(&raw.preferred_location),
        preferred_job_categories: list_field(&raw.preferred_job_categories),
        preferred_employment_type: list_field(&raw.preferred_employment_type),
        ideal_companies: list_field(&raw.ideal_companies),
        equity_preference: unit_field(&raw.equity_preference),
    }
    .normalized())
}

fn is_null_word(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "" | "null" | "none" | "n/a" | "unknown")
}

fn bool_field(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_null_word(s.trim()) => Some(s.trim().to_string()),
        _ => None,
    }
}

fn list_field(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(string_field).collect(),
        Value::String(_) => string_field(value).into_iter().collect(),
        _ => Vec::new(),
    };
    ordered_set(items)
}

fn unit_field(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (number.is_finite() && (0.0..=1.0).contains(&number)).then_some(number)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
