use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Declared format of an uploaded resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeFormat {
    Pdf,
    Txt,
}

impl ResumeFormat {
    /// Resolve the format from a filename extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ResumeFormat::Pdf),
            "txt" => Some(ResumeFormat::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for ResumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeFormat::Pdf => write!(f, "pdf"),
            ResumeFormat::Txt => write!(f, "txt"),
        }
    }
}

/// Normalized resume text, immutable once produced by the document extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub content: String,
    pub filename: String,
    pub format: ResumeFormat,
}

/// Structured candidate preferences.
///
/// Every field is optional; an absent value means "no stated preference"
/// and never "must not match".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeMetadata {
    #[serde(default)]
    pub h1b_sponsorship_needed: Option<bool>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub preferred_job_categories: Vec<String>,
    #[serde(default)]
    pub preferred_employment_type: Vec<String>,
    #[serde(default)]
    pub ideal_companies: Vec<String>,
    #[serde(default)]
    pub equity_preference: Option<f64>,
}

impl ResumeMetadata {
    /// Metadata with no stated preferences
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no field carries a preference
    pub fn is_empty(&self) -> bool {
        self.h1b_sponsorship_needed.is_none()
            && self.preferred_location.is_none()
            && self.preferred_job_categories.is_empty()
            && self.preferred_employment_type.is_empty()
            && self.ideal_companies.is_empty()
            && self.equity_preference.is_none()
    }

    /// Canonical form: trimmed strings, ordered sets without duplicates,
    /// equity preference inside [0, 1].
    pub fn normalized(self) -> Self {
        Self {
            h1b_sponsorship_needed: self.h1b_sponsorship_needed,
            preferred_location: self
                .preferred_location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            preferred_job_categories: ordered_set(self.preferred_job_categories),
            preferred_employment_type: ordered_set(self.preferred_employment_type),
            ideal_companies: ordered_set(self.ideal_companies),
            equity_preference: self
                .equity_preference
                .filter(|e| e.is_finite() && (0.0..=1.0).contains(e)),
        }
    }
}

/// Trim, drop empties, and remove case-insensitive duplicates keeping the
/// first occurrence.
pub fn ordered_set<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(trimmed.to_string());
    }
    out
}

/// Dense vector representation of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Job posting attributes stored alongside each vector in the index.
///
/// Only the fields the filters, the reranker and `JobMatch` read are kept;
/// other corpus metadata is ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAttributes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub job_category: String,
    #[serde(default)]
    pub employment_type: String,
    #[serde(default)]
    pub work_location_type: String,
    #[serde(default)]
    pub h1b_sponsorship: bool,
    #[serde(default)]
    pub equity_max: f64,
}

/// A posting returned by the retrieval engine, ranked by raw similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub job_id: String,
    pub title: String,
    pub raw_similarity: f64,
    pub metadata: JobAttributes,
}

impl JobCandidate {
    pub fn new(job_id: String, raw_similarity: f64, metadata: JobAttributes) -> Self {
        let title = if metadata.title.trim().is_empty() {
            job_id.clone()
        } else {
            metadata.title.clone()
        };
        Self {
            job_id,
            title,
            raw_similarity,
            metadata,
        }
    }
}

/// Final ranked match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub job_id: String,
    pub title: String,
    pub score: f64,
    pub rank: usize,
    pub raw_similarity: f64,
    pub company_name: String,
    pub location: String,
    pub job_category: String,
    pub employment_type: String,
    pub work_location_type: String,
    pub h1b_sponsorship: bool,
    pub reasons: Vec<String>,
}
