//! Metadata filters derived from candidate preferences.
//!
//! `derive_filters` is a pure projection of `ResumeMetadata`: the same
//! metadata always yields the same conditions, in the same order. A missing
//! preference contributes no condition. Conditions are AND-ed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::SponsorshipMode;
use crate::models::{JobAttributes, ResumeMetadata};

/// Posting attributes that can be constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    H1bSponsorship,
    Location,
    WorkLocationType,
    JobCategory,
    EmploymentType,
}

impl JobField {
    /// Metadata key used by the vector index
    pub fn key(&self) -> &'static str {
        match self {
            JobField::H1bSponsorship => "h1b_sponsorship",
            JobField::Location => "location",
            JobField::WorkLocationType => "work_location_type",
            JobField::JobCategory => "job_category",
            JobField::EmploymentType => "employment_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

/// A single hard constraint on a posting attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: JobField,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// Conjunction of conditions applied during retrieval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    pub conditions: Vec<FilterCondition>,
}

/// Location preference that maps onto the work-location type instead of a city
const REMOTE: &str = "remote";

/// Project preferences onto hard retrieval filters, sponsorship included.
pub fn derive_filters(metadata: &ResumeMetadata) -> MetadataFilter {
    derive_filters_with(metadata, SponsorshipMode::Filter)
}

/// Project preferences onto hard retrieval filters.
///
/// Order is fixed: sponsorship, location, job category, employment type.
/// Ideal companies and equity preference are soft signals for the reranker,
/// as is sponsorship under `SponsorshipMode::Penalize`.
pub fn derive_filters_with(metadata: &ResumeMetadata, sponsorship: SponsorshipMode) -> MetadataFilter {
    let mut conditions = Vec::new();

    // Only a stated need constrains; not needing sponsorship excludes nothing
    if sponsorship == SponsorshipMode::Filter && metadata.h1b_sponsorship_needed == Some(true) {
        conditions.push(FilterCondition {
            field: JobField::H1bSponsorship,
            op: FilterOp::Eq,
            value: FilterValue::Bool(true),
        });
    }

    if let Some(location) = metadata.preferred_location.as_deref().map(str::trim) {
        if location.eq_ignore_ascii_case(REMOTE) {
            conditions.push(FilterCondition {
                field: JobField::WorkLocationType,
                op: FilterOp::Eq,
                value: FilterValue::Text("Remote".to_string()),
            });
        } else if !location.is_empty() {
            conditions.push(FilterCondition {
                field: JobField::Location,
                op: FilterOp::Eq,
                value: FilterValue::Text(location.to_string()),
            });
        }
    }

    if !metadata.preferred_job_categories.is_empty() {
        conditions.push(FilterCondition {
            field: JobField::JobCategory,
            op: FilterOp::In,
            value: FilterValue::List(metadata.preferred_job_categories.clone()),
        });
    }

    if !metadata.preferred_employment_type.is_empty() {
        conditions.push(FilterCondition {
            field: JobField::EmploymentType,
            op: FilterOp::In,
            value: FilterValue::List(metadata.preferred_employment_type.clone()),
        });
    }

    MetadataFilter { conditions }
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check whether a posting satisfies every condition
    pub fn matches(&self, attributes: &JobAttributes) -> bool {
        self.conditions
            .iter()
            .all(|cond| evaluate_condition(attributes, cond))
    }

    /// Render as a Pinecone metadata filter, `None` when unconstrained.
    ///
    /// Pinecone's `$eq` and `$in` compare strings exactly, so values are sent
    /// with the casing the preferences carry. `matches` folds case instead;
    /// a corpus indexed in Pinecone must use the casing the extraction
    /// prompt asks for ("Remote", "Full-time").
    pub fn to_pinecone(&self) -> Option<Value> {
        if self.conditions.is_empty() {
            return None;
        }

        let clauses: Vec<Value> = self
            .conditions
            .iter()
            .map(|cond| {
                let predicate = match (&cond.op, &cond.value) {
                    (FilterOp::Eq, FilterValue::Bool(b)) => json!({ "$eq": b }),
                    (FilterOp::Eq, FilterValue::Text(s)) => json!({ "$eq": s }),
                    (FilterOp::Eq, FilterValue::List(values)) | (FilterOp::In, FilterValue::List(values)) => {
                        json!({ "$in": values })
                    }
                    (FilterOp::In, FilterValue::Text(s)) => json!({ "$in": [s] }),
                    (FilterOp::In, FilterValue::Bool(b)) => json!({ "$in": [b] }),
                };
                let mut clause = Map::new();
                clause.insert(cond.field.key().to_string(), predicate);
                Value::Object(clause)
            })
            .collect();

        Some(json!({ "$and": clauses }))
    }
}

enum AttributeValue<'a> {
    Bool(bool),
    Text(&'a str),
}

fn attribute<'a>(attributes: &'a JobAttributes, field: JobField) -> AttributeValue<'a> {
    match field {
        JobField::H1bSponsorship => AttributeValue::Bool(attributes.h1b_sponsorship),
        JobField::Location => AttributeValue::Text(&attributes.location),
        JobField::WorkLocationType => AttributeValue::Text(&attributes.work_location_type),
        JobField::JobCategory => AttributeValue::Text(&attributes.job_category),
        JobField::EmploymentType => AttributeValue::Text(&attributes.employment_type),
    }
}

fn evaluate_condition(attributes: &JobAttributes, cond: &FilterCondition) -> bool {
    value_eq(&attribute(attributes, cond.field), &cond.value)
}

/// Strings compare trimmed and case-insensitively; a list matches when any
/// member does. Mismatched types never match.
fn value_eq(actual: &AttributeValue<'_>, expected: &FilterValue) -> bool {
    match (actual, expected) {
        (AttributeValue::Bool(a), FilterValue::Bool(b)) => a == b,
        (AttributeValue::Text(a), FilterValue::Text(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (AttributeValue::Text(a), FilterValue::List(values)) => {
            values.iter().any(|b| a.trim().eq_ignore_ascii_case(b.trim()))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seattle_go_role() -> JobAttributes {
        JobAttributes {
            title: "Senior Go Engineer".to_string(),
            company_name: "Acme".to_string(),
            location: "Seattle".to_string(),
            job_category: "Engineering".to_string(),
            employment_type: "Full-time".to_string(),
            work_location_type: "Onsite".to_string(),
            h1b_sponsorship: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_metadata_yields_no_filters() {
        let filter = derive_filters(&ResumeMetadata::empty());
        assert!(filter.is_empty());
        assert!(filter.to_pinecone().is_none());
        assert!(filter.matches(&seattle_go_role()));
    }

    #[test]
    fn test_not_needing_sponsorship_applies_no_filter() {
        let metadata = ResumeMetadata {
            h1b_sponsorship_needed: Some(false),
            ..Default::default()
        };
        assert!(derive_filters(&metadata).is_empty());
    }

    #[test]
    fn test_sponsorship_needed_excludes_non_sponsors() {
        let metadata = ResumeMetadata {
            h1b_sponsorship_needed: Some(true),
            ..Default::default()
        };
        let filter = derive_filters(&metadata);

        assert!(!filter.matches(&seattle_go_role()));

        let mut sponsor = seattle_go_role();
        sponsor.h1b_sponsorship = true;
        assert!(filter.matches(&sponsor));
    }

    #[test]
    fn test_remote_maps_to_work_location_type() {
        let metadata = ResumeMetadata {
            preferred_location: Some("Remote".to_string()),
            ..Default::default()
        };
        let filter = derive_filters(&metadata);

        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.conditions[0].field, JobField::WorkLocationType);
        assert!(!filter.matches(&seattle_go_role()));
    }

    #[test]
    fn test_set_preferences_match_by_intersection() {
        let metadata = ResumeMetadata {
            preferred_job_categories: vec!["Data".to_string(), "engineering".to_string()],
            preferred_employment_type: vec!["Full-time".to_string()],
            ..Default::default()
        };
        let filter = derive_filters(&metadata);

        assert!(filter.matches(&seattle_go_role()));

        let mut contract = seattle_go_role();
        contract.employment_type = "Contract".to_string();
        assert!(!filter.matches(&contract));
    }

    #[test]
    fn test_filters_are_deterministic() {
        let metadata = ResumeMetadata {
            h1b_sponsorship_needed: Some(true),
            preferred_location: Some("Seattle".to_string()),
            preferred_job_categories: vec!["Engineering".to_string()],
            preferred_employment_type: vec!["Full-time".to_string()],
            ideal_companies: vec!["Acme".to_string()],
            equity_preference: Some(0.8),
        };

        let first = derive_filters(&metadata);
        let second = derive_filters(&metadata.clone());
        assert_eq!(first, second);
        assert_eq!(first.to_pinecone(), second.to_pinecone());

        let fields: Vec<JobField> = first.conditions.iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec![
                JobField::H1bSponsorship,
                JobField::Location,
                JobField::JobCategory,
                JobField::EmploymentType
            ]
        );
    }

    #[test]
    fn test_penalize_mode_keeps_non_sponsors() {
        let metadata = ResumeMetadata {
            h1b_sponsorship_needed: Some(true),
            preferred_location: Some("Seattle".to_string()),
            ..Default::default()
        };
        let filter = derive_filters_with(&metadata, SponsorshipMode::Penalize);

        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.conditions[0].field, JobField::Location);
        assert!(filter.matches(&seattle_go_role()));
    }

    #[test]
    fn test_pinecone_rendering_preserves_casing() {
        let metadata = ResumeMetadata {
            preferred_location: Some("  seattle ".to_string()),
            ..Default::default()
        };
        let filter = derive_filters(&metadata);

        assert_eq!(
            filter.to_pinecone().unwrap(),
            json!({ "$and": [ { "location": { "$eq": "seattle" } } ] })
        );
        // In-memory evaluation folds case, so "Seattle" still matches here
        assert!(filter.matches(&seattle_go_role()));
    }

    #[test]
    fn test_pinecone_rendering() {
        let metadata = ResumeMetadata {
            preferred_location: Some("Seattle".to_string()),
            preferred_job_categories: vec!["Engineering".to_string()],
            ..Default::default()
        };
        let rendered = derive_filters(&metadata).to_pinecone().unwrap();

        assert_eq!(
            rendered,
            json!({
                "$and": [
                    { "location": { "$eq": "Seattle" } },
                    { "job_category": { "$in": ["Engineering"] } }
                ]
            })
        );
    }

    #[test]
    fn test_condition_serialization() {
        let cond = FilterCondition {
            field: JobField::EmploymentType,
            op: FilterOp::In,
            value: FilterValue::List(vec!["Full-time".to_string()]),
        };
        let value = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            value,
            json!({ "field": "employment_type", "op": "in", "value": ["Full-time"] })
        );
    }
}
