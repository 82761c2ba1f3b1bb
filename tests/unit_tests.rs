// Unit tests for Resume Match

use resume_match::config::BoostWeights;
use resume_match::core::{
    cosine_similarity,
    document::normalize_text,
    filters::derive_filters,
    preferences::parse_preferences,
    reranker::{rank, Rescored},
    scoring::{blend, preference_adjustment},
};
use resume_match::models::{JobAttributes, JobCandidate, ResumeMetadata};

fn candidate(id: &str, similarity: f64) -> JobCandidate {
    JobCandidate::new(id.to_string(), similarity, JobAttributes::default())
}

fn rescored(score: f64) -> Rescored {
    Rescored {
        score,
        reasons: Vec::new(),
    }
}

#[test]
fn test_cosine_similarity_is_scale_invariant() {
    let a = [0.3, 0.4, 0.5];
    let b = [3.0, 4.0, 5.0];
    assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
}

#[test]
fn test_cosine_similarity_opposite_vectors() {
    let a = [1.0, 2.0];
    let b = [-1.0, -2.0];
    assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
}

#[test]
fn test_normalize_text_collapses_layout_noise() {
    let raw = "Jane Doe\r\n\r\n\r\n\tSenior   Go Engineer\x0CSeattle, WA  \n";
    assert_eq!(normalize_text(raw), "Jane Doe\n\nSenior Go Engineer\nSeattle, WA");
}

#[test]
fn test_parse_preferences_from_fenced_output() {
    let output = "```json\n{\"h1b_sponsorship_needed\": \"yes\", \"preferred_location\": \"Remote\", \"preferred_job_categories\": [\"Engineering\", \"engineering\"], \"equity_preference\": 0.7}\n```";
    let metadata = parse_preferences(output).unwrap();

    assert_eq!(metadata.h1b_sponsorship_needed, Some(true));
    assert_eq!(metadata.preferred_location.as_deref(), Some("Remote"));
    assert_eq!(metadata.preferred_job_categories, vec!["Engineering"]);
    assert_eq!(metadata.equity_preference, Some(0.7));
    assert!(metadata.ideal_companies.is_empty());
}

#[test]
fn test_parse_preferences_rejects_prose() {
    assert!(parse_preferences("The candidate prefers Seattle.").is_err());
}

#[test]
fn test_extracted_preferences_drive_filters() {
    let metadata = parse_preferences(
        r#"{"h1b_sponsorship_needed": true, "preferred_location": "Seattle", "preferred_employment_type": ["Full-time"]}"#,
    )
    .unwrap();
    let filter = derive_filters(&metadata);

    let mut job = JobAttributes {
        location: "seattle".to_string(),
        employment_type: "Full-time".to_string(),
        h1b_sponsorship: true,
        ..Default::default()
    };
    assert_eq!(filter.conditions.len(), 3);
    assert!(filter.matches(&job));

    job.h1b_sponsorship = false;
    assert!(!filter.matches(&job));
}

#[test]
fn test_ideal_companies_never_filter() {
    let metadata = ResumeMetadata {
        ideal_companies: vec!["Acme".to_string()],
        equity_preference: Some(0.9),
        ..Default::default()
    };
    assert!(derive_filters(&metadata).is_empty());
}

#[test]
fn test_preference_adjustment_combines_boost_and_penalty() {
    let preferences = ResumeMetadata {
        h1b_sponsorship_needed: Some(true),
        ideal_companies: vec!["Acme".to_string()],
        ..Default::default()
    };
    let job = JobAttributes {
        company_name: "Acme".to_string(),
        h1b_sponsorship: false,
        ..Default::default()
    };

    let (adjustment, reasons) = preference_adjustment(&preferences, &job, &BoostWeights::default());
    assert!((adjustment - (0.05 - 0.15)).abs() < 1e-9);
    assert_eq!(reasons.len(), 2);
}

#[test]
fn test_blend_weight_is_clamped() {
    assert_eq!(blend(0.4, 0.9, 2.0), 0.9);
    assert_eq!(blend(0.4, 0.9, -1.0), 0.4);
}

#[test]
fn test_rank_produces_contiguous_ranks() {
    let candidates = vec![
        candidate("a", 0.6),
        candidate("b", 0.9),
        candidate("c", 0.3),
        candidate("d", 0.7),
    ];
    let scores = vec![rescored(0.6), rescored(0.9), rescored(0.3), rescored(0.7)];

    let matches = rank(candidates, scores, 0.5, 10);

    let ids: Vec<&str> = matches.iter().map(|m| m.job_id.as_str()).collect();
    let ranks: Vec<usize> = matches.iter().map(|m| m.rank).collect();
    assert_eq!(ids, vec!["b", "d", "a"]);
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn test_rank_keeps_boundary_score() {
    let matches = rank(vec![candidate("a", 0.5)], vec![rescored(0.5)], 0.5, 10);
    assert_eq!(matches.len(), 1);
}

#[test]
fn test_rank_top_k_zero_is_empty() {
    let matches = rank(vec![candidate("a", 0.9)], vec![rescored(0.9)], 0.0, 0);
    assert!(matches.is_empty());
}
