use crate::config::BoostWeights;
use crate::models::{JobAttributes, ResumeMetadata};

/// Calculate the preference-alignment adjustment for one posting
///
/// Adjustment formula:
/// adjustment = min(boosts, max_boost) - min(penalties, max_penalty)
///   boosts    = ideal_company            # posting company is on the candidate's list
///             + equity * preference      # candidate values equity and the posting offers some
///   penalties = sponsorship_penalty      # sponsorship needed but not offered
///
/// Returns the adjustment and one reason per applied term.
pub fn preference_adjustment(
    preferences: &ResumeMetadata,
    job: &JobAttributes,
    weights: &BoostWeights,
) -> (f64, Vec<String>) {
    let mut reasons = Vec::new();
    let mut boost = 0.0;
    let mut penalty = 0.0;

    if is_ideal_company(&job.company_name, &preferences.ideal_companies) {
        boost += weights.ideal_company;
        reasons.push(format!("ideal company: {}", job.company_name.trim()));
    }

    let equity = equity_boost(preferences.equity_preference, job.equity_max, weights.equity);
    if equity > 0.0 {
        boost += equity;
        reasons.push(format!("offers equity (up to {})", job.equity_max));
    }

    if preferences.h1b_sponsorship_needed == Some(true) && !job.h1b_sponsorship {
        penalty += weights.sponsorship_penalty;
        reasons.push("no H-1B sponsorship".to_string());
    }

    let adjustment = boost.min(weights.max_boost) - penalty.min(weights.max_penalty);
    (adjustment, reasons)
}

/// Weighted fusion of raw similarity with a secondary relevance score
#[inline]
pub fn blend(raw_similarity: f64, relevance: f64, weight: f64) -> f64 {
    let w = weight.clamp(0.0, 1.0);
    (1.0 - w) * raw_similarity + w * relevance
}

#[inline]
fn is_ideal_company(company: &str, ideal_companies: &[String]) -> bool {
    let company = company.trim();
    !company.is_empty()
        && ideal_companies
            .iter()
            .any(|ideal| ideal.trim().eq_ignore_ascii_case(company))
}

/// Scales with how strongly the candidate asked for equity
#[inline]
fn equity_boost(preference: Option<f64>, equity_max: f64, weight: f64) -> f64 {
    match preference {
        Some(p) if equity_max > 0.0 => weight * p.clamp(0.0, 1.0),
        _ => 0.0,
    }
}
