// risk.rs — Risk scoring (spec §4.1 step 5).
//
// score ∈ [0,1] built from pattern hits, the action type's base risk
// weight, an argument-length heuristic, and an unknown-domain penalty for
// API_CALL. Kept as plain, testable arithmetic in the same style as
// `matches_resource_pattern`.

use regex::Regex;

use agentos_primitives::ActionType;

use crate::rules::RiskPolicy;

const PATTERN_HIT_WEIGHT: f64 = 0.2;
const OVERSIZED_ARGS_WEIGHT: f64 = 0.15;
const OVERSIZED_ARGS_THRESHOLD: usize = 2048;
const UNKNOWN_DOMAIN_PENALTY: f64 = 0.3;
const BLOCKED_DOMAIN_PENALTY: f64 = 1.0;

pub struct RiskAssessment {
    pub score: f64,
    pub matched_patterns: Vec<String>,
}

/// Score a request's scannable text and optional outbound domain (only
/// meaningful for `API_CALL`) against a `RiskPolicy`.
pub fn score(
    action_type: ActionType,
    text: &str,
    domain: Option<&str>,
    policy: &RiskPolicy,
) -> RiskAssessment {
    let mut score = action_type.base_risk_weight();
    let mut matched_patterns = Vec::new();

    for pattern in &policy.high_risk_patterns {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(text) {
                score += PATTERN_HIT_WEIGHT;
                matched_patterns.push(pattern.clone());
            }
        }
    }

    if text.len() > OVERSIZED_ARGS_THRESHOLD {
        score += OVERSIZED_ARGS_WEIGHT;
    }

    if action_type == ActionType::ApiCall {
        if let Some(domain) = domain {
            if policy.blocked_domains.contains(domain) {
                score += BLOCKED_DOMAIN_PENALTY;
            } else if !policy.allowed_domains.is_empty() && !policy.allowed_domains.contains(domain) {
                score += UNKNOWN_DOMAIN_PENALTY;
            }
        }
    }

    RiskAssessment {
        score: score.clamp(0.0, 1.0),
        matched_patterns,
    }
}
