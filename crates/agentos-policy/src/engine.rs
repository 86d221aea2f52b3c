// engine.rs — PolicyEngine::evaluate, the default-deny evaluation chokepoint.
//
// Implements the seven-step algorithm from spec §4.1. Generalizes the
// precedent's `ta_policy::engine::PolicyEngine::evaluate` (manifest lookup
// + single grant match) into a full ABAC pipeline: mandatory safety
// screen, allow-list, conditional permissions, cross-cutting rules, risk
// scoring, quotas, and a recorded audit entry — the same "single
// chokepoint, deterministic decision" shape, more steps.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use agentos_audit::{redact, AuditEntry, FlightRecorder, RecordedEffect};
use agentos_audit::hasher;
use agentos_primitives::{ExecutionRequest, SignalKind};
use agentos_signal::{Signal, SignalDispatcher};

use crate::condition::ConditionOutcome;
use crate::decision::{EvaluationStep, EvaluationTrace, PolicyDecision};
use crate::error::PolicyError;
use crate::quota::QuotaViolation;
use crate::risk;
use crate::rules::Effect;
use crate::safety::{mandatory_safety_screen, matches_resource_pattern};
use crate::tables::PolicyTables;

/// The policy engine: one chokepoint every `ExecutionRequest` passes
/// through. Tables are owned here and mutated only through `reload`;
/// `recorder` and `quotas` are the only interior-mutable state, guarded
/// independently since recording and quota tracking are unrelated writers.
pub struct PolicyEngine {
    tables: RwLock<PolicyTables>,
    quotas: crate::quota::QuotaTracker,
    recorder: Arc<Mutex<FlightRecorder>>,
    signals: Option<SignalDispatcher>,
}

impl PolicyEngine {
    /// `recorder` is shared (not owned) since the kernel also writes
    /// sandbox/memory events into the same hash chain.
    pub fn new(
        tables: PolicyTables,
        recorder: Arc<Mutex<FlightRecorder>>,
        signals: Option<SignalDispatcher>,
    ) -> Self {
        Self {
            tables: RwLock::new(tables),
            quotas: crate::quota::QuotaTracker::new(),
            recorder,
            signals,
        }
    }

    /// Atomically replace the policy tables (e.g. after a config reload).
    pub fn reload(&self, tables: PolicyTables) {
        *self.tables.write().expect("policy tables lock poisoned") = tables;
    }

    /// The shared quota tracker, for callers that hold an execution-scoped
    /// concurrency guard across the lifetime of the actual tool call.
    pub fn quotas(&self) -> &crate::quota::QuotaTracker {
        &self.quotas
    }

    /// The resource quota configured for `role`, for callers that need
    /// `max_concurrent_executions` to acquire an execution-scoped guard
    /// via [`Self::quotas`].
    pub fn quota_for(&self, role: &str) -> crate::rules::ResourceQuota {
        let tables = self.tables.read().expect("policy tables lock poisoned");
        tables.quota_for(role)
    }

    /// Evaluate a request for `role` and return the decision. Fail-closed:
    /// any internal error here returns DENY rather than propagating.
    pub fn evaluate(&self, request: &ExecutionRequest, role: &str) -> PolicyDecision {
        tracing::debug!(
            agent_id = %request.agent_id,
            tool_name = %request.tool_name,
            action_type = %request.action_type,
            "evaluating execution request"
        );
        let start = Instant::now();
        let mut steps = Vec::new();
        let decision = self.evaluate_inner_traced(request, role, &mut steps);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let decision = decision.with_elapsed_ms(elapsed_ms);
        if !decision.allowed {
            tracing::warn!(agent_id = %request.agent_id, reason = %decision.reason, "request denied");
        }
        for timeout_step in steps.iter().filter(|s| s.check == "regex_timeout") {
            tracing::warn!(agent_id = %request.agent_id, detail = %timeout_step.outcome, "condition regex evaluation timed out");
        }
        self.record(request, &decision, &steps);
        decision
    }

    /// Same evaluation, but returns the full step-by-step trace for
    /// decision observability (grounded on
    /// `ta_policy::engine::evaluate_with_trace`).
    pub fn evaluate_with_trace(&self, request: &ExecutionRequest, role: &str) -> EvaluationTrace {
        let start = Instant::now();
        let mut steps = Vec::new();
        let decision = self.evaluate_inner_traced(request, role, &mut steps);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let decision = decision.with_elapsed_ms(elapsed_ms);
        self.record(request, &decision, &steps);
        EvaluationTrace { decision, steps }
    }

    fn evaluate_inner_traced(
        &self,
        request: &ExecutionRequest,
        role: &str,
        steps: &mut Vec<EvaluationStep>,
    ) -> PolicyDecision {
        let tables = match self.tables.read() {
            Ok(t) => t,
            Err(_) => {
                tracing::error!("policy table lock poisoned; failing closed");
                steps.push(step("internal", "failed: policy table lock poisoned", true));
                return PolicyDecision::deny("internal error: policy tables unavailable");
            }
        };

        // Step 1: mandatory safety screen.
        let text = request.scannable_text();
        if let Some(violation) = mandatory_safety_screen(request.action_type, &text) {
            steps.push(step("mandatory_safety_screen", &violation.detail, true));
            return PolicyDecision::deny_matched(violation.rule, violation.detail);
        }
        steps.push(step("mandatory_safety_screen", "passed", false));

        // Step 2 + 3: allow-list and conditional permissions.
        let tool_statically_allowed = tables
            .allow_list
            .get(role)
            .map(|tools| tools.contains(&request.tool_name))
            .unwrap_or(true);
        let conditional_entries: Vec<_> = tables
            .conditional_permissions
            .get(role)
            .map(|perms| perms.iter().filter(|p| p.tool_name == request.tool_name).collect())
            .unwrap_or_default();

        let mut draft_effect = Effect::Allow;
        let mut matched_rule: Option<String> = None;
        let mut reason = format!("matched allow_list for role '{}'", role);

        if !tool_statically_allowed && conditional_entries.is_empty() {
            steps.push(step("allow_list", "failed: tool not permitted", true));
            return PolicyDecision::deny(format!(
                "tool '{}' not permitted for role '{}'",
                request.tool_name, role
            ));
        }
        steps.push(step("allow_list", "passed", false));

        if !conditional_entries.is_empty() {
            let root = request.as_condition_root(role);
            let resource_target = resource_target(request);
            let mut timed_out_conditions: Vec<&str> = Vec::new();
            let any_matched = conditional_entries.iter().any(|perm| {
                if let Some(pattern) = &perm.resource_pattern {
                    let target = resource_target.unwrap_or("");
                    if !matches_resource_pattern(pattern, target) {
                        return false;
                    }
                }
                let outcomes: Vec<ConditionOutcome> =
                    perm.conditions.iter().map(|c| c.evaluate(&root)).collect();
                for (condition, outcome) in perm.conditions.iter().zip(outcomes.iter()) {
                    if *outcome == ConditionOutcome::RegexTimeout {
                        timed_out_conditions.push(condition.attribute_path.as_str());
                    }
                }
                if perm.require_all {
                    outcomes.iter().all(|o| *o == ConditionOutcome::Matched)
                } else {
                    outcomes.iter().any(|o| *o == ConditionOutcome::Matched)
                }
            });
            if !timed_out_conditions.is_empty() {
                steps.push(step(
                    "regex_timeout",
                    &format!(
                        "conditional_permissions:{}:{}",
                        request.tool_name,
                        timed_out_conditions.join(",")
                    ),
                    false,
                ));
            }
            if any_matched {
                steps.push(step("conditional_permissions", "matched", false));
                draft_effect = Effect::Allow;
                matched_rule = Some(format!("conditional_permission:{}", request.tool_name));
                reason = format!("conditional permission matched for tool '{}'", request.tool_name);
            } else {
                steps.push(step("conditional_permissions", "failed: no condition matched", true));
                return PolicyDecision::deny(format!(
                    "no grant for {} on role '{}'",
                    request.tool_name, role
                ));
            }
        } else {
            steps.push(step("conditional_permissions", "no entries for this tool", false));
        }

        // Step 4: cross-cutting rules, descending priority, first match wins.
        let root = request.as_condition_root(role);
        for rule in &tables.custom_rules {
            if !rule.applies_to.contains(&request.action_type) {
                continue;
            }
            let outcome = rule.predicate.evaluate(&root);
            if outcome == ConditionOutcome::RegexTimeout {
                steps.push(step(
                    "regex_timeout",
                    &format!("cross_cutting_rules:{}", rule.rule_id),
                    false,
                ));
            }
            if outcome == ConditionOutcome::Matched {
                draft_effect = rule.effect;
                matched_rule = Some(rule.rule_id.clone());
                reason = rule.name.clone();
                steps.push(step(
                    "cross_cutting_rules",
                    &format!("matched rule '{}'", rule.rule_id),
                    false,
                ));
                break;
            }
        }

        // Step 5: risk scoring.
        let risk_policy = tables.risk_policy_for(role);
        let domain = request
            .arguments
            .get("domain")
            .and_then(|v| v.as_str())
            .or_else(|| request.arguments.get("url").and_then(|v| v.as_str()));
        let assessment = risk::score(request.action_type, &text, domain, &risk_policy);
        if assessment.score >= risk_policy.deny_above {
            draft_effect = Effect::Deny;
            matched_rule = Some("risk.deny_above".to_string());
            reason = format!("risk score {:.2} exceeds deny threshold", assessment.score);
            steps.push(step("risk_scoring", &reason, false));
        } else if assessment.score >= risk_policy.require_approval_above {
            if draft_effect == Effect::Allow {
                draft_effect = Effect::RequireApproval;
                matched_rule = Some("risk.require_approval_above".to_string());
                reason = format!("risk score {:.2} requires approval", assessment.score);
            }
            steps.push(step("risk_scoring", &reason, false));
        } else {
            steps.push(step("risk_scoring", &format!("score {:.2}", assessment.score), false));
        }

        // Step 6: quota check (only applies to requests that would otherwise
        // be allowed or deferred for approval).
        if draft_effect == Effect::Allow || draft_effect == Effect::RequireApproval {
            let quota = tables.quota_for(role);
            if let Some(allowed_types) = &quota.allowed_action_types {
                if !allowed_types.contains(&request.action_type) {
                    steps.push(step("quota", "failed: action type not permitted by quota", true));
                    return PolicyDecision::deny(format!(
                        "action type '{}' not permitted by quota for role '{}'",
                        request.action_type, role
                    ));
                }
            }
            match self.quotas.check_and_record(&request.agent_id, &quota, chrono::Utc::now()) {
                Ok(_guard) => {
                    // Concurrency is held only for the evaluation itself — the
                    // caller is expected to acquire its own execution-scoped
                    // guard via `quotas()` if it needs to bound actual tool
                    // execution overlap; this check only rate-limits bursts
                    // of decisions.
                    steps.push(step("quota", "passed", true));
                }
                Err(violation) => {
                    let msg = match violation {
                        QuotaViolation::PerMinuteExceeded => "per-minute quota exceeded",
                        QuotaViolation::PerHourExceeded => "per-hour quota exceeded",
                        QuotaViolation::ConcurrentExceeded => "concurrent execution quota exceeded",
                    };
                    steps.push(step("quota", &format!("failed: {}", msg), true));
                    return PolicyDecision::rate_limited(msg);
                }
            }
        } else {
            steps.push(step("quota", "skipped: draft decision is not allow/require_approval", true));
        }

        build_decision(draft_effect, matched_rule, reason)
    }

    fn record(&self, request: &ExecutionRequest, decision: &PolicyDecision, steps: &[EvaluationStep]) {
        let (mut redacted_reason, _) = redact(&decision.reason);
        for timeout_step in steps.iter().filter(|s| s.check == "regex_timeout") {
            redacted_reason.push_str(&format!(" [regex_timeout: {}]", timeout_step.outcome));
        }
        let args_text = request.scannable_text();
        let args_digest = hasher::hash_str(&args_text);

        let mut signals = Vec::new();
        if !decision.allowed && !decision.rate_limited {
            if let Some(dispatcher) = &self.signals {
                let _ = dispatcher.send(
                    &request.agent_id,
                    Signal::new(SignalKind::Sigpolicy, "policy_engine"),
                );
            }
            signals.push(SignalKind::Sigpolicy);
        }

        let recorded_effect = match decision.effect {
            Effect::Allow => RecordedEffect::Allow,
            Effect::Deny => RecordedEffect::Deny,
            Effect::Warn => RecordedEffect::Warn,
            Effect::RequireApproval => RecordedEffect::RequireApproval,
            Effect::Log => RecordedEffect::Log,
        };

        let entry = AuditEntry::draft(
            request.agent_id.clone(),
            request.action_type,
            request.tool_name.clone(),
            args_digest,
            recorded_effect,
            redacted_reason,
            signals,
        );

        if let Ok(mut recorder) = self.recorder.lock() {
            if recorder.append(entry).is_err() {
                tracing::error!(agent_id = %request.agent_id, "flight recorder write failed; downstream decisions must downgrade to DENY");
            }
        }
    }
}

fn build_decision(effect: Effect, matched_rule: Option<String>, reason: String) -> PolicyDecision {
    match effect {
        Effect::Allow => PolicyDecision {
            allowed: true,
            effect,
            matched_rule,
            reason,
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        },
        Effect::Warn => PolicyDecision {
            allowed: true,
            effect,
            matched_rule,
            reason,
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        },
        Effect::RequireApproval => PolicyDecision {
            allowed: false,
            effect,
            matched_rule,
            reason,
            rate_limited: false,
            required_approval: true,
            evaluation_ms: 0.0,
        },
        Effect::Deny | Effect::Log => PolicyDecision {
            allowed: false,
            effect,
            matched_rule,
            reason,
            rate_limited: false,
            required_approval: false,
            evaluation_ms: 0.0,
        },
    }
}

fn resource_target(request: &ExecutionRequest) -> Option<&str> {
    ["path", "target_uri", "url"]
        .iter()
        .find_map(|key| request.arguments.get(*key).and_then(|v| v.as_str()))
}

fn step(check: &str, outcome: &str, terminal: bool) -> EvaluationStep {
    EvaluationStep {
        check: check.to_string(),
        outcome: outcome.to_string(),
        terminal,
    }
}
