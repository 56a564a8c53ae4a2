//! Confidence scoring and consistency checks for tool output.
//!
//! Pure functions of a `ToolInvocation`: nothing here touches the network or
//! re-runs a tool. Penalty magnitudes are defaults and can be tuned through
//! `VerifierPenalties` (see `AgentConfig`).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::tools::ToolInvocation;

/// Highest confidence a failed invocation can score, whatever the tuning
pub const FAILED_CONFIDENCE_CEILING: f64 = 0.4;

/// Penalties subtracted from a starting confidence of 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifierPenalties {
    /// Applied once when any expected payload field is absent or empty
    pub missing_fields: f64,
    /// Applied when the tool failed but still returned a partial payload
    pub invocation_failure: f64,
    /// Applied per conflicting field across sub-results describing one entity
    pub conflict: f64,
    /// Below this confidence a cross-validation hint is attached
    pub cross_validation_threshold: f64,
}

impl VerifierPenalties {
    /// Penalties must be finite and non-negative; the threshold must lie in [0, 1]
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, v) in [
            ("missing_fields", self.missing_fields),
            ("invocation_failure", self.invocation_failure),
            ("conflict", self.conflict),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("verifier.{} must be a non-negative number, got {}", name, v));
            }
        }
        let t = self.cross_validation_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(format!("verifier.cross_validation_threshold must be in [0, 1], got {}", t));
        }
        Ok(())
    }
}

impl Default for VerifierPenalties {
    fn default() -> Self {
        Self {
            missing_fields: 0.3,
            invocation_failure: 0.6,
            conflict: 0.2,
            cross_validation_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// In [0, 1]
    pub confidence: f64,
    pub consistency_flags: BTreeSet<String>,
    /// Advisory text only; nothing re-runs automatically
    pub cross_validation_hint: Option<String>,
}

impl VerificationResult {
    /// No tool output to distrust
    pub fn clean() -> Self {
        Self {
            confidence: 1.0,
            consistency_flags: BTreeSet::new(),
            cross_validation_hint: None,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.consistency_flags.contains(flag)
    }

    pub fn add_flag(&mut self, flag: impl Into<String>) {
        self.consistency_flags.insert(flag.into());
    }
}

/// Fields a successful payload is expected to carry, per tool
fn default_expected_fields() -> HashMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("weather", &["temp", "feels_like", "min", "max"]),
        ("forum", &["posts"]),
        ("reddit", &["posts"]),
        ("search", &["results"]),
        ("scrape", &["url", "content"]),
        ("calculator", &["result"]),
    ];
    table
        .iter()
        .map(|(tool, fields)| {
            (
                tool.to_string(),
                fields.iter().map(|f| f.to_string()).collect(),
            )
        })
        .collect()
}

/// Keys under which multi-item payloads keep their sub-results
const ITEM_KEYS: &[&str] = &["results", "posts", "items", "hits"];

/// Keys that identify the entity an item describes, in priority order
const IDENTITY_KEYS: &[&str] = &["id", "url", "title", "name"];

#[derive(Debug, Clone)]
pub struct Verifier {
    penalties: VerifierPenalties,
    expected_fields: HashMap<String, Vec<String>>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifierPenalties::default())
    }
}

impl Verifier {
    pub fn new(penalties: VerifierPenalties) -> Self {
        Self {
            penalties,
            expected_fields: default_expected_fields(),
        }
    }

    /// Declare (or replace) the fields expected in a tool's payload
    pub fn with_expected_fields(mut self, tool: &str, fields: &[&str]) -> Self {
        self.expected_fields.insert(
            tool.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn penalties(&self) -> VerifierPenalties {
        self.penalties
    }

    pub fn verify(&self, invocation: &ToolInvocation) -> VerificationResult {
        let mut confidence = 1.0_f64;
        let mut flags = BTreeSet::new();
        let raw = &invocation.raw_result;

        if let Some(reason) = raw.failure_reason() {
            flags.insert("invocation_failed".to_string());
            match raw.payload() {
                None => {
                    flags.insert("no_payload".to_string());
                    confidence = 0.0;
                }
                Some(_) => confidence -= self.penalties.invocation_failure.max(0.0),
            }
            debug!(target: "verifier", tool = %invocation.tool_name, reason = %reason, "Scoring failed invocation");
        }

        if let Some(payload) = raw.payload() {
            let missing = self.missing_fields(&invocation.tool_name, payload);
            if !missing.is_empty() {
                confidence -= self.penalties.missing_fields.max(0.0);
                for field in missing {
                    flags.insert(format!("missing_field:{}", field));
                }
            }

            let items = extract_items(payload);
            if items.len() > 1 {
                let groups = group_by_entity(&items);
                let conflicts = find_conflicts(&items, &groups);
                confidence -= self.penalties.conflict.max(0.0) * conflicts.len() as f64;
                flags.extend(conflicts);
                flags.extend(majority_outliers(&items, &groups));
                flags.extend(credibility_outliers(&items));
            }
        }

        if raw.failure_reason().is_some() {
            confidence = confidence.min(FAILED_CONFIDENCE_CEILING);
        }
        let confidence = round4(confidence.clamp(0.0, 1.0));
        let cross_validation_hint = if confidence < self.penalties.cross_validation_threshold {
            Some(cross_validation_hint(invocation, confidence))
        } else {
            None
        };

        debug!(target: "verifier", tool = %invocation.tool_name, confidence = %confidence, flags = flags.len(), "Verification complete");

        VerificationResult {
            confidence,
            consistency_flags: flags,
            cross_validation_hint,
        }
    }

    /// Result for a turn that produced nothing trustworthy (tool never ran
    /// because of bad input, or the provider was unreachable)
    pub fn unavailable(&self, flag: &str, explanation: &str) -> VerificationResult {
        let mut consistency_flags = BTreeSet::new();
        consistency_flags.insert(flag.to_string());
        VerificationResult {
            confidence: 0.0,
            consistency_flags,
            cross_validation_hint: Some(format!(
                "{}. Try again, rephrase the request, or switch to a different tool or provider.",
                explanation.trim_end_matches('.')
            )),
        }
    }

    fn missing_fields(&self, tool: &str, payload: &Value) -> Vec<String> {
        let Some(expected) = self.expected_fields.get(tool) else {
            return Vec::new();
        };
        expected
            .iter()
            .filter(|f| payload.get(f.as_str()).map_or(true, is_empty_value))
            .cloned()
            .collect()
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn cross_validation_hint(invocation: &ToolInvocation, confidence: f64) -> String {
    match invocation.raw_result.failure_reason() {
        Some(reason) => format!(
            "The {} tool failed ({}). Re-run the request later or ask again with a different tool or provider.",
            invocation.tool_name, reason
        ),
        None => format!(
            "Confidence in the {} result is low ({:.2}). Cross-check it by re-querying with a different tool or provider.",
            invocation.tool_name, confidence
        ),
    }
}

/// Object items of a multi-item payload, if it has one
fn extract_items(payload: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let list = match payload {
        Value::Array(a) => Some(a),
        Value::Object(o) => ITEM_KEYS
            .iter()
            .find_map(|k| o.get(*k).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|a| a.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn identity_of(item: &serde_json::Map<String, Value>) -> Option<(&'static str, String)> {
    IDENTITY_KEYS.iter().find_map(|k| {
        item.get(*k)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| (*k, s))
    })
}

/// Item indices grouped by entity identity, in first-seen order
fn group_by_entity(items: &[&serde_json::Map<String, Value>]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Some((_, id)) = identity_of(item) else {
            continue;
        };
        match groups.iter_mut().find(|(g, _)| *g == id) {
            Some((_, members)) => members.push(i),
            None => groups.push((id, vec![i])),
        }
    }
    groups
}

/// Numeric fields shared by items of a group, in first-seen order
fn numeric_fields(items: &[&serde_json::Map<String, Value>], members: &[usize]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for &i in members {
        for (k, v) in items[i] {
            if v.is_number() && !fields.contains(k) {
                fields.push(k.clone());
            }
        }
    }
    fields
}

fn number_at(item: &serde_json::Map<String, Value>, field: &str) -> Option<f64> {
    item.get(field).and_then(Value::as_f64)
}

/// One flag per (entity, field) whose numeric values disagree
fn find_conflicts(
    items: &[&serde_json::Map<String, Value>],
    groups: &[(String, Vec<usize>)],
) -> Vec<String> {
    let mut out = Vec::new();
    for (id, members) in groups.iter().filter(|(_, m)| m.len() > 1) {
        for field in numeric_fields(items, members) {
            let mut distinct: Vec<f64> = Vec::new();
            for &i in members {
                if let Some(v) = number_at(items[i], &field) {
                    if !distinct.iter().any(|d| (d - v).abs() < f64::EPSILON) {
                        distinct.push(v);
                    }
                }
            }
            if distinct.len() > 1 {
                out.push(format!("conflict:{}:{}", id, field));
            }
        }
    }
    out
}

/// Items disagreeing with a strict majority of their entity group
fn majority_outliers(
    items: &[&serde_json::Map<String, Value>],
    groups: &[(String, Vec<usize>)],
) -> Vec<String> {
    let mut out = Vec::new();
    for (_, members) in groups.iter().filter(|(_, m)| m.len() > 2) {
        for field in numeric_fields(items, members) {
            let values: Vec<(usize, f64)> = members
                .iter()
                .filter_map(|&i| number_at(items[i], &field).map(|v| (i, v)))
                .collect();
            let majority = values.iter().find(|(_, v)| {
                let count = values
                    .iter()
                    .filter(|(_, o)| (o - v).abs() < f64::EPSILON)
                    .count();
                count * 2 > values.len()
            });
            if let Some(&(_, m)) = majority {
                for (i, v) in &values {
                    if (v - m).abs() >= f64::EPSILON {
                        out.push(format!("contradicts_majority:{}", i));
                    }
                }
            }
        }
    }
    out
}

/// Tier 1 is most credible. Accepts integers or "high"/"medium"/"low".
fn tier_of(item: &serde_json::Map<String, Value>) -> Option<i64> {
    match item.get("credibility_tier")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => match s.to_lowercase().as_str() {
            "high" => Some(1),
            "medium" => Some(2),
            "low" => Some(3),
            _ => None,
        },
        _ => None,
    }
}

/// Items whose source tier sits two or more steps from the most common tier.
/// Skipped entirely when fewer than two items carry a tier hint.
fn credibility_outliers(items: &[&serde_json::Map<String, Value>]) -> Vec<String> {
    let tiers: Vec<(usize, i64)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| tier_of(item).map(|t| (i, t)))
        .collect();
    if tiers.len() < 2 {
        return Vec::new();
    }
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for (_, t) in &tiers {
        *counts.entry(*t).or_default() += 1;
    }
    // ties resolve toward the more credible tier
    let Some(mode) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(t, _)| *t)
    else {
        return Vec::new();
    };
    tiers
        .iter()
        .filter(|(_, t)| (t - mode).abs() >= 2)
        .map(|(i, _)| {
            let label = items[*i]
                .get("domain")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| i.to_string());
            format!("credibility_outlier:{}", label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RawResult;
    use serde_json::json;

    fn ok(tool: &str, payload: Value) -> ToolInvocation {
        ToolInvocation::new(tool, json!({}), RawResult::success(payload))
    }

    #[test]
    fn clean_weather_payload_scores_full_confidence() {
        let v = Verifier::default().verify(&ok(
            "weather",
            json!({"temp": 22, "feels_like": 21, "min": 18, "max": 25}),
        ));
        assert_eq!(v.confidence, 1.0);
        assert!(v.consistency_flags.is_empty());
        assert!(v.cross_validation_hint.is_none());
    }

    #[test]
    fn missing_fields_apply_one_penalty() {
        let v = Verifier::default().verify(&ok("weather", json!({"temp": 22})));
        assert_eq!(v.confidence, 0.7);
        assert!(v.has_flag("missing_field:feels_like"));
        assert!(v.has_flag("missing_field:max"));
    }

    #[test]
    fn failure_without_payload_is_total() {
        let inv = ToolInvocation::new("forum", json!({}), RawResult::failure("network down"));
        let v = Verifier::default().verify(&inv);
        assert_eq!(v.confidence, 0.0);
        assert!(v.has_flag("invocation_failed"));
        assert!(v.cross_validation_hint.unwrap().contains("network down"));
    }

    #[test]
    fn failure_with_partial_payload_is_penalised() {
        let inv = ToolInvocation::new(
            "calculator",
            json!({}),
            RawResult::Failure {
                reason: "overflow".into(),
                partial: Some(json!({"result": 1})),
            },
        );
        let v = Verifier::default().verify(&inv);
        assert_eq!(v.confidence, 0.4);
    }

    #[test]
    fn conflicting_scores_for_one_post_are_penalised() {
        let payload = json!({"posts": [
            {"title": "Rust 2.0", "score": 120},
            {"title": "Rust 2.0", "score": 80},
            {"title": "Other", "score": 5}
        ]});
        let v = Verifier::default().verify(&ok("forum", payload));
        assert_eq!(v.confidence, 0.8);
        assert!(v.has_flag("conflict:rust 2.0:score"));
    }

    #[test]
    fn majority_outlier_is_flagged() {
        let payload = json!({"results": [
            {"title": "Nile length", "km": 6650},
            {"title": "Nile length", "km": 6650},
            {"title": "Nile length", "km": 7088}
        ]});
        let v = Verifier::default().verify(&ok("search", payload));
        assert!(v.has_flag("contradicts_majority:2"));
        assert!(!v.has_flag("contradicts_majority:0"));
    }

    #[test]
    fn credibility_check_is_skipped_without_tiers() {
        let payload = json!({"results": [
            {"title": "a", "url": "https://a.example"},
            {"title": "b", "url": "https://b.example"}
        ]});
        let v = Verifier::default().verify(&ok("search", payload));
        assert!(!v.consistency_flags.iter().any(|f| f.starts_with("credibility")));
    }

    #[test]
    fn credibility_outlier_is_flagged_by_domain() {
        let payload = json!({"results": [
            {"url": "https://a.gov", "domain": "a.gov", "credibility_tier": "high"},
            {"url": "https://b.edu", "domain": "b.edu", "credibility_tier": 1},
            {"url": "https://c.biz", "domain": "c.biz", "credibility_tier": "low"}
        ]});
        let v = Verifier::default().verify(&ok("search", payload));
        assert!(v.has_flag("credibility_outlier:c.biz"));
        assert_eq!(v.confidence, 1.0);
    }

    #[test]
    fn adding_a_conflict_never_raises_confidence() {
        let verifier = Verifier::default();
        let clean = json!({"posts": [
            {"title": "A", "score": 1},
            {"title": "B", "score": 2}
        ]});
        let conflicted = json!({"posts": [
            {"title": "A", "score": 1},
            {"title": "B", "score": 2},
            {"title": "A", "score": 9}
        ]});
        let c1 = verifier.verify(&ok("forum", clean)).confidence;
        let c2 = verifier.verify(&ok("forum", conflicted)).confidence;
        assert!(c2 <= c1);
    }

    #[test]
    fn unknown_tool_has_no_expected_fields() {
        let v = Verifier::default().verify(&ok("translator", json!({"text": "hola"})));
        assert_eq!(v.confidence, 1.0);
    }

    #[test]
    fn custom_penalties_are_respected() {
        let verifier = Verifier::new(VerifierPenalties {
            missing_fields: 0.5,
            ..VerifierPenalties::default()
        });
        let v = verifier.verify(&ok("calculator", json!({})));
        assert_eq!(v.confidence, 0.5);
        assert!(v.cross_validation_hint.is_none());
    }
}
