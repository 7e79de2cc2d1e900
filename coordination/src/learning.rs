//! Learning module (§4.6): pattern extraction at session end, lesson
//! injection at prompt submit.
//!
//! Detectors are independent functions over [`SessionStats`] (§4.6
//! supplement), generalizing the one-signal-per-file style of
//! `escalation/*.rs` without adding detectors beyond the documented three.

use crate::config::Config;
use crate::error::HookResult;
use crate::store::{kv, StoreRoot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    HighRework,
    HighError,
    QualityDrop,
    Workflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub text: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Raw per-session signals a detector reasons over. Built by the caller
/// from whatever the host supplied in the event, or from a session-analysis
/// scratch file (§4.6).
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// file path -> number of Edit/Write/MultiEdit calls against it.
    pub file_edit_counts: HashMap<String, u32>,
    pub total_tool_calls: u32,
    pub error_count: u32,
    /// per-step quality in chronological order, as recorded by the
    /// trajectory module.
    pub quality_series: Vec<f64>,
}

impl SessionStats {
    pub fn error_rate(&self) -> f64 {
        if self.total_tool_calls == 0 {
            0.0
        } else {
            self.error_count as f64 / self.total_tool_calls as f64
        }
    }
}

fn detect_high_rework(stats: &SessionStats, config: &Config) -> Option<Pattern> {
    let threshold = config.high_rework_edit_threshold;
    let worst = stats
        .file_edit_counts
        .iter()
        .filter(|(_, &count)| count > threshold)
        .max_by_key(|(_, &count)| count)?;

    let confidence = (0.5 + 0.1 * (*worst.1 as f64 - threshold as f64)).min(1.0);
    Some(Pattern {
        text: format!(
            "file {} was edited {} times; consider planning the change before editing",
            worst.0, worst.1
        ),
        pattern_type: PatternType::HighRework,
        confidence,
        metadata: json!({ "file": worst.0, "edits": worst.1 }),
    })
}

fn detect_high_error(stats: &SessionStats, config: &Config) -> Option<Pattern> {
    let rate = stats.error_rate();
    if rate <= config.high_error_rate_threshold {
        return None;
    }
    let confidence = (0.4 + (rate - config.high_error_rate_threshold) * 2.0).min(1.0);
    Some(Pattern {
        text: format!(
            "tool error rate was {:.0}%; double-check commands before running them",
            rate * 100.0
        ),
        pattern_type: PatternType::HighError,
        confidence,
        metadata: json!({ "error_rate": rate }),
    })
}

fn detect_quality_drop(stats: &SessionStats, config: &Config) -> Option<Pattern> {
    if stats.quality_series.len() < 2 {
        return None;
    }
    let first = *stats.quality_series.first().unwrap();
    let last = *stats.quality_series.last().unwrap();
    let drop = first - last;
    if drop <= config.quality_drop_delta {
        return None;
    }
    let confidence = (0.6 + drop.min(0.4)).min(1.0);
    Some(Pattern {
        text: "step quality declined over the session; consider checkpointing sooner".to_string(),
        pattern_type: PatternType::QualityDrop,
        confidence,
        metadata: json!({ "drop": drop }),
    })
}

/// **extract**: run all detectors over `stats`, store any patterns that
/// fire, and return them.
pub fn extract(
    store: &StoreRoot,
    project: &str,
    stats: &SessionStats,
    config: &Config,
) -> HookResult<Vec<Pattern>> {
    let detectors: [fn(&SessionStats, &Config) -> Option<Pattern>; 3] = [
        detect_high_rework,
        detect_high_error,
        detect_quality_drop,
    ];

    let mut found = Vec::new();
    for detector in detectors {
        if let Some(pattern) = detector(stats, config) {
            store_pattern(store, project, &pattern)?;
            found.push(pattern);
        }
    }
    Ok(found)
}

fn fingerprint(project: &str, pattern: &Pattern) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    project.hash(&mut hasher);
    pattern.text.hash(&mut hasher);
    format!("pattern:{:x}", hasher.finish())
}

fn store_pattern(store: &StoreRoot, project: &str, pattern: &Pattern) -> HookResult<()> {
    let key = fingerprint(project, pattern);
    let mut value = serde_json::to_value(pattern)?;
    value["project"] = json!(project);
    kv::store(&store.memory_store(), &key, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    High,
    Medium,
}

fn band(confidence: f64, config: &Config) -> Option<Band> {
    if confidence >= config.confidence_high {
        Some(Band::High)
    } else if confidence >= config.confidence_medium {
        Some(Band::Medium)
    } else {
        None
    }
}

/// Crude token-overlap relevance score used by the file-store fallback
/// search when the orchestrator gateway is unavailable (§4.6 step 1).
fn token_overlap(prompt: &str, text: &str) -> f64 {
    let prompt_tokens: std::collections::HashSet<&str> = prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.len() > 2)
        .collect();
    if prompt_tokens.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let hits = prompt_tokens
        .iter()
        .filter(|t| text_lower.contains(&t.to_lowercase()))
        .count();
    hits as f64 / prompt_tokens.len() as f64
}

/// **inject**: search patterns for `project` relevant to `prompt`, sort by
/// confidence descending, cap at [`Config::max_injected_lessons`], and
/// format into the host's `additionalContext` payload.
pub fn inject(
    store: &StoreRoot,
    project: &str,
    prompt: &str,
    config: &Config,
) -> HookResult<serde_json::Value> {
    let entries = kv::list(&store.memory_store(), "pattern:")?;

    let mut candidates: Vec<Pattern> = entries
        .into_iter()
        .filter_map(|e| {
            let value = e.value;
            if value.get("project").and_then(|p| p.as_str()) != Some(project) {
                return None;
            }
            serde_json::from_value::<Pattern>(value).ok()
        })
        .filter(|p| p.confidence >= config.confidence_medium)
        .collect();

    // A prompt that shares no tokens with a lesson is still eligible — the
    // spec's relevance gate is the confidence floor, not text overlap.
    // Token overlap only breaks ties among equal-confidence candidates.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                token_overlap(prompt, &b.text)
                    .partial_cmp(&token_overlap(prompt, &a.text))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    candidates.truncate(config.max_injected_lessons);

    if candidates.is_empty() {
        return Ok(json!({}));
    }

    let bullets: Vec<String> = candidates
        .iter()
        .filter_map(|p| match band(p.confidence, config) {
            Some(Band::High) => Some(format!("- {}", p.text)),
            Some(Band::Medium) => Some(format!("- Consider: {}", p.text)),
            None => None,
        })
        .collect();

    if bullets.is_empty() {
        return Ok(json!({}));
    }

    let message = format!("[Lessons from past sessions]\n{}", bullets.join("\n"));
    Ok(json!({ "additionalContext": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> StoreRoot {
        StoreRoot::new(dir.to_path_buf())
    }

    #[test]
    fn high_rework_detector_fires_above_threshold() {
        let config = Config::default();
        let mut stats = SessionStats::default();
        stats.file_edit_counts.insert("src/main.rs".into(), 5);
        let pattern = detect_high_rework(&stats, &config).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::HighRework);
        assert!(pattern.confidence > 0.5);
    }

    #[test]
    fn high_error_detector_is_silent_below_threshold() {
        let config = Config::default();
        let mut stats = SessionStats::default();
        stats.total_tool_calls = 10;
        stats.error_count = 1;
        assert!(detect_high_error(&stats, &config).is_none());
    }

    #[test]
    fn inject_caps_at_three_sorted_by_confidence_with_bands() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        let config = Config::default();

        for (text, confidence) in [
            ("use checkpoints", 0.9),
            ("shrink edits", 0.6),
            ("noise", 0.3),
        ] {
            store_pattern(
                &st,
                "demo",
                &Pattern {
                    text: text.to_string(),
                    pattern_type: PatternType::Workflow,
                    confidence,
                    metadata: json!({}),
                },
            )
            .unwrap();
        }

        let result = inject(&st, "demo", "anything", &config).unwrap();
        let ctx = result["additionalContext"].as_str().unwrap();
        let lines: Vec<&str> = ctx.lines().skip(1).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "- use checkpoints");
        assert!(lines[1].starts_with("- Consider:"));
    }

    #[test]
    fn inject_with_no_patterns_is_empty() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        let config = Config::default();
        let result = inject(&st, "demo", "anything", &config).unwrap();
        assert_eq!(result, json!({}));
    }
}
