//! Query relevance classification
//!
//! Maps free-text questions onto the dashboard panels they are about. The
//! match is a case-insensitive substring search over a fixed set of trigger
//! terms per panel; a term may light more than one panel.

use crate::models::{HighlightFlags, Topic};
use regex::Regex;
use std::sync::OnceLock;

/// "timeout" and the ways people actually spell it in a question
const TIMEOUT_TERMS: &str = r"tim(?:e|ed|ing)[\s-]*out";

/// Compiled trigger patterns, one per topic, in panel order
static TRIGGERS: OnceLock<Vec<(Topic, Regex)>> = OnceLock::new();

fn triggers() -> &'static [(Topic, Regex)] {
    TRIGGERS.get_or_init(|| {
        Topic::ALL
            .into_iter()
            .map(|topic| {
                let pattern = format!("(?i){}", trigger_terms(topic));
                // Patterns are compile-time constants
                let regex = Regex::new(&pattern).expect("trigger pattern must compile");
                (topic, regex)
            })
            .collect()
    })
}

/// Alternation of trigger terms for a topic
fn trigger_terms(topic: Topic) -> String {
    match topic {
        Topic::Severity => "error|severity|crash".to_string(),
        Topic::Timeline => "trend|timeline|hour|day|24".to_string(),
        Topic::Pods => format!("pod|inference|latency|oom|{TIMEOUT_TERMS}"),
        Topic::Components => "load|traffic|component|distribution".to_string(),
        Topic::Security => format!("auth|token|login|network|gateway|{TIMEOUT_TERMS}"),
    }
}

/// Whether a query carries no classifiable text
pub fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// Classify a query into highlight flags
///
/// Pure and deterministic. Blank queries yield all flags cleared.
pub fn classify(query: &str) -> HighlightFlags {
    let mut flags = HighlightFlags::NONE;
    if is_blank(query) {
        return flags;
    }

    for (topic, regex) in triggers() {
        if regex.is_match(query) {
            flags.set(*topic, true);
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pods_timing_out_lights_pods_and_security() {
        let flags = classify("why are pods timing out");
        assert_eq!(
            flags,
            HighlightFlags {
                severity: false,
                timeline: false,
                pods: true,
                components: false,
                security: true,
            }
        );
    }

    #[test]
    fn test_timeout_always_lights_pods_and_security() {
        let queries = [
            "timeout",
            "Any TIMEOUTS on the gateway?",
            "requests timed out overnight",
            "show me every time-out",
            "xtimeouty",
        ];

        for query in queries {
            let flags = classify(query);
            assert!(flags.pods, "pods not lit for {query:?}");
            assert!(flags.security, "security not lit for {query:?}");
        }
    }

    #[test]
    fn test_blank_queries_clear_everything() {
        for query in ["", "   ", "\t\n"] {
            assert_eq!(classify(query), HighlightFlags::NONE);
            assert!(is_blank(query));
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        assert!(classify("CRASH LOOP").severity);
        assert!(classify("Error Trend").timeline);
    }

    #[test]
    fn test_each_topic_has_its_triggers() {
        assert!(classify("which severity dominates").severity);
        assert!(classify("errors in the last 24h").timeline);
        assert!(classify("any OOM kills").pods);
        assert!(classify("traffic distribution").components);
        assert!(classify("failed login attempts").security);
    }

    #[test]
    fn test_substring_match_inside_words() {
        // "pods" contains "pod", "authentication" contains "auth"
        let flags = classify("pods with authentication issues");
        assert!(flags.pods);
        assert!(flags.security);
        assert!(!flags.severity);
    }

    #[test]
    fn test_unrelated_query_lights_nothing() {
        assert_eq!(classify("hello"), HighlightFlags::NONE);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let query = "latency trend per component after the gateway crash";
        assert_eq!(classify(query), classify(query));
        assert_eq!(classify(query).count(), 5);
    }
}
