//! Migration planner
//!
//! Computes the ordered set of databases to process from the source's full
//! database list and an optional filter pattern.

use regex::Regex;

/// Select the databases to migrate.
///
/// Retains names matching `pattern` (unanchored, so plain substrings work),
/// preserving the source's original order. The source is assumed to return
/// unique names, so no deduplication happens here. An empty result is valid
/// and means there is nothing to do.
pub fn plan(all_databases: &[String], pattern: Option<&Regex>) -> Vec<String> {
    all_databases
        .iter()
        .filter(|name| pattern.map_or(true, |re| re.is_match(name)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_without_pattern_keeps_everything() {
        let all = names(&["metrics_a", "metrics_b", "logs"]);
        assert_eq!(plan(&all, None), all);
    }

    #[test]
    fn test_plan_filters_and_preserves_order() {
        let all = names(&["metrics_a", "metrics_b", "logs"]);
        let re = Regex::new("^metrics").unwrap();
        assert_eq!(plan(&all, Some(&re)), names(&["metrics_a", "metrics_b"]));
    }

    #[test]
    fn test_plan_uses_substring_semantics() {
        let all = names(&["app_prod", "app_staging", "internal"]);
        let re = Regex::new("prod").unwrap();
        assert_eq!(plan(&all, Some(&re)), names(&["app_prod"]));
    }

    #[test]
    fn test_plan_empty_result_is_valid() {
        let all = names(&["logs"]);
        let re = Regex::new("^metrics").unwrap();
        assert!(plan(&all, Some(&re)).is_empty());
    }

    #[test]
    fn test_plan_does_not_deduplicate() {
        let all = names(&["dup", "dup"]);
        assert_eq!(plan(&all, None), names(&["dup", "dup"]));
    }
}
