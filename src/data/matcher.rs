use crate::core::config::MatcherConfig;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Maps arbitrary user field names onto a form's field names.
///
/// Two passes: exact case-insensitive matches first, then approximate
/// matches over whatever remains. A target field is consumed by at most one
/// user key per call.
pub struct FieldMatcher {
    config: MatcherConfig,
}

impl FieldMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn match_fields(
        &self,
        target_fields: &[String],
        user_data: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut matches: HashMap<String, String> = HashMap::new();
        let mut used_targets: HashSet<&str> = HashSet::new();

        // Pass 1: exact matches, ignoring case. Keys are visited in sorted
        // order so two keys colliding on one target resolve the same way
        // every run.
        let mut user_keys: Vec<&String> = user_data.keys().collect();
        user_keys.sort();

        for user_key in user_keys {
            let user_lower = user_key.to_lowercase();
            for target in target_fields {
                if used_targets.contains(target.as_str()) {
                    continue;
                }
                if target.to_lowercase() == user_lower {
                    matches.insert(user_key.clone(), target.clone());
                    used_targets.insert(target.as_str());
                    break;
                }
            }
        }

        // Pass 2: fuzzy matching for whatever is left. User keys are
        // visited in sorted order so repeated runs produce the same
        // mapping; target ties resolve to the earlier target.
        let mut remaining: Vec<&String> = user_data
            .keys()
            .filter(|k| !matches.contains_key(*k))
            .collect();
        remaining.sort();

        for user_key in remaining {
            let user_lower = user_key.to_lowercase();
            let mut best_match: Option<&str> = None;
            let mut best_score = self.config.similarity_threshold;

            for target in target_fields {
                if used_targets.contains(target.as_str()) {
                    continue;
                }
                let score = strsim::normalized_levenshtein(&user_lower, &target.to_lowercase());
                if score > best_score {
                    best_score = score;
                    best_match = Some(target.as_str());
                }
            }

            if let Some(target) = best_match {
                debug!(user_key = %user_key, target = %target, score = best_score, "fuzzy field match");
                matches.insert(user_key.clone(), target.to_string());
                used_targets.insert(target);
            }
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> FieldMatcher {
        FieldMatcher::new(MatcherConfig::default())
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn data(keys: &[&str]) -> HashMap<String, String> {
        keys.iter().map(|k| (k.to_string(), "v".to_string())).collect()
    }

    #[test]
    fn exact_match_ignores_case() {
        let matches = matcher().match_fields(&targets(&["Email", "phone"]), &data(&["email"]));
        assert_eq!(matches.get("email"), Some(&"Email".to_string()));
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let matches =
            matcher().match_fields(&targets(&["full_name", "email"]), &data(&["full_names"]));
        assert_eq!(matches.get("full_names"), Some(&"full_name".to_string()));
    }

    #[test]
    fn dissimilar_keys_stay_unmapped() {
        let matches = matcher().match_fields(&targets(&["email"]), &data(&["witness_address"]));
        assert!(matches.is_empty());
    }

    #[test]
    fn case_colliding_keys_resolve_deterministically() {
        // "Email" and "email" both match the one target exactly; the
        // sort-order key wins every run
        let target_fields = targets(&["email"]);
        let user_data = data(&["Email", "email"]);

        for _ in 0..10 {
            let matches = matcher().match_fields(&target_fields, &user_data);
            assert_eq!(matches.len(), 1);
            assert_eq!(matches.get("Email"), Some(&"email".to_string()));
        }
    }

    #[test]
    fn each_target_consumed_at_most_once() {
        let matches = matcher().match_fields(
            &targets(&["phone"]),
            &data(&["phone", "phones"]),
        );
        // exact match takes the target; the fuzzy candidate finds it consumed
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.get("phone"), Some(&"phone".to_string()));
    }

    #[test]
    fn matching_is_idempotent() {
        let target_fields = targets(&["full_name", "email_address", "phone"]);
        let user_data = data(&["full_names", "email_addres", "phone"]);

        let first = matcher().match_fields(&target_fields, &user_data);
        let second = matcher().match_fields(&target_fields, &user_data);
        assert_eq!(first, second);

        let mut seen = HashSet::new();
        for target in first.values() {
            assert!(seen.insert(target.clone()), "target matched twice: {}", target);
        }
    }
}
