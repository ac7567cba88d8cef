use std::collections::HashSet;

use crate::models::JobResult;

/// Stable identity for a search hit. The board does not send one directly,
/// so it is derived in priority order: reference number, detail link, then a
/// lowercased employer|title|location composite. A result with none of these
/// gets the empty key, which proves nothing about equality.
pub fn identity_key(result: &JobResult) -> String {
    if let Some(id) = &result.external_id {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_string();
        }
    }
    if let Some(link) = &result.link {
        let link = link.trim();
        if !link.is_empty() {
            return link.to_string();
        }
    }
    if result.employer.trim().is_empty()
        && result.title.trim().is_empty()
        && result.location.trim().is_empty()
    {
        return String::new();
    }
    format!(
        "{}|{}|{}",
        result.employer.to_lowercase(),
        result.title.to_lowercase(),
        result.location.to_lowercase()
    )
}

/// Drop repeated results, keeping the first occurrence of each identity key
/// in order. Results with an empty key are always kept: an empty key cannot
/// prove two rows are the same job.
pub fn dedupe(results: Vec<JobResult>) -> Vec<JobResult> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(results.len());

    for result in results {
        let key = identity_key(&result);
        if key.is_empty() {
            out.push(result);
            continue;
        }
        if seen.insert(key) {
            out.push(result);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: Option<&str>, link: Option<&str>, employer: &str, title: &str, location: &str) -> JobResult {
        JobResult {
            title: title.to_string(),
            employer: employer.to_string(),
            location: location.to_string(),
            external_id: id.map(|s| s.to_string()),
            link: link.map(|s| s.to_string()),
            distance_km: None,
            offer_category: None,
            start_date: None,
        }
    }

    #[test]
    fn test_identity_prefers_reference_number() {
        let r = result(Some("10001-ABC"), Some("https://example.com/job/1"), "Acme", "Dev", "Berlin");
        assert_eq!(identity_key(&r), "10001-ABC");
    }

    #[test]
    fn test_identity_falls_back_to_link() {
        let r = result(Some("   "), Some("https://example.com/job/1"), "Acme", "Dev", "Berlin");
        assert_eq!(identity_key(&r), "https://example.com/job/1");
    }

    #[test]
    fn test_identity_composite_is_lowercased() {
        let r = result(None, None, "Acme GmbH", "Verkäufer", "Berlin");
        assert_eq!(identity_key(&r), "acme gmbh|verkäufer|berlin");
    }

    #[test]
    fn test_identity_empty_for_blank_result() {
        let r = result(None, None, "", "", "  ");
        assert_eq!(identity_key(&r), "");
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_order() {
        let input = vec![
            result(Some("a"), None, "One", "Dev", "Berlin"),
            result(Some("b"), None, "Two", "Dev", "Hamburg"),
            result(Some("a"), None, "One again", "Dev", "Berlin"),
            result(Some("c"), None, "Three", "Dev", "Köln"),
            result(Some("b"), None, "Two again", "Dev", "Hamburg"),
        ];
        let out = dedupe(input);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].employer, "One");
        assert_eq!(out[1].employer, "Two");
        assert_eq!(out[2].employer, "Three");
    }

    #[test]
    fn test_dedupe_mixes_key_sources() {
        // Same job seen once by id and once by composite is NOT collapsed:
        // the keys differ, and that is by contract (identity is the derived
        // key, nothing fuzzier).
        let input = vec![
            result(Some("x"), None, "Acme", "Dev", "Berlin"),
            result(None, None, "Acme", "Dev", "Berlin"),
            result(None, None, "ACME", "DEV", "BERLIN"),
        ];
        let out = dedupe(input);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_dedupe_never_drops_empty_keys() {
        let input = vec![
            result(None, None, "", "", ""),
            result(None, None, "", "", ""),
            result(None, None, "", "", ""),
        ];
        let out = dedupe(input);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_dedupe_shrinks_on_repeats() {
        let input = vec![
            result(Some("a"), None, "One", "Dev", "Berlin"),
            result(Some("a"), None, "One", "Dev", "Berlin"),
        ];
        let out = dedupe(input);
        assert!(out.len() < 2);
    }
}
