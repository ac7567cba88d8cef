//! Client-side ranking for autocomplete suggestions. The suggestion
//! endpoints return candidates in server order; re-ranking here puts prefix
//! matches first, then earlier matches, then shorter (more specific) ones.

/// Rank candidates against a partial query. Pure: same input, same output.
/// Returns at most `max` entries, without duplicates; an empty or
/// whitespace-only query yields nothing.
pub fn rank(candidates: &[String], query: &str, max: usize) -> Vec<String> {
    let needle = normalize(query.trim());
    if needle.is_empty() {
        return Vec::new();
    }

    let mut seen = std::collections::HashSet::new();
    let mut scored: Vec<(u32, &String)> = Vec::new();

    for candidate in candidates {
        let haystack = normalize(candidate);
        if !seen.insert(haystack.clone()) {
            continue;
        }
        let Some(index) = haystack.find(&needle) else {
            continue;
        };
        // Prefix matches dominate, then match position, then overall length.
        let prefix_penalty: u32 = if index == 0 { 0 } else { 1 };
        let score = prefix_penalty * 1000 + index as u32 * 10 + candidate.chars().count() as u32;
        scored.push((score, candidate));
    }

    // Stable: ties keep input order.
    scored.sort_by_key(|(score, _)| *score);
    scored.into_iter().take(max).map(|(_, c)| c.clone()).collect()
}

/// Lowercase and fold diacritics so "Koln" finds "Köln" and "strasse" finds
/// "Straße".
fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        for lower in c.to_lowercase() {
            match lower {
                'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' => out.push('a'),
                'ö' | 'ò' | 'ó' | 'ô' | 'õ' => out.push('o'),
                'ü' | 'ù' | 'ú' | 'û' => out.push('u'),
                'é' | 'è' | 'ê' | 'ë' => out.push('e'),
                'í' | 'ì' | 'î' | 'ï' => out.push('i'),
                'ç' => out.push('c'),
                'ñ' => out.push('n'),
                'ß' => out.push_str("ss"),
                other => out.push(other),
            }
        }
    }
    out
}
