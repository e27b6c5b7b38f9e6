//! "Did you mean" suggestions for unknown units, variables, and functions
//!
//! Candidates within a bounded edit distance are ranked by string
//! similarity so the closest name comes first.

/// Maximum edit distance for a candidate to qualify as a suggestion.
pub const MAX_DISTANCE: usize = 3;

/// Maximum number of suggestions attached to one error.
pub const MAX_RESULTS: usize = 3;

/// Damerau-Levenshtein distance (allows transpositions)
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut matrix = vec![vec![0; n + 1]; m + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        matrix[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };

            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);

            // Transposition
            if i > 1
                && j > 1
                && a_chars[i - 1] == b_chars[j - 2]
                && a_chars[i - 2] == b_chars[j - 1]
            {
                matrix[i][j] = matrix[i][j].min(matrix[i - 2][j - 2] + cost);
            }
        }
    }

    matrix[m][n]
}

/// Jaro similarity (0.0 to 1.0)
fn jaro_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let match_distance = (a_chars.len().max(b_chars.len()) / 2).saturating_sub(1);

    let mut a_matches = vec![false; a_chars.len()];
    let mut b_matches = vec![false; b_chars.len()];

    let mut matches = 0;
    let mut transpositions = 0;

    for (i, &a_char) in a_chars.iter().enumerate() {
        let start = i.saturating_sub(match_distance);
        let end = (i + match_distance + 1).min(b_chars.len());

        for j in start..end {
            if b_matches[j] || a_char != b_chars[j] {
                continue;
            }
            a_matches[i] = true;
            b_matches[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut k = 0;
    for (i, &matched) in a_matches.iter().enumerate() {
        if !matched {
            continue;
        }
        while !b_matches[k] {
            k += 1;
        }
        if a_chars[i] != b_chars[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let matches = matches as f64;
    let m = a_chars.len() as f64;
    let n = b_chars.len() as f64;
    let t = (transpositions as f64) / 2.0;

    (matches / m + matches / n + (matches - t) / matches) / 3.0
}

/// Jaro-Winkler similarity (favors common prefix)
fn jaro_winkler(a: &str, b: &str) -> f64 {
    let jaro = jaro_similarity(a, b);

    // Common prefix length (max 4)
    let prefix_len = a
        .chars()
        .zip(b.chars())
        .take(4)
        .take_while(|(a, b)| a == b)
        .count();

    jaro + (prefix_len as f64 * 0.1 * (1.0 - jaro))
}

/// A candidate name with its similarity score
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub text: String,
    pub score: f64,
    pub distance: usize,
}

/// Find the closest candidates to `query`, best first.
pub fn find_similar<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = damerau_levenshtein(query, candidate);
            if distance <= MAX_DISTANCE {
                Some(Suggestion {
                    text: candidate.to_string(),
                    score: jaro_winkler(query, candidate),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();

    // Score descending, then distance ascending
    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.distance.cmp(&b.distance))
    });

    suggestions.dedup_by(|a, b| a.text == b.text);
    suggestions.truncate(MAX_RESULTS);
    suggestions
}

/// Format suggestions into a "did you mean" help line.
pub fn format_did_you_mean(suggestions: &[Suggestion]) -> Option<String> {
    if suggestions.is_empty() {
        None
    } else if suggestions.len() == 1 {
        Some(format!("did you mean `{}`?", suggestions[0].text))
    } else {
        let names: Vec<_> = suggestions
            .iter()
            .map(|s| format!("`{}`", s.text))
            .collect();
        Some(format!("did you mean one of: {}?", names.join(", ")))
    }
}

/// Convenience: one-shot help line for an unknown name.
pub fn did_you_mean<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    format_did_you_mean(&find_similar(query, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damerau_levenshtein() {
        // Transposition costs 1, not 2
        assert_eq!(damerau_levenshtein("ab", "ba"), 1);
        assert_eq!(damerau_levenshtein("meter", "meter"), 0);
        assert_eq!(damerau_levenshtein("", "abc"), 3);
        assert_eq!(damerau_levenshtein("metre", "meter"), 1);
    }

    #[test]
    fn test_find_similar_ranks_closest_first() {
        let names = vec!["meters", "miles", "minutes", "moles"];
        let suggestions = find_similar("meter", names.iter().copied());
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0].text, "meters");
        assert!(suggestions.len() <= MAX_RESULTS);
    }

    #[test]
    fn test_find_similar_respects_max_distance() {
        let names = vec!["kilogram"];
        let suggestions = find_similar("x", names.iter().copied());
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_format_did_you_mean() {
        let one = find_similar("lognormel", ["lognormal"].iter().copied());
        assert_eq!(
            format_did_you_mean(&one).as_deref(),
            Some("did you mean `lognormal`?")
        );

        assert_eq!(format_did_you_mean(&[]), None);
    }

    #[test]
    fn test_did_you_mean_multiple() {
        let msg = did_you_mean("secnd", ["second", "secs", "send"].iter().copied());
        let msg = msg.expect("suggestions expected");
        assert!(msg.starts_with("did you mean one of:"));
        assert!(msg.contains("`second`"));
    }
}
