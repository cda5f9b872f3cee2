//! Longest-common-subsequence similarity for fuzzy title matching
//!
//! The ratio is `2 * lcs(a, b) / (len(a) + len(b))` over characters, which is
//! symmetric and bounded in `[0, 1]`.

/// Length of the longest common subsequence of characters.
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() || b_chars.is_empty() {
        return 0;
    }

    // Two rows instead of the full table
    let mut prev_row = vec![0usize; b_chars.len() + 1];
    let mut curr_row = vec![0usize; b_chars.len() + 1];

    for a_char in &a_chars {
        for (j, b_char) in b_chars.iter().enumerate() {
            curr_row[j + 1] = if a_char == b_char {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

/// Similarity ratio in `[0, 1]`. Two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_length(a, b)) as f64 / total as f64
}
