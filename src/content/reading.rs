//! Reading time estimate

use super::Section;

/// Reading speed assumed when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Whitespace-separated tokens across every paragraph of every section
pub fn total_word_count(sections: &[Section]) -> usize {
    sections
        .iter()
        .flat_map(|s| s.paragraphs.iter())
        .map(|p| p.split_whitespace().count())
        .sum()
}

/// `round(words / words_per_minute)`, halves rounding up
pub fn estimated_read_minutes(sections: &[Section], words_per_minute: usize) -> u64 {
    let wpm = words_per_minute.max(1) as f64;
    (total_word_count(sections) as f64 / wpm).round() as u64
}
