//! Syllable estimation used to apportion speech time across words.
//!
//! This is a timing heuristic rather than a linguistic syllabifier: every vowel
//! character counts as one syllable, and a word never counts as zero.

/// Vowel characters recognised by default (Spanish-oriented).
pub const DEFAULT_VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'y', 'é', 'ó'];

#[derive(Debug, Clone)]
pub struct SyllableEstimator {
    vowels: Vec<char>,
}

impl Default for SyllableEstimator {
    fn default() -> Self {
        Self {
            vowels: DEFAULT_VOWELS.to_vec(),
        }
    }
}

impl SyllableEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default vowel set extended with language-specific characters
    pub fn with_extra_vowels(extra: &str) -> Self {
        let mut estimator = Self::default();
        for c in extra.chars().flat_map(char::to_lowercase) {
            if !c.is_whitespace() && !estimator.vowels.contains(&c) {
                estimator.vowels.push(c);
            }
        }
        estimator
    }

    pub fn is_vowel(&self, c: char) -> bool {
        self.vowels.contains(&c)
    }

    /// Count syllables in a word. Always returns at least 1.
    pub fn count(&self, word: &str) -> usize {
        let count = word
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| self.is_vowel(*c))
            .count();

        count.max(1)
    }
}

/// Count syllables with the default vowel set
pub fn count_syllables(word: &str) -> usize {
    SyllableEstimator::default().count(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_every_vowel_character() {
        assert_eq!(count_syllables("gato"), 2);
        assert_eq!(count_syllables("perro"), 2);
        assert_eq!(count_syllables("el"), 1);
        // no merging of adjacent vowels
        assert_eq!(count_syllables("familia"), 4);
        assert_eq!(count_syllables("hoy"), 2);
    }

    #[test]
    fn test_accented_and_uppercase_vowels() {
        assert_eq!(count_syllables("canción"), 3);
        assert_eq!(count_syllables("CAFÉ"), 2);
        assert_eq!(count_syllables("Árbol"), 1);
    }

    #[test]
    fn test_minimum_of_one() {
        assert_eq!(count_syllables(""), 1);
        assert_eq!(count_syllables("   "), 1);
        assert_eq!(count_syllables("brr"), 1);
        assert_eq!(count_syllables("DNS"), 1);
    }

    #[test]
    fn test_punctuation_is_ignored() {
        assert_eq!(count_syllables("corre."), 2);
        assert_eq!(count_syllables("¿qué?"), 2);
    }

    #[test]
    fn test_extra_vowels() {
        let estimator = SyllableEstimator::with_extra_vowels("áÍú");
        assert_eq!(estimator.count("Árbol"), 2);
        assert_eq!(estimator.count("río"), 2);
        assert_eq!(count_syllables("río"), 1);
        assert_eq!(estimator.count("baúl"), 2);
    }

    #[test]
    fn test_count_matches_vowel_characters() {
        let estimator = SyllableEstimator::default();
        for word in ["murciélago", "ayuntamiento", "oye", "xyz", "aeiou"] {
            let vowels = word.chars().filter(|c| DEFAULT_VOWELS.contains(c)).count();
            assert_eq!(estimator.count(word), vowels, "word: {}", word);
        }
    }
}
