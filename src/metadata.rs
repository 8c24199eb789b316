use serde::{Deserialize, Serialize};

use crate::translate::language_name;

/// Hosting platforms cap titles at this many characters
pub const MAX_TITLE_CHARS: usize = 100;

pub const VIDEO_TAGS: [&str; 3] = ["languages", "education", "language learning"];

/// Title, description and tags for the hosted video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub language: String,
}

impl VideoMetadata {
    pub fn for_word(
        word: &str,
        sentence: &str,
        translation: &str,
        language: &str,
        category_id: &str,
    ) -> Self {
        let language_label = language_name(language);

        let title = truncate_chars(
            &format!("{} Word of the Day: {}", language_label, word),
            MAX_TITLE_CHARS,
        );
        let description = format!(
            "Today's {} word of the day is {}. An example use of this word is: '{}' which translates to '{}'.",
            language_label, word, sentence, translation
        );

        Self {
            title,
            description,
            tags: VIDEO_TAGS.iter().map(|t| t.to_string()).collect(),
            category_id: category_id.to_string(),
            language: language.to_string(),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
