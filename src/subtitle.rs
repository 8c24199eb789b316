use std::path::Path;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::config::{SlotTiming, SubtitleConfig};
use crate::error::{Result, LingoError};
use crate::syllable::SyllableEstimator;

/// A run of words shown together as one subtitle cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionGroup {
    pub words: Vec<String>,
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}

/// Relative slack when comparing a group's speech time with the threshold
const THRESHOLD_TOLERANCE: f64 = 1e-9;

/// Words of one group plus the speech time they were estimated to take
struct Phrase<'a> {
    words: Vec<&'a str>,
    spoken: f64,
}

/// Splits a spoken sentence into caption groups using a per-syllable speech rate.
///
/// Words accumulate into a group while their estimated speech time stays at or
/// below `threshold`. The word that pushes the time past the threshold opens the
/// next group. With [`SlotTiming::Fixed`] every group is then given a slot of
/// exactly `threshold` seconds, regardless of how long it is actually spoken for.
#[derive(Debug, Clone)]
pub struct SubtitleSegmenter {
    estimator: SyllableEstimator,
    threshold: f64,
    max_words: usize,
    timing: SlotTiming,
}

impl Default for SubtitleSegmenter {
    fn default() -> Self {
        Self::from_config(&SubtitleConfig::default())
    }
}

impl SubtitleSegmenter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn from_config(config: &SubtitleConfig) -> Self {
        Self {
            estimator: SyllableEstimator::with_extra_vowels(&config.extra_vowels),
            threshold: config.threshold_secs,
            max_words: config.max_words.max(1),
            timing: config.timing,
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    pub fn with_timing(mut self, timing: SlotTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_estimator(mut self, estimator: SyllableEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Partition `sentence` into time-coded caption groups covering `total_duration` seconds of audio
    pub fn segment(&self, sentence: &str, total_duration: f64) -> Result<Vec<CaptionGroup>> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            return Err(LingoError::DegenerateInput("sentence contains no words".to_string()));
        }
        if !(total_duration.is_finite() && total_duration > 0.0) {
            return Err(LingoError::DegenerateInput(format!(
                "audio duration must be positive, got {}",
                total_duration
            )));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(LingoError::DegenerateInput(format!(
                "caption threshold must be positive, got {}",
                self.threshold
            )));
        }

        let counts: Vec<usize> = words.iter().map(|w| self.estimator.count(w)).collect();
        let total_syllables: usize = counts.iter().sum();
        if total_syllables == 0 {
            return Err(LingoError::DegenerateInput("sentence has no syllables".to_string()));
        }

        let rate = total_duration / total_syllables as f64;
        debug!(
            "Segmenting {} words, {} syllables over {:.3}s ({:.3}s per syllable)",
            words.len(), total_syllables, total_duration, rate
        );

        let phrases = self.group_words(&words, &counts, rate);
        let groups = self.place_on_timeline(phrases, total_duration);

        debug!("Produced {} caption groups", groups.len());
        Ok(groups)
    }

    fn group_words<'a>(&self, words: &[&'a str], counts: &[usize], rate: f64) -> Vec<Phrase<'a>> {
        let mut phrases = Vec::new();
        let mut current: Vec<&'a str> = Vec::new();
        // Whole syllables, so the group time is one product rather than a drifting sum
        let mut syllables = 0usize;
        let limit = self.threshold + THRESHOLD_TOLERANCE * self.threshold.max(1.0);

        for (word, count) in words.iter().zip(counts) {
            if current.len() >= self.max_words {
                phrases.push(Phrase {
                    words: std::mem::take(&mut current),
                    spoken: syllables as f64 * rate,
                });
                syllables = 0;
            }

            let candidate = (syllables + count) as f64 * rate;
            // Reaching the threshold exactly keeps the word in the current group
            if candidate > limit && !current.is_empty() {
                phrases.push(Phrase {
                    words: std::mem::take(&mut current),
                    spoken: syllables as f64 * rate,
                });
                syllables = *count;
            } else {
                syllables += count;
            }
            current.push(word);
        }

        // `words` is non-empty, so the last group always holds at least one word
        phrases.push(Phrase {
            words: current,
            spoken: syllables as f64 * rate,
        });

        phrases
    }

    fn place_on_timeline(&self, phrases: Vec<Phrase<'_>>, total_duration: f64) -> Vec<CaptionGroup> {
        let count = phrases.len();
        let boundaries: Vec<f64> = match self.timing {
            SlotTiming::Fixed => (0..=count).map(|i| i as f64 * self.threshold).collect(),
            SlotTiming::Proportional => {
                let mut boundaries = Vec::with_capacity(count + 1);
                let mut elapsed = 0.0;
                boundaries.push(elapsed);
                for phrase in &phrases[..count - 1] {
                    elapsed += phrase.spoken;
                    boundaries.push(elapsed);
                }
                boundaries.push(total_duration);
                boundaries
            }
        };

        phrases
            .into_iter()
            .enumerate()
            .map(|(i, phrase)| CaptionGroup {
                text: phrase.words.join(" "),
                words: phrase.words.into_iter().map(str::to_string).collect(),
                start: boundaries[i],
                end: boundaries[i + 1],
            })
            .collect()
    }
}

/// Segment with the default threshold, word cap and fixed slots
pub fn segment(sentence: &str, total_duration: f64) -> Result<Vec<CaptionGroup>> {
    SubtitleSegmenter::default().segment(sentence, total_duration)
}

/// Render caption groups as SubRip text
pub fn render_srt(groups: &[CaptionGroup]) -> String {
    let mut srt_content = String::new();

    for (index, group) in groups.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(group.start),
            format_srt_time(group.end),
            group.text.trim()
        ));
    }

    srt_content
}

/// Write caption groups to an SRT file
pub async fn write_srt<P: AsRef<Path>>(groups: &[CaptionGroup], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(groups)).await?;

    info!("SRT file generated with {} cues", groups.len());
    Ok(())
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(groups: &[CaptionGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.text.as_str()).collect()
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_el_perro_corre() {
        // counts 1, 2, 2 -> 1.8s per syllable over 9s
        let groups = segment("el perro corre", 9.0).unwrap();

        assert_eq!(texts(&groups), vec!["el", "perro", "corre"]);
        assert_eq!(groups[0].start, 0.0);
        assert_eq!(groups[0].end, 3.0);
        assert_eq!(groups[1].start, 3.0);
        assert_eq!(groups[2].end, 9.0);
    }

    #[test]
    fn test_exact_threshold_keeps_word_in_group() {
        // 1s per syllable: "el mar es" reaches exactly 3.0
        let uncapped = SubtitleSegmenter::new(3.0).with_max_words(10);
        let groups = uncapped.segment("el mar es azul", 5.0).unwrap();
        assert_eq!(texts(&groups), vec!["el mar es", "azul"]);

        // first word alone lands on the threshold
        let groups = segment("casa casa", 6.0).unwrap();
        assert_eq!(texts(&groups), vec!["casa", "casa"]);
    }

    #[test]
    fn test_threshold_reached_through_rounding_keeps_word() {
        // counts 2, 3, 2, 2 -> 0.6s per syllable; "gato comida" is 1.2 + 1.8
        let groups = segment("gato comida perro gato", 5.4).unwrap();
        assert_eq!(texts(&groups), vec!["gato comida", "perro gato"]);
    }

    #[test]
    fn test_short_sentence_is_one_group() {
        let groups = segment("hola", 1.2).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].words, vec!["hola".to_string()]);
        assert_eq!(groups[0].start, 0.0);
        assert_eq!(groups[0].end, 3.0);
    }

    #[test]
    fn test_long_first_word_does_not_emit_empty_group() {
        // ferrocarril = 4 syllables at 2s each
        let groups = segment("ferrocarril y", 10.0).unwrap();
        assert_eq!(texts(&groups), vec!["ferrocarril", "y"]);
        assert!(groups.iter().all(|g| !g.words.is_empty()));
    }

    #[test]
    fn test_word_cap_closes_group() {
        let groups = segment("el sol es mi luz", 2.0).unwrap();
        assert_eq!(texts(&groups), vec!["el sol es", "mi luz"]);

        let uncapped = SubtitleSegmenter::new(3.0).with_max_words(10);
        let groups = uncapped.segment("el sol es mi luz", 2.0).unwrap();
        assert_eq!(texts(&groups), vec!["el sol es mi luz"]);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(matches!(segment("", 3.0), Err(LingoError::DegenerateInput(_))));
        assert!(matches!(segment("   ", 3.0), Err(LingoError::DegenerateInput(_))));
        assert!(matches!(segment("hola", 0.0), Err(LingoError::DegenerateInput(_))));
        assert!(matches!(segment("hola", -2.0), Err(LingoError::DegenerateInput(_))));
        assert!(matches!(segment("hola", f64::NAN), Err(LingoError::DegenerateInput(_))));
    }

    #[test]
    fn test_fixed_slots_are_contiguous_and_cover_words() {
        let sentence = "Ayer por la noche escuché una canción que me hizo pensar en mi abuela";
        let groups = segment(sentence, 7.4).unwrap();

        assert_eq!(groups[0].start, 0.0);
        for pair in groups.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let last = groups.last().unwrap();
        assert_eq!(last.end, groups.len() as f64 * 3.0);

        let rejoined: Vec<String> = groups.iter().flat_map(|g| g.words.clone()).collect();
        let original: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
        assert_eq!(rejoined, original);
        assert!(groups.iter().all(|g| g.words.len() <= 3));
    }

    #[test]
    fn test_proportional_timing_ends_at_duration() {
        let segmenter = SubtitleSegmenter::new(3.0).with_timing(SlotTiming::Proportional);
        let groups = segmenter.segment("el perro corre", 9.0).unwrap();

        assert_eq!(texts(&groups), vec!["el", "perro", "corre"]);
        assert_eq!(groups[0].start, 0.0);
        assert!((groups[0].end - 1.8).abs() < 1e-9);
        assert!((groups[1].end - 5.4).abs() < 1e-9);
        for pair in groups.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(groups.last().unwrap().end, 9.0);
    }

    #[test]
    fn test_render_srt() {
        let groups = segment("el perro corre", 9.0).unwrap();
        let srt = render_srt(&groups);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:03,000\nel\n\n\
             2\n00:00:03,000 --> 00:00:06,000\nperro\n\n\
             3\n00:00:06,000 --> 00:00:09,000\ncorre\n\n"
        );
    }

    #[tokio::test]
    async fn test_write_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        let groups = segment("hola mundo", 2.0).unwrap();

        write_srt(&groups, &path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("1\n00:00:00,000 --> 00:00:03,000\nhola mundo"));
    }
}
