//! Keyword-based prompt analysis.
//!
//! Extracts coarse musical attributes (genre, mood, tempo, key, instruments)
//! from a free-text prompt by keyword and pattern matching, and builds the caption
//! handed to the generation backend.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const GENRES: &[&str] = &[
    "pop",
    "rock",
    "jazz",
    "classical",
    "electronic",
    "hip-hop",
    "rap",
    "country",
    "blues",
    "metal",
    "folk",
    "r&b",
    "soul",
    "funk",
    "disco",
    "reggae",
    "punk",
    "indie",
    "alternative",
    "edm",
    "house",
    "techno",
    "ambient",
    "lo-fi",
    "trap",
    "drill",
];

const MOODS: &[&str] = &[
    "happy",
    "sad",
    "energetic",
    "calm",
    "aggressive",
    "melancholic",
    "upbeat",
    "dark",
    "bright",
    "mysterious",
    "romantic",
    "epic",
    "chill",
    "intense",
    "relaxing",
    "dramatic",
    "playful",
    "serious",
];

const INSTRUMENTS: &[(&str, &[&str])] = &[
    ("guitar", &["guitar", "guitars"]),
    ("piano", &["piano", "keyboard", "keys"]),
    ("drums", &["drums", "percussion"]),
    ("bass", &["bass"]),
    ("synth", &["synth", "synthesizer", "synths"]),
    ("violin", &["violin", "strings"]),
    ("saxophone", &["sax", "saxophone"]),
    ("trumpet", &["trumpet"]),
    ("vocal", &["vocal", "vocals", "voice", "singing"]),
];

const FAST_WORDS: &[&str] = &["fast", "upbeat", "energetic", "quick"];
const SLOW_WORDS: &[&str] = &["slow", "calm", "relaxing", "chill"];

pub const DEFAULT_TEMPO: u32 = 120;

static BPM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*bpm").expect("bpm pattern is valid"));

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-G]#?b?)\s*(major|minor)\b").expect("key pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicAnalysis {
    pub genre: String,
    pub style: String,
    pub mood: String,
    pub tempo: u32,
    pub key: String,
    pub instruments: Vec<String>,
    pub raw_prompt: String,
}

impl MusicAnalysis {
    /// Backend caption: the user's prompt followed by the analysed attributes.
    pub fn caption(&self, prompt: &str, has_vocals: bool) -> String {
        let mut parts = vec![format!("{} music", self.genre)];

        if !self.style.is_empty()
            && self.style.to_lowercase() != format!("modern {}", self.genre.to_lowercase())
        {
            parts.push(format!("{} style", self.style));
        }
        if !self.mood.is_empty() && !self.mood.eq_ignore_ascii_case("neutral") {
            parts.push(format!("{} mood", self.mood));
        }
        parts.push(
            match self.tempo {
                t if t < 90 => "slow tempo",
                t if t > 140 => "fast tempo",
                _ => "medium tempo",
            }
            .to_string(),
        );
        if !self.instruments.is_empty() {
            parts.push(format!("with {}", self.instruments.join(", ")));
        }
        parts.push(if has_vocals { "with vocals" } else { "instrumental" }.to_string());

        let attributes = parts.join(", ");
        let prompt = prompt.trim();
        if prompt.is_empty() {
            attributes
        } else {
            format!("{prompt}. {attributes}")
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PromptAnalyzer;

impl PromptAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, prompt: &str) -> MusicAnalysis {
        let lower = prompt.to_lowercase();

        let genre = GENRES
            .iter()
            .find(|g| lower.contains(*g))
            .map(|g| title_case(g))
            .unwrap_or_else(|| "Pop".to_string());

        let mood = MOODS
            .iter()
            .find(|m| lower.contains(*m))
            .map(|m| title_case(m))
            .unwrap_or_else(|| "Neutral".to_string());

        let analysis = MusicAnalysis {
            style: determine_style(&lower, &genre),
            genre,
            mood,
            tempo: extract_tempo(&lower),
            key: extract_key(prompt).unwrap_or_else(|| "C Major".to_string()),
            instruments: extract_instruments(&lower),
            raw_prompt: prompt.to_string(),
        };

        tracing::info!(?analysis, "prompt analysis complete");
        analysis
    }
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_word_start = true;
    for c in word.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

fn extract_instruments(lower: &str) -> Vec<String> {
    let found: Vec<String> = INSTRUMENTS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(name, _)| name.to_string())
        .collect();

    if found.is_empty() {
        vec!["guitar".into(), "drums".into(), "bass".into()]
    } else {
        found
    }
}

fn extract_tempo(lower: &str) -> u32 {
    if let Some(bpm) = explicit_bpm(lower) {
        return bpm;
    }
    if FAST_WORDS.iter().any(|w| lower.contains(w)) {
        140
    } else if SLOW_WORDS.iter().any(|w| lower.contains(w)) {
        80
    } else {
        DEFAULT_TEMPO
    }
}

fn explicit_bpm(lower: &str) -> Option<u32> {
    BPM_RE
        .captures(lower)
        .and_then(|caps| caps[1].parse().ok())
}

/// "<note>[#][b] major|minor", e.g. "in A minor", "f# Major" or "Ebminor".
fn extract_key(prompt: &str) -> Option<String> {
    let caps = KEY_RE.captures(prompt)?;
    let mut note = caps[1].chars();
    let letter = note.next()?.to_ascii_uppercase();
    let accidental: String = note.collect();
    Some(format!(
        "{letter}{accidental} {}",
        title_case(&caps[2].to_lowercase())
    ))
}

fn determine_style(lower: &str, genre: &str) -> String {
    if lower.contains("acoustic") {
        "Acoustic".into()
    } else if lower.contains("electronic") || lower.contains("edm") {
        "Electronic".into()
    } else if lower.contains("classical") || lower.contains("orchestral") {
        "Classical/Orchestral".into()
    } else if lower.contains("vintage") || lower.contains("retro") {
        "Vintage/Retro".into()
    } else {
        format!("Modern {genre}")
    }
}

/// The part of `lyrics` sung in clip `index` of `count`.
///
/// Lyrics are split into blank-line separated sections. With at least as many
/// sections as clips each clip gets a contiguous run of them; with fewer, the
/// sections repeat in order.
pub fn lyrics_for_clip(lyrics: &str, index: usize, count: usize) -> String {
    let sections: Vec<String> = split_sections(lyrics);
    if sections.is_empty() || count == 0 {
        return String::new();
    }

    let n = sections.len();
    if n < count {
        return sections[index % n].clone();
    }

    let start = index * n / count;
    let end = ((index + 1) * n / count).min(n);
    sections[start..end].join("\n\n")
}

fn split_sections(lyrics: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lyrics.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                sections.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }
    sections
}
