//! Heuristic quality checks. Each returns a score in [0, 1].

use std::collections::BTreeSet;

use crate::domain::Persona;

pub const PERSONA_WEIGHT: f64 = 0.40;
pub const SAFETY_WEIGHT: f64 = 0.30;
pub const BRAND_WEIGHT: f64 = 0.20;
pub const TECHNICAL_WEIGHT: f64 = 0.10;

pub const PERSONA_CHECK: &str = "persona_consistency";
pub const SAFETY_CHECK: &str = "content_safety";
pub const BRAND_CHECK: &str = "brand_alignment";
pub const TECHNICAL_CHECK: &str = "technical_quality";

const FORMAL_TRAITS: &[&str] = &[
    "professional",
    "formal",
    "sophisticated",
    "elegant",
    "authoritative",
    "refined",
];
const CASUAL_TRAITS: &[&str] = &[
    "casual", "playful", "witty", "fun", "friendly", "humorous", "energetic", "quirky",
];
const SLANG: &[&str] = &["omg", "lol", "lmao", "haha", "wtf", "ngl", "fr"];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "our", "your", "are", "was", "from", "about",
];

/// Minimum shared prefix for two words to count as the same stem.
const STEM_PREFIX: usize = 5;

fn is_emoji(c: char) -> bool {
    matches!(c as u32, 0x1F300..=0x1FAFF | 0x2600..=0x27BF)
}

/// Casual markers in `text`: exclamation marks, emoji, shouted words, slang.
pub fn casual_markers(text: &str) -> usize {
    let exclamations = text.chars().filter(|c| *c == '!').count();
    let emoji = text.chars().filter(|c| is_emoji(*c)).count();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let shouted = words
        .iter()
        .filter(|w| w.chars().count() >= 3 && w.chars().all(|c| c.is_uppercase()))
        .count();
    let slang = words
        .iter()
        .filter(|w| SLANG.contains(&w.to_lowercase().as_str()))
        .count();
    exclamations + emoji + shouted + slang
}

/// Tone against declared voice traits.
///
/// Formal personas start at 0.95 and lose 0.15 per casual marker (floor 0.1).
/// Casual personas score 0.9; personas without recognised traits score 0.8.
pub fn persona_consistency(persona: &Persona, caption: &str) -> f64 {
    let traits: Vec<String> = persona.voice_traits.iter().map(|t| t.to_lowercase()).collect();
    let has = |vocabulary: &[&str]| {
        traits
            .iter()
            .any(|t| vocabulary.iter().any(|v| t.contains(v)))
    };

    if has(FORMAL_TRAITS) {
        (0.95 - 0.15 * casual_markers(caption) as f64).max(0.1)
    } else if has(CASUAL_TRAITS) {
        0.9
    } else {
        0.8
    }
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn same_stem(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let shared = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    shared >= STEM_PREFIX
}

/// Overlap of topic and core beliefs with caption and hashtags:
/// `0.5 + 0.5 * matched / keywords`, or 0.75 with no keywords to match.
pub fn brand_alignment(
    topic: Option<&str>,
    persona: &Persona,
    caption: &str,
    hashtags: &[String],
) -> f64 {
    let mut keywords = tokens(topic.unwrap_or_default());
    for belief in &persona.core_beliefs {
        keywords.extend(tokens(belief));
    }
    if keywords.is_empty() {
        return 0.75;
    }

    let mut text = tokens(caption);
    for tag in hashtags {
        text.extend(tokens(tag.trim_start_matches('#')));
    }

    let matched = keywords
        .iter()
        .filter(|k| text.iter().any(|t| same_stem(k, t)))
        .count();
    0.5 + 0.5 * matched as f64 / keywords.len() as f64
}

fn non_blank_str<'a>(output: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    output
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_media_ref(s: &str) -> bool {
    s.split_once("://")
        .is_some_and(|(scheme, rest)| !scheme.is_empty() && !rest.is_empty())
}

/// Structural completeness: caption 0.5, media reference 0.3, hashtags 0.2.
pub fn technical_quality(output: &serde_json::Value) -> f64 {
    let mut score = 0.0;
    if non_blank_str(output, "caption").is_some() {
        score += 0.5;
    }
    let media = non_blank_str(output, "image_url").or_else(|| non_blank_str(output, "media_url"));
    if media.is_some_and(is_media_ref) {
        score += 0.3;
    }
    let has_hashtags = output
        .get("hashtags")
        .and_then(|v| v.as_array())
        .is_some_and(|tags| tags.iter().any(|t| t.as_str().is_some_and(|s| !s.trim().is_empty())));
    if has_hashtags {
        score += 0.2;
    }
    score
}
