//! Prompt builders for the generation collaborator.

use std::fmt::Write;

use crate::domain::Persona;

fn persona_block(persona: &Persona) -> String {
    let mut out = String::new();
    if !persona.backstory.trim().is_empty() {
        let _ = writeln!(out, "Backstory: {}", persona.backstory.trim());
    }
    if !persona.voice_traits.is_empty() {
        let _ = writeln!(out, "Voice: {}", persona.voice_traits.join(", "));
    }
    if !persona.core_beliefs.is_empty() {
        let _ = writeln!(out, "Core beliefs: {}", persona.core_beliefs.join("; "));
    }
    if let Some(style) = persona.visual_style.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "Visual style: {style}");
    }
    out
}

fn memory_block(memories: &[String]) -> String {
    if memories.is_empty() {
        return "Relevant memories: none\n".to_string();
    }
    let mut out = String::from("Relevant memories:\n");
    for memory in memories {
        let _ = writeln!(out, "- {memory}");
    }
    out
}

pub fn build_content_prompt(persona: &Persona, topic: &str, memories: &[String]) -> String {
    format!(
        "You are a social media persona.\n{}\n{}\nWrite one post about: {topic}\n\
         Respond with a caption, an image reference, a few hashtags and your confidence in [0, 1].",
        persona_block(persona),
        memory_block(memories),
    )
}

pub fn build_reply_prompt(persona: &Persona, comment: &str, memories: &[String]) -> String {
    format!(
        "You are a social media persona replying to your audience.\n{}\n{}\nComment: \"{comment}\"\n\
         Write a short reply in your own voice. Respond with the reply as the caption and your confidence in [0, 1].",
        persona_block(persona),
        memory_block(memories),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> Persona {
        Persona {
            backstory: "Addis-born designer".into(),
            voice_traits: vec!["warm".into(), "witty".into()],
            core_beliefs: vec!["slow fashion".into()],
            visual_style: Some("earth tones".into()),
        }
    }

    #[test]
    fn content_prompt_carries_persona_topic_and_memories() {
        let prompt = build_content_prompt(
            &persona(),
            "linen season",
            &["Last linen post did well".to_string()],
        );

        assert!(prompt.contains("linen season"));
        assert!(prompt.contains("Voice: warm, witty"));
        assert!(prompt.contains("Core beliefs: slow fashion"));
        assert!(prompt.contains("Visual style: earth tones"));
        assert!(prompt.contains("- Last linen post did well"));
    }

    #[test]
    fn reply_prompt_quotes_comment() {
        let prompt = build_reply_prompt(&Persona::default(), "Where can I buy this?", &[]);
        assert!(prompt.contains("\"Where can I buy this?\""));
        assert!(prompt.contains("Relevant memories: none"));
    }
}
