use serde::{Deserialize, Serialize};

/// Declared identity of an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub voice_traits: Vec<String>,
    #[serde(default)]
    pub core_beliefs: Vec<String>,
    #[serde(default)]
    pub visual_style: Option<String>,
}

/// What the generation collaborator hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub caption: String,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Generator's own confidence estimate, informational only.
    pub confidence: f64,
}

/// Content as stored in a task result and submitted to the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentOutput {
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub confidence_score: f64,
}

impl From<GeneratedContent> for ContentOutput {
    fn from(g: GeneratedContent) -> Self {
        Self {
            caption: g.caption,
            image_url: g.media_ref,
            hashtags: g.hashtags,
            confidence_score: g.confidence.clamp(0.0, 1.0),
        }
    }
}

/// What the judge knows about the output besides the output itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeContext {
    pub persona: Persona,
    pub topic: Option<String>,
    /// State version captured when the task was planned.
    pub state_version: u64,
}
