//! Output validation and routing.
//!
//! `OutputJudge::validate` fans out four independent checks, each under its
//! own deadline, joins them, aggregates a weighted confidence and routes it.
//! A check that times out or errors contributes the neutral score instead of
//! failing the judgment.

pub mod budget;
pub mod checks;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::JudgeConfig;
use crate::domain::{CheckScore, CollaboratorError, JudgeContext, Judgment, Route, RoutingThresholds};
use crate::ports::{AlignmentScorer, SafetyScorer};

pub use self::budget::BudgetJudge;
use self::checks::{
    BRAND_CHECK, BRAND_WEIGHT, PERSONA_CHECK, PERSONA_WEIGHT, SAFETY_CHECK, SAFETY_WEIGHT,
    TECHNICAL_CHECK, TECHNICAL_WEIGHT, brand_alignment, persona_consistency, technical_quality,
};

/// Seam between the worker and whatever validates its output.
#[async_trait]
pub trait ContentValidator: Send + Sync {
    /// Never fails: malformed output yields a low-confidence rejection.
    async fn validate(
        &self,
        output: &serde_json::Value,
        context: &JudgeContext,
        current_state_version: Option<u64>,
    ) -> Judgment;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeSettings {
    pub thresholds: RoutingThresholds,
    pub check_timeout: Duration,
    pub neutral_score: f64,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self::from_config(&JudgeConfig::default())
    }
}

impl JudgeSettings {
    pub fn from_config(config: &JudgeConfig) -> Self {
        Self {
            thresholds: config.thresholds(),
            check_timeout: config.check_timeout(),
            neutral_score: config.neutral_score,
        }
    }
}

#[derive(Debug, Default)]
struct JudgeMetrics {
    validations: u64,
    approvals: u64,
    confidence_sum: f64,
}

/// Weighted sum of check scores, clamped to [0, 1].
pub fn aggregate(checks: &[CheckScore]) -> f64 {
    checks
        .iter()
        .map(|c| c.weight * c.score)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

pub struct OutputJudge {
    settings: JudgeSettings,
    safety: Arc<dyn SafetyScorer>,
    alignment: Option<Arc<dyn AlignmentScorer>>,
    metrics: Mutex<JudgeMetrics>,
}

impl OutputJudge {
    pub fn new(settings: JudgeSettings, safety: Arc<dyn SafetyScorer>) -> Self {
        Self {
            settings,
            safety,
            alignment: None,
            metrics: Mutex::new(JudgeMetrics::default()),
        }
    }

    /// Score persona consistency with a model instead of the tone heuristic.
    pub fn with_alignment_scorer(mut self, scorer: Arc<dyn AlignmentScorer>) -> Self {
        self.alignment = Some(scorer);
        self
    }

    /// Share of validations that were approved; 0.0 before any validation.
    pub fn approval_rate(&self) -> f64 {
        let m = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        if m.validations == 0 {
            0.0
        } else {
            m.approvals as f64 / m.validations as f64
        }
    }

    /// Mean confidence over all validations; 0.0 before any validation.
    pub fn average_confidence(&self) -> f64 {
        let m = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        if m.validations == 0 {
            0.0
        } else {
            m.confidence_sum / m.validations as f64
        }
    }

    fn record(&self, judgment: &Judgment) {
        let mut m = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        m.validations += 1;
        m.confidence_sum += judgment.confidence;
        if judgment.approved {
            m.approvals += 1;
        }
    }

    /// Run one check under the configured deadline. Timeouts, collaborator
    /// errors and non-finite scores degrade to the neutral score.
    async fn run_check<F>(&self, name: &'static str, weight: f64, check: F) -> CheckScore
    where
        F: Future<Output = Result<f64, CollaboratorError>>,
    {
        let outcome = tokio::time::timeout(self.settings.check_timeout, check).await;
        let (score, degraded) = match outcome {
            Ok(Ok(score)) if score.is_finite() => (score.clamp(0.0, 1.0), false),
            Ok(Ok(score)) => {
                warn!(check = name, score, "check returned a non-finite score");
                (self.settings.neutral_score, true)
            }
            Ok(Err(err)) => {
                warn!(check = name, error = %err, "check failed; using neutral score");
                (self.settings.neutral_score, true)
            }
            Err(_) => {
                warn!(check = name, timeout = ?self.settings.check_timeout, "check timed out; using neutral score");
                (self.settings.neutral_score, true)
            }
        };
        debug!(check = name, score, degraded, "check scored");
        CheckScore {
            name: name.to_string(),
            weight,
            score,
            degraded,
        }
    }

    async fn judge(
        &self,
        output: &serde_json::Value,
        context: &JudgeContext,
        current_state_version: Option<u64>,
    ) -> Judgment {
        let Some(caption) = output
            .get("caption")
            .and_then(|c| c.as_str())
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            return Judgment::malformed("output has no caption");
        };

        let hashtags: Vec<String> = output
            .get("hashtags")
            .and_then(|h| h.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let text = if hashtags.is_empty() {
            caption.to_string()
        } else {
            format!("{caption} {}", hashtags.join(" "))
        };

        let persona = async {
            match &self.alignment {
                Some(scorer) => scorer.score(&context.persona, caption).await,
                None => Ok(persona_consistency(&context.persona, caption)),
            }
        };
        let safety = self.safety.score(&text);
        let brand = async {
            Ok::<_, CollaboratorError>(brand_alignment(
                context.topic.as_deref(),
                &context.persona,
                caption,
                &hashtags,
            ))
        };
        let technical = async { Ok::<_, CollaboratorError>(technical_quality(output)) };

        let (persona, safety, brand, technical) = tokio::join!(
            self.run_check(PERSONA_CHECK, PERSONA_WEIGHT, persona),
            self.run_check(SAFETY_CHECK, SAFETY_WEIGHT, safety),
            self.run_check(BRAND_CHECK, BRAND_WEIGHT, brand),
            self.run_check(TECHNICAL_CHECK, TECHNICAL_WEIGHT, technical),
        );
        let checks = vec![persona, safety, brand, technical];

        let confidence = aggregate(&checks);
        let stale = current_state_version.is_some_and(|v| v != context.state_version);
        if stale {
            warn!(
                captured = context.state_version,
                current = ?current_state_version,
                "state version changed since planning"
            );
        }
        Judgment::route(confidence, stale, self.settings.thresholds, checks)
    }
}

#[async_trait]
impl ContentValidator for OutputJudge {
    #[instrument(skip_all, fields(state_version = context.state_version))]
    async fn validate(
        &self,
        output: &serde_json::Value,
        context: &JudgeContext,
        current_state_version: Option<u64>,
    ) -> Judgment {
        let judgment = self.judge(output, context, current_state_version).await;
        self.record(&judgment);

        match judgment.route {
            Route::Auto => info!(confidence = judgment.confidence, "output auto-approved"),
            Route::Hitl => info!(confidence = judgment.confidence, "output routed to human review"),
            Route::Reject => info!(
                confidence = judgment.confidence,
                reason = judgment.reason.as_deref().unwrap_or_default(),
                "output rejected"
            ),
        }
        judgment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Persona, STALE_STATE_REASON};
    use crate::impls::KeywordSafetyScorer;
    use serde_json::json;

    struct FixedSafety(f64);

    #[async_trait]
    impl SafetyScorer for FixedSafety {
        async fn score(&self, _text: &str) -> Result<f64, CollaboratorError> {
            Ok(self.0)
        }
    }

    struct SlowSafety;

    #[async_trait]
    impl SafetyScorer for SlowSafety {
        async fn score(&self, _text: &str) -> Result<f64, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1.0)
        }
    }

    struct FailingAlignment;

    #[async_trait]
    impl AlignmentScorer for FailingAlignment {
        async fn score(&self, _p: &Persona, _t: &str) -> Result<f64, CollaboratorError> {
            Err(CollaboratorError::Unavailable("model offline".into()))
        }
    }

    fn context(version: u64) -> JudgeContext {
        JudgeContext {
            persona: Persona {
                voice_traits: vec!["witty".into()],
                core_beliefs: vec!["sustainable fashion".into()],
                ..Persona::default()
            },
            topic: Some("linen".into()),
            state_version: version,
        }
    }

    fn good_output() -> serde_json::Value {
        json!({
            "caption": "Linen season is here, made for sustainable fashion lovers",
            "image_url": "https://cdn.example/linen.png",
            "hashtags": ["#linen", "#sustainablefashion"],
            "confidence_score": 0.92,
        })
    }

    fn judge(safety: impl SafetyScorer + 'static) -> OutputJudge {
        OutputJudge::new(
            JudgeSettings {
                check_timeout: Duration::from_millis(50),
                ..JudgeSettings::default()
            },
            Arc::new(safety),
        )
    }

    fn score(name: &str, weight: f64, score: f64) -> CheckScore {
        CheckScore {
            name: name.into(),
            weight,
            score,
            degraded: false,
        }
    }

    #[test]
    fn aggregation_of_reference_scores() {
        let checks = [
            score(PERSONA_CHECK, PERSONA_WEIGHT, 0.85),
            score(SAFETY_CHECK, SAFETY_WEIGHT, 0.95),
            score(BRAND_CHECK, BRAND_WEIGHT, 0.80),
            score(TECHNICAL_CHECK, TECHNICAL_WEIGHT, 0.90),
        ];
        let confidence = aggregate(&checks);
        assert!((confidence - 0.875).abs() < 1e-9);
        assert!((confidence - 0.865).abs() <= 0.01 + 1e-9);
    }

    #[test]
    fn aggregation_is_clamped() {
        assert_eq!(aggregate(&[score("x", 2.0, 1.0)]), 1.0);
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[tokio::test]
    async fn empty_output_is_rejected_without_error() {
        let judge = judge(KeywordSafetyScorer::default());

        let j = judge.validate(&json!({}), &context(1), None).await;

        assert!(j.confidence < 0.5);
        assert!(!j.approved);
        assert_eq!(j.route, Route::Reject);
        assert!(j.reason.is_some());
    }

    #[tokio::test]
    async fn non_object_output_is_rejected_without_error() {
        let judge = judge(KeywordSafetyScorer::default());
        let j = judge.validate(&json!(["caption"]), &context(1), Some(1)).await;
        assert!(!j.approved);
        assert!(j.confidence < 0.5);
    }

    #[tokio::test]
    async fn strong_output_is_auto_approved() {
        let judge = judge(FixedSafety(1.0));

        let j = judge.validate(&good_output(), &context(3), Some(3)).await;

        // persona 0.9, safety 1.0, brand 1.0, technical 1.0
        assert!((j.confidence - 0.96).abs() < 1e-9);
        assert_eq!(j.route, Route::Auto);
        assert!(j.approved);
        assert!(j.reason.is_none());
        assert_eq!(j.checks.len(), 4);
    }

    #[tokio::test]
    async fn stale_state_rejects_despite_high_confidence() {
        let judge = judge(FixedSafety(1.0));

        let j = judge.validate(&good_output(), &context(42), Some(43)).await;

        assert!(j.confidence >= 0.9);
        assert_eq!(j.route, Route::Reject);
        assert!(!j.approved);
        assert_eq!(j.reason.as_deref(), Some(STALE_STATE_REASON));
    }

    #[tokio::test]
    async fn unknown_current_version_skips_the_occ_check() {
        let judge = judge(FixedSafety(1.0));
        let j = judge.validate(&good_output(), &context(42), None).await;
        assert_eq!(j.route, Route::Auto);
    }

    #[tokio::test]
    async fn medium_confidence_goes_to_review() {
        let judge = judge(FixedSafety(0.5));

        let j = judge.validate(&good_output(), &context(1), Some(1)).await;

        // 0.36 + 0.15 + 0.2 + 0.1
        assert!((j.confidence - 0.81).abs() < 1e-9);
        assert_eq!(j.route, Route::Hitl);
        assert!(!j.approved);
        assert!(j.reason.is_some());
    }

    #[tokio::test]
    async fn slow_check_degrades_to_neutral_instead_of_blocking() {
        let judge = judge(SlowSafety);

        let j = tokio::time::timeout(
            Duration::from_secs(5),
            judge.validate(&good_output(), &context(1), Some(1)),
        )
        .await
        .expect("judgment must not wait for the slow check");

        let safety = j.checks.iter().find(|c| c.name == SAFETY_CHECK).unwrap();
        assert!(safety.degraded);
        assert_eq!(safety.score, 0.5);
        // 0.36 + 0.15 + 0.2 + 0.1
        assert!((j.confidence - 0.81).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_alignment_scorer_degrades_persona_check() {
        let judge = judge(FixedSafety(1.0)).with_alignment_scorer(Arc::new(FailingAlignment));

        let j = judge.validate(&good_output(), &context(1), Some(1)).await;

        let persona = j.checks.iter().find(|c| c.name == PERSONA_CHECK).unwrap();
        assert!(persona.degraded);
        assert_eq!(persona.score, 0.5);
    }

    #[tokio::test]
    async fn running_metrics_track_every_validation() {
        let judge = judge(FixedSafety(1.0));
        assert_eq!(judge.approval_rate(), 0.0);

        judge.validate(&good_output(), &context(1), Some(1)).await;
        judge.validate(&json!({}), &context(1), Some(1)).await;

        assert!((judge.approval_rate() - 0.5).abs() < 1e-9);
        assert!((judge.average_confidence() - 0.48).abs() < 1e-9);
    }
}
