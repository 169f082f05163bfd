use serde::{Deserialize, Serialize};

/// Where a validated output goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Auto,
    Hitl,
    Reject,
}

/// Thresholds that turn a confidence into a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingThresholds {
    pub auto_approve: f64,
    pub review: f64,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 0.90,
            review: 0.70,
        }
    }
}

/// Score of one judge check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckScore {
    pub name: String,
    pub weight: f64,
    pub score: f64,
    /// The check timed out or errored and the neutral score was used.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub approved: bool,
    pub confidence: f64,
    pub route: Route,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub checks: Vec<CheckScore>,
}

pub const STALE_STATE_REASON: &str = "stale state";

impl Judgment {
    /// Route a confidence. A stale state version vetoes regardless of confidence.
    ///
    /// This is the only constructor that picks a route, so the route is always
    /// a function of `(confidence, stale)`.
    pub fn route(
        confidence: f64,
        stale: bool,
        thresholds: RoutingThresholds,
        checks: Vec<CheckScore>,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let (approved, route, reason) = if stale {
            (false, Route::Reject, Some(STALE_STATE_REASON.to_string()))
        } else if confidence >= thresholds.auto_approve {
            (true, Route::Auto, None)
        } else if confidence >= thresholds.review {
            (
                false,
                Route::Hitl,
                Some(format!(
                    "confidence {confidence:.3} below auto-approve threshold {:.2}; queued for human review",
                    thresholds.auto_approve
                )),
            )
        } else {
            (
                false,
                Route::Reject,
                Some(format!(
                    "confidence {confidence:.3} below review threshold {:.2}",
                    thresholds.review
                )),
            )
        };

        Self {
            approved,
            confidence,
            route,
            reason,
            checks,
        }
    }

    /// Unusable output: zero confidence, rejected, never approved.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            confidence: 0.0,
            route: Route::Reject,
            reason: Some(reason.into()),
            checks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, Route::Auto)]
    #[case(0.90, Route::Auto)]
    #[case(0.8999, Route::Hitl)]
    #[case(0.70, Route::Hitl)]
    #[case(0.6999, Route::Reject)]
    #[case(0.0, Route::Reject)]
    fn routes_by_threshold(#[case] confidence: f64, #[case] expected: Route) {
        let j = Judgment::route(confidence, false, RoutingThresholds::default(), vec![]);
        assert_eq!(j.route, expected);
        assert_eq!(j.approved, expected == Route::Auto);
        assert_eq!(j.reason.is_some(), !j.approved);
    }

    #[test]
    fn stale_state_overrides_high_confidence() {
        let j = Judgment::route(0.95, true, RoutingThresholds::default(), vec![]);
        assert_eq!(j.route, Route::Reject);
        assert!(!j.approved);
        assert_eq!(j.reason.as_deref(), Some(STALE_STATE_REASON));
    }
}
