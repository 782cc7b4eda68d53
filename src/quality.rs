use crate::core::types::{IndicatorValue, SourceTier};

/// Computes a 0-100 confidence score for a single extracted value.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    base_score: i32,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(80)
    }
}

impl QualityScorer {
    pub fn new(base_score: i32) -> Self {
        Self { base_score }
    }

    pub fn score(
        &self,
        value: &IndicatorValue,
        unit: Option<&str>,
        context_ref: Option<&str>,
        source: SourceTier,
    ) -> u8 {
        if value.is_absent() {
            return 0;
        }

        let mut score = self.base_score;
        if value.is_numeric() {
            score = score.saturating_add(10);
        }
        if unit.is_some_and(|u| !u.is_empty()) {
            score = score.saturating_add(5);
        }
        if context_ref.is_some_and(|c| !c.is_empty()) {
            score = score.saturating_add(5);
        }
        score = score.saturating_add(match source {
            SourceTier::Xbrl => 0,
            SourceTier::PublicApi => -10,
            SourceTier::Manual => -20,
        });

        score.clamp(0, 100) as u8
    }
}
