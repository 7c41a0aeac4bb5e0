use serde::Serialize;
use tracing::{debug, info};

use crate::confidence::{
    baseline, caption, compute_confidence_percent, compute_match_percent, next_confirm,
    next_refine, ConfidenceFormula, MAX_CONFIDENCE,
};
use crate::error::SelectionError;
use crate::needs::{NeedsModel, PillKey, PillStatus};

/// What a single `select_pill` call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionOutcome {
    pub key: PillKey,
    pub value: &'static str,
    pub status: PillStatus,
    pub confidence: u8,
    pub first_confirmation: bool,
    /// Set on confirmed-to-confirmed refinements; purely presentational.
    pub pulse: bool,
    /// True exactly once per session: when confidence first shows 100.
    pub celebrate: bool,
}

/// Owned needs state for one shopper: the pills, the running confidence and
/// the one-shot celebration latch.
#[derive(Debug, Clone)]
pub struct NeedsSession {
    model: NeedsModel,
    formula: ConfidenceFormula,
    running: u8,
    celebrated: bool,
}

impl Default for NeedsSession {
    fn default() -> Self {
        Self::new(ConfidenceFormula::default())
    }
}

impl NeedsSession {
    pub fn new(formula: ConfidenceFormula) -> Self {
        let model = NeedsModel::new();
        let running = match formula {
            ConfidenceFormula::Incremental => baseline(&model),
            ConfidenceFormula::Linear => compute_confidence_percent(&model),
        };
        Self {
            model,
            formula,
            running,
            celebrated: false,
        }
    }

    pub const fn model(&self) -> &NeedsModel {
        &self.model
    }

    pub const fn formula(&self) -> ConfidenceFormula {
        self.formula
    }

    pub const fn has_celebrated(&self) -> bool {
        self.celebrated
    }

    /// Confidence as shown to the shopper under the session's formula.
    pub fn confidence_percent(&self) -> u8 {
        match self.formula {
            ConfidenceFormula::Incremental => {
                self.running.clamp(baseline(&self.model), MAX_CONFIDENCE)
            }
            ConfidenceFormula::Linear => self
                .running
                .max(compute_confidence_percent(&self.model))
                .min(MAX_CONFIDENCE),
        }
    }

    pub fn match_percent(&self, rank: usize) -> u8 {
        compute_match_percent(self.confidence_percent(), rank)
    }

    pub fn caption(&self) -> &'static str {
        caption(&self.model, self.confidence_percent())
    }

    pub fn select_pill(
        &mut self,
        key: PillKey,
        option_value: &str,
    ) -> Result<SelectionOutcome, SelectionError> {
        let option = key
            .find_option(option_value)
            .ok_or_else(|| SelectionError::UnknownOption {
                key,
                value: option_value.to_string(),
            })?;

        let all_confirmed_before = self.model.all_confirmed();
        let previous = self.model.apply(key, option);
        let was_assumed = previous.status == PillStatus::Assumed;
        let now_confirmed = !option.sentinel;
        let first_confirmation = was_assumed && now_confirmed;
        let pulse = !was_assumed && now_confirmed;

        if self.formula == ConfidenceFormula::Linear {
            // high-water mark: skipping a pill never lowers what was shown
            self.running = self.running.max(compute_confidence_percent(&self.model));
        } else if first_confirmation {
            self.running = next_confirm(self.running, all_confirmed_before);
        } else if pulse {
            self.running = next_refine(
                self.running,
                previous.specificity,
                option.specificity,
                all_confirmed_before,
            );
        }
        if self.model.all_confirmed() {
            self.running = self.running.max(MAX_CONFIDENCE);
        }

        let confidence = self.confidence_percent();
        let celebrate = confidence == MAX_CONFIDENCE && !self.celebrated;
        if celebrate {
            self.celebrated = true;
            info!(formula = %self.formula, "needs confidence reached 100");
        }

        let pill = self.model.get(key);
        debug!(
            %key,
            value = pill.value,
            first_confirmation,
            pulse,
            confidence,
            "pill selected"
        );

        Ok(SelectionOutcome {
            key,
            value: pill.value,
            status: pill.status,
            confidence,
            first_confirmation,
            pulse,
            celebrate,
        })
    }

    /// Parses the key first so both `supplyType` and `supply` naming work.
    pub fn select_raw(
        &mut self,
        key: &str,
        option_value: &str,
    ) -> Result<SelectionOutcome, SelectionError> {
        let key = key.parse::<PillKey>()?;
        self.select_pill(key, option_value)
    }
}
