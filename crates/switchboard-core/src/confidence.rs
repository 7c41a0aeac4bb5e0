//! Confidence, match and savings arithmetic.
//!
//! Two confidence formulas exist side by side:
//!
//! ```text
//! incremental: baseline 65 (any pill assumed) or 75, +10 per first
//!              confirmation, +specificity gain per refinement,
//!              capped at 95 until every pill is confirmed
//! linear:      min(100, round(50 + confirmed * 50/3))
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;
use crate::needs::NeedsModel;

pub const MAX_CONFIDENCE: u8 = 100;
pub const PARTIAL_CAP: u8 = 95;
pub const CONFIRM_STEP: u8 = 10;
pub const MAX_REFINE_STEP: u8 = 3;
pub const ASSUMED_BASELINE: u8 = 65;
pub const CONFIRMED_BASELINE: u8 = 75;
pub const MATCH_FLOOR: u8 = 50;
pub const MATCH_STEP_PER_RANK: u8 = 5;
pub const SAVINGS_FLOOR: u32 = 10;

pub const CAPTION_COMPLETE: &str = "Nice work \u{2014} you\u{2019}ve reached 100% confidence";
pub const CAPTION_PENDING: &str = "Confirm the pills to strengthen matches.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceFormula {
    #[default]
    Incremental,
    Linear,
}

impl ConfidenceFormula {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Linear => "linear",
        }
    }
}

impl fmt::Display for ConfidenceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceFormula {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" | "delta" => Ok(Self::Incremental),
            "linear" | "count" => Ok(Self::Linear),
            _ => Err(ParseEnumError::new("confidence formula", s)),
        }
    }
}

/// Floor of the incremental formula for the model's current state.
pub fn baseline(model: &NeedsModel) -> u8 {
    if model.any_assumed() {
        ASSUMED_BASELINE
    } else {
        CONFIRMED_BASELINE
    }
}

/// Linear formula over the number of confirmed pills.
pub fn compute_confidence_percent(model: &NeedsModel) -> u8 {
    linear_percent(model.confirmed_count())
}

fn linear_percent(confirmed: usize) -> u8 {
    // round((150 + 50n) / 3) in integer arithmetic
    let scaled = 150_usize.saturating_add(confirmed.saturating_mul(50));
    let rounded = (scaled * 2 + 3) / 6;
    u8::try_from(rounded)
        .unwrap_or(MAX_CONFIDENCE)
        .min(MAX_CONFIDENCE)
}

/// `max(50, confidence - 5 * rank)`; rank 0 is the best offer.
pub fn compute_match_percent(confidence: u8, rank: usize) -> u8 {
    let drop = rank.saturating_mul(usize::from(MATCH_STEP_PER_RANK));
    let drop = u8::try_from(drop).unwrap_or(u8::MAX);
    confidence
        .min(MAX_CONFIDENCE)
        .saturating_sub(drop)
        .max(MATCH_FLOOR)
}

/// `max(10, round((100 - match) * 0.8))`.
pub fn compute_savings(match_percent: u8) -> u32 {
    let gap = u32::from(MAX_CONFIDENCE.saturating_sub(match_percent));
    // round(gap * 0.8) == (8 * gap + 5) / 10 for non-negative integers
    ((gap * 8 + 5) / 10).max(SAVINGS_FLOOR)
}

pub fn caption(model: &NeedsModel, displayed: u8) -> &'static str {
    if model.all_confirmed() && displayed >= MAX_CONFIDENCE {
        CAPTION_COMPLETE
    } else {
        CAPTION_PENDING
    }
}

fn cap(prev: u8, raised: u8, all_confirmed_before: bool) -> u8 {
    let capped = if all_confirmed_before {
        raised
    } else {
        raised.min(PARTIAL_CAP)
    };
    capped.clamp(prev, MAX_CONFIDENCE.max(prev))
}

pub(crate) fn next_confirm(prev: u8, all_confirmed_before: bool) -> u8 {
    cap(prev, prev.saturating_add(CONFIRM_STEP), all_confirmed_before)
}

pub(crate) fn next_refine(prev: u8, from: u8, to: u8, all_confirmed_before: bool) -> u8 {
    let delta = to.saturating_sub(from).min(MAX_REFINE_STEP);
    cap(prev, prev.saturating_add(delta), all_confirmed_before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_formula_steps_by_a_third() {
        assert_eq!(linear_percent(0), 50);
        assert_eq!(linear_percent(1), 67);
        assert_eq!(linear_percent(2), 83);
        assert_eq!(linear_percent(3), 100);
        assert_eq!(linear_percent(9), 100);
    }

    #[test]
    fn match_percent_drops_five_per_rank_with_floor() {
        let seq = (0..12)
            .map(|rank| compute_match_percent(100, rank))
            .collect::<Vec<_>>();
        assert_eq!(seq, vec![100, 95, 90, 85, 80, 75, 70, 65, 60, 55, 50, 50]);
        assert_eq!(compute_match_percent(67, 0), 67);
        assert_eq!(compute_match_percent(67, 4), 50);
        assert_eq!(compute_match_percent(100, usize::MAX), 50);
    }

    #[test]
    fn savings_is_inverse_to_match() {
        assert_eq!(compute_savings(100), 10);
        assert_eq!(compute_savings(95), 10);
        assert_eq!(compute_savings(85), 12);
        assert_eq!(compute_savings(80), 16);
        assert_eq!(compute_savings(50), 40);
    }

    #[test]
    fn confirm_step_is_capped_until_all_confirmed() {
        assert_eq!(next_confirm(65, false), 75);
        assert_eq!(next_confirm(90, false), 95);
        assert_eq!(next_confirm(95, false), 95);
        assert_eq!(next_confirm(95, true), 100);
        assert_eq!(next_confirm(100, true), 100);
    }

    #[test]
    fn refine_only_rewards_specificity_gain() {
        assert_eq!(next_refine(75, 1, 1, false), 75);
        assert_eq!(next_refine(75, 2, 0, false), 75);
        assert_eq!(next_refine(75, 0, 2, false), 77);
        assert_eq!(next_refine(75, 0, 9, false), 78);
        assert_eq!(next_refine(94, 0, 3, false), 95);
        assert_eq!(next_refine(99, 0, 3, true), 100);
    }

    #[test]
    fn formula_names_parse() {
        assert_eq!("linear".parse(), Ok(ConfidenceFormula::Linear));
        assert_eq!(" Incremental ".parse(), Ok(ConfidenceFormula::Incremental));
        assert!("quadratic".parse::<ConfidenceFormula>().is_err());
    }
}
