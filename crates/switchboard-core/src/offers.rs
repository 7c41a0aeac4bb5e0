//! Offer pricing and the ranked offer board derived from a needs session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{plan_for, PlanDescriptor};
use crate::confidence::{compute_match_percent, compute_savings};
use crate::error::ParseEnumError;
use crate::needs::{NeedsModel, PillKey};
use crate::scenario::Scenario;
use crate::session::NeedsSession;

pub const DEFAULT_BASE_PRICE: f64 = 40.94;
pub const SIMPLER_ENERGY_MARKUP: f64 = 3.50;
pub const ALL_OFFERS_COUNT: usize = 7;
pub const ALL_OFFERS_PRICE_STEP: f64 = 2.5;
/// Ranks 0 and 1 are the best offers; the full list starts after them.
pub const ALL_OFFERS_FIRST_RANK: usize = 2;

pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn bedrooms_multiplier(home_size: &str) -> f64 {
    match home_size {
        "3-4" => 1.18,
        "5+" => 1.35,
        _ => 1.0,
    }
}

pub fn ev_multiplier(ev: &str) -> f64 {
    if ev == "yes" {
        1.07
    } else {
        1.0
    }
}

pub fn dual_fuel_multiplier(supply: &str) -> f64 {
    if supply == "dual" {
        1.06
    } else {
        1.0
    }
}

/// `base * bedrooms * ev * dual_fuel`, rounded to pence.
///
/// Multipliers follow pill values whether assumed or confirmed.
pub fn compute_offer_price(base_price: f64, model: &NeedsModel) -> f64 {
    round_currency(
        base_price
            * bedrooms_multiplier(model.value(PillKey::HomeSize))
            * ev_multiplier(model.value(PillKey::Ev))
            * dual_fuel_multiplier(model.value(PillKey::SupplyType)),
    )
}

/// Every third entry of the full list, starting with its first, is the
/// variable tracker tariff; the two best offers are always fixed.
pub const fn is_variable_rank(rank: usize) -> bool {
    match rank.checked_sub(ALL_OFFERS_FIRST_RANK) {
        Some(offset) => offset % 3 == 0,
        None => false,
    }
}

/// Price of the rank-1 "Simpler Energy" offer next to a headline price.
pub fn simpler_energy_price(headline: f64) -> f64 {
    round_currency(headline + SIMPLER_ENERGY_MARKUP)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub rank: usize,
    pub price: f64,
    pub variable: bool,
    pub match_percent: u8,
    pub savings: u32,
    pub plan: PlanDescriptor,
}

impl Offer {
    fn new(rank: usize, price: f64, variable: bool, confidence: u8, scenario: Scenario) -> Self {
        let match_percent = compute_match_percent(confidence, rank);
        Self {
            rank,
            price: round_currency(price),
            variable,
            match_percent,
            savings: compute_savings(match_percent),
            plan: plan_for(scenario, rank, variable),
        }
    }

    pub fn match_text(&self) -> String {
        format!(
            "{}% match, saves you \u{a3}{}",
            self.match_percent, self.savings
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferFilter {
    #[default]
    All,
    Fixed,
    Variable,
}

impl OfferFilter {
    pub const fn accepts(self, offer: &Offer) -> bool {
        match self {
            Self::All => true,
            Self::Fixed => !offer.variable,
            Self::Variable => offer.variable,
        }
    }
}

impl fmt::Display for OfferFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::Fixed => "fixed",
            Self::Variable => "variable",
        };
        f.write_str(label)
    }
}

impl FromStr for OfferFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "fixed" => Ok(Self::Fixed),
            "variable" => Ok(Self::Variable),
            _ => Err(ParseEnumError::new("offer filter", s)),
        }
    }
}

/// Projection of a session onto the marketplace listing. Rebuilt on every
/// change; nothing here is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferBoard {
    /// Offers stay hidden until the shopper confirms at least one pill.
    pub visible: bool,
    pub confidence: u8,
    pub headline_price: f64,
    pub best: Vec<Offer>,
    pub all: Vec<Offer>,
}

impl OfferBoard {
    pub fn build(session: &NeedsSession, base_price: f64, scenario: Scenario) -> Self {
        let model = session.model();
        let confidence = session.confidence_percent();
        let headline_price = compute_offer_price(base_price, model);

        if !model.any_confirmed() {
            return Self {
                visible: false,
                confidence,
                headline_price,
                best: Vec::new(),
                all: Vec::new(),
            };
        }

        let best = vec![
            Offer::new(0, headline_price, false, confidence, scenario),
            Offer::new(
                1,
                simpler_energy_price(headline_price),
                false,
                confidence,
                scenario,
            ),
        ];

        let mut step_price = headline_price;
        let mut all = Vec::with_capacity(ALL_OFFERS_COUNT);
        for i in 0..ALL_OFFERS_COUNT {
            let rank = i + ALL_OFFERS_FIRST_RANK;
            all.push(Offer::new(
                rank,
                step_price,
                is_variable_rank(rank),
                confidence,
                scenario,
            ));
            step_price += ALL_OFFERS_PRICE_STEP;
        }

        Self {
            visible: true,
            confidence,
            headline_price,
            best,
            all,
        }
    }

    pub fn filtered(&self, filter: OfferFilter) -> Vec<&Offer> {
        self.all.iter().filter(|offer| filter.accepts(offer)).collect()
    }
}
