//! The three "pills" a shopper can confirm and the model that holds them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PillKey {
    #[serde(rename = "supplyType", alias = "supply")]
    SupplyType,
    #[serde(rename = "homeSize", alias = "bedrooms")]
    HomeSize,
    #[serde(rename = "ev")]
    Ev,
}

impl PillKey {
    pub const ALL: [Self; 3] = [Self::SupplyType, Self::HomeSize, Self::Ev];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SupplyType => "supplyType",
            Self::HomeSize => "homeSize",
            Self::Ev => "ev",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SupplyType => "Electricity type",
            Self::HomeSize => "Bedrooms",
            Self::Ev => "Electric vehicle",
        }
    }

    pub fn options(self) -> &'static [PillOption] {
        match self {
            Self::SupplyType => &SUPPLY_OPTIONS,
            Self::HomeSize => &HOME_SIZE_OPTIONS,
            Self::Ev => &EV_OPTIONS,
        }
    }

    /// Resolves a raw option value, label or legacy label for this key.
    pub fn find_option(self, raw: &str) -> Option<&'static PillOption> {
        let needle = raw.trim();
        self.options().iter().find(|option| option.matches(needle))
    }

    fn sentinel(self) -> &'static PillOption {
        let options = self.options();
        options
            .iter()
            .find(|option| option.sentinel)
            .unwrap_or(&UNKNOWN_OPTION)
    }
}

impl fmt::Display for PillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PillKey {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "supplyType" | "supply" => Ok(Self::SupplyType),
            "homeSize" | "bedrooms" => Ok(Self::HomeSize),
            "ev" => Ok(Self::Ev),
            other => Err(SelectionError::UnknownKey(other.to_string())),
        }
    }
}

/// One selectable entry in a pill's dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PillOption {
    pub value: &'static str,
    pub label: &'static str,
    /// Weight used only for confirmed-to-confirmed refinement deltas.
    pub specificity: u8,
    /// The "Unknown / skip" entry; choosing it leaves the pill assumed.
    pub sentinel: bool,
    pub aliases: &'static [&'static str],
}

impl PillOption {
    fn matches(&self, needle: &str) -> bool {
        self.value.eq_ignore_ascii_case(needle)
            || self.label.eq_ignore_ascii_case(needle)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(needle))
    }
}

const UNKNOWN_OPTION: PillOption = PillOption {
    value: "unknown",
    label: "Unknown / skip",
    specificity: 0,
    sentinel: true,
    aliases: &["skip"],
};

static SUPPLY_OPTIONS: [PillOption; 3] = [
    UNKNOWN_OPTION,
    PillOption {
        value: "electricity",
        label: "Electricity",
        specificity: 1,
        sentinel: false,
        aliases: &["Electricity only"],
    },
    PillOption {
        value: "dual",
        label: "Electricity and gas",
        specificity: 1,
        sentinel: false,
        aliases: &["Dual fuel"],
    },
];

static HOME_SIZE_OPTIONS: [PillOption; 4] = [
    UNKNOWN_OPTION,
    PillOption {
        value: "1-2",
        label: "1–2 bedrooms",
        specificity: 2,
        sentinel: false,
        aliases: &["1 – 2 bedrooms", "1-2 bedrooms"],
    },
    PillOption {
        value: "3-4",
        label: "3–4 bedrooms",
        specificity: 2,
        sentinel: false,
        aliases: &["3 – 4 bedrooms", "3-4 bedrooms"],
    },
    PillOption {
        value: "5+",
        label: "5+ bedrooms",
        specificity: 2,
        sentinel: false,
        aliases: &[],
    },
];

static EV_OPTIONS: [PillOption; 3] = [
    UNKNOWN_OPTION,
    PillOption {
        value: "yes",
        label: "Yes",
        specificity: 1,
        sentinel: false,
        aliases: &["Electric vehicle: Yes"],
    },
    PillOption {
        value: "no",
        label: "No",
        specificity: 1,
        sentinel: false,
        aliases: &["Electric vehicle: No"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PillStatus {
    Assumed,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pill {
    pub key: PillKey,
    pub value: &'static str,
    pub label: &'static str,
    pub status: PillStatus,
    pub specificity: u8,
}

impl Pill {
    fn assumed(key: PillKey, value: &str) -> Self {
        let option = key.find_option(value).unwrap_or_else(|| key.sentinel());
        Self::from_option(key, option, PillStatus::Assumed)
    }

    fn from_option(key: PillKey, option: &'static PillOption, status: PillStatus) -> Self {
        Self {
            key,
            value: option.value,
            label: option.label,
            status,
            specificity: option.specificity,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == PillStatus::Confirmed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Low,
    Medium,
}

/// Exactly one pill per [`PillKey`]; pills are replaced in place, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsModel {
    supply_type: Pill,
    home_size: Pill,
    ev: Pill,
}

impl Default for NeedsModel {
    fn default() -> Self {
        Self {
            supply_type: Pill::assumed(PillKey::SupplyType, "electricity"),
            home_size: Pill::assumed(PillKey::HomeSize, "1-2"),
            ev: Pill::assumed(PillKey::Ev, "no"),
        }
    }
}

impl NeedsModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn get(&self, key: PillKey) -> &Pill {
        match key {
            PillKey::SupplyType => &self.supply_type,
            PillKey::HomeSize => &self.home_size,
            PillKey::Ev => &self.ev,
        }
    }

    pub fn value(&self, key: PillKey) -> &'static str {
        self.get(key).value
    }

    pub fn pills(&self) -> [&Pill; 3] {
        [&self.supply_type, &self.home_size, &self.ev]
    }

    pub fn confirmed_count(&self) -> usize {
        self.pills().iter().filter(|pill| pill.is_confirmed()).count()
    }

    pub fn all_confirmed(&self) -> bool {
        self.confirmed_count() == PillKey::ALL.len()
    }

    pub fn any_confirmed(&self) -> bool {
        self.confirmed_count() > 0
    }

    pub fn any_assumed(&self) -> bool {
        !self.all_confirmed()
    }

    pub fn usage_level(&self) -> UsageLevel {
        match self.home_size.value {
            "3-4" | "5+" => UsageLevel::Medium,
            _ => UsageLevel::Low,
        }
    }

    /// Writes the option into the pill and returns the pill as it was before.
    pub(crate) fn apply(&mut self, key: PillKey, option: &'static PillOption) -> Pill {
        let status = if option.sentinel {
            PillStatus::Assumed
        } else {
            PillStatus::Confirmed
        };
        let slot = match key {
            PillKey::SupplyType => &mut self.supply_type,
            PillKey::HomeSize => &mut self.home_size,
            PillKey::Ev => &mut self.ev,
        };
        std::mem::replace(slot, Pill::from_option(key, option, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_model_has_three_assumed_pills() {
        let model = NeedsModel::new();
        assert_eq!(model.confirmed_count(), 0);
        assert!(model.any_assumed());
        assert_eq!(model.value(PillKey::SupplyType), "electricity");
        assert_eq!(model.value(PillKey::HomeSize), "1-2");
        assert_eq!(model.value(PillKey::Ev), "no");
        assert_eq!(model.usage_level(), UsageLevel::Low);
    }

    #[test]
    fn parallel_key_names_are_aliases() {
        assert_eq!("supply".parse::<PillKey>(), Ok(PillKey::SupplyType));
        assert_eq!("bedrooms".parse::<PillKey>(), Ok(PillKey::HomeSize));
        assert_eq!("homeSize".parse::<PillKey>(), Ok(PillKey::HomeSize));
        assert!("garden".parse::<PillKey>().is_err());

        let key: PillKey = serde_json::from_str("\"bedrooms\"").expect("alias deserializes");
        assert_eq!(key, PillKey::HomeSize);
    }

    #[test]
    fn legacy_labels_resolve_to_canonical_options() {
        let dual = PillKey::SupplyType.find_option("Dual fuel").expect("dual fuel");
        assert_eq!(dual.value, "dual");
        let big = PillKey::HomeSize.find_option("3 – 4 bedrooms").expect("3-4");
        assert_eq!(big.value, "3-4");
        let ev = PillKey::Ev.find_option("Electric vehicle: Yes").expect("ev yes");
        assert_eq!(ev.value, "yes");
        assert!(PillKey::Ev.find_option("maybe").is_none());
    }

    #[test]
    fn apply_sentinel_keeps_pill_assumed() {
        let mut model = NeedsModel::new();
        let five = PillKey::HomeSize.find_option("5+").expect("5+");
        let before = model.apply(PillKey::HomeSize, five);
        assert_eq!(before.status, PillStatus::Assumed);
        assert!(model.get(PillKey::HomeSize).is_confirmed());
        assert_eq!(model.usage_level(), UsageLevel::Medium);

        let unknown = PillKey::HomeSize.find_option("unknown").expect("unknown");
        model.apply(PillKey::HomeSize, unknown);
        assert_eq!(model.get(PillKey::HomeSize).status, PillStatus::Assumed);
        assert_eq!(model.confirmed_count(), 0);
    }
}
