//! Scripted replies for the "Jay" helper panel.
//!
//! Each table is an ordered list of `(pattern, response)` pairs matched
//! case-insensitively against the shopper's question; the first hit wins and
//! every table ends in a fallback.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use switchboard_core::{ParseEnumError, UsageLevel};

/// Placeholder replaced with the shopper's usage level ("low" / "medium").
pub const USAGE_PLACEHOLDER: &str = "{usage}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTable {
    Marketplace,
    Checkout,
    Plan,
    Subscriptions,
}

impl ReplyTable {
    pub const ALL: [Self; 4] = [
        Self::Marketplace,
        Self::Checkout,
        Self::Plan,
        Self::Subscriptions,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marketplace => "marketplace",
            Self::Checkout => "checkout",
            Self::Plan => "plan",
            Self::Subscriptions => "subscriptions",
        }
    }

    fn script(self) -> &'static Script {
        match self {
            Self::Marketplace => &MARKETPLACE,
            Self::Checkout => &CHECKOUT,
            Self::Plan => &PLAN,
            Self::Subscriptions => &SUBSCRIPTIONS,
        }
    }
}

impl fmt::Display for ReplyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyTable {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "reply table",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct ScriptEntry {
    pattern: &'static str,
    response: &'static str,
}

struct Script {
    rules: Vec<(Regex, &'static str)>,
    fallback: &'static str,
}

impl Script {
    fn compile(entries: &[ScriptEntry], fallback: &'static str) -> Self {
        let rules = entries
            .iter()
            .filter_map(|entry| {
                RegexBuilder::new(entry.pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (re, entry.response))
            })
            .collect();
        Self { rules, fallback }
    }

    fn answer(&self, question: &str) -> &'static str {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(question))
            .map_or(self.fallback, |(_, response)| *response)
    }
}

static MARKETPLACE_ENTRIES: [ScriptEntry; 3] = [
    ScriptEntry {
        pattern: "save|saving|switch",
        response: "Based on your low usage profile, most households in your area save \u{a3}200-400 annually by switching from default tariffs. I can help you explore the best options.",
    },
    ScriptEntry {
        pattern: "fixed|variable|rate",
        response: "Fixed rates stay the same for your contract term, while variable rates can change with market conditions. For low usage like yours, fixed rates often provide better value and predictability.",
    },
    ScriptEntry {
        pattern: "default|tariff",
        response: "Default tariffs are what you're automatically put on when you don't choose a plan. They're regulated but rarely the cheapest option. Most people can find better deals.",
    },
];

static CHECKOUT_ENTRIES: [ScriptEntry; 3] = [
    ScriptEntry {
        pattern: "direct debit|secure|safety",
        response: "Direct Debit is very secure and protected by the Direct Debit Guarantee. Banks use advanced security measures, and you can cancel or change payments easily. It's actually safer than many other payment methods.",
    },
    ScriptEntry {
        pattern: "cancel|stop|change",
        response: "You can cancel your energy plan or Direct Debit at any time by contacting your supplier. There are no exit fees with this plan, and the Direct Debit Guarantee protects you throughout the process.",
    },
    ScriptEntry {
        pattern: "smart meter|installation",
        response: "Smart meters help you track your energy usage in real-time and ensure accurate billing. Installation is usually free and takes about 2 hours. You can opt out if you prefer.",
    },
];

static PLAN_ENTRIES: [ScriptEntry; 3] = [
    ScriptEntry {
        pattern: "variable",
        response: "Variable plans can change with the price cap. Based on your needs, this plan scores lower because rates may fluctuate and your usage looks {usage}.",
    },
    ScriptEntry {
        pattern: "fixed",
        response: "Fixed plans keep your unit rate predictable for the contract term; your match improves if your usage pattern is steady.",
    },
    ScriptEntry {
        pattern: "renewable",
        response: "This plan sources a high share of renewable energy; greener but sometimes pricier. I can compare emissions against similar usage.",
    },
];

static SUBSCRIPTIONS_ENTRIES: [ScriptEntry; 5] = [
    ScriptEntry {
        pattern: "subscription|plan",
        response: "You're currently on the EON Next Gust 12m plan. It's a 12-month fixed contract with direct debit payments of \u{a3}50.71/month. Your contract runs until September 2026.",
    },
    ScriptEntry {
        pattern: "payment",
        response: "Your next payment of \u{a3}50.71 is scheduled for the 1st of next month via direct debit. You can view all payment details in your account settings.",
    },
    ScriptEntry {
        pattern: "change|switch",
        response: "You can explore other energy plans in our marketplace. Since you're in a fixed contract until Sep 2026, early exit fees may apply. Would you like me to show you available options?",
    },
    ScriptEntry {
        pattern: "usage|consumption",
        response: "Based on your current plan, you're set up for low to medium usage. Your smart meter is tracking your consumption, and you're on track with your monthly estimates.",
    },
    ScriptEntry {
        pattern: "renewable|green",
        response: "Great question! Your EON Next plan includes renewable energy options. The plan is designed to help reduce your carbon footprint while keeping costs competitive.",
    },
];

static MARKETPLACE: LazyLock<Script> = LazyLock::new(|| {
    Script::compile(
        &MARKETPLACE_ENTRIES,
        "I can help you understand your energy options and find the best deals for your specific usage pattern. What would you like to know more about?",
    )
});

static CHECKOUT: LazyLock<Script> = LazyLock::new(|| {
    Script::compile(
        &CHECKOUT_ENTRIES,
        "I can help you with any questions about the checkout process, Direct Debit, or your energy plan. What would you like to know?",
    )
});

static PLAN: LazyLock<Script> = LazyLock::new(|| {
    Script::compile(
        &PLAN_ENTRIES,
        "Here's a tailored explanation based on your current needs and confidence. I'll highlight savings and trade\u{2011}offs for each plan.",
    )
});

static SUBSCRIPTIONS: LazyLock<Script> = LazyLock::new(|| {
    Script::compile(
        &SUBSCRIPTIONS_ENTRIES,
        "I'm here to help with any questions about your energy subscription, payments, or plan changes. What would you like to know more about?",
    )
});

pub const fn usage_word(usage: UsageLevel) -> &'static str {
    match usage {
        UsageLevel::Low => "low",
        UsageLevel::Medium => "medium",
    }
}

/// Answers `question` from `table`, filling in the shopper's usage level.
pub fn reply(table: ReplyTable, question: &str, usage: UsageLevel) -> String {
    table
        .script()
        .answer(question.trim())
        .replace(USAGE_PLACEHOLDER, usage_word(usage))
}

/// Hover-card explanation for an offer, tiered by match percentage.
pub fn analysis(match_percent: u8, savings: u32, variable: bool, usage: UsageLevel) -> String {
    let plan_type = if variable { "variable" } else { "fixed" };
    let usage = usage_word(usage);
    if match_percent >= 80 {
        format!(
            "This {plan_type} plan is an excellent match for your {usage} usage profile. The {match_percent}% match indicates strong alignment with your energy needs. You'll save \u{a3}{savings} annually compared to your current plan, making it a smart financial choice. The {plan_type} pricing structure works well with your consumption pattern."
        )
    } else if match_percent >= 60 {
        format!(
            "This {plan_type} plan offers a good match at {match_percent}% for your {usage} usage. While not perfect, it still provides \u{a3}{savings} in annual savings. The {plan_type} structure may have some trade-offs with your usage pattern, but the savings make it worth considering."
        )
    } else {
        format!(
            "This {plan_type} plan has a {match_percent}% match, which is lower due to your {usage} usage pattern. While you'd save \u{a3}{savings} annually, the {plan_type} pricing structure may not be optimal for your consumption habits. Consider confirming your pill selections to find better matches."
        )
    }
}

/// Question pre-filled by the "Ask Jay" button on a match chip.
pub fn match_question(match_percent: u8, variable: bool) -> String {
    let plan_type = if variable { "variable" } else { "fixed" };
    format!("Why is this {plan_type} plan a {match_percent}% match for me?")
}
