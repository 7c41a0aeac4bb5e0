use serde::Serialize;

use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanDescriptor {
    pub provider: &'static str,
    pub product: &'static str,
    pub contract: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_fee: Option<&'static str>,
}

const AGILE_OCTOPUS: PlanDescriptor = PlanDescriptor {
    provider: "octopus",
    product: "Agile Octopus",
    contract: "12 month contract",
    exit_fee: None,
};

const EXIT_FEE: &str = "\u{a3}50 exit fee";
const NO_EXIT_FEE: &str = "No exit fees";

struct PartnerPlans {
    headline: PlanDescriptor,
    simpler: PlanDescriptor,
    alternate: PlanDescriptor,
}

static OVO_PLANS: PartnerPlans = PartnerPlans {
    headline: PlanDescriptor {
        provider: "ovo",
        product: "OVO 1 Year Fixed",
        contract: "12 month contract",
        exit_fee: Some(EXIT_FEE),
    },
    simpler: PlanDescriptor {
        provider: "ovo",
        product: "OVO Simpler Energy",
        contract: "Rolling contract",
        exit_fee: Some(NO_EXIT_FEE),
    },
    alternate: PlanDescriptor {
        provider: "e.on",
        product: "EON Next Gust 12 m",
        contract: "12 month contract",
        exit_fee: None,
    },
};

static EON_PLANS: PartnerPlans = PartnerPlans {
    headline: PlanDescriptor {
        provider: "e.on",
        product: "EON Next Gust 12 m",
        contract: "12 month contract",
        exit_fee: Some(EXIT_FEE),
    },
    simpler: PlanDescriptor {
        provider: "e.on",
        product: "EON Simpler Energy",
        contract: "Rolling contract",
        exit_fee: Some(NO_EXIT_FEE),
    },
    alternate: PlanDescriptor {
        provider: "ovo",
        product: "OVO 1 Year Fixed",
        contract: "12 month contract",
        exit_fee: None,
    },
};

static BG_PLANS: PartnerPlans = PartnerPlans {
    headline: PlanDescriptor {
        provider: "BG",
        product: "BG Home Energy",
        contract: "12 month contract",
        exit_fee: Some(EXIT_FEE),
    },
    simpler: PlanDescriptor {
        provider: "BG",
        product: "BG Simpler Energy",
        contract: "Rolling contract",
        exit_fee: Some(NO_EXIT_FEE),
    },
    alternate: PlanDescriptor {
        provider: "ovo",
        product: "OVO 1 Year Fixed",
        contract: "12 month contract",
        exit_fee: None,
    },
};

fn partner_plans(scenario: Scenario) -> &'static PartnerPlans {
    match scenario {
        Scenario::Eon => &EON_PLANS,
        Scenario::Bg => &BG_PLANS,
        Scenario::Standard | Scenario::Existing | Scenario::Success | Scenario::OpenRent => {
            &OVO_PLANS
        }
    }
}

/// Plan shown at `rank`; variable offers are always the tracker tariff.
pub fn plan_for(scenario: Scenario, rank: usize, variable: bool) -> PlanDescriptor {
    if variable {
        return AGILE_OCTOPUS;
    }
    let plans = partner_plans(scenario);
    match rank {
        0 => plans.headline,
        1 => plans.simpler,
        _ => plans.alternate,
    }
}
