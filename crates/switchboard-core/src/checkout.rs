//! Direct Debit form validation and the two-step checkout flow.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CheckoutError;

pub const ACCOUNT_NUMBER_DIGITS: usize = 8;
pub const SORT_CODE_DIGITS: usize = 6;
pub const MIN_HOLDER_NAME_LEN: usize = 2;
pub const BASE_MONTHLY_TOTAL: f64 = 50.71;
pub const SMART_METER_MONTHLY: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl FieldCheck {
    const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    const fn fail(message: &'static str) -> Self {
        Self {
            valid: false,
            error: Some(message),
        }
    }
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn validate_account_holder(raw: &str) -> FieldCheck {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        FieldCheck::fail("Account holder name is required")
    } else if trimmed.chars().count() < MIN_HOLDER_NAME_LEN {
        FieldCheck::fail("Please enter a valid name")
    } else {
        FieldCheck::ok()
    }
}

pub fn validate_account_number(raw: &str) -> FieldCheck {
    let number = digits(raw);
    if number.is_empty() {
        FieldCheck::fail("Account number is required")
    } else if number.len() != ACCOUNT_NUMBER_DIGITS {
        FieldCheck::fail("Account number must be 8 digits")
    } else {
        FieldCheck::ok()
    }
}

pub fn validate_sort_code(raw: &str) -> FieldCheck {
    let code = digits(raw);
    if code.is_empty() {
        FieldCheck::fail("Sort code is required")
    } else if code.len() != SORT_CODE_DIGITS {
        FieldCheck::fail("Sort code must be 6 digits")
    } else {
        FieldCheck::ok()
    }
}

/// Drops non-digits and keeps the first eight.
pub fn sanitize_account_number(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(ACCOUNT_NUMBER_DIGITS)
        .collect()
}

/// Renders up to six digits as `DD-DD-DD` while typing: the first hyphen
/// appears once two digits are in, the second only with a fifth digit.
pub fn format_sort_code(raw: &str) -> String {
    let mut out = String::with_capacity(SORT_CODE_DIGITS + 2);
    for (i, ch) in raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(SORT_CODE_DIGITS)
        .enumerate()
    {
        if i == 4 {
            out.push('-');
        }
        out.push(ch);
        if i == 1 {
            out.push('-');
        }
    }
    out
}

pub fn monthly_total(smart_meter: bool) -> f64 {
    if smart_meter {
        BASE_MONTHLY_TOTAL + SMART_METER_MONTHLY
    } else {
        BASE_MONTHLY_TOTAL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    #[serde(alias = "accountHolder")]
    pub account_holder_name: String,
    pub account_number: String,
    pub sort_code: String,
    pub authorise_debit: bool,
    pub agree_terms: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidation {
    pub valid: bool,
    pub account_holder_name: FieldCheck,
    pub account_number: FieldCheck,
    pub sort_code: FieldCheck,
    pub authorise_debit: bool,
    pub agree_terms: bool,
}

pub fn validate_form(details: &PaymentDetails) -> FormValidation {
    let account_holder_name = validate_account_holder(&details.account_holder_name);
    let account_number = validate_account_number(&details.account_number);
    let sort_code = validate_sort_code(&details.sort_code);
    let valid = account_holder_name.valid
        && account_number.valid
        && sort_code.valid
        && details.authorise_debit
        && details.agree_terms;
    FormValidation {
        valid,
        account_holder_name,
        account_number,
        sort_code,
        authorise_debit: details.authorise_debit,
        agree_terms: details.agree_terms,
    }
}

impl FormValidation {
    /// First failing condition, in form order.
    pub fn first_problem(&self) -> Option<&'static str> {
        self.account_holder_name
            .error
            .or(self.account_number.error)
            .or(self.sort_code.error)
            .or((!self.authorise_debit).then_some("Direct Debit authorisation is required"))
            .or((!self.agree_terms).then_some("Terms must be accepted"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutStep {
    Step1Active,
    Step2Active,
    Submitted,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Step1Active => "step 1",
            Self::Step2Active => "step 2",
            Self::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

/// Read-only copy of the payment fields shown on the review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFields {
    pub account_number: String,
    pub sort_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFlow {
    step: CheckoutStep,
    details: PaymentDetails,
    review: Option<ReviewFields>,
    smart_meter: bool,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    pub const fn new() -> Self {
        Self {
            step: CheckoutStep::Step1Active,
            details: PaymentDetails {
                account_holder_name: String::new(),
                account_number: String::new(),
                sort_code: String::new(),
                authorise_debit: false,
                agree_terms: false,
            },
            review: None,
            smart_meter: false,
        }
    }

    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    pub const fn details(&self) -> &PaymentDetails {
        &self.details
    }

    pub const fn review(&self) -> Option<&ReviewFields> {
        self.review.as_ref()
    }

    pub fn validation(&self) -> FormValidation {
        validate_form(&self.details)
    }

    pub fn can_continue(&self) -> bool {
        self.step == CheckoutStep::Step1Active && self.validation().valid
    }

    pub fn can_complete(&self) -> bool {
        self.step == CheckoutStep::Step2Active
    }

    pub fn total(&self) -> f64 {
        monthly_total(self.smart_meter)
    }

    /// Step-1 edit. Account number and sort code are normalised the way the
    /// inputs format them while typing.
    pub fn update_details(&mut self, details: PaymentDetails) -> Result<FormValidation, CheckoutError> {
        self.require(CheckoutStep::Step1Active, "edit payment details")?;
        self.details = PaymentDetails {
            account_number: sanitize_account_number(&details.account_number),
            sort_code: format_sort_code(&details.sort_code),
            ..details
        };
        Ok(self.validation())
    }

    pub fn set_smart_meter(&mut self, enabled: bool) -> Result<f64, CheckoutError> {
        self.require(CheckoutStep::Step1Active, "change add-ons")?;
        self.smart_meter = enabled;
        Ok(self.total())
    }

    pub fn continue_to_review(&mut self) -> Result<&ReviewFields, CheckoutError> {
        self.require(CheckoutStep::Step1Active, "continue")?;
        let validation = self.validation();
        if let Some(problem) = validation.first_problem() {
            return Err(CheckoutError::Incomplete(problem.to_string()));
        }
        self.step = CheckoutStep::Step2Active;
        debug!(step = %self.step, "checkout advanced to review");
        Ok(self.review.insert(ReviewFields {
            account_number: self.details.account_number.clone(),
            sort_code: self.details.sort_code.clone(),
        }))
    }

    /// Back to step 1; the entered details are kept for re-display.
    pub fn edit(&mut self) -> Result<&PaymentDetails, CheckoutError> {
        self.require(CheckoutStep::Step2Active, "edit")?;
        self.step = CheckoutStep::Step1Active;
        debug!(step = %self.step, "checkout reopened for editing");
        Ok(&self.details)
    }

    pub fn complete(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.require(CheckoutStep::Step2Active, "complete registration")?;
        self.step = CheckoutStep::Submitted;
        debug!(step = %self.step, "checkout submitted");
        Ok(self.step)
    }

    fn require(&self, expected: CheckoutStep, action: &'static str) -> Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                action,
                from: self.step,
            })
        }
    }
}
