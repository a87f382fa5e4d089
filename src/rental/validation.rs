//! Step-scoped validation rules for the rental request form
//!
//! Each form step owns a static table of [`FieldRule`]s. Validating a step
//! walks its table only; fields of later steps are never looked at. For each
//! field the first failing rule produces that field's message.

use chrono::NaiveDate;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DeliveryOption, IdType, PhotoSlot, RentalField, RentalRequestDraft};

/// Date format accepted for the rental period
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static INDIAN_MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[6-9]\d{9}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").unwrap());
static AADHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{12}$").unwrap());
static PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static VOTER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}[0-9]{7}$").unwrap());
static RATION_CARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{8,12}$").unwrap());

/// The three data-entry steps of the rental form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FormStep {
    RentalDetails = 1,
    ContactInfo = 2,
    Verification = 3,
}

impl FormStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<FormStep> {
        match self {
            FormStep::RentalDetails => Some(FormStep::ContactInfo),
            FormStep::ContactInfo => Some(FormStep::Verification),
            FormStep::Verification => None,
        }
    }

    pub fn previous(self) -> Option<FormStep> {
        match self {
            FormStep::RentalDetails => None,
            FormStep::ContactInfo => Some(FormStep::RentalDetails),
            FormStep::Verification => Some(FormStep::ContactInfo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    IndianMobile,
    Email,
}

impl Pattern {
    pub fn is_match(self, value: &str) -> bool {
        match self {
            Pattern::IndianMobile => INDIAN_MOBILE.is_match(value),
            Pattern::Email => EMAIL.is_match(value),
        }
    }
}

/// A single check applied to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Non-empty after trimming
    Required,
    /// Parses as a calendar date
    Date,
    /// End date is not before the start date (checked only once both parse)
    NotBeforeStart,
    /// Non-empty when delivery was chosen
    RequiredForDelivery,
    Matches(Pattern),
    /// Matches the format of the selected identity document
    IdNumberFormat,
    PhotoPresent(PhotoSlot),
    Accepted,
}

#[derive(Debug)]
pub struct FieldRule {
    pub field: RentalField,
    pub rules: &'static [Rule],
}

static RENTAL_DETAILS_RULES: &[FieldRule] = &[
    FieldRule {
        field: RentalField::StartDate,
        rules: &[Rule::Required, Rule::Date],
    },
    FieldRule {
        field: RentalField::EndDate,
        rules: &[Rule::Required, Rule::Date, Rule::NotBeforeStart],
    },
    FieldRule {
        field: RentalField::Purpose,
        rules: &[Rule::Required],
    },
    FieldRule {
        field: RentalField::DeliveryAddress,
        rules: &[Rule::RequiredForDelivery],
    },
];

static CONTACT_INFO_RULES: &[FieldRule] = &[
    FieldRule {
        field: RentalField::ContactName,
        rules: &[Rule::Required],
    },
    FieldRule {
        field: RentalField::ContactPhone,
        rules: &[Rule::Required, Rule::Matches(Pattern::IndianMobile)],
    },
    FieldRule {
        field: RentalField::ContactEmail,
        rules: &[Rule::Required, Rule::Matches(Pattern::Email)],
    },
];

static VERIFICATION_RULES: &[FieldRule] = &[
    FieldRule {
        field: RentalField::IdNumber,
        rules: &[Rule::IdNumberFormat],
    },
    FieldRule {
        field: RentalField::UserPhoto,
        rules: &[Rule::PhotoPresent(PhotoSlot::User)],
    },
    FieldRule {
        field: RentalField::EquipmentLocationPhoto,
        rules: &[Rule::PhotoPresent(PhotoSlot::EquipmentLocation)],
    },
    FieldRule {
        field: RentalField::TermsAccepted,
        rules: &[Rule::Accepted],
    },
];

/// Rule table of one step
pub fn rules_for(step: FormStep) -> &'static [FieldRule] {
    match step {
        FormStep::RentalDetails => RENTAL_DETAILS_RULES,
        FormStep::ContactInfo => CONTACT_INFO_RULES,
        FormStep::Verification => VERIFICATION_RULES,
    }
}

/// Field-level error messages, in rule-table order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<RentalField, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: RentalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: RentalField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn insert(&mut self, field: RentalField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear_field(&mut self, field: RentalField) {
        self.0.shift_remove(&field);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RentalField, &String)> {
        self.0.iter()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        write!(f, "{}", messages.join("; "))
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn is_valid_phone(value: &str) -> bool {
    Pattern::IndianMobile.is_match(value)
}

pub fn is_valid_id_number(id_type: IdType, value: &str) -> bool {
    if value.trim().is_empty() {
        return false;
    }
    match id_type {
        IdType::Aadhar => AADHAR.is_match(value),
        IdType::Pan => PAN.is_match(value),
        IdType::VoterId => VOTER_ID.is_match(value),
        IdType::RationCard => RATION_CARD.is_match(value),
    }
}

/// Validate the fields owned by `step`
pub fn validate_step(step: FormStep, draft: &RentalRequestDraft) -> FieldErrors {
    let mut errors = FieldErrors::default();
    for field_rule in rules_for(step) {
        if let Some(message) = field_rule
            .rules
            .iter()
            .find_map(|rule| check(field_rule.field, *rule, draft))
        {
            errors.insert(field_rule.field, message);
        }
    }
    errors
}

fn text(field: RentalField, draft: &RentalRequestDraft) -> &str {
    match field {
        RentalField::StartDate => &draft.rental_period.start_date,
        RentalField::EndDate => &draft.rental_period.end_date,
        RentalField::Purpose => &draft.purpose,
        RentalField::DeliveryAddress => &draft.delivery_address,
        RentalField::ContactName => &draft.contact.name,
        RentalField::ContactPhone => &draft.contact.phone,
        RentalField::ContactEmail => &draft.contact.email,
        RentalField::IdNumber => &draft.identity.id_number,
        RentalField::UserPhoto | RentalField::EquipmentLocationPhoto | RentalField::TermsAccepted => "",
    }
}

fn label(field: RentalField) -> &'static str {
    match field {
        RentalField::StartDate => "Start date",
        RentalField::EndDate => "End date",
        RentalField::Purpose => "Purpose",
        RentalField::DeliveryAddress => "Delivery address",
        RentalField::ContactName => "Name",
        RentalField::ContactPhone => "Phone number",
        RentalField::ContactEmail => "Email",
        RentalField::IdNumber => "ID number",
        RentalField::UserPhoto => "Photo",
        RentalField::EquipmentLocationPhoto => "Equipment location photo",
        RentalField::TermsAccepted => "Terms",
    }
}

/// Returns the error message when `rule` fails for `field`
fn check(field: RentalField, rule: Rule, draft: &RentalRequestDraft) -> Option<String> {
    let value = text(field, draft);
    let failed = match rule {
        Rule::Required => value.trim().is_empty(),
        Rule::Date => parse_date(value).is_none(),
        Rule::NotBeforeStart => {
            match (
                parse_date(&draft.rental_period.start_date),
                parse_date(&draft.rental_period.end_date),
            ) {
                (Some(start), Some(end)) => end < start,
                _ => false,
            }
        }
        Rule::RequiredForDelivery => {
            draft.delivery_option == DeliveryOption::Delivery && value.trim().is_empty()
        }
        Rule::Matches(pattern) => !pattern.is_match(value),
        Rule::IdNumberFormat => !is_valid_id_number(draft.identity.id_type, value),
        Rule::PhotoPresent(slot) => draft.photo(slot).is_none(),
        Rule::Accepted => !draft.terms_accepted,
    };
    if !failed {
        return None;
    }

    let message = match rule {
        Rule::Required | Rule::RequiredForDelivery => format!("{} is required", label(field)),
        Rule::Date => format!("{} is not a valid date", label(field)),
        Rule::NotBeforeStart => "End date must not be before start date".to_string(),
        Rule::Matches(Pattern::IndianMobile) => "Enter a valid 10-digit Indian mobile number".to_string(),
        Rule::Matches(Pattern::Email) => "Email is invalid".to_string(),
        Rule::IdNumberFormat => format!("Enter a valid {} number", draft.identity.id_type),
        Rule::PhotoPresent(PhotoSlot::User) => "Please upload your photo for verification".to_string(),
        Rule::PhotoPresent(PhotoSlot::EquipmentLocation) => {
            "Please upload a photo of the equipment location".to_string()
        }
        Rule::Accepted => "You must accept the terms and conditions".to_string(),
    };
    Some(message)
}
