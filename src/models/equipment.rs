//! Equipment model and rate ingestion

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{Availability, EquipmentType, RateUnit};

/// Errors raised while turning a listing's rate text into a typed [`Rate`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateParseError {
    #[error("rate '{0}' contains no amount")]
    MissingAmount(String),

    #[error("rate '{0}' is not a valid amount")]
    InvalidAmount(String),

    #[error("unknown rate type '{0}'")]
    UnknownUnit(String),
}

/// Largest accepted rate amount, in rupees
pub const MAX_RATE_AMOUNT: i64 = 10_000_000;

/// Typed rental rate, e.g. 800 per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rate {
    pub amount: Decimal,
    pub unit: RateUnit,
}

impl Rate {
    pub fn new(amount: Decimal, unit: RateUnit) -> Self {
        Self { amount, unit }
    }

    /// Parse the display form used on listings: `("₹2,500", "per day")`.
    ///
    /// Currency symbols, separators and suffixes such as `/day` are dropped;
    /// only digits and a decimal point make up the amount.
    pub fn parse(rate: &str, rate_type: &str) -> Result<Self, RateParseError> {
        let digits: String = rate
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let digits = digits.trim_matches('.');
        if digits.is_empty() {
            return Err(RateParseError::MissingAmount(rate.to_string()));
        }
        let amount = Decimal::from_str(digits)
            .ok()
            .filter(|amount| *amount <= Decimal::from(MAX_RATE_AMOUNT))
            .ok_or_else(|| RateParseError::InvalidAmount(rate.to_string()))?;
        let unit = RateUnit::from_label(rate_type)
            .ok_or_else(|| RateParseError::UnknownUnit(rate_type.to_string()))?;
        Ok(Self { amount, unit })
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "₹{} {}", self.amount, self.unit)
    }
}

/// Equipment offered for rent by an FPO member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub equipment_type: EquipmentType,
    pub owner_name: String,
    pub location: String,
    pub rate: Rate,
    pub availability: Availability,
    pub description: String,
    pub features: Vec<String>,
    /// Average rating (0-5)
    pub rating: f32,
    pub reviews: u32,
    pub listed_at: Option<DateTime<Utc>>,
}

/// Catalog query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Matches name, owner or location (case-insensitive)
    pub search: Option<String>,
    /// Equipment type filter ("all" or absent for every type)
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
}

/// List equipment request (owner-facing listing form)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Equipment name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Equipment type is required"))]
    pub equipment_type: String,
    /// Rate as displayed, e.g. "₹800"
    #[validate(length(min = 1, message = "Rental rate is required"))]
    pub rate: String,
    /// "per hour", "per day", "per week" or "per month"
    #[serde(default = "default_rate_type")]
    pub rate_type: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    /// Availability label, defaults to "Available"
    pub availability: Option<String>,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "At least one feature is required"))]
    #[serde(default)]
    pub features: Vec<String>,
    #[validate(length(min = 1, message = "Owner name is required"))]
    pub owner_name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub contact_phone: String,
    #[validate(email(message = "Email is invalid"))]
    pub contact_email: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

fn default_rate_type() -> String {
    "per day".to_string()
}

impl CreateEquipment {
    /// Trim every text field and drop blank features before validation
    pub fn trimmed(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.equipment_type,
            &mut self.rate,
            &mut self.rate_type,
            &mut self.location,
            &mut self.description,
            &mut self.owner_name,
            &mut self.contact_phone,
            &mut self.contact_email,
        ] {
            *field = field.trim().to_string();
        }
        self.features = self
            .features
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }
}
