//! Shared domain enums for the rental portal

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// RateUnit
// ---------------------------------------------------------------------------

/// Billing unit of an equipment rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl RateUnit {
    /// Parse a rate type as written on listings ("daily", "per day", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        let normalized = normalized.strip_prefix("per ").unwrap_or(&normalized).trim();
        match normalized {
            "hourly" | "hour" | "hr" => Some(RateUnit::Hourly),
            "daily" | "day" => Some(RateUnit::Daily),
            "weekly" | "week" => Some(RateUnit::Weekly),
            "monthly" | "month" => Some(RateUnit::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for RateUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RateUnit::Hourly => "per hour",
            RateUnit::Daily => "per day",
            RateUnit::Weekly => "per week",
            RateUnit::Monthly => "per month",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Whether a piece of equipment can be rented right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    Available,
    Booked,
    LimitedAvailability,
}

impl Availability {
    /// Map a free-form availability label ("Booked until 15 July") to the enum.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        if normalized == "available" {
            Availability::Available
        } else if normalized.starts_with("limited") {
            Availability::LimitedAvailability
        } else {
            // "Booked until ...", "Available from <date>" and unknown labels
            Availability::Booked
        }
    }

    pub fn is_rentable(self) -> bool {
        self == Availability::Available
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Availability::Available => "Available",
            Availability::Booked => "Booked",
            Availability::LimitedAvailability => "Limited Availability",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// EquipmentType
// ---------------------------------------------------------------------------

/// Equipment category used for catalog filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EquipmentType {
    Tractor,
    Implement,
    Harvester,
    Irrigation,
    Other,
}

impl std::str::FromStr for EquipmentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tractor" => Ok(EquipmentType::Tractor),
            "implement" => Ok(EquipmentType::Implement),
            "harvester" => Ok(EquipmentType::Harvester),
            "irrigation" => Ok(EquipmentType::Irrigation),
            "other" => Ok(EquipmentType::Other),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryOption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    #[default]
    Pickup,
    Delivery,
}

// ---------------------------------------------------------------------------
// IdType
// ---------------------------------------------------------------------------

/// Identity document presented for verification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum IdType {
    #[default]
    Aadhar,
    Pan,
    VoterId,
    RationCard,
}

impl std::fmt::Display for IdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IdType::Aadhar => "Aadhar",
            IdType::Pan => "PAN",
            IdType::VoterId => "Voter ID",
            IdType::RationCard => "Ration Card",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// RentalStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a submitted rental request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RentalStatus {
    pub fn can_transition_to(self, next: RentalStatus) -> bool {
        matches!(
            (self, next),
            (RentalStatus::Pending, RentalStatus::Approved)
                | (RentalStatus::Pending, RentalStatus::Rejected)
                | (RentalStatus::Approved, RentalStatus::Completed)
        )
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Approved => "approved",
            RentalStatus::Rejected => "rejected",
            RentalStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// PhotoSlot
// ---------------------------------------------------------------------------

/// The two verification photos a rental request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoSlot {
    User,
    EquipmentLocation,
}

impl std::fmt::Display for PhotoSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhotoSlot::User => write!(f, "user"),
            PhotoSlot::EquipmentLocation => write!(f, "equipment-location"),
        }
    }
}

impl std::str::FromStr for PhotoSlot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(PhotoSlot::User),
            "equipment-location" => Ok(PhotoSlot::EquipmentLocation),
            _ => Err(()),
        }
    }
}
