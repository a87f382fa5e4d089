//! Data models for the rental portal

pub mod enums;
pub mod equipment;
pub mod rental;

// Re-export commonly used types
pub use enums::{Availability, DeliveryOption, EquipmentType, IdType, PhotoSlot, RateUnit, RentalStatus};
pub use equipment::{CreateEquipment, Equipment, EquipmentQuery, Rate, RateParseError};
pub use rental::{
    Contact, DraftEdit, DraftPatch, Identity, NewRentalRequest, Photo, PhotoRef, Receipt, RentalField,
    RentalPeriod, RentalRequest, RentalRequestDraft,
};
