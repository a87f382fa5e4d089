//! Rental request draft, finalized request and stored record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use utoipa::{IntoParams, ToSchema};

use super::enums::{DeliveryOption, IdType, PhotoSlot, RentalStatus};
use crate::rental::estimate::CostEstimate;

/// Form fields that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RentalField {
    StartDate,
    EndDate,
    Purpose,
    DeliveryAddress,
    ContactName,
    ContactPhone,
    ContactEmail,
    IdNumber,
    UserPhoto,
    EquipmentLocationPhoto,
    TermsAccepted,
}

impl RentalField {
    pub fn for_photo(slot: PhotoSlot) -> Self {
        match slot {
            PhotoSlot::User => RentalField::UserPhoto,
            PhotoSlot::EquipmentLocation => RentalField::EquipmentLocationPhoto,
        }
    }
}

/// Uploaded image kept as-is (no resizing or re-encoding)
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Photo {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.to_ascii_lowercase().starts_with("image/")
    }

    /// Hex SHA-256 of the payload, used as its storage key
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    pub fn to_ref(&self) -> PhotoRef {
        PhotoRef {
            content_type: self.content_type.clone(),
            size: self.size(),
            sha256: self.digest(),
        }
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

// Photos are never echoed back; clients only see what was attached.
impl Serialize for Photo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PhotoSummary {
            content_type: &self.content_type,
            size: self.size(),
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoSummary<'a> {
    content_type: &'a str,
    size: usize,
}

/// Reference to a photo handed off to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub content_type: String,
    pub size: usize,
    pub sha256: String,
}

/// Dates as typed by the user; parsed only when validated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id_type: IdType,
    pub id_number: String,
}

/// Mutable form state owned by one open workflow
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequestDraft {
    pub rental_period: DraftPeriod,
    pub purpose: String,
    pub delivery_option: DeliveryOption,
    pub delivery_address: String,
    pub contact: Contact,
    pub additional_notes: String,
    pub identity: Identity,
    pub user_photo: Option<Photo>,
    pub equipment_location_photo: Option<Photo>,
    pub terms_accepted: bool,
}

impl RentalRequestDraft {
    pub fn photo(&self, slot: PhotoSlot) -> Option<&Photo> {
        match slot {
            PhotoSlot::User => self.user_photo.as_ref(),
            PhotoSlot::EquipmentLocation => self.equipment_location_photo.as_ref(),
        }
    }

    pub(crate) fn set_photo(&mut self, slot: PhotoSlot, photo: Photo) {
        match slot {
            PhotoSlot::User => self.user_photo = Some(photo),
            PhotoSlot::EquipmentLocation => self.equipment_location_photo = Some(photo),
        }
    }
}

/// A single field change coming from the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    StartDate(String),
    EndDate(String),
    Purpose(String),
    DeliveryOption(DeliveryOption),
    DeliveryAddress(String),
    ContactName(String),
    ContactPhone(String),
    ContactEmail(String),
    AdditionalNotes(String),
    IdType(IdType),
    IdNumber(String),
    TermsAccepted(bool),
}

impl DraftEdit {
    /// Field whose pending error is cleared by this edit
    pub fn field(&self) -> Option<RentalField> {
        match self {
            DraftEdit::StartDate(_) => Some(RentalField::StartDate),
            DraftEdit::EndDate(_) => Some(RentalField::EndDate),
            DraftEdit::Purpose(_) => Some(RentalField::Purpose),
            DraftEdit::DeliveryOption(_) | DraftEdit::DeliveryAddress(_) => Some(RentalField::DeliveryAddress),
            DraftEdit::ContactName(_) => Some(RentalField::ContactName),
            DraftEdit::ContactPhone(_) => Some(RentalField::ContactPhone),
            DraftEdit::ContactEmail(_) => Some(RentalField::ContactEmail),
            DraftEdit::IdType(_) | DraftEdit::IdNumber(_) => Some(RentalField::IdNumber),
            DraftEdit::TermsAccepted(_) => Some(RentalField::TermsAccepted),
            DraftEdit::AdditionalNotes(_) => None,
        }
    }

    pub(crate) fn apply(self, draft: &mut RentalRequestDraft) {
        match self {
            DraftEdit::StartDate(v) => draft.rental_period.start_date = v,
            DraftEdit::EndDate(v) => draft.rental_period.end_date = v,
            DraftEdit::Purpose(v) => draft.purpose = v,
            DraftEdit::DeliveryOption(v) => draft.delivery_option = v,
            DraftEdit::DeliveryAddress(v) => draft.delivery_address = v,
            DraftEdit::ContactName(v) => draft.contact.name = v,
            DraftEdit::ContactPhone(v) => draft.contact.phone = v,
            DraftEdit::ContactEmail(v) => draft.contact.email = v,
            DraftEdit::AdditionalNotes(v) => draft.additional_notes = v,
            DraftEdit::IdType(v) => draft.identity.id_type = v,
            DraftEdit::IdNumber(v) => draft.identity.id_number = v,
            DraftEdit::TermsAccepted(v) => draft.terms_accepted = v,
        }
    }
}

/// Partial draft update; every present field becomes one [`DraftEdit`]
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub purpose: Option<String>,
    pub delivery_option: Option<DeliveryOption>,
    pub delivery_address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub additional_notes: Option<String>,
    pub id_type: Option<IdType>,
    pub id_number: Option<String>,
    pub terms_accepted: Option<bool>,
}

impl DraftPatch {
    pub fn into_edits(self) -> Vec<DraftEdit> {
        let mut edits = Vec::new();

        macro_rules! push_edit {
            ($field:expr, $variant:ident) => {
                if let Some(value) = $field {
                    edits.push(DraftEdit::$variant(value));
                }
            };
        }

        push_edit!(self.start_date, StartDate);
        push_edit!(self.end_date, EndDate);
        push_edit!(self.purpose, Purpose);
        push_edit!(self.delivery_option, DeliveryOption);
        push_edit!(self.delivery_address, DeliveryAddress);
        push_edit!(self.contact_name, ContactName);
        push_edit!(self.contact_phone, ContactPhone);
        push_edit!(self.contact_email, ContactEmail);
        push_edit!(self.additional_notes, AdditionalNotes);
        push_edit!(self.id_type, IdType);
        push_edit!(self.id_number, IdNumber);
        push_edit!(self.terms_accepted, TermsAccepted);

        edits
    }
}

/// Finalized request emitted by the workflow, before storage assigns an id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRentalRequest {
    pub equipment_id: i64,
    pub equipment_name: String,
    pub rental_period: RentalPeriod,
    pub purpose: String,
    pub delivery_option: DeliveryOption,
    pub delivery_address: Option<String>,
    pub contact: Contact,
    pub identity: Identity,
    pub additional_notes: Option<String>,
    pub user_photo: Photo,
    pub equipment_location_photo: Photo,
    pub terms_accepted: bool,
    /// Advisory only; the receiving system may price differently
    pub estimate: CostEstimate,
    pub submitted_at: DateTime<Utc>,
}

/// Stored rental request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub request_id: String,
    pub equipment_id: i64,
    pub equipment_name: String,
    pub rental_period: RentalPeriod,
    pub purpose: String,
    pub delivery_option: DeliveryOption,
    pub delivery_address: Option<String>,
    pub contact: Contact,
    pub identity: Identity,
    pub additional_notes: Option<String>,
    pub user_photo: PhotoRef,
    pub equipment_location_photo: PhotoRef,
    pub terms_accepted: bool,
    pub estimate: CostEstimate,
    pub status: RentalStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalRequest {
    pub fn from_new(request_id: String, new: &NewRentalRequest) -> Self {
        Self {
            request_id,
            equipment_id: new.equipment_id,
            equipment_name: new.equipment_name.clone(),
            rental_period: new.rental_period,
            purpose: new.purpose.clone(),
            delivery_option: new.delivery_option,
            delivery_address: new.delivery_address.clone(),
            contact: new.contact.clone(),
            identity: new.identity.clone(),
            additional_notes: new.additional_notes.clone(),
            user_photo: new.user_photo.to_ref(),
            equipment_location_photo: new.equipment_location_photo.to_ref(),
            terms_accepted: new.terms_accepted,
            estimate: new.estimate.clone(),
            status: RentalStatus::Pending,
            submitted_at: new.submitted_at,
            updated_at: new.submitted_at,
        }
    }

    pub fn photo(&self, slot: PhotoSlot) -> &PhotoRef {
        match slot {
            PhotoSlot::User => &self.user_photo,
            PhotoSlot::EquipmentLocation => &self.equipment_location_photo,
        }
    }

    pub fn receipt(&self) -> Receipt {
        Receipt {
            request_id: self.request_id.clone(),
            status: self.status,
        }
    }
}

/// Acknowledgement returned by the submission collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub request_id: String,
    pub status: RentalStatus,
}

/// Rental request list filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RentalQuery {
    pub equipment_id: Option<i64>,
    pub status: Option<RentalStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRentalStatus {
    pub status: RentalStatus,
}
