//! Three-step rental request workflow
//!
//! A [`RentalWorkflow`] is bound to one rentable [`Equipment`] and owns its
//! [`RentalRequestDraft`] exclusively. It moves through
//! `RentalDetails -> ContactInfo -> Verification -> Submitting` and ends
//! either `Submitted` or `Cancelled`. A failed submission parks it in
//! `Failed`, which accepts the same actions as `Verification` so the user can
//! retry without re-entering anything.
//!
//! Nothing here performs I/O. Photo reads and the submission call are split
//! into `begin_*` / `complete_*` pairs; the caller awaits the actual work in
//! between and no other advance or submit is accepted meanwhile.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::estimate::{estimate_cost, CostEstimate};
use super::validation::{parse_date, validate_step, FieldErrors, FormStep};
use crate::models::{
    Availability, DeliveryOption, DraftEdit, DraftPatch, Equipment, NewRentalRequest, Photo, PhotoSlot,
    Receipt, RentalField, RentalPeriod, RentalRequestDraft,
};

/// Default cap on a single uploaded photo
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowLimits {
    pub max_photo_bytes: usize,
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
        }
    }
}

/// Where a workflow currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WorkflowState {
    RentalDetails,
    ContactInfo,
    Verification,
    Submitting,
    Submitted { receipt: Receipt },
    /// Submission failed; behaves like `Verification` with an error banner
    Failed { message: String },
    Cancelled,
}

impl WorkflowState {
    fn at(step: FormStep) -> Self {
        match step {
            FormStep::RentalDetails => WorkflowState::RentalDetails,
            FormStep::ContactInfo => WorkflowState::ContactInfo,
            FormStep::Verification => WorkflowState::Verification,
        }
    }

    /// Data-entry step shown to the user, if any
    pub fn step(&self) -> Option<FormStep> {
        match self {
            WorkflowState::RentalDetails => Some(FormStep::RentalDetails),
            WorkflowState::ContactInfo => Some(FormStep::ContactInfo),
            WorkflowState::Verification | WorkflowState::Failed { .. } => Some(FormStep::Verification),
            WorkflowState::Submitting | WorkflowState::Submitted { .. } | WorkflowState::Cancelled => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, WorkflowState::Submitted { .. } | WorkflowState::Cancelled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::RentalDetails => "rental details",
            WorkflowState::ContactInfo => "contact info",
            WorkflowState::Verification => "verification",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Submitted { .. } => "submitted",
            WorkflowState::Failed { .. } => "failed",
            WorkflowState::Cancelled => "cancelled",
        }
    }
}

/// Failure of the external submission operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("rental service unreachable: {0}")]
    Transport(String),

    #[error("rental request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("equipment {equipment_id} cannot be rented: {availability}")]
    EquipmentUnavailable {
        equipment_id: i64,
        availability: Availability,
    },

    #[error("{step:?} step has invalid fields: {errors}")]
    Invalid { step: FormStep, errors: FieldErrors },

    #[error("another operation on this rental request is still in progress")]
    Busy,

    #[error("rental request is already {0}")]
    Closed(&'static str),

    #[error("cannot {action} from {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("photo upload was superseded or abandoned")]
    StalePhotoRead,

    #[error("rental request draft is incomplete")]
    Incomplete,
}

/// Handle for one outstanding photo read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoTicket {
    pub slot: PhotoSlot,
    seq: u64,
}

/// Snapshot of a workflow for display
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub equipment_id: i64,
    pub equipment_name: String,
    #[schema(value_type = Object)]
    pub state: WorkflowState,
    /// Current data-entry step (1-3), absent once submitting or closed
    pub step: Option<u8>,
    #[schema(value_type = Object)]
    pub draft: RentalRequestDraft,
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
    pub estimate: Option<CostEstimate>,
    pub photo_upload_pending: bool,
}

#[derive(Debug)]
pub struct RentalWorkflow {
    equipment: Equipment,
    limits: WorkflowLimits,
    state: WorkflowState,
    draft: RentalRequestDraft,
    errors: FieldErrors,
    pending_reads: HashMap<PhotoSlot, u64>,
    next_ticket: u64,
}

impl RentalWorkflow {
    /// Open a fresh workflow. Only equipment that is available right now can
    /// be rented.
    pub fn open(equipment: Equipment, limits: WorkflowLimits) -> Result<Self, WorkflowError> {
        if !equipment.availability.is_rentable() {
            return Err(WorkflowError::EquipmentUnavailable {
                equipment_id: equipment.id,
                availability: equipment.availability,
            });
        }
        Ok(Self {
            equipment,
            limits,
            state: WorkflowState::RentalDetails,
            draft: RentalRequestDraft::default(),
            errors: FieldErrors::default(),
            pending_reads: HashMap::new(),
            next_ticket: 0,
        })
    }

    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn draft(&self) -> &RentalRequestDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn has_pending_reads(&self) -> bool {
        !self.pending_reads.is_empty()
    }

    fn interactive_step(&self) -> Result<FormStep, WorkflowError> {
        match &self.state {
            WorkflowState::Submitting => Err(WorkflowError::Busy),
            state if state.is_closed() => Err(WorkflowError::Closed(state.name())),
            state => state.step().ok_or(WorkflowError::Busy),
        }
    }

    fn invalid_transition(&self, action: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Change one draft field. Clears the pending error of that field.
    pub fn edit(&mut self, edit: DraftEdit) -> Result<(), WorkflowError> {
        self.interactive_step()?;
        if let Some(field) = edit.field() {
            self.errors.clear_field(field);
        }
        edit.apply(&mut self.draft);
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: DraftPatch) -> Result<(), WorkflowError> {
        self.interactive_step()?;
        for edit in patch.into_edits() {
            self.edit(edit)?;
        }
        Ok(())
    }

    /// Advance to the next step if the current one validates
    pub fn next(&mut self) -> Result<FormStep, WorkflowError> {
        let step = self.interactive_step()?;
        if self.has_pending_reads() {
            return Err(WorkflowError::Busy);
        }
        let next = step.next().ok_or_else(|| self.invalid_transition("advance"))?;

        let errors = validate_step(step, &self.draft);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WorkflowError::Invalid { step, errors });
        }

        self.errors.clear();
        self.state = WorkflowState::at(next);
        Ok(next)
    }

    /// Go back one step. Entered values are kept.
    pub fn back(&mut self) -> Result<FormStep, WorkflowError> {
        let step = self.interactive_step()?;
        let previous = step.previous().ok_or_else(|| self.invalid_transition("go back"))?;
        self.errors.clear();
        self.state = WorkflowState::at(previous);
        Ok(previous)
    }

    /// Discard the draft. Pending photo reads are orphaned and will be
    /// rejected if they complete later.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        self.interactive_step()?;
        self.draft = RentalRequestDraft::default();
        self.errors.clear();
        self.pending_reads.clear();
        self.state = WorkflowState::Cancelled;
        Ok(())
    }

    /// Start reading a photo into `slot`. A newer read on the same slot
    /// supersedes older ones.
    pub fn begin_photo_read(&mut self, slot: PhotoSlot) -> Result<PhotoTicket, WorkflowError> {
        self.interactive_step()?;
        self.next_ticket += 1;
        let seq = self.next_ticket;
        self.pending_reads.insert(slot, seq);
        Ok(PhotoTicket { slot, seq })
    }

    /// Store the photo read under `ticket`, unless it has been superseded or
    /// the workflow was cancelled meanwhile.
    pub fn complete_photo_read(&mut self, ticket: PhotoTicket, photo: Photo) -> Result<(), WorkflowError> {
        if self.state.is_closed() {
            return Err(WorkflowError::Closed(self.state.name()));
        }
        if self.pending_reads.get(&ticket.slot) != Some(&ticket.seq) {
            return Err(WorkflowError::StalePhotoRead);
        }
        self.pending_reads.remove(&ticket.slot);

        let field = RentalField::for_photo(ticket.slot);
        let problem = if !photo.is_image() {
            Some("Uploaded file must be an image".to_string())
        } else if photo.size() > self.limits.max_photo_bytes {
            Some(format!("Image must be at most {}", human_size(self.limits.max_photo_bytes)))
        } else {
            None
        };
        if let Some(message) = problem {
            let mut errors = FieldErrors::default();
            errors.insert(field, message.clone());
            self.errors.insert(field, message);
            return Err(WorkflowError::Invalid {
                step: FormStep::Verification,
                errors,
            });
        }

        self.errors.clear_field(field);
        self.draft.set_photo(ticket.slot, photo);
        Ok(())
    }

    /// Forget an outstanding read whose payload could not be obtained
    pub fn abandon_photo_read(&mut self, ticket: PhotoTicket) {
        if self.pending_reads.get(&ticket.slot) == Some(&ticket.seq) {
            self.pending_reads.remove(&ticket.slot);
        }
    }

    fn period(&self) -> Option<RentalPeriod> {
        let start_date = parse_date(&self.draft.rental_period.start_date)?;
        let end_date = parse_date(&self.draft.rental_period.end_date)?;
        (start_date <= end_date).then_some(RentalPeriod { start_date, end_date })
    }

    /// Advisory cost for the dates entered so far
    pub fn estimate(&self) -> Option<CostEstimate> {
        let period = self.period()?;
        estimate_cost(&self.equipment.rate, period.start_date, period.end_date)
    }

    /// Validate the final step and freeze the draft into a request. The
    /// workflow stays in `Submitting` until [`complete_submit`] is called.
    ///
    /// [`complete_submit`]: RentalWorkflow::complete_submit
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> Result<NewRentalRequest, WorkflowError> {
        let step = self.interactive_step()?;
        if step != FormStep::Verification {
            return Err(self.invalid_transition("submit"));
        }
        if self.has_pending_reads() {
            return Err(WorkflowError::Busy);
        }

        let errors = validate_step(FormStep::Verification, &self.draft);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WorkflowError::Invalid {
                step: FormStep::Verification,
                errors,
            });
        }
        // Earlier steps may have been edited after they were passed.
        for earlier in [FormStep::RentalDetails, FormStep::ContactInfo] {
            let errors = validate_step(earlier, &self.draft);
            if !errors.is_empty() {
                self.errors = errors.clone();
                return Err(WorkflowError::Invalid { step: earlier, errors });
            }
        }

        let request = self.finalize(now).ok_or(WorkflowError::Incomplete)?;
        self.errors.clear();
        self.state = WorkflowState::Submitting;
        Ok(request)
    }

    fn finalize(&self, now: DateTime<Utc>) -> Option<NewRentalRequest> {
        let rental_period = self.period()?;
        let estimate = self.estimate()?;
        let draft = &self.draft;
        let optional = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Some(NewRentalRequest {
            equipment_id: self.equipment.id,
            equipment_name: self.equipment.name.clone(),
            rental_period,
            purpose: draft.purpose.trim().to_string(),
            delivery_option: draft.delivery_option,
            delivery_address: match draft.delivery_option {
                DeliveryOption::Delivery => optional(&draft.delivery_address),
                DeliveryOption::Pickup => None,
            },
            contact: draft.contact.clone(),
            identity: draft.identity.clone(),
            additional_notes: optional(&draft.additional_notes),
            user_photo: draft.user_photo.clone()?,
            equipment_location_photo: draft.equipment_location_photo.clone()?,
            terms_accepted: draft.terms_accepted,
            estimate,
            submitted_at: now,
        })
    }

    /// Record the outcome of the submission started by `begin_submit`
    pub fn complete_submit(&mut self, outcome: Result<Receipt, SubmissionError>) -> Result<(), WorkflowError> {
        if self.state != WorkflowState::Submitting {
            return Err(self.invalid_transition("complete submission"));
        }
        self.state = match outcome {
            Ok(receipt) => WorkflowState::Submitted { receipt },
            Err(e) => WorkflowState::Failed { message: e.to_string() },
        };
        Ok(())
    }

    pub fn view(&self) -> WorkflowView {
        WorkflowView {
            equipment_id: self.equipment.id,
            equipment_name: self.equipment.name.clone(),
            state: self.state.clone(),
            step: self.state.step().map(FormStep::number),
            draft: self.draft.clone(),
            errors: self.errors.clone(),
            estimate: self.estimate(),
            photo_upload_pending: self.has_pending_reads(),
        }
    }
}

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
