//! Equipment rental request workflow: step validation, cost estimate and the
//! state machine tying them together.

pub mod estimate;
pub mod validation;
pub mod workflow;

pub use estimate::{estimate_cost, CostEstimate};
pub use validation::{validate_step, FieldErrors, FormStep};
pub use workflow::{
    PhotoTicket, RentalWorkflow, SubmissionError, WorkflowError, WorkflowLimits, WorkflowState, WorkflowView,
};
