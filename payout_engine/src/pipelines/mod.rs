//! # Guided flows
//!
//! Two cooperating state machines act on the same requests:
//!
//! * [`SubmissionFlow`] walks a submitter through filing a payout request.
//! * [`ValuationFlow`] walks an admin through pricing, rejecting or settling one.
//!
//! Both are driven one input at a time. Each input is classified into an [`InputCategory`], mapped to an [`Action`]
//! by the [`transition`] table for the current [`crate::sessions::Step`], and carried out against the repository.
//!
//! Result handling is the same for both flows:
//! * bad input is an `Ok(Outcome::Reprompt)` and the session stays where it was,
//! * a failed business rule is an `Err(FlowError::Precondition)` and the session ends,
//! * a storage failure is an `Err(FlowError::Storage)` and the session is left untouched so the input can be retried.
use log::*;

mod outcome;
mod submission;
mod transition;
mod validation;
mod valuation;

pub use outcome::{Completion, FlowError, Outcome, Prompt, ValidationError};
pub use submission::SubmissionFlow;
pub use transition::{transition, Action, InputCategory, Payload};
pub use validation::ValidationRules;
pub use valuation::ValuationFlow;

use crate::sessions::SessionGuard;

/// Ends the session if the action failed a precondition.
fn end_on_precondition(slot: &mut SessionGuard, result: Result<Outcome, FlowError>) -> Result<Outcome, FlowError> {
    if let Err(FlowError::Precondition(e)) = &result {
        debug!("💬️ Ending session. {e}");
        slot.end();
    }
    result
}

/// Leaves the flow in response to a cancel or "return to main" input.
fn abandon(slot: &mut SessionGuard, payload: &Payload) -> Outcome {
    slot.end();
    match payload {
        Payload::ReturnToMain => Outcome::ReturnedToMain,
        _ => Outcome::Cancelled,
    }
}
