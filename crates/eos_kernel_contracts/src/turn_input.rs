#![forbid(unsafe_code)]

use crate::questionnaire::{ChoiceId, QuestionId, Tag};
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Affirm,
    Deny,
}

/// Structured input event for one turn, produced upstream by the NLU
/// collaborator. The kernel never parses raw utterance text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnInput {
    /// The control is invoked with no user payload (first turn).
    Launch,
    /// A bare "yes"/"no"/deictic reference, optionally qualified with
    /// action/target tags ("how about the coughing?").
    GeneralReference {
        polarity: Option<Polarity>,
        action_tag: Option<Tag>,
        target_tag: Option<Tag>,
    },
    /// A slot-filling utterance already resolved to a concrete choice,
    /// optionally naming the question it answers.
    ExplicitChoice {
        question_ref: Option<QuestionId>,
        choice_id: ChoiceId,
    },
}

impl Validate for TurnInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            TurnInput::Launch => Ok(()),
            TurnInput::GeneralReference {
                polarity: _,
                action_tag,
                target_tag,
            } => {
                if let Some(t) = action_tag {
                    t.validate()?;
                }
                if let Some(t) = target_tag {
                    t.validate()?;
                }
                Ok(())
            }
            TurnInput::ExplicitChoice {
                question_ref,
                choice_id,
            } => {
                if let Some(q) = question_ref {
                    q.validate()?;
                }
                choice_id.validate()
            }
        }
    }
}
