#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_id_str;
use crate::questionnaire::{ChoiceId, QuestionId, QuestionnaireModel};
use crate::state::AnswerStore;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const ACT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

// Builtin handler names. Custom handlers pick their own.
pub const LAUNCH_HANDLER: &str = "Launch";
pub const AFFIRM_FOCUSED_HANDLER: &str = "AffirmFocusedQuestion";
pub const EXPLICIT_CHOICE_HANDLER: &str = "ExplicitChoice";
pub const CONFIRM_AFFIRMED_HANDLER: &str = "ConfirmAnswerAffirmed";
pub const CONFIRM_DENIED_HANDLER: &str = "ConfirmAnswerDenied";
pub const ASK_QUESTION_INITIATIVE: &str = "AskQuestion";
pub const CONFIRM_ANSWER_INITIATIVE: &str = "ConfirmAnswer";

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HandlerName(String);

impl HandlerName {
    pub fn new(name: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(name.into());
        v.validate()?;
        Ok(v)
    }

    /// Infallible constructor for the builtin name constants above.
    pub fn builtin(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for HandlerName {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id_str("handler_name", &self.0, 64)
    }
}

/// Prompt for one question. Carries the full questionnaire content and
/// answer state so the rendering collaborator can produce prompt text and
/// visuals without consulting the kernel again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskQuestionAct {
    pub schema_version: SchemaVersion,
    pub questionnaire: QuestionnaireModel,
    pub answers: AnswerStore,
    pub question_id: QuestionId,
}

impl AskQuestionAct {
    pub fn v1(
        questionnaire: QuestionnaireModel,
        answers: AnswerStore,
        question_id: QuestionId,
    ) -> Result<Self, ContractViolation> {
        let a = Self {
            schema_version: ACT_CONTRACT_VERSION,
            questionnaire,
            answers,
            question_id,
        };
        a.validate()?;
        Ok(a)
    }
}

impl Validate for AskQuestionAct {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ACT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "ask_question_act.schema_version",
                reason: "must match ACT_CONTRACT_VERSION",
            });
        }
        self.questionnaire.validate()?;
        self.answers.validate()?;
        if self.questionnaire.question(&self.question_id).is_none() {
            return Err(ContractViolation::InvalidValue {
                field: "ask_question_act.question_id",
                reason: "must be a member of questionnaire.questions",
            });
        }
        Ok(())
    }
}

/// Read-back request for an answer recorded through a low-confidence path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmAnswerAct {
    pub schema_version: SchemaVersion,
    pub question_id: QuestionId,
    pub choice_id: ChoiceId,
}

impl ConfirmAnswerAct {
    pub fn v1(question_id: QuestionId, choice_id: ChoiceId) -> Result<Self, ContractViolation> {
        let a = Self {
            schema_version: ACT_CONTRACT_VERSION,
            question_id,
            choice_id,
        };
        a.validate()?;
        Ok(a)
    }
}

impl Validate for ConfirmAnswerAct {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ACT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "confirm_answer_act.schema_version",
                reason: "must match ACT_CONTRACT_VERSION",
            });
        }
        self.question_id.validate()?;
        self.choice_id.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAct {
    AskQuestion(AskQuestionAct),
    ConfirmAnswer(ConfirmAnswerAct),
}

impl DialogAct {
    /// Proactive, forward-driving acts, as opposed to reactive
    /// acknowledgments. The turn runtime uses this to enforce the
    /// at-most-one-initiative guarantee.
    pub fn is_initiative(&self) -> bool {
        match self {
            DialogAct::AskQuestion(_) | DialogAct::ConfirmAnswer(_) => true,
        }
    }

    pub fn initiative_name(&self) -> HandlerName {
        match self {
            DialogAct::AskQuestion(_) => HandlerName::builtin(ASK_QUESTION_INITIATIVE),
            DialogAct::ConfirmAnswer(_) => HandlerName::builtin(CONFIRM_ANSWER_INITIATIVE),
        }
    }
}

impl Validate for DialogAct {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            DialogAct::AskQuestion(a) => a.validate(),
            DialogAct::ConfirmAnswer(a) => a.validate(),
        }
    }
}
