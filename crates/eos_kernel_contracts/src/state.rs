#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::act::HandlerName;
use crate::questionnaire::{ChoiceId, QuestionId};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const STATE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Recorded answer for one question. Overwritten on re-answer, never
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub choice_id: ChoiceId,
    /// Set when the interpretation used a low-confidence inference path
    /// (implied-yes mapping, fuzzy match) rather than an explicit choice.
    pub at_risk_of_misunderstanding: bool,
}

impl Answer {
    pub fn v1(choice_id: ChoiceId, at_risk_of_misunderstanding: bool) -> Self {
        Self {
            choice_id,
            at_risk_of_misunderstanding,
        }
    }
}

impl Validate for Answer {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.choice_id.validate()
    }
}

/// Per-instance map of question to recorded answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerStore {
    entries: BTreeMap<QuestionId, Answer>,
}

impl AnswerStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question_id: QuestionId, answer: Answer) {
        self.entries.insert(question_id, answer);
    }

    pub fn remove(&mut self, question_id: &QuestionId) -> Option<Answer> {
        self.entries.remove(question_id)
    }

    pub fn get(&self, question_id: &QuestionId) -> Option<&Answer> {
        self.entries.get(question_id)
    }

    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.entries.contains_key(question_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Answer)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Validate for AnswerStore {
    fn validate(&self) -> Result<(), ContractViolation> {
        for (q, a) in &self.entries {
            q.validate()?;
            a.validate()?;
        }
        Ok(())
    }
}

/// Which question an unqualified answer applies to, and which initiative
/// act is outstanding. A bare affirmative/negative is only interpretable
/// while `active_initiative` names the ask-question initiative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusState {
    pub focus_question_id: Option<QuestionId>,
    pub active_initiative: Option<HandlerName>,
}

impl FocusState {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Validate for FocusState {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(q) = &self.focus_question_id {
            q.validate()?;
        }
        if let Some(h) = &self.active_initiative {
            h.validate()?;
        }
        Ok(())
    }
}

/// The control instance's whole serializable state. The surrounding
/// session runtime persists this between turns; nothing else survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub schema_version: SchemaVersion,
    pub answers: AnswerStore,
    pub focus: FocusState,
}

impl ControlState {
    pub fn empty_v1() -> Self {
        Self {
            schema_version: STATE_CONTRACT_VERSION,
            answers: AnswerStore::empty(),
            focus: FocusState::empty(),
        }
    }

    pub fn reset(&mut self) {
        self.answers.clear();
        self.focus = FocusState::empty();
    }
}

impl Validate for ControlState {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != STATE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "control_state.schema_version",
                reason: "must match STATE_CONTRACT_VERSION",
            });
        }
        self.answers.validate()?;
        self.focus.validate()
    }
}
