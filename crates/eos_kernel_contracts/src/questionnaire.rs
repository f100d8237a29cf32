#![forbid(unsafe_code)]

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::common::validate_id_str;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const QST_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Fallback tag carried by questions that declare no explicit target/action
/// tags. An NLU event with no qualifier matches any question; an event
/// qualified with this tag matches only generically-tagged questions.
pub const GENERIC_REFERENCE_TAG: &str = "generic_reference";

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for QuestionId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id_str("question_id", &self.0, 64)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChoiceId(String);

impl ChoiceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ChoiceId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id_str("choice_id", &self.0, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(tag.into());
        v.validate()?;
        Ok(v)
    }

    pub fn generic_reference() -> Self {
        Self(GENERIC_REFERENCE_TAG.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for Tag {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id_str("tag", &self.0, 64)
    }
}

/// One line-item of the questionnaire. Immutable once the model is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub target_tags: BTreeSet<Tag>,
    pub action_tags: BTreeSet<Tag>,
}

impl Question {
    /// Question with default (generic-reference) target and action tags.
    pub fn v1(id: QuestionId) -> Self {
        let generic: BTreeSet<Tag> = [Tag::generic_reference()].into_iter().collect();
        Self {
            id,
            target_tags: generic.clone(),
            action_tags: generic,
        }
    }

    /// Question with explicit tag sets. Empty sets fall back to the
    /// generic-reference tag so every question stays addressable.
    pub fn v1_tagged(
        id: QuestionId,
        target_tags: BTreeSet<Tag>,
        action_tags: BTreeSet<Tag>,
    ) -> Result<Self, ContractViolation> {
        let fill = |tags: BTreeSet<Tag>| {
            if tags.is_empty() {
                [Tag::generic_reference()].into_iter().collect()
            } else {
                tags
            }
        };
        let q = Self {
            id,
            target_tags: fill(target_tags),
            action_tags: fill(action_tags),
        };
        q.validate()?;
        Ok(q)
    }

    /// An absent qualifier always matches; a present one must be declared.
    pub fn matches_target(&self, tag: Option<&Tag>) -> bool {
        match tag {
            None => true,
            Some(t) => self.target_tags.contains(t),
        }
    }

    pub fn matches_action(&self, tag: Option<&Tag>) -> bool {
        match tag {
            None => true,
            Some(t) => self.action_tags.contains(t),
        }
    }
}

impl Validate for Question {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        for t in self.target_tags.iter().chain(self.action_tags.iter()) {
            t.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: ChoiceId,
}

impl Choice {
    pub fn v1(id: ChoiceId) -> Self {
        Self { id }
    }
}

/// Static questionnaire content. The choice set is shared: every question
/// accepts exactly the choices listed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireModel {
    pub schema_version: SchemaVersion,
    pub questions: Vec<Question>,
    pub choices: Vec<Choice>,
    pub implied_choice_for_affirm: Option<ChoiceId>,
    pub implied_choice_for_deny: Option<ChoiceId>,
}

impl QuestionnaireModel {
    pub fn v1(
        questions: Vec<Question>,
        choices: Vec<Choice>,
        implied_choice_for_affirm: Option<ChoiceId>,
        implied_choice_for_deny: Option<ChoiceId>,
    ) -> Result<Self, ContractViolation> {
        let m = Self {
            schema_version: QST_CONTRACT_VERSION,
            questions,
            choices,
            implied_choice_for_affirm,
            implied_choice_for_deny,
        };
        m.validate()?;
        Ok(m)
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn contains_choice(&self, id: &ChoiceId) -> bool {
        self.choices.iter().any(|c| &c.id == id)
    }

    /// Choice recorded for a bare affirmative: the configured mapping,
    /// else the last choice. None only on a hand-built empty choice list.
    pub fn implied_affirm_choice(&self) -> Option<&ChoiceId> {
        match &self.implied_choice_for_affirm {
            Some(c) => Some(c),
            None => self.choices.last().map(|c| &c.id),
        }
    }

    pub fn implied_deny_choice(&self) -> Option<&ChoiceId> {
        match &self.implied_choice_for_deny {
            Some(c) => Some(c),
            None => self.choices.last().map(|c| &c.id),
        }
    }
}

impl Validate for QuestionnaireModel {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != QST_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "questionnaire_model.schema_version",
                reason: "must match QST_CONTRACT_VERSION",
            });
        }
        if self.questions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "questionnaire_model.questions",
                reason: "must not be empty",
            });
        }
        if self.choices.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "questionnaire_model.choices",
                reason: "must not be empty",
            });
        }
        let mut question_ids = HashSet::new();
        for q in &self.questions {
            q.validate()?;
            if !question_ids.insert(&q.id) {
                return Err(ContractViolation::DuplicateValue {
                    field: "questionnaire_model.questions.id",
                });
            }
        }
        let mut choice_ids = HashSet::new();
        for c in &self.choices {
            c.id.validate()?;
            if !choice_ids.insert(&c.id) {
                return Err(ContractViolation::DuplicateValue {
                    field: "questionnaire_model.choices.id",
                });
            }
        }
        if let Some(c) = &self.implied_choice_for_affirm {
            if !self.contains_choice(c) {
                return Err(ContractViolation::InvalidValue {
                    field: "questionnaire_model.implied_choice_for_affirm",
                    reason: "must be a member of choices",
                });
            }
        }
        if let Some(c) = &self.implied_choice_for_deny {
            if !self.contains_choice(c) {
                return Err(ContractViolation::InvalidValue {
                    field: "questionnaire_model.implied_choice_for_deny",
                    reason: "must be a member of choices",
                });
            }
        }
        Ok(())
    }
}
