#![forbid(unsafe_code)]

use eos_kernel_contracts::act::{
    ConfirmAnswerAct, DialogAct, HandlerName, CONFIRM_ANSWER_INITIATIVE,
};
use eos_kernel_contracts::questionnaire::{ChoiceId, QuestionId};
use eos_kernel_contracts::state::Answer;
use eos_kernel_contracts::ContractViolation;

use crate::dispatch::{ControlPrefs, TurnEffect, TurnError, TurnView};
use crate::focus;

/// A recorded answer is read back to the user only when the control is
/// configured to confirm and the interpretation path was low-confidence.
pub fn confirmation_required(prefs: &ControlPrefs, at_risk: bool) -> bool {
    prefs.answer_confirmation_required && at_risk
}

/// Shared answer-update algorithm for every answer-recording handler.
///
/// Overwrites the entry, then either emits the confirmation request (which
/// is the turn's initiative act, so the generic initiative step must not
/// run afterwards) or consumes the outstanding ask and stays quiet,
/// leaving the next move to the generic initiative resolution.
pub fn record_answer(
    view: &TurnView<'_>,
    question_id: &QuestionId,
    choice_id: &ChoiceId,
    at_risk: bool,
) -> Result<TurnEffect, TurnError> {
    if view.model.question(question_id).is_none() {
        return Err(TurnError::UnknownQuestionReference {
            question_id: question_id.clone(),
        });
    }
    if !view.model.contains_choice(choice_id) {
        return Err(TurnError::Contract(ContractViolation::InvalidValue {
            field: "answer.choice_id",
            reason: "must be a member of questionnaire_model.choices",
        }));
    }

    let mut state = view.state.clone();
    state
        .answers
        .record(question_id.clone(), Answer::v1(choice_id.clone(), at_risk));

    if confirmation_required(view.prefs, at_risk) {
        focus::focus_on(
            &mut state.focus,
            question_id.clone(),
            HandlerName::builtin(CONFIRM_ANSWER_INITIATIVE),
        );
        let act = ConfirmAnswerAct::v1(question_id.clone(), choice_id.clone())?;
        return Ok(TurnEffect::with_act(state, DialogAct::ConfirmAnswer(act)));
    }

    focus::clear_active_initiative(&mut state.focus);
    Ok(TurnEffect::state_only(state))
}
