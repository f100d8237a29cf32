#![forbid(unsafe_code)]

use eos_kernel_contracts::act::{
    HandlerName, ASK_QUESTION_INITIATIVE, CONFIRM_ANSWER_INITIATIVE,
};
use eos_kernel_contracts::questionnaire::{Question, QuestionId};
use eos_kernel_contracts::state::{Answer, FocusState};

use crate::dispatch::TurnView;

pub fn focus_on(focus: &mut FocusState, question_id: QuestionId, initiative: HandlerName) {
    focus.focus_question_id = Some(question_id);
    focus.active_initiative = Some(initiative);
}

/// The outstanding ask is consumed; focus stays on the question until the
/// next initiative act moves it.
pub fn clear_active_initiative(focus: &mut FocusState) {
    focus.active_initiative = None;
}

/// The question a bare affirmative/negative applies to. Some only while
/// the ask-question initiative is outstanding and the focused question is
/// still a member of the model; otherwise the event is uninterpretable
/// and guards must decline.
pub fn bare_answer_target<'a>(view: &TurnView<'a>) -> Option<&'a Question> {
    if view.state.focus.active_initiative
        != Some(HandlerName::builtin(ASK_QUESTION_INITIATIVE))
    {
        return None;
    }
    let question_id = view.state.focus.focus_question_id.as_ref()?;
    view.model.question(question_id)
}

/// The question/answer pair an outstanding confirmation refers to.
pub fn confirmation_target<'a>(view: &TurnView<'a>) -> Option<(&'a Question, &'a Answer)> {
    if view.state.focus.active_initiative
        != Some(HandlerName::builtin(CONFIRM_ANSWER_INITIATIVE))
    {
        return None;
    }
    let question_id = view.state.focus.focus_question_id.as_ref()?;
    let question = view.model.question(question_id)?;
    let answer = view.state.answers.get(question_id)?;
    Some((question, answer))
}
