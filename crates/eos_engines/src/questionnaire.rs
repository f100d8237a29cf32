#![forbid(unsafe_code)]

use eos_kernel_contracts::act::{
    AskQuestionAct, DialogAct, HandlerName, AFFIRM_FOCUSED_HANDLER, ASK_QUESTION_INITIATIVE,
    CONFIRM_AFFIRMED_HANDLER, CONFIRM_DENIED_HANDLER, EXPLICIT_CHOICE_HANDLER, LAUNCH_HANDLER,
};
use eos_kernel_contracts::questionnaire::{Question, QuestionnaireModel};
use eos_kernel_contracts::state::{Answer, AnswerStore};
use eos_kernel_contracts::turn_input::{Polarity, TurnInput};
use eos_kernel_contracts::ContractViolation;

use crate::answer;
use crate::dispatch::{
    CompletionStatus, GuardedHandlerRegistry, InitiativeHandler, TurnEffect, TurnError,
    TurnHandler, TurnView,
};
use crate::focus;

/// Earliest question in model order without a recorded answer.
pub fn next_unanswered<'a>(
    model: &'a QuestionnaireModel,
    answers: &AnswerStore,
) -> Option<&'a Question> {
    model.questions.iter().find(|q| !answers.contains(&q.id))
}

fn launch_guard(input: &TurnInput, _view: &TurnView<'_>) -> bool {
    matches!(input, TurnInput::Launch)
}

fn launch_apply(_input: &TurnInput, view: &TurnView<'_>) -> Result<TurnEffect, TurnError> {
    // Nothing to react to; the initiative step decides whether to speak.
    Ok(TurnEffect::state_only(view.state.clone()))
}

fn affirm_focused_guard(input: &TurnInput, view: &TurnView<'_>) -> bool {
    let Some(question) = focus::bare_answer_target(view) else {
        return false;
    };
    match input {
        TurnInput::GeneralReference {
            polarity,
            action_tag,
            target_tag,
        } => {
            *polarity == Some(Polarity::Affirm)
                && question.matches_action(action_tag.as_ref())
                && question.matches_target(target_tag.as_ref())
        }
        _ => false,
    }
}

fn affirm_focused_apply(
    _input: &TurnInput,
    view: &TurnView<'_>,
) -> Result<TurnEffect, TurnError> {
    let question_id = match focus::bare_answer_target(view) {
        Some(q) => q.id.clone(),
        None => {
            return Err(TurnError::InconsistentInvocationOrder {
                phase: "affirm_focused_apply_without_bare_answer_target",
            })
        }
    };
    let choice_id = view
        .model
        .implied_affirm_choice()
        .ok_or(ContractViolation::InvalidValue {
            field: "questionnaire_model.choices",
            reason: "must not be empty",
        })?
        .clone();
    answer::record_answer(view, &question_id, &choice_id, false)
}

fn explicit_choice_guard(input: &TurnInput, view: &TurnView<'_>) -> bool {
    match input {
        TurnInput::ExplicitChoice {
            question_ref,
            choice_id,
        } => {
            if !view.model.contains_choice(choice_id) {
                return false;
            }
            match question_ref {
                Some(id) => view.model.question(id).is_some(),
                None => view
                    .state
                    .focus
                    .focus_question_id
                    .as_ref()
                    .is_some_and(|id| view.model.question(id).is_some()),
            }
        }
        _ => false,
    }
}

fn explicit_choice_apply(
    input: &TurnInput,
    view: &TurnView<'_>,
) -> Result<TurnEffect, TurnError> {
    match input {
        TurnInput::ExplicitChoice {
            question_ref,
            choice_id,
        } => {
            let question_id = match question_ref {
                Some(id) => id.clone(),
                None => view.state.focus.focus_question_id.clone().ok_or(
                    TurnError::InconsistentInvocationOrder {
                        phase: "explicit_choice_apply_without_focus",
                    },
                )?,
            };
            answer::record_answer(view, &question_id, choice_id, false)
        }
        _ => Err(TurnError::InconsistentInvocationOrder {
            phase: "explicit_choice_apply_on_foreign_input",
        }),
    }
}

fn confirm_polarity_guard(input: &TurnInput, view: &TurnView<'_>, wanted: Polarity) -> bool {
    let Some((question, _)) = focus::confirmation_target(view) else {
        return false;
    };
    match input {
        TurnInput::GeneralReference {
            polarity,
            action_tag,
            target_tag,
        } => {
            *polarity == Some(wanted)
                && question.matches_action(action_tag.as_ref())
                && question.matches_target(target_tag.as_ref())
        }
        _ => false,
    }
}

fn confirm_affirmed_apply(
    _input: &TurnInput,
    view: &TurnView<'_>,
) -> Result<TurnEffect, TurnError> {
    let (question_id, choice_id) = match focus::confirmation_target(view) {
        Some((q, a)) => (q.id.clone(), a.choice_id.clone()),
        None => {
            return Err(TurnError::InconsistentInvocationOrder {
                phase: "confirm_affirmed_apply_without_confirmation_target",
            })
        }
    };
    let mut state = view.state.clone();
    // The read-back stands: the answer is no longer at risk.
    state
        .answers
        .record(question_id, Answer::v1(choice_id, false));
    focus::clear_active_initiative(&mut state.focus);
    Ok(TurnEffect::state_only(state))
}

fn confirm_denied_apply(
    _input: &TurnInput,
    view: &TurnView<'_>,
) -> Result<TurnEffect, TurnError> {
    let question_id = match focus::confirmation_target(view) {
        Some((q, _)) => q.id.clone(),
        None => {
            return Err(TurnError::InconsistentInvocationOrder {
                phase: "confirm_denied_apply_without_confirmation_target",
            })
        }
    };
    let mut state = view.state.clone();
    // Disconfirmed: the question reverts to unanswered and the next
    // initiative re-asks it. A correcting explicit choice overwrites
    // directly instead of passing through here.
    state.answers.remove(&question_id);
    focus::clear_active_initiative(&mut state.focus);
    Ok(TurnEffect::state_only(state))
}

fn ask_question_guard(view: &TurnView<'_>) -> bool {
    if view.state.answers.is_empty() && !view.prefs.required {
        return false;
    }
    next_unanswered(view.model, &view.state.answers).is_some()
        || matches!(
            view.prefs.completion,
            CompletionStatus::Insufficient { .. }
        )
}

fn ask_question_apply(view: &TurnView<'_>) -> Result<TurnEffect, TurnError> {
    let question = match next_unanswered(view.model, &view.state.answers) {
        Some(q) => q,
        // All answered but the completion hook still wants more: start over
        // at the first question.
        None => view
            .model
            .questions
            .first()
            .ok_or(ContractViolation::InvalidValue {
                field: "questionnaire_model.questions",
                reason: "must not be empty",
            })?,
    };
    let mut state = view.state.clone();
    focus::focus_on(
        &mut state.focus,
        question.id.clone(),
        HandlerName::builtin(ASK_QUESTION_INITIATIVE),
    );
    let act = AskQuestionAct::v1(
        view.model.clone(),
        state.answers.clone(),
        question.id.clone(),
    )?;
    Ok(TurnEffect::with_act(state, DialogAct::AskQuestion(act)))
}

/// The standard turn handlers, in resolution order. Deny-polarity direct
/// answers are deliberately absent: callers wire their own handler when
/// they want that path.
pub fn standard_turn_handlers() -> Vec<TurnHandler> {
    vec![
        TurnHandler::new(
            HandlerName::builtin(LAUNCH_HANDLER),
            Box::new(launch_guard),
            Box::new(launch_apply),
        ),
        TurnHandler::new(
            HandlerName::builtin(AFFIRM_FOCUSED_HANDLER),
            Box::new(affirm_focused_guard),
            Box::new(affirm_focused_apply),
        ),
        TurnHandler::new(
            HandlerName::builtin(EXPLICIT_CHOICE_HANDLER),
            Box::new(explicit_choice_guard),
            Box::new(explicit_choice_apply),
        ),
        TurnHandler::new(
            HandlerName::builtin(CONFIRM_AFFIRMED_HANDLER),
            Box::new(|input, view| confirm_polarity_guard(input, view, Polarity::Affirm)),
            Box::new(confirm_affirmed_apply),
        ),
        TurnHandler::new(
            HandlerName::builtin(CONFIRM_DENIED_HANDLER),
            Box::new(|input, view| confirm_polarity_guard(input, view, Polarity::Deny)),
            Box::new(confirm_denied_apply),
        ),
    ]
}

pub fn standard_initiative_handlers() -> Vec<InitiativeHandler> {
    vec![InitiativeHandler::new(
        HandlerName::builtin(ASK_QUESTION_INITIATIVE),
        Box::new(ask_question_guard),
        Box::new(ask_question_apply),
    )]
}

pub fn standard_registry() -> GuardedHandlerRegistry {
    GuardedHandlerRegistry::new(standard_turn_handlers(), standard_initiative_handlers())
}
