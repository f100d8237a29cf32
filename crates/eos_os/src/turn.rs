#![forbid(unsafe_code)]

use eos_engines::dispatch::{
    AmbiguityDiagnostic, CompletionStatus, ControlPrefs, GuardedHandlerRegistry,
    InitiativeHandler, TurnError, TurnHandler, TurnView,
};
use eos_engines::questionnaire::standard_registry;
use eos_kernel_contracts::act::DialogAct;
use eos_kernel_contracts::questionnaire::QuestionnaireModel;
use eos_kernel_contracts::state::ControlState;
use eos_kernel_contracts::turn_input::TurnInput;
use eos_kernel_contracts::{
    ContractViolation, CorrelationId, ReasonCodeId, TurnId, Validate,
};

use crate::audit::{reason_codes, AuditConfig, AuditEvent, AuditSeverity, AuditTrail};

/// Per-turn envelope threaded through configuration hooks and the audit
/// trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnContext {
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
}

impl TurnContext {
    pub fn v1(correlation_id: CorrelationId, turn_id: TurnId) -> Result<Self, ContractViolation> {
        let c = Self {
            correlation_id,
            turn_id,
        };
        c.validate()?;
        Ok(c)
    }
}

impl Validate for TurnContext {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.correlation_id.validate()?;
        self.turn_id.validate()
    }
}

pub type TurnPredicateFn = Box<dyn Fn(&TurnContext) -> bool>;
pub type CompletionEvalFn =
    Box<dyn Fn(&TurnContext, &QuestionnaireModel, &ControlState) -> CompletionStatus>;

/// Questionnaire content source: fixed, or derived from the turn context.
/// Either way it is read once per turn, so every handler in that turn sees
/// the same model.
pub enum ModelProvider {
    Static(QuestionnaireModel),
    PerTurn(Box<dyn Fn(&TurnContext) -> QuestionnaireModel>),
}

/// Caller overrides with named optional fields. Absent fields take the
/// documented defaults via `TurnConfig::from_patch`; there is no generic
/// recursive merge.
pub struct TurnConfigPatch {
    pub required: Option<TurnPredicateFn>,
    pub answer_confirmation_required: Option<TurnPredicateFn>,
    pub completion: Option<CompletionEvalFn>,
}

impl TurnConfigPatch {
    pub fn empty() -> Self {
        Self {
            required: None,
            answer_confirmation_required: None,
            completion: None,
        }
    }
}

pub struct TurnConfig {
    model_provider: ModelProvider,
    required: TurnPredicateFn,
    answer_confirmation_required: TurnPredicateFn,
    completion: CompletionEvalFn,
}

impl TurnConfig {
    pub fn baseline_v1(model_provider: ModelProvider) -> Self {
        Self::from_patch(model_provider, TurnConfigPatch::empty())
    }

    /// Explicit default filling: required defaults true, confirmation
    /// defaults false, completion defaults sufficient.
    pub fn from_patch(model_provider: ModelProvider, patch: TurnConfigPatch) -> Self {
        Self {
            model_provider,
            required: patch.required.unwrap_or_else(|| Box::new(|_| true)),
            answer_confirmation_required: patch
                .answer_confirmation_required
                .unwrap_or_else(|| Box::new(|_| false)),
            completion: patch
                .completion
                .unwrap_or_else(|| Box::new(|_, _, _| CompletionStatus::Sufficient)),
        }
    }

    pub fn model_for(&self, ctx: &TurnContext) -> QuestionnaireModel {
        match &self.model_provider {
            ModelProvider::Static(m) => m.clone(),
            ModelProvider::PerTurn(f) => f(ctx),
        }
    }

    pub fn required_for(&self, ctx: &TurnContext) -> bool {
        (self.required)(ctx)
    }

    pub fn confirmation_required_for(&self, ctx: &TurnContext) -> bool {
        (self.answer_confirmation_required)(ctx)
    }

    pub fn completion_for(
        &self,
        ctx: &TurnContext,
        model: &QuestionnaireModel,
        state: &ControlState,
    ) -> CompletionStatus {
        (self.completion)(ctx, model, state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub state: ControlState,
    pub acts: Vec<DialogAct>,
    pub audit: Vec<AuditEvent>,
}

/// Orchestrates one conversational turn: resolve the handler, apply its
/// effect, then decide and apply initiative. Processing is strictly
/// sequential; all state flows in and out through arguments.
pub struct TurnRuntime {
    config: TurnConfig,
    registry: GuardedHandlerRegistry,
    audit_config: AuditConfig,
}

impl TurnRuntime {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            registry: standard_registry(),
            audit_config: AuditConfig::mvp_v1(),
        }
    }

    /// Custom handlers resolve after the standard set, in the order added.
    pub fn with_custom_turn_handler(mut self, handler: TurnHandler) -> Self {
        self.registry.push_turn_handler(handler);
        self
    }

    pub fn with_custom_initiative_handler(mut self, handler: InitiativeHandler) -> Self {
        self.registry.push_initiative_handler(handler);
        self
    }

    pub fn process_turn(
        &self,
        ctx: &TurnContext,
        input: &TurnInput,
        state: &ControlState,
    ) -> Result<TurnOutcome, TurnError> {
        ctx.validate().map_err(TurnError::Contract)?;
        input.validate().map_err(TurnError::Contract)?;
        state.validate().map_err(TurnError::Contract)?;

        let model = self.config.model_for(ctx);
        model.validate().map_err(TurnError::Contract)?;
        let prefs = ControlPrefs {
            required: self.config.required_for(ctx),
            answer_confirmation_required: self.config.confirmation_required_for(ctx),
            completion: self.config.completion_for(ctx, &model, state),
        };

        let mut trail = AuditTrail::new(self.audit_config);
        if let CompletionStatus::Insufficient {
            reason_code,
            rendered_reason,
        } = &prefs.completion
        {
            trail.append(AuditEvent::v1(
                ctx.correlation_id,
                ctx.turn_id,
                AuditSeverity::Info,
                *reason_code,
                rendered_reason.clone(),
            )?)?;
        }

        let view = TurnView {
            model: &model,
            state,
            prefs: &prefs,
        };
        let resolution = self.registry.resolve(input, &view);
        if let Some(diagnostic) = &resolution.ambiguity {
            trail.append(ambiguity_event(
                ctx,
                reason_codes::TURN_AMBIGUOUS_TURN_MATCH,
                diagnostic,
            )?)?;
        }
        let Some(handler_name) = resolution.selected_name() else {
            return Err(TurnError::Unhandled);
        };
        trail.append(AuditEvent::v1(
            ctx.correlation_id,
            ctx.turn_id,
            AuditSeverity::Info,
            reason_codes::TURN_OK_HANDLER_RESOLVED,
            Some(handler_name.as_str().to_string()),
        )?)?;

        let reactive = resolution.apply(input, &view)?;
        let reactive_took_initiative = reactive.emits_initiative();
        let mut next_state = reactive.state;
        let mut acts = reactive.acts;

        // Initiative runs only once the reactive response is fully
        // computed, and only if that response did not already take it.
        if !reactive_took_initiative {
            let view = TurnView {
                model: &model,
                state: &next_state,
                prefs: &prefs,
            };
            let initiative = self.registry.resolve_initiative(&view);
            if let Some(diagnostic) = &initiative.ambiguity {
                trail.append(ambiguity_event(
                    ctx,
                    reason_codes::TURN_AMBIGUOUS_INITIATIVE_MATCH,
                    diagnostic,
                )?)?;
            }
            if let Some(initiative_name) = initiative.selected_name() {
                let detail = initiative_name.as_str().to_string();
                let effect = initiative.apply(&view)?;
                trail.append(AuditEvent::v1(
                    ctx.correlation_id,
                    ctx.turn_id,
                    AuditSeverity::Info,
                    reason_codes::TURN_OK_INITIATIVE_TAKEN,
                    Some(detail),
                )?)?;
                next_state = effect.state;
                acts.extend(effect.acts);
            }
        }

        if acts.iter().filter(|a| a.is_initiative()).count() > 1 {
            return Err(TurnError::Contract(ContractViolation::InvalidValue {
                field: "turn_outcome.acts",
                reason: "at most one initiative act per turn",
            }));
        }
        next_state.validate().map_err(TurnError::Contract)?;

        Ok(TurnOutcome {
            state: next_state,
            acts,
            audit: trail.into_events(),
        })
    }

    /// Explicit reset: fresh state, no acts, one audit row.
    pub fn reset(&self, ctx: &TurnContext) -> Result<TurnOutcome, TurnError> {
        ctx.validate().map_err(TurnError::Contract)?;
        let mut trail = AuditTrail::new(self.audit_config);
        trail.append(AuditEvent::v1(
            ctx.correlation_id,
            ctx.turn_id,
            AuditSeverity::Info,
            reason_codes::TURN_OK_STATE_RESET,
            None,
        )?)?;
        Ok(TurnOutcome {
            state: ControlState::empty_v1(),
            acts: Vec::new(),
            audit: trail.into_events(),
        })
    }
}

fn ambiguity_event(
    ctx: &TurnContext,
    reason_code: ReasonCodeId,
    diagnostic: &AmbiguityDiagnostic,
) -> Result<AuditEvent, ContractViolation> {
    let mut detail = diagnostic
        .matched
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(",");
    // Handler names are validated ASCII, so byte truncation is safe.
    detail.truncate(256);
    AuditEvent::v1(
        ctx.correlation_id,
        ctx.turn_id,
        AuditSeverity::Warn,
        reason_code,
        Some(detail),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_engines::answer::record_answer;
    use eos_engines::dispatch::TurnEffect;
    use eos_engines::focus::bare_answer_target;
    use eos_kernel_contracts::act::{HandlerName, ASK_QUESTION_INITIATIVE};
    use eos_kernel_contracts::questionnaire::{Choice, ChoiceId, Question, QuestionId};
    use eos_kernel_contracts::turn_input::Polarity;

    fn qid(s: &str) -> QuestionId {
        QuestionId::new(s).unwrap()
    }

    fn cid(s: &str) -> ChoiceId {
        ChoiceId::new(s).unwrap()
    }

    fn symptom_model() -> QuestionnaireModel {
        QuestionnaireModel::v1(
            vec![Question::v1(qid("cough")), Question::v1(qid("headache"))],
            vec![Choice::v1(cid("often")), Choice::v1(cid("rarely"))],
            None,
            None,
        )
        .unwrap()
    }

    fn runtime() -> TurnRuntime {
        TurnRuntime::new(TurnConfig::baseline_v1(ModelProvider::Static(
            symptom_model(),
        )))
    }

    fn ctx(turn: u64) -> TurnContext {
        TurnContext::v1(CorrelationId(9001), TurnId(turn)).unwrap()
    }

    fn affirm() -> TurnInput {
        TurnInput::GeneralReference {
            polarity: Some(Polarity::Affirm),
            action_tag: None,
            target_tag: None,
        }
    }

    fn deny() -> TurnInput {
        TurnInput::GeneralReference {
            polarity: Some(Polarity::Deny),
            action_tag: None,
            target_tag: None,
        }
    }

    fn asked_question(outcome: &TurnOutcome) -> Option<QuestionId> {
        outcome.acts.iter().find_map(|a| match a {
            DialogAct::AskQuestion(ask) => Some(ask.question_id.clone()),
            _ => None,
        })
    }

    fn initiative_count(outcome: &TurnOutcome) -> usize {
        outcome.acts.iter().filter(|a| a.is_initiative()).count()
    }

    #[test]
    fn at_turn_01_launch_asks_first_question() {
        let rt = runtime();
        let out = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        assert_eq!(asked_question(&out), Some(qid("cough")));
        assert_eq!(out.state.focus.focus_question_id, Some(qid("cough")));
        assert_eq!(
            out.state.focus.active_initiative,
            Some(HandlerName::builtin(ASK_QUESTION_INITIATIVE))
        );
    }

    #[test]
    fn at_turn_02_progression_reaches_second_question() {
        let rt = runtime();
        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt.process_turn(&ctx(2), &affirm(), &out1.state).unwrap();

        // Default implied affirm maps to the last choice.
        let answer = out2.state.answers.get(&qid("cough")).unwrap();
        assert_eq!(answer.choice_id, cid("rarely"));
        assert!(!answer.at_risk_of_misunderstanding);
        assert_eq!(asked_question(&out2), Some(qid("headache")));

        assert!(initiative_count(&out1) <= 1);
        assert!(initiative_count(&out2) <= 1);
    }

    #[test]
    fn at_turn_03_configured_implied_yes_mapping() {
        let model = QuestionnaireModel::v1(
            vec![Question::v1(qid("cough")), Question::v1(qid("headache"))],
            vec![Choice::v1(cid("often")), Choice::v1(cid("rarely"))],
            Some(cid("often")),
            None,
        )
        .unwrap();
        let rt = TurnRuntime::new(TurnConfig::baseline_v1(ModelProvider::Static(model)));
        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt.process_turn(&ctx(2), &affirm(), &out1.state).unwrap();
        let answer = out2.state.answers.get(&qid("cough")).unwrap();
        assert_eq!(answer.choice_id, cid("often"));
        assert!(!answer.at_risk_of_misunderstanding);
    }

    #[test]
    fn at_turn_04_default_implied_choice_is_last_choice() {
        let model = QuestionnaireModel::v1(
            vec![Question::v1(qid("q"))],
            vec![Choice::v1(cid("A")), Choice::v1(cid("B"))],
            None,
            None,
        )
        .unwrap();
        let rt = TurnRuntime::new(TurnConfig::baseline_v1(ModelProvider::Static(model)));
        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt.process_turn(&ctx(2), &affirm(), &out1.state).unwrap();
        assert_eq!(
            out2.state.answers.get(&qid("q")).unwrap().choice_id,
            cid("B")
        );
    }

    #[test]
    fn at_turn_05_not_required_and_unanswered_stays_silent() {
        let config = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: Some(Box::new(|_| false)),
                answer_confirmation_required: None,
                completion: None,
            },
        );
        let rt = TurnRuntime::new(config);
        let out = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        assert!(out.acts.is_empty());
        assert!(out.state.focus.focus_question_id.is_none());
    }

    #[test]
    fn at_turn_06_unfocused_bare_affirm_is_unhandled() {
        let rt = runtime();
        let err = rt
            .process_turn(&ctx(1), &affirm(), &ControlState::empty_v1())
            .unwrap_err();
        assert_eq!(err, TurnError::Unhandled);
    }

    fn fuzzy_choice_handler() -> TurnHandler {
        // Stand-in for a low-confidence interpretation path: claims an
        // unpolarized reference while a question is in focus and records
        // the implied choice flagged at risk.
        TurnHandler::new(
            HandlerName::builtin("FuzzyReference"),
            Box::new(|input, view| {
                matches!(
                    input,
                    TurnInput::GeneralReference {
                        polarity: None,
                        ..
                    }
                ) && bare_answer_target(view).is_some()
            }),
            Box::new(|_, view| {
                let question_id = match bare_answer_target(view) {
                    Some(q) => q.id.clone(),
                    None => {
                        return Err(TurnError::InconsistentInvocationOrder {
                            phase: "fuzzy_reference_apply_without_target",
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
                record_answer(view, &question_id, &choice_id, true)
            }),
        )
    }

    fn unpolarized() -> TurnInput {
        TurnInput::GeneralReference {
            polarity: None,
            action_tag: None,
            target_tag: None,
        }
    }

    #[test]
    fn at_turn_07_at_risk_answer_yields_single_confirm_act() {
        let config = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: None,
                answer_confirmation_required: Some(Box::new(|_| true)),
                completion: None,
            },
        );
        let rt = TurnRuntime::new(config).with_custom_turn_handler(fuzzy_choice_handler());

        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt
            .process_turn(&ctx(2), &unpolarized(), &out1.state)
            .unwrap();

        assert_eq!(out2.acts.len(), 1);
        match &out2.acts[0] {
            DialogAct::ConfirmAnswer(c) => {
                assert_eq!(c.question_id, qid("cough"));
                assert_eq!(c.choice_id, cid("rarely"));
            }
            other => panic!("expected confirm act, got: {other:?}"),
        }
        // The confirmation request was the turn's initiative; the generic
        // step must not have added an ask.
        assert_eq!(initiative_count(&out2), 1);
    }

    #[test]
    fn at_turn_08_confirm_affirm_clears_risk_and_advances() {
        let config = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: None,
                answer_confirmation_required: Some(Box::new(|_| true)),
                completion: None,
            },
        );
        let rt = TurnRuntime::new(config).with_custom_turn_handler(fuzzy_choice_handler());

        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt
            .process_turn(&ctx(2), &unpolarized(), &out1.state)
            .unwrap();
        let out3 = rt.process_turn(&ctx(3), &affirm(), &out2.state).unwrap();

        let answer = out3.state.answers.get(&qid("cough")).unwrap();
        assert!(!answer.at_risk_of_misunderstanding);
        assert_eq!(asked_question(&out3), Some(qid("headache")));
    }

    #[test]
    fn at_turn_09_disconfirm_re_asks_the_same_question() {
        let config = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: None,
                answer_confirmation_required: Some(Box::new(|_| true)),
                completion: None,
            },
        );
        let rt = TurnRuntime::new(config).with_custom_turn_handler(fuzzy_choice_handler());

        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt
            .process_turn(&ctx(2), &unpolarized(), &out1.state)
            .unwrap();
        let out3 = rt.process_turn(&ctx(3), &deny(), &out2.state).unwrap();

        assert!(!out3.state.answers.contains(&qid("cough")));
        assert_eq!(asked_question(&out3), Some(qid("cough")));
    }

    #[test]
    fn at_turn_10_custom_deny_handler_extension_point() {
        let deny_handler = TurnHandler::new(
            HandlerName::builtin("DenyFocusedQuestion"),
            Box::new(|input, view| {
                matches!(
                    input,
                    TurnInput::GeneralReference {
                        polarity: Some(Polarity::Deny),
                        ..
                    }
                ) && bare_answer_target(view).is_some()
            }),
            Box::new(|_, view| {
                let question_id = match bare_answer_target(view) {
                    Some(q) => q.id.clone(),
                    None => {
                        return Err(TurnError::InconsistentInvocationOrder {
                            phase: "deny_focused_apply_without_target",
                        })
                    }
                };
                let choice_id = view
                    .model
                    .implied_deny_choice()
                    .ok_or(ContractViolation::InvalidValue {
                        field: "questionnaire_model.choices",
                        reason: "must not be empty",
                    })?
                    .clone();
                record_answer(view, &question_id, &choice_id, true)
            }),
        );
        let model = QuestionnaireModel::v1(
            vec![Question::v1(qid("cough")), Question::v1(qid("headache"))],
            vec![Choice::v1(cid("often")), Choice::v1(cid("rarely"))],
            Some(cid("often")),
            Some(cid("rarely")),
        )
        .unwrap();
        let rt = TurnRuntime::new(TurnConfig::baseline_v1(ModelProvider::Static(model)))
            .with_custom_turn_handler(deny_handler);

        let out1 = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        let out2 = rt.process_turn(&ctx(2), &deny(), &out1.state).unwrap();
        let answer = out2.state.answers.get(&qid("cough")).unwrap();
        assert_eq!(answer.choice_id, cid("rarely"));
        assert!(answer.at_risk_of_misunderstanding);
        assert_eq!(asked_question(&out2), Some(qid("headache")));
    }

    #[test]
    fn at_turn_11_overlapping_custom_handler_is_diagnosed_not_fatal() {
        let shadow = TurnHandler::new(
            HandlerName::builtin("LaunchShadow"),
            Box::new(|input, _| matches!(input, TurnInput::Launch)),
            Box::new(|_, view| Ok(TurnEffect::state_only(view.state.clone()))),
        );
        let rt = runtime().with_custom_turn_handler(shadow);
        let out = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();

        // First match (the standard launch handler) still drove the turn.
        assert_eq!(asked_question(&out), Some(qid("cough")));
        let warning = out
            .audit
            .iter()
            .find(|e| e.reason_code == reason_codes::TURN_AMBIGUOUS_TURN_MATCH)
            .expect("ambiguity must be audited");
        assert_eq!(warning.severity, AuditSeverity::Warn);
        let detail = warning.detail.as_deref().unwrap();
        assert!(detail.contains("Launch"));
        assert!(detail.contains("LaunchShadow"));
    }

    #[test]
    fn at_turn_12_re_answer_overwrites_and_is_idempotent_in_value() {
        let rt = runtime();
        let state = ControlState::empty_v1();
        let first = TurnInput::ExplicitChoice {
            question_ref: Some(qid("cough")),
            choice_id: cid("often"),
        };
        let out1 = rt.process_turn(&ctx(1), &first, &state).unwrap();
        let out2 = rt.process_turn(&ctx(2), &first, &out1.state).unwrap();
        assert_eq!(out1.state.answers, out2.state.answers);

        let corrected = TurnInput::ExplicitChoice {
            question_ref: Some(qid("cough")),
            choice_id: cid("rarely"),
        };
        let out3 = rt.process_turn(&ctx(3), &corrected, &out2.state).unwrap();
        assert_eq!(
            out3.state.answers.get(&qid("cough")).unwrap().choice_id,
            cid("rarely")
        );
        assert_eq!(out3.state.answers.len(), 1);
    }

    #[test]
    fn at_turn_13_completion_hook_keeps_the_control_talking() {
        let config = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: None,
                answer_confirmation_required: None,
                completion: Some(Box::new(|_, _, state| {
                    // Demand a re-pass until some answer is not at risk.
                    if state.answers.iter().any(|(_, a)| !a.at_risk_of_misunderstanding) {
                        CompletionStatus::Sufficient
                    } else {
                        CompletionStatus::Insufficient {
                            reason_code: ReasonCodeId(0x5400_00FA),
                            rendered_reason: Some("needs a confirmed symptom".to_string()),
                        }
                    }
                })),
            },
        );
        let rt = TurnRuntime::new(config);
        let out = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        assert_eq!(asked_question(&out), Some(qid("cough")));
    }

    #[test]
    fn at_turn_14_per_turn_model_provider_is_read_once() {
        let provider = ModelProvider::PerTurn(Box::new(|ctx| {
            let name = if ctx.turn_id.0 % 2 == 1 { "odd" } else { "even" };
            QuestionnaireModel::v1(
                vec![Question::v1(QuestionId::new(name).unwrap())],
                vec![Choice::v1(ChoiceId::new("yes").unwrap())],
                None,
                None,
            )
            .unwrap()
        }));
        let rt = TurnRuntime::new(TurnConfig::baseline_v1(provider));
        let out = rt
            .process_turn(&ctx(1), &TurnInput::Launch, &ControlState::empty_v1())
            .unwrap();
        assert_eq!(asked_question(&out), Some(qid("odd")));
    }

    #[test]
    fn at_turn_15_reset_returns_fresh_state_with_audit_row() {
        let rt = runtime();
        let out = rt.reset(&ctx(5)).unwrap();
        assert_eq!(out.state, ControlState::empty_v1());
        assert!(out.acts.is_empty());
        assert_eq!(out.audit.len(), 1);
        assert_eq!(
            out.audit[0].reason_code,
            reason_codes::TURN_OK_STATE_RESET
        );
    }

    #[test]
    fn at_turn_16_config_defaults_fill_field_by_field() {
        let config = TurnConfig::baseline_v1(ModelProvider::Static(symptom_model()));
        let c = ctx(1);
        assert!(config.required_for(&c));
        assert!(!config.confirmation_required_for(&c));
        assert_eq!(
            config.completion_for(&c, &symptom_model(), &ControlState::empty_v1()),
            CompletionStatus::Sufficient
        );

        let overridden = TurnConfig::from_patch(
            ModelProvider::Static(symptom_model()),
            TurnConfigPatch {
                required: Some(Box::new(|_| false)),
                answer_confirmation_required: None,
                completion: None,
            },
        );
        assert!(!overridden.required_for(&c));
        // Untouched fields keep their defaults.
        assert!(!overridden.confirmation_required_for(&c));
    }

    #[test]
    fn at_turn_17_turn_context_rejects_zero_ids() {
        assert!(TurnContext::v1(CorrelationId(0), TurnId(1)).is_err());
        assert!(TurnContext::v1(CorrelationId(1), TurnId(0)).is_err());
    }
}
