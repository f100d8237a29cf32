#![forbid(unsafe_code)]

use eos_kernel_contracts::act::{DialogAct, HandlerName};
use eos_kernel_contracts::questionnaire::{QuestionId, QuestionnaireModel};
use eos_kernel_contracts::state::ControlState;
use eos_kernel_contracts::turn_input::TurnInput;
use eos_kernel_contracts::{ContractViolation, ReasonCodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// No turn handler's guard matched. The caller may try a sibling
    /// control or fail the whole turn; never retried here.
    Unhandled,
    /// An apply step ran without a preceding successful resolution in the
    /// same turn. Control-implementation bug; must raise, never no-op.
    InconsistentInvocationOrder { phase: &'static str },
    /// An effect referenced a question absent from the current model:
    /// model/state desynchronization, fatal for the turn.
    UnknownQuestionReference { question_id: QuestionId },
    Contract(ContractViolation),
}

impl From<ContractViolation> for TurnError {
    fn from(v: ContractViolation) -> Self {
        TurnError::Contract(v)
    }
}

/// Did the completion-evaluation hook judge the answer set sufficient?
/// An insufficient verdict carries the hook's reason code and, optionally,
/// text a rendering collaborator may show for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    Sufficient,
    Insufficient {
        reason_code: ReasonCodeId,
        rendered_reason: Option<String>,
    },
}

/// Per-turn resolved configuration snapshot. The OS layer evaluates the
/// configuration hooks once per turn and hands the booleans down so every
/// guard in the turn sees the same values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPrefs {
    pub required: bool,
    pub answer_confirmation_required: bool,
    pub completion: CompletionStatus,
}

impl ControlPrefs {
    pub fn baseline_v1() -> Self {
        Self {
            required: true,
            answer_confirmation_required: false,
            completion: CompletionStatus::Sufficient,
        }
    }
}

/// Immutable snapshot a turn's guards and effects read. Guard evaluation
/// must never observe a state mutated mid-resolution, so the view borrows
/// and handlers return fresh state instead of mutating through it.
#[derive(Debug, Clone, Copy)]
pub struct TurnView<'a> {
    pub model: &'a QuestionnaireModel,
    pub state: &'a ControlState,
    pub prefs: &'a ControlPrefs,
}

/// Pure transition result: the successor state plus the acts emitted while
/// producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEffect {
    pub state: ControlState,
    pub acts: Vec<DialogAct>,
}

impl TurnEffect {
    pub fn state_only(state: ControlState) -> Self {
        Self {
            state,
            acts: Vec::new(),
        }
    }

    pub fn with_act(state: ControlState, act: DialogAct) -> Self {
        Self {
            state,
            acts: vec![act],
        }
    }

    pub fn emits_initiative(&self) -> bool {
        self.acts.iter().any(DialogAct::is_initiative)
    }
}

pub type TurnGuardFn = Box<dyn Fn(&TurnInput, &TurnView<'_>) -> bool>;
pub type TurnApplyFn = Box<dyn Fn(&TurnInput, &TurnView<'_>) -> Result<TurnEffect, TurnError>>;
pub type InitiativeGuardFn = Box<dyn Fn(&TurnView<'_>) -> bool>;
pub type InitiativeApplyFn = Box<dyn Fn(&TurnView<'_>) -> Result<TurnEffect, TurnError>>;

/// Ordered tagged record: name, guard, effect. Handlers are data, not
/// virtual dispatch, so the first-match policy stays a pure traversal.
pub struct TurnHandler {
    name: HandlerName,
    guard: TurnGuardFn,
    apply: TurnApplyFn,
}

impl TurnHandler {
    pub fn new(name: HandlerName, guard: TurnGuardFn, apply: TurnApplyFn) -> Self {
        Self { name, guard, apply }
    }

    pub fn name(&self) -> &HandlerName {
        &self.name
    }

    pub fn claims(&self, input: &TurnInput, view: &TurnView<'_>) -> bool {
        (self.guard)(input, view)
    }
}

pub struct InitiativeHandler {
    name: HandlerName,
    guard: InitiativeGuardFn,
    apply: InitiativeApplyFn,
}

impl InitiativeHandler {
    pub fn new(name: HandlerName, guard: InitiativeGuardFn, apply: InitiativeApplyFn) -> Self {
        Self { name, guard, apply }
    }

    pub fn name(&self) -> &HandlerName {
        &self.name
    }

    pub fn wants_to_initiate(&self, view: &TurnView<'_>) -> bool {
        (self.guard)(view)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPoint {
    TurnDispatch,
    InitiativeDispatch,
}

/// More than one guard matched at a decision point. Handlers within one
/// control are expected to be mutually exclusive by construction, so this
/// is a configuration anomaly: the first match stands and the operator
/// gets the full match list. Never surfaced to the end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityDiagnostic {
    pub decision_point: DecisionPoint,
    pub matched: Vec<HandlerName>,
}

/// Outcome of the guard phase, threading the selected handler explicitly
/// into the apply phase. No mutable selected-handler field survives
/// between the phases, so repeated resolution stays safe.
pub struct TurnResolution<'r> {
    selected: Option<&'r TurnHandler>,
    pub ambiguity: Option<AmbiguityDiagnostic>,
}

impl<'r> TurnResolution<'r> {
    pub fn is_match(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_name(&self) -> Option<&HandlerName> {
        self.selected.map(TurnHandler::name)
    }

    pub fn apply(
        &self,
        input: &TurnInput,
        view: &TurnView<'_>,
    ) -> Result<TurnEffect, TurnError> {
        match self.selected {
            Some(h) => (h.apply)(input, view),
            None => Err(TurnError::InconsistentInvocationOrder {
                phase: "turn_apply_without_resolved_handler",
            }),
        }
    }
}

pub struct InitiativeResolution<'r> {
    selected: Option<&'r InitiativeHandler>,
    pub ambiguity: Option<AmbiguityDiagnostic>,
}

impl<'r> InitiativeResolution<'r> {
    pub fn is_match(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_name(&self) -> Option<&HandlerName> {
        self.selected.map(InitiativeHandler::name)
    }

    pub fn apply(&self, view: &TurnView<'_>) -> Result<TurnEffect, TurnError> {
        match self.selected {
            Some(h) => (h.apply)(view),
            None => Err(TurnError::InconsistentInvocationOrder {
                phase: "initiative_apply_without_resolved_handler",
            }),
        }
    }
}

/// Two ordered guarded-handler lists: turn handlers and initiative
/// handlers. Standard handlers come first, caller-supplied custom handlers
/// after, in configuration order.
pub struct GuardedHandlerRegistry {
    turn_handlers: Vec<TurnHandler>,
    initiative_handlers: Vec<InitiativeHandler>,
}

impl GuardedHandlerRegistry {
    pub fn new(
        turn_handlers: Vec<TurnHandler>,
        initiative_handlers: Vec<InitiativeHandler>,
    ) -> Self {
        Self {
            turn_handlers,
            initiative_handlers,
        }
    }

    pub fn push_turn_handler(&mut self, handler: TurnHandler) {
        self.turn_handlers.push(handler);
    }

    pub fn push_initiative_handler(&mut self, handler: InitiativeHandler) {
        self.initiative_handlers.push(handler);
    }

    /// Evaluates every turn guard against the snapshot and returns the
    /// first match. Pure: effects run only when the caller applies the
    /// returned resolution.
    pub fn resolve<'r>(
        &'r self,
        input: &TurnInput,
        view: &TurnView<'_>,
    ) -> TurnResolution<'r> {
        let matched: Vec<&TurnHandler> = self
            .turn_handlers
            .iter()
            .filter(|h| h.claims(input, view))
            .collect();
        TurnResolution {
            selected: matched.first().copied(),
            ambiguity: ambiguity_of(
                DecisionPoint::TurnDispatch,
                matched.iter().map(|h| h.name().clone()),
            ),
        }
    }

    /// Identical first-match policy over the initiative-handler list.
    pub fn resolve_initiative<'r>(&'r self, view: &TurnView<'_>) -> InitiativeResolution<'r> {
        let matched: Vec<&InitiativeHandler> = self
            .initiative_handlers
            .iter()
            .filter(|h| h.wants_to_initiate(view))
            .collect();
        InitiativeResolution {
            selected: matched.first().copied(),
            ambiguity: ambiguity_of(
                DecisionPoint::InitiativeDispatch,
                matched.iter().map(|h| h.name().clone()),
            ),
        }
    }
}

fn ambiguity_of(
    decision_point: DecisionPoint,
    matched: impl Iterator<Item = HandlerName>,
) -> Option<AmbiguityDiagnostic> {
    let matched: Vec<HandlerName> = matched.collect();
    if matched.len() > 1 {
        Some(AmbiguityDiagnostic {
            decision_point,
            matched,
        })
    } else {
        None
    }
}
