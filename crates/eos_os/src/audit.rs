#![forbid(unsafe_code)]

use eos_kernel_contracts::{
    ContractViolation, CorrelationId, ReasonCodeId, SchemaVersion, TurnId, Validate,
};

pub const AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub mod reason_codes {
    use eos_kernel_contracts::ReasonCodeId;

    // Turn-runtime reason-code namespace. Values are placeholders until the
    // global registry is formalized.
    pub const TURN_OK_HANDLER_RESOLVED: ReasonCodeId = ReasonCodeId(0x5400_0001);
    pub const TURN_OK_INITIATIVE_TAKEN: ReasonCodeId = ReasonCodeId(0x5400_0002);
    pub const TURN_OK_STATE_RESET: ReasonCodeId = ReasonCodeId(0x5400_0003);
    pub const TURN_AMBIGUOUS_TURN_MATCH: ReasonCodeId = ReasonCodeId(0x5400_00F1);
    pub const TURN_AMBIGUOUS_INITIATIVE_MATCH: ReasonCodeId = ReasonCodeId(0x5400_00F2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSeverity {
    Info,
    Warn,
}

/// One operator-facing diagnostic row. Ambiguous-match anomalies land here
/// as Warn events; nothing in this trail is ever shown to the end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub turn_id: TurnId,
    pub severity: AuditSeverity,
    pub reason_code: ReasonCodeId,
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn v1(
        correlation_id: CorrelationId,
        turn_id: TurnId,
        severity: AuditSeverity,
        reason_code: ReasonCodeId,
        detail: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let e = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            correlation_id,
            turn_id,
            severity,
            reason_code,
            detail,
        };
        e.validate()?;
        Ok(e)
    }
}

impl Validate for AuditEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AUDIT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.schema_version",
                reason: "must match AUDIT_CONTRACT_VERSION",
            });
        }
        self.correlation_id.validate()?;
        self.turn_id.validate()?;
        if self.reason_code == ReasonCodeId(0) {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.reason_code",
                reason: "must be non-zero",
            });
        }
        if let Some(d) = &self.detail {
            if d.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_event.detail",
                    reason: "must not be empty",
                });
            }
            if d.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_event.detail",
                    reason: "must be <= 256 chars",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditConfig {
    pub max_events: usize,
}

impl AuditConfig {
    pub fn mvp_v1() -> Self {
        Self { max_events: 64 }
    }
}

/// Bounded per-turn append-only trail, drained into the turn outcome.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    config: AuditConfig,
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
        }
    }

    pub fn append(&mut self, event: AuditEvent) -> Result<(), ContractViolation> {
        event.validate()?;
        if self.events.len() >= self.config.max_events {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail.events",
                reason: "max_events exceeded",
            });
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<AuditEvent> {
        self.events
    }
}
