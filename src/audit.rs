//! Structured audit events.
//!
//! Every rejection, every authentication attempt, and every infrastructure
//! failure is recorded as an [`AuditEvent`] on the `audit` tracing target.
//! Events hold only safe metadata: request id, endpoint, reason code, and
//! input length. Raw input and secrets never enter an event.

use std::fmt;

use crate::PolicyErrorKind;

/// Category of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    /// A sanitizer or policy refused request input.
    InputRejected,
    /// A login attempt.
    Authentication,
    /// A read of a protected resource (user rows, files).
    ResourceAccess,
    /// A write (registration).
    StateChange,
    /// An external program was run.
    ProcessExecution,
    /// A client was throttled.
    RateLimited,
    /// A server-side failure reached the redactor.
    InfrastructureFailure,
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventKind::InputRejected => write!(f, "input_rejected"),
            AuditEventKind::Authentication => write!(f, "authentication"),
            AuditEventKind::ResourceAccess => write!(f, "resource_access"),
            AuditEventKind::StateChange => write!(f, "state_change"),
            AuditEventKind::ProcessExecution => write!(f, "process_execution"),
            AuditEventKind::RateLimited => write!(f, "rate_limited"),
            AuditEventKind::InfrastructureFailure => write!(f, "infrastructure_failure"),
        }
    }
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Operation succeeded
    Success,
    /// Operation was refused by policy
    Denied,
    /// Operation failed
    Error,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Error => write!(f, "error"),
        }
    }
}

/// A structured audit record.
///
/// # Example
///
/// ```
/// use hardened_demo::audit::{AuditEvent, AuditEventKind, AuditOutcome};
/// use hardened_demo::PolicyErrorKind;
///
/// let event = AuditEvent::new("req-1", AuditEventKind::InputRejected, AuditOutcome::Denied)
///     .with_endpoint("/ping")
///     .with_code(PolicyErrorKind::InvalidHost)
///     .with_input_len(17);
///
/// assert_eq!(event.code(), Some(PolicyErrorKind::InvalidHost));
/// event.emit();
/// ```
#[derive(Debug, Clone)]
pub struct AuditEvent {
    request_id: String,
    kind: AuditEventKind,
    outcome: AuditOutcome,
    endpoint: Option<String>,
    code: Option<PolicyErrorKind>,
    // Must identify a row, never carry request text.
    subject_id: Option<i64>,
    input_len: Option<usize>,
    correlation_id: Option<String>,
}

impl AuditEvent {
    /// Creates an event with the required fields.
    pub fn new(request_id: impl Into<String>, kind: AuditEventKind, outcome: AuditOutcome) -> Self {
        Self {
            request_id: request_id.into(),
            kind,
            outcome,
            endpoint: None,
            code: None,
            subject_id: None,
            input_len: None,
            correlation_id: None,
        }
    }

    /// Sets the route path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the reason code.
    pub fn with_code(mut self, code: PolicyErrorKind) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the affected user id.
    pub fn with_subject_id(mut self, id: i64) -> Self {
        self.subject_id = Some(id);
        self
    }

    /// Sets the byte length of the offending input.
    pub fn with_input_len(mut self, len: usize) -> Self {
        self.input_len = Some(len);
        self
    }

    /// Links the event to a redacted 500 response.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the event kind.
    pub fn kind(&self) -> AuditEventKind {
        self.kind
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    /// Returns the endpoint, if set.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Returns the reason code, if set.
    pub fn code(&self) -> Option<PolicyErrorKind> {
        self.code
    }

    /// Returns the affected user id, if set.
    pub fn subject_id(&self) -> Option<i64> {
        self.subject_id
    }

    /// Returns the input length, if set.
    pub fn input_len(&self) -> Option<usize> {
        self.input_len
    }

    /// Returns the correlation id, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Writes the event to the `audit` tracing target.
    pub fn emit(&self) {
        let code = self.code.map(PolicyErrorKind::code);
        match self.outcome {
            AuditOutcome::Error => tracing::warn!(
                target: "audit",
                request_id = %self.request_id,
                kind = %self.kind,
                outcome = %self.outcome,
                endpoint = ?self.endpoint,
                code = ?code,
                correlation_id = ?self.correlation_id,
                "audit event"
            ),
            _ => tracing::info!(
                target: "audit",
                request_id = %self.request_id,
                kind = %self.kind,
                outcome = %self.outcome,
                endpoint = ?self.endpoint,
                code = ?code,
                subject_id = ?self.subject_id,
                input_len = ?self.input_len,
                "audit event"
            ),
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[kind={}, outcome={}, request_id={}",
            self.kind, self.outcome, self.request_id
        )?;

        if let Some(endpoint) = &self.endpoint {
            write!(f, ", endpoint={}", endpoint)?;
        }
        if let Some(code) = self.code {
            write!(f, ", code={}", code)?;
        }
        if let Some(id) = self.subject_id {
            write!(f, ", subject_id={}", id)?;
        }
        if let Some(len) = self.input_len {
            write!(f, ", input_len={}", len)?;
        }
        if let Some(id) = &self.correlation_id {
            write!(f, ", correlation_id={}", id)?;
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_outcome_display() {
        assert_eq!(AuditEventKind::InputRejected.to_string(), "input_rejected");
        assert_eq!(AuditEventKind::InfrastructureFailure.to_string(), "infrastructure_failure");
        assert_eq!(AuditOutcome::Denied.to_string(), "denied");
    }

    #[test]
    fn builder_sets_fields() {
        let event = AuditEvent::new("req-9", AuditEventKind::ResourceAccess, AuditOutcome::Success)
            .with_endpoint("/user")
            .with_subject_id(1)
            .with_input_len(1);

        assert_eq!(event.request_id(), "req-9");
        assert_eq!(event.endpoint(), Some("/user"));
        assert_eq!(event.subject_id(), Some(1));
        assert_eq!(event.input_len(), Some(1));
        assert!(event.code().is_none());
        assert!(event.correlation_id().is_none());
    }

    #[test]
    fn display_lists_only_set_fields() {
        let event = AuditEvent::new("req-1", AuditEventKind::InputRejected, AuditOutcome::Denied)
            .with_endpoint("/file")
            .with_code(PolicyErrorKind::PathEscape);

        assert_eq!(
            event.to_string(),
            "AuditEvent[kind=input_rejected, outcome=denied, request_id=req-1, endpoint=/file, code=PathEscape]"
        );
    }

    #[test]
    fn emit_does_not_panic() {
        AuditEvent::new("req-2", AuditEventKind::InfrastructureFailure, AuditOutcome::Error)
            .with_correlation_id("c-1")
            .emit();
        AuditEvent::new("req-3", AuditEventKind::Authentication, AuditOutcome::Denied).emit();
    }
}
