use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::quote::QuoteStatus;
use crate::flows::states::{QuoteOperation, TransitionOutcome, TransitionTarget};

/// Guarded transition table for the quote lifecycle. Stateless: the current
/// status always comes from the stored quote.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuoteLifecycle;

impl QuoteLifecycle {
    pub fn initial_state(&self) -> QuoteStatus {
        QuoteStatus::Draft
    }

    pub fn transition(
        &self,
        current: QuoteStatus,
        operation: QuoteOperation,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_quote(current, operation)
    }

    /// Operations that would succeed from `current`, in declaration order.
    pub fn allowed_operations(&self, current: QuoteStatus) -> Vec<QuoteOperation> {
        QuoteOperation::ALL
            .into_iter()
            .filter(|operation| transition_quote(current, *operation).is_ok())
            .collect()
    }

    pub async fn apply_with_audit<S>(
        &self,
        current: QuoteStatus,
        operation: QuoteOperation,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.transition(current, operation);
        let event = match &result {
            Ok(outcome) => AuditEvent::new(
                audit,
                "flow.transition_applied",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("from", outcome.from.as_str())
            .with_metadata("to", outcome.to.to_string())
            .with_metadata("operation", operation.as_str()),
            Err(error) => AuditEvent::new(
                audit,
                "flow.transition_rejected",
                AuditCategory::Flow,
                AuditOutcome::Rejected,
            )
            .with_metadata("operation", operation.as_str())
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event).await;
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("cannot {operation} a quote in status {state}; requires {}", required_states(.operation))]
    InvalidTransition { state: QuoteStatus, operation: QuoteOperation },
}

/// Human-readable precondition for an operation, used in guard messages.
pub fn required_states(operation: &QuoteOperation) -> &'static str {
    match operation {
        QuoteOperation::Update | QuoteOperation::Remove | QuoteOperation::Send => "DRAFT",
        QuoteOperation::Approve | QuoteOperation::Reject => "SENT",
        QuoteOperation::Convert => "APPROVED",
        QuoteOperation::Cancel => "any status except CONVERTED",
    }
}

fn transition_quote(
    current: QuoteStatus,
    operation: QuoteOperation,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use QuoteOperation::{Approve, Cancel, Convert, Reject, Remove, Send, Update};
    use QuoteStatus::{Approved, Cancelled, Converted, Draft, Rejected, Sent};

    let to = match (current, operation) {
        (Draft, Update) => TransitionTarget::Status(Draft),
        (Draft, Remove) => TransitionTarget::Deleted,
        (Draft, Send) => TransitionTarget::Status(Sent),
        (Sent, Approve) => TransitionTarget::Status(Approved),
        (Sent, Reject) => TransitionTarget::Status(Rejected),
        (Approved, Convert) => TransitionTarget::Status(Converted),
        (Converted, Cancel) => {
            return Err(FlowTransitionError::InvalidTransition { state: current, operation });
        }
        (_, Cancel) => TransitionTarget::Status(Cancelled),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: current, operation });
        }
    };

    Ok(TransitionOutcome { from: current, to, operation })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::quote::{QuoteId, QuoteStatus};
    use crate::domain::tenant::TenantId;
    use crate::flows::engine::{FlowTransitionError, QuoteLifecycle};
    use crate::flows::states::{QuoteOperation, TransitionTarget};

    #[test]
    fn happy_path_reaches_converted() {
        let lifecycle = QuoteLifecycle;
        let mut state = lifecycle.initial_state();

        for operation in [QuoteOperation::Send, QuoteOperation::Approve, QuoteOperation::Convert] {
            let outcome = lifecycle.transition(state, operation).expect("happy path");
            state = outcome.to.status().expect("status target");
        }

        assert_eq!(state, QuoteStatus::Converted);
        assert!(lifecycle.allowed_operations(state).is_empty());
    }

    #[test]
    fn only_drafts_can_be_updated_or_removed() {
        let lifecycle = QuoteLifecycle;
        assert_eq!(
            lifecycle.transition(QuoteStatus::Draft, QuoteOperation::Remove).expect("remove").to,
            TransitionTarget::Deleted
        );

        for status in QuoteStatus::ALL.into_iter().filter(|status| *status != QuoteStatus::Draft)
        {
            assert!(lifecycle.transition(status, QuoteOperation::Update).is_err());
            assert!(lifecycle.transition(status, QuoteOperation::Remove).is_err());
        }
    }

    #[test]
    fn cancel_is_blocked_only_for_converted() {
        let lifecycle = QuoteLifecycle;
        for status in QuoteStatus::ALL {
            let result = lifecycle.transition(status, QuoteOperation::Cancel);
            if status == QuoteStatus::Converted {
                assert!(result.is_err());
            } else {
                assert_eq!(
                    result.expect("cancel allowed").to,
                    TransitionTarget::Status(QuoteStatus::Cancelled)
                );
            }
        }
    }

    #[test]
    fn no_operation_enters_expired() {
        let lifecycle = QuoteLifecycle;
        for status in QuoteStatus::ALL {
            for operation in QuoteOperation::ALL {
                if let Ok(outcome) = lifecycle.transition(status, operation) {
                    assert_ne!(outcome.to, TransitionTarget::Status(QuoteStatus::Expired));
                }
            }
        }
    }

    #[test]
    fn guard_message_names_required_state() {
        let error = QuoteLifecycle
            .transition(QuoteStatus::Sent, QuoteOperation::Convert)
            .expect_err("sent cannot convert");
        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: QuoteStatus::Sent,
                operation: QuoteOperation::Convert,
            }
        );
        assert_eq!(error.to_string(), "cannot convert a quote in status SENT; requires APPROVED");
    }

    #[test]
    fn allowed_operations_for_sent() {
        assert_eq!(
            QuoteLifecycle.allowed_operations(QuoteStatus::Sent),
            vec![QuoteOperation::Approve, QuoteOperation::Reject, QuoteOperation::Cancel]
        );
    }

    #[tokio::test]
    async fn transitions_emit_audit_events() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(
            TenantId("t-1".to_owned()),
            Some(QuoteId("q-1".to_owned())),
            "req-42",
            "user-7",
        );

        QuoteLifecycle
            .apply_with_audit(QuoteStatus::Draft, QuoteOperation::Send, &sink, &audit)
            .await
            .expect("draft -> sent");
        let _ = QuoteLifecycle
            .apply_with_audit(QuoteStatus::Draft, QuoteOperation::Approve, &sink, &audit)
            .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("SENT"));
        assert_eq!(events[1].event_type, "flow.transition_rejected");
        assert_eq!(events[1].correlation_id, "req-42");
    }
}
