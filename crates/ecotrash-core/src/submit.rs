// ── Submission orchestration ──
//
// Runs one form submission end to end: in-flight guard, full local
// validation, a single external call, failure classification and server
// error merge. Status transitions are published on a `watch` channel.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::form::FormHandle;
use crate::validate::FormState;

/// Generic message for failures the user cannot act on field by field.
const SERVER_FAULT_MESSAGE: &str = "The server could not process the request. Try again later.";

/// Why a submission did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The form failed local validation; nothing was sent.
    LocalValidation,
    /// Connection or timeout failure; safe to retry.
    Transport(String),
    /// The server rejected individual fields.
    ServerValidation,
    /// 5xx, unexpected payload, or any other server-side failure.
    ServerFault(String),
    /// The session token was rejected.
    Unauthorized,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalValidation => write!(f, "invalid form"),
            Self::Transport(msg) => write!(f, "connection problem: {msg}"),
            Self::ServerValidation => write!(f, "rejected by server"),
            Self::ServerFault(msg) => write!(f, "server error: {msg}"),
            Self::Unauthorized => write!(f, "session expired"),
        }
    }
}

impl FailureReason {
    fn classify(err: &CoreError) -> Self {
        match err {
            CoreError::ValidationFailed { .. } => Self::ServerValidation,
            CoreError::AuthenticationFailed { .. } | CoreError::NotLoggedIn => Self::Unauthorized,
            CoreError::ConnectionFailed { .. } | CoreError::Timeout { .. } => {
                Self::Transport(err.to_string())
            }
            other => Self::ServerFault(other.to_string()),
        }
    }
}

/// Observable lifecycle of the current submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed(FailureReason),
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Submitting => write!(f, "submitting"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// What `submit` did.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    /// Another submission from the same form is still in flight.
    Busy,
    /// The operation succeeded.
    Submitted(T),
    /// Validation or the operation failed; errors are on the form.
    Rejected(FailureReason),
    /// The form was detached before the result arrived; nothing applied.
    Abandoned,
}

impl<T> SubmitOutcome<T> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected(FailureReason::Unauthorized))
    }
}

/// Validated input handed to the external operation.
#[derive(Debug, Clone)]
pub struct Submission {
    pub state: FormState,
    pub payload: Value,
}

/// Per-form-mount submission driver. Clones share the guard, status and
/// liveness token.
#[derive(Clone)]
pub struct SubmissionOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    in_flight: AtomicBool,
    status: watch::Sender<SubmissionStatus>,
    alive: CancellationToken,
}

/// Clears the in-flight flag when the submission ends, including when the
/// submit future is dropped mid-call.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for SubmissionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionOrchestrator {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SubmissionStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                in_flight: AtomicBool::new(false),
                status,
                alive: CancellationToken::new(),
            }),
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Mark the form as unmounted. Results arriving afterwards are dropped.
    pub fn detach(&self) {
        debug!("form detached");
        self.inner.alive.cancel();
    }

    pub fn is_detached(&self) -> bool {
        self.inner.alive.is_cancelled()
    }

    /// Submit `form` through `operation`.
    ///
    /// The operation is called at most once per invocation, and never when
    /// another submission is in flight or local validation fails. On
    /// success `on_success` runs before the value is returned.
    pub async fn submit<T, Op, Fut, S>(
        &self,
        form: &FormHandle,
        operation: Op,
        on_success: S,
    ) -> SubmitOutcome<T>
    where
        Op: FnOnce(Submission) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
        S: FnOnce(&T),
    {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submission already in flight");
            return SubmitOutcome::Busy;
        }
        let _guard = InFlight(&self.inner.in_flight);

        if self.is_detached() {
            return SubmitOutcome::Abandoned;
        }

        self.set_status(SubmissionStatus::Validating);
        let submission = form.with(|f| {
            f.begin_submit().then(|| Submission {
                state: f.snapshot(),
                payload: f.payload(),
            })
        });
        let Some(submission) = submission else {
            debug!("local validation failed");
            return self.fail(FailureReason::LocalValidation);
        };

        self.set_status(SubmissionStatus::Submitting);
        let result = operation(submission).await;

        if self.is_detached() {
            debug!("dropping result for detached form");
            self.set_status(SubmissionStatus::Idle);
            return SubmitOutcome::Abandoned;
        }

        match result {
            Ok(value) => {
                self.set_status(SubmissionStatus::Succeeded);
                on_success(&value);
                SubmitOutcome::Submitted(value)
            }
            Err(err) => {
                let reason = FailureReason::classify(&err);
                warn!(error = %err, "submission failed");
                form.with(|f| match &reason {
                    FailureReason::ServerValidation => {
                        if let Some(errors) = err.field_errors() {
                            f.apply_server_errors(errors);
                        }
                    }
                    FailureReason::ServerFault(_) => f.apply_form_error(SERVER_FAULT_MESSAGE),
                    FailureReason::Transport(msg) => f.apply_form_error(msg.clone()),
                    FailureReason::Unauthorized => {
                        f.apply_form_error("Your session has expired. Log in again.");
                    }
                    FailureReason::LocalValidation => {}
                });
                self.fail(reason)
            }
        }
    }

    fn fail<T>(&self, reason: FailureReason) -> SubmitOutcome<T> {
        self.set_status(SubmissionStatus::Failed(reason.clone()));
        SubmitOutcome::Rejected(reason)
    }

    fn set_status(&self, status: SubmissionStatus) {
        debug!(%status, "submission status");
        self.inner.status.send_replace(status);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use ecotrash_api::FieldErrors;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::form::FormController;
    use crate::validate::{FieldSchema, FormSchema};

    fn form() -> FormHandle {
        let schema = FormSchema::new("management")
            .field(FieldSchema::text("name", "Name").required("Name is required"))
            .field(
                FieldSchema::email("email", "Email")
                    .required("Email is required")
                    .email_format("Invalid email"),
            );
        FormController::new(Arc::new(schema)).into_handle()
    }

    fn filled() -> FormHandle {
        let form = form();
        form.with(|f| {
            f.set_value("name", "Norte");
            f.set_value("email", "norte@example.com");
        });
        form
    }

    #[tokio::test]
    async fn invalid_form_never_calls_operation() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = form();
        let calls = AtomicUsize::new(0);

        let outcome: SubmitOutcome<()> = orchestrator
            .submit(
                &form,
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_| {},
            )
            .await;

        assert_eq!(outcome, SubmitOutcome::Rejected(FailureReason::LocalValidation));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            form.result().error("name"),
            Some("Name is required"),
            "errors become visible on submit"
        );
        assert_eq!(
            orchestrator.status(),
            SubmissionStatus::Failed(FailureReason::LocalValidation)
        );
    }

    #[tokio::test]
    async fn success_passes_payload_and_runs_callback() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();
        let mut seen = None;

        let outcome = orchestrator
            .submit(
                &form,
                |submission| async move { Ok::<_, CoreError>(submission.payload) },
                |payload| seen = Some(payload.clone()),
            )
            .await;

        let expected = json!({ "name": "Norte", "email": "norte@example.com" });
        assert_eq!(outcome, SubmitOutcome::Submitted(expected.clone()));
        assert_eq!(seen, Some(expected));
        assert_eq!(orchestrator.status(), SubmissionStatus::Succeeded);
        assert!(!orchestrator.is_in_flight());
    }

    #[tokio::test]
    async fn concurrent_submit_is_busy() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();
        let calls = AtomicUsize::new(0);
        let (release, wait) = oneshot::channel::<()>();

        let first = orchestrator.submit(
            &form,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let _ = wait.await;
                    Ok::<_, CoreError>(1)
                }
            },
            |_| {},
        );
        let second = async {
            let outcome = orchestrator
                .submit(
                    &form,
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok::<_, CoreError>(2) }
                    },
                    |_| {},
                )
                .await;
            release.send(()).unwrap();
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, SubmitOutcome::Submitted(1));
        assert_eq!(second, SubmitOutcome::Busy);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_field_errors_land_on_the_form() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();

        let outcome: SubmitOutcome<()> = orchestrator
            .submit(
                &form,
                |_| async {
                    let mut errors = FieldErrors::default();
                    errors.fields.insert("email".into(), vec!["Email already registered".into()]);
                    Err(CoreError::ValidationFailed { errors })
                },
                |_| {},
            )
            .await;

        assert_eq!(outcome, SubmitOutcome::Rejected(FailureReason::ServerValidation));
        assert_eq!(form.result().error("email"), Some("Email already registered"));
        assert!(!orchestrator.is_in_flight());
    }

    #[tokio::test]
    async fn retry_after_failure_calls_again() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let outcome: SubmitOutcome<()> = orchestrator
                .submit(
                    &form,
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            Err(CoreError::Api {
                                message: "boom".into(),
                                status: Some(500),
                            })
                        }
                    },
                    |_| {},
                )
                .await;
            assert!(matches!(
                outcome,
                SubmitOutcome::Rejected(FailureReason::ServerFault(_))
            ));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(form.result().form_errors(), [SERVER_FAULT_MESSAGE.to_owned()]);
    }

    #[tokio::test]
    async fn unauthorized_and_transport_are_classified() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();

        let outcome: SubmitOutcome<()> = orchestrator
            .submit(
                &form,
                |_| async {
                    Err(CoreError::AuthenticationFailed {
                        message: "token expired".into(),
                    })
                },
                |_| {},
            )
            .await;
        assert!(outcome.is_unauthorized());

        let outcome: SubmitOutcome<()> = orchestrator
            .submit(
                &form,
                |_| async {
                    Err(CoreError::Timeout {
                        url: "http://localhost".into(),
                    })
                },
                |_| {},
            )
            .await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(FailureReason::Transport(_))
        ));
    }

    #[tokio::test]
    async fn detached_form_abandons_result() {
        let orchestrator = SubmissionOrchestrator::new();
        let form = filled();
        let detacher = orchestrator.clone();
        let mut applied = false;

        let outcome = orchestrator
            .submit(
                &form,
                |_| async move {
                    detacher.detach();
                    Ok::<_, CoreError>(())
                },
                |_| applied = true,
            )
            .await;

        assert_eq!(outcome, SubmitOutcome::Abandoned);
        assert!(!applied);
        assert!(!orchestrator.is_in_flight());
    }

    #[tokio::test]
    async fn status_is_observable() {
        let orchestrator = SubmissionOrchestrator::new();
        let mut rx = orchestrator.subscribe();
        assert_eq!(*rx.borrow_and_update(), SubmissionStatus::Idle);

        let form = filled();
        let _ = orchestrator
            .submit(&form, |_| async { Ok::<_, CoreError>(()) }, |_| {})
            .await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SubmissionStatus::Succeeded);
    }
}
