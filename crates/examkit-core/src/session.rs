//! The exam session state machine.
//!
//! A session is created from a loaded document and starts `Active`. It leaves
//! `Active` through exactly one submission path: explicit confirmation, clock
//! expiry, or an AI-scoring choice on a writing practice session. Writing
//! steps of non-real tests first pause in `AwaitingRoute` until the caller
//! picks a grading route.
//!
//! All state sits behind one mutex that is never held across an await. The
//! phase change out of `Active` and the clock teardown happen under the same
//! lock, so a tick that races a manual submission sees a non-active phase and
//! does nothing.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::answers::AnswerStore;
use crate::clock::{ClockEvent, SessionClock, Ticker, WARNING_THRESHOLD_SECS};
use crate::error::SessionError;
use crate::model::ExamDocument;
use crate::report::{SubmissionResult, WritingRoute};
use crate::slots::{build_slots, build_steps, Slot, Step};
use crate::traits::{ContentBackend, GradingBackend, SubmitRequest};

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Single-part practice: only this step's slots are scored.
    pub practice_step: Option<usize>,
    /// Remaining seconds below which the time warning is raised.
    pub warning_threshold_secs: u64,
    /// Period of the background clock.
    pub tick_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            practice_step: None,
            warning_threshold_secs: WARNING_THRESHOLD_SECS,
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Active,
    /// Submission is paused until a writing grading route is chosen.
    AwaitingRoute,
    Submitting,
    Submitted,
    /// The last submission failed; the answers are kept for a retry.
    Error,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::AwaitingRoute => write!(f, "awaiting-route"),
            SessionPhase::Submitting => write!(f, "submitting"),
            SessionPhase::Submitted => write!(f, "submitted"),
            SessionPhase::Error => write!(f, "error"),
        }
    }
}

/// Why a submission started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Confirmed,
    ClockExpired,
    RouteChosen,
    Retry,
}

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(SubmissionResult),
    /// A writing grading route must be chosen first.
    AwaitingRoute,
    /// Another submission is in flight; this request was dropped.
    InFlight,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub remaining_secs: u64,
    pub warning_crossed: bool,
    pub current_step: usize,
    pub answered: usize,
    pub total_slots: usize,
    pub last_error: Option<String>,
}

struct Shared {
    test_id: String,
    document: ExamDocument,
    slots: Vec<Slot>,
    steps: Vec<Step>,
    options: SessionOptions,
    grader: Arc<dyn GradingBackend>,
    inner: Mutex<Inner>,
}

struct Inner {
    phase: SessionPhase,
    answers: AnswerStore,
    clock: SessionClock,
    ticker: Option<Ticker>,
    clock_started: bool,
    current_step: usize,
    /// Snapshot taken on entering `Submitting`, kept for retries.
    pending: Option<SubmitRequest>,
    route: Option<WritingRoute>,
    result: Option<SubmissionResult>,
    last_error: Option<String>,
}

/// A single test-taker's timed exam session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ExamSession {
    shared: Arc<Shared>,
}

impl ExamSession {
    /// Fetch the exam and open a session on it.
    pub async fn load(
        test_id: &str,
        content: &dyn ContentBackend,
        grader: Arc<dyn GradingBackend>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let document = content.get_exam(test_id).await.map_err(|e| {
            warn!(test_id, backend = content.name(), "exam load failed: {e:#}");
            SessionError::Load {
                test_id: test_id.to_string(),
                message: format!("{e:#}"),
            }
        })?;
        Self::from_document(test_id, document, grader, options)
    }

    /// Open a session on an already loaded document.
    pub fn from_document(
        test_id: &str,
        document: ExamDocument,
        grader: Arc<dyn GradingBackend>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let slots = build_slots(&document);
        let steps = build_steps(&document);

        if let Some(step) = options.practice_step {
            if step >= steps.len() {
                return Err(SessionError::StepIndexOutOfRange {
                    index: step,
                    len: steps.len(),
                });
            }
        }

        let inner = Inner {
            phase: SessionPhase::Active,
            answers: AnswerStore::new(slots.len(), document.writing.len()),
            clock: SessionClock::new(
                u64::from(document.duration_minutes) * 60,
                options.warning_threshold_secs,
            ),
            ticker: None,
            clock_started: false,
            current_step: options.practice_step.unwrap_or(0),
            pending: None,
            route: None,
            result: None,
            last_error: None,
        };

        info!(
            test_id,
            slots = slots.len(),
            steps = steps.len(),
            practice = options.practice_step.is_some(),
            "session opened"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                test_id: test_id.to_string(),
                document,
                slots,
                steps,
                options,
                grader,
                inner: Mutex::new(inner),
            }),
        })
    }

    pub fn test_id(&self) -> &str {
        &self.shared.test_id
    }

    pub fn document(&self) -> &ExamDocument {
        &self.shared.document
    }

    pub fn slots(&self) -> &[Slot] {
        &self.shared.slots
    }

    pub fn steps(&self) -> &[Step] {
        &self.shared.steps
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Start the background countdown. Requires a tokio runtime.
    ///
    /// Does nothing if the clock is already running or the session is not active.
    pub fn start_clock(&self) {
        let mut inner = self.lock();
        if inner.phase != SessionPhase::Active || inner.ticker.is_some() {
            return;
        }
        inner.clock_started = true;
        inner.ticker = Some(self.spawn_ticker());
    }

    fn spawn_ticker(&self) -> Ticker {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        Ticker::spawn(self.shared.options.tick_interval, move || {
            let weak = weak.clone();
            async move {
                let Some(shared) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                match (ExamSession { shared }).tick_from(true).await {
                    Some(ClockEvent::Tick { .. } | ClockEvent::WarningCrossed { .. }) => {
                        ControlFlow::Continue(())
                    }
                    _ => ControlFlow::Break(()),
                }
            }
        })
    }

    /// Advance the clock by one second.
    ///
    /// Returns `None` when the session is no longer active. On expiry the
    /// session is submitted before this returns.
    pub async fn tick(&self) -> Option<ClockEvent> {
        self.tick_from(false).await
    }

    async fn tick_from(&self, from_ticker: bool) -> Option<ClockEvent> {
        let (event, submission) = {
            let mut inner = self.lock();
            if inner.phase != SessionPhase::Active {
                return None;
            }
            let event = inner.clock.tick();
            let submission = match event {
                ClockEvent::WarningCrossed { remaining } => {
                    info!(test_id = %self.shared.test_id, remaining, "time warning");
                    None
                }
                ClockEvent::Expired => {
                    // Time is up: nobody is left to choose a route, so writing
                    // goes to standard grading.
                    let route = self.needs_route(&inner).then_some(WritingRoute::Standard);
                    Some(self.begin_submission(&mut inner, Trigger::ClockExpired, route, from_ticker))
                }
                ClockEvent::Tick { remaining } => {
                    debug!(remaining, "tick");
                    None
                }
                ClockEvent::Stopped => None,
            };
            (event, submission)
        };

        if let Some((request, route)) = submission {
            // Errors land in the `Error` phase; the tick itself succeeded.
            let _ = self.run_submission(request, route).await;
        }
        Some(event)
    }

    // -----------------------------------------------------------------------
    // Answers and navigation
    // -----------------------------------------------------------------------

    pub fn set_answer(&self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        let mut inner = self.lock();
        ensure_active(&inner)?;
        inner.answers.set_answer(index, value)
    }

    pub fn set_writing_answer(
        &self,
        task: usize,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut inner = self.lock();
        ensure_active(&inner)?;
        inner.answers.set_writing_answer(task, value)
    }

    /// Toggle a multiple-choice scratch mark; returns whether it is now set.
    pub fn toggle_eliminated(&self, index: usize, option: &str) -> Result<bool, SessionError> {
        let mut inner = self.lock();
        ensure_active(&inner)?;
        inner.answers.toggle_eliminated(index, option)
    }

    pub fn is_eliminated(&self, index: usize, option: &str) -> bool {
        self.lock().answers.is_eliminated(index, option)
    }

    pub fn answers(&self) -> Vec<String> {
        self.lock().answers.answers().to_vec()
    }

    pub fn writing_answers(&self) -> Vec<String> {
        self.lock().answers.writing().to_vec()
    }

    pub fn go_to_step(&self, index: usize) -> Result<&Step, SessionError> {
        let steps = &self.shared.steps;
        let step = steps.get(index).ok_or(SessionError::StepIndexOutOfRange {
            index,
            len: steps.len(),
        })?;
        let mut inner = self.lock();
        if let Some(practice) = self.shared.options.practice_step {
            if practice != index {
                return Err(SessionError::InvalidTransition {
                    action: "leave the practice step",
                    phase: inner.phase,
                });
            }
        }
        inner.current_step = index;
        Ok(step)
    }

    pub fn next_step(&self) -> Result<&Step, SessionError> {
        let current = self.lock().current_step;
        self.go_to_step((current + 1).min(self.shared.steps.len().saturating_sub(1)))
    }

    pub fn prev_step(&self) -> Result<&Step, SessionError> {
        let current = self.lock().current_step;
        self.go_to_step(current.saturating_sub(1))
    }

    pub fn state(&self) -> SessionState {
        let inner = self.lock();
        SessionState {
            phase: inner.phase,
            remaining_secs: inner.clock.remaining_secs(),
            warning_crossed: inner.clock.warning_crossed(),
            current_step: inner.current_step,
            answered: inner.answers.answered(),
            total_slots: self.shared.slots.len(),
            last_error: inner.last_error.clone(),
        }
    }

    /// The graded result, once submitted.
    pub fn result(&self) -> Option<SubmissionResult> {
        self.lock().result.clone()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit the session.
    ///
    /// Re-entrant calls are idempotent: while a submission is in flight they
    /// return [`SubmitOutcome::InFlight`], and once submitted they return the
    /// stored result without calling the grader again. From the `Error` phase
    /// this retries with the same answers.
    pub async fn confirm_submit(&self) -> Result<SubmitOutcome, SessionError> {
        let (request, route) = {
            let mut inner = self.lock();
            match inner.phase {
                SessionPhase::Submitted => return Ok(self.prior_result(&inner)),
                SessionPhase::Submitting => return Ok(SubmitOutcome::InFlight),
                SessionPhase::AwaitingRoute => return Ok(SubmitOutcome::AwaitingRoute),
                SessionPhase::Error => {
                    let route = inner.route;
                    self.begin_submission(&mut inner, Trigger::Retry, route, false)
                }
                SessionPhase::Active if self.needs_route(&inner) => {
                    self.leave_active(&mut inner, SessionPhase::AwaitingRoute, false);
                    info!(test_id = %self.shared.test_id, "awaiting writing route");
                    return Ok(SubmitOutcome::AwaitingRoute);
                }
                SessionPhase::Active => {
                    self.begin_submission(&mut inner, Trigger::Confirmed, None, false)
                }
            }
        };
        self.run_submission(request, route).await
    }

    /// Pick how writing is graded and submit.
    ///
    /// Valid while awaiting a route, after a failed submission that involved
    /// writing, or directly from `Active` with [`WritingRoute::Ai`] on a
    /// writing practice session.
    pub async fn choose_writing_scoring_route(
        &self,
        route: WritingRoute,
    ) -> Result<SubmitOutcome, SessionError> {
        let (request, chosen) = {
            let mut inner = self.lock();
            match inner.phase {
                SessionPhase::Submitted => return Ok(self.prior_result(&inner)),
                SessionPhase::Submitting => return Ok(SubmitOutcome::InFlight),
                SessionPhase::AwaitingRoute => {
                    self.begin_submission(&mut inner, Trigger::RouteChosen, Some(route), false)
                }
                SessionPhase::Error if self.takes_route_after_error(&inner) => {
                    self.begin_submission(&mut inner, Trigger::RouteChosen, Some(route), false)
                }
                SessionPhase::Active
                    if route == WritingRoute::Ai && self.is_writing_practice() =>
                {
                    self.begin_submission(&mut inner, Trigger::RouteChosen, Some(route), false)
                }
                phase => {
                    return Err(SessionError::InvalidTransition {
                        action: "choose a writing scoring route",
                        phase,
                    })
                }
            }
        };
        self.run_submission(request, chosen).await
    }

    /// Return to answering after a failed submission or a dismissed route
    /// prompt. The clock restarts from the time that was left.
    pub fn resume(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let resumable = matches!(inner.phase, SessionPhase::Error | SessionPhase::AwaitingRoute);
        if !resumable || inner.clock.is_expired() {
            return Err(SessionError::InvalidTransition {
                action: "resume",
                phase: inner.phase,
            });
        }
        inner.phase = SessionPhase::Active;
        inner.answers.thaw();
        inner.pending = None;
        inner.last_error = None;
        if inner.clock_started {
            inner.ticker = Some(self.spawn_ticker());
        }
        info!(test_id = %self.shared.test_id, "session resumed");
        Ok(())
    }

    fn prior_result(&self, inner: &Inner) -> SubmitOutcome {
        match &inner.result {
            Some(result) => SubmitOutcome::Submitted(result.clone()),
            None => SubmitOutcome::InFlight,
        }
    }

    fn needs_route(&self, inner: &Inner) -> bool {
        !self.shared.document.real_test
            && self
                .shared
                .steps
                .get(inner.current_step)
                .is_some_and(Step::is_writing)
    }

    /// A failed submission can be re-routed only if a route applied to it.
    fn takes_route_after_error(&self, inner: &Inner) -> bool {
        inner.route.is_some() || self.needs_route(inner) || self.is_writing_practice()
    }

    fn is_writing_practice(&self) -> bool {
        if self.shared.document.real_test {
            return false;
        }
        let practice_on_writing = self
            .shared
            .options
            .practice_step
            .and_then(|i| self.shared.steps.get(i))
            .is_some_and(Step::is_writing);
        practice_on_writing || self.shared.document.is_writing_only()
    }

    /// Tear down the clock and freeze answers. Must run under the session lock.
    fn leave_active(&self, inner: &mut Inner, phase: SessionPhase, from_ticker: bool) {
        inner.phase = phase;
        inner.answers.freeze(phase);
        if let Some(ticker) = inner.ticker.take() {
            if from_ticker {
                ticker.detach();
            } else {
                ticker.cancel();
            }
        }
    }

    /// Enter `Submitting` and take the answer snapshot.
    fn begin_submission(
        &self,
        inner: &mut Inner,
        trigger: Trigger,
        route: Option<WritingRoute>,
        from_ticker: bool,
    ) -> (SubmitRequest, Option<WritingRoute>) {
        self.leave_active(inner, SessionPhase::Submitting, from_ticker);
        inner.last_error = None;
        inner.route = route;

        let request = match (&inner.pending, trigger) {
            (Some(pending), Trigger::Retry | Trigger::RouteChosen) => pending.clone(),
            _ => SubmitRequest {
                answers: inner.answers.answers().to_vec(),
                writing: inner.answers.writing().to_vec(),
                time_taken_secs: inner.clock.elapsed_secs(),
                is_practice: self.shared.options.practice_step.is_some(),
            },
        };
        inner.pending = Some(request.clone());

        info!(
            test_id = %self.shared.test_id,
            ?trigger,
            route = ?route,
            answered = inner.answers.answered(),
            "submitting"
        );
        (request, route)
    }

    async fn run_submission(
        &self,
        request: SubmitRequest,
        route: Option<WritingRoute>,
    ) -> Result<SubmitOutcome, SessionError> {
        let outcome = self.delegate(&request, route).await;

        let mut inner = self.lock();
        match outcome {
            Ok(mut result) => {
                result.reconcile();
                if route.is_some() {
                    result.route = route;
                }
                // A writing step scores no slots.
                let scope = self
                    .shared
                    .options
                    .practice_step
                    .and_then(|i| self.shared.steps.get(i))
                    .map(|step| step.slots.clone().unwrap_or(0..0));
                if let Some(range) = scope {
                    result = result.scoped_to(range);
                }
                result.is_practice = request.is_practice;

                info!(
                    test_id = %self.shared.test_id,
                    score = result.score,
                    total = result.total,
                    "submitted"
                );
                inner.phase = SessionPhase::Submitted;
                inner.answers.freeze(SessionPhase::Submitted);
                inner.result = Some(result.clone());
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(e) => {
                let message = format!("{e:#}");
                warn!(test_id = %self.shared.test_id, "submission failed: {message}");
                inner.phase = SessionPhase::Error;
                inner.answers.freeze(SessionPhase::Error);
                inner.last_error = Some(message.clone());
                Err(SessionError::Submission(message))
            }
        }
    }

    async fn delegate(
        &self,
        request: &SubmitRequest,
        route: Option<WritingRoute>,
    ) -> anyhow::Result<SubmissionResult> {
        let grader = &self.shared.grader;
        let submitted = grader.submit(&self.shared.test_id, request).await?;
        match route {
            Some(WritingRoute::Ai) => grader.score_writing_with_ai(&submitted.submission_id).await,
            _ => Ok(submitted),
        }
    }
}

fn ensure_active(inner: &Inner) -> Result<(), SessionError> {
    match inner.phase {
        SessionPhase::Active => Ok(()),
        phase => Err(SessionError::AnswersFrozen(phase)),
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("test_id", &self.shared.test_id)
            .field("slots", &self.shared.slots.len())
            .field("steps", &self.shared.steps.len())
            .field("grader", &self.shared.grader.name())
            .finish()
    }
}
