#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Concurrent, deadline-bounded execution of player scripts.
//!
//! Every session runs on the blocking pool under its own wall-clock deadline.
//! A session that overruns is reported as a timeout and asked to stop through
//! its [`CancelFlag`]; the scheduler never waits for it. Whatever the session
//! recorded before that point stays recorded.

mod sandbox;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use aiwar_core::{PlayerName, WorldSnapshot};
use aiwar_system_actions::PlayerActions;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

pub use sandbox::RhaiSandbox;

/// Failures of a single script session. None of them affect other players.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The session overran its wall-clock deadline.
    #[error("error: exceeded {deadline:?} limit")]
    Timeout {
        /// Deadline that was exceeded.
        deadline: Duration,
    },
    /// The script did not parse.
    #[error("compile error: {0}")]
    Compile(String),
    /// The script raised an error while running.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// The script used up its interpreter step budget.
    #[error("error: exceeded budget of {0} operations")]
    BudgetExhausted(u64),
    /// The script stopped after being asked to cancel.
    #[error("error: script cancelled")]
    Cancelled,
    /// The persistent memory could not be converted.
    #[error("memory error: {0}")]
    Memory(String),
    /// The sandbox itself failed.
    #[error("sandbox crashed: {0}")]
    Crashed(String),
}

/// Cooperative cancellation signal shared with a running session.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag that is not yet raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the session to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Text a session printed, readable after the session is abandoned.
#[derive(Clone, Debug, Default)]
pub struct OutputBuffer(Arc<Mutex<String>>);

impl OutputBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` followed by a newline.
    pub fn push_line(&self, line: &str) {
        let mut text = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        text.push_str(line);
        text.push('\n');
    }

    /// Removes and returns everything written so far.
    #[must_use]
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Everything a sandbox needs to run one player's script for one tick.
#[derive(Clone, Debug)]
pub struct Session {
    /// Player the script belongs to.
    pub player: PlayerName,
    /// Script source, including any one-off appended for this tick.
    pub source: String,
    /// Persistent memory as JSON. Empty means a fresh map.
    pub memory: String,
    /// Pre-tick world shared by every session of the tick.
    pub snapshot: Arc<WorldSnapshot>,
    /// Action capability closed over the player.
    pub actions: PlayerActions,
    /// Destination of `print` output.
    pub stdout: OutputBuffer,
    /// Raised when the session must stop.
    pub cancel: CancelFlag,
}

impl Session {
    /// Builds a session with fresh output and cancellation channels.
    #[must_use]
    pub fn new(
        source: String,
        memory: String,
        snapshot: Arc<WorldSnapshot>,
        actions: PlayerActions,
    ) -> Self {
        Self {
            player: actions.player().clone(),
            source,
            memory,
            snapshot,
            actions,
            stdout: OutputBuffer::new(),
            cancel: CancelFlag::new(),
        }
    }
}

/// Result a sandbox hands back when a session finishes on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Memory to persist for the next tick.
    pub memory: String,
    /// Whether the script ran to completion.
    pub result: Result<(), ScriptError>,
}

/// Interpreter capable of running a session to completion on the caller's
/// thread. Implementations must poll [`Session::cancel`] while running.
pub trait Sandbox: Send + Sync + 'static {
    /// Runs the session and reports its outcome.
    fn run(&self, session: Session) -> SessionOutcome;
}

/// What the scheduler learned about one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Player the session belonged to.
    pub player: PlayerName,
    /// Updated memory, absent when the session never finished.
    pub memory: Option<String>,
    /// Everything the script printed.
    pub stdout: String,
    /// Outcome of the run.
    pub result: Result<(), ScriptError>,
    /// Wall-clock time the scheduler spent on the session.
    pub elapsed: Duration,
}

/// Runs every session of a tick concurrently under a per-session deadline.
#[derive(Debug)]
pub struct Scheduler<S> {
    sandbox: Arc<S>,
    deadline: Duration,
}

impl<S: Sandbox> Scheduler<S> {
    /// Creates a scheduler running sessions in `sandbox`.
    #[must_use]
    pub fn new(sandbox: S, deadline: Duration) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
            deadline,
        }
    }

    /// Wall-clock deadline applied to each session.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs all sessions and returns their reports ordered by player.
    ///
    /// Completes once every session finished or hit its deadline.
    pub async fn run_all(&self, sessions: Vec<Session>) -> Vec<SessionReport> {
        let started = Instant::now();
        let mut pending = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for session in sessions {
            let _ = pending.insert(session.player.clone(), session.stdout.clone());
            let _ = tasks.spawn(supervise(
                Arc::clone(&self.sandbox),
                session,
                self.deadline,
            ));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    let _ = pending.remove(&report.player);
                    reports.push(report);
                }
                Err(err) => {
                    error!(error = %err, "script supervisor failed");
                    failure = Some(err.to_string());
                }
            }
        }
        let reason = failure.unwrap_or_else(|| "script supervisor failed".to_owned());
        reports.extend(abandoned(pending, &reason, started.elapsed()));
        reports.sort_by(|left, right| left.player.cmp(&right.player));
        reports
    }
}

/// Reports for sessions whose supervisor never reported back.
fn abandoned(
    pending: BTreeMap<PlayerName, OutputBuffer>,
    reason: &str,
    elapsed: Duration,
) -> Vec<SessionReport> {
    pending
        .into_iter()
        .map(|(player, stdout)| SessionReport {
            player,
            memory: None,
            stdout: stdout.take(),
            result: Err(ScriptError::Crashed(reason.to_owned())),
            elapsed,
        })
        .collect()
}

async fn supervise<S: Sandbox>(
    sandbox: Arc<S>,
    session: Session,
    deadline: Duration,
) -> SessionReport {
    let player = session.player.clone();
    let stdout = session.stdout.clone();
    let cancel = session.cancel.clone();
    let started = Instant::now();

    let running = tokio::task::spawn_blocking(move || sandbox.run(session));
    let (memory, result) = match tokio::time::timeout(deadline, running).await {
        Ok(Ok(outcome)) => (Some(outcome.memory), outcome.result),
        Ok(Err(err)) => (None, Err(ScriptError::Crashed(err.to_string()))),
        Err(_) => {
            cancel.cancel();
            (None, Err(ScriptError::Timeout { deadline }))
        }
    };

    let elapsed = started.elapsed();
    match &result {
        Ok(()) => debug!(player = %player, ?elapsed, "script finished"),
        Err(err) => warn!(player = %player, ?elapsed, error = %err, "script failed"),
    }

    SessionReport {
        player,
        memory,
        stdout: stdout.take(),
        result,
        elapsed,
    }
}
