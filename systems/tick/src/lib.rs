#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestration for the AI War server.
//!
//! A [`TickLoop`] owns the world and the player registry, and sequences each
//! tick through [`TickPhase`]: pull scripts, snapshot the world, run every
//! script concurrently, resolve the recorded intents, expire old explosions
//! and publish the result.

use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use aiwar_core::{
    Command, Event, GridSize, IdAllocator, PlayerName, PlayerOutput, ScriptSource, SnapshotSink,
    Tick,
};
use aiwar_system_actions::TickIntake;
use aiwar_system_resolution::{execute, Resolution, ResolutionSummary};
use aiwar_system_scheduler::{Sandbox, Scheduler, Session, SessionReport};
use aiwar_world::{self as world, query, ResolutionError, World};
use thiserror::Error;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Phases of a single tick, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// Pulling scripts and one-offs from the script source.
    Ingest,
    /// Capturing the pre-tick world for scripts.
    Snapshot,
    /// Running player scripts concurrently.
    RunScripts,
    /// Applying recorded intents to the world.
    Resolve,
    /// Expiring explosions.
    Cleanup,
    /// Publishing the world and player output, then advancing the clock.
    Publish,
}

impl TickPhase {
    /// Phase that follows this one. `Publish` loops back to `Ingest`.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Ingest => Self::Snapshot,
            Self::Snapshot => Self::RunScripts,
            Self::RunScripts => Self::Resolve,
            Self::Resolve => Self::Cleanup,
            Self::Cleanup => Self::Publish,
            Self::Publish => Self::Ingest,
        }
    }
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ingest => "ingest",
            Self::Snapshot => "snapshot",
            Self::RunScripts => "run-scripts",
            Self::Resolve => "resolve",
            Self::Cleanup => "cleanup",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Timing parameters of the tick loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickConfig {
    /// Shortest wall-clock time a tick may take in [`TickLoop::run`].
    pub min_tick_duration: Duration,
    /// Wall-clock deadline of each script session.
    pub script_deadline: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            min_tick_duration: Duration::from_secs(1),
            script_deadline: Duration::from_secs(1),
        }
    }
}

/// Faults that abort the tick loop.
#[derive(Debug, Error)]
pub enum TickError {
    /// Applying the tick's commands broke a world invariant.
    #[error("resolution of tick {tick} failed")]
    Resolution {
        /// Tick being resolved.
        tick: Tick,
        /// Underlying fault.
        #[source]
        source: ResolutionError,
    },
    /// The world snapshot could not be serialized.
    #[error("failed to serialize the world snapshot")]
    Snapshot(#[from] serde_json::Error),
}

/// External collaborators of the tick loop.
#[derive(Clone)]
pub struct Stores {
    /// Where scripts and one-offs come from.
    pub scripts: Arc<dyn ScriptSource>,
    /// Where per-player stdout and error text go.
    pub output: Arc<dyn PlayerOutput>,
    /// Where the serialized world goes.
    pub snapshots: Arc<dyn SnapshotSink>,
}

impl Stores {
    /// Uses one store for every role.
    #[must_use]
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: ScriptSource + PlayerOutput + SnapshotSink + 'static,
    {
        Self {
            scripts: Arc::clone(&store) as Arc<dyn ScriptSource>,
            output: Arc::clone(&store) as Arc<dyn PlayerOutput>,
            snapshots: store,
        }
    }
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Tick that was resolved.
    pub tick: Tick,
    /// Number of script sessions run.
    pub sessions: usize,
    /// Sessions that failed or timed out.
    pub failures: usize,
    /// Tally of world changes.
    pub summary: ResolutionSummary,
    /// Every event emitted while resolving and cleaning up.
    pub events: Vec<Event>,
}

#[derive(Debug, Default)]
struct Player {
    script: String,
    memory: String,
    one_off: Option<String>,
}

impl Player {
    /// Source to run this tick, consuming the one-off.
    fn take_source(&mut self) -> String {
        match self.one_off.take() {
            Some(one_off) if self.script.is_empty() => one_off,
            Some(one_off) => format!("{}\n{one_off}", self.script),
            None => self.script.clone(),
        }
    }
}

/// Drives the world through ticks.
#[derive(Debug)]
pub struct TickLoop<S> {
    world: World,
    ids: Arc<IdAllocator>,
    scheduler: Scheduler<S>,
    resolution: Resolution,
    players: BTreeMap<PlayerName, Player>,
    phase: TickPhase,
    config: TickConfig,
    stores: Stores,
}

impl<S: Sandbox> TickLoop<S> {
    /// Creates a loop over an empty world of the given size.
    #[must_use]
    pub fn new(size: GridSize, config: TickConfig, sandbox: S, stores: Stores) -> Self {
        let ids = Arc::new(IdAllocator::new());
        Self {
            world: World::new(size, Arc::clone(&ids)),
            ids,
            scheduler: Scheduler::new(sandbox, config.script_deadline),
            resolution: Resolution::new(),
            players: BTreeMap::new(),
            phase: TickPhase::Ingest,
            config,
            stores,
        }
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Phase the loop will execute next.
    #[must_use]
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Persistent memory currently held for `player`.
    #[must_use]
    pub fn memory_of(&self, player: &PlayerName) -> Option<&str> {
        self.players
            .get(player)
            .map(|state| state.memory.as_str())
    }

    /// Runs ticks until `limit` ticks completed (forever when `None`) or
    /// `shutdown` resolves.
    ///
    /// Each tick takes at least the configured minimum duration. `shutdown` is
    /// only observed between ticks, so a tick is never cut short.
    pub async fn run<F>(&mut self, limit: Option<u64>, shutdown: F) -> Result<(), TickError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed = 0u64;
        while limit.map_or(true, |limit| completed < limit) {
            let earliest_next = tokio::time::Instant::now() + self.config.min_tick_duration;
            let report = self.step().await?;
            info!(
                tick = report.tick.get(),
                sessions = report.sessions,
                failures = report.failures,
                detonated = report.summary.detonated,
                ships_destroyed = report.summary.ships_destroyed,
                "tick resolved"
            );
            completed += 1;
            if limit.is_some_and(|limit| completed >= limit) {
                break;
            }
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(completed, "shutdown requested");
                    break;
                }
                () = tokio::time::sleep_until(earliest_next) => {}
            }
        }
        Ok(())
    }

    /// Executes one full tick.
    pub async fn step(&mut self) -> Result<TickReport, TickError> {
        let tick = query::tick(&self.world);
        let span = info_span!("tick", tick = tick.get());
        self.step_inner(tick).instrument(span).await
    }

    async fn step_inner(&mut self, tick: Tick) -> Result<TickReport, TickError> {
        self.phase = TickPhase::Ingest;
        self.ingest();

        self.advance(TickPhase::Snapshot);
        let started = Instant::now();
        let snapshot = Arc::new(query::snapshot(&self.world));
        debug!(elapsed = ?started.elapsed(), "snapshot built");

        self.advance(TickPhase::RunScripts);
        let started = Instant::now();
        let intake = TickIntake::open(&self.world, Arc::clone(&self.ids));
        let sessions: Vec<Session> = self
            .players
            .iter_mut()
            .filter_map(|(name, player)| {
                let source = player.take_source();
                if source.trim().is_empty() {
                    return None;
                }
                Some(Session::new(
                    source,
                    player.memory.clone(),
                    Arc::clone(&snapshot),
                    intake.actions_for(name.clone()),
                ))
            })
            .collect();
        let reports = self.scheduler.run_all(sessions).await;
        intake.seal();
        self.remember(&reports);
        debug!(
            elapsed = ?started.elapsed(),
            sessions = reports.len(),
            "script phase finished"
        );

        self.advance(TickPhase::Resolve);
        let mut events = Vec::new();
        let mut commands = Vec::new();
        self.resolution.plan(intake.drain(), &mut commands);
        execute(&mut self.world, commands, &mut events)
            .map_err(|source| TickError::Resolution { tick, source })?;

        self.advance(TickPhase::Cleanup);
        let mut commands = Vec::new();
        self.resolution.cleanup(&mut commands);
        execute(&mut self.world, commands, &mut events)
            .map_err(|source| TickError::Resolution { tick, source })?;

        self.advance(TickPhase::Publish);
        let started = Instant::now();
        self.publish(&reports)?;
        let mut advanced = Vec::new();
        world::apply(&mut self.world, Command::AdvanceTick, &mut advanced)
            .map_err(|source| TickError::Resolution { tick, source })?;
        debug!(elapsed = ?started.elapsed(), "published");
        self.advance(TickPhase::Ingest);

        Ok(TickReport {
            tick,
            sessions: reports.len(),
            failures: reports.iter().filter(|report| report.result.is_err()).count(),
            summary: ResolutionSummary::from_events(&events),
            events,
        })
    }

    fn advance(&mut self, expected: TickPhase) {
        let next = self.phase.next();
        debug_assert_eq!(next, expected, "tick phases out of order");
        trace!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    fn ingest(&mut self) {
        match self.stores.scripts.scripts() {
            Ok(scripts) => {
                for script in scripts {
                    self.players.entry(script.player).or_default().script = script.source;
                }
            }
            Err(err) => warn!(error = %err, "failed to load scripts"),
        }

        for (name, player) in &mut self.players {
            match self.stores.scripts.take_one_off(name) {
                Ok(Some(one_off)) => player.one_off = Some(one_off),
                Ok(None) => {}
                Err(err) => warn!(player = %name, error = %err, "failed to load one-off script"),
            }
        }
    }

    fn remember(&mut self, reports: &[SessionReport]) {
        for report in reports {
            let Some(memory) = &report.memory else {
                continue;
            };
            if let Some(player) = self.players.get_mut(&report.player) {
                player.memory.clone_from(memory);
            }
        }
    }

    fn publish(&self, reports: &[SessionReport]) -> Result<(), TickError> {
        let snapshot = query::snapshot(&self.world).to_json()?;
        if let Err(err) = self.stores.snapshots.publish(&snapshot) {
            warn!(error = %err, "failed to publish snapshot");
        }

        for report in reports {
            let error = report
                .result
                .as_ref()
                .err()
                .map(ToString::to_string)
                .unwrap_or_default();
            if let Err(err) = self.stores.output.set_stdout(&report.player, &report.stdout) {
                warn!(player = %report.player, error = %err, "failed to publish stdout");
            }
            if let Err(err) = self.stores.output.set_error(&report.player, &error) {
                warn!(player = %report.player, error = %err, "failed to publish error");
            }
        }
        Ok(())
    }
}
