use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use aiwar_core::{GridSize, IdAllocator, PlayerName};
use aiwar_system_actions::TickIntake;
use aiwar_system_scheduler::{Sandbox, Scheduler, ScriptError, Session, SessionOutcome};
use aiwar_world::{query, World};

/// Sandbox whose behaviour is selected by the session source.
#[derive(Default)]
struct Scripted {
    stopped_on_cancel: Arc<AtomicBool>,
}

impl Sandbox for Scripted {
    fn run(&self, session: Session) -> SessionOutcome {
        match session.source.as_str() {
            "spin" => {
                let started = Instant::now();
                while !session.cancel.is_cancelled() && started.elapsed() < Duration::from_secs(5)
                {
                    thread::sleep(Duration::from_millis(5));
                }
                self.stopped_on_cancel
                    .store(session.cancel.is_cancelled(), Ordering::SeqCst);
                SessionOutcome {
                    memory: "late".to_owned(),
                    result: Ok(()),
                }
            }
            "fail" => {
                let _ = session.actions.create_ship(1, 1);
                SessionOutcome {
                    memory: session.memory,
                    result: Err(ScriptError::Runtime("boom".to_owned())),
                }
            }
            "panic" => panic!("sandbox bug"),
            _ => {
                session.stdout.push_line(&format!("hi {}", session.player));
                let _ = session.actions.create_ship(2, 2);
                SessionOutcome {
                    memory: r#"{"ran":true}"#.to_owned(),
                    result: Ok(()),
                }
            }
        }
    }
}

fn sessions(sources: &[(&str, &str)]) -> (Arc<TickIntake>, Vec<Session>) {
    let ids = Arc::new(IdAllocator::new());
    let world = World::new(GridSize::new(10, 10), Arc::clone(&ids));
    let snapshot = Arc::new(query::snapshot(&world));
    let intake = TickIntake::open(&world, ids);
    let sessions = sources
        .iter()
        .map(|(player, source)| {
            Session::new(
                (*source).to_owned(),
                "{}".to_owned(),
                Arc::clone(&snapshot),
                intake.actions_for(PlayerName::new(*player)),
            )
        })
        .collect();
    (intake, sessions)
}

#[tokio::test(flavor = "multi_thread")]
async fn overrunning_session_does_not_hold_up_the_others() {
    let sandbox = Scripted::default();
    let stopped = Arc::clone(&sandbox.stopped_on_cancel);
    let scheduler = Scheduler::new(sandbox, Duration::from_millis(100));
    let (intake, sessions) = sessions(&[("c-spin", "spin"), ("a-ok", "ok"), ("b-fail", "fail")]);

    let started = Instant::now();
    let reports = scheduler.run_all(sessions).await;
    assert!(started.elapsed() < Duration::from_secs(2));

    let players: Vec<&str> = reports.iter().map(|report| report.player.as_str()).collect();
    assert_eq!(players, vec!["a-ok", "b-fail", "c-spin"]);

    assert_eq!(reports[0].result, Ok(()));
    assert_eq!(reports[0].memory.as_deref(), Some(r#"{"ran":true}"#));
    assert_eq!(reports[0].stdout, "hi a-ok\n");

    assert_eq!(
        reports[1].result,
        Err(ScriptError::Runtime("boom".to_owned()))
    );
    assert_eq!(reports[1].memory.as_deref(), Some("{}"));

    assert_eq!(
        reports[2].result,
        Err(ScriptError::Timeout {
            deadline: Duration::from_millis(100),
        })
    );
    assert_eq!(reports[2].memory, None);

    // Intents recorded before a failure survive it.
    assert_eq!(intake.drain().ship_creations.len(), 2);

    let waited = Instant::now();
    while !stopped.load(Ordering::SeqCst) && waited.elapsed() < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stopped.load(Ordering::SeqCst), "cancel flag never observed");
}

#[tokio::test]
async fn crashed_sandbox_is_reported_per_player() {
    let scheduler = Scheduler::new(Scripted::default(), Duration::from_secs(1));
    let (_intake, sessions) = sessions(&[("P1", "panic"), ("P2", "ok")]);

    let reports = scheduler.run_all(sessions).await;

    assert!(matches!(reports[0].result, Err(ScriptError::Crashed(_))));
    assert_eq!(reports[0].memory, None);
    assert_eq!(reports[1].result, Ok(()));
}

#[tokio::test]
async fn no_sessions_means_no_reports() {
    let scheduler = Scheduler::new(Scripted::default(), Duration::from_secs(1));
    assert!(scheduler.run_all(Vec::new()).await.is_empty());
    assert_eq!(scheduler.deadline(), Duration::from_secs(1));
}
