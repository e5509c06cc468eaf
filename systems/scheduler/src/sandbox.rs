//! Rhai-backed sandbox.
//!
//! Each session gets a fresh [`Engine`] bound to the player's actions, so no
//! interpreter state leaks between players or ticks.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use aiwar_core::{ActionResult, ObjectId, StatusCode};
use aiwar_system_actions::PlayerActions;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope, INT};
use serde::Serialize;

use crate::{Sandbox, ScriptError, Session, SessionOutcome};

/// Sandbox running player scripts in the Rhai interpreter.
#[derive(Clone, Debug)]
pub struct RhaiSandbox {
    max_operations: u64,
    prelude: Option<Arc<str>>,
    counter: Arc<AtomicI64>,
}

impl RhaiSandbox {
    /// Creates a sandbox allowing `max_operations` interpreter steps per run.
    #[must_use]
    pub fn new(max_operations: u64) -> Self {
        Self {
            max_operations,
            prelude: None,
            counter: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Adds shared source evaluated ahead of every player's script.
    #[must_use]
    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        self.prelude = Some(Arc::from(prelude.into()));
        self
    }

    fn engine(&self, session: &Session) -> Engine {
        let mut engine = Engine::new();
        let _ = engine.set_max_operations(self.max_operations);

        let cancel = session.cancel.clone();
        let _ = engine.on_progress(move |_| cancel.is_cancelled().then_some(Dynamic::UNIT));
        let stdout = session.stdout.clone();
        let _ = engine.on_print(move |text| stdout.push_line(text));
        let stdout = session.stdout.clone();
        let _ = engine.on_debug(move |text, _, _| stdout.push_line(text));

        register_actions(&mut engine, &session.actions);
        let counter = Arc::clone(&self.counter);
        let _ = engine.register_fn("incrementing_number", move || -> INT {
            counter.fetch_add(1, Ordering::Relaxed) + 1
        });
        engine
    }

    fn scope(session: &Session) -> Result<Scope<'static>, ScriptError> {
        let memory = load_memory(&session.memory)?;
        let map = rhai::serde::to_dynamic(&session.snapshot.cells)
            .map_err(|err| ScriptError::Crashed(err.to_string()))?;

        let size = session.actions.grid_size();
        let mut scope = Scope::new();
        let _ = scope
            .push_dynamic("memory", memory)
            .push_constant_dynamic("map", map)
            .push_constant("MAP_WIDTH", INT::from(size.width()))
            .push_constant("MAP_HEIGHT", INT::from(size.height()))
            .push_constant("TICK", to_int(session.snapshot.tick));
        Ok(scope)
    }

    fn source(&self, session: &Session) -> String {
        match &self.prelude {
            Some(prelude) => format!("{prelude}\n{}", session.source),
            None => session.source.clone(),
        }
    }

    fn classify(&self, error: EvalAltResult) -> ScriptError {
        match error {
            EvalAltResult::ErrorTooManyOperations(_) => {
                ScriptError::BudgetExhausted(self.max_operations)
            }
            EvalAltResult::ErrorTerminated(..) => ScriptError::Cancelled,
            other => ScriptError::Runtime(other.to_string()),
        }
    }
}

impl Sandbox for RhaiSandbox {
    fn run(&self, session: Session) -> SessionOutcome {
        let mut scope = match Self::scope(&session) {
            Ok(scope) => scope,
            Err(err) => {
                return SessionOutcome {
                    memory: session.memory,
                    result: Err(err),
                }
            }
        };
        let engine = self.engine(&session);
        let ast = match engine.compile(self.source(&session)) {
            Ok(ast) => ast,
            Err(err) => {
                return SessionOutcome {
                    memory: session.memory,
                    result: Err(ScriptError::Compile(err.to_string())),
                }
            }
        };

        let ran = engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| self.classify(*err));
        match save_memory(&scope) {
            Ok(memory) => SessionOutcome {
                memory,
                result: ran,
            },
            Err(err) => SessionOutcome {
                memory: session.memory,
                result: ran.and(Err(err)),
            },
        }
    }
}

fn register_actions(engine: &mut Engine, actions: &PlayerActions) {
    let player = actions.clone();
    let _ = engine.register_fn("move", move |object: INT, dx: INT, dy: INT| -> INT {
        status(&object_id(object).and_then(|id| player.move_object(id, dx, dy)))
    });
    let player = actions.clone();
    let _ = engine.register_fn("place_bomb", move || -> Array { reply(player.place_bomb()) });
    let player = actions.clone();
    // Ids that can never be allocated still go through `explode` for the refund.
    let _ = engine.register_fn("explode", move |bomb: INT| -> INT {
        let id = object_id(bomb).unwrap_or(UNALLOCATED);
        status(&player.explode(id))
    });
    let player = actions.clone();
    let _ = engine.register_fn("my_ship", move || -> Array { reply(player.my_ship()) });
    let player = actions.clone();
    let _ = engine.register_fn("create_ship", move |x: INT, y: INT| -> Array {
        reply(player.create_ship(x, y))
    });
}

const UNALLOCATED: ObjectId = ObjectId::new(0);

fn object_id(raw: INT) -> ActionResult<ObjectId> {
    u64::try_from(raw)
        .map(ObjectId::new)
        .map_err(|_| StatusCode::NotFound)
}

fn status<T>(result: &ActionResult<T>) -> INT {
    StatusCode::of(result).code()
}

/// Two-element `[value, status]` array; `value` is `()` on failure.
fn reply<T: Serialize>(result: ActionResult<T>) -> Array {
    let code = status(&result);
    let value = result
        .ok()
        .and_then(|value| rhai::serde::to_dynamic(value).ok())
        .unwrap_or(Dynamic::UNIT);
    vec![value, Dynamic::from(code)]
}

fn to_int(value: u64) -> INT {
    INT::try_from(value).unwrap_or(INT::MAX)
}

fn load_memory(json: &str) -> Result<Dynamic, ScriptError> {
    if json.trim().is_empty() {
        return Ok(Dynamic::from_map(Map::new()));
    }
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|err| ScriptError::Memory(err.to_string()))?;
    rhai::serde::to_dynamic(value).map_err(|err| ScriptError::Memory(err.to_string()))
}

fn save_memory(scope: &Scope<'_>) -> Result<String, ScriptError> {
    let Some(memory) = scope.get_value::<Dynamic>("memory") else {
        return Ok(String::new());
    };
    let value: serde_json::Value =
        rhai::serde::from_dynamic(&memory).map_err(|err| ScriptError::Memory(err.to_string()))?;
    serde_json::to_string(&value).map_err(|err| ScriptError::Memory(err.to_string()))
}
