#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Store adapters backing the tick loop's external collaborators.
//!
//! [`MemoryStore`] keeps everything in process and suits tests and embedding.
//! [`DirectoryStore`] lays scripts, one-offs, player output and the latest
//! world snapshot out as plain files.

mod directory;

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use aiwar_core::{
    PlayerName, PlayerOutput, PlayerScript, ScriptSource, SnapshotSink, StoreError,
};

pub use directory::DirectoryStore;

/// In-process store implementing every tick-loop collaborator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    scripts: BTreeMap<PlayerName, String>,
    one_offs: HashMap<PlayerName, String>,
    stdout: HashMap<PlayerName, String>,
    errors: HashMap<PlayerName, String>,
    snapshot: Option<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a player's script.
    pub fn set_script(&self, player: PlayerName, source: impl Into<String>) {
        let _ = self.state().scripts.insert(player, source.into());
    }

    /// Queues a script to run once, after the player's regular script.
    ///
    /// A later call before the next tick replaces the pending one-off.
    pub fn push_one_off(&self, player: PlayerName, source: impl Into<String>) {
        let _ = self.state().one_offs.insert(player, source.into());
    }

    /// Stdout text published for the player by the latest tick.
    #[must_use]
    pub fn stdout(&self, player: &PlayerName) -> Option<String> {
        self.state().stdout.get(player).cloned()
    }

    /// Error text published for the player by the latest tick.
    #[must_use]
    pub fn error(&self, player: &PlayerName) -> Option<String> {
        self.state().errors.get(player).cloned()
    }

    /// Latest published world snapshot.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<String> {
        self.state().snapshot.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScriptSource for MemoryStore {
    fn scripts(&self) -> Result<Vec<PlayerScript>, StoreError> {
        Ok(self
            .state()
            .scripts
            .iter()
            .map(|(player, source)| PlayerScript {
                player: player.clone(),
                source: source.clone(),
            })
            .collect())
    }

    fn take_one_off(&self, player: &PlayerName) -> Result<Option<String>, StoreError> {
        Ok(self.state().one_offs.remove(player))
    }
}

impl PlayerOutput for MemoryStore {
    fn set_stdout(&self, player: &PlayerName, text: &str) -> Result<(), StoreError> {
        let _ = self.state().stdout.insert(player.clone(), text.to_owned());
        Ok(())
    }

    fn set_error(&self, player: &PlayerName, text: &str) -> Result<(), StoreError> {
        let _ = self.state().errors.insert(player.clone(), text.to_owned());
        Ok(())
    }
}

impl SnapshotSink for MemoryStore {
    fn publish(&self, snapshot: &str) -> Result<(), StoreError> {
        self.state().snapshot = Some(snapshot.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_listed_in_player_order() {
        let store = MemoryStore::new();
        store.set_script(PlayerName::new("zed"), "print(1);");
        store.set_script(PlayerName::new("amy"), "print(2);");
        store.set_script(PlayerName::new("zed"), "print(3);");

        let scripts = store.scripts().expect("memory store never fails");

        assert_eq!(
            scripts,
            vec![
                PlayerScript {
                    player: PlayerName::new("amy"),
                    source: "print(2);".to_owned(),
                },
                PlayerScript {
                    player: PlayerName::new("zed"),
                    source: "print(3);".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn one_off_is_handed_out_once() {
        let store = MemoryStore::new();
        let player = PlayerName::new("P1");
        store.push_one_off(player.clone(), "print(\"once\");");

        assert_eq!(
            store.take_one_off(&player).expect("take"),
            Some("print(\"once\");".to_owned())
        );
        assert_eq!(store.take_one_off(&player).expect("take"), None);
    }

    #[test]
    fn output_replaces_previous_text() {
        let store = MemoryStore::new();
        let player = PlayerName::new("P1");

        store.set_stdout(&player, "first").expect("write");
        store.set_stdout(&player, "second").expect("write");
        store.set_error(&player, "").expect("write");
        store.publish("{}").expect("publish");

        assert_eq!(store.stdout(&player).as_deref(), Some("second"));
        assert_eq!(store.error(&player).as_deref(), Some(""));
        assert_eq!(store.latest_snapshot().as_deref(), Some("{}"));
        assert_eq!(store.stdout(&PlayerName::new("P2")), None);
    }
}
