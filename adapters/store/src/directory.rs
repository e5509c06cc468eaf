//! File-system store.
//!
//! Layout under the root directory:
//!
//! ```text
//! scripts/<player>.rhai   regular scripts
//! oneoff/<player>.rhai    one-off scripts, deleted once read
//! out/<player>.stdout     stdout of the latest tick
//! out/<player>.error      error text of the latest tick
//! latest_map.json         world snapshot of the latest tick
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use aiwar_core::{
    PlayerName, PlayerOutput, PlayerScript, ScriptSource, SnapshotSink, StoreError,
};

const SCRIPTS: &str = "scripts";
const ONE_OFFS: &str = "oneoff";
const OUTPUT: &str = "out";
const SNAPSHOT: &str = "latest_map.json";
const SCRIPT_EXTENSION: &str = "rhai";

/// Store keeping scripts, output and snapshots as files under one root.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens the store, creating its directory layout when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in [SCRIPTS, ONE_OFFS, OUTPUT] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|source| io_error(&path, source))?;
        }
        Ok(Self { root })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn player_file(
        &self,
        dir: &str,
        player: &PlayerName,
        extension: &str,
    ) -> Result<PathBuf, StoreError> {
        if !is_valid_player_name(player.as_str()) {
            return Err(StoreError::InvalidKey(player.as_str().to_owned()));
        }
        Ok(self
            .root
            .join(dir)
            .join(format!("{}.{extension}", player.as_str())))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, contents).map_err(|source| io_error(&staging, source))?;
        fs::rename(&staging, path).map_err(|source| io_error(path, source))
    }
}

fn is_valid_player_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        key: path.display().to_string(),
        source,
    }
}

impl ScriptSource for DirectoryStore {
    fn scripts(&self) -> Result<Vec<PlayerScript>, StoreError> {
        let dir = self.root.join(SCRIPTS);
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;

        let mut scripts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| io_error(&dir, source))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_valid_player_name(name) {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            scripts.push(PlayerScript {
                player: PlayerName::new(name),
                source,
            });
        }
        scripts.sort_by(|left, right| left.player.cmp(&right.player));
        Ok(scripts)
    }

    fn take_one_off(&self, player: &PlayerName) -> Result<Option<String>, StoreError> {
        let path = self.player_file(ONE_OFFS, player, SCRIPT_EXTENSION)?;
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, err)),
        };
        fs::remove_file(&path).map_err(|source| io_error(&path, source))?;
        Ok(Some(source))
    }
}

impl PlayerOutput for DirectoryStore {
    fn set_stdout(&self, player: &PlayerName, text: &str) -> Result<(), StoreError> {
        let path = self.player_file(OUTPUT, player, "stdout")?;
        self.write(&path, text)
    }

    fn set_error(&self, player: &PlayerName, text: &str) -> Result<(), StoreError> {
        let path = self.player_file(OUTPUT, player, "error")?;
        self.write(&path, text)
    }
}

impl SnapshotSink for DirectoryStore {
    fn publish(&self, snapshot: &str) -> Result<(), StoreError> {
        self.write(&self.root.join(SNAPSHOT), snapshot)
    }
}
