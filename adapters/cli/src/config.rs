//! TOML configuration for the server binary.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use aiwar_core::GridSize;
use aiwar_system_tick::TickConfig;
use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Fully resolved server configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) grid: GridSection,
    pub(crate) tick: TickSection,
    pub(crate) sandbox: SandboxSection,
    pub(crate) store: StoreSection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridSection {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Default for GridSection {
    fn default() -> Self {
        let size = GridSize::default();
        Self {
            width: size.width(),
            height: size.height(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TickSection {
    pub(crate) min_duration_ms: u64,
    pub(crate) script_deadline_ms: u64,
}

impl Default for TickSection {
    fn default() -> Self {
        Self {
            min_duration_ms: 1_000,
            script_deadline_ms: 1_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SandboxSection {
    pub(crate) max_operations: u64,
    pub(crate) prelude: Option<PathBuf>,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            max_operations: 5_000_000,
            prelude: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StoreSection {
    pub(crate) data_dir: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Values given on the command line, taking precedence over the file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
}

impl Config {
    /// Reads the file at `path`, or returns the defaults when there is none.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.store.data_dir = base.join(&config.store.data_dir);
            config.sandbox.prelude = config.sandbox.prelude.map(|prelude| base.join(prelude));
        }
        Ok(config)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid config toml")
    }

    #[must_use]
    pub(crate) fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(data_dir) = overrides.data_dir {
            self.store.data_dir = data_dir;
        }
        if let Some(width) = overrides.width {
            self.grid.width = width;
        }
        if let Some(height) = overrides.height {
            self.grid.height = height;
        }
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.grid.width > 0 && self.grid.height > 0,
            "grid must be at least 1x1, got {}x{}",
            self.grid.width,
            self.grid.height
        );
        ensure!(
            self.tick.min_duration_ms > 0,
            "tick.min_duration_ms must be positive"
        );
        ensure!(
            self.tick.script_deadline_ms > 0,
            "tick.script_deadline_ms must be positive"
        );
        Ok(())
    }

    pub(crate) fn grid_size(&self) -> GridSize {
        GridSize::new(self.grid.width, self.grid.height)
    }

    pub(crate) fn tick_config(&self) -> TickConfig {
        TickConfig {
            min_tick_duration: Duration::from_millis(self.tick.min_duration_ms),
            script_deadline: Duration::from_millis(self.tick.script_deadline_ms),
        }
    }
}
