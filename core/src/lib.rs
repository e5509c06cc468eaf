#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the AI War tick engine.
//!
//! This crate defines the vocabulary that connects the action intake, the
//! authoritative world, the resolution system and the tick orchestrator.
//! Player scripts never touch the world directly: the action intake records
//! intent values, the resolution system turns a drained [`IntentBatch`] into
//! [`Command`] values, the world executes those commands via its `apply` entry
//! point and reports what happened as [`Event`] values.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bombs a freshly created ship may place.
pub const STARTING_BOMB_STOCK: u32 = 3;

/// Half-width of the square blast window around a detonating bomb.
pub const BLAST_RADIUS: u32 = 2;

/// Value the identifier allocator starts counting from. Status codes live
/// below this value so scripts can never confuse an id with an error.
pub const ID_SEED: u64 = 1000;

/// Status codes returned to scripts by every action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The action was accepted.
    Ok,
    /// The action was rejected for a reason not covered by the other codes.
    Error,
    /// The referenced object does not exist.
    NotFound,
    /// The referenced object belongs to another player.
    NoPermission,
    /// The arguments were out of range or referenced the wrong kind of object.
    InvalidArguments,
}

impl StatusCode {
    /// Numeric value handed to scripts.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::Error => -1,
            Self::NotFound => -2,
            Self::NoPermission => -3,
            Self::InvalidArguments => -4,
        }
    }

    /// Collapses an action result into the code reported to scripts.
    #[must_use]
    pub fn of<T>(result: &ActionResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(code) => *code,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::NoPermission => "NO_PERMISSION",
            Self::InvalidArguments => "INVALID_ARGUMENTS",
        };
        f.write_str(label)
    }
}

/// Outcome of a player action. Failures carry the status code for the script.
pub type ActionResult<T> = Result<T, StatusCode>;

/// Unique identifier assigned to a game object.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name that uniquely identifies a player.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    /// Creates a player name from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-based location of a grid cell.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new zero-based cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Converts one-based script coordinates, rejecting anything off the grid.
    #[must_use]
    pub fn from_one_based(x: i64, y: i64, size: GridSize) -> Option<Self> {
        let x = u32::try_from(x.checked_sub(1)?).ok()?;
        let y = u32::try_from(y.checked_sub(1)?).ok()?;
        let cell = Self::new(x, y);
        size.contains(cell).then_some(cell)
    }

    /// Offsets the cell by a signed delta, rejecting anything off the grid.
    #[must_use]
    pub fn offset(self, dx: i64, dy: i64, size: GridSize) -> Option<Self> {
        let x = i64::from(self.x).checked_add(dx)?;
        let y = i64::from(self.y).checked_add(dy)?;
        let cell = Self::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        size.contains(cell).then_some(cell)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of the world grid measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Creates a new grid size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.width) * u64::from(self.height);
        usize::try_from(count).unwrap_or(usize::MAX)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(20, 20)
    }
}

/// Discrete simulation step counter.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// Creates a tick from its index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Retrieves the tick index.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Tick that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide allocator of object identifiers.
///
/// Shared by the action intake (bombs and ships requested by scripts) and the
/// world (explosion markers). Identifiers are never reused.
#[derive(Debug)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first identifier is `ID_SEED + 1`.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_after(ID_SEED)
    }

    /// Creates an allocator whose first identifier is `last + 1`.
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Hands out the next identifier. Safe to call from any thread.
    pub fn allocate(&self) -> ObjectId {
        ObjectId::new(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Most recently issued identifier, or the seed if none was issued.
    #[must_use]
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Variant-specific state carried by a game object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Player-controlled ship.
    Ship {
        /// Bombs the ship may still place.
        bombs_available: u32,
    },
    /// Bomb waiting for detonation.
    Bomb,
    /// Short-lived marker left behind by a detonated bomb.
    Explosion {
        /// Tick during which the explosion happened.
        tick_created: Tick,
    },
}

impl ObjectKind {
    /// Tag exposed to scripts and in published snapshots.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Ship { .. } => "ship",
            Self::Bomb => "bomb",
            Self::Explosion { .. } => "explosion",
        }
    }
}

/// Object living inside a grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GameObject {
    id: ObjectId,
    owner: Option<PlayerName>,
    cell: CellCoord,
    kind: ObjectKind,
}

impl GameObject {
    /// Creates a ship carrying the starting bomb stock.
    #[must_use]
    pub fn ship(id: ObjectId, owner: PlayerName, cell: CellCoord) -> Self {
        Self {
            id,
            owner: Some(owner),
            cell,
            kind: ObjectKind::Ship {
                bombs_available: STARTING_BOMB_STOCK,
            },
        }
    }

    /// Creates a bomb.
    #[must_use]
    pub fn bomb(id: ObjectId, owner: PlayerName, cell: CellCoord) -> Self {
        Self {
            id,
            owner: Some(owner),
            cell,
            kind: ObjectKind::Bomb,
        }
    }

    /// Creates an unowned explosion marker.
    #[must_use]
    pub fn explosion(id: ObjectId, cell: CellCoord, tick_created: Tick) -> Self {
        Self {
            id,
            owner: None,
            cell,
            kind: ObjectKind::Explosion { tick_created },
        }
    }

    /// Identifier of the object.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Owning player, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&PlayerName> {
        self.owner.as_ref()
    }

    /// Reports whether the object belongs to the provided player.
    #[must_use]
    pub fn is_owned_by(&self, player: &PlayerName) -> bool {
        self.owner.as_ref() == Some(player)
    }

    /// Cell the object occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Variant-specific state.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Reports whether the object is a ship.
    #[must_use]
    pub const fn is_ship(&self) -> bool {
        matches!(self.kind, ObjectKind::Ship { .. })
    }

    /// Reports whether the object is a bomb.
    #[must_use]
    pub const fn is_bomb(&self) -> bool {
        matches!(self.kind, ObjectKind::Bomb)
    }

    /// Bomb stock of a ship, `None` for other kinds.
    #[must_use]
    pub const fn bombs_available(&self) -> Option<u32> {
        match self.kind {
            ObjectKind::Ship { bombs_available } => Some(bombs_available),
            _ => None,
        }
    }

    /// Moves the object to another cell. Only the world keeps cells in sync.
    pub fn set_cell(&mut self, cell: CellCoord) {
        self.cell = cell;
    }

    /// Overwrites the bomb stock of a ship. Has no effect on other kinds.
    pub fn set_bombs_available(&mut self, available: u32) {
        if let ObjectKind::Ship { bombs_available } = &mut self.kind {
            *bombs_available = available;
        }
    }

    /// Script-facing view of the object.
    #[must_use]
    pub fn view(&self) -> ObjectView {
        ObjectView {
            id: self.id.get(),
            owner: self
                .owner
                .as_ref()
                .map(|owner| owner.as_str().to_owned())
                .unwrap_or_default(),
            kind: self.kind.tag().to_owned(),
            x: self.cell.x().saturating_add(1),
            y: self.cell.y().saturating_add(1),
            bombs_available: self.bombs_available(),
        }
    }
}

/// Serialized representation of an object handed to scripts. Coordinates
/// are one-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectView {
    /// Object identifier.
    pub id: u64,
    /// Owning player or an empty string.
    pub owner: String,
    /// Object tag (`ship`, `bomb` or `explosion`).
    #[serde(rename = "type")]
    pub kind: String,
    /// One-based column.
    pub x: u32,
    /// One-based row.
    pub y: u32,
    /// Remaining bomb stock, present for ships only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bombs_available: Option<u32>,
}

/// Read-only picture of the world taken once per tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick the snapshot was taken in.
    pub tick: u64,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Cell contents indexed `[x][y]`.
    pub cells: Vec<Vec<Vec<ObjectView>>>,
}

impl WorldSnapshot {
    /// Serializes the snapshot into its published JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Iterates every object view in `[x][y]` order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectView> {
        self.cells.iter().flatten().flatten()
    }
}

/// Request to move an object. Only ships are ever moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoveIntent {
    /// Object being moved.
    pub object: ObjectId,
    /// Cell the object occupied at the start of the tick.
    pub from: CellCoord,
    /// Cell the object should occupy after resolution.
    pub to: CellCoord,
}

/// Request to drop a freshly allocated bomb into a cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlaceBombIntent {
    /// Identifier allocated for the bomb.
    pub bomb: ObjectId,
    /// Player that placed the bomb.
    pub owner: PlayerName,
    /// Cell receiving the bomb.
    pub cell: CellCoord,
}

/// Buffered change to a ship's bomb stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StockAdjustment {
    /// Ship whose stock changes.
    pub ship: ObjectId,
    /// Signed change applied to the stock.
    pub delta: i64,
}

/// Request to detonate a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DetonateIntent {
    /// Bomb to detonate.
    pub bomb: ObjectId,
}

/// Request to create a ship.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CreateShipIntent {
    /// Identifier allocated for the ship.
    pub ship: ObjectId,
    /// Player that will own the ship.
    pub owner: PlayerName,
    /// Cell receiving the ship.
    pub cell: CellCoord,
}

/// Every intent recorded during one tick, each list in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentBatch {
    /// Accepted moves.
    pub moves: Vec<MoveIntent>,
    /// Accepted bomb placements.
    pub bomb_placements: Vec<PlaceBombIntent>,
    /// Stock debits and refunds.
    pub stock_adjustments: Vec<StockAdjustment>,
    /// Accepted detonations.
    pub detonations: Vec<DetonateIntent>,
    /// Accepted ship creations.
    pub ship_creations: Vec<CreateShipIntent>,
}

impl IntentBatch {
    /// Reports whether no intent was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of recorded intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
            + self.bomb_placements.len()
            + self.stock_adjustments.len()
            + self.detonations.len()
            + self.ship_creations.len()
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Moves an object between cells.
    MoveObject {
        /// Object being moved.
        object: ObjectId,
        /// Cell the object currently occupies.
        from: CellCoord,
        /// Destination cell.
        to: CellCoord,
    },
    /// Inserts a new bomb.
    PlaceBomb {
        /// Identifier allocated for the bomb.
        bomb: ObjectId,
        /// Player owning the bomb.
        owner: PlayerName,
        /// Cell receiving the bomb.
        cell: CellCoord,
    },
    /// Applies a signed change to a ship's bomb stock.
    AdjustBombStock {
        /// Ship whose stock changes.
        ship: ObjectId,
        /// Signed change.
        delta: i64,
    },
    /// Detonates bombs in order within a single cascade pass.
    DetonateBombs {
        /// Bombs to detonate, in request order.
        bombs: Vec<ObjectId>,
    },
    /// Inserts a new ship.
    SpawnShip {
        /// Identifier allocated for the ship.
        ship: ObjectId,
        /// Player owning the ship.
        owner: PlayerName,
        /// Cell receiving the ship.
        cell: CellCoord,
    },
    /// Removes explosions created before the current tick.
    ExpireExplosions,
    /// Advances the world clock by one tick.
    AdvanceTick,
}

/// Events reported by the world after executing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// An object changed cells.
    ObjectMoved {
        /// Object that moved.
        object: ObjectId,
        /// Previous cell.
        from: CellCoord,
        /// New cell.
        to: CellCoord,
    },
    /// A bomb entered the grid.
    BombPlaced {
        /// Bomb identifier.
        bomb: ObjectId,
        /// Owning player.
        owner: PlayerName,
        /// Cell holding the bomb.
        cell: CellCoord,
    },
    /// A ship's bomb stock changed.
    BombStockChanged {
        /// Ship whose stock changed.
        ship: ObjectId,
        /// Stock after the change.
        available: u32,
    },
    /// A bomb detonated and left an explosion marker behind.
    BombDetonated {
        /// Bomb that detonated.
        bomb: ObjectId,
        /// Explosion marker created in its place.
        explosion: ObjectId,
        /// Cell of the detonation.
        cell: CellCoord,
    },
    /// A ship was caught in a blast.
    ShipDestroyed {
        /// Ship that was destroyed.
        ship: ObjectId,
        /// Owner of the destroyed ship.
        owner: PlayerName,
        /// Cell the ship occupied.
        cell: CellCoord,
    },
    /// A ship entered the grid.
    ShipSpawned {
        /// Ship identifier.
        ship: ObjectId,
        /// Owning player.
        owner: PlayerName,
        /// Cell holding the ship.
        cell: CellCoord,
    },
    /// An explosion marker was removed.
    ExplosionExpired {
        /// Explosion identifier.
        explosion: ObjectId,
        /// Cell the marker occupied.
        cell: CellCoord,
    },
    /// The world clock advanced.
    TickAdvanced {
        /// Tick that became current.
        tick: Tick,
    },
}

/// Script registered for a player in the script store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerScript {
    /// Owner of the script.
    pub player: PlayerName,
    /// Script source text.
    pub source: String,
}

/// Errors reported by external stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("store i/o failed for `{key}`")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The key cannot be represented by the store.
    #[error("invalid store key `{0}`")]
    InvalidKey(String),
}

/// Source of player scripts.
pub trait ScriptSource: Send + Sync {
    /// Lists every registered `(player, script)` pair.
    fn scripts(&self) -> Result<Vec<PlayerScript>, StoreError>;

    /// Removes and returns the pending one-off script for the player.
    fn take_one_off(&self, player: &PlayerName) -> Result<Option<String>, StoreError>;
}

/// Per-player output channels.
pub trait PlayerOutput: Send + Sync {
    /// Replaces the stdout text published for the player.
    fn set_stdout(&self, player: &PlayerName, text: &str) -> Result<(), StoreError>;

    /// Replaces the error text published for the player.
    fn set_error(&self, player: &PlayerName, text: &str) -> Result<(), StoreError>;
}

/// Destination of the serialized world published after every tick.
pub trait SnapshotSink: Send + Sync {
    /// Replaces the latest published snapshot.
    fn publish(&self, snapshot: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_stay_below_identifier_range() {
        let codes = [
            StatusCode::Ok,
            StatusCode::Error,
            StatusCode::NotFound,
            StatusCode::NoPermission,
            StatusCode::InvalidArguments,
        ];
        let values: Vec<i64> = codes.iter().map(|code| code.code()).collect();
        assert_eq!(values, vec![0, -1, -2, -3, -4]);

        let allocator = IdAllocator::new();
        let first = allocator.allocate();
        assert!(first.get() > ID_SEED);
        assert!(values.iter().all(|value| *value < first.get() as i64));
    }

    #[test]
    fn allocator_is_monotonic_and_starts_after_seed() {
        let allocator = IdAllocator::new();
        let first = allocator.allocate();
        let second = allocator.allocate();
        assert_eq!(first, ObjectId::new(1001));
        assert_eq!(second, ObjectId::new(1002));
        assert_eq!(allocator.last_issued(), 1002);
    }

    #[test]
    fn allocator_never_hands_out_duplicates_across_threads() {
        let allocator = IdAllocator::new();
        let mut ids: Vec<ObjectId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..250).map(|_| allocator.allocate()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().expect("allocator thread panicked"))
                .collect()
        });
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 2000);
    }

    #[test]
    fn one_based_conversion_rejects_off_grid_values() {
        let size = GridSize::new(20, 20);
        assert_eq!(CellCoord::from_one_based(1, 1, size), Some(CellCoord::new(0, 0)));
        assert_eq!(
            CellCoord::from_one_based(20, 20, size),
            Some(CellCoord::new(19, 19))
        );
        assert_eq!(CellCoord::from_one_based(0, 5, size), None);
        assert_eq!(CellCoord::from_one_based(21, 5, size), None);
        assert_eq!(CellCoord::from_one_based(-3, 5, size), None);
    }

    #[test]
    fn offsets_stay_within_grid() {
        let size = GridSize::new(5, 5);
        let origin = CellCoord::new(0, 4);
        assert_eq!(origin.offset(1, -1, size), Some(CellCoord::new(1, 3)));
        assert_eq!(origin.offset(-1, 0, size), None);
        assert_eq!(origin.offset(0, 1, size), None);
        assert_eq!(origin.offset(i64::MAX, 0, size), None);
    }

    #[test]
    fn ship_view_uses_one_based_coordinates() {
        let ship = GameObject::ship(
            ObjectId::new(1001),
            PlayerName::new("P1"),
            CellCoord::new(4, 7),
        );
        let view = ship.view();
        assert_eq!(view.x, 5);
        assert_eq!(view.y, 8);
        assert_eq!(view.kind, "ship");
        assert_eq!(view.owner, "P1");
        assert_eq!(view.bombs_available, Some(STARTING_BOMB_STOCK));
    }

    #[test]
    fn explosion_view_has_empty_owner_and_no_stock() {
        let explosion =
            GameObject::explosion(ObjectId::new(1005), CellCoord::new(0, 0), Tick::new(3));
        let json = serde_json::to_value(explosion.view()).expect("view serializes");
        assert_eq!(json["owner"], "");
        assert_eq!(json["type"], "explosion");
        assert!(json.get("bombs_available").is_none());
    }
}
