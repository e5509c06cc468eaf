#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for AI War.
//!
//! The world is a fixed grid of cells, each holding an unordered set of
//! objects. It is mutated exclusively through [`apply`], which runs on a
//! single thread during resolution; everything else reads through [`query`].

mod cascade;

use std::{collections::HashMap, sync::Arc};

use aiwar_core::{
    CellCoord, Command, Event, GameObject, GridSize, IdAllocator, ObjectId, ObjectKind,
    PlayerName, Tick,
};
use thiserror::Error;

/// Faults raised while applying a command. Each one means the command stream
/// disagrees with the world and the tick cannot be resolved safely.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The command referenced an object that is not alive.
    #[error("object {object} is not in the world")]
    UnknownObject {
        /// Missing object.
        object: ObjectId,
    },
    /// A move expected the object somewhere else.
    #[error("object {object} expected at {expected} but found at {actual}")]
    ObjectNotAt {
        /// Object being moved.
        object: ObjectId,
        /// Cell named by the command.
        expected: CellCoord,
        /// Cell the object actually occupies.
        actual: CellCoord,
    },
    /// The command referenced a cell outside the grid.
    #[error("cell {cell} lies outside the grid")]
    OffGrid {
        /// Offending cell.
        cell: CellCoord,
    },
    /// A ship-only command targeted another kind of object.
    #[error("object {object} is not a ship")]
    NotAShip {
        /// Offending object.
        object: ObjectId,
    },
    /// An identifier was inserted twice.
    #[error("object {object} already exists")]
    DuplicateObject {
        /// Duplicate identifier.
        object: ObjectId,
    },
    /// A second ship was requested for a player.
    #[error("player `{owner}` already owns a ship")]
    ShipAlreadyOwned {
        /// Player that already owns a ship.
        owner: PlayerName,
    },
    /// A stock adjustment would drive a ship's stock negative.
    #[error("bomb stock of ship {ship} would drop below zero")]
    StockUnderflow {
        /// Ship whose stock was adjusted.
        ship: ObjectId,
    },
}

/// Represents the authoritative AI War world state.
#[derive(Debug)]
pub struct World {
    size: GridSize,
    cells: Vec<Cell>,
    locations: HashMap<ObjectId, CellCoord>,
    ids: Arc<IdAllocator>,
    tick: Tick,
}

#[derive(Clone, Debug, Default)]
struct Cell {
    objects: Vec<GameObject>,
}

impl World {
    /// Creates an empty world of the given size at tick zero.
    #[must_use]
    pub fn new(size: GridSize, ids: Arc<IdAllocator>) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.cell_count()],
            locations: HashMap::new(),
            ids,
            tick: Tick::default(),
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.size.contains(cell) {
            return None;
        }
        let x = usize::try_from(cell.x()).ok()?;
        let y = usize::try_from(cell.y()).ok()?;
        let height = usize::try_from(self.size.height()).ok()?;
        Some(x * height + y)
    }

    fn cell_objects(&self, cell: CellCoord) -> &[GameObject] {
        match self.index(cell).and_then(|index| self.cells.get(index)) {
            Some(cell) => cell.objects.as_slice(),
            None => &[],
        }
    }

    fn object(&self, id: ObjectId) -> Option<&GameObject> {
        let cell = self.locations.get(&id)?;
        self.cell_objects(*cell).iter().find(|object| object.id() == id)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        let cell = *self.locations.get(&id)?;
        let index = self.index(cell)?;
        self.cells
            .get_mut(index)?
            .objects
            .iter_mut()
            .find(|object| object.id() == id)
    }

    fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.cells.iter().flat_map(|cell| cell.objects.iter())
    }

    fn ship_of(&self, player: &PlayerName) -> Option<&GameObject> {
        self.objects()
            .find(|object| object.is_ship() && object.is_owned_by(player))
    }

    fn insert(&mut self, object: GameObject) -> Result<(), ResolutionError> {
        let cell = object.cell();
        let index = self.index(cell).ok_or(ResolutionError::OffGrid { cell })?;
        if self.locations.contains_key(&object.id()) {
            return Err(ResolutionError::DuplicateObject {
                object: object.id(),
            });
        }
        let _ = self.locations.insert(object.id(), cell);
        self.cells[index].objects.push(object);
        Ok(())
    }

    fn remove(&mut self, id: ObjectId) -> Option<GameObject> {
        let cell = self.locations.remove(&id)?;
        let index = self.index(cell)?;
        let objects = &mut self.cells.get_mut(index)?.objects;
        let position = objects.iter().position(|object| object.id() == id)?;
        Some(objects.remove(position))
    }

    fn move_object(
        &mut self,
        object: ObjectId,
        from: CellCoord,
        to: CellCoord,
    ) -> Result<(), ResolutionError> {
        let actual = *self
            .locations
            .get(&object)
            .ok_or(ResolutionError::UnknownObject { object })?;
        if actual != from {
            return Err(ResolutionError::ObjectNotAt {
                object,
                expected: from,
                actual,
            });
        }
        if !self.size.contains(to) {
            return Err(ResolutionError::OffGrid { cell: to });
        }
        let mut moving = self
            .remove(object)
            .ok_or(ResolutionError::UnknownObject { object })?;
        moving.set_cell(to);
        self.insert(moving)
    }

    fn adjust_stock(&mut self, ship: ObjectId, delta: i64) -> Result<u32, ResolutionError> {
        let object = self
            .object_mut(ship)
            .ok_or(ResolutionError::UnknownObject { object: ship })?;
        let current = object
            .bombs_available()
            .ok_or(ResolutionError::NotAShip { object: ship })?;
        let updated = i64::from(current)
            .checked_add(delta)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or(ResolutionError::StockUnderflow { ship })?;
        object.set_bombs_available(updated);
        Ok(updated)
    }

    fn expire_explosions(&mut self, out_events: &mut Vec<Event>) {
        let current = self.tick;
        let expired: Vec<ObjectId> = self
            .objects()
            .filter(|object| match object.kind() {
                ObjectKind::Explosion { tick_created } => tick_created < current,
                _ => false,
            })
            .map(GameObject::id)
            .collect();

        for explosion in expired {
            if let Some(removed) = self.remove(explosion) {
                out_events.push(Event::ExplosionExpired {
                    explosion,
                    cell: removed.cell(),
                });
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// An error means the command stream is malformed; the tick being resolved
/// must be abandoned.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), ResolutionError> {
    match command {
        Command::MoveObject { object, from, to } => {
            world.move_object(object, from, to)?;
            out_events.push(Event::ObjectMoved { object, from, to });
        }
        Command::PlaceBomb { bomb, owner, cell } => {
            world.insert(GameObject::bomb(bomb, owner.clone(), cell))?;
            out_events.push(Event::BombPlaced { bomb, owner, cell });
        }
        Command::AdjustBombStock { ship, delta } => {
            let available = world.adjust_stock(ship, delta)?;
            out_events.push(Event::BombStockChanged { ship, available });
        }
        Command::DetonateBombs { bombs } => {
            cascade::detonate(world, &bombs, out_events)?;
        }
        Command::SpawnShip { ship, owner, cell } => {
            if world.ship_of(&owner).is_some() {
                return Err(ResolutionError::ShipAlreadyOwned { owner });
            }
            world.insert(GameObject::ship(ship, owner.clone(), cell))?;
            out_events.push(Event::ShipSpawned { ship, owner, cell });
        }
        Command::ExpireExplosions => world.expire_explosions(out_events),
        Command::AdvanceTick => {
            world.tick = world.tick.next();
            out_events.push(Event::TickAdvanced { tick: world.tick });
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use aiwar_core::{CellCoord, GameObject, GridSize, ObjectId, PlayerName, Tick, WorldSnapshot};

    use super::World;

    /// Dimensions of the grid.
    #[must_use]
    pub fn size(world: &World) -> GridSize {
        world.size
    }

    /// Current tick of the world clock.
    #[must_use]
    pub fn tick(world: &World) -> Tick {
        world.tick
    }

    /// Looks up a live object by identifier.
    #[must_use]
    pub fn object(world: &World, id: ObjectId) -> Option<&GameObject> {
        world.object(id)
    }

    /// Iterates every live object in `[x][y]` cell order.
    pub fn objects(world: &World) -> impl Iterator<Item = &GameObject> {
        world.objects()
    }

    /// Objects currently occupying a cell. Empty for cells off the grid.
    #[must_use]
    pub fn cell_contents(world: &World, cell: CellCoord) -> &[GameObject] {
        world.cell_objects(cell)
    }

    /// Ship owned by the player, if one is alive.
    #[must_use]
    pub fn ship_of<'world>(world: &'world World, player: &PlayerName) -> Option<&'world GameObject> {
        world.ship_of(player)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(world: &World) -> usize {
        world.locations.len()
    }

    /// Captures the script-facing snapshot of the whole grid.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        let size = world.size;
        let cells = (0..size.width())
            .map(|x| {
                (0..size.height())
                    .map(|y| {
                        world
                            .cell_objects(CellCoord::new(x, y))
                            .iter()
                            .map(GameObject::view)
                            .collect()
                    })
                    .collect()
            })
            .collect();
        WorldSnapshot {
            tick: world.tick.get(),
            width: size.width(),
            height: size.height(),
            cells,
        }
    }

    /// Verifies that every live object sits in exactly one cell, the one
    /// matching its own coordinates.
    #[must_use]
    pub fn is_consistent(world: &World) -> bool {
        let mut seen = 0usize;
        for x in 0..world.size.width() {
            for y in 0..world.size.height() {
                let cell = CellCoord::new(x, y);
                for object in world.cell_objects(cell) {
                    seen += 1;
                    if object.cell() != cell || world.locations.get(&object.id()) != Some(&cell) {
                        return false;
                    }
                }
            }
        }
        seen == world.locations.len()
    }
}
