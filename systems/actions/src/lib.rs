#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Action intake that validates player intents during the script phase.
//!
//! A [`TickIntake`] is opened from the world once per tick, before any script
//! runs. Scripts act through per-player [`PlayerActions`] capabilities that
//! validate against the pre-tick world plus everything already recorded this
//! tick, and append accepted intents to a shared ledger. The world itself is
//! never touched; the orchestrator drains the ledger into an [`IntentBatch`]
//! once the script phase is over.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use aiwar_core::{
    ActionResult, CellCoord, CreateShipIntent, DetonateIntent, GameObject, GridSize,
    IdAllocator, IntentBatch, MoveIntent, ObjectId, ObjectView, PlaceBombIntent, PlayerName,
    StatusCode, StockAdjustment,
};
use aiwar_world::{query, World};

/// Shared intake collecting intents from every player during one tick.
#[derive(Debug)]
pub struct TickIntake {
    size: GridSize,
    ids: Arc<IdAllocator>,
    objects: HashMap<ObjectId, GameObject>,
    ships: HashMap<PlayerName, ObjectId>,
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    sealed: bool,
    batch: IntentBatch,
    positions: HashMap<ObjectId, CellCoord>,
    stock: HashMap<ObjectId, u32>,
    ship_requests: HashSet<PlayerName>,
}

impl TickIntake {
    /// Indexes the world as it stands before the script phase.
    #[must_use]
    pub fn open(world: &World, ids: Arc<IdAllocator>) -> Arc<Self> {
        let objects: HashMap<ObjectId, GameObject> = query::objects(world)
            .map(|object| (object.id(), object.clone()))
            .collect();
        let ships = objects
            .values()
            .filter(|object| object.is_ship())
            .filter_map(|ship| Some((ship.owner()?.clone(), ship.id())))
            .collect();

        Arc::new(Self {
            size: query::size(world),
            ids,
            objects,
            ships,
            ledger: Mutex::new(Ledger::default()),
        })
    }

    /// Builds the capability handed to one player's script session.
    #[must_use]
    pub fn actions_for(self: &Arc<Self>, player: PlayerName) -> PlayerActions {
        PlayerActions {
            intake: Arc::clone(self),
            player,
        }
    }

    /// Stops accepting intents. Later calls fail with `ERROR`.
    pub fn seal(&self) {
        self.ledger().sealed = true;
    }

    /// Reports whether the intake stopped accepting intents.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.ledger().sealed
    }

    /// Seals the intake and hands over every recorded intent.
    #[must_use]
    pub fn drain(&self) -> IntentBatch {
        let mut ledger = self.ledger();
        ledger.sealed = true;
        ledger.positions.clear();
        ledger.stock.clear();
        ledger.ship_requests.clear();
        std::mem::take(&mut ledger.batch)
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_ledger(&self) -> ActionResult<MutexGuard<'_, Ledger>> {
        let ledger = self.ledger();
        if ledger.sealed {
            return Err(StatusCode::Error);
        }
        Ok(ledger)
    }

    /// The player's ship with this tick's pending move and stock applied.
    fn current_ship(&self, ledger: &Ledger, player: &PlayerName) -> Option<GameObject> {
        let id = self.ships.get(player)?;
        let mut ship = self.objects.get(id)?.clone();
        if let Some(cell) = ledger.positions.get(id) {
            ship.set_cell(*cell);
        }
        if let Some(stock) = ledger.stock.get(id) {
            ship.set_bombs_available(*stock);
        }
        Some(ship)
    }
}

/// Actions available to a single player's script, closed over that player.
#[derive(Clone, Debug)]
pub struct PlayerActions {
    intake: Arc<TickIntake>,
    player: PlayerName,
}

impl PlayerActions {
    /// Player on whose behalf actions are taken.
    #[must_use]
    pub fn player(&self) -> &PlayerName {
        &self.player
    }

    /// Dimensions of the grid the actions validate against.
    #[must_use]
    pub fn grid_size(&self) -> GridSize {
        self.intake.size
    }

    /// Requests that an owned ship move by `(dx, dy)` cells.
    ///
    /// Each object accepts one move per tick. Later calls in the same tick
    /// observe the new position.
    pub fn move_object(&self, object: ObjectId, dx: i64, dy: i64) -> ActionResult<()> {
        let intake = &*self.intake;
        let mut ledger = intake.open_ledger()?;
        let target = intake.objects.get(&object).ok_or(StatusCode::NotFound)?;
        if !target.is_owned_by(&self.player) {
            return Err(StatusCode::NoPermission);
        }
        if !target.is_ship() {
            return Err(StatusCode::InvalidArguments);
        }
        if ledger.positions.contains_key(&object) {
            return Err(StatusCode::Error);
        }

        let from = target.cell();
        let to = from
            .offset(dx, dy, intake.size)
            .ok_or(StatusCode::InvalidArguments)?;
        let _ = ledger.positions.insert(object, to);
        ledger.batch.moves.push(MoveIntent { object, from, to });
        Ok(())
    }

    /// Drops a bomb at the current position of the player's ship.
    pub fn place_bomb(&self) -> ActionResult<ObjectView> {
        let intake = &*self.intake;
        let mut ledger = intake.open_ledger()?;
        let ship = intake
            .current_ship(&ledger, &self.player)
            .ok_or(StatusCode::Error)?;
        let available = ship.bombs_available().unwrap_or(0);
        if available == 0 {
            return Err(StatusCode::Error);
        }

        let _ = ledger.stock.insert(ship.id(), available - 1);
        ledger.batch.stock_adjustments.push(StockAdjustment {
            ship: ship.id(),
            delta: -1,
        });
        let bomb = GameObject::bomb(intake.ids.allocate(), self.player.clone(), ship.cell());
        ledger.batch.bomb_placements.push(PlaceBombIntent {
            bomb: bomb.id(),
            owner: self.player.clone(),
            cell: bomb.cell(),
        });
        Ok(bomb.view())
    }

    /// Requests detonation of one of the player's bombs.
    ///
    /// Whatever the outcome, the caller's ship (if any) gets one bomb back.
    pub fn explode(&self, bomb: ObjectId) -> ActionResult<()> {
        let intake = &*self.intake;
        let mut ledger = intake.open_ledger()?;
        if let Some(ship) = intake.current_ship(&ledger, &self.player) {
            let refunded = ship.bombs_available().unwrap_or(0).saturating_add(1);
            let _ = ledger.stock.insert(ship.id(), refunded);
            ledger.batch.stock_adjustments.push(StockAdjustment {
                ship: ship.id(),
                delta: 1,
            });
        }

        let target = intake
            .objects
            .get(&bomb)
            .filter(|object| object.is_bomb())
            .ok_or(StatusCode::NotFound)?;
        if !target.is_owned_by(&self.player) {
            return Err(StatusCode::NoPermission);
        }
        ledger.batch.detonations.push(DetonateIntent { bomb });
        Ok(())
    }

    /// View of the player's ship including this tick's pending changes.
    pub fn my_ship(&self) -> ActionResult<ObjectView> {
        let intake = &*self.intake;
        let ledger = intake.ledger();
        intake
            .current_ship(&ledger, &self.player)
            .map(|ship| ship.view())
            .ok_or(StatusCode::NotFound)
    }

    /// Requests a ship at one-based coordinates `(x, y)`.
    pub fn create_ship(&self, x: i64, y: i64) -> ActionResult<ObjectId> {
        let intake = &*self.intake;
        let mut ledger = intake.open_ledger()?;
        let cell =
            CellCoord::from_one_based(x, y, intake.size).ok_or(StatusCode::InvalidArguments)?;
        if intake.ships.contains_key(&self.player) {
            return Err(StatusCode::Error);
        }
        if !ledger.ship_requests.insert(self.player.clone()) {
            return Err(StatusCode::Error);
        }

        let ship = intake.ids.allocate();
        ledger.batch.ship_creations.push(CreateShipIntent {
            ship,
            owner: self.player.clone(),
            cell,
        });
        Ok(ship)
    }
}
