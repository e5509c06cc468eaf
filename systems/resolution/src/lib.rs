#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns a tick's intents into world commands.
//!
//! Commands are planned in a fixed order: moves, bomb placements and stock
//! adjustments first, then a single detonation pass, then ship creations.
//! Expiring explosions is planned separately because it belongs to the
//! cleanup phase that follows resolution.

use aiwar_core::{Command, Event, IntentBatch};
use aiwar_world::{self as world, ResolutionError, World};

/// Plans the commands that resolve one tick.
#[derive(Debug, Default)]
pub struct Resolution;

impl Resolution {
    /// Creates the resolution system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emits the commands resolving `batch`, in application order.
    pub fn plan(&mut self, batch: IntentBatch, out: &mut Vec<Command>) {
        let IntentBatch {
            moves,
            bomb_placements,
            stock_adjustments,
            detonations,
            ship_creations,
        } = batch;

        out.extend(moves.into_iter().map(|intent| Command::MoveObject {
            object: intent.object,
            from: intent.from,
            to: intent.to,
        }));
        out.extend(bomb_placements.into_iter().map(|intent| Command::PlaceBomb {
            bomb: intent.bomb,
            owner: intent.owner,
            cell: intent.cell,
        }));
        out.extend(
            stock_adjustments
                .into_iter()
                .map(|adjustment| Command::AdjustBombStock {
                    ship: adjustment.ship,
                    delta: adjustment.delta,
                }),
        );
        if !detonations.is_empty() {
            out.push(Command::DetonateBombs {
                bombs: detonations.into_iter().map(|intent| intent.bomb).collect(),
            });
        }
        out.extend(ship_creations.into_iter().map(|intent| Command::SpawnShip {
            ship: intent.ship,
            owner: intent.owner,
            cell: intent.cell,
        }));
    }

    /// Emits the end-of-tick cleanup commands.
    pub fn cleanup(&mut self, out: &mut Vec<Command>) {
        out.push(Command::ExpireExplosions);
    }
}

/// Applies planned commands in order, stopping at the first fault.
pub fn execute(
    world: &mut World,
    commands: Vec<Command>,
    out_events: &mut Vec<Event>,
) -> Result<(), ResolutionError> {
    for command in commands {
        world::apply(world, command, out_events)?;
    }
    Ok(())
}

/// Tally of what a resolved tick did to the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Objects that changed cells.
    pub moved: usize,
    /// Bombs inserted into the grid.
    pub bombs_placed: usize,
    /// Bombs that detonated, chain reactions included.
    pub detonated: usize,
    /// Ships destroyed by explosions.
    pub ships_destroyed: usize,
    /// Ships inserted into the grid.
    pub ships_spawned: usize,
    /// Explosion markers removed.
    pub explosions_expired: usize,
}

impl ResolutionSummary {
    /// Counts the events emitted while resolving a tick.
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event {
                Event::ObjectMoved { .. } => summary.moved += 1,
                Event::BombPlaced { .. } => summary.bombs_placed += 1,
                Event::BombDetonated { .. } => summary.detonated += 1,
                Event::ShipDestroyed { .. } => summary.ships_destroyed += 1,
                Event::ShipSpawned { .. } => summary.ships_spawned += 1,
                Event::ExplosionExpired { .. } => summary.explosions_expired += 1,
                Event::BombStockChanged { .. } | Event::TickAdvanced { .. } => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use aiwar_core::{
        CellCoord, CreateShipIntent, DetonateIntent, MoveIntent, ObjectId, PlaceBombIntent,
        PlayerName, StockAdjustment,
    };

    use super::*;

    #[test]
    fn plan_orders_steps_regardless_of_arrival() {
        let owner = PlayerName::new("P1");
        let batch = IntentBatch {
            moves: vec![MoveIntent {
                object: ObjectId::new(1),
                from: CellCoord::new(0, 0),
                to: CellCoord::new(1, 0),
            }],
            bomb_placements: vec![PlaceBombIntent {
                bomb: ObjectId::new(5),
                owner: owner.clone(),
                cell: CellCoord::new(1, 0),
            }],
            stock_adjustments: vec![StockAdjustment {
                ship: ObjectId::new(1),
                delta: -1,
            }],
            detonations: vec![
                DetonateIntent {
                    bomb: ObjectId::new(3),
                },
                DetonateIntent {
                    bomb: ObjectId::new(2),
                },
            ],
            ship_creations: vec![CreateShipIntent {
                ship: ObjectId::new(6),
                owner: PlayerName::new("P2"),
                cell: CellCoord::new(4, 4),
            }],
        };

        let mut commands = Vec::new();
        Resolution::new().plan(batch, &mut commands);

        assert!(matches!(commands[0], Command::MoveObject { .. }));
        assert!(matches!(commands[1], Command::PlaceBomb { .. }));
        assert!(matches!(commands[2], Command::AdjustBombStock { delta: -1, .. }));
        assert_eq!(
            commands[3],
            Command::DetonateBombs {
                bombs: vec![ObjectId::new(3), ObjectId::new(2)],
            }
        );
        assert!(matches!(commands[4], Command::SpawnShip { .. }));
        assert_eq!(commands.len(), 5);
    }

    #[test]
    fn empty_batch_plans_nothing() {
        let mut commands = Vec::new();
        Resolution::new().plan(IntentBatch::default(), &mut commands);
        assert!(commands.is_empty());

        Resolution::new().cleanup(&mut commands);
        assert_eq!(commands, vec![Command::ExpireExplosions]);
    }
}
