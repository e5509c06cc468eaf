//! Explosion chain reactions.
//!
//! A detonating bomb is replaced by an explosion marker, sets off every other
//! bomb inside its blast window and destroys every ship there. A destroyed
//! ship takes all of its owner's remaining bombs with it. Each bomb goes off
//! at most once per pass, however many chains reach it.

use std::collections::HashSet;

use aiwar_core::{CellCoord, Event, GameObject, ObjectId, BLAST_RADIUS};

use crate::{ResolutionError, World};

/// Detonates the requested bombs, in order, within a single pass.
pub(crate) fn detonate(
    world: &mut World,
    bombs: &[ObjectId],
    out_events: &mut Vec<Event>,
) -> Result<(), ResolutionError> {
    let mut detonated = HashSet::new();
    for bomb in bombs {
        explode(world, *bomb, &mut detonated, out_events)?;
    }
    Ok(())
}

fn explode(
    world: &mut World,
    bomb: ObjectId,
    detonated: &mut HashSet<ObjectId>,
    out_events: &mut Vec<Event>,
) -> Result<(), ResolutionError> {
    if !detonated.insert(bomb) {
        return Ok(());
    }
    // A bomb consumed by an earlier chain in this pass is simply gone.
    if !world.object(bomb).is_some_and(GameObject::is_bomb) {
        return Ok(());
    }
    let Some(removed) = world.remove(bomb) else {
        return Ok(());
    };

    let cell = removed.cell();
    let explosion = world.ids.allocate();
    world.insert(GameObject::explosion(explosion, cell, world.tick))?;
    out_events.push(Event::BombDetonated {
        bomb,
        explosion,
        cell,
    });

    let (bombs_in_range, ships_in_range) = blast_window(world, cell);

    for other in bombs_in_range {
        explode(world, other, detonated, out_events)?;
    }

    for ship in ships_in_range {
        // Nested chains may already have destroyed it.
        let Some(destroyed) = world.remove(ship) else {
            continue;
        };
        let Some(owner) = destroyed.owner().cloned() else {
            continue;
        };
        out_events.push(Event::ShipDestroyed {
            ship,
            owner: owner.clone(),
            cell: destroyed.cell(),
        });

        let owned: Vec<ObjectId> = world
            .objects()
            .filter(|object| object.is_bomb() && object.is_owned_by(&owner))
            .map(GameObject::id)
            .collect();
        for owned_bomb in owned {
            explode(world, owned_bomb, detonated, out_events)?;
        }
    }

    Ok(())
}

/// Bombs and ships inside the square window around `center`, clipped to the
/// grid, in `[x][y]` order.
fn blast_window(world: &World, center: CellCoord) -> (Vec<ObjectId>, Vec<ObjectId>) {
    let size = world.size;
    let min_x = center.x().saturating_sub(BLAST_RADIUS);
    let max_x = center
        .x()
        .saturating_add(BLAST_RADIUS)
        .min(size.width().saturating_sub(1));
    let min_y = center.y().saturating_sub(BLAST_RADIUS);
    let max_y = center
        .y()
        .saturating_add(BLAST_RADIUS)
        .min(size.height().saturating_sub(1));

    let mut bombs = Vec::new();
    let mut ships = Vec::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            for object in world.cell_objects(CellCoord::new(x, y)) {
                if object.is_bomb() {
                    bombs.push(object.id());
                } else if object.is_ship() {
                    ships.push(object.id());
                }
            }
        }
    }
    (bombs, ships)
}
