use std::{collections::HashSet, sync::Arc, thread};

use aiwar_core::{
    CellCoord, Command, GridSize, IdAllocator, ObjectId, PlayerName, StatusCode, StockAdjustment,
    STARTING_BOMB_STOCK,
};
use aiwar_system_actions::TickIntake;
use aiwar_world::{self as world, World};

struct Fixture {
    world: World,
    ids: Arc<IdAllocator>,
}

impl Fixture {
    fn new() -> Self {
        let ids = Arc::new(IdAllocator::new());
        Self {
            world: World::new(GridSize::new(20, 20), Arc::clone(&ids)),
            ids,
        }
    }

    fn ship(&mut self, owner: &str, x: u32, y: u32) -> ObjectId {
        let ship = self.ids.allocate();
        self.run(Command::SpawnShip {
            ship,
            owner: PlayerName::new(owner),
            cell: CellCoord::new(x, y),
        });
        ship
    }

    fn bomb(&mut self, owner: &str, x: u32, y: u32) -> ObjectId {
        let bomb = self.ids.allocate();
        self.run(Command::PlaceBomb {
            bomb,
            owner: PlayerName::new(owner),
            cell: CellCoord::new(x, y),
        });
        bomb
    }

    fn run(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events).expect("fixture command applies");
    }

    fn intake(&self) -> Arc<TickIntake> {
        TickIntake::open(&self.world, Arc::clone(&self.ids))
    }
}

fn p(name: &str) -> PlayerName {
    PlayerName::new(name)
}

#[test]
fn move_reports_codes_in_validation_order() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 3, 3);
    let bomb = fixture.bomb("P1", 4, 4);
    let intake = fixture.intake();
    let owner = intake.actions_for(p("P1"));
    let stranger = intake.actions_for(p("P2"));

    assert_eq!(
        owner.move_object(ObjectId::new(9_999), 1, 0),
        Err(StatusCode::NotFound)
    );
    assert_eq!(
        stranger.move_object(ship, 1, 0),
        Err(StatusCode::NoPermission)
    );
    assert_eq!(
        owner.move_object(bomb, 1, 0),
        Err(StatusCode::InvalidArguments)
    );
    assert_eq!(owner.move_object(ship, 1, 0), Ok(()));
    assert_eq!(owner.move_object(ship, 1, 0), Err(StatusCode::Error));

    let batch = intake.drain();
    assert_eq!(batch.moves.len(), 1);
    assert_eq!(batch.moves[0].from, CellCoord::new(3, 3));
    assert_eq!(batch.moves[0].to, CellCoord::new(4, 3));
}

#[test]
fn out_of_bounds_move_leaves_position_unchanged() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 0, 0);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    assert_eq!(
        actions.move_object(ship, -1, 0),
        Err(StatusCode::InvalidArguments)
    );
    assert_eq!(
        actions.move_object(ship, 0, 20),
        Err(StatusCode::InvalidArguments)
    );

    let view = actions.my_ship().expect("ship exists");
    assert_eq!((view.x, view.y), (1, 1));
    // A rejected move does not use up the one move per tick.
    assert_eq!(actions.move_object(ship, 2, 2), Ok(()));
    assert!(intake.drain().moves.len() == 1);
}

#[test]
fn later_calls_observe_the_pending_move() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 3, 3);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    actions.move_object(ship, 2, -1).expect("move accepted");
    let view = actions.my_ship().expect("ship exists");
    assert_eq!((view.x, view.y), (6, 3));

    let bomb = actions.place_bomb().expect("bomb placed");
    assert_eq!((bomb.x, bomb.y), (6, 3));
    assert_eq!(intake.drain().bomb_placements[0].cell, CellCoord::new(5, 2));
}

#[test]
fn place_bomb_draws_down_stock_one_at_a_time() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 3, 3);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    let mut placed = Vec::new();
    for expected_left in (0..STARTING_BOMB_STOCK).rev() {
        let bomb = actions.place_bomb().expect("stock available");
        assert_eq!(bomb.kind, "bomb");
        assert_eq!(bomb.owner, "P1");
        placed.push(bomb.id);
        let view = actions.my_ship().expect("ship exists");
        assert_eq!(view.bombs_available, Some(expected_left));
    }
    assert_eq!(actions.place_bomb(), Err(StatusCode::Error));
    assert_eq!(
        actions.my_ship().expect("ship exists").bombs_available,
        Some(0)
    );

    let batch = intake.drain();
    assert_eq!(batch.bomb_placements.len(), 3);
    assert_eq!(
        batch.stock_adjustments,
        vec![StockAdjustment { ship, delta: -1 }; 3]
    );
    let unique: HashSet<u64> = placed.into_iter().collect();
    assert_eq!(unique.len(), 3);
}

#[test]
fn place_bomb_without_a_ship_fails() {
    let fixture = Fixture::new();
    let intake = fixture.intake();

    assert_eq!(
        intake.actions_for(p("P1")).place_bomb(),
        Err(StatusCode::Error)
    );
    assert!(intake.drain().is_empty());
}

#[test]
fn explode_refunds_stock_whatever_the_outcome() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 3, 3);
    let own = fixture.bomb("P1", 5, 5);
    let foreign = fixture.bomb("P2", 6, 6);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    assert_eq!(
        actions.explode(ObjectId::new(9_999)),
        Err(StatusCode::NotFound)
    );
    assert_eq!(actions.explode(foreign), Err(StatusCode::NoPermission));
    assert_eq!(actions.explode(ship), Err(StatusCode::NotFound));
    assert_eq!(actions.explode(own), Ok(()));

    assert_eq!(
        actions.my_ship().expect("ship exists").bombs_available,
        Some(STARTING_BOMB_STOCK + 4)
    );
    let batch = intake.drain();
    assert_eq!(batch.detonations.len(), 1);
    assert_eq!(batch.detonations[0].bomb, own);
    assert_eq!(
        batch.stock_adjustments,
        vec![StockAdjustment { ship, delta: 1 }; 4]
    );
}

#[test]
fn explode_without_a_ship_records_no_refund() {
    let mut fixture = Fixture::new();
    let bomb = fixture.bomb("P1", 5, 5);
    let intake = fixture.intake();

    assert_eq!(intake.actions_for(p("P1")).explode(bomb), Ok(()));

    let batch = intake.drain();
    assert!(batch.stock_adjustments.is_empty());
    assert_eq!(batch.detonations.len(), 1);
}

#[test]
fn bombs_placed_this_tick_cannot_be_exploded_yet() {
    let mut fixture = Fixture::new();
    let _ship = fixture.ship("P1", 3, 3);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    let bomb = actions.place_bomb().expect("bomb placed");
    assert_eq!(
        actions.explode(ObjectId::new(bomb.id)),
        Err(StatusCode::NotFound)
    );
}

#[test]
fn my_ship_reports_not_found_without_a_ship() {
    let mut fixture = Fixture::new();
    let _ship = fixture.ship("P1", 3, 3);
    let intake = fixture.intake();

    let view = intake.actions_for(p("P1")).my_ship().expect("ship exists");
    assert_eq!(view.kind, "ship");
    assert_eq!(view.bombs_available, Some(STARTING_BOMB_STOCK));
    assert_eq!(
        intake.actions_for(p("P2")).my_ship(),
        Err(StatusCode::NotFound)
    );
}

#[test]
fn create_ship_is_limited_to_one_per_player() {
    let mut fixture = Fixture::new();
    let _existing = fixture.ship("P1", 3, 3);
    let intake = fixture.intake();
    let veteran = intake.actions_for(p("P1"));
    let newcomer = intake.actions_for(p("P2"));

    assert_eq!(veteran.create_ship(1, 1), Err(StatusCode::Error));
    assert_eq!(newcomer.create_ship(0, 1), Err(StatusCode::InvalidArguments));
    assert_eq!(newcomer.create_ship(21, 1), Err(StatusCode::InvalidArguments));

    let ship = newcomer.create_ship(20, 20).expect("ship requested");
    assert_eq!(newcomer.create_ship(2, 2), Err(StatusCode::Error));
    // The requested ship does not exist until resolution.
    assert_eq!(newcomer.my_ship(), Err(StatusCode::NotFound));

    let batch = intake.drain();
    assert_eq!(batch.ship_creations.len(), 1);
    assert_eq!(batch.ship_creations[0].ship, ship);
    assert_eq!(batch.ship_creations[0].cell, CellCoord::new(19, 19));
}

#[test]
fn concurrent_players_receive_unique_identifiers() {
    let fixture = Fixture::new();
    let intake = fixture.intake();

    let handles: Vec<_> = (0..16)
        .map(|index| {
            let actions = intake.actions_for(p(&format!("P{index}")));
            thread::spawn(move || {
                let ship = actions.create_ship(index + 1, 1).expect("ship requested");
                ship.get()
            })
        })
        .collect();

    let ids: HashSet<u64> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker finished"))
        .collect();
    assert_eq!(ids.len(), 16);
    assert!(ids.iter().all(|id| *id > 1000));
    assert_eq!(intake.drain().ship_creations.len(), 16);
}

#[test]
fn sealed_intake_rejects_everything_and_records_nothing() {
    let mut fixture = Fixture::new();
    let ship = fixture.ship("P1", 3, 3);
    let bomb = fixture.bomb("P1", 5, 5);
    let intake = fixture.intake();
    let actions = intake.actions_for(p("P1"));

    intake.seal();

    assert_eq!(actions.move_object(ship, 1, 0), Err(StatusCode::Error));
    assert_eq!(actions.place_bomb(), Err(StatusCode::Error));
    assert_eq!(actions.explode(bomb), Err(StatusCode::Error));
    assert_eq!(
        actions.my_ship().expect("reads still work").bombs_available,
        Some(STARTING_BOMB_STOCK)
    );
    assert!(intake.drain().is_empty());
}
