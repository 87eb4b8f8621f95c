//! A tiny simulation: bodies orbit in fixed steps, escapes are reported as
//! events, and a render phase prints the frame.
//!
//! Run with `cargo run --example orbit`.

use ember_engine::prelude::*;

#[derive(Component, Clone, Default, Debug)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component, Clone, Default, Debug)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Component, Clone, Default, Debug)]
struct Name(String);

#[derive(Event, Debug)]
struct Escaped {
    name: String,
    distance: f32,
}

#[derive(Resource)]
struct FrameCount(u32);

define_phase!(FixedUpdate, Update, Render);
define_set!(Physics);

const ESCAPE_RADIUS: f32 = 12.0;

fn gravity(query: Query<(&Position, &mut Velocity)>) {
    for (position, velocity) in query {
        let distance = (position.x * position.x + position.y * position.y).sqrt().max(1.0);
        let pull = 4.0 / (distance * distance);
        velocity.dx -= pull * position.x / distance;
        velocity.dy -= pull * position.y / distance;
    }
}

fn integrate(query: Query<(&Velocity, &mut Position)>) {
    for (velocity, position) in query {
        position.x += velocity.dx;
        position.y += velocity.dy;
    }
}

fn detect_escapes(
    query: Query<(Entity, &Name, &Position)>,
    mut escapes: EventWriter<Escaped>,
    commands: Commands,
) {
    for (entity, name, position) in query {
        let distance = (position.x * position.x + position.y * position.y).sqrt();
        if distance > ESCAPE_RADIUS {
            escapes.send(Escaped {
                name: name.0.clone(),
                distance,
            });
            commands.despawn(entity);
        }
    }
}

fn report_escapes(mut escapes: EventReader<Escaped>) {
    for escape in escapes.read() {
        println!("  {} escaped at distance {:.1}", escape.name, escape.distance);
    }
}

fn render(query: Query<(&Name, &Position)>, mut frames: ResMut<FrameCount>) {
    frames.0 += 1;
    println!("frame {}", frames.0);
    for (name, position) in query {
        println!("  {:<8} ({:6.2}, {:6.2})", name.0, position.x, position.y);
    }
}

fn main() {
    env_logger::init();

    let mut world = World::new(WorldId::new(0));
    world.insert_resource(FrameCount(0));

    world.spawn((
        Name("comet".into()),
        Position { x: 6.0, y: 0.0 },
        Velocity { dx: 0.4, dy: 0.9 },
    ));
    world.spawn((
        Name("moon".into()),
        Position { x: 0.0, y: 3.0 },
        Velocity { dx: -1.0, dy: 0.0 },
    ));
    world.spawn((
        Name("probe".into()),
        Position { x: 2.0, y: -2.0 },
        Velocity { dx: 1.2, dy: 1.2 },
    ));

    let mut schedule = Schedule::new();
    schedule.add_system(FixedUpdate, gravity.named("gravity").in_set(Physics), &mut world);
    schedule.add_system(
        FixedUpdate,
        integrate.named("integrate").after("gravity").in_set(Physics),
        &mut world,
    );
    schedule.add_system(Update, detect_escapes.named("detect_escapes"), &mut world);
    schedule.add_system(
        Update,
        report_escapes.named("report_escapes").after("detect_escapes"),
        &mut world,
    );
    schedule.add_system(Render, render.named("render"), &mut world);

    let frame = Sequence::new().then(FixedUpdate).then(Update).then(Render);
    for _ in 0..8 {
        schedule.run_sequence(&frame, &mut world);
        world.update_events();
    }
}
