use std::time::Instant;

use maskpool::{component, EntityManager, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Vel {
    x: f32,
    y: f32,
}

component!(Pos, Vel);

const ENTITIES: usize = 1_000_000;

fn main() -> Result<()> {
    env_logger::init();

    let mut manager = EntityManager::new();
    manager.register_component::<Pos>()?;
    manager.register_component::<Vel>()?;

    for idx in 0..ENTITIES {
        let mut entity = manager.create_entity();
        entity.add_component(Pos::default())?;

        if idx % 3 != 0 {
            entity.add_component(Vel { x: 1.0, y: 0.5 })?;
        }
    }

    let start = Instant::now();
    let mut sum = 0.0;
    for entity in manager.get_entities::<(Pos, Vel)>()? {
        if let (Some(pos), Some(vel)) = (entity.get_component::<Pos>()?, entity.get_component::<Vel>()?) {
            sum += pos.x + vel.x;
        }
    }
    println!("get_entities: {:?} (sum {})", start.elapsed(), sum);

    let start = Instant::now();
    let mut count = 0;
    manager.for_each::<(Pos, Vel), _>(.., |_, (pos, vel)| {
        pos.x += vel.x;
        pos.y += vel.y;
        count += 1;
    })?;
    println!("for_each: {:?} ({} entities)", start.elapsed(), count);

    Ok(())
}
