use maskpool::{component, EntityManager, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pos {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vel(f32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Name(char);

component!(Pos, Vel, Name);

fn main() -> Result<()> {
    env_logger::init();

    let mut manager = EntityManager::new();
    manager.register_component::<Pos>()?;
    manager.register_component::<Vel>()?;
    manager.register_component::<Name>()?;

    manager.create_entity()
        .add_component(Pos { x: 3, y: 5 })?
        .add_component(Name('a'))?;
    manager.create_entity()
        .add_component(Pos { x: 4, y: -1 })?
        .add_component(Vel(5.5))?
        .add_component(Name('b'))?;
    manager.create_entity()
        .add_component(Vel(3.7))?;

    for entity in manager.get_entities::<Pos>()? {
        println!("pos: {:?} {:?}", entity, entity.get_component::<Pos>()?);
    }

    for entity in manager.get_entities::<(Vel, Name)>()? {
        println!("vel+name: {:?} {:?}", entity, entity.get_component::<Name>()?);
    }

    manager.for_each::<(Pos, Vel), _>(.., |id, (pos, vel)| {
        pos.x += 4;
        println!("moving {:?}: {:?} at {:?}", id, pos, vel);
    })?;

    println!("manager: {:?}", manager);
    Ok(())
}
