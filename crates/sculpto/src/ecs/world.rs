//! ECS World implementation

use super::{Component, Entity};
use std::any::{Any, TypeId};
use std::collections::HashMap;

type Table<T> = HashMap<Entity, T>;

/// ECS World containing all entities and components.
///
/// Component storage is a map from component type to a per-entity table.
/// Entity iteration follows creation order, which is what makes scene
/// submission deterministic frame to frame.
#[derive(Default)]
pub struct World {
    next_entity_id: u32,
    entities: Vec<Entity>,
    storages: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl World {
    /// Create a new empty world
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.push(entity);
        entity
    }

    /// Add a component to an entity, replacing any previous one of the
    /// same type.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Table::<T>::new()))
            .downcast_mut::<Table<T>>()
            .expect("storage type keyed by TypeId")
            .insert(entity, component);
    }

    /// Get a component from an entity
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.table::<T>()?.get(&entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.table_mut::<T>()?.get_mut(&entity)
    }

    /// Check whether an entity has a component of the given type
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.table::<T>().is_some_and(|t| t.contains_key(&entity))
    }

    /// Remove and return a component from an entity
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.table_mut::<T>()?.remove(&entity)
    }

    /// Iterate all live entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Number of live entities
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn table<T: Component>(&self) -> Option<&Table<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.downcast_ref::<Table<T>>())
    }

    fn table_mut<T: Component>(&mut self) -> Option<&mut Table<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.downcast_mut::<Table<T>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    struct Tag;
    impl Component for Tag {}

    #[test]
    fn add_and_get_component() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(10));

        assert!(world.has_component::<Health>(e));
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 10);
        assert!(!world.has_component::<Tag>(e));
    }

    #[test]
    fn mutate_component_in_place() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(1));
        world.get_component_mut::<Health>(e).unwrap().0 = 42;
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 42);
    }

    #[test]
    fn remove_component() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Tag);
        assert!(world.remove_component::<Tag>(e).is_some());
        assert!(!world.has_component::<Tag>(e));
        assert!(world.remove_component::<Tag>(e).is_none());
    }

    #[test]
    fn entities_iterate_in_creation_order() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        let order: Vec<Entity> = world.entities().collect();
        assert_eq!(order, vec![a, b, c]);
    }
}
