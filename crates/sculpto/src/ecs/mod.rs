//! Entity-component store.
//!
//! A deliberately small store: entities are plain ids, components live in
//! per-type tables, and iteration order follows entity creation order so
//! frame submission stays deterministic.

pub mod component;
pub mod entity;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use world::World;
