//! Component trait

/// Marker trait for components stored in a [`super::World`].
pub trait Component: 'static + Send + Sync {}
