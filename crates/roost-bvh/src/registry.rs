//! The set of collision shapes known to a world.

use indexmap::IndexMap;

use crate::error::ShapeError;
use crate::id::ShapeId;
use crate::shape::Shape;

#[derive(Clone, Debug)]
struct Entry {
    shape: Shape,
    enabled: bool,
}

/// Registered shapes, keyed by [`ShapeId`], in insertion order.
///
/// Every mutation marks the registry dirty; a
/// [`CollisionWorld`](crate::CollisionWorld) refills its item array only
/// after it observes the flag. Shapes are validated on the way in.
#[derive(Clone, Debug, Default)]
pub struct ShapeRegistry {
    shapes: IndexMap<ShapeId, Entry>,
    next_id: u32,
    dirty: bool,
    generation: u64,
}

impl ShapeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }

    /// Register an enabled shape and return its id.
    pub fn add(&mut self, shape: Shape) -> Result<ShapeId, ShapeError> {
        shape.validate()?;
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.insert(
            id,
            Entry {
                shape,
                enabled: true,
            },
        );
        self.touch();
        Ok(id)
    }

    /// Replace the shape registered under `id` (a moved or resized shape).
    pub fn update(&mut self, id: ShapeId, shape: Shape) -> Result<(), ShapeError> {
        shape.validate()?;
        let entry = self
            .shapes
            .get_mut(&id)
            .ok_or(ShapeError::UnknownShape { id })?;
        entry.shape = shape;
        self.touch();
        Ok(())
    }

    /// Include or exclude a shape from future builds without removing it.
    pub fn set_enabled(&mut self, id: ShapeId, enabled: bool) -> Result<(), ShapeError> {
        let entry = self
            .shapes
            .get_mut(&id)
            .ok_or(ShapeError::UnknownShape { id })?;
        if entry.enabled != enabled {
            entry.enabled = enabled;
            self.touch();
        }
        Ok(())
    }

    /// Remove a shape, returning it. Later shapes keep their order.
    pub fn remove(&mut self, id: ShapeId) -> Result<Shape, ShapeError> {
        let entry = self
            .shapes
            .shift_remove(&id)
            .ok_or(ShapeError::UnknownShape { id })?;
        self.touch();
        Ok(entry.shape)
    }

    /// The shape registered under `id`.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id).map(|e| &e.shape)
    }

    /// Whether the shape under `id` takes part in builds.
    pub fn is_enabled(&self, id: ShapeId) -> Option<bool> {
        self.shapes.get(&id).map(|e| e.enabled)
    }

    /// Iterate `(id, shape, enabled)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape, bool)> + '_ {
        self.shapes.iter().map(|(id, e)| (*id, &e.shape, e.enabled))
    }

    /// Number of registered shapes, enabled or not.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether no shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Whether the registry changed since the flag was last taken.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Number of mutations since creation.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn add_assigns_sequential_ids() {
        let mut reg = ShapeRegistry::new();
        let a = reg.add(Shape::sphere(Vec3::ZERO, 1.0)).unwrap();
        let b = reg.add(Shape::sphere(Vec3::X, 1.0)).unwrap();
        assert_eq!(a, ShapeId(0));
        assert_eq!(b, ShapeId(1));
        assert_eq!(reg.len(), 2);
        assert!(reg.is_dirty());
    }

    #[test]
    fn invalid_shape_is_rejected_without_marking_dirty() {
        let mut reg = ShapeRegistry::new();
        assert!(reg.add(Shape::sphere(Vec3::ZERO, 0.0)).is_err());
        assert!(reg.is_empty());
        assert!(!reg.is_dirty());
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn take_dirty_clears_flag() {
        let mut reg = ShapeRegistry::new();
        reg.add(Shape::sphere(Vec3::ZERO, 1.0)).unwrap();
        assert!(reg.take_dirty());
        assert!(!reg.take_dirty());
    }

    #[test]
    fn update_and_remove_unknown_ids() {
        let mut reg = ShapeRegistry::new();
        let id = reg.add(Shape::sphere(Vec3::ZERO, 1.0)).unwrap();
        reg.update(id, Shape::sphere(Vec3::Y, 2.0)).unwrap();
        assert_eq!(reg.get(id).map(|s| s.center), Some(Vec3::Y));
        assert_eq!(
            reg.update(ShapeId(9), Shape::sphere(Vec3::ZERO, 1.0)),
            Err(ShapeError::UnknownShape { id: ShapeId(9) })
        );
        assert!(reg.remove(id).is_ok());
        assert!(reg.remove(id).is_err());
    }

    #[test]
    fn removal_keeps_insertion_order() {
        let mut reg = ShapeRegistry::new();
        let ids: Vec<_> = (0..4)
            .map(|i| reg.add(Shape::sphere(Vec3::X * i as f32, 1.0)).unwrap())
            .collect();
        reg.remove(ids[1]).unwrap();
        let order: Vec<_> = reg.iter().map(|(id, _, _)| id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn set_enabled_only_dirties_on_change() {
        let mut reg = ShapeRegistry::new();
        let id = reg.add(Shape::sphere(Vec3::ZERO, 1.0)).unwrap();
        reg.take_dirty();
        reg.set_enabled(id, true).unwrap();
        assert!(!reg.is_dirty());
        reg.set_enabled(id, false).unwrap();
        assert!(reg.is_dirty());
        assert_eq!(reg.is_enabled(id), Some(false));
    }
}
