//! Registry of fields bound to the compositor
//!
//! Fields loaded by a stage sequence are registered here and released
//! explicitly when the controller starts a new sequence. Nothing is freed
//! implicitly; `clear` reports how many bindings it dropped.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::field::{SdfField, SegmentField, VolumeField};

new_key_type! {
    /// Key to a bound field
    ///
    /// Keys handed out before a `clear` never resolve afterwards, even when
    /// their slot has been reused.
    pub struct ResourceKey;
}

/// A field currently bound for rendering
#[derive(Clone, Debug)]
pub enum BoundResource {
    Volume(Rc<VolumeField>),
    Segment(Rc<SegmentField>),
    Sdf(Rc<SdfField>),
}

impl BoundResource {
    pub fn kind(&self) -> &'static str {
        match self {
            BoundResource::Volume(_) => "volume",
            BoundResource::Segment(_) => "segment",
            BoundResource::Sdf(_) => "sdf",
        }
    }
}

/// Fields bound by the most recent stage sequence
#[derive(Default)]
pub struct ResourceRegistry {
    resources: SlotMap<ResourceKey, BoundResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            resources: SlotMap::with_key(),
        }
    }

    /// Bind a field and return its key
    pub fn bind(&mut self, resource: BoundResource) -> ResourceKey {
        log::debug!("Binding {} field", resource.kind());
        self.resources.insert(resource)
    }

    /// Binding behind `key`; keys from before the last `clear` resolve to `None`
    pub fn get(&self, key: ResourceKey) -> Option<&BoundResource> {
        self.resources.get(key)
    }

    /// Release every binding, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let released = self.resources.len();
        self.resources.clear();
        if released > 0 {
            log::debug!("Released {} bound field(s)", released);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The bound volume field, if any
    pub fn volume(&self) -> Option<Rc<VolumeField>> {
        self.resources.values().find_map(|r| match r {
            BoundResource::Volume(v) => Some(Rc::clone(v)),
            _ => None,
        })
    }

    /// The bound segment field, if any
    pub fn segment(&self) -> Option<Rc<SegmentField>> {
        self.resources.values().find_map(|r| match r {
            BoundResource::Segment(s) => Some(Rc::clone(s)),
            _ => None,
        })
    }

    /// The bound SDF, if any
    pub fn sdf(&self) -> Option<Rc<SdfField>> {
        self.resources.values().find_map(|r| match r {
            BoundResource::Sdf(s) => Some(Rc::clone(s)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Extent3, VoxelGrid};

    fn volume() -> Rc<VolumeField> {
        Rc::new(VoxelGrid::filled(Extent3::new(2, 2, 2), 1.0))
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut registry = ResourceRegistry::new();
        let key = registry.bind(BoundResource::Volume(volume()));
        assert_eq!(registry.len(), 1);
        assert!(matches!(registry.get(key), Some(BoundResource::Volume(_))));
        assert!(registry.volume().is_some());
        assert!(registry.sdf().is_none());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut registry = ResourceRegistry::new();
        let field = volume();
        let key = registry.bind(BoundResource::Volume(Rc::clone(&field)));
        registry.bind(BoundResource::Sdf(volume()));
        assert_eq!(Rc::strong_count(&field), 2);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(registry.get(key).is_none());
        assert_eq!(Rc::strong_count(&field), 1);
    }

    #[test]
    fn test_stale_key_after_reuse() {
        let mut registry = ResourceRegistry::new();
        let old = registry.bind(BoundResource::Volume(volume()));
        registry.clear();
        let new = registry.bind(BoundResource::Volume(volume()));
        assert!(registry.get(old).is_none());
        assert!(registry.get(new).is_some());
    }
}
