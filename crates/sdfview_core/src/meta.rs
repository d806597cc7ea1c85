//! Volume and segment metadata
//!
//! Metadata is loaded once per session and never mutated afterwards.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

/// Voxel sub-region (origin + extent) of a layer within the shared volume space
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clip {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub w: u32,
    pub h: u32,
    pub d: u32,
}

impl Clip {
    pub const fn new(x: u32, y: u32, z: u32, w: u32, h: u32, d: u32) -> Self {
        Self { x, y, z, w, h, d }
    }

    /// Width over height of the clip's XY footprint
    pub fn aspect(&self) -> f32 {
        if self.h == 0 {
            return 1.0;
        }
        self.w as f32 / self.h as f32
    }

    /// Inclusive slice range `[z, z + d]` exposed by the layer control
    pub fn slice_range(&self) -> (u32, u32) {
        (self.z, self.z + self.d)
    }

    /// Number of voxels covered by the clip
    pub fn voxel_count(&self) -> usize {
        self.w as usize * self.h as usize * self.d as usize
    }

    /// Largest of the three extents
    pub fn max_extent(&self) -> u32 {
        self.w.max(self.h).max(self.d)
    }
}

/// Metadata for a single layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerMeta {
    pub clip: Clip,
}

/// Mapping from layer identifier to its metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMeta {
    pub layers: BTreeMap<String, LayerMeta>,
}

impl VolumeMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer (builder style)
    pub fn with_layer(mut self, id: impl Into<String>, clip: Clip) -> Self {
        self.layers.insert(id.into(), LayerMeta { clip });
        self
    }

    pub fn clip(&self, id: &str) -> Option<Clip> {
        self.layers.get(id).map(|layer| layer.clip)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    /// Layer ids in stable (sorted) order
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Shape of the shared segmentation space and the label each layer uses in it
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Extent of the segmentation grid `[w, h, d]`
    pub extent: [u32; 3],
    /// Label value of each layer inside the segmentation grid (0 is background)
    pub labels: BTreeMap<String, u16>,
}

impl SegmentMeta {
    pub fn new(extent: [u32; 3]) -> Self {
        Self {
            extent,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, id: impl Into<String>, label: u16) -> Self {
        self.labels.insert(id.into(), label);
        self
    }

    pub fn label(&self, id: &str) -> Option<u16> {
        self.labels.get(id).copied()
    }

    /// Reverse lookup from a label value to its layer id
    pub fn id_for_label(&self, label: u16) -> Option<&str> {
        if label == 0 {
            return None;
        }
        self.labels
            .iter()
            .find(|(_, &l)| l == label)
            .map(|(id, _)| id.as_str())
    }

    /// Highest label in use (1 when no labels are registered)
    pub fn max_label(&self) -> u16 {
        self.labels.values().copied().max().unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_aspect() {
        let clip = Clip::new(0, 0, 0, 200, 100, 10);
        assert_eq!(clip.aspect(), 2.0);
        assert_eq!(Clip::new(0, 0, 0, 4, 0, 1).aspect(), 1.0);
    }

    #[test]
    fn test_slice_range() {
        let clip = Clip::new(3, 4, 12, 10, 10, 8);
        assert_eq!(clip.slice_range(), (12, 20));
    }

    #[test]
    fn test_layer_ids_sorted() {
        let meta = VolumeMeta::new()
            .with_layer("L2", Clip::default())
            .with_layer("L1", Clip::default());
        assert_eq!(meta.layer_ids(), vec!["L1".to_string(), "L2".to_string()]);
    }

    #[test]
    fn test_id_for_label() {
        let meta = SegmentMeta::new([16, 16, 16])
            .with_label("L1", 1)
            .with_label("L2", 4);
        assert_eq!(meta.id_for_label(4), Some("L2"));
        assert_eq!(meta.id_for_label(0), None);
        assert_eq!(meta.id_for_label(9), None);
        assert_eq!(meta.max_label(), 4);
    }

    #[test]
    fn test_meta_ron_round_trip() {
        let meta = VolumeMeta::new().with_layer("L1", Clip::new(0, 0, 0, 32, 16, 10));
        let text = ron::to_string(&meta).unwrap();
        let parsed: VolumeMeta = ron::from_str(&text).unwrap();
        assert_eq!(parsed, meta);
    }
}
