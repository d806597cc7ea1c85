//! In-memory volume source

use std::collections::BTreeMap;

use super::VolumeSource;
use crate::error::SourceError;
use crate::field::{Extent3, SegmentField, VolumeField};
use crate::meta::{SegmentMeta, VolumeMeta};

/// Volume source backed by fields held in memory
#[derive(Clone, Debug)]
pub struct MemorySource {
    volume_meta: VolumeMeta,
    segment_meta: SegmentMeta,
    volumes: BTreeMap<String, VolumeField>,
    segment: SegmentField,
}

impl MemorySource {
    /// Create a source from metadata and the shared segment grid
    ///
    /// The segment grid must match `segment_meta.extent`.
    pub fn new(
        volume_meta: VolumeMeta,
        segment_meta: SegmentMeta,
        segment: SegmentField,
    ) -> Result<Self, SourceError> {
        let expected = Extent3::from(segment_meta.extent);
        if segment.extent() != expected {
            return Err(SourceError::Format(format!(
                "segment grid is {:?}, metadata declares {:?}",
                segment.extent(),
                expected
            )));
        }
        Ok(Self {
            volume_meta,
            segment_meta,
            volumes: BTreeMap::new(),
            segment,
        })
    }

    /// Attach the intensity grid of a layer; its extent must match the layer's clip
    pub fn insert_volume(&mut self, id: &str, volume: VolumeField) -> Result<(), SourceError> {
        let clip = self
            .volume_meta
            .clip(id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        let expected = Extent3::new(clip.w, clip.h, clip.d);
        if volume.extent() != expected {
            return Err(SourceError::Format(format!(
                "volume '{}' is {:?}, clip declares {:?}",
                id,
                volume.extent(),
                expected
            )));
        }
        self.volumes.insert(id.to_string(), volume);
        Ok(())
    }

    /// Builder form of [`insert_volume`](Self::insert_volume)
    pub fn with_volume(mut self, id: &str, volume: VolumeField) -> Result<Self, SourceError> {
        self.insert_volume(id, volume)?;
        Ok(self)
    }

    pub fn volume_meta_ref(&self) -> &VolumeMeta {
        &self.volume_meta
    }

    pub fn segment_meta_ref(&self) -> &SegmentMeta {
        &self.segment_meta
    }

    pub fn volume(&self, id: &str) -> Option<&VolumeField> {
        self.volumes.get(id)
    }

    pub fn segment(&self) -> &SegmentField {
        &self.segment
    }
}

impl VolumeSource for MemorySource {
    async fn volume_meta(&self) -> Result<VolumeMeta, SourceError> {
        Ok(self.volume_meta.clone())
    }

    async fn segment_meta(&self) -> Result<SegmentMeta, SourceError> {
        Ok(self.segment_meta.clone())
    }

    async fn load_volume(&self, id: &str) -> Result<VolumeField, SourceError> {
        self.volumes
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }

    async fn load_segment(&self, id: &str) -> Result<SegmentField, SourceError> {
        if !self.volume_meta.contains(id) {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(self.segment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::VoxelGrid;
    use crate::meta::Clip;

    fn source() -> MemorySource {
        let meta = VolumeMeta::new().with_layer("L1", Clip::new(0, 0, 0, 4, 4, 2));
        let segment_meta = SegmentMeta::new([4, 4, 2]).with_label("L1", 1);
        let segment = VoxelGrid::filled(Extent3::new(4, 4, 2), 1u16);
        MemorySource::new(meta, segment_meta, segment)
            .unwrap()
            .with_volume("L1", VoxelGrid::filled(Extent3::new(4, 4, 2), 0.5))
            .unwrap()
    }

    #[test]
    fn test_load_known_layer() {
        let source = source();
        let volume = pollster::block_on(source.load_volume("L1")).unwrap();
        assert_eq!(volume.extent(), Extent3::new(4, 4, 2));
        let segment = pollster::block_on(source.load_segment("L1")).unwrap();
        assert_eq!(segment.get(0, 0, 0), Some(1));
    }

    #[test]
    fn test_unknown_layer_not_found() {
        let source = source();
        let err = pollster::block_on(source.load_volume("L2")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == "L2"));
        assert!(pollster::block_on(source.load_segment("L2")).is_err());
    }

    #[test]
    fn test_volume_extent_must_match_clip() {
        let mut source = source();
        let err = source
            .insert_volume("L1", VoxelGrid::filled(Extent3::new(2, 2, 2), 0.0))
            .unwrap_err();
        assert!(matches!(err, SourceError::Format(_)));
    }

    #[test]
    fn test_segment_extent_must_match_meta() {
        let result = MemorySource::new(
            VolumeMeta::new(),
            SegmentMeta::new([8, 8, 8]),
            VoxelGrid::filled(Extent3::new(4, 4, 4), 0u16),
        );
        assert!(result.is_err());
    }
}
