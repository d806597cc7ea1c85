//! Directory-backed volume source
//!
//! Layout of a dataset directory:
//!
//! ```text
//! volume.ron         VolumeMeta
//! segment.ron        SegmentMeta
//! volume_<id>.raw    f32 little-endian, clip w*h*d voxels, x fastest
//! segment.raw        u16 little-endian, segment extent, x fastest
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::{MemorySource, VolumeSource};
use crate::error::SourceError;
use crate::field::{Extent3, SegmentField, VolumeField, VoxelGrid};
use crate::meta::{SegmentMeta, VolumeMeta};

const VOLUME_META_FILE: &str = "volume.ron";
const SEGMENT_META_FILE: &str = "segment.ron";
const SEGMENT_FILE: &str = "segment.raw";

/// Volume source reading a dataset directory
#[derive(Clone, Debug)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn volume_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("volume_{}.raw", id))
    }

    fn read_volume_meta(&self) -> Result<VolumeMeta, SourceError> {
        let contents = fs::read_to_string(self.root.join(VOLUME_META_FILE))?;
        Ok(ron::from_str(&contents)?)
    }

    fn read_segment_meta(&self) -> Result<SegmentMeta, SourceError> {
        let contents = fs::read_to_string(self.root.join(SEGMENT_META_FILE))?;
        Ok(ron::from_str(&contents)?)
    }

    /// Write every field of `source` into `root` using the dataset layout
    pub fn save(root: impl AsRef<Path>, source: &MemorySource) -> Result<Self, SourceError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;

        let pretty = ron::ser::PrettyConfig::new();
        let volume_meta = ron::ser::to_string_pretty(source.volume_meta_ref(), pretty.clone())?;
        fs::write(root.join(VOLUME_META_FILE), volume_meta)?;
        let segment_meta = ron::ser::to_string_pretty(source.segment_meta_ref(), pretty)?;
        fs::write(root.join(SEGMENT_META_FILE), segment_meta)?;

        let disk = Self::new(root);
        for id in source.volume_meta_ref().layer_ids() {
            if let Some(volume) = source.volume(&id) {
                let bytes: Vec<u8> = volume.data().iter().flat_map(|v| v.to_le_bytes()).collect();
                fs::write(disk.volume_path(&id), bytes)?;
            }
        }
        let bytes: Vec<u8> = source
            .segment()
            .data()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        fs::write(root.join(SEGMENT_FILE), bytes)?;

        log::info!("Saved dataset to {}", root.display());
        Ok(disk)
    }
}

impl VolumeSource for DiskSource {
    async fn volume_meta(&self) -> Result<VolumeMeta, SourceError> {
        self.read_volume_meta()
    }

    async fn segment_meta(&self) -> Result<SegmentMeta, SourceError> {
        self.read_segment_meta()
    }

    async fn load_volume(&self, id: &str) -> Result<VolumeField, SourceError> {
        let meta = self.read_volume_meta()?;
        let clip = meta
            .clip(id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        let bytes = fs::read(self.volume_path(id))?;
        let data = decode_le::<4, f32>(&bytes, f32::from_le_bytes)?;
        log::debug!("Read {} voxels for volume {}", data.len(), id);
        VoxelGrid::new(Extent3::new(clip.w, clip.h, clip.d), data)
    }

    async fn load_segment(&self, id: &str) -> Result<SegmentField, SourceError> {
        if !self.read_volume_meta()?.contains(id) {
            return Err(SourceError::NotFound(id.to_string()));
        }
        let meta = self.read_segment_meta()?;
        let bytes = fs::read(self.root.join(SEGMENT_FILE))?;
        let data = decode_le::<2, u16>(&bytes, u16::from_le_bytes)?;
        VoxelGrid::new(Extent3::from(meta.extent), data)
    }
}

/// Decode a packed little-endian buffer of `N`-byte values
fn decode_le<const N: usize, T>(bytes: &[u8], decode: fn([u8; N]) -> T) -> Result<Vec<T>, SourceError> {
    if bytes.len() % N != 0 {
        return Err(SourceError::Format(format!(
            "buffer of {} bytes is not a multiple of {}",
            bytes.len(),
            N
        )));
    }
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            decode(raw)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Clip;

    fn dataset_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("sdfview_disk_tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn memory() -> MemorySource {
        let meta = VolumeMeta::new().with_layer("L1", Clip::new(1, 0, 0, 2, 2, 2));
        let segment_meta = SegmentMeta::new([3, 2, 2]).with_label("L1", 3);
        let segment = VoxelGrid::from_fn(Extent3::new(3, 2, 2), |x, _, _| x as u16);
        let volume = VoxelGrid::from_fn(Extent3::new(2, 2, 2), |x, y, z| (x + 2 * y + 4 * z) as f32 * 0.5);
        MemorySource::new(meta, segment_meta, segment)
            .unwrap()
            .with_volume("L1", volume)
            .unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = dataset_dir("save_then_load");
        let memory = memory();
        let disk = DiskSource::save(&dir, &memory).unwrap();

        let meta = pollster::block_on(disk.volume_meta()).unwrap();
        assert_eq!(&meta, memory.volume_meta_ref());
        let segment_meta = pollster::block_on(disk.segment_meta()).unwrap();
        assert_eq!(segment_meta.label("L1"), Some(3));

        let volume = pollster::block_on(disk.load_volume("L1")).unwrap();
        assert_eq!(Some(&volume), memory.volume("L1"));
        let segment = pollster::block_on(disk.load_segment("L1")).unwrap();
        assert_eq!(&segment, memory.segment());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let disk = DiskSource::new(dataset_dir("does_not_exist"));
        let err = pollster::block_on(disk.volume_meta()).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_truncated_volume_is_format_error() {
        let dir = dataset_dir("truncated");
        let disk = DiskSource::save(&dir, &memory()).unwrap();
        fs::write(dir.join("volume_L1.raw"), [0u8; 12]).unwrap();
        let err = pollster::block_on(disk.load_volume("L1")).unwrap_err();
        assert!(matches!(err, SourceError::Format(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_layer() {
        let dir = dataset_dir("unknown_layer");
        let disk = DiskSource::save(&dir, &memory()).unwrap();
        let err = pollster::block_on(disk.load_volume("L9")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_decode_rejects_partial_values() {
        assert!(decode_le::<2, u16>(&[1, 0, 2], u16::from_le_bytes).is_err());
        assert_eq!(decode_le::<2, u16>(&[1, 0, 2, 1], u16::from_le_bytes).unwrap(), vec![1, 258]);
    }
}
