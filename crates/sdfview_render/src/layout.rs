//! Layout strategies
//!
//! A layout maps a viewport coordinate `uv` (origin top-left, `[0, 1]²`) to
//! the 3D coordinate sampled from the fields, or discards it. Both strategies
//! letterbox horizontally so the clip keeps its aspect ratio.

use sdfview_core::LayoutKind;
use sdfview_math::{Vec2, Vec3};

/// Rows of the tiled grid
pub const GRID_ROWS: u32 = 5;

/// Tiles whose fractional coordinate falls below this width are drawn as borders
pub const GRID_BORDER: f32 = 0.01;

/// Where a viewport coordinate lands in the fields
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Normalised sampling coordinate
    pub coord: Vec3,
    /// Inside a tile border; drawn opaque black
    pub border: bool,
}

/// Tile counts of the grid layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    pub cols: u32,
    pub rows: u32,
}

impl GridDims {
    /// Columns for a screen/volume aspect ratio; never fewer than one
    pub fn for_ratio(ratio: f32) -> Self {
        let cols = (ratio * GRID_ROWS as f32).floor();
        let cols = if cols.is_finite() && cols >= 1.0 { cols as u32 } else { 1 };
        Self {
            cols,
            rows: GRID_ROWS,
        }
    }

    pub fn tiles(&self) -> u32 {
        self.cols * self.rows
    }

    /// Normalised Z of the slice shown in tile `(col, row)`
    pub fn tile_z(&self, col: u32, row: u32) -> f32 {
        (row * self.cols + col) as f32 / self.tiles() as f32
    }
}

/// Layout strategy chosen when a material is built
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    SingleLayer,
    TiledGrid,
}

impl From<LayoutKind> for Layout {
    fn from(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::SingleLayer => Layout::SingleLayer,
            LayoutKind::TiledGrid => Layout::TiledGrid,
        }
    }
}

impl Layout {
    /// Map `uv` to a sampling coordinate, `None` to discard
    ///
    /// `ratio` is screen aspect over volume aspect. `slice_z` is only used by
    /// the single-layer layout; the grid derives Z from the tile.
    pub fn place(&self, uv: Vec2, ratio: f32, slice_z: f32) -> Option<Placement> {
        match self {
            Layout::SingleLayer => {
                let uv = letterbox(uv, ratio)?;
                Some(Placement {
                    coord: Vec3::from_xy(uv, slice_z),
                    border: false,
                })
            }
            Layout::TiledGrid => {
                let dims = GridDims::for_ratio(ratio);
                let aspect = ratio / (dims.cols as f32 / dims.rows as f32);
                let uv = letterbox(uv, aspect)?;

                let scaled = uv.component_mul(Vec2::new(dims.cols as f32, dims.rows as f32));
                let cell = scaled.floor().clamp_components(
                    Vec2::ZERO,
                    Vec2::new(dims.cols as f32 - 1.0, dims.rows as f32 - 1.0),
                );
                let frac = scaled - cell;
                let z = dims.tile_z(cell.x as u32, cell.y as u32);

                Some(Placement {
                    coord: Vec3::from_xy(frac, z),
                    border: frac.x < GRID_BORDER || frac.y < GRID_BORDER,
                })
            }
        }
    }
}

/// Horizontal letterbox: stretch `u` about the centre by `aspect`, discard outside
pub fn letterbox(uv: Vec2, aspect: f32) -> Option<Vec2> {
    let remapped = Vec2::new((uv.x - 0.5) * aspect + 0.5, uv.y);
    remapped.in_unit_square().then_some(remapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dims_for_wide_screen() {
        assert_eq!(GridDims::for_ratio(2.0), GridDims { cols: 10, rows: 5 });
        assert_eq!(GridDims::for_ratio(1.0), GridDims { cols: 5, rows: 5 });
    }

    #[test]
    fn test_grid_dims_never_zero() {
        assert_eq!(GridDims::for_ratio(0.1).cols, 1);
        assert_eq!(GridDims::for_ratio(0.0).cols, 1);
        assert_eq!(GridDims::for_ratio(f32::NAN).cols, 1);
    }

    #[test]
    fn test_tile_z() {
        let dims = GridDims::for_ratio(2.0);
        assert!((dims.tile_z(3, 1) - 0.26).abs() < 1e-6);
        assert_eq!(dims.tile_z(0, 0), 0.0);
    }

    #[test]
    fn test_grid_cell_mapping() {
        // ratio 2 gives a 10x5 grid with no letterbox; cell (3, 1) spans u in [0.3, 0.4), v in [0.2, 0.4)
        let placement = Layout::TiledGrid.place(Vec2::new(0.35, 0.3), 2.0, 0.0).unwrap();
        assert!((placement.coord.z - 0.26).abs() < 1e-6);
        assert!((placement.coord.x - 0.5).abs() < 1e-4);
        assert!((placement.coord.y - 0.5).abs() < 1e-4);
        assert!(!placement.border);
    }

    #[test]
    fn test_grid_border() {
        let placement = Layout::TiledGrid.place(Vec2::new(0.3005, 0.3), 2.0, 0.0).unwrap();
        assert!(placement.border);
    }

    #[test]
    fn test_grid_last_cell_clamped() {
        let placement = Layout::TiledGrid.place(Vec2::new(1.0, 1.0), 2.0, 0.0).unwrap();
        assert!((placement.coord.z - 49.0 / 50.0).abs() < 1e-6);
        assert!((placement.coord.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_single_layer_uses_slice_z() {
        let placement = Layout::SingleLayer.place(Vec2::new(0.5, 0.25), 1.0, 0.7).unwrap();
        assert_eq!(placement.coord, Vec3::new(0.5, 0.25, 0.7));
    }

    #[test]
    fn test_single_layer_letterbox_discards() {
        // Screen twice as wide as the volume: only the middle half survives
        assert!(Layout::SingleLayer.place(Vec2::new(0.2, 0.5), 2.0, 0.5).is_none());
        assert!(Layout::SingleLayer.place(Vec2::new(0.8, 0.5), 2.0, 0.5).is_none());
        let inside = Layout::SingleLayer.place(Vec2::new(0.3, 0.5), 2.0, 0.5).unwrap();
        assert!((inside.coord.x - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_layout_from_kind() {
        assert_eq!(Layout::from(LayoutKind::TiledGrid), Layout::TiledGrid);
    }
}
