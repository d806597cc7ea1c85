//! Viewer system
//!
//! Owns the mode controller and turns input actions into parameter edits,
//! picks and re-renders. Picking a layer selects it. Controller futures are
//! driven to completion with `pollster`, so every transition has finished
//! before the next event.

use std::cell::Ref;

use sdfview_core::{
    DiskSource, DistanceTransform, MemorySource, Mode, ModeController, Outcome, ParamKey, Params,
    ParamsDelta, PipelineError, SegmentField, SegmentMeta, SourceError, SyntheticSource, VolumeField,
    VolumeMeta, VolumeSource,
};
use sdfview_math::Rgba;
use sdfview_render::picker::cursor_to_ndc;
use sdfview_render::{Compositor, Framebuffer, PickedLabel, Picker};

use crate::config::{DataConfig, RenderingConfig, ViewConfig};
use crate::input::InputAction;

/// Dataset the viewer reads from
pub enum DataSource {
    Disk(DiskSource),
    Memory(MemorySource),
}

impl DataSource {
    /// Directory from config, or the built-in synthetic dataset
    pub fn from_config(config: &DataConfig) -> Result<Self, SourceError> {
        match &config.dir {
            Some(dir) => {
                log::info!("Reading dataset from {}", dir.display());
                Ok(DataSource::Disk(DiskSource::new(dir)))
            }
            None => {
                log::info!("No data directory configured, using synthetic dataset");
                Ok(DataSource::Memory(SyntheticSource::demo().build()?))
            }
        }
    }
}

impl VolumeSource for DataSource {
    async fn volume_meta(&self) -> Result<VolumeMeta, SourceError> {
        match self {
            DataSource::Disk(source) => source.volume_meta().await,
            DataSource::Memory(source) => source.volume_meta().await,
        }
    }

    async fn segment_meta(&self) -> Result<SegmentMeta, SourceError> {
        match self {
            DataSource::Disk(source) => source.segment_meta().await,
            DataSource::Memory(source) => source.segment_meta().await,
        }
    }

    async fn load_volume(&self, id: &str) -> Result<VolumeField, SourceError> {
        match self {
            DataSource::Disk(source) => source.load_volume(id).await,
            DataSource::Memory(source) => source.load_volume(id).await,
        }
    }

    async fn load_segment(&self, id: &str) -> Result<SegmentField, SourceError> {
        match self {
            DataSource::Disk(source) => source.load_segment(id).await,
            DataSource::Memory(source) => source.load_segment(id).await,
        }
    }
}

pub type Controller = ModeController<DataSource, DistanceTransform, Compositor>;

/// Drives the controller from viewer input
pub struct ViewerSystem {
    controller: Controller,
    viewport: (u32, u32),
    cursor: Option<(f64, f64)>,
    picked: Option<PickedLabel>,
}

impl ViewerSystem {
    /// Open `source` with the initial view from config and render the first frame
    pub fn open(
        source: DataSource,
        view: &ViewConfig,
        rendering: &RenderingConfig,
        viewport: (u32, u32),
    ) -> Result<Self, PipelineError> {
        let volume_meta = pollster::block_on(source.volume_meta())?;
        let segment_meta = pollster::block_on(source.segment_meta())?;

        let initial = ParamsDelta {
            select: view.layer.clone(),
            surface: Some(view.surface),
            inverse: Some(view.inverse),
            ..Default::default()
        };
        let (params, _) = Params::for_meta(&volume_meta, view.mode)?.apply(&initial, &volume_meta)?;

        let (width, height) = (viewport.0.max(1), viewport.1.max(1));
        let compositor = Compositor::new(width, height, view.colormap)
            .with_clim(view.clim())
            .with_background(Rgba::from(rendering.background_color));

        let controller = ModeController::new(
            source,
            DistanceTransform,
            compositor,
            volume_meta,
            segment_meta,
            params,
        )?;
        controller.resize(width, height)?;
        pollster::block_on(controller.refresh())?;

        Ok(Self {
            controller,
            viewport: (width, height),
            cursor: None,
            picked: None,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Apply an input action; returns whether a new frame was rendered
    ///
    /// Steps the current mode does not expose are ignored.
    pub fn handle(&mut self, action: InputAction) -> Result<bool, PipelineError> {
        let outcome = match action {
            InputAction::Step { key, dir } => {
                let params = self.controller.params();
                let Some(delta) = self.controller.control_panel().step(&params, key, dir) else {
                    log::debug!("{:?} is not adjustable in {} mode", key, params.mode);
                    return Ok(false);
                };
                pollster::block_on(self.controller.apply(delta))?
            }
            InputAction::SetMode(mode) => pollster::block_on(self.controller.set_mode(mode))?,
            InputAction::Refresh => pollster::block_on(self.controller.refresh())?,
            InputAction::Pick => return self.pick(),
            InputAction::ToggleFullscreen | InputAction::Exit => return Ok(false),
        };

        if self.picked.is_some() && !self.controller.params().mode.supports_picking() {
            self.picked = None;
        }
        Ok(outcome == Outcome::Rendered)
    }

    /// Last cursor position in physical pixels
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
    }

    /// Pick the layer under the cursor and select it
    ///
    /// Returns whether the selection changed and a new frame was rendered.
    pub fn pick(&mut self) -> Result<bool, PipelineError> {
        let Some((x, y)) = self.cursor else {
            return Ok(false);
        };
        let (width, height) = self.viewport;
        let ndc = cursor_to_ndc(x, y, width, height);

        self.picked = self
            .controller
            .pick_scene()
            .and_then(|scene| Picker::pick(&scene, ndc));
        let Some(label) = &self.picked else {
            log::debug!("Nothing to pick at ({:.0}, {:.0})", x, y);
            return Ok(false);
        };
        log::info!("Picked {} (clip {:?})", label.id, label.clip);

        if label.id == self.controller.params().selected() {
            return Ok(false);
        }
        let outcome = pollster::block_on(self.controller.select_layer(label.id.clone()))?;
        Ok(outcome == Outcome::Rendered)
    }

    pub fn picked(&self) -> Option<&PickedLabel> {
        self.picked.as_ref()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.viewport = (width, height);
        self.controller.resize(width, height)
    }

    /// Compositor holding the last rendered frame
    pub fn compositor(&self) -> Ref<'_, Compositor> {
        self.controller.target()
    }

    /// Run `f` on the last rendered frame
    pub fn with_framebuffer<R>(&self, f: impl FnOnce(&Framebuffer) -> R) -> R {
        f(self.compositor().framebuffer())
    }

    /// One-line summary of the view for the window title
    pub fn status(&self) -> String {
        let params = self.controller.params();
        let panel = self.controller.control_panel();

        let mut status = format!("{} {}", params.mode, params.selected());
        if panel.control(ParamKey::Surface).is_some() {
            status.push_str(&format!(" | surface {:.3}", params.surface));
        }
        if params.mode == Mode::Layer {
            status.push_str(&format!(" | slice {}", params.layer));
        }
        if params.inverse && panel.control(ParamKey::Inverse).is_some() {
            status.push_str(" | inverse");
        }
        if let Some(label) = &self.picked {
            status.push_str(&format!(" | picked {}", label.id));
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfview_core::source::Shape;
    use sdfview_core::Clip;

    fn source() -> DataSource {
        let memory = SyntheticSource::new([32, 32, 16])
            .with_layer("L1", Clip::new(0, 0, 0, 16, 16, 16), Shape::Sphere { radius: 6.0 })
            .with_layer("L2", Clip::new(16, 16, 0, 16, 16, 16), Shape::Sphere { radius: 5.0 })
            .build()
            .unwrap();
        DataSource::Memory(memory)
    }

    fn viewer(mode: Mode) -> ViewerSystem {
        let view = ViewConfig {
            mode,
            ..ViewConfig::default()
        };
        ViewerSystem::open(source(), &view, &RenderingConfig::default(), (64, 32)).unwrap()
    }

    #[test]
    fn test_open_renders_first_frame() {
        let viewer = viewer(Mode::Layer);
        assert_eq!(viewer.compositor().frame_count(), 1);
        assert_eq!(viewer.status(), "layer L1 | surface 0.050 | slice 0");
    }

    #[test]
    fn test_initial_layer_from_config() {
        let view = ViewConfig {
            mode: Mode::Volume,
            layer: Some("L2".to_string()),
            ..ViewConfig::default()
        };
        let viewer = ViewerSystem::open(source(), &view, &RenderingConfig::default(), (64, 32)).unwrap();
        assert_eq!(viewer.controller().params().selected(), "L2");
        assert_eq!(viewer.status(), "volume L2");
    }

    #[test]
    fn test_unknown_initial_layer_fails() {
        let view = ViewConfig {
            layer: Some("missing".to_string()),
            ..ViewConfig::default()
        };
        let result = ViewerSystem::open(source(), &view, &RenderingConfig::default(), (64, 32));
        assert!(matches!(result, Err(PipelineError::UnknownLayer(_))));
    }

    #[test]
    fn test_step_outside_mode_controls_is_ignored() {
        let mut viewer = viewer(Mode::Segment);
        let rendered = viewer
            .handle(InputAction::Step { key: ParamKey::Surface, dir: 1 })
            .unwrap();
        assert!(!rendered);
        assert_eq!(viewer.compositor().frame_count(), 1);
    }

    #[test]
    fn test_step_surface_rerenders() {
        let mut viewer = viewer(Mode::Layer);
        let rendered = viewer
            .handle(InputAction::Step { key: ParamKey::Surface, dir: 1 })
            .unwrap();
        assert!(rendered);
        assert!(viewer.controller().params().surface > 0.05);
    }

    #[test]
    fn test_mode_cycle() {
        let mut viewer = viewer(Mode::Segment);
        viewer.handle(InputAction::Step { key: ParamKey::Mode, dir: 1 }).unwrap();
        assert_eq!(viewer.controller().params().mode, Mode::Layer);
        viewer.handle(InputAction::SetMode(Mode::Volume)).unwrap();
        assert_eq!(viewer.controller().params().mode, Mode::Volume);
    }

    #[test]
    fn test_pick_under_cursor() {
        let mut viewer = viewer(Mode::Segment);
        viewer.cursor_moved(32.0, 16.0);
        assert!(!viewer.handle(InputAction::Pick).unwrap());
        assert_eq!(viewer.picked().map(|p| p.id.as_str()), Some("L1"));
        assert!(viewer.status().ends_with("| picked L1"));

        // Letterboxed margin
        viewer.cursor_moved(1.0, 1.0);
        assert!(!viewer.pick().unwrap());
        assert!(viewer.picked().is_none());
    }

    #[test]
    fn test_pick_selects_other_layer() {
        // L2 reaches into the slice of L1's clip shown in segment mode
        let memory = SyntheticSource::new([32, 16, 20])
            .with_layer("L1", Clip::new(0, 0, 0, 32, 16, 16), Shape::Sphere { radius: 3.0 })
            .with_layer("L2", Clip::new(16, 0, 4, 16, 16, 16), Shape::Sphere { radius: 5.0 })
            .build()
            .unwrap();
        let view = ViewConfig {
            mode: Mode::Segment,
            ..ViewConfig::default()
        };
        let mut viewer =
            ViewerSystem::open(DataSource::Memory(memory), &view, &RenderingConfig::default(), (64, 32)).unwrap();

        // Clicking the selected layer changes nothing
        viewer.cursor_moved(32.5, 16.5);
        assert!(!viewer.handle(InputAction::Pick).unwrap());
        assert_eq!(viewer.controller().params().selected(), "L1");
        assert_eq!(viewer.compositor().frame_count(), 1);

        viewer.cursor_moved(48.5, 16.5);
        assert!(viewer.handle(InputAction::Pick).unwrap());
        let params = viewer.controller().params();
        assert_eq!(params.selected(), "L2");
        assert_eq!(params.layer, 4);
        assert_eq!(viewer.compositor().frame_count(), 2);
        assert!(viewer.status().starts_with("segment L2"));
    }

    #[test]
    fn test_pick_cleared_when_mode_cannot_pick() {
        let mut viewer = viewer(Mode::Segment);
        viewer.cursor_moved(32.0, 16.0);
        viewer.pick().unwrap();
        viewer.handle(InputAction::SetMode(Mode::Volume)).unwrap();
        assert!(viewer.picked().is_none());
    }
}
