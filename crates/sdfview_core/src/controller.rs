//! Mode controller
//!
//! Owns the display parameters and runs the stage sequence of the current
//! mode whenever a mode or layer change invalidates the bound fields:
//!
//! | mode | stages |
//! |---|---|
//! | segment | load segment → render |
//! | volume | load volume → render |
//! | volume-segment, layer, grid layer | load volume ∥ load segment → clip segment → derive SDF → render |
//!
//! Everything runs on one thread. Public operations validate and commit
//! synchronously, then hand back a `'static` future for the asynchronous
//! part. Each dispatched sequence captures the generation it was started
//! with; after every suspension point it compares that against the live
//! generation and bails out with [`Outcome::Superseded`] if a newer
//! sequence has started, so only the latest selection is ever bound or
//! rendered.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::Rc;

use futures::future::try_join;

use crate::busy::{BusyGuard, BusyIndicator};
use crate::controls::ControlPanel;
use crate::error::PipelineError;
use crate::field::{SegmentField, Window};
use crate::frame::{slice_z, AspectState, Frame, FrameContent, RenderTarget};
use crate::meta::{Clip, SegmentMeta, VolumeMeta};
use crate::params::{ChangeFlags, Mode, Params, ParamsDelta};
use crate::resources::{BoundResource, ResourceRegistry};
use crate::sdf::SdfDeriver;
use crate::source::VolumeSource;

/// How a dispatched operation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The frame for the latest parameters was rendered
    Rendered,
    /// A newer sequence started before this one finished; nothing was committed
    Superseded,
    /// A render-only edit was committed while a sequence is in flight; that
    /// sequence renders it
    Deferred,
    /// The edit changed nothing
    Unchanged,
}

/// Snapshot of what the picker needs, detached from the controller
#[derive(Clone, Debug)]
pub struct PickScene {
    pub segment: Rc<SegmentField>,
    pub params: Params,
    pub aspect: AspectState,
    pub clip: Clip,
    pub slice_z: f32,
    volume_meta: Rc<VolumeMeta>,
    segment_meta: Rc<SegmentMeta>,
}

impl PickScene {
    /// Window of the shared segment grid covered by the selected clip
    pub fn window(&self) -> Window {
        Window::from_clip(&self.clip)
    }

    /// Layer id and clip owning a segment label
    pub fn resolve(&self, label: u16) -> Option<(String, Clip)> {
        let id = self.segment_meta.id_for_label(label)?;
        let clip = self.volume_meta.clip(id)?;
        Some((id.to_string(), clip))
    }
}

/// A dispatched stage sequence
struct Ticket {
    generation: u64,
    mode: Mode,
    id: String,
    clip: Clip,
    _busy: BusyGuard,
}

enum Dispatch {
    Done(Outcome),
    Pipeline(Ticket),
}

struct State {
    params: Params,
    aspect: AspectState,
    viewport: (u32, u32),
    resources: ResourceRegistry,
    /// Generation of the sequence currently in flight
    pending: Option<u64>,
}

struct Inner<S, D, T> {
    source: S,
    deriver: D,
    target: RefCell<T>,
    volume_meta: Rc<VolumeMeta>,
    segment_meta: Rc<SegmentMeta>,
    state: RefCell<State>,
    generation: Cell<u64>,
    busy: BusyIndicator,
}

/// Drives the load → derive → render pipeline for the current mode
pub struct ModeController<S, D, T> {
    inner: Rc<Inner<S, D, T>>,
}

impl<S, D, T> Clone for ModeController<S, D, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, D, T> ModeController<S, D, T>
where
    S: VolumeSource + 'static,
    D: SdfDeriver + 'static,
    T: RenderTarget + 'static,
{
    /// Create a controller; nothing is loaded until the first dispatch
    pub fn new(
        source: S,
        deriver: D,
        target: T,
        volume_meta: VolumeMeta,
        segment_meta: SegmentMeta,
        params: Params,
    ) -> Result<Self, PipelineError> {
        let clip = volume_meta
            .clip(params.selected())
            .ok_or_else(|| PipelineError::UnknownLayer(params.selected().to_string()))?;

        let state = State {
            params,
            aspect: AspectState::new(clip.aspect(), 1.0),
            viewport: (0, 0),
            resources: ResourceRegistry::new(),
            pending: None,
        };

        Ok(Self {
            inner: Rc::new(Inner {
                source,
                deriver,
                target: RefCell::new(target),
                volume_meta: Rc::new(volume_meta),
                segment_meta: Rc::new(segment_meta),
                state: RefCell::new(state),
                generation: Cell::new(0),
                busy: BusyIndicator::new(),
            }),
        })
    }

    /// Fetch metadata from `source` and create a controller showing its first layer
    pub async fn open(source: S, deriver: D, target: T, mode: Mode) -> Result<Self, PipelineError> {
        let volume_meta = source.volume_meta().await?;
        let segment_meta = source.segment_meta().await?;
        let params = Params::for_meta(&volume_meta, mode)?;
        log::info!(
            "Opened source with {} layer(s), starting in {} mode",
            volume_meta.layers.len(),
            mode
        );
        Self::new(source, deriver, target, volume_meta, segment_meta, params)
    }

    /// Switch display mode
    pub fn set_mode(&self, mode: Mode) -> impl Future<Output = Result<Outcome, PipelineError>> + 'static {
        self.apply(ParamsDelta::mode(mode))
    }

    /// Select a different layer
    pub fn select_layer(
        &self,
        id: impl Into<String>,
    ) -> impl Future<Output = Result<Outcome, PipelineError>> + 'static {
        self.apply(ParamsDelta::select(id))
    }

    /// Validate and commit `delta`
    ///
    /// Mode and layer selection changes release the bound fields and start a
    /// new stage sequence. Other changes only re-render, or are deferred to the
    /// sequence in flight.
    pub fn apply(&self, delta: ParamsDelta) -> impl Future<Output = Result<Outcome, PipelineError>> + 'static {
        let dispatch = self.inner.dispatch(&delta, false);
        let inner = Rc::clone(&self.inner);
        async move {
            match dispatch? {
                Dispatch::Done(outcome) => Ok(outcome),
                Dispatch::Pipeline(ticket) => inner.run(ticket).await,
            }
        }
    }

    /// Re-run the current mode's full stage sequence
    pub fn refresh(&self) -> impl Future<Output = Result<Outcome, PipelineError>> + 'static {
        let dispatch = self.inner.dispatch(&ParamsDelta::default(), true);
        let inner = Rc::clone(&self.inner);
        async move {
            match dispatch? {
                Dispatch::Done(outcome) => Ok(outcome),
                Dispatch::Pipeline(ticket) => inner.run(ticket).await,
            }
        }
    }

    /// Render the current snapshot with whatever is bound
    pub fn render(&self) -> Result<(), PipelineError> {
        self.inner.render_now()
    }

    /// Viewport size changed; re-renders when fields are bound
    pub fn resize(&self, width: u32, height: u32) -> Result<(), PipelineError> {
        let bound = {
            let mut state = self.inner.state.borrow_mut();
            state.viewport = (width, height);
            let clip = self.inner.selected_clip(&state.params)?;
            state.aspect = AspectState::for_viewport(&clip, width, height);
            state.pending.is_none() && !state.resources.is_empty()
        };
        self.inner.target.borrow_mut().resize(width, height);
        if bound {
            self.inner.render_now()?;
        }
        Ok(())
    }

    /// Snapshot for the picker; `None` outside the picking modes or while unbound
    pub fn pick_scene(&self) -> Option<PickScene> {
        let state = self.inner.state.borrow();
        if !state.params.mode.supports_picking() || state.pending.is_some() {
            return None;
        }
        let segment = state.resources.segment()?;
        let clip = self.inner.volume_meta.clip(state.params.selected())?;
        Some(PickScene {
            segment,
            params: state.params.clone(),
            aspect: state.aspect,
            clip,
            slice_z: slice_z(&state.params, &clip),
            volume_meta: Rc::clone(&self.inner.volume_meta),
            segment_meta: Rc::clone(&self.inner.segment_meta),
        })
    }

    /// Controls the current mode exposes
    pub fn control_panel(&self) -> ControlPanel {
        let state = self.inner.state.borrow();
        ControlPanel::build(&state.params, &self.inner.volume_meta)
    }

    pub fn params(&self) -> Params {
        self.inner.state.borrow().params.clone()
    }

    pub fn aspect(&self) -> AspectState {
        self.inner.state.borrow().aspect
    }

    /// Generation of the most recently dispatched sequence
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.is_busy()
    }

    /// Number of fields currently bound
    pub fn bound_resources(&self) -> usize {
        self.inner.state.borrow().resources.len()
    }

    pub fn volume_meta(&self) -> &VolumeMeta {
        &self.inner.volume_meta
    }

    pub fn segment_meta(&self) -> &SegmentMeta {
        &self.inner.segment_meta
    }

    pub fn target(&self) -> Ref<'_, T> {
        self.inner.target.borrow()
    }

    pub fn target_mut(&self) -> RefMut<'_, T> {
        self.inner.target.borrow_mut()
    }
}

impl<S, D, T> Inner<S, D, T>
where
    S: VolumeSource,
    D: SdfDeriver,
    T: RenderTarget,
{
    fn selected_clip(&self, params: &Params) -> Result<Clip, PipelineError> {
        self.volume_meta
            .clip(params.selected())
            .ok_or_else(|| PipelineError::UnknownLayer(params.selected().to_string()))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    /// Synchronous half of every operation: validate, commit, and either
    /// render, defer, or start a new sequence
    fn dispatch(&self, delta: &ParamsDelta, reload: bool) -> Result<Dispatch, PipelineError> {
        let mut state = self.state.borrow_mut();
        let (params, mut flags) = state.params.apply(delta, &self.volume_meta).map_err(|err| {
            log::warn!("Rejected parameter change: {}", err);
            err
        })?;
        if reload {
            flags |= ChangeFlags::RELOAD;
        }
        if flags.is_empty() {
            return Ok(Dispatch::Done(Outcome::Unchanged));
        }

        let clip = self.selected_clip(&params)?;
        let (width, height) = state.viewport;
        state.aspect = if width == 0 || height == 0 {
            AspectState::new(clip.aspect(), state.aspect.screen_aspect)
        } else {
            AspectState::for_viewport(&clip, width, height)
        };
        state.params = params;

        if !flags.needs_pipeline() {
            if state.pending.is_some() {
                log::debug!("Deferring {:?} change to the sequence in flight", flags);
                return Ok(Dispatch::Done(Outcome::Deferred));
            }
            drop(state);
            self.render_now()?;
            return Ok(Dispatch::Done(Outcome::Rendered));
        }

        let released = state.resources.clear();
        log::debug!("Released {} field(s) for {} transition", released, state.params.mode);

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        state.pending = Some(generation);

        Ok(Dispatch::Pipeline(Ticket {
            generation,
            mode: state.params.mode,
            id: state.params.selected().to_string(),
            clip,
            _busy: self.busy.acquire(),
        }))
    }

    async fn run(&self, ticket: Ticket) -> Result<Outcome, PipelineError> {
        let result = self.run_stages(&ticket).await;
        match &result {
            Ok(Outcome::Superseded) => {
                log::warn!(
                    "{} {} superseded by generation {}",
                    ticket.mode,
                    ticket.id,
                    self.generation.get()
                );
            }
            Ok(_) => log::info!("{} {} is loaded", ticket.mode, ticket.id),
            Err(err) => {
                if self.is_current(ticket.generation) {
                    self.state.borrow_mut().pending = None;
                }
                log::error!("{} {} failed: {}", ticket.mode, ticket.id, err);
            }
        }
        result
    }

    async fn run_stages(&self, ticket: &Ticket) -> Result<Outcome, PipelineError> {
        let generation = ticket.generation;
        let id = ticket.id.as_str();

        let bindings = match ticket.mode {
            Mode::Segment => {
                log::debug!("Loading segment for {}", id);
                let segment = self.source.load_segment(id).await;
                if !self.is_current(generation) {
                    return Ok(Outcome::Superseded);
                }
                vec![BoundResource::Segment(Rc::new(segment?))]
            }
            Mode::Volume => {
                log::debug!("Loading volume {}", id);
                let volume = self.source.load_volume(id).await;
                if !self.is_current(generation) {
                    return Ok(Outcome::Superseded);
                }
                vec![BoundResource::Volume(Rc::new(volume?))]
            }
            Mode::VolumeSegment | Mode::Layer | Mode::GridLayer => {
                log::debug!("Loading volume and segment for {}", id);
                let loaded = try_join(self.source.load_volume(id), self.source.load_segment(id)).await;
                if !self.is_current(generation) {
                    return Ok(Outcome::Superseded);
                }
                let (volume, segment) = loaded?;

                let label = self.segment_meta.label(id).ok_or_else(|| {
                    PipelineError::DerivationFailure(format!("no segment label for layer '{}'", id))
                })?;
                log::debug!("Clipping segment label {} to {:?}", label, ticket.clip);
                let mask = self.deriver.clip_segment(&segment, &ticket.clip, label).await;
                if !self.is_current(generation) {
                    return Ok(Outcome::Superseded);
                }
                let mask = mask?;

                log::debug!("Deriving SDF for {}", id);
                let sdf = self.deriver.derive_sdf(&mask).await;
                if !self.is_current(generation) {
                    return Ok(Outcome::Superseded);
                }
                vec![
                    BoundResource::Volume(Rc::new(volume)),
                    BoundResource::Segment(Rc::new(segment)),
                    BoundResource::Sdf(Rc::new(sdf?)),
                ]
            }
        };

        {
            let mut state = self.state.borrow_mut();
            for resource in bindings {
                state.resources.bind(resource);
            }
            state.pending = None;
        }

        self.render_now()?;
        Ok(Outcome::Rendered)
    }

    fn render_now(&self) -> Result<(), PipelineError> {
        let state = self.state.borrow();
        let params = &state.params;
        let clip = self.selected_clip(params)?;
        let missing = |what: &str| {
            PipelineError::RenderPrecondition(format!("{} mode needs a bound {} field", params.mode, what))
        };

        let volume = state.resources.volume();
        let segment = state.resources.segment();
        let sdf = state.resources.sdf();

        let content = match params.mode {
            Mode::Segment => FrameContent::Segment {
                segment: segment.as_deref().ok_or_else(|| missing("segment"))?,
                window: Window::from_clip(&clip),
                max_label: self.segment_meta.max_label(),
            },
            Mode::Volume => FrameContent::Volume {
                volume: volume.as_deref().ok_or_else(|| missing("volume"))?,
            },
            Mode::VolumeSegment | Mode::Layer | Mode::GridLayer => FrameContent::Composite {
                volume: volume.as_deref().ok_or_else(|| missing("volume"))?,
                sdf: sdf.as_deref().ok_or_else(|| missing("sdf"))?,
                layout: params.mode.layout(),
            },
        };

        let frame = Frame {
            params,
            aspect: state.aspect,
            clip,
            slice_z: slice_z(params, &clip),
            content,
        };
        self.target.borrow_mut().render(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Extent3, VoxelGrid};
    use crate::sdf::DistanceTransform;
    use crate::source::MemorySource;

    #[derive(Default)]
    struct CountingTarget {
        frames: Vec<(Mode, f32)>,
        size: (u32, u32),
    }

    impl RenderTarget for CountingTarget {
        fn render(&mut self, frame: &Frame<'_>) -> Result<(), PipelineError> {
            self.frames.push((frame.params.mode, frame.params.surface));
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }
    }

    fn controller(mode: Mode) -> ModeController<MemorySource, DistanceTransform, CountingTarget> {
        let clip = Clip::new(0, 0, 0, 8, 4, 4);
        let meta = VolumeMeta::new().with_layer("L1", clip);
        let segment_meta = SegmentMeta::new([8, 4, 4]).with_label("L1", 1);
        let segment = VoxelGrid::from_fn(Extent3::new(8, 4, 4), |x, _, _| u16::from(x < 4));
        let source = MemorySource::new(meta.clone(), segment_meta.clone(), segment)
            .unwrap()
            .with_volume("L1", VoxelGrid::filled(Extent3::new(8, 4, 4), 0.5))
            .unwrap();
        let params = Params::for_meta(&meta, mode).unwrap();
        ModeController::new(source, DistanceTransform, CountingTarget::default(), meta, segment_meta, params)
            .unwrap()
    }

    #[test]
    fn test_refresh_renders_and_binds() {
        let ctrl = controller(Mode::Layer);
        let outcome = pollster::block_on(ctrl.refresh()).unwrap();
        assert_eq!(outcome, Outcome::Rendered);
        assert_eq!(ctrl.bound_resources(), 3);
        assert_eq!(ctrl.target().frames.len(), 1);
        assert!(!ctrl.is_busy());
        assert_eq!(ctrl.generation(), 1);
    }

    #[test]
    fn test_surface_change_renders_without_reload() {
        let ctrl = controller(Mode::Layer);
        pollster::block_on(ctrl.refresh()).unwrap();
        let outcome = pollster::block_on(ctrl.apply(ParamsDelta::surface(0.2))).unwrap();
        assert_eq!(outcome, Outcome::Rendered);
        assert_eq!(ctrl.generation(), 1);
        assert_eq!(ctrl.target().frames.last(), Some(&(Mode::Layer, 0.2)));
    }

    #[test]
    fn test_render_only_change_deferred_while_pending() {
        let ctrl = controller(Mode::Layer);
        let pending = ctrl.refresh();
        let outcome = pollster::block_on(ctrl.apply(ParamsDelta::surface(0.3))).unwrap();
        assert_eq!(outcome, Outcome::Deferred);
        assert_eq!(pollster::block_on(pending).unwrap(), Outcome::Rendered);
        assert_eq!(ctrl.target().frames, vec![(Mode::Layer, 0.3)]);
    }

    #[test]
    fn test_unchanged_delta() {
        let ctrl = controller(Mode::Volume);
        let outcome = pollster::block_on(ctrl.set_mode(Mode::Volume)).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(ctrl.generation(), 0);
    }

    #[test]
    fn test_render_before_load_is_precondition_error() {
        let ctrl = controller(Mode::Volume);
        assert!(matches!(ctrl.render(), Err(PipelineError::RenderPrecondition(_))));
    }

    #[test]
    fn test_resize_updates_aspect() {
        let ctrl = controller(Mode::Volume);
        pollster::block_on(ctrl.refresh()).unwrap();
        ctrl.resize(400, 100).unwrap();
        assert_eq!(ctrl.aspect(), AspectState::new(2.0, 4.0));
        assert_eq!(ctrl.target().size, (400, 100));
        assert_eq!(ctrl.target().frames.len(), 2);
    }

    #[test]
    fn test_pick_scene_only_in_picking_modes() {
        let ctrl = controller(Mode::Volume);
        pollster::block_on(ctrl.refresh()).unwrap();
        assert!(ctrl.pick_scene().is_none());

        pollster::block_on(ctrl.set_mode(Mode::Segment)).unwrap();
        let scene = ctrl.pick_scene().unwrap();
        assert_eq!(scene.resolve(1), Some(("L1".to_string(), Clip::new(0, 0, 0, 8, 4, 4))));
        assert_eq!(scene.resolve(0), None);
    }
}
