//! Per-mode parameter controls
//!
//! A [`ControlPanel`] lists the parameters the current mode exposes and
//! their domains. It never mutates parameters itself: [`ControlPanel::step`]
//! turns a user nudge into a [`ParamsDelta`] for the controller to apply.

use crate::meta::VolumeMeta;
use crate::params::{Mode, Params, ParamsDelta, SURFACE_MAX, SURFACE_MIN};

/// Increment used when stepping the surface threshold
pub const SURFACE_STEP: f32 = 0.005;

/// Parameter a control is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Mode,
    Layers,
    Surface,
    Inverse,
    Layer,
}

/// Domain of a control
#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    /// One of a fixed list of names
    Choice(Vec<String>),
    /// Numeric range; `step` is `None` for continuous values
    Range { min: f32, max: f32, step: Option<f32> },
    Toggle,
}

/// A bound control
#[derive(Clone, Debug, PartialEq)]
pub struct Control {
    pub key: ParamKey,
    pub label: &'static str,
    pub kind: ControlKind,
}

/// Controls exposed for one mode and layer selection
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPanel {
    mode: Mode,
    controls: Vec<Control>,
}

impl ControlPanel {
    /// Controls for `params.mode`; the layer range follows the selected clip
    pub fn build(params: &Params, meta: &VolumeMeta) -> Self {
        let mut controls = vec![
            Control {
                key: ParamKey::Mode,
                label: "mode",
                kind: ControlKind::Choice(Mode::ALL.iter().map(|m| m.name().to_string()).collect()),
            },
            Control {
                key: ParamKey::Layers,
                label: "layers",
                kind: ControlKind::Choice(params.layers.options.clone()),
            },
        ];

        let surface = Control {
            key: ParamKey::Surface,
            label: "surface",
            kind: ControlKind::Range {
                min: SURFACE_MIN,
                max: SURFACE_MAX,
                step: None,
            },
        };
        let inverse = Control {
            key: ParamKey::Inverse,
            label: "inverse",
            kind: ControlKind::Toggle,
        };

        match params.mode {
            Mode::Segment | Mode::Volume => {}
            Mode::VolumeSegment => controls.push(surface),
            Mode::Layer => {
                controls.push(inverse);
                controls.push(surface);
                if let Some(clip) = meta.clip(params.selected()) {
                    let (lo, hi) = clip.slice_range();
                    controls.push(Control {
                        key: ParamKey::Layer,
                        label: "layer",
                        kind: ControlKind::Range {
                            min: lo as f32,
                            max: hi as f32,
                            step: Some(1.0),
                        },
                    });
                }
            }
            Mode::GridLayer => {
                controls.push(inverse);
                controls.push(surface);
            }
        }

        Self {
            mode: params.mode,
            controls,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, key: ParamKey) -> Option<&Control> {
        self.controls.iter().find(|c| c.key == key)
    }

    /// Nudge the control bound to `key` by one step in direction `dir`
    ///
    /// Returns `None` when the mode exposes no such control or the nudge
    /// would not change anything (already at a bound).
    pub fn step(&self, params: &Params, key: ParamKey, dir: i32) -> Option<ParamsDelta> {
        let control = self.control(key)?;
        let forward = dir >= 0;

        match (&control.kind, key) {
            (ControlKind::Choice(names), ParamKey::Mode) => {
                let current = names.iter().position(|n| n == params.mode.name())?;
                let next = cycle(current, names.len(), forward);
                names[next].parse::<Mode>().ok().map(ParamsDelta::mode)
            }
            (ControlKind::Choice(names), ParamKey::Layers) => {
                if names.len() < 2 {
                    return None;
                }
                let current = names.iter().position(|n| n == params.selected()).unwrap_or(0);
                Some(ParamsDelta::select(names[cycle(current, names.len(), forward)].clone()))
            }
            (ControlKind::Toggle, ParamKey::Inverse) => Some(ParamsDelta::inverse(!params.inverse)),
            (ControlKind::Range { min, max, .. }, ParamKey::Surface) => {
                let delta = if forward { SURFACE_STEP } else { -SURFACE_STEP };
                let next = (params.surface + delta).clamp(*min, *max);
                (next != params.surface).then(|| ParamsDelta::surface(next))
            }
            (ControlKind::Range { min, max, .. }, ParamKey::Layer) => {
                let (lo, hi) = (*min as u32, *max as u32);
                let next = if forward {
                    params.layer.saturating_add(1).min(hi)
                } else {
                    params.layer.saturating_sub(1).max(lo)
                };
                (next != params.layer).then(|| ParamsDelta::layer(next))
            }
            _ => None,
        }
    }
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Clip;

    fn meta() -> VolumeMeta {
        VolumeMeta::new()
            .with_layer("L1", Clip::new(0, 0, 4, 16, 16, 10))
            .with_layer("L2", Clip::new(0, 0, 20, 16, 8, 6))
    }

    fn keys(mode: Mode) -> Vec<ParamKey> {
        let params = Params::for_meta(&meta(), mode).unwrap();
        ControlPanel::build(&params, &meta())
            .controls()
            .iter()
            .map(|c| c.key)
            .collect()
    }

    #[test]
    fn test_controls_per_mode() {
        use ParamKey as K;
        assert_eq!(keys(Mode::Segment), vec![K::Mode, K::Layers]);
        assert_eq!(keys(Mode::Volume), vec![K::Mode, K::Layers]);
        assert_eq!(keys(Mode::VolumeSegment), vec![K::Mode, K::Layers, K::Surface]);
        assert_eq!(
            keys(Mode::Layer),
            vec![K::Mode, K::Layers, K::Inverse, K::Surface, K::Layer]
        );
        assert_eq!(keys(Mode::GridLayer), vec![K::Mode, K::Layers, K::Inverse, K::Surface]);
    }

    #[test]
    fn test_layer_range_follows_clip() {
        let params = Params::for_meta(&meta(), Mode::Layer).unwrap();
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(
            panel.control(ParamKey::Layer).unwrap().kind,
            ControlKind::Range { min: 4.0, max: 14.0, step: Some(1.0) }
        );
    }

    #[test]
    fn test_step_layer_clamps() {
        let params = Params::for_meta(&meta(), Mode::Layer).unwrap();
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(panel.step(&params, ParamKey::Layer, -1), None);
        assert_eq!(panel.step(&params, ParamKey::Layer, 1), Some(ParamsDelta::layer(5)));
    }

    #[test]
    fn test_step_surface_clamps() {
        let mut params = Params::for_meta(&meta(), Mode::VolumeSegment).unwrap();
        params.surface = SURFACE_MAX;
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(panel.step(&params, ParamKey::Surface, 1), None);
        let delta = panel.step(&params, ParamKey::Surface, -1).unwrap();
        assert!(delta.surface.unwrap() < SURFACE_MAX);
    }

    #[test]
    fn test_step_hidden_control() {
        let params = Params::for_meta(&meta(), Mode::Volume).unwrap();
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(panel.step(&params, ParamKey::Surface, 1), None);
        assert_eq!(panel.step(&params, ParamKey::Inverse, 1), None);
    }

    #[test]
    fn test_step_cycles_mode_and_layers() {
        let params = Params::for_meta(&meta(), Mode::VolumeSegment).unwrap();
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(panel.step(&params, ParamKey::Mode, 1), Some(ParamsDelta::mode(Mode::Segment)));
        assert_eq!(panel.step(&params, ParamKey::Mode, -1), Some(ParamsDelta::mode(Mode::Volume)));
        assert_eq!(panel.step(&params, ParamKey::Layers, 1), Some(ParamsDelta::select("L2")));
    }

    #[test]
    fn test_step_inverse_toggles() {
        let params = Params::for_meta(&meta(), Mode::GridLayer).unwrap();
        let panel = ControlPanel::build(&params, &meta());
        assert_eq!(panel.step(&params, ParamKey::Inverse, 1), Some(ParamsDelta::inverse(true)));
    }
}
