//! Stroke session orchestration: one pointer-down-to-pointer-up
//! interaction.
//!
//! [`StrokeEngine`] owns the only mutable cross-call state: the layer
//! manager, the mask pipeline cache, the shared PRNG, and the in-progress
//! stroke. Everything here runs on the caller's single thread; the engine
//! is deliberately not `Sync`.

use super::jitter::JitterEngine;
use super::strategy::{DrawStrategy, EffectRenderer};
use crate::brush::{BrushTip, MaskPipeline};
use crate::canvas::{Canvas, LayerManager};
use crate::color::{hsv_to_rgb, rgb_to_hsv, Rgba8};
use crate::compositor::{self, StampParams, StampSource};
use crate::error::Result;
use crate::geometry::CanvasPoint;
use crate::history::SnapshotStore;
use crate::settings::{BrushSettings, ColorInfluence, ALPHA_RANGE, SIZE_RANGE};
use crate::symmetry::{self, SymmetryOrigin};

const HISTORY_CAPACITY: usize = 64;
/// Floor on the stamp spacing so a huge density cannot stall a move event.
const MIN_STAMP_INTERVAL: f32 = 0.5;
/// Fallback spacing divisor for the line tool when density is unbounded.
const LINE_FALLBACK_DENSITY: f32 = 4.0;

/// Per-gesture state, created on pointer-down and dropped on pointer-up.
#[derive(Debug)]
struct StrokeState {
    last: CanvasPoint,
    last_pressure: f32,
    /// Distance already travelled toward the next stamp.
    leftover: f32,
    stamped: bool,
    start: CanvasPoint,
    start_pressure: f32,
    /// Orient-to-stroke defers the first stamp until direction is known.
    deferred_first: bool,
}

#[derive(Debug, Default)]
struct ShiftDirection {
    size_down: bool,
    flow_down: bool,
}

/// The stroke compositing engine.
pub struct StrokeEngine {
    settings: BrushSettings,
    strategy: DrawStrategy,
    symmetry_origin: SymmetryOrigin,
    jitter: JitterEngine,
    pipeline: MaskPipeline,
    layers: LayerManager,
    store: Box<dyn SnapshotStore>,
    /// The unedited source surface; the eraser restores these pixels.
    original: Canvas,
    clone_origin: Option<CanvasPoint>,
    clone_source: Option<Canvas>,
    clone_offset: (i32, i32),
    effect: Option<Box<dyn EffectRenderer>>,
    effect_surface: Option<Canvas>,
    state: Option<StrokeState>,
    shift_dir: ShiftDirection,
    /// Pressure-resolved opacity of the current stroke, applied once at
    /// merge/commit time. Tracks the most recent stamp's pressure.
    stroke_opacity: f32,
    stamps_emitted: u64,
}

impl StrokeEngine {
    /// Create an engine over an existing source image.
    pub fn new(
        source: Canvas,
        tip: BrushTip,
        settings: BrushSettings,
        store: Box<dyn SnapshotStore>,
    ) -> Self {
        let original = source.clone();
        let center = CanvasPoint::new(source.width() as f32 / 2.0, source.height() as f32 / 2.0);
        let stroke_opacity = settings.opacity;
        Self {
            settings,
            strategy: DrawStrategy::NormalBrush,
            symmetry_origin: SymmetryOrigin {
                center,
                offsets: Vec::new(),
            },
            jitter: JitterEngine::from_entropy(),
            pipeline: MaskPipeline::new(tip),
            layers: LayerManager::from_source(source, HISTORY_CAPACITY),
            store,
            original,
            clone_origin: None,
            clone_source: None,
            clone_offset: (0, 0),
            effect: None,
            effect_surface: None,
            state: None,
            shift_dir: ShiftDirection::default(),
            stroke_opacity,
            stamps_emitted: 0,
        }
    }

    pub fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    /// Install a new settings snapshot. Invalidates the mask cache.
    pub fn set_settings(&mut self, settings: BrushSettings) {
        self.stroke_opacity = settings.opacity;
        self.settings = settings;
        self.pipeline.invalidate();
    }

    pub fn set_strategy(&mut self, strategy: DrawStrategy) {
        self.strategy = strategy;
    }

    pub fn set_tip(&mut self, tip: BrushTip) {
        self.pipeline.set_tip(tip);
    }

    /// Replace the shared PRNG, e.g. with a seeded one for tests.
    pub fn set_jitter(&mut self, jitter: JitterEngine) {
        self.jitter = jitter;
    }

    pub fn set_symmetry_origin(&mut self, center: CanvasPoint) {
        self.symmetry_origin.center = center;
    }

    /// Offset points for set-points symmetry, relative to the origin.
    pub fn set_symmetry_points(&mut self, offsets: Vec<CanvasPoint>) {
        self.symmetry_origin.offsets = offsets;
    }

    pub fn clear_clone_origin(&mut self) {
        self.clone_origin = None;
    }

    /// Install an effect; its render step runs immediately against the
    /// committed surface and again after every finalized stroke.
    pub fn set_effect(&mut self, mut effect: Box<dyn EffectRenderer>) {
        self.effect_surface = Some(effect.render(self.layers.committed()));
        self.effect = Some(effect);
    }

    pub fn clear_effect(&mut self) {
        self.effect = None;
        self.effect_surface = None;
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn committed(&self) -> &Canvas {
        self.layers.committed()
    }

    /// The buffer a display layer should present, after merging any
    /// pending dirty regions.
    pub fn display(&mut self) -> &Canvas {
        self.layers.merge_dirty_regions(
            self.settings.blend_mode,
            self.stroke_opacity,
            &self.settings.locks,
        );
        self.layers.merged()
    }

    pub fn is_drawing(&self) -> bool {
        self.state.is_some()
    }

    /// Total logical stamps emitted over the engine's lifetime.
    pub fn stamp_count(&self) -> u64 {
        self.stamps_emitted
    }

    pub fn undo(&mut self) -> Result<bool> {
        self.layers.undo(self.store.as_mut())
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.layers.redo(self.store.as_mut())
    }

    /// Begin a stroke. The first stamp is issued immediately unless
    /// orient-to-stroke defers it or the clone stamp still needs its
    /// origin.
    pub fn pointer_down(&mut self, x: f32, y: f32, pressure: f32) {
        if self.state.is_some() {
            return;
        }
        let point = CanvasPoint::new(x, y);

        if self.strategy == DrawStrategy::CloneStamp {
            match self.clone_origin {
                None => {
                    // First click only arms the clone origin.
                    self.clone_origin = Some(point);
                    tracing::debug!("Clone origin set at ({}, {})", x, y);
                    return;
                }
                Some(origin) => {
                    self.clone_offset = (
                        (origin.x - point.x).round() as i32,
                        (origin.y - point.y).round() as i32,
                    );
                    self.clone_source = Some(self.layers.committed().clone());
                }
            }
        }

        let mut state = StrokeState {
            last: point,
            last_pressure: pressure,
            leftover: 0.0,
            stamped: false,
            start: point,
            start_pressure: pressure,
            deferred_first: self.settings.orient_to_stroke,
        };
        if !state.deferred_first && self.strategy != DrawStrategy::LineTool {
            self.stamp_at(point, pressure, 0.0, &mut state);
        }
        self.state = Some(state);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, pressure: f32) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        let point = CanvasPoint::new(x, y);

        if self.strategy == DrawStrategy::LineTool {
            state.last = point;
            state.last_pressure = pressure;
            self.state = Some(state);
            return;
        }

        // Minimum draw distance suppresses both stamping and position
        // tracking until the pointer has moved far enough.
        let min_distance = self.settings.resolved_min_distance(pressure);
        if min_distance > 0.0 && state.last.distance_to(&point) < min_distance {
            self.state = Some(state);
            return;
        }

        let direction = state.last.angle_to(&point).to_degrees();
        if state.deferred_first {
            state.deferred_first = false;
            let start = state.last;
            let start_pressure = state.last_pressure;
            self.stamp_at(start, start_pressure, direction, &mut state);
        }

        if self.settings.density <= 0.0 {
            // Unbounded density: one stamp per move event.
            self.stamp_at(point, pressure, direction, &mut state);
            state.last = point;
            state.last_pressure = pressure;
        } else {
            self.walk_segment(point, pressure, direction, &mut state);
        }
        self.state = Some(state);
    }

    /// End the stroke. A gesture that never produced a stamp still paints
    /// exactly once at full synthetic pressure, so a click always marks
    /// the canvas.
    pub fn pointer_up(&mut self, x: f32, y: f32, pressure: f32) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        let point = CanvasPoint::new(x, y);

        if self.strategy == DrawStrategy::LineTool {
            let (start, start_pressure) = (state.start, state.start_pressure);
            self.stamp_line(start, start_pressure, point, pressure, &mut state);
        }
        if !state.stamped {
            self.stamp_at(point, 1.0, 0.0, &mut state);
        }

        self.layers.finalize_stroke(
            self.settings.blend_mode,
            self.stroke_opacity,
            &self.settings.locks,
        );
        self.clone_source = None;

        if let Some(effect) = self.effect.as_mut() {
            // Re-render against the freshly committed surface.
            self.effect_surface = Some(effect.render(self.layers.committed()));
        }
    }

    /// Stamp at fixed intervals of `size / density` along the travel
    /// vector, carrying the sub-interval remainder so spacing stays
    /// uniform across move events. Pressure is interpolated linearly.
    fn walk_segment(
        &mut self,
        to: CanvasPoint,
        pressure: f32,
        direction: f32,
        state: &mut StrokeState,
    ) {
        let from = state.last;
        let from_pressure = state.last_pressure;
        let total = from.distance_to(&to);
        if total <= 0.0 {
            state.last_pressure = pressure;
            return;
        }

        let mut offset = 0.0f32;
        loop {
            let t = (offset / total).min(1.0);
            let pressure_here = from_pressure + (pressure - from_pressure) * t;
            let interval = (self.settings.resolved_size(pressure_here) / self.settings.density)
                .max(MIN_STAMP_INTERVAL);
            let need = (interval - state.leftover).max(0.0);
            if offset + need > total {
                state.leftover += total - offset;
                break;
            }
            offset += need;
            state.leftover = 0.0;

            let t = offset / total;
            let position = from.lerp(&to, t);
            let pressure_at = from_pressure + (pressure - from_pressure) * t;
            self.stamp_at(position, pressure_at, direction, state);
        }

        state.last = to;
        state.last_pressure = pressure;
    }

    /// Line tool: emit evenly spaced stamps along the confirmed segment.
    fn stamp_line(
        &mut self,
        from: CanvasPoint,
        from_pressure: f32,
        to: CanvasPoint,
        to_pressure: f32,
        state: &mut StrokeState,
    ) {
        let direction = from.angle_to(&to).to_degrees();
        self.stamp_at(from, from_pressure, direction, state);

        let total = from.distance_to(&to);
        if total <= 0.0 {
            return;
        }
        let density = if self.settings.density > 0.0 {
            self.settings.density
        } else {
            LINE_FALLBACK_DENSITY
        };

        let mut offset = 0.0f32;
        loop {
            let t = (offset / total).min(1.0);
            let pressure_here = from_pressure + (to_pressure - from_pressure) * t;
            let interval =
                (self.settings.resolved_size(pressure_here) / density).max(MIN_STAMP_INTERVAL);
            offset += interval;
            if offset >= total {
                break;
            }
            let t = offset / total;
            let position = from.lerp(&to, t);
            let pressure_at = from_pressure + (to_pressure - from_pressure) * t;
            self.stamp_at(position, pressure_at, direction, state);
        }

        self.stamp_at(to, to_pressure, direction, state);
    }

    /// Resolve, jitter, fan out through symmetry, and rasterize one
    /// logical stamp.
    fn stamp_at(
        &mut self,
        position: CanvasPoint,
        pressure: f32,
        direction_deg: f32,
        state: &mut StrokeState,
    ) {
        if self.strategy == DrawStrategy::EffectBrush && self.effect_surface.is_none() {
            tracing::debug!("Effect brush without a rendered surface; stamp skipped");
            return;
        }

        self.layers.begin_stroke_if_needed(self.store.as_mut());

        let jitter_cfg = self.settings.resolved_jitter(pressure);
        let radius = self
            .jitter
            .radius(self.settings.resolved_size(pressure) / 2.0, &jitter_cfg);
        let mut rotation = self
            .jitter
            .rotation(self.settings.resolved_rotation(pressure), &jitter_cfg);
        if self.settings.orient_to_stroke {
            rotation += direction_deg;
        }
        let flow = self.jitter.flow(self.settings.resolved_flow(pressure), &jitter_cfg);
        let position = self.jitter.position(
            position,
            &jitter_cfg,
            self.layers.width(),
            self.layers.height(),
        );

        let mut color = self.settings.color;
        if jitter_cfg.recolors() {
            color = self.jitter.color(color, &jitter_cfg);
        }
        if self.settings.color_influence.is_active() {
            let picked = self
                .layers
                .committed()
                .pixel(position.x as i32, position.y as i32);
            color = influence_color(color, picked, &self.settings.color_influence);
        }

        self.stroke_opacity = self.settings.resolved_opacity(pressure);
        let staging = self.strategy.uses_staging(
            &self.settings,
            self.stroke_opacity,
            self.layers.staging_active(),
        );
        if staging {
            self.layers.require_staging();
        }

        // Masked-overwrite tools only consume the mask's alpha stencil.
        let colorize = self.settings.colorize || self.strategy.is_masked_overwrite();
        let mask = self
            .pipeline
            .prepare(self.settings.max_stamp_size(), colorize, color, flow);

        let locations =
            symmetry::stamp_locations(position, self.settings.symmetry, &self.symmetry_origin);
        let mut touched_any = false;
        for loc in locations {
            let params = StampParams {
                center: loc.position,
                radius,
                rotation_deg: rotation + loc.rotation_offset,
                mirror_x: loc.mirror_x,
                mirror_y: loc.mirror_y,
                alpha: 1.0,
                smoothing: self.settings.smoothing,
                seamless: self.settings.seamless,
                dither: self.settings.dither,
                locks: self.settings.locks,
            };

            let touched = match self.strategy {
                DrawStrategy::NormalBrush | DrawStrategy::LineTool => {
                    let target = if staging {
                        self.layers.staged_mut()
                    } else {
                        self.layers.committed_mut()
                    };
                    compositor::stamp(target, mask, StampSource::Mask, &params)
                }
                DrawStrategy::Eraser => compositor::stamp(
                    self.layers.committed_mut(),
                    mask,
                    StampSource::Surface {
                        surface: &self.original,
                        offset: (0, 0),
                    },
                    &params,
                ),
                DrawStrategy::CloneStamp => match self.clone_source.as_ref() {
                    Some(source) => compositor::stamp(
                        self.layers.committed_mut(),
                        mask,
                        StampSource::Surface {
                            surface: source,
                            offset: self.clone_offset,
                        },
                        &params,
                    ),
                    None => None,
                },
                DrawStrategy::EffectBrush => match self.effect_surface.as_ref() {
                    Some(surface) => compositor::stamp(
                        self.layers.committed_mut(),
                        mask,
                        StampSource::Surface {
                            surface,
                            offset: (0, 0),
                        },
                        &params,
                    ),
                    None => None,
                },
            };

            if let Some(rect) = touched {
                touched_any = true;
                if staging {
                    self.layers.push_region(rect);
                }
            }
        }

        if touched_any {
            state.stamped = true;
            self.stamps_emitted += 1;
        }
        self.apply_auto_shift();
    }

    /// Post-stamp auto-shift: size and flow ping-pong at their range
    /// ends, rotation wraps at +/-360 degrees.
    fn apply_auto_shift(&mut self) {
        let shift = self.settings.shift;
        if shift.size > 0.0 {
            let (min, max) = SIZE_RANGE;
            if self.shift_dir.size_down {
                self.settings.size -= shift.size;
                if self.settings.size <= min {
                    self.settings.size = min;
                    self.shift_dir.size_down = false;
                }
            } else {
                self.settings.size += shift.size;
                if self.settings.size >= max {
                    self.settings.size = max;
                    self.shift_dir.size_down = true;
                }
            }
        }
        if shift.flow > 0.0 {
            let (min, max) = ALPHA_RANGE;
            if self.shift_dir.flow_down {
                self.settings.flow -= shift.flow;
                if self.settings.flow <= min {
                    self.settings.flow = min;
                    self.shift_dir.flow_down = false;
                }
            } else {
                self.settings.flow += shift.flow;
                if self.settings.flow >= max {
                    self.settings.flow = max;
                    self.shift_dir.flow_down = true;
                }
            }
        }
        if shift.rotation != 0.0 {
            let mut rotation = self.settings.rotation + shift.rotation;
            if rotation > 360.0 {
                rotation -= 720.0;
            } else if rotation < -360.0 {
                rotation += 720.0;
            }
            self.settings.rotation = rotation;
        }
    }
}

/// Pull the picked-up canvas color into the brush color per enabled HSV
/// channel.
fn influence_color(color: Rgba8, picked: Rgba8, influence: &ColorInfluence) -> Rgba8 {
    if picked.a == 0 {
        return color;
    }
    let t = (influence.amount / 100.0).clamp(0.0, 1.0);
    let (h, s, v) = rgb_to_hsv(color.r, color.g, color.b);
    let (ph, ps, pv) = rgb_to_hsv(picked.r, picked.g, picked.b);
    let h = if influence.hue { h + (ph - h) * t } else { h };
    let s = if influence.saturation { s + (ps - s) * t } else { s };
    let v = if influence.value { v + (pv - v) * t } else { v };
    let (r, g, b) = hsv_to_rgb(h, s, v);
    Rgba8::new(r, g, b, color.a)
}
