use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use chroma_fixtures::Fixture;

use crate::beat::{BeatSource, BeatState};
use crate::color::{blend, lerp, BlendMode, Color};
use crate::effect::effect::{Effect, EffectParams, FrameContext, Movement};
use crate::engine::triple_buffer::{triple_buffer, Reader, Writer};

/// Default compositor tick period (~60 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// One entry in the composite stack. Edited from outside the engine;
/// the tick only ever reads it.
#[derive(Clone)]
pub struct EffectLayer {
    pub effect: Arc<dyn Effect>,
    pub params: EffectParams,
    pub blend_mode: BlendMode,
    pub opacity: f64,
    pub enabled: bool,
}

impl EffectLayer {
    pub fn new(effect: Arc<dyn Effect>, params: EffectParams) -> Self {
        EffectLayer {
            effect,
            params,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            enabled: true,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Full per-fixture actuation state for one tick. Movement fields are
/// `None` when no enabled layer had an opinion.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixtureOutput {
    pub color: Color,
    pub pan: Option<f64>,
    pub tilt: Option<f64>,
    pub gobo: Option<u8>,
    pub strobe_rate: Option<f64>,
    pub zoom: Option<f64>,
}

struct PreparedLayer<'a> {
    layer: &'a EffectLayer,
    ctx: FrameContext,
}

/// Frame-bound evaluator returned by [`build_frame`]. All per-frame
/// work (one `prepare` per enabled layer) is done; evaluation is a
/// pure function of position.
pub struct FrameEvaluator<'a> {
    layers: Vec<PreparedLayer<'a>>,
    master_dimmer: f64,
    has_movement: bool,
}

/// Run `prepare` once for every enabled layer and capture the frame.
pub fn build_frame<'a>(
    stack: &'a [EffectLayer],
    master_dimmer: f64,
    time: f64,
    beat: &BeatState,
) -> FrameEvaluator<'a> {
    let layers: Vec<PreparedLayer<'a>> = stack
        .iter()
        .filter(|layer| layer.enabled)
        .map(|layer| PreparedLayer {
            ctx: layer.effect.prepare(&layer.params, time, beat),
            layer,
        })
        .collect();
    let has_movement = layers
        .iter()
        .any(|prepared| prepared.layer.effect.has_movement());
    FrameEvaluator {
        layers,
        master_dimmer,
        has_movement,
    }
}

impl FrameEvaluator<'_> {
    pub fn has_movement_layers(&self) -> bool {
        self.has_movement
    }

    /// Composite color at a normalized rig position: fold the enabled
    /// layers in stack order, then apply the master dimmer and clamp.
    pub fn evaluate(&self, position: [f64; 3]) -> Color {
        let mut base = Color::BLACK;
        for prepared in &self.layers {
            let layer = prepared.layer;
            let c = layer.effect.shade(position, &prepared.ctx);
            let blended = blend(base, c, layer.blend_mode);
            base = lerp(base, blended, layer.opacity);
        }
        base.scaled(self.master_dimmer).clamped()
    }

    /// Color fold plus the movement merge. Movement values are
    /// actuator targets, not light: a later layer's non-null field
    /// overrides an earlier one regardless of blend mode or opacity.
    pub fn evaluate_fixture_output(&self, position: [f64; 3]) -> FixtureOutput {
        let color = self.evaluate(position);
        let mut movement = Movement::default();
        if self.has_movement {
            for prepared in &self.layers {
                if !prepared.layer.effect.has_movement() {
                    continue;
                }
                if let Some(m) = prepared.layer.effect.movement(position, &prepared.ctx) {
                    movement.apply(&m);
                }
            }
        }
        FixtureOutput {
            color,
            pan: movement.pan,
            tilt: movement.tilt,
            gobo: movement.gobo,
            strobe_rate: movement.strobe_rate,
            zoom: movement.zoom,
        }
    }
}

struct FramePair<T> {
    writer: Mutex<Writer<Vec<T>>>,
    reader: Mutex<Reader<Vec<T>>>,
}

impl<T: Clone + Default + Send> FramePair<T> {
    fn sized(len: usize) -> Self {
        let (writer, reader) = triple_buffer(vec![T::default(); len]);
        FramePair {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }
}

/// Immutable tuple of fixture list, normalized positions and
/// correctly sized frame buffers. Replaced wholesale through one
/// atomic swap, so a tick never sees a position array or buffer whose
/// size disagrees with the fixture count.
struct RigSnapshot {
    fixtures: Vec<Fixture>,
    positions: Vec<[f64; 3]>,
    colors: FramePair<Color>,
    outputs: FramePair<FixtureOutput>,
}

impl RigSnapshot {
    fn new(fixtures: Vec<Fixture>) -> Self {
        let positions = normalize_positions(&fixtures);
        let len = fixtures.len();
        RigSnapshot {
            fixtures,
            positions,
            colors: FramePair::sized(len),
            outputs: FramePair::sized(len),
        }
    }
}

/// Normalize fixture positions per active axis into [0, 1] using the
/// rig's bounding box, so spatial effects are venue-size-independent.
/// A degenerate axis (all fixtures coplanar) collapses to 0.
pub fn normalize_positions(fixtures: &[Fixture]) -> Vec<[f64; 3]> {
    if fixtures.is_empty() {
        return Vec::new();
    }
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for fixture in fixtures {
        for axis in 0..3 {
            min[axis] = min[axis].min(fixture.position[axis]);
            max[axis] = max[axis].max(fixture.position[axis]);
        }
    }
    fixtures
        .iter()
        .map(|fixture| {
            let mut normalized = [0.0; 3];
            for axis in 0..3 {
                let span = max[axis] - min[axis];
                if span > 0.0 {
                    normalized[axis] = (fixture.position[axis] - min[axis]) / span;
                }
            }
            normalized
        })
        .collect()
}

struct CompositorState {
    rig: ArcSwap<RigSnapshot>,
    stack: Mutex<Vec<EffectLayer>>,
    overrides: Mutex<HashMap<usize, Color>>,
    master_dimmer: Mutex<f64>,
    tick_interval: Mutex<Duration>,
    running: AtomicBool,
}

/// The frame compositor: evaluates the effect stack into per-fixture
/// output once per tick and publishes through triple buffers.
pub struct Compositor {
    state: Arc<CompositorState>,
    beat_source: Arc<dyn BeatSource>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Compositor {
    pub fn new(beat_source: Arc<dyn BeatSource>) -> Self {
        Compositor {
            state: Arc::new(CompositorState {
                rig: ArcSwap::from_pointee(RigSnapshot::new(Vec::new())),
                stack: Mutex::new(Vec::new()),
                overrides: Mutex::new(HashMap::new()),
                master_dimmer: Mutex::new(1.0),
                tick_interval: Mutex::new(DEFAULT_TICK_INTERVAL),
                running: AtomicBool::new(false),
            }),
            beat_source,
            task: Mutex::new(None),
        }
    }

    /// Install a new fixture list. Builds a fresh snapshot (positions
    /// plus resized buffers) and swaps it in atomically; in-flight
    /// ticks keep the old snapshot until they finish.
    pub fn update_fixtures(&self, fixtures: Vec<Fixture>) {
        log::info!("Compositor rig updated: {} fixtures", fixtures.len());
        self.state.rig.store(Arc::new(RigSnapshot::new(fixtures)));
    }

    pub fn fixture_count(&self) -> usize {
        self.state.rig.load().fixtures.len()
    }

    // --- stack editing -------------------------------------------------

    pub fn push_layer(&self, layer: EffectLayer) {
        self.state.stack.lock().push(layer);
    }

    pub fn remove_layer(&self, index: usize) -> Option<EffectLayer> {
        let mut stack = self.state.stack.lock();
        if index < stack.len() {
            Some(stack.remove(index))
        } else {
            None
        }
    }

    pub fn move_layer(&self, from: usize, to: usize) {
        let mut stack = self.state.stack.lock();
        if from < stack.len() && to < stack.len() {
            let layer = stack.remove(from);
            stack.insert(to, layer);
        }
    }

    pub fn set_layer_enabled(&self, index: usize, enabled: bool) {
        if let Some(layer) = self.state.stack.lock().get_mut(index) {
            layer.enabled = enabled;
        }
    }

    /// Edit one layer in place (params, opacity, blend mode).
    pub fn with_layer(&self, index: usize, edit: impl FnOnce(&mut EffectLayer)) {
        if let Some(layer) = self.state.stack.lock().get_mut(index) {
            edit(layer);
        }
    }

    pub fn clear_layers(&self) {
        self.state.stack.lock().clear();
    }

    pub fn layer_count(&self) -> usize {
        self.state.stack.lock().len()
    }

    // --- overrides and dimmer ------------------------------------------

    /// Replace the stack output for one fixture (by index) with a
    /// fixed color. Used for identification flashes from outside.
    pub fn set_color_override(&self, fixture_index: usize, color: Color) {
        self.state.overrides.lock().insert(fixture_index, color);
    }

    pub fn clear_color_override(&self, fixture_index: usize) {
        self.state.overrides.lock().remove(&fixture_index);
    }

    pub fn clear_color_overrides(&self) {
        self.state.overrides.lock().clear();
    }

    pub fn set_master_dimmer(&self, level: f64) {
        *self.state.master_dimmer.lock() = level.clamp(0.0, 1.0);
    }

    pub fn master_dimmer(&self) -> f64 {
        *self.state.master_dimmer.lock()
    }

    pub fn set_tick_interval(&self, interval: Duration) {
        *self.state.tick_interval.lock() = interval;
    }

    // --- rendering -----------------------------------------------------

    /// Evaluate one frame and publish it. Called by the engine loop;
    /// exposed so hosts and tests can step the engine manually.
    pub fn render_tick(&self, time: f64, beat: &BeatState) {
        Self::render(&self.state, time, beat);
    }

    fn render(state: &CompositorState, time: f64, beat: &BeatState) {
        let rig = state.rig.load();
        let stack = state.stack.lock();
        let master_dimmer = *state.master_dimmer.lock();
        let evaluator = build_frame(&stack, master_dimmer, time, beat);
        let overrides = state.overrides.lock();

        let mut colors = rig.colors.writer.lock();
        let mut outputs = rig.outputs.writer.lock();
        {
            let color_slot = colors.slot();
            let output_slot = outputs.slot();
            for index in 0..rig.fixtures.len() {
                let mut output = evaluator.evaluate_fixture_output(rig.positions[index]);
                if let Some(color) = overrides.get(&index) {
                    output.color = *color;
                }
                color_slot[index] = output.color;
                output_slot[index] = output;
            }
        }
        colors.publish();
        outputs.publish();
    }

    /// Latest published color frame, one entry per fixture. Reuses
    /// the previous frame when nothing new has been published.
    pub fn latest_colors(&self) -> Vec<Color> {
        let rig = self.state.rig.load();
        let mut reader = rig.colors.reader.lock();
        reader.refresh();
        reader.slot().clone()
    }

    /// Latest published full output frame.
    pub fn latest_outputs(&self) -> Vec<FixtureOutput> {
        let rig = self.state.rig.load();
        let mut reader = rig.outputs.reader.lock();
        reader.refresh();
        reader.slot().clone()
    }

    // --- loop control --------------------------------------------------

    /// Start the engine loop. Idempotent; resets the time origin.
    pub fn start(&self) {
        if self.state.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let state = Arc::clone(&self.state);
        let beat_source = Arc::clone(&self.beat_source);
        log::info!("Compositor started");
        let handle = tokio::spawn(async move {
            let epoch = Instant::now();
            while state.running.load(Ordering::SeqCst) {
                let tick_started = Instant::now();
                let beat = beat_source.sample();
                let time = epoch.elapsed().as_secs_f64();
                Self::render(&state, time, &beat);

                // Best-effort pacing: sleep whatever is left of the
                // interval, or proceed immediately after an overrun.
                let interval = *state.tick_interval.lock();
                let spent = tick_started.elapsed();
                if spent < interval {
                    tokio::time::sleep(interval - spent).await;
                }
            }
            log::info!("Compositor loop exited");
        });
        *self.task.lock() = Some(handle);
    }

    /// Stop scheduling further ticks. The in-flight tick, if any,
    /// runs to completion. Idempotent.
    pub fn stop(&self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return;
        }
        log::info!("Compositor stopping");
        self.task.lock().take();
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }
}
