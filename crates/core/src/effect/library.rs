use std::f64::consts::PI;
use std::sync::Arc;

use crate::beat::BeatState;
use crate::color::Color;
use crate::effect::effect::{
    effect_phase, Effect, EffectParams, EffectRegistry, FrameContext, Movement,
};

/// Register every built-in effect. Hosts extend the registry with
/// their own factories on top of this.
pub fn builtin_registry() -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    registry.register("solid", || Arc::new(SolidEffect));
    registry.register("pulse", || Arc::new(PulseEffect));
    registry.register("wave", || Arc::new(WaveEffect));
    registry.register("chase", || Arc::new(ChaseEffect));
    registry.register("rainbow", || Arc::new(RainbowEffect));
    registry.register("strobe", || Arc::new(StrobeEffect));
    registry.register("sweep", || Arc::new(SweepEffect));
    registry
}

fn axis_param(params: &EffectParams) -> usize {
    params.get_usize("axis", 0).min(2)
}

/// Flat color across the whole rig.
pub struct SolidEffect;

impl Effect for SolidEffect {
    fn id(&self) -> &'static str {
        "solid"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, _beat: &BeatState) -> FrameContext {
        FrameContext::Solid {
            color: params.get_color("color", Color::WHITE),
        }
    }

    fn shade(&self, _position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Solid { color } => *color,
            _ => Color::BLACK,
        }
    }
}

/// Whole-rig sine pulse locked to the beat.
pub struct PulseEffect;

impl Effect for PulseEffect {
    fn id(&self) -> &'static str {
        "pulse"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        let phase = effect_phase(params, beat);
        FrameContext::Pulse {
            color: params.get_color("color", Color::WHITE),
            level: (phase * 2.0 * PI).sin() * 0.5 + 0.5,
        }
    }

    fn shade(&self, _position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Pulse { color, level } => color.scaled(*level),
            _ => Color::BLACK,
        }
    }
}

/// Sine wave travelling across the rig along one axis.
pub struct WaveEffect;

impl Effect for WaveEffect {
    fn id(&self) -> &'static str {
        "wave"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        FrameContext::Wave {
            color: params.get_color("color", Color::WHITE),
            phase: effect_phase(params, beat),
            spatial_freq: params.get_f64("spatial_freq", 1.0),
            axis: axis_param(params),
        }
    }

    fn shade(&self, position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Wave {
                color,
                phase,
                spatial_freq,
                axis,
            } => {
                let wave_phase = position[*axis] * spatial_freq + phase;
                color.scaled((wave_phase * 2.0 * PI).sin() * 0.5 + 0.5)
            }
            _ => Color::BLACK,
        }
    }
}

/// A lit window travelling down the rig; everything outside is dark.
pub struct ChaseEffect;

impl Effect for ChaseEffect {
    fn id(&self) -> &'static str {
        "chase"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        FrameContext::Chase {
            color: params.get_color("color", Color::WHITE),
            head: effect_phase(params, beat),
            width: params.get_f64("width", 0.15),
            axis: axis_param(params),
        }
    }

    fn shade(&self, position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Chase {
                color,
                head,
                width,
                axis,
            } => {
                // Wrap-around distance so the chase re-enters smoothly.
                let d = (position[*axis] - head).abs();
                let distance = d.min(1.0 - d);
                if distance < *width {
                    *color
                } else {
                    Color::BLACK
                }
            }
            _ => Color::BLACK,
        }
    }
}

/// Hue gradient across the rig, scrolling with the beat.
pub struct RainbowEffect;

impl Effect for RainbowEffect {
    fn id(&self) -> &'static str {
        "rainbow"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        FrameContext::Rainbow {
            phase: effect_phase(params, beat),
            spread: params.get_f64("spread", 1.0),
            axis: axis_param(params),
        }
    }

    fn shade(&self, position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Rainbow {
                phase,
                spread,
                axis,
            } => Color::from_hsv(position[*axis] * spread + phase, 1.0, 1.0),
            _ => Color::BLACK,
        }
    }
}

/// Hard on/off strobe subdividing the locked interval.
pub struct StrobeEffect;

impl Effect for StrobeEffect {
    fn id(&self) -> &'static str {
        "strobe"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        let phase = effect_phase(params, beat);
        let rate = params.get_f64("rate", 4.0).max(1.0);
        FrameContext::Strobe {
            color: params.get_color("color", Color::WHITE),
            on: (phase * rate).fract() < 0.5,
        }
    }

    fn shade(&self, _position: [f64; 3], ctx: &FrameContext) -> Color {
        match ctx {
            FrameContext::Strobe { color, on } => {
                if *on {
                    *color
                } else {
                    Color::BLACK
                }
            }
            _ => Color::BLACK,
        }
    }
}

/// Circular pan/tilt sweep for moving heads. Emits no light of its
/// own; stack it over a color layer.
pub struct SweepEffect;

impl Effect for SweepEffect {
    fn id(&self) -> &'static str {
        "sweep"
    }

    fn prepare(&self, params: &EffectParams, _time: f64, beat: &BeatState) -> FrameContext {
        let phase = effect_phase(params, beat);
        let angle = phase * 2.0 * PI;
        FrameContext::Sweep {
            pan: params.get_f64("center_pan", 0.5) + angle.cos() * params.get_f64("radius", 0.25),
            tilt: params.get_f64("center_tilt", 0.5) + angle.sin() * params.get_f64("radius", 0.25),
            radius: params.get_f64("radius", 0.25),
        }
    }

    fn shade(&self, _position: [f64; 3], _ctx: &FrameContext) -> Color {
        Color::BLACK
    }

    fn movement(&self, position: [f64; 3], ctx: &FrameContext) -> Option<Movement> {
        match ctx {
            FrameContext::Sweep { pan, tilt, radius } => {
                // Spread heads along the circle by their x position.
                let offset = position[0] * radius * 0.5;
                Some(Movement {
                    pan: Some((pan + offset).clamp(0.0, 1.0)),
                    tilt: Some(tilt.clamp(0.0, 1.0)),
                    ..Movement::default()
                })
            }
            _ => None,
        }
    }

    fn has_movement(&self) -> bool {
        true
    }
}
