use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::beat::BeatState;
use crate::color::Color;

/// Physical actuator targets produced by a movement-capable effect.
///
/// `None` means "no opinion": a later layer's value wins per field,
/// and anything still unset falls back to the fixture profile's
/// default byte in the bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Movement {
    /// Pan travel, normalized 0..1.
    pub pan: Option<f64>,
    /// Tilt travel, normalized 0..1.
    pub tilt: Option<f64>,
    /// Gobo wheel slot, written to the wire as-is.
    pub gobo: Option<u8>,
    /// Strobe rate, normalized 0..1.
    pub strobe_rate: Option<f64>,
    /// Zoom, normalized 0..1.
    pub zoom: Option<f64>,
}

impl Movement {
    /// Overlay `later` on top of self, per field. Last write wins.
    pub fn apply(&mut self, later: &Movement) {
        if later.pan.is_some() {
            self.pan = later.pan;
        }
        if later.tilt.is_some() {
            self.tilt = later.tilt;
        }
        if later.gobo.is_some() {
            self.gobo = later.gobo;
        }
        if later.strobe_rate.is_some() {
            self.strobe_rate = later.strobe_rate;
        }
        if later.zoom.is_some() {
            self.zoom = later.zoom;
        }
    }
}

/// Per-frame cache produced by [`Effect::prepare`], one variant per
/// effect family. Everything that depends only on (params, time,
/// beat) is computed once here, then shared across every fixture
/// evaluation in the frame.
#[derive(Clone, Debug)]
pub enum FrameContext {
    Solid {
        color: Color,
    },
    Pulse {
        color: Color,
        level: f64,
    },
    Wave {
        color: Color,
        phase: f64,
        spatial_freq: f64,
        axis: usize,
    },
    Chase {
        color: Color,
        head: f64,
        width: f64,
        axis: usize,
    },
    Rainbow {
        phase: f64,
        spread: f64,
        axis: usize,
    },
    Strobe {
        color: Color,
        on: bool,
    },
    Sweep {
        pan: f64,
        tilt: f64,
        radius: f64,
    },
    /// Escape hatch for effects defined outside this crate.
    Opaque(Arc<dyn Any + Send + Sync>),
}

/// A procedural lighting effect.
///
/// `prepare` runs once per frame per enabled layer; `shade` runs once
/// per fixture and must be a pure function of its arguments.
pub trait Effect: Send + Sync {
    /// Stable identifier used by the registry and the stack editor.
    fn id(&self) -> &'static str;

    fn prepare(&self, params: &EffectParams, time: f64, beat: &BeatState) -> FrameContext;

    /// Color for a fixture at `position` (normalized rig coordinates,
    /// each axis 0..1).
    fn shade(&self, position: [f64; 3], ctx: &FrameContext) -> Color;

    /// Movement targets for a fixture. Most effects emit light only.
    fn movement(&self, _position: [f64; 3], _ctx: &FrameContext) -> Option<Movement> {
        None
    }

    /// Whether this effect ever emits movement. Lets the engine skip
    /// the movement path when no such layer is enabled.
    fn has_movement(&self) -> bool {
        false
    }
}

/// Opaque parameter bag attached to a stack layer. The engine never
/// interprets it; each effect pulls out what it understands.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EffectParams(pub serde_json::Map<String, Value>);

impl EffectParams {
    pub fn new() -> Self {
        EffectParams(serde_json::Map::new())
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set_color(self, key: &str, color: Color) -> Self {
        self.set(key, serde_json::json!([color.r, color.g, color.b]))
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(Value::as_str).unwrap_or(default)
    }

    pub fn get_color(&self, key: &str, default: Color) -> Color {
        match self.0.get(key).and_then(Value::as_array) {
            Some(rgb) if rgb.len() == 3 => {
                let c = |i: usize| rgb[i].as_f64().unwrap_or(0.0);
                Color::new(c(0), c(1), c(2))
            }
            _ => default,
        }
    }
}

/// Phase of the beat interval a layer is locked to, with ratio and
/// offset applied. Mirrors how the stack editor exposes effect speed.
pub fn effect_phase(params: &EffectParams, beat: &BeatState) -> f64 {
    let base = match params.get_str("interval", "beat") {
        "bar" => beat.bar_phase,
        _ => beat.beat_phase,
    };
    let ratio = params.get_f64("interval_ratio", 1.0);
    let offset = params.get_f64("phase", 0.0);
    (base * ratio + offset).rem_euclid(1.0)
}

type EffectFactory = fn() -> Arc<dyn Effect>;

/// Explicit id -> factory registry. Constructed once by the host and
/// passed down by reference; effects are stateless so instances are
/// shared freely.
#[derive(Default)]
pub struct EffectRegistry {
    factories: HashMap<&'static str, EffectFactory>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        EffectRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: &'static str, factory: EffectFactory) {
        self.factories.insert(id, factory);
    }

    pub fn create(&self, id: &str) -> Option<Arc<dyn Effect>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_merge_is_last_write_wins_per_field() {
        let mut base = Movement {
            pan: Some(0.2),
            tilt: Some(0.3),
            ..Movement::default()
        };
        let later = Movement {
            tilt: Some(0.9),
            gobo: Some(3),
            ..Movement::default()
        };
        base.apply(&later);
        assert_eq!(base.pan, Some(0.2));
        assert_eq!(base.tilt, Some(0.9));
        assert_eq!(base.gobo, Some(3));
        assert_eq!(base.zoom, None);
    }

    #[test]
    fn effect_phase_wraps_into_unit_interval() {
        let beat = BeatState {
            beat_phase: 0.75,
            ..BeatState::default()
        };
        let params = EffectParams::new()
            .set("interval_ratio", 2.0)
            .set("phase", 0.6);
        let phase = effect_phase(&params, &beat);
        assert!(phase >= 0.0 && phase < 1.0);
        assert!((phase - 0.1).abs() < 1e-9);
    }

    #[test]
    fn params_fall_back_to_defaults() {
        let params = EffectParams::new();
        assert_eq!(params.get_f64("missing", 0.5), 0.5);
        assert_eq!(params.get_str("interval", "beat"), "beat");
        assert_eq!(params.get_color("color", Color::WHITE), Color::WHITE);
    }
}
