use serde::{Deserialize, Serialize};

/// Linear RGB light value, each channel nominally in [0, 1].
///
/// Intermediate composite values may leave the range (additive blends
/// overshoot on purpose); the compositor clamps once at the end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b }
    }

    /// Hue in [0, 1), saturation and value in [0, 1].
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = (h.rem_euclid(1.0)) * 6.0;
        let i = h.floor() as u32 % 6;
        let f = h - h.floor();
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match i {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Color { r, g, b }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Color {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    pub fn clamped(self) -> Self {
        Color {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }

    /// Brightest channel. Drives pure-dimmer fixtures in the bridge.
    pub fn luma_max(self) -> f64 {
        self.r.max(self.g).max(self.b)
    }
}

/// Rule for combining a layer's color with the accumulated composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Overlay,
    Screen,
}

fn blend_channel(base: f64, layer: f64, mode: BlendMode) -> f64 {
    match mode {
        BlendMode::Normal => layer,
        BlendMode::Additive => base + layer,
        BlendMode::Multiply => base * layer,
        BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - layer),
        BlendMode::Overlay => {
            if base < 0.5 {
                2.0 * base * layer
            } else {
                1.0 - 2.0 * (1.0 - base) * (1.0 - layer)
            }
        }
    }
}

/// Combine `layer` over `base`, per channel.
pub fn blend(base: Color, layer: Color, mode: BlendMode) -> Color {
    Color {
        r: blend_channel(base.r, layer.r, mode),
        g: blend_channel(base.g, layer.g, mode),
        b: blend_channel(base.b, layer.b, mode),
    }
}

pub fn lerp(a: Color, b: Color, t: f64) -> Color {
    Color {
        r: a.r + (b.r - a.r) * t,
        g: a.g + (b.g - a.g) * t,
        b: a.b + (b.b - a.b) * t,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn normal_blend_replaces_base() {
        let base = Color::new(0.2, 0.4, 0.6);
        let layer = Color::new(0.9, 0.1, 0.5);
        assert_eq!(blend(base, layer, BlendMode::Normal), layer);
    }

    #[test]
    fn additive_blend_sums_channels() {
        let out = blend(
            Color::new(0.5, 0.5, 0.5),
            Color::new(0.25, 0.5, 0.75),
            BlendMode::Additive,
        );
        assert_relative_eq!(out.r, 0.75);
        assert_relative_eq!(out.g, 1.0);
        assert_relative_eq!(out.b, 1.25);
    }

    #[test]
    fn screen_blend_matches_formula() {
        let out = blend(
            Color::new(0.5, 0.0, 1.0),
            Color::new(0.5, 0.5, 0.5),
            BlendMode::Screen,
        );
        assert_relative_eq!(out.r, 0.75);
        assert_relative_eq!(out.g, 0.5);
        assert_relative_eq!(out.b, 1.0);
    }

    #[test]
    fn overlay_branches_on_base_midpoint() {
        let dark = blend(
            Color::new(0.25, 0.25, 0.25),
            Color::new(0.8, 0.8, 0.8),
            BlendMode::Overlay,
        );
        assert_relative_eq!(dark.r, 2.0 * 0.25 * 0.8);
        let bright = blend(
            Color::new(0.75, 0.75, 0.75),
            Color::new(0.8, 0.8, 0.8),
            BlendMode::Overlay,
        );
        assert_relative_eq!(bright.r, 1.0 - 2.0 * 0.25 * 0.2);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::new(0.1, 0.2, 0.3);
        let b = Color::new(0.9, 0.8, 0.7);
        assert_eq!(lerp(a, b, 0.0), a);
        assert_eq!(lerp(a, b, 1.0), b);
        assert_relative_eq!(lerp(a, b, 0.5).r, 0.5);
    }

    #[test]
    fn hsv_primaries() {
        let red = Color::from_hsv(0.0, 1.0, 1.0);
        assert_relative_eq!(red.r, 1.0);
        assert_relative_eq!(red.g, 0.0);
        let green = Color::from_hsv(1.0 / 3.0, 1.0, 1.0);
        assert_relative_eq!(green.g, 1.0);
        assert_relative_eq!(green.r, 0.0, epsilon = 1e-9);
    }
}
