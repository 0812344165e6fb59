use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Sequential ramp for heatmap / map shading
// ---------------------------------------------------------------------------

/// Light-to-dark ramp: `t = 0` is pale, `t = 1` is saturated. Out-of-range
/// and NaN inputs are clamped.
#[derive(Debug, Clone, Copy)]
pub struct Ramp {
    low: LinSrgb,
    high: LinSrgb,
}

impl Ramp {
    pub const fn new(low: (f32, f32, f32), high: (f32, f32, f32)) -> Self {
        Ramp {
            low: LinSrgb::new(low.0, low.1, low.2),
            high: LinSrgb::new(high.0, high.1, high.2),
        }
    }

    pub fn at(&self, t: f64) -> Color32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let t = t as f32;
        to_color32(Srgb::from_linear(self.low.mix(self.high, t)))
    }

    /// Shade `value` within `[lo, hi]`.
    pub fn shade(&self, value: f64, lo: f64, hi: f64) -> Color32 {
        let span = hi - lo;
        if span.abs() < f64::EPSILON {
            return self.at(1.0);
        }
        self.at((value - lo) / span)
    }
}

pub const REDS: Ramp = Ramp::new((0.98, 0.90, 0.85), (0.40, 0.0, 0.01));
pub const GREEN_BLUES: Ramp = Ramp::new((0.93, 0.97, 0.80), (0.0, 0.05, 0.25));

/// Fill for regions without data.
pub const NO_DATA: Color32 = Color32::LIGHT_GRAY;

// ---------------------------------------------------------------------------
// Color mapping: location → Color32
// ---------------------------------------------------------------------------

/// Maps locations to distinct colours, stable for a given location set.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    /// Build a colour map from the (sorted) location set.
    pub fn new<'a>(locations: impl IntoIterator<Item = &'a String>) -> Self {
        let locations: Vec<&String> = locations.into_iter().collect();
        let palette = generate_palette(locations.len());
        let mapping = locations
            .into_iter()
            .cloned()
            .zip(palette)
            .collect();
        ColorMap { mapping }
    }

    pub fn color_for(&self, location: &str) -> Color32 {
        self.mapping.get(location).copied().unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for (i, a) in p.iter().enumerate() {
            for b in &p[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_color_map_unknown_is_gray() {
        let locs = ["A".to_string(), "B".to_string()];
        let cm = ColorMap::new(&locs);
        assert_ne!(cm.color_for("A"), cm.color_for("B"));
        assert_eq!(cm.color_for("Z"), Color32::GRAY);
    }

    #[test]
    fn test_ramp_endpoints_and_clamping() {
        let pale = REDS.at(0.0);
        let dark = REDS.at(1.0);
        assert_ne!(pale, dark);
        assert_eq!(REDS.at(-3.0), pale);
        assert_eq!(REDS.at(7.0), dark);
        assert_eq!(REDS.at(f64::NAN), pale);
    }

    #[test]
    fn test_shade_degenerate_range() {
        assert_eq!(GREEN_BLUES.shade(5.0, 5.0, 5.0), GREEN_BLUES.at(1.0));
        assert_eq!(GREEN_BLUES.shade(0.0, 0.0, 10.0), GREEN_BLUES.at(0.0));
    }
}
