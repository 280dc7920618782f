use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use lube_dash::data::model::Value;

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
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: label value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a chart series (years, regions) to colours.
/// Colours follow sorted value order, so the same value set always gets the
/// same colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut mapping: BTreeMap<Value, Color32> =
            values.into_iter().map(|v| (v.clone(), Color32::GRAY)).collect();
        let palette = generate_palette(mapping.len());
        for (slot, color) in mapping.values_mut().zip(palette) {
            *slot = color;
        }
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        for (i, a) in p.iter().enumerate() {
            assert!(p[i + 1..].iter().all(|b| b != a));
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn colours_do_not_depend_on_input_order() {
        let years = [Value::Integer(2023), Value::Integer(2021), Value::Integer(2022)];
        let a = ColorMap::new(years.iter());
        let b = ColorMap::new(years.iter().rev());
        for y in &years {
            assert_eq!(a.color_for(y), b.color_for(y));
        }
        assert_eq!(a.color_for(&Value::Integer(1999)), Color32::GRAY);
    }
}
