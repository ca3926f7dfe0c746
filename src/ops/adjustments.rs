// ============================================================================
// ADJUSTMENTS: color tint and contrast, the two built-in filter kinds
// ============================================================================

use std::str::FromStr;

use image::Rgb;

use crate::canvas::{PixelBuffer, clamp_channel};
use crate::error::EditError;

use super::filters::PixelFilter;

/// Mid-gray threshold for the contrast filter. Channels equal to it count as dark.
pub const CONTRAST_PIVOT: u8 = 128;

/// Multiplies each channel by `factor / 255`, truncating toward zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorFilter {
    red: i32,
    green: i32,
    blue: i32,
}

impl ColorFilter {
    pub fn new(red: i32, green: i32, blue: i32) -> Self {
        Self { red, green, blue }
    }

    pub fn factors(&self) -> (i32, i32, i32) {
        (self.red, self.green, self.blue)
    }
}

impl PixelFilter for ColorFilter {
    #[inline]
    fn compute_pixel(&self, source: &PixelBuffer, x: u32, y: u32) -> Rgb<u8> {
        let Rgb([r, g, b]) = source.pixel(x, y);
        Rgb([
            clamp_channel((r as i32).saturating_mul(self.red) / 255),
            clamp_channel((g as i32).saturating_mul(self.green) / 255),
            clamp_channel((b as i32).saturating_mul(self.blue) / 255),
        ])
    }
}

/// Pushes channels above 128 up and the rest down by `intensity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContrastFilter {
    intensity: i32,
}

impl ContrastFilter {
    pub fn new(intensity: i32) -> Self {
        Self { intensity }
    }

    pub fn intensity(&self) -> i32 {
        self.intensity
    }

    #[inline]
    fn channel(&self, c: u8) -> u8 {
        let c = c as i32;
        if c > CONTRAST_PIVOT as i32 {
            clamp_channel(c.saturating_add(self.intensity))
        } else {
            clamp_channel(c.saturating_sub(self.intensity))
        }
    }
}

impl PixelFilter for ContrastFilter {
    #[inline]
    fn compute_pixel(&self, source: &PixelBuffer, x: u32, y: u32) -> Rgb<u8> {
        let Rgb([r, g, b]) = source.pixel(x, y);
        Rgb([self.channel(r), self.channel(g), self.channel(b)])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Color,
    Contrast,
}

/// Closed set of filters the session records in its history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Color(ColorFilter),
    Contrast(ContrastFilter),
}

impl Filter {
    pub fn color(red: i32, green: i32, blue: i32) -> Self {
        Filter::Color(ColorFilter::new(red, green, blue))
    }

    pub fn contrast(intensity: i32) -> Self {
        Filter::Contrast(ContrastFilter::new(intensity))
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Color(_) => FilterKind::Color,
            Filter::Contrast(_) => FilterKind::Contrast,
        }
    }

    /// History label, e.g. "Color Filter (128, 255, 0)".
    pub fn description(&self) -> String {
        match self {
            Filter::Color(f) => {
                let (r, g, b) = f.factors();
                format!("Color Filter ({}, {}, {})", r, g, b)
            }
            Filter::Contrast(f) => format!("Contrast Filter ({})", f.intensity()),
        }
    }

    /// Describe parameters outside their nominal range.
    ///
    /// Such filters are still applied exactly as constructed; this only lets
    /// callers surface the gap.
    pub fn parameter_gap(&self) -> Option<EditError> {
        match self {
            Filter::Color(f) => {
                let (r, g, b) = f.factors();
                let out_of_range = [r, g, b].iter().any(|v| !(0..=255).contains(v));
                out_of_range.then(|| {
                    EditError::ValidationGap(format!(
                        "color factors ({}, {}, {}) outside [0, 255]",
                        r, g, b
                    ))
                })
            }
            Filter::Contrast(f) => (f.intensity() < 0).then(|| {
                EditError::ValidationGap(format!("negative contrast intensity {}", f.intensity()))
            }),
        }
    }
}

impl PixelFilter for Filter {
    #[inline]
    fn compute_pixel(&self, source: &PixelBuffer, x: u32, y: u32) -> Rgb<u8> {
        match self {
            Filter::Color(f) => f.compute_pixel(source, x, y),
            Filter::Contrast(f) => f.compute_pixel(source, x, y),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Parses `color:R,G,B` and `contrast:N`.
impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = s.split_once(':').unwrap_or((s, ""));
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| format!("invalid number '{}' in '{}': {}", v.trim(), s, e))
        };
        match name.trim().to_lowercase().as_str() {
            "color" | "colour" | "tint" => {
                let parts: Vec<&str> = args.split(',').collect();
                if parts.len() != 3 {
                    return Err(format!("expected color:R,G,B, got '{}'", s));
                }
                Ok(Filter::color(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
            }
            "contrast" => {
                if args.trim().is_empty() {
                    return Err(format!("expected contrast:N, got '{}'", s));
                }
                Ok(Filter::contrast(parse(args)?))
            }
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(r: u8, g: u8, b: u8) -> PixelBuffer {
        PixelBuffer::from_rows(&[vec![[r, g, b]]]).unwrap()
    }

    #[test]
    fn color_filter_truncates_integer_division() {
        let out = Filter::color(128, 255, 0).apply(&single(200, 100, 50)).unwrap();
        // 200 * 128 / 255 = 100.39 -> 100
        assert_eq!(out.pixel(0, 0), Rgb([100, 100, 0]));

        let out = Filter::color(1, 254, 127).apply(&single(254, 254, 255)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([0, 253, 127]));
    }

    #[test]
    fn color_filter_matches_formula_over_channel_range() {
        for factor in [0, 1, 64, 128, 200, 254, 255] {
            let f = ColorFilter::new(factor, factor, factor);
            for c in [0u8, 1, 17, 127, 128, 129, 200, 255] {
                let out = f.apply(&single(c, c, c)).unwrap().pixel(0, 0);
                let expected = (c as i32 * factor / 255) as u8;
                assert_eq!(out, Rgb([expected; 3]), "c={} factor={}", c, factor);
            }
        }
    }

    #[test]
    fn full_white_color_filter_is_identity() {
        let src = PixelBuffer::from_rows(&[
            vec![[200, 100, 50], [10, 10, 10]],
            vec![[0, 0, 0], [255, 255, 255]],
        ])
        .unwrap();
        assert_eq!(Filter::color(255, 255, 255).apply(&src).unwrap(), src);
    }

    #[test]
    fn contrast_threshold_is_strictly_above_pivot() {
        let out = Filter::contrast(20).apply(&single(128, 129, 127)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([108, 149, 107]));
    }

    #[test]
    fn contrast_clamps_at_both_ends() {
        let out = Filter::contrast(20).apply(&single(250, 5, 0)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([255, 0, 0]));
    }

    #[test]
    fn contrast_matches_formula_over_channel_range() {
        for k in [0, 1, 20, 127, 300] {
            let f = ContrastFilter::new(k);
            for c in 0..=255u8 {
                let expected = if c > 128 {
                    (c as i32 + k).clamp(0, 255)
                } else {
                    (c as i32 - k).clamp(0, 255)
                } as u8;
                assert_eq!(f.channel(c), expected, "c={} k={}", c, k);
            }
        }
    }

    #[test]
    fn negative_intensity_is_applied_as_is() {
        let f = Filter::contrast(-10);
        assert!(matches!(f.parameter_gap(), Some(EditError::ValidationGap(_))));
        // Pulls toward gray instead of away from it.
        let out = f.apply(&single(200, 50, 128)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([190, 60, 138]));
    }

    #[test]
    fn out_of_range_color_factors_still_clamp_output() {
        let f = Filter::color(510, -255, 255);
        assert!(f.parameter_gap().is_some());
        let out = f.apply(&single(200, 200, 200)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([255, 0, 200]));
    }

    #[test]
    fn in_range_parameters_have_no_gap() {
        assert!(Filter::color(0, 128, 255).parameter_gap().is_none());
        assert!(Filter::contrast(0).parameter_gap().is_none());
    }

    #[test]
    fn parses_filter_strings() {
        assert_eq!("color:128,255,0".parse::<Filter>(), Ok(Filter::color(128, 255, 0)));
        assert_eq!("Contrast: 20".parse::<Filter>(), Ok(Filter::contrast(20)));
        assert_eq!("contrast:-5".parse::<Filter>(), Ok(Filter::contrast(-5)));
        assert!("color:1,2".parse::<Filter>().is_err());
        assert!("blur:3".parse::<Filter>().is_err());
        assert!("contrast".parse::<Filter>().is_err());
    }

    #[test]
    fn descriptions_name_kind_and_parameters() {
        assert_eq!(Filter::color(128, 255, 0).description(), "Color Filter (128, 255, 0)");
        assert_eq!(Filter::contrast(20).to_string(), "Contrast Filter (20)");
        assert_eq!(Filter::contrast(20).kind(), FilterKind::Contrast);
    }
}
