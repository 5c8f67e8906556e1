// color.rs

use plotters::prelude::RGBColor;

use crate::config::{
    COLORBLIND_LEGEND, COLORBLIND_RAMP, NO_DATA_COLOR, STANDARD_LEGEND, STANDARD_RAMP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Standard,
    Colorblind,
}

impl Palette {
    pub fn from_colorblind(colorblind: bool) -> Self {
        if colorblind {
            Palette::Colorblind
        } else {
            Palette::Standard
        }
    }

    pub fn ramp(self) -> ColorRamp {
        match self {
            Palette::Standard => ColorRamp(&STANDARD_RAMP),
            Palette::Colorblind => ColorRamp(&COLORBLIND_RAMP),
        }
    }

    pub fn legend(self) -> ColorRamp {
        match self {
            Palette::Standard => ColorRamp(&STANDARD_LEGEND),
            Palette::Colorblind => ColorRamp(&COLORBLIND_LEGEND),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Palette::Standard => "Original",
            Palette::Colorblind => "Colorblind",
        }
    }
}

/// Evenly spaced color stops, interpolated linearly in RGB.
#[derive(Debug, Clone, Copy)]
pub struct ColorRamp(&'static [RGBColor]);

impl ColorRamp {
    /// `t` is clamped to [0, 1].
    pub fn sample(&self, t: f64) -> RGBColor {
        let stops = self.0;
        match stops.len() {
            0 => NO_DATA_COLOR,
            1 => stops[0],
            n => {
                let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
                let position = t * (n - 1) as f64;
                let index = (position.floor() as usize).min(n - 2);
                let fraction = position - index as f64;
                lerp(stops[index], stops[index + 1], fraction)
            }
        }
    }
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(channel(a.0, b.0), channel(a.1, b.1), channel(a.2, b.2))
}

/// Maps [0, max] onto a palette's ramp.
#[derive(Debug, Clone, Copy)]
pub struct SequentialScale {
    max: f64,
    ramp: ColorRamp,
}

impl SequentialScale {
    pub fn new(max: u64, palette: Palette) -> Self {
        SequentialScale {
            max: max.max(1) as f64,
            ramp: palette.ramp(),
        }
    }

    pub fn color(&self, value: f64) -> RGBColor {
        self.ramp.sample(value / self.max)
    }

    /// Absent and zero counts get the no-data color, never a ramp color.
    pub fn fill(&self, count: Option<u64>) -> RGBColor {
        match count {
            None | Some(0) => NO_DATA_COLOR,
            Some(count) => self.color(count as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_match_stops() {
        let ramp = Palette::Standard.ramp();
        assert_eq!(ramp.sample(0.0), STANDARD_RAMP[0]);
        assert_eq!(ramp.sample(1.0), STANDARD_RAMP[8]);
        assert_eq!(ramp.sample(7.0), STANDARD_RAMP[8]);
        assert_eq!(ramp.sample(-1.0), STANDARD_RAMP[0]);
    }

    #[test]
    fn ramp_interpolates_between_stops() {
        let ramp = ColorRamp(&COLORBLIND_LEGEND);
        let quarter = ramp.sample(0.25);
        // halfway between #440154 and #21908d
        assert_eq!(quarter, RGBColor(0x33, 0x49, 0x71));
    }

    #[test]
    fn zero_and_missing_counts_are_no_data() {
        let scale = SequentialScale::new(100, Palette::Standard);
        assert_eq!(scale.fill(None), NO_DATA_COLOR);
        assert_eq!(scale.fill(Some(0)), NO_DATA_COLOR);
        assert_ne!(scale.fill(Some(1)), NO_DATA_COLOR);
    }

    #[test]
    fn top_of_domain_is_last_stop() {
        let scale = SequentialScale::new(40, Palette::Colorblind);
        assert_eq!(scale.fill(Some(40)), COLORBLIND_RAMP[9]);
    }

    #[test]
    fn palettes_differ_for_same_count() {
        let standard = SequentialScale::new(10, Palette::Standard);
        let colorblind = SequentialScale::new(10, Palette::Colorblind);
        assert_ne!(standard.fill(Some(5)), colorblind.fill(Some(5)));
    }
}
