// projection.rs

use std::f64::consts::FRAC_PI_4;

use crate::config::{
    FIT_PADDING, MIN_EXTENT_DEG, REGION_CENTER, Tuning, WORLD_SCALE, WORLD_TRANSLATE, tuning_for,
};
use crate::region::Region;

const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Axis-aligned extent, as (x, y) pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl Bounds {
    pub fn point(p: (f64, f64)) -> Self {
        Bounds { min: p, max: p }
    }

    pub fn including(self, p: (f64, f64)) -> Self {
        Bounds {
            min: (self.min.0.min(p.0), self.min.1.min(p.1)),
            max: (self.max.0.max(p.0), self.max.1.max(p.1)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.0 - self.min.0
    }

    pub fn height(&self) -> f64 {
        self.max.1 - self.min.1
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min.0 + self.max.0) / 2.0,
            (self.min.1 + self.max.1) / 2.0,
        )
    }
}

/// Spherical Mercator with a pixel scale, a geographic center and a pixel
/// translation of that center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    pub scale: f64,
    pub center: (f64, f64),
    pub translate: (f64, f64),
}

fn mercator_y(lat_deg: f64) -> f64 {
    let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (FRAC_PI_4 + lat / 2.0).tan().ln()
}

impl Mercator {
    /// Fixed framing for the world overview.
    pub fn world() -> Self {
        Mercator {
            scale: WORLD_SCALE,
            center: (0.0, 0.0),
            translate: WORLD_TRANSLATE,
        }
    }

    /// Fits `bounds` (raw lon/lat degrees) into `viewport`, then applies the
    /// region's hand-tuned adjustment.
    pub fn for_region(region: Region, bounds: Bounds, viewport: (f64, f64)) -> Self {
        Self::fitted(bounds, viewport, tuning_for(region))
    }

    pub fn fitted(bounds: Bounds, viewport: (f64, f64), tuning: Tuning) -> Self {
        let (width, height) = viewport;
        let dx = bounds.width().max(MIN_EXTENT_DEG);
        let dy = bounds.height().max(MIN_EXTENT_DEG);
        let (cx, cy) = bounds.center();

        let base_scale = (width / dx).min(height / dy) * FIT_PADDING;
        let base_translate = (
            width / 2.0 - base_scale * cx,
            height / 2.0 - base_scale * cy,
        );

        Mercator {
            scale: base_scale * tuning.scale,
            center: REGION_CENTER,
            translate: (
                base_translate.0 + tuning.translate_x,
                base_translate.1 + tuning.translate_y,
            ),
        }
    }

    /// Projects a lon/lat pair (degrees) to canvas pixels, y pointing down.
    pub fn project(&self, (lon, lat): (f64, f64)) -> (f64, f64) {
        let x = self.translate.0 + self.scale * (lon - self.center.0).to_radians();
        let y = self.translate.1 - self.scale * (mercator_y(lat) - mercator_y(self.center.1));
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn europe_bounds() -> Bounds {
        Bounds::point((-24.0, 35.0)).including((40.0, 71.0))
    }

    #[test]
    fn world_center_lands_on_translation() {
        let (x, y) = Mercator::world().project((0.0, 0.0));
        assert_relative_eq!(x, 860.0);
        assert_relative_eq!(y, 560.0);
    }

    #[test]
    fn world_scale_is_pixels_per_radian() {
        let (x, _) = Mercator::world().project((180.0, 0.0));
        assert_relative_eq!(x, 860.0 + 230.0 * std::f64::consts::PI, epsilon = 1e-9);
    }

    #[test]
    fn neutral_fit_uses_padded_base_scale() {
        let projection = Mercator::fitted(europe_bounds(), (800.0, 600.0), Tuning::NEUTRAL);
        // min(800 / 64, 600 / 36) * 0.8
        assert_relative_eq!(projection.scale, 10.0);
        assert_relative_eq!(projection.translate.0, 400.0 - 10.0 * 8.0);
        assert_relative_eq!(projection.translate.1, 300.0 - 10.0 * 53.0);
        assert_eq!(projection.center, REGION_CENTER);
    }

    #[test]
    fn region_tuning_multiplies_scale_and_offsets_translation() {
        let neutral = Mercator::fitted(europe_bounds(), (800.0, 600.0), Tuning::NEUTRAL);
        let europe = Mercator::for_region(Region::Europe, europe_bounds(), (800.0, 600.0));
        assert_relative_eq!(europe.scale, neutral.scale * 200.0);
        assert_relative_eq!(europe.translate.0, neutral.translate.0 + 350.0);
        assert_relative_eq!(europe.translate.1, neutral.translate.1 + 125.0);
    }

    #[test]
    fn degenerate_bounds_do_not_divide_by_zero() {
        let projection = Mercator::fitted(Bounds::point((5.0, 5.0)), (800.0, 600.0), Tuning::NEUTRAL);
        assert!(projection.scale.is_finite());
        assert!(projection.translate.0.is_finite());
    }

    #[test]
    fn north_is_up_and_poles_are_clamped() {
        let projection = Mercator::world();
        let (_, north) = projection.project((0.0, 60.0));
        let (_, south) = projection.project((0.0, -60.0));
        assert!(north < south);
        assert!(projection.project((0.0, 90.0)).1.is_finite());
    }
}
