// choropleth.rs
//
// Turns boundary features and route counts into projected, filled shapes that
// can be drawn to any surface and hit-tested for hover and click.

use plotters::prelude::RGBColor;

use crate::color::{Palette, SequentialScale};
use crate::config::canvas_for;
use crate::data::{BoundaryDocument, RegionData, WorldData};
use crate::grades::{GradeFilter, RouteCounts, aggregate, max_count, normalize};
use crate::projection::Mercator;
use crate::region::Region;

pub const UNKNOWN_COUNTRY: &str = "Unknown Country";
const TOOLTIP_OFFSET: f64 = 10.0;

/// One feature of a boundary document after projection.
#[derive(Debug, Clone)]
pub struct CountryShape {
    pub name: String,
    pub key: String,
    /// Continent the feature came from; differs from the layer's region on the
    /// world overview.
    pub continent: Region,
    pub count: Option<u64>,
    pub fill: RGBColor,
    /// Projected polygons, each as exterior ring then holes.
    pub polygons: Vec<Vec<Vec<(f64, f64)>>>,
}

impl CountryShape {
    fn contains(&self, point: (f64, f64)) -> bool {
        self.polygons.iter().any(|rings| {
            rings
                .iter()
                .filter(|ring| ring_contains(ring, point))
                .count()
                % 2
                == 1
        })
    }
}

// Even-odd ray casting.
fn ring_contains(ring: &[(f64, f64)], (px, py): (f64, f64)) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub position: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapClick {
    /// A country on a continent map: open its route list.
    Country { region: Region, name: String },
    /// A country on the world overview: jump to its continent.
    Continent(Region),
}

#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
    region: Region,
    grade: GradeFilter,
    viewport: (u32, u32),
    projection: Mercator,
    counts: RouteCounts,
    max_count: u64,
    palette: Palette,
    shapes: Vec<CountryShape>,
}

impl ChoroplethLayer {
    pub fn new(region: Region) -> Self {
        ChoroplethLayer {
            region,
            grade: GradeFilter::All,
            viewport: canvas_for(region),
            projection: Mercator::world(),
            counts: RouteCounts::new(),
            max_count: 1,
            palette: Palette::Standard,
            shapes: Vec::new(),
        }
    }

    /// Filter, aggregate, project and fill a continent map.
    pub fn for_region(data: &RegionData, grade: &GradeFilter, palette: Palette) -> Self {
        let mut layer = ChoroplethLayer::new(data.region);
        let viewport = (layer.viewport.0 as f64, layer.viewport.1 as f64);
        let projection = data
            .boundaries
            .bounds()
            .map(|bounds| Mercator::for_region(data.region, bounds, viewport))
            .unwrap_or_else(Mercator::world);
        layer.render(
            &[(data.region, &data.boundaries)],
            aggregate(&data.grades, grade),
            grade.clone(),
            projection,
            palette,
        );
        layer
    }

    pub fn for_world(data: &WorldData, grade: &GradeFilter, palette: Palette) -> Self {
        let mut layer = ChoroplethLayer::new(Region::World);
        let sources: Vec<(Region, &BoundaryDocument)> = data
            .continents
            .iter()
            .map(|(region, document)| (*region, document))
            .collect();
        layer.render(
            &sources,
            aggregate(&data.grades, grade),
            grade.clone(),
            Mercator::world(),
            palette,
        );
        layer
    }

    /// Full redraw: every previously built shape is dropped first.
    pub fn render(
        &mut self,
        sources: &[(Region, &BoundaryDocument)],
        counts: RouteCounts,
        grade: GradeFilter,
        projection: Mercator,
        palette: Palette,
    ) {
        self.shapes.clear();
        self.max_count = max_count(&counts);
        self.counts = counts;
        self.grade = grade;
        self.projection = projection;
        self.palette = palette;

        let scale = SequentialScale::new(self.max_count, palette);
        for (continent, document) in sources {
            for feature in &document.features {
                let name = feature
                    .name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
                let key = feature.name.as_deref().map(normalize).unwrap_or_default();
                let count = self.counts.get(&key).copied();
                let polygons = feature
                    .polygons
                    .iter()
                    .map(|rings| {
                        rings
                            .iter()
                            .map(|ring| ring.iter().map(|&p| projection.project(p)).collect())
                            .collect()
                    })
                    .collect();
                self.shapes.push(CountryShape {
                    name,
                    key,
                    continent: *continent,
                    count,
                    fill: scale.fill(count),
                    polygons,
                });
            }
        }
    }

    /// Swaps the color ramp without touching the aggregated counts.
    pub fn recolor(&mut self, palette: Palette) {
        self.palette = palette;
        let scale = SequentialScale::new(self.max_count, palette);
        for shape in &mut self.shapes {
            shape.fill = scale.fill(shape.count);
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn grade(&self) -> &GradeFilter {
        &self.grade
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn projection(&self) -> Mercator {
        self.projection
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn counts(&self) -> &RouteCounts {
        &self.counts
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    pub fn shapes(&self) -> &[CountryShape] {
        &self.shapes
    }

    /// Later shapes are drawn over earlier ones, so they win.
    pub fn hit_test(&self, point: (f64, f64)) -> Option<&CountryShape> {
        self.shapes.iter().rev().find(|shape| shape.contains(point))
    }

    pub fn hover(&self, pointer: (f64, f64)) -> Option<Tooltip> {
        self.hit_test(pointer).map(|shape| Tooltip {
            text: shape.name.clone(),
            position: (pointer.0 + TOOLTIP_OFFSET, pointer.1 + TOOLTIP_OFFSET),
        })
    }

    pub fn click(&self, pointer: (f64, f64)) -> Option<MapClick> {
        self.hit_test(pointer).map(|shape| self.click_shape(shape))
    }

    pub fn click_shape(&self, shape: &CountryShape) -> MapClick {
        if self.region.is_world() {
            MapClick::Continent(shape.continent)
        } else {
            MapClick::Country {
                region: self.region,
                name: shape.name.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NO_DATA_COLOR, STANDARD_RAMP};
    use crate::data::fixtures::{EUROPE_GEOJSON, EUROPE_GRADES};
    use crate::data::{CountryFeature, RouteGradeRecord};

    fn europe() -> RegionData {
        let geojson: geojson::GeoJson = EUROPE_GEOJSON.parse().unwrap();
        let grades = csv::Reader::from_reader(EUROPE_GRADES.as_bytes())
            .deserialize()
            .collect::<Result<Vec<RouteGradeRecord>, _>>()
            .unwrap();
        RegionData {
            region: Region::Europe,
            boundaries: BoundaryDocument::from_geojson(geojson),
            grades,
            route_info: Vec::new(),
        }
    }

    fn shape<'a>(layer: &'a ChoroplethLayer, key: &str) -> &'a CountryShape {
        layer.shapes().iter().find(|s| s.key == key).unwrap()
    }

    fn square(name: &str, min: f64, max: f64) -> CountryFeature {
        CountryFeature {
            name: Some(name.to_string()),
            polygons: vec![vec![vec![(min, min), (max, min), (max, max), (min, max)]]],
        }
    }

    #[test]
    fn boundary_names_match_counts_regardless_of_case() {
        let layer = ChoroplethLayer::for_region(&europe(), &GradeFilter::All, Palette::Standard);
        // " FRANCE " in the boundary file, "France" in the table
        assert_eq!(shape(&layer, "france").count, Some(4));
        assert_eq!(shape(&layer, "spain").count, Some(18));
    }

    #[test]
    fn zero_and_missing_countries_get_no_data_fill() {
        let layer = ChoroplethLayer::for_region(&europe(), &GradeFilter::All, Palette::Standard);
        assert_eq!(shape(&layer, "iceland").count, Some(0));
        assert_eq!(shape(&layer, "iceland").fill, NO_DATA_COLOR);
        assert_eq!(shape(&layer, "").name, UNKNOWN_COUNTRY);
        assert_eq!(shape(&layer, "").fill, NO_DATA_COLOR);
    }

    #[test]
    fn largest_country_takes_top_of_ramp() {
        let layer = ChoroplethLayer::for_region(&europe(), &GradeFilter::All, Palette::Standard);
        assert_eq!(layer.max_count(), 18);
        assert_eq!(shape(&layer, "spain").fill, STANDARD_RAMP[8]);
    }

    #[test]
    fn grade_filter_changes_counts() {
        let layer =
            ChoroplethLayer::for_region(&europe(), &GradeFilter::parse("7a"), Palette::Standard);
        assert_eq!(shape(&layer, "spain").count, Some(3));
        assert_eq!(shape(&layer, "france").count, None);
        assert_eq!(shape(&layer, "france").fill, NO_DATA_COLOR);
    }

    #[test]
    fn recolor_keeps_aggregation() {
        let mut layer =
            ChoroplethLayer::for_region(&europe(), &GradeFilter::All, Palette::Standard);
        let before_counts = layer.counts().clone();
        let before_fill = shape(&layer, "france").fill;

        layer.recolor(Palette::Colorblind);
        assert_eq!(layer.counts(), &before_counts);
        assert_eq!(layer.palette(), Palette::Colorblind);
        assert_ne!(shape(&layer, "france").fill, before_fill);
        assert_eq!(shape(&layer, "iceland").fill, NO_DATA_COLOR);
    }

    #[test]
    fn render_replaces_previous_shapes() {
        let data = europe();
        let mut layer = ChoroplethLayer::for_region(&data, &GradeFilter::All, Palette::Standard);
        assert_eq!(layer.shapes().len(), 4);

        let document = BoundaryDocument {
            features: vec![square("Spain", 0.0, 1.0)],
        };
        layer.render(
            &[(Region::Europe, &document)],
            RouteCounts::new(),
            GradeFilter::All,
            Mercator::world(),
            Palette::Standard,
        );
        assert_eq!(layer.shapes().len(), 1);
    }

    #[test]
    fn hover_and_click_hit_the_topmost_shape() {
        let document = BoundaryDocument {
            features: vec![square("Big", 0.0, 100.0), square("Small", 40.0, 60.0)],
        };
        let identity = Mercator {
            scale: 180.0 / std::f64::consts::PI,
            center: (0.0, 0.0),
            translate: (0.0, 0.0),
        };
        let mut layer = ChoroplethLayer::new(Region::Asia);
        layer.render(
            &[(Region::Asia, &document)],
            RouteCounts::new(),
            GradeFilter::All,
            identity,
            Palette::Standard,
        );

        // the y axis is flipped by the projection, so probe in projected space
        let (x, y) = identity.project((50.0, 50.0));
        let tooltip = layer.hover((x, y)).unwrap();
        assert_eq!(tooltip.text, "Small");
        assert_eq!(tooltip.position, (x + 10.0, y + 10.0));

        let (x, y) = identity.project((10.0, 10.0));
        assert_eq!(
            layer.click((x, y)),
            Some(MapClick::Country {
                region: Region::Asia,
                name: "Big".to_string()
            })
        );
        assert_eq!(layer.click((-500.0, -500.0)), None);
    }

    #[test]
    fn holes_are_not_part_of_the_country() {
        let shape = CountryShape {
            name: "Ring".into(),
            key: "ring".into(),
            continent: Region::Africa,
            count: None,
            fill: NO_DATA_COLOR,
            polygons: vec![vec![
                vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
                vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)],
            ]],
        };
        assert!(shape.contains((2.0, 2.0)));
        assert!(!shape.contains((5.0, 5.0)));
    }

    #[test]
    fn world_click_jumps_to_continent() {
        let document = BoundaryDocument {
            features: vec![square("Peru", -10.0, 10.0)],
        };
        let world = WorldData {
            continents: vec![(Region::SouthAmerica, document)],
            grades: Vec::new(),
        };
        let layer = ChoroplethLayer::for_world(&world, &GradeFilter::All, Palette::Standard);
        let point = Mercator::world().project((0.0, 0.0));
        assert_eq!(layer.click(point), Some(MapClick::Continent(Region::SouthAmerica)));
    }
}
