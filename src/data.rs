// data.rs
//
// Record types for the static atlas tables and the readers that load them.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::thread;

use geojson::{Feature, GeoJson, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::config::DataPaths;
use crate::error::{FetchKind, LoadError};
use crate::grades::normalize;
use crate::projection::Bounds;
use crate::region::Region;

/// One grade bucket of one country: how many routes of that grade it has.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteGradeRecord {
    #[serde(rename = "Country", default)]
    pub country: String,
    #[serde(rename = "grade_fra", default, deserialize_with = "normalized")]
    pub grade: String,
    #[serde(default, deserialize_with = "route_count")]
    pub route_count: u64,
}

/// One physical climbing route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteInfoRecord {
    #[serde(rename = "Country", default)]
    pub country: String,
    #[serde(rename = "grade_fra", default, deserialize_with = "normalized")]
    pub grade: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub crag: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClimberRecord {
    #[serde(default)]
    pub country: String,
    #[serde(default, deserialize_with = "sex")]
    pub sex: Option<Sex>,
    #[serde(default = "nan", deserialize_with = "lenient_number")]
    pub height: f64,
    #[serde(default = "nan", deserialize_with = "lenient_number")]
    pub weight: f64,
    #[serde(default = "nan", deserialize_with = "lenient_number")]
    pub age: f64,
    #[serde(rename = "grade_mean_fra", default)]
    pub grade_mean: String,
}

fn nan() -> f64 {
    f64::NAN
}

fn normalized<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize(&raw))
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().parse::<f64>().unwrap_or(f64::NAN))
}

// Anything that is not a positive finite number counts as zero routes.
fn route_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = lenient_number(deserializer)?;
    if value.is_finite() && value > 0.0 {
        Ok(value.round() as u64)
    } else {
        Ok(0)
    }
}

fn sex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Sex>, D::Error> {
    let value = lenient_number(deserializer)?;
    Ok(if value == 0.0 {
        Some(Sex::Male)
    } else if value == 1.0 {
        Some(Sex::Female)
    } else {
        None
    })
}

/// Exterior ring first, then holes.
pub type PolygonRings = Vec<Vec<(f64, f64)>>;

/// A named country outline from a boundary document.
#[derive(Debug, Clone, Default)]
pub struct CountryFeature {
    pub name: Option<String>,
    pub polygons: Vec<PolygonRings>,
}

#[derive(Debug, Clone, Default)]
pub struct BoundaryDocument {
    pub features: Vec<CountryFeature>,
}

impl BoundaryDocument {
    pub fn from_geojson(geojson: GeoJson) -> Self {
        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .map(country_feature)
                .collect(),
            GeoJson::Feature(feature) => vec![country_feature(feature)],
            GeoJson::Geometry(geometry) => vec![CountryFeature {
                name: None,
                polygons: polygons_of(geometry.value),
            }],
        };
        BoundaryDocument { features }
    }

    /// Extent of every polygon vertex in raw lon/lat degrees.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for feature in &self.features {
            for polygon in &feature.polygons {
                for ring in polygon {
                    for &point in ring {
                        bounds = Some(match bounds {
                            Some(b) => b.including(point),
                            None => Bounds::point(point),
                        });
                    }
                }
            }
        }
        bounds
    }
}

fn country_feature(feature: Feature) -> CountryFeature {
    let name = feature
        .property("name")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let polygons = feature
        .geometry
        .map(|geometry| polygons_of(geometry.value))
        .unwrap_or_default();
    CountryFeature { name, polygons }
}

fn ring_of(ring: Vec<Vec<f64>>) -> Vec<(f64, f64)> {
    ring.into_iter()
        .filter(|position| position.len() >= 2)
        .map(|position| (position[0], position[1]))
        .collect()
}

// Countries are areal; points and lines carry nothing to fill.
fn polygons_of(value: Value) -> Vec<PolygonRings> {
    match value {
        Value::Polygon(rings) => vec![rings.into_iter().map(ring_of).collect()],
        Value::MultiPolygon(polygons) => polygons
            .into_iter()
            .map(|rings| rings.into_iter().map(ring_of).collect())
            .collect(),
        Value::GeometryCollection(geometries) => geometries
            .into_iter()
            .flat_map(|geometry| polygons_of(geometry.value))
            .collect(),
        _ => Vec::new(),
    }
}

/// Everything a continent map needs, fetched together.
#[derive(Debug, Clone)]
pub struct RegionData {
    pub region: Region,
    pub boundaries: BoundaryDocument,
    pub grades: Vec<RouteGradeRecord>,
    pub route_info: Vec<RouteInfoRecord>,
}

/// The world overview is stitched together from the continent documents.
#[derive(Debug, Clone)]
pub struct WorldData {
    pub continents: Vec<(Region, BoundaryDocument)>,
    pub grades: Vec<RouteGradeRecord>,
}

pub fn read_boundaries(path: &Path) -> Result<BoundaryDocument, LoadError> {
    let kind = FetchKind::Boundaries;
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    let geojson =
        GeoJson::from_reader(BufReader::new(file)).map_err(|source| LoadError::GeoJson {
            kind,
            path: path.to_path_buf(),
            source: Box::new(geojson::Error::MalformedJson(source)),
        })?;
    let document = BoundaryDocument::from_geojson(geojson);
    debug!(
        path = %path.display(),
        features = document.features.len(),
        "boundary document loaded"
    );
    Ok(document)
}

pub fn read_table<T: DeserializeOwned>(path: &Path, kind: FetchKind) -> Result<Vec<T>, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| LoadError::Csv {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), rows = rows.len(), %kind, "table loaded");
    Ok(rows)
}

fn joined<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Reads the three files of a continent concurrently. Succeeds only if all do.
pub fn load_region(paths: &DataPaths, region: Region) -> Result<RegionData, LoadError> {
    thread::scope(|scope| {
        let boundaries = scope.spawn(|| read_boundaries(&paths.boundaries(region)));
        let grades =
            scope.spawn(|| read_table::<RouteGradeRecord>(&paths.grades(region), FetchKind::Grades));
        let route_info = scope.spawn(|| {
            read_table::<RouteInfoRecord>(&paths.route_info(region), FetchKind::RouteInfo)
        });

        let boundaries = joined(boundaries);
        let grades = joined(grades);
        let route_info = joined(route_info);
        Ok(RegionData {
            region,
            boundaries: boundaries?,
            grades: grades?,
            route_info: route_info?,
        })
    })
}

pub fn load_world(paths: &DataPaths) -> Result<WorldData, LoadError> {
    thread::scope(|scope| {
        let documents: Vec<_> = Region::CONTINENTS
            .iter()
            .map(|&region| {
                let handle = scope.spawn(move || read_boundaries(&paths.boundaries(region)));
                (region, handle)
            })
            .collect();
        let grades = scope.spawn(|| {
            read_table::<RouteGradeRecord>(&paths.grades(Region::World), FetchKind::Grades)
        });

        let mut continents = Vec::with_capacity(documents.len());
        for (region, handle) in documents {
            continents.push((region, joined(handle)?));
        }
        Ok(WorldData {
            continents,
            grades: joined(grades)?,
        })
    })
}

pub fn load_route_info(paths: &DataPaths, region: Region) -> Result<Vec<RouteInfoRecord>, LoadError> {
    read_table(&paths.route_info(region), FetchKind::RouteInfo)
}

pub fn load_climbers(paths: &DataPaths) -> Result<Vec<ClimberRecord>, LoadError> {
    read_table(&paths.climbers(), FetchKind::Climbers)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    pub const EUROPE_GEOJSON: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"name": "Spain"},
         "geometry": {"type": "Polygon", "coordinates": [[[-9.0, 36.0], [3.0, 36.0], [3.0, 43.5], [-9.0, 43.5], [-9.0, 36.0]]]}},
        {"type": "Feature", "properties": {"name": " FRANCE "},
         "geometry": {"type": "MultiPolygon", "coordinates": [
           [[[-4.5, 43.5], [7.5, 43.5], [7.5, 51.0], [-4.5, 51.0], [-4.5, 43.5]]],
           [[[8.5, 41.4], [9.5, 41.4], [9.5, 43.0], [8.5, 43.0], [8.5, 41.4]]]
         ]}},
        {"type": "Feature", "properties": {"name": "Iceland"},
         "geometry": {"type": "Polygon", "coordinates": [[[-24.0, 63.4], [-13.5, 63.4], [-13.5, 66.5], [-24.0, 66.5], [-24.0, 63.4]]]}},
        {"type": "Feature", "properties": {},
         "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
      ]
    }"#;

    pub const EUROPE_GRADES: &str = "Country,grade_fra,route_count\n\
        Spain,6a,10\n\
        spain ,6A ,5\n\
        Spain,7a,3\n\
        France,6a,4\n\
        France,8a,0\n\
        Iceland,5c,\n";

    pub const EUROPE_INFO: &str = "Country,grade_fra,crag,sector,name\n\
        Spain,6a,Siurana,El Pati,Tranquilitat\n\
        SPAIN ,6a,Margalef,,\n\
        Spain,7a,Siurana,L'Olla,La Rambla\n\
        France,6a,Ceuse,Biographie,Berlin\n";

    pub const CLIMBERS: &str = "country,sex,height,weight,age,grade_mean_fra\n\
        Spain,0,180,70,30,6b\n\
        Spain,1,165,55,28,6a\n\
        Spain,0,175,68,35,7a\n\
        France,1,160,52,25,6c\n\
        France,0,170,65,40,6b\n\
        France,0,,80,33,6b\n";

    /// Lays out a data directory with a europe region, the world table and
    /// the climber table.
    pub fn write_data_dir(root: &Path) {
        for dir in ["geometria", "grades", "info", "charts"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("geometria/europe.geojson"), EUROPE_GEOJSON).unwrap();
        fs::write(root.join("grades/europe_routes_grades.csv"), EUROPE_GRADES).unwrap();
        fs::write(root.join("info/europe_routes_info.csv"), EUROPE_INFO).unwrap();
        fs::write(root.join("grades/world_routes_grades.csv"), EUROPE_GRADES).unwrap();
        fs::write(root.join("charts/processed_climber_df.csv"), CLIMBERS).unwrap();
    }

    /// Adds an empty boundary document for every continent that has none yet.
    pub fn write_world_boundaries(root: &Path) {
        for region in crate::region::Region::CONTINENTS {
            let path = root.join(format!("geometria/{}.geojson", region.id()));
            if !path.exists() {
                fs::write(path, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
            }
        }
    }
}
