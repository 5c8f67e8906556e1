// loader.rs
//
// Background file reads. Each request runs on its own thread and posts its
// result back on the event channel, tagged with the token it was issued.

use std::sync::mpsc::Sender;
use std::thread;

use tracing::debug;

use crate::choropleth::ChoroplethLayer;
use crate::color::Palette;
use crate::config::DataPaths;
use crate::data::{
    ClimberRecord, RegionData, RouteGradeRecord, RouteInfoRecord, WorldData, load_climbers,
    load_region, load_route_info, load_world,
};
use crate::error::LoadError;
use crate::event::Event;
use crate::grades::GradeFilter;
use crate::region::Region;
use crate::state::RequestToken;

/// Data fetched for a map: a continent's three files, or the world overview.
#[derive(Debug)]
pub enum MapData {
    Region(RegionData),
    World(WorldData),
}

impl MapData {
    pub fn region(&self) -> Region {
        match self {
            MapData::Region(data) => data.region,
            MapData::World(_) => Region::World,
        }
    }

    pub fn grades(&self) -> &[RouteGradeRecord] {
        match self {
            MapData::Region(data) => &data.grades,
            MapData::World(data) => &data.grades,
        }
    }

    pub fn layer(&self, grade: &GradeFilter, palette: Palette) -> ChoroplethLayer {
        match self {
            MapData::Region(data) => ChoroplethLayer::for_region(data, grade, palette),
            MapData::World(data) => ChoroplethLayer::for_world(data, grade, palette),
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Map {
        token: RequestToken,
        region: Region,
        grade: GradeFilter,
        result: Result<MapData, LoadError>,
    },
    Routes {
        token: RequestToken,
        region: Region,
        country: String,
        grade: GradeFilter,
        result: Result<Vec<RouteInfoRecord>, LoadError>,
    },
    Climbers {
        token: RequestToken,
        result: Result<Vec<ClimberRecord>, LoadError>,
    },
}

impl LoadOutcome {
    pub fn token(&self) -> RequestToken {
        match self {
            LoadOutcome::Map { token, .. }
            | LoadOutcome::Routes { token, .. }
            | LoadOutcome::Climbers { token, .. } => *token,
        }
    }
}

/// Reads the map files for `region`: the world overview or a continent.
pub fn fetch_map(paths: &DataPaths, region: Region) -> Result<MapData, LoadError> {
    if region.is_world() {
        load_world(paths).map(MapData::World)
    } else {
        load_region(paths, region).map(MapData::Region)
    }
}

#[derive(Clone)]
pub struct Loader {
    paths: DataPaths,
    sender: Sender<Event>,
}

impl Loader {
    pub fn new(paths: DataPaths, sender: Sender<Event>) -> Self {
        Loader { paths, sender }
    }

    pub fn map(&self, token: RequestToken, region: Region, grade: GradeFilter) {
        self.spawn(move |paths| LoadOutcome::Map {
            token,
            region,
            grade,
            result: fetch_map(paths, region),
        });
    }

    /// Route details are read fresh on every request.
    pub fn routes(&self, token: RequestToken, region: Region, country: String, grade: GradeFilter) {
        self.spawn(move |paths| LoadOutcome::Routes {
            token,
            region,
            country,
            grade,
            result: load_route_info(paths, region),
        });
    }

    pub fn climbers(&self, token: RequestToken) {
        self.spawn(move |paths| LoadOutcome::Climbers {
            token,
            result: load_climbers(paths),
        });
    }

    fn spawn<F>(&self, work: F)
    where
        F: FnOnce(&DataPaths) -> LoadOutcome + Send + 'static,
    {
        let paths = self.paths.clone();
        let sender = self.sender.clone();
        thread::spawn(move || {
            let outcome = work(&paths);
            // The receiver is gone only when the app is shutting down.
            if sender.send(Event::Loaded(Box::new(outcome))).is_err() {
                debug!("load finished after the event loop closed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{write_data_dir, write_world_boundaries};
    use crate::state::{LoadKey, LoadTracker};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn map_load_posts_region_data() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        let (sender, receiver) = mpsc::channel();
        let loader = Loader::new(DataPaths::new(dir.path()), sender);
        let mut tracker = LoadTracker::default();

        let token = tracker.issue(LoadKey::Map(Region::Europe));
        loader.map(token, Region::Europe, GradeFilter::All);

        let Ok(Event::Loaded(outcome)) = receiver.recv_timeout(Duration::from_secs(5)) else {
            panic!("expected a load outcome");
        };
        assert_eq!(outcome.token(), token);
        let LoadOutcome::Map { result, region, .. } = *outcome else {
            panic!("expected a map outcome");
        };
        assert_eq!(region, Region::Europe);
        assert_eq!(result.unwrap().region(), Region::Europe);
    }

    #[test]
    fn world_fetch_reads_every_continent() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        write_world_boundaries(dir.path());
        let data = fetch_map(&DataPaths::new(dir.path()), Region::World).unwrap();
        let MapData::World(world) = data else {
            panic!("expected world data");
        };
        assert_eq!(world.continents.len(), Region::CONTINENTS.len());
    }

    #[test]
    fn failed_route_read_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (sender, receiver) = mpsc::channel();
        let loader = Loader::new(DataPaths::new(dir.path()), sender);
        let mut tracker = LoadTracker::default();

        let token = tracker.issue(LoadKey::Routes(Region::Asia));
        loader.routes(token, Region::Asia, "Japan".into(), GradeFilter::All);

        let Ok(Event::Loaded(outcome)) = receiver.recv_timeout(Duration::from_secs(5)) else {
            panic!("expected a load outcome");
        };
        let LoadOutcome::Routes { result, country, .. } = *outcome else {
            panic!("expected a routes outcome");
        };
        assert_eq!(country, "Japan");
        assert!(result.is_err());
    }
}
