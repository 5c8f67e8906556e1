// region.rs

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownRegion;

/// Unit of map rendering: one continent, or the world overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    World,
    Europe,
    Asia,
    Africa,
    NorthAmerica,
    SouthAmerica,
    Oceania,
}

impl Region {
    pub const CONTINENTS: [Region; 6] = [
        Region::Europe,
        Region::Asia,
        Region::Africa,
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Oceania,
    ];

    /// Identifier used in data file names.
    pub fn id(self) -> &'static str {
        match self {
            Region::World => "world",
            Region::Europe => "europe",
            Region::Asia => "asia",
            Region::Africa => "africa",
            Region::NorthAmerica => "north_america",
            Region::SouthAmerica => "south_america",
            Region::Oceania => "oceania",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Region::World => "World",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Oceania => "Oceania",
        }
    }

    pub fn is_world(self) -> bool {
        self == Region::World
    }

    /// World first, then every continent; the order of the region list.
    pub fn all() -> impl Iterator<Item = Region> {
        std::iter::once(Region::World).chain(Region::CONTINENTS)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase().replace('-', "_");
        Region::all()
            .find(|region| region.id() == id)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dashed_and_mixed_case_identifiers() {
        assert_eq!("north-america".parse(), Ok(Region::NorthAmerica));
        assert_eq!(" South_America ".parse(), Ok(Region::SouthAmerica));
        assert_eq!("WORLD".parse(), Ok(Region::World));
    }

    #[test]
    fn rejects_unknown_region() {
        assert_eq!(
            "antarctica".parse::<Region>(),
            Err(UnknownRegion("antarctica".to_string()))
        );
    }

    #[test]
    fn world_leads_the_region_list() {
        let regions: Vec<Region> = Region::all().collect();
        assert_eq!(regions.len(), 7);
        assert_eq!(regions[0], Region::World);
        assert_eq!(regions[4], Region::NorthAmerica);
    }
}
