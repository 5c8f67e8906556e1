// selection.rs

use crate::data::RouteInfoRecord;
use crate::error::LoadError;
use crate::grades::{GradeFilter, normalize};
use crate::region::Region;

pub const UNKNOWN_FIELD: &str = "Unknown";
pub const NO_ROUTES_MESSAGE: &str = "No routes found for this grade in this country.";
pub const LOAD_FAILED_MESSAGE: &str = "Error loading routes information.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub crag: String,
    pub sector: String,
    pub name: String,
}

impl From<&RouteInfoRecord> for RouteEntry {
    fn from(record: &RouteInfoRecord) -> Self {
        let or_unknown =
            |field: &Option<String>| field.clone().unwrap_or_else(|| UNKNOWN_FIELD.to_string());
        RouteEntry {
            crag: or_unknown(&record.crag),
            sector: or_unknown(&record.sector),
            name: or_unknown(&record.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelContent {
    Routes(Vec<RouteEntry>),
    NoRoutes,
    Failed,
}

/// Rows of `records` in `country` whose grade passes `grade`.
pub fn filter_routes<'a>(
    records: &'a [RouteInfoRecord],
    country: &str,
    grade: &GradeFilter,
) -> Vec<&'a RouteInfoRecord> {
    let country = normalize(country);
    records
        .iter()
        .filter(|route| normalize(&route.country) == country && grade.matches(&route.grade))
        .collect()
}

/// Route list for the most recently clicked country.
#[derive(Debug, Clone)]
pub struct SelectionPanel {
    visible: bool,
    region: Option<Region>,
    country: String,
    grade: GradeFilter,
    content: PanelContent,
}

impl Default for SelectionPanel {
    fn default() -> Self {
        SelectionPanel {
            visible: false,
            region: None,
            country: String::new(),
            grade: GradeFilter::All,
            content: PanelContent::NoRoutes,
        }
    }
}

impl SelectionPanel {
    /// Fills the panel from a fresh read of the region's route table.
    pub fn show(
        &mut self,
        region: Region,
        country: &str,
        grade: &GradeFilter,
        routes: Result<&[RouteInfoRecord], &LoadError>,
    ) {
        self.visible = true;
        self.region = Some(region);
        self.country = country.to_string();
        self.grade = grade.clone();
        self.content = match routes {
            Ok(records) => {
                let entries: Vec<RouteEntry> = filter_routes(records, country, grade)
                    .into_iter()
                    .map(RouteEntry::from)
                    .collect();
                if entries.is_empty() {
                    PanelContent::NoRoutes
                } else {
                    PanelContent::Routes(entries)
                }
            }
            Err(_) => PanelContent::Failed,
        };
    }

    /// Hides the panel and drops its content.
    pub fn close(&mut self) {
        *self = SelectionPanel::default();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn grade(&self) -> &GradeFilter {
        &self.grade
    }

    pub fn content(&self) -> &PanelContent {
        &self.content
    }

    pub fn route_count(&self) -> usize {
        match &self.content {
            PanelContent::Routes(entries) => entries.len(),
            _ => 0,
        }
    }

    /// Header line: `<country> | <grade> | <n> routes`.
    pub fn header(&self) -> String {
        format!(
            "{} | {} | {} routes",
            self.country,
            self.grade,
            self.route_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchKind;
    use std::io;
    use std::path::PathBuf;

    fn route(country: &str, grade: &str, crag: Option<&str>, name: Option<&str>) -> RouteInfoRecord {
        RouteInfoRecord {
            country: country.to_string(),
            grade: normalize(grade),
            crag: crag.map(str::to_string),
            sector: None,
            name: name.map(str::to_string),
        }
    }

    fn routes() -> Vec<RouteInfoRecord> {
        vec![
            route("Spain", "6a", Some("Siurana"), Some("Tranquilitat")),
            route(" SPAIN", "6a", Some("Margalef"), None),
            route("spain ", "7a", Some("Siurana"), Some("La Rambla")),
            route("France", "6a", Some("Ceuse"), Some("Berlin")),
        ]
    }

    #[test]
    fn filters_by_country_and_grade() {
        let records = routes();
        let found = filter_routes(&records, "Spain", &GradeFilter::parse("6a"));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.grade == "6a"));
        assert!(found.iter().all(|r| normalize(&r.country) == "spain"));
    }

    #[test]
    fn all_returns_every_grade_for_country() {
        let records = routes();
        let found = filter_routes(&records, " spain", &GradeFilter::All);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let records = routes();
        let mut panel = SelectionPanel::default();
        panel.show(Region::Europe, "Spain", &GradeFilter::parse("6a"), Ok(&records));

        assert!(panel.is_visible());
        assert_eq!(panel.route_count(), 2);
        let PanelContent::Routes(entries) = panel.content() else {
            panic!("expected routes");
        };
        assert_eq!(
            entries[1],
            RouteEntry {
                crag: "Margalef".into(),
                sector: UNKNOWN_FIELD.into(),
                name: UNKNOWN_FIELD.into(),
            }
        );
        assert_eq!(panel.header(), "Spain | 6a | 2 routes");
    }

    #[test]
    fn empty_result_is_explicit() {
        let records = routes();
        let mut panel = SelectionPanel::default();
        panel.show(Region::Europe, "Italy", &GradeFilter::All, Ok(&records));
        assert!(panel.is_visible());
        assert_eq!(panel.content(), &PanelContent::NoRoutes);
    }

    #[test]
    fn failed_fetch_shows_error_state() {
        let err = LoadError::Io {
            kind: FetchKind::RouteInfo,
            path: PathBuf::from("data/info/europe_routes_info.csv"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let mut panel = SelectionPanel::default();
        panel.show(Region::Europe, "Spain", &GradeFilter::All, Err(&err));
        assert_eq!(panel.content(), &PanelContent::Failed);
    }

    #[test]
    fn close_hides_and_clears() {
        let records = routes();
        let mut panel = SelectionPanel::default();
        panel.show(Region::Europe, "Spain", &GradeFilter::All, Ok(&records));
        panel.close();
        assert!(!panel.is_visible());
        assert_eq!(panel.route_count(), 0);
        assert_eq!(panel.country(), "");
        assert_eq!(panel.region(), None);
    }
}
