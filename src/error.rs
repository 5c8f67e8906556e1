// error.rs

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which of the static files a load was reading when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Boundaries,
    Grades,
    RouteInfo,
    Climbers,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchKind::Boundaries => "boundary document",
            FetchKind::Grades => "grade table",
            FetchKind::RouteInfo => "route detail table",
            FetchKind::Climbers => "climber table",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {kind} at {}: {source}", path.display())]
    Io {
        kind: FetchKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {kind} at {}: {source}", path.display())]
    GeoJson {
        kind: FetchKind,
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },
    #[error("malformed {kind} at {}: {source}", path.display())]
    Csv {
        kind: FetchKind,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl LoadError {
    pub fn kind(&self) -> FetchKind {
        match self {
            LoadError::Io { kind, .. }
            | LoadError::GeoJson { kind, .. }
            | LoadError::Csv { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown region '{0}'")]
pub struct UnknownRegion(pub String);
