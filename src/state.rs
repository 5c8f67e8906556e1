// state.rs

use std::collections::HashMap;

use crate::color::Palette;
use crate::grades::GradeFilter;
use crate::region::Region;

/// Per-region choice that survives reloads for the rest of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub grade: GradeFilter,
}

/// User choices shared by every map. Owned by the app and handed to render
/// calls; there is no global copy.
#[derive(Debug, Clone, Default)]
pub struct AtlasState {
    selections: HashMap<Region, SelectionState>,
    colorblind: bool,
}

impl AtlasState {
    pub fn grade(&self, region: Region) -> GradeFilter {
        self.selections
            .get(&region)
            .map(|s| s.grade.clone())
            .unwrap_or_default()
    }

    pub fn set_grade(&mut self, region: Region, grade: GradeFilter) {
        self.selections.entry(region).or_default().grade = grade;
    }

    pub fn palette(&self) -> Palette {
        Palette::from_colorblind(self.colorblind)
    }

    pub fn toggle_colorblind(&mut self) -> Palette {
        self.colorblind = !self.colorblind;
        self.palette()
    }
}

/// What a background load is fetching. One in-flight request per key counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKey {
    Map(Region),
    Routes(Region),
    Climbers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub key: LoadKey,
    seq: u64,
}

/// Hands out request tokens and recognises stale resolutions.
#[derive(Debug, Default)]
pub struct LoadTracker {
    next_seq: u64,
    latest: HashMap<LoadKey, u64>,
}

impl LoadTracker {
    pub fn issue(&mut self, key: LoadKey) -> RequestToken {
        self.next_seq += 1;
        self.latest.insert(key, self.next_seq);
        RequestToken {
            key,
            seq: self.next_seq,
        }
    }

    /// Accepts the resolution only if no newer request for the same key was
    /// issued; an accepted token is retired.
    pub fn complete(&mut self, token: RequestToken) -> bool {
        if self.latest.get(&token.key) == Some(&token.seq) {
            self.latest.remove(&token.key);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, key: LoadKey) -> bool {
        self.latest.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_defaults_to_all_and_is_per_region() {
        let mut state = AtlasState::default();
        assert_eq!(state.grade(Region::Asia), GradeFilter::All);

        state.set_grade(Region::Asia, GradeFilter::parse("7a"));
        assert_eq!(state.grade(Region::Asia), GradeFilter::parse("7a"));
        assert_eq!(state.grade(Region::Europe), GradeFilter::All);
    }

    #[test]
    fn colorblind_toggle_flips_palette() {
        let mut state = AtlasState::default();
        assert_eq!(state.palette(), Palette::Standard);
        assert_eq!(state.toggle_colorblind(), Palette::Colorblind);
        assert_eq!(state.toggle_colorblind(), Palette::Standard);
    }

    #[test]
    fn stale_resolution_is_dropped() {
        let mut tracker = LoadTracker::default();
        let first = tracker.issue(LoadKey::Map(Region::Europe));
        let second = tracker.issue(LoadKey::Map(Region::Europe));

        // the second request resolves first; the slow first one must not win
        assert!(tracker.complete(second));
        assert!(!tracker.complete(first));
        assert!(!tracker.is_pending(LoadKey::Map(Region::Europe)));
    }

    #[test]
    fn older_request_is_dropped_even_if_it_lands_first() {
        let mut tracker = LoadTracker::default();
        let first = tracker.issue(LoadKey::Map(Region::Europe));
        let second = tracker.issue(LoadKey::Map(Region::Europe));

        assert!(!tracker.complete(first));
        assert!(tracker.is_pending(LoadKey::Map(Region::Europe)));
        assert!(tracker.complete(second));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let mut tracker = LoadTracker::default();
        let europe = tracker.issue(LoadKey::Map(Region::Europe));
        let routes = tracker.issue(LoadKey::Routes(Region::Europe));
        assert!(tracker.is_pending(LoadKey::Map(Region::Europe)));
        assert!(tracker.is_pending(LoadKey::Routes(Region::Europe)));
        assert!(tracker.complete(europe));
        assert!(tracker.is_pending(LoadKey::Routes(Region::Europe)));
        assert!(tracker.complete(routes));
        assert!(!tracker.is_pending(LoadKey::Climbers));
    }
}
