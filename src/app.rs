// app.rs

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, error, info};

use crate::choropleth::{ChoroplethLayer, CountryShape, MapClick, Tooltip};
use crate::config::Settings;
use crate::data::ClimberRecord;
use crate::demographics::{CountryCharts, countries, country_charts};
use crate::event::Event;
use crate::grades::available_grades;
use crate::loader::{LoadOutcome, Loader, MapData};
use crate::plot;
use crate::region::Region;
use crate::selection::SelectionPanel;
use crate::state::{AtlasState, LoadKey, LoadTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentScreen {
    Atlas,
    Demographics,
    Help,
}

/// A tooltip placed in terminal cells.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTip {
    pub tooltip: Tooltip,
    pub column: u16,
    pub row: u16,
}

pub struct App {
    pub current_screen: CurrentScreen,
    pub should_quit: bool,

    // Map state
    pub regions: Vec<Region>,
    pub selected_region_index: usize,
    pub state: AtlasState,
    pub layers: HashMap<Region, ChoroplethLayer>,
    pub region_grades: HashMap<Region, Vec<String>>,
    pub route_rows: HashMap<Region, usize>,
    pub selected_country_index: usize,
    pub panel: SelectionPanel,
    pub hover: Option<HoverTip>,

    // Demographics state
    pub climbers: Option<Vec<ClimberRecord>>,
    pub climber_countries: Vec<String>,
    pub selected_climber_index: usize,
    pub charts: Option<CountryCharts>,

    // UI related
    pub notification: String,
    pub help_keybinds: Vec<String>,
    /// Inner area of the map canvas from the last draw, for mouse mapping.
    pub map_area: Rect,

    settings: Settings,
    loader: Loader,
    tracker: LoadTracker,
}

impl App {
    pub fn new(settings: Settings, sender: Sender<Event>) -> App {
        let loader = Loader::new(settings.data.clone(), sender);
        App {
            current_screen: CurrentScreen::Atlas,
            should_quit: false,

            regions: Region::all().collect(),
            selected_region_index: 0,
            state: AtlasState::default(),
            layers: HashMap::new(),
            region_grades: HashMap::new(),
            route_rows: HashMap::new(),
            selected_country_index: 0,
            panel: SelectionPanel::default(),
            hover: None,

            climbers: None,
            climber_countries: Vec::new(),
            selected_climber_index: 0,
            charts: None,

            notification: String::from("Select a region to explore:"),
            help_keybinds: vec![
                "←/→ or Tab: Switch region".to_string(),
                "J/K or ↑/↓: Move through countries".to_string(),
                "Enter: Open routes (continent) or jump to continent (world)".to_string(),
                "Mouse: Hover for names, click to drill down".to_string(),
                "G / Shift+G: Next / previous grade filter".to_string(),
                "B: Toggle colorblind palette".to_string(),
                "X or Esc: Close the routes panel".to_string(),
                "D: Climber demographics".to_string(),
                "N/P: Next / previous climber country".to_string(),
                "E: Export the current view".to_string(),
                "H: Show Help screen".to_string(),
                "Q: Quit the application".to_string(),
            ],
            map_area: Rect::default(),

            settings,
            loader,
            tracker: LoadTracker::default(),
        }
    }

    /// Kicks off the first map load.
    pub fn start(&mut self) {
        self.request_map(self.current_region());
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_region(&self) -> Region {
        self.regions[self.selected_region_index]
    }

    pub fn current_layer(&self) -> Option<&ChoroplethLayer> {
        self.layers.get(&self.current_region())
    }

    pub fn is_loading(&self, region: Region) -> bool {
        self.tracker.is_pending(LoadKey::Map(region))
    }

    /// Named countries of the current map, most routes first.
    pub fn country_rows(&self) -> Vec<&CountryShape> {
        let Some(layer) = self.current_layer() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut rows: Vec<&CountryShape> = layer
            .shapes()
            .iter()
            .filter(|shape| !shape.key.is_empty() && seen.insert(shape.key.as_str()))
            .collect();
        rows.sort_by(|a, b| {
            b.count
                .unwrap_or(0)
                .cmp(&a.count.unwrap_or(0))
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }

    fn request_map(&mut self, region: Region) {
        let grade = self.state.grade(region);
        let token = self.tracker.issue(LoadKey::Map(region));
        info!(%region, %grade, "loading map");
        self.notification = format!("Loading {}…", region.display_name());
        self.loader.map(token, region, grade);
    }

    fn request_routes(&mut self, region: Region, country: String) {
        let grade = self.state.grade(region);
        let token = self.tracker.issue(LoadKey::Routes(region));
        debug!(%region, %country, %grade, "loading route details");
        self.loader.routes(token, region, country, grade);
    }

    fn request_climbers(&mut self) {
        if self.tracker.is_pending(LoadKey::Climbers) {
            return;
        }
        let token = self.tracker.issue(LoadKey::Climbers);
        self.notification = String::from("Loading climber data…");
        self.loader.climbers(token);
    }

    pub fn select_region(&mut self, index: usize) {
        self.selected_region_index = index % self.regions.len();
        self.selected_country_index = 0;
        self.hover = None;
        self.panel.close();
        self.request_map(self.current_region());
    }

    fn step_region(&mut self, forward: bool) {
        let len = self.regions.len();
        let index = if forward {
            (self.selected_region_index + 1) % len
        } else {
            (self.selected_region_index + len - 1) % len
        };
        self.select_region(index);
    }

    fn jump_to(&mut self, region: Region) {
        if let Some(index) = self.regions.iter().position(|r| *r == region) {
            self.select_region(index);
        }
    }

    /// Moves the current region to the next (or previous) grade and reloads.
    pub fn cycle_grade(&mut self, forward: bool) {
        let region = self.current_region();
        let grades = self
            .region_grades
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let next = self.state.grade(region).cycle(grades, forward);
        self.state.set_grade(region, next);
        self.panel.close();
        self.request_map(region);
    }

    /// Swaps the ramp on every rendered map.
    pub fn toggle_colorblind(&mut self) {
        let palette = self.state.toggle_colorblind();
        for layer in self.layers.values_mut() {
            layer.recolor(palette);
        }
        info!(palette = palette.label(), "palette changed");
        self.notification = format!("Palette: {}", palette.label());
    }

    pub fn handle_click(&mut self, click: MapClick) {
        match click {
            MapClick::Country { region, name } => self.request_routes(region, name),
            MapClick::Continent(region) => self.jump_to(region),
        }
    }

    fn open_selected_country(&mut self) {
        let click = {
            let Some(layer) = self.current_layer() else {
                return;
            };
            let rows = self.country_rows();
            match rows.get(self.selected_country_index) {
                Some(shape) => layer.click_shape(shape),
                None => return,
            }
        };
        self.handle_click(click);
    }

    fn move_country_selection(&mut self, down: bool) {
        let len = self.country_rows().len();
        if len == 0 {
            return;
        }
        self.selected_country_index = if down {
            (self.selected_country_index + 1).min(len - 1)
        } else {
            self.selected_country_index.saturating_sub(1)
        };
    }

    fn step_climber_country(&mut self, forward: bool) {
        let len = self.climber_countries.len();
        if len == 0 {
            return;
        }
        self.selected_climber_index = if forward {
            (self.selected_climber_index + 1) % len
        } else {
            (self.selected_climber_index + len - 1) % len
        };
        self.refresh_charts();
    }

    fn refresh_charts(&mut self) {
        self.charts = match (&self.climbers, self.climber_countries.get(self.selected_climber_index)) {
            (Some(climbers), Some(country)) => country_charts(climbers, country),
            _ => None,
        };
    }

    fn show_demographics(&mut self) {
        self.current_screen = CurrentScreen::Demographics;
        if self.climbers.is_none() {
            self.request_climbers();
        }
    }

    /// Writes the current view to the output directory.
    pub fn export(&mut self) {
        let format = self.settings.format;
        let output_dir = self.settings.output_dir.clone();
        let result = match self.current_screen {
            CurrentScreen::Demographics => match &self.charts {
                Some(charts) => plot::write_country_charts(charts, &output_dir, format)
                    .map(|paths| format!("{} charts for {}", paths.len(), charts.country)),
                None => return,
            },
            _ => match self.current_layer() {
                Some(layer) => {
                    let path = plot::map_path(&output_dir, layer, format);
                    plot::write_map(layer, &path, format).map(|()| path.display().to_string())
                }
                None => return,
            },
        };
        let stamp = Local::now().format("%H:%M:%S");
        self.notification = match result {
            Ok(what) => {
                info!(%what, "exported");
                format!("Saved {what} at {stamp}")
            }
            Err(e) => {
                error!("export failed: {e:#}");
                format!("Export failed at {stamp}: {e}")
            }
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('h') => {
                self.current_screen = if self.current_screen == CurrentScreen::Help {
                    CurrentScreen::Atlas
                } else {
                    CurrentScreen::Help
                };
            }
            KeyCode::Char('d') => {
                if self.current_screen == CurrentScreen::Demographics {
                    self.current_screen = CurrentScreen::Atlas;
                } else {
                    self.show_demographics();
                }
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('b') => self.toggle_colorblind(),
            KeyCode::Esc | KeyCode::Char('x') => {
                if self.panel.is_visible() {
                    self.panel.close();
                } else {
                    self.current_screen = CurrentScreen::Atlas;
                }
            }
            _ => match self.current_screen {
                CurrentScreen::Atlas => self.handle_atlas_key(key),
                CurrentScreen::Demographics => self.handle_demographics_key(key),
                CurrentScreen::Help => {}
            },
        }
    }

    fn handle_atlas_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Right | KeyCode::Tab => self.step_region(true),
            KeyCode::Left | KeyCode::BackTab => self.step_region(false),
            KeyCode::Char('j') | KeyCode::Down => self.move_country_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_country_selection(false),
            KeyCode::Char('g') => self.cycle_grade(true),
            KeyCode::Char('G') => self.cycle_grade(false),
            KeyCode::Enter => self.open_selected_country(),
            _ => {}
        }
    }

    fn handle_demographics_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') | KeyCode::Char('j') | KeyCode::Down => {
                self.step_climber_country(true)
            }
            KeyCode::Char('p') | KeyCode::Char('k') | KeyCode::Up => {
                self.step_climber_country(false)
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.current_screen != CurrentScreen::Atlas {
            return;
        }
        let Some(layer) = self.current_layer() else {
            return;
        };
        let Some(point) = to_map_point(self.map_area, layer.viewport(), mouse.column, mouse.row)
        else {
            self.hover = None;
            return;
        };
        match mouse.kind {
            MouseEventKind::Moved => {
                let hover = layer.hover(point).and_then(|tooltip| {
                    let (column, row) =
                        to_cell(self.map_area, layer.viewport(), tooltip.position)?;
                    Some(HoverTip {
                        tooltip,
                        column,
                        row,
                    })
                });
                self.hover = hover;
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(click) = layer.click(point) {
                    self.handle_click(click);
                }
            }
            _ => {}
        }
    }

    /// Applies a finished load. Stale results and failures leave state as is.
    pub fn handle_loaded(&mut self, outcome: LoadOutcome) {
        let token = outcome.token();
        if !self.tracker.complete(token) {
            debug!(key = ?token.key, "dropping stale load result");
            return;
        }
        match outcome {
            LoadOutcome::Map {
                region,
                grade,
                result,
                ..
            } => match result {
                Ok(data) => {
                    self.region_grades
                        .insert(region, available_grades(data.grades()));
                    if let MapData::Region(data) = &data {
                        self.route_rows.insert(region, data.route_info.len());
                    }
                    let layer = data.layer(&grade, self.state.palette());
                    info!(
                        %region,
                        %grade,
                        shapes = layer.shapes().len(),
                        max = layer.max_count(),
                        "map rendered"
                    );
                    self.layers.insert(region, layer);
                    if region == self.current_region() {
                        self.notification =
                            format!("{} | grade: {}", region.display_name(), grade);
                    }
                }
                Err(e) => {
                    error!(%region, fetch = %e.kind(), "failed to load map: {e}");
                    self.notification =
                        format!("Failed to load {}: {}", region.display_name(), e.kind());
                }
            },
            LoadOutcome::Routes {
                region,
                country,
                grade,
                result,
                ..
            } => {
                if let Err(e) = &result {
                    error!(%region, fetch = %e.kind(), %country, "failed to load routes: {e}");
                }
                self.panel
                    .show(region, &country, &grade, result.as_deref());
            }
            LoadOutcome::Climbers { result, .. } => match result {
                Ok(climbers) => {
                    info!(rows = climbers.len(), "climber data loaded");
                    self.climber_countries = countries(&climbers);
                    self.selected_climber_index = 0;
                    self.climbers = Some(climbers);
                    self.refresh_charts();
                    self.notification = String::from("Climber demographics: N/P to change country");
                }
                Err(e) => {
                    error!(fetch = %e.kind(), "failed to load climbers: {e}");
                    self.notification = format!("Failed to load {}", e.kind());
                }
            },
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick | Event::Resize => {}
            Event::Input(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Loaded(outcome) => self.handle_loaded(*outcome),
        }
    }
}

/// Maps a terminal cell inside `area` to map pixel coordinates (cell centre).
pub fn to_map_point(area: Rect, viewport: (u32, u32), column: u16, row: u16) -> Option<(f64, f64)> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    if column < area.x || row < area.y || column >= area.x + area.width || row >= area.y + area.height
    {
        return None;
    }
    let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
    let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
    Some((fx * f64::from(viewport.0), fy * f64::from(viewport.1)))
}

/// Inverse of [`to_map_point`], clamped to `area`.
pub fn to_cell(area: Rect, viewport: (u32, u32), (x, y): (f64, f64)) -> Option<(u16, u16)> {
    if area.width == 0 || area.height == 0 || viewport.0 == 0 || viewport.1 == 0 {
        return None;
    }
    let column = (x / f64::from(viewport.0) * f64::from(area.width)).floor();
    let row = (y / f64::from(viewport.1) * f64::from(area.height)).floor();
    let column = column.clamp(0.0, f64::from(area.width - 1)) as u16;
    let row = row.clamp(0.0, f64::from(area.height - 1)) as u16;
    Some((area.x + column, area.y + row))
}
