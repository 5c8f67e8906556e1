// ui.rs

use plotters::prelude::RGBColor;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap,
        canvas::{Canvas, Line as CanvasLine},
    },
};

use crate::app::{App, CurrentScreen};
use crate::choropleth::ChoroplethLayer;
use crate::demographics::{CountryCharts, GenderMeans, MetricChart};
use crate::selection::{LOAD_FAILED_MESSAGE, NO_ROUTES_MESSAGE, PanelContent};

const MALE_COLOR: Color = Color::Rgb(128, 0, 128);
const FEMALE_COLOR: Color = Color::Rgb(255, 215, 0);

fn tui_color(color: RGBColor) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Notification
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    let notification = Paragraph::new(app.notification.clone())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(notification, main_layout[0]);

    match app.current_screen {
        CurrentScreen::Atlas => render_atlas(frame, app, main_layout[1]),
        CurrentScreen::Demographics => render_demographics(frame, app, main_layout[1]),
        CurrentScreen::Help => render_help_screen(frame, app, main_layout[1]),
    }

    render_footer(frame, app, main_layout[2]);
}

fn render_atlas(frame: &mut Frame, app: &mut App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24), // Regions + map info
            Constraint::Min(0),     // Map canvas
            Constraint::Length(36), // Countries / routes
        ])
        .split(area);

    render_region_pane(frame, app, columns[0]);
    render_map(frame, app, columns[1]);

    if app.panel.is_visible() {
        render_selection_panel(frame, app, columns[2]);
    } else {
        render_country_list(frame, app, columns[2]);
    }

    if let Some(hover) = &app.hover {
        let width = (hover.tooltip.text.chars().count() as u16 + 2).min(area.width);
        let x = hover.column.min(area.x + area.width.saturating_sub(width));
        let y = hover.row.min(area.y + area.height.saturating_sub(1));
        let tip_area = Rect::new(x, y, width, 1);
        frame.render_widget(Clear, tip_area);
        frame.render_widget(
            Paragraph::new(format!(" {} ", hover.tooltip.text))
                .style(Style::default().fg(Color::Black).bg(Color::White)),
            tip_area,
        );
    }
}

fn render_region_pane(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.regions.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(area);

    let region_lines: Vec<Line> = app
        .regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let mut style = Style::default().fg(Color::White);
            if i == app.selected_region_index {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            let marker = if app.is_loading(*region) { "…" } else { " " };
            Line::from(Span::styled(
                format!("{marker}{}", region.display_name()),
                style,
            ))
        })
        .collect();
    frame.render_widget(
        Paragraph::new(region_lines).block(Block::default().borders(Borders::ALL).title("Regions")),
        chunks[0],
    );

    let region = app.current_region();
    let mut info = vec![
        Line::from(format!("Grade: {}", app.state.grade(region))),
        Line::from(format!("Palette: {}", app.state.palette().label())),
    ];
    if let Some(layer) = app.current_layer() {
        let projection = layer.projection();
        info.push(Line::from(format!("Countries: {}", layer.shapes().len())));
        info.push(Line::from(format!("Max routes: {}", layer.max_count())));
        if let Some(rows) = app.route_rows.get(&region) {
            info.push(Line::from(format!("Route rows: {rows}")));
        }
        info.push(Line::from(format!("Scale: {:.1}", projection.scale)));
        info.push(Line::from(format!(
            "Offset: {:.0}, {:.0}",
            projection.translate.0, projection.translate.1
        )));
    } else {
        info.push(Line::from("No map loaded yet.").fg(Color::Gray));
    }
    frame.render_widget(
        Paragraph::new(info)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Map Info ")
                    .border_style(Style::default().fg(Color::LightBlue)),
            )
            .wrap(Wrap { trim: false }),
        chunks[1],
    );
}

fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let region = app.current_region();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", region.display_name()))
        .title_style(Style::default().fg(Color::Cyan).bold());
    app.map_area = block.inner(area);

    let Some(layer) = app.layers.get(&region) else {
        let text = if app.is_loading(region) {
            format!("Loading {}…", region.display_name())
        } else {
            String::from("No map data.")
        };
        frame.render_widget(
            Paragraph::new(text).alignment(Alignment::Center).block(block),
            area,
        );
        return;
    };

    let (width, height) = layer.viewport();
    let (width, height) = (f64::from(width), f64::from(height));
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| draw_layer(ctx, layer, height));
    frame.render_widget(canvas, area);
}

// Canvas y grows upward; projected y grows downward.
fn draw_layer(ctx: &mut ratatui::widgets::canvas::Context<'_>, layer: &ChoroplethLayer, height: f64) {
    for shape in layer.shapes() {
        let color = tui_color(shape.fill);
        for ring in shape.polygons.iter().flatten() {
            for pair in ring.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                ctx.draw(&CanvasLine {
                    x1: a.0,
                    y1: height - a.1,
                    x2: b.0,
                    y2: height - b.1,
                    color,
                });
            }
        }
    }
}

fn render_country_list(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.country_rows();
    let visible = area.height.saturating_sub(2) as usize;
    let offset = app
        .selected_country_index
        .saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, shape)| {
            let mut style = Style::default().fg(Color::White);
            if i == app.selected_country_index {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(tui_color(shape.fill))),
                Span::styled(
                    format!("{} ({})", shape.name, shape.count.unwrap_or(0)),
                    style,
                ),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Countries")),
        area,
    );
}

fn render_selection_panel(frame: &mut Frame, app: &App, area: Rect) {
    let panel = &app.panel;
    let mut lines = Vec::new();
    if let Some(region) = panel.region() {
        lines.push(
            Line::from(format!(
                "{} routes in {}, {}",
                panel.grade(),
                panel.country(),
                region.display_name()
            ))
                .fg(Color::Cyan),
        );
    }
    match panel.content() {
        PanelContent::Routes(entries) => {
            for entry in entries {
                lines.push(Line::from(entry.name.clone()).bold());
                lines.push(
                    Line::from(format!("  {} / {}", entry.crag, entry.sector)).fg(Color::Gray),
                );
            }
        }
        PanelContent::NoRoutes => lines.push(Line::from(NO_ROUTES_MESSAGE).fg(Color::Gray)),
        PanelContent::Failed => lines.push(Line::from(LOAD_FAILED_MESSAGE).fg(Color::Red)),
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} (x: close) ", panel.header()))
        .border_style(Style::default().fg(Color::LightYellow));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_demographics(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)])
        .split(area);

    let lines: Vec<Line> = app
        .climber_countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            let mut style = Style::default().fg(Color::White);
            if i == app.selected_climber_index {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            Line::from(Span::styled(country.clone(), style))
        })
        .collect();
    let offset = app
        .selected_climber_index
        .saturating_sub(columns[0].height.saturating_sub(3) as usize);
    frame.render_widget(
        Paragraph::new(lines)
            .scroll((offset as u16, 0))
            .block(Block::default().borders(Borders::ALL).title("Countries")),
        columns[0],
    );

    let Some(charts) = &app.charts else {
        frame.render_widget(
            Paragraph::new("No climber data loaded.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL)),
            columns[1],
        );
        return;
    };
    render_country_charts(frame, charts, columns[1]);
}

fn render_country_charts(frame: &mut Frame, charts: &CountryCharts, area: Rect) {
    let mut constraints: Vec<Constraint> = charts
        .metrics
        .iter()
        .map(|_| Constraint::Ratio(1, charts.metrics.len() as u32 + 1))
        .collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (chart, row) in charts.metrics.iter().zip(rows.iter()) {
        render_metric_chart(frame, chart, *row);
    }

    let grades = &charts.grades;
    let data: Vec<(&str, u64)> = grades
        .categories
        .iter()
        .map(|(label, count)| (label.as_str(), *count as u64))
        .collect();
    let title = match &grades.global_reference {
        Some(reference) => format!(
            " Climbers in {} climb... (global median: {reference}) ",
            charts.country
        ),
        None => format!(" Climbers in {} climb... ", charts.country),
    };
    let bars = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(data.as_slice())
        .bar_width(4)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Rgb(60, 179, 113)))
        .value_style(Style::default().fg(Color::Black).bg(Color::Rgb(60, 179, 113)));
    if let Some(last) = rows.last() {
        frame.render_widget(bars, *last);
    }
}

fn means_line(label: &str, means: GenderMeans, color: Color) -> Line<'static> {
    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
    Line::from(vec![
        Span::styled(format!("{label} "), Style::default().fg(color)),
        Span::raw(format!("M: {}  F: {}", show(means.male), show(means.female))),
    ])
}

fn render_metric_chart(frame: &mut Frame, chart: &MetricChart, area: Rect) {
    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(area);

    let summary = vec![
        Line::from(format!("{:.0} – {:.0}", chart.domain.0, chart.domain.1)),
        means_line("Country", chart.country_means, Color::White),
        means_line("Global ", chart.global_means, Color::Red),
    ];
    frame.render_widget(
        Paragraph::new(summary).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", chart.metric.label())),
        ),
        split[0],
    );

    let groups: Vec<BarGroup> = chart
        .male_bins
        .iter()
        .zip(&chart.female_bins)
        .map(|(male, female)| {
            BarGroup::default()
                .label(Line::from(format!("{:.0}", male.x0)))
                .bars(&[
                    Bar::default()
                        .value(male.count as u64)
                        .style(Style::default().fg(MALE_COLOR)),
                    Bar::default()
                        .value(female.count as u64)
                        .style(Style::default().fg(FEMALE_COLOR)),
                ])
        })
        .collect();
    let mut bars = BarChart::default()
        .block(Block::default().borders(Borders::ALL))
        .bar_width(1)
        .bar_gap(0)
        .group_gap(1);
    for group in groups {
        bars = bars.data(group);
    }
    frame.render_widget(bars, split[1]);
}

/// Renders the help screen.
fn render_help_screen(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Help Screen ")
        .title_style(Style::default().fg(Color::Yellow).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let mut lines = vec![Line::from("Keybinds:")];
    lines.extend(app.help_keybinds.iter().map(|s| Line::from(format!("  {s}"))));
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Exports are written to {}",
        app.settings().output_dir.display()
    )));
    let help_text = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::LightGreen));

    frame.render_widget(help_text, area);
}

/// Renders a common footer area.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let current_screen_name = match app.current_screen {
        CurrentScreen::Atlas => "Atlas",
        CurrentScreen::Demographics => "Demographics",
        CurrentScreen::Help => "Help",
    };

    let footer_text = Line::from(vec![
        Span::raw("Screen: "),
        Span::styled(
            current_screen_name,
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Grade: "),
        Span::styled(
            app.state.grade(app.current_region()).to_string(),
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Press "),
        Span::styled(
            "q",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Red),
        ),
        Span::raw(" to quit "),
        Span::raw(" | Press "),
        Span::styled(
            "h",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Green),
        ),
        Span::raw(" for Help "),
    ]);

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let footer = Paragraph::new(footer_text)
        .alignment(Alignment::Center)
        .block(block)
        .style(Style::default().fg(Color::Gray));

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataPaths, Settings};
    use crate::data::fixtures::write_data_dir;
    use crate::grades::GradeFilter;
    use crate::plot::OutputFormat;
    use crate::region::Region;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::mpsc;
    use std::time::Duration;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn atlas_shows_loading_then_countries() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        let settings = Settings {
            data: DataPaths::new(dir.path()),
            output_dir: dir.path().join("output"),
            format: OutputFormat::Png,
        };
        let (sender, receiver) = mpsc::channel();
        let mut app = App::new(settings, sender);
        app.selected_region_index = app
            .regions
            .iter()
            .position(|r| *r == Region::Europe)
            .unwrap();
        app.start();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(buffer_text(&terminal).contains("Loading Europe…"));

        let event = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        app.handle_event(event);
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Spain (18)"));
        assert!(app.map_area.width > 0);
    }

    #[test]
    fn selection_panel_names_the_clicked_country() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data: DataPaths::new(dir.path()),
            output_dir: dir.path().join("output"),
            format: OutputFormat::Png,
        };
        let (sender, _receiver) = mpsc::channel();
        let mut app = App::new(settings, sender);
        app.panel
            .show(Region::Europe, "Spain", &GradeFilter::parse("6a"), Ok(&[]));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("6a routes in Spain, Europe"));
        assert!(text.contains("No routes found"));
    }
}
