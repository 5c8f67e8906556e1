// main.rs for crag-atlas: interactive terminal atlas plus headless exports
mod app;
mod choropleth;
mod color;
mod config;
mod data;
mod demographics;
mod error;
mod event;
mod grades;
mod loader;
mod plot;
mod projection;
mod region;
mod scale;
mod selection;
mod state;
mod ui;

use std::fs::{self, File};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::Backend, backend::CrosstermBackend};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::color::Palette;
use crate::config::{Cli, Command, Settings};
use crate::data::load_climbers;
use crate::demographics::country_charts;
use crate::event::EventHandler;
use crate::grades::GradeFilter;
use crate::loader::fetch_map;

const TICK_RATE: Duration = Duration::from_millis(250);
const LOG_FILE: &str = "crag-atlas.log";

fn env_filter(cli: &Cli) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()))
}

// The terminal belongs to the UI, so interactive sessions log to a file.
fn init_file_logging(cli: &Cli, settings: &Settings) -> Result<()> {
    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "creating output directory {}",
            settings.output_dir.display()
        )
    })?;
    let path = settings.output_dir.join(LOG_FILE);
    let file =
        File::create(&path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings();

    match &cli.command {
        None => {
            init_file_logging(&cli, &settings)?;
            info!(data = %settings.data.root().display(), "starting atlas");
            run_tui(settings)
        }
        Some(command) => {
            init_stderr_logging(&cli);
            export(command, &settings)
        }
    }
}

fn run_tui(settings: Settings) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(&mut terminal, settings);

    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!("atlas stopped: {e:#}");
    }
    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, settings: Settings) -> Result<()> {
    let events = EventHandler::new(TICK_RATE);
    let mut app = App::new(settings, events.sender());
    app.start();

    // Main TUI Loop
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, &mut app))?;
        if let Some(event) = events.next(TICK_RATE)? {
            app.handle_event(event);
        }
    }
    info!("atlas closed");
    Ok(())
}

fn export(command: &Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Map {
            region,
            grade,
            colorblind,
            format,
        } => {
            let grade = GradeFilter::parse(grade);
            let data = fetch_map(&settings.data, *region)
                .with_context(|| format!("loading {region} map data"))?;
            let layer = data.layer(&grade, Palette::from_colorblind(*colorblind));
            info!(
                region = %data.region(),
                %grade,
                countries = layer.counts().len(),
                "map aggregated"
            );
            let path = plot::map_path(&settings.output_dir, &layer, *format);
            plot::write_map(&layer, &path, *format)?;
            println!("{}", path.display());
        }
        Command::Charts { country, format } => {
            let climbers = load_climbers(&settings.data).context("loading climber table")?;
            let charts = country_charts(&climbers, country)
                .with_context(|| format!("no climbers recorded for '{country}'"))?;
            for path in plot::write_country_charts(&charts, &settings.output_dir, *format)? {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
