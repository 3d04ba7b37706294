//! Celexta entry point.
//!
//! Loads the user configuration, sets up logging and opens the workspace:
//! the last session when one was saved and restoring is enabled, otherwise a
//! single tab holding a sample frame with a region, a table and a candidate.
//! The tab contents are summarized in the log, and the session is saved again
//! on exit when configured.

use std::path::PathBuf;

use clap::Parser;
use celexta::items::ItemKind;
use celexta::samples::{self, ExampleImage};
use celexta::{Config, Result, Workspace};

#[derive(Parser, Debug)]
#[command(name = "celexta", version, about = "Astronomical image, region, catalog and candidate viewer", long_about = None)]
struct Args {}

fn main() -> Result<()> {
    let _args = Args::parse();

    let dir = Config::default_dir().unwrap_or_else(|| PathBuf::from(".celexta"));
    let config = Config::load_or_init(&dir)?;
    celexta::logging::init(&config.logging_options())?;
    tracing::info!(config_dir = %config.dir.display(), "starting celexta {}", env!("CARGO_PKG_VERSION"));

    let mut workspace = Workspace::new(config.palette.colors.clone());
    if config.session.restore_on_start {
        workspace.load_session(config.session_dir())?;
    }
    if workspace.is_empty() {
        open_example_tab(&mut workspace)?;
    }

    for (index, title) in workspace.titles().into_iter().enumerate() {
        let Some(controller) = workspace.tab(index) else {
            continue;
        };
        let counts = ItemKind::ALL
            .iter()
            .map(|kind| format!("{} {}", controller.count(*kind), kind.name()))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(tab = title, focused = ?controller.focused_surface(), "{counts}");
    }

    if config.session.save_on_exit {
        let path = workspace.save_session(config.session_dir())?;
        tracing::info!(path = %path.display(), "session saved");
    }
    Ok(())
}

fn open_example_tab(workspace: &mut Workspace) -> Result<()> {
    let index = workspace.add_tab("Tab 1");
    let Some(controller) = workspace.tab(index) else {
        return Ok(());
    };

    let frame = samples::example_image(ExampleImage::Starfield)?;
    let region = samples::example_region(&frame, 1);
    let table = samples::example_table(&frame, 2);
    let candidate = samples::example_candidate(&frame, 3, 5);

    controller.add_image_frame(frame);
    if let Some(region) = region {
        controller.add(region);
    }
    if let Some(table) = table {
        controller.add(table);
    }
    if let Some(candidate) = candidate {
        controller.add(candidate);
    }
    Ok(())
}
