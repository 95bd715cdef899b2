//! Command-line entry point: open a project directory and report validity.

use std::path::PathBuf;
use std::process::ExitCode;

use mppm::ViewerModel;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(dir) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: mppm <project-dir>");
        return ExitCode::FAILURE;
    };

    let mut model = ViewerModel::new();
    match model.set_path(Some(dir.clone())) {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("could not open {:?} as a project directory", dir);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("failed to load project: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let Some(state) = model.state() else {
        return ExitCode::FAILURE;
    };

    println!("project: {:?}", state.path());
    if !state.description().is_empty() {
        println!("description: {}", state.description());
    }
    println!(
        "payloads: {} ({} invalid)",
        state.payloads().len(),
        state.invalid_payload_indexes().len()
    );
    println!(
        "blocks: {} ({} invalid)",
        state.blocks().len(),
        state.invalid_block_indexes().len()
    );
    println!(
        "panels: {} ({} invalid)",
        state.panels().len(),
        state.invalid_panel_indexes().len()
    );
    println!("images: {}", state.images().len());
    for image in state.images() {
        let block = image.block_name();
        let panel = image.panel_name();
        println!(
            "  {} [block: {}] [panel: {}]",
            image.relpath().display(),
            if block.is_empty() { "-" } else { block.as_str() },
            if panel.is_empty() { "-" } else { panel.as_str() },
        );
    }

    if model.is_stale() {
        println!("note: this directory has no project file yet");
    }

    ExitCode::SUCCESS
}
