use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use folio_client::assets::LoadMode;
use folio_client::cli::{CliArgs, Command, OutputMode};
use folio_client::project_config::FolioConfig;
use folio_client::session::GameSession;
use folio_client::showcase::Showcase;

/// Frames a headless `run` simulates: ten seconds at 60 Hz.
const HEADLESS_RUN_FRAMES: u32 = 600;
const HEADLESS_DT: f32 = 1.0 / 60.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    tracing::info!("folio runtime v{}", env!("CARGO_PKG_VERSION"));

    let (project_root, config) =
        match folio_client::project_config::resolve_project(Path::new(&args.project)) {
            Ok(resolved) => resolved,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };

    match &args.command {
        // folio [run]
        None | Some(Command::Run) => run_walkthrough(&project_root, config, &args.output),

        // folio simulate <script>
        Some(Command::Simulate { script }) => {
            let script_path = project_root.join(script);
            match folio_client::script::run_script_file(&project_root, &config, &script_path) {
                Ok(results) => {
                    let passed = results.iter().filter(|r| r.passed).count();
                    let failed = results.len() - passed;
                    println!("\n{} passed, {} failed.", passed, failed);
                    if failed > 0 {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        // folio showcase [--frames N]
        Some(Command::Showcase { frames }) => run_showcase(&project_root, *frames, &args.output),

        // folio projects
        Some(Command::Projects) => list_projects(&config),

        // folio reset-position
        Some(Command::ResetPosition) => reset_position(&project_root, &config),
    }
}

fn run_walkthrough(project_root: &Path, config: FolioConfig, output: &OutputMode) {
    match output {
        OutputMode::Window => {
            let session = GameSession::windowed(project_root, config);
            match folio_client::engine::run_windowed(session) {
                Ok(session) => tracing::info!(
                    "Session ended after {} frames ({:.1}s played)",
                    session.frame_count,
                    session.elapsed
                ),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        OutputMode::Headless => {
            // Headless sessions walk straight in.
            let mut session = GameSession::headless(project_root, config, true);
            session.wait_for_assets(Duration::from_secs(30));
            session.apply_menu(folio_client::menu::MenuAction::Play);
            folio_client::engine::run_headless(&mut session, HEADLESS_RUN_FRAMES, HEADLESS_DT);
            println!("{}", session.status_line());
            println!("{:?}", session.world_state);
        }
    }
}

fn run_showcase(project_root: &Path, frames: u32, output: &OutputMode) {
    match output {
        OutputMode::Window => {
            let showcase = Showcase::new(project_root, LoadMode::Background);
            if let Err(e) = folio_client::engine::run_windowed(showcase) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        OutputMode::Headless => {
            let mut showcase = Showcase::new(project_root, LoadMode::Inline);
            folio_client::engine::run_headless(&mut showcase, frames, HEADLESS_DT);
            println!("{}", showcase.status_line());
            for line in showcase.summary() {
                println!("  {}", line);
            }
        }
    }
}

fn list_projects(config: &FolioConfig) {
    let catalog = folio_client::projects::ProjectCatalog::new(&config.projects);
    println!("{} targets:", config.targets.len());
    for target in &config.targets {
        let info = catalog.lookup(&target.name);
        let [x, y, z] = target.position;
        println!("  {} at ({}, {}, {})", target.name, x, y, z);
        println!("    {}", info.description);
        println!("    {}", info.link);
    }
}

fn reset_position(project_root: &Path, config: &FolioConfig) {
    let path: PathBuf = project_root.join(&config.save.file);
    let mut store = folio_client::storage::FileStore::open(&path);
    match folio_client::storage::SavedPosition::clear(&mut store) {
        Ok(()) => println!("Saved position cleared ({})", path.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
