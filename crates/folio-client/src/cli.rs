use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "folio - first-person portfolio walkthrough")]
pub struct CliArgs {
    /// Subcommand (run, simulate, showcase, projects, reset-position)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the project root directory (searched upwards for folio.yaml)
    #[arg(long, default_value = ".", global = true)]
    pub project: String,

    /// Output mode: window or headless
    #[arg(long, default_value = "window", global = true)]
    pub output: OutputMode,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the portfolio world (default)
    Run,
    /// Drive the game headlessly from a YAML input script
    Simulate {
        /// Script path, relative to the project root
        script: String,
    },
    /// Run the rotating-shapes showcase
    Showcase {
        /// Frames to simulate in headless mode
        #[arg(long, default_value_t = 600)]
        frames: u32,
    },
    /// List the targets and the projects they unlock
    Projects,
    /// Delete the saved player position
    ResetPosition,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputMode {
    Window,
    Headless,
}
