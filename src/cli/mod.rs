pub mod project;
pub mod report;
pub mod timer;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use project::{ProjectCommand, process_project_command};
use report::{ReportCommand, process_report_command};
use timer::{show_status, start_project, stop_project};

use crate::{
    storage::file_store::{LogFileStore, ProjectFileStore},
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "tmt", version, long_about = None)]
#[command(about = "Track time spent on your projects", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Log everything, also to stderr")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Manage projects")]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    #[command(about = "Start tracking a project. Stops the project currently tracked")]
    Start { project: String },
    #[command(about = "Stop tracking the current project")]
    Stop {},
    #[command(about = "Show the project currently tracked")]
    Status {
        #[arg(short, long, help = "Keep updating elapsed time every second until Ctrl-C")]
        watch: bool,
    },
    #[command(about = "Show time spent per project over a range")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    enable_logging(&app_dir, args.log)?;

    let projects = ProjectFileStore::new(&app_dir)?;
    let logs = LogFileStore::new(&app_dir)?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    match args.commands {
        Commands::Project { command } => process_project_command(command, &projects).await,
        Commands::Start { project } => start_project(&project, &projects, &logs, clock).await,
        Commands::Stop {} => stop_project(&logs, clock).await,
        Commands::Status { watch } => show_status(watch, &logs, clock).await,
        Commands::Report { command } => {
            process_report_command(command, &projects, &logs, clock.as_ref()).await
        }
    }
}
