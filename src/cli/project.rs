use anyhow::Result;
use clap::Subcommand;

use crate::storage::{ProjectStore, entities::Project};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(about = "Create a project")]
    Add { name: String },
    #[command(about = "Delete a project. Time logged on it is kept")]
    Rm { name: String },
    #[command(about = "List projects")]
    List {},
}

pub async fn process_project_command(
    command: ProjectCommand,
    store: &impl ProjectStore,
) -> Result<()> {
    let projects = match command {
        ProjectCommand::Add { name } => store.create(Project::new(&name)?).await?,
        ProjectCommand::Rm { name } => store.delete(name.trim()).await?,
        ProjectCommand::List {} => store.list().await?,
    };
    for project in projects {
        println!("{}", project.name);
    }
    Ok(())
}
