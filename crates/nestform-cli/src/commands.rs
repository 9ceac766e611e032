use super::args::{Cli, Commands, TemplatesCommand};
use super::handlers;
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::{Workspace, resolve_workspace_path};
use nestform_types::RecordId;
use std::path::Path;

pub fn run(cli: Cli) -> Result<()> {
    let data_dir = resolve_workspace_path(cli.data_dir.as_deref())?;
    let format = cli.format;

    let Some(command) = cli.command else {
        show_guidance(&data_dir);
        return Ok(());
    };

    match command {
        Commands::Init => handlers::init::handle(&data_dir, format),
        command => {
            let workspace = Workspace::open(&data_dir)?;
            tracing::debug!(dir = %data_dir.display(), "opened workspace");
            run_in(&workspace, command, format)
        }
    }
}

fn run_in(workspace: &Workspace, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Init => handlers::init::handle(workspace.data_dir(), format),

        Commands::Submit { model, id, body } => {
            let data = handlers::read_body(&body)?;
            handlers::submit::handle(workspace, &model, id.map(RecordId::new), &data, format)
        }

        Commands::Show { model, id, posted } => {
            handlers::show::handle(workspace, &model, id.map(RecordId::new), posted, format)
        }

        Commands::List { model, csv } => handlers::list::handle(workspace, &model, csv, format),

        Commands::Delete { model, id } => {
            handlers::delete::handle(workspace, &model, RecordId::new(id), format)
        }

        Commands::Descriptor { model } => handlers::descriptor::handle(workspace, &model),

        Commands::Request { method, path, body } => {
            let data = handlers::read_body(&body)?;
            handlers::request::handle(workspace, &method, &path, data, format)
        }

        Commands::Templates { command } => match command {
            TemplatesCommand::Generate { output_dir } => {
                handlers::templates::generate(workspace, output_dir.as_deref(), format)
            }
            TemplatesCommand::Bundle { output, watch } => {
                handlers::templates::bundle(workspace, output.as_deref(), watch, format)
            }
        },
    }
}

fn show_guidance(data_dir: &Path) {
    println!("nestform - nested model forms\n");
    if Workspace::open(data_dir).is_err() {
        println!("No workspace at {}.", data_dir.display());
        println!("Run `nestform init` to create one.");
        return;
    }
    println!("Workspace: {}\n", data_dir.display());
    println!("  nestform show block                  render an empty Block form");
    println!("  nestform submit block --form '...'   save a posted tree");
    println!("  nestform list block                  list saved blocks");
    println!("  nestform templates generate          write row templates");
    println!("\nRun `nestform --help` for every command.");
}
