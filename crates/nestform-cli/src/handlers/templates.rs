use super::print_json;
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::{Workspace, watch_bundle, write_bundle};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn generate(workspace: &Workspace, output_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let written = workspace.generate_templates(output_dir)?;

    match format {
        OutputFormat::Json => print_json(&written),
        OutputFormat::Plain => {
            for path in &written {
                println!("{}", path.display());
            }
            println!("Wrote {} template(s)", written.len());
            Ok(())
        }
    }
}

pub fn bundle(
    workspace: &Workspace,
    output: Option<&Path>,
    watch: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = workspace.config();
    let data_dir = workspace.data_dir();
    let dir = config.templates_dir(data_dir);
    let extension = config.templates.extension.as_str();
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.bundle_path(data_dir));

    if !watch {
        let count = write_bundle(&dir, extension, &output)?;
        return match format {
            OutputFormat::Json => print_json(&json!({ "output": output, "templates": count })),
            OutputFormat::Plain => {
                println!("Bundled {} template(s) into {}", count, output.display());
                Ok(())
            }
        };
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))?;

    println!("Watching {} (Ctrl-C to stop)", dir.display());
    watch_bundle(&dir, extension, &output, &stop, |result| match result {
        Ok(count) => println!("Bundled {} template(s) into {}", count, output.display()),
        Err(err) => tracing::error!(error = %err, "bundle rebuild failed"),
    })?;
    Ok(())
}
