use anyhow::Result;
use nestform_render::ClientDescriptor;
use nestform_runtime::Workspace;

/// Always JSON: the descriptor is meant to be fed to the client script.
pub fn handle(workspace: &Workspace, model: &str) -> Result<()> {
    let spec = workspace.spec(model)?;
    println!("{}", ClientDescriptor::from_spec(spec).to_json()?);
    Ok(())
}
