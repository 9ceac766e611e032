use super::print_json;
use crate::types::OutputFormat;
use anyhow::{Result, bail};
use nestform_engine::PostedData;
use nestform_runtime::{Method, Request, Response, Router, Workspace};
use serde_json::json;

pub fn handle(
    workspace: &Workspace,
    method: &str,
    path: &str,
    body: PostedData,
    format: OutputFormat,
) -> Result<()> {
    let method: Method = method.parse()?;
    let request = Request {
        method,
        path: path.to_string(),
        body,
    };
    let response = Router::new(workspace).handle(&request);
    let status = response.status();

    match format {
        OutputFormat::Json => print_json(&match &response {
            Response::Page { status, body } => json!({ "status": status, "body": body }),
            Response::Redirect { location } => json!({ "status": status, "location": location }),
            Response::NotFound => json!({ "status": status }),
            Response::ServerError { message } => json!({ "status": status, "message": message }),
        })?,
        OutputFormat::Plain => match &response {
            Response::Page { body, .. } => println!("{}", body),
            Response::Redirect { location } => println!("{} {}", status, location),
            Response::NotFound => println!("{} Not Found", status),
            Response::ServerError { message } => println!("{} {}", status, message),
        },
    }

    if status >= 400 {
        bail!("{} {} answered {}", method, path, status);
    }
    Ok(())
}
