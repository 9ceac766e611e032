pub mod delete;
pub mod descriptor;
pub mod init;
pub mod list;
pub mod request;
pub mod show;
pub mod submit;
pub mod templates;

use crate::args::BodyArgs;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use nestform_engine::PostedData;
use std::io::Read;

/// Reads the posted body named by `--data` or `--form`; empty when neither is given.
pub fn read_body(args: &BodyArgs) -> Result<PostedData> {
    if let Some(form) = &args.form {
        return Ok(PostedData::from_urlencoded(form));
    }

    let Some(path) = &args.data else {
        return Ok(PostedData::new());
    };

    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read body from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read body from {}", path.display()))?
    };

    Ok(PostedData::parse(&raw)?)
}

pub(crate) fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
