use super::{print_json, stdout_is_terminal};
use crate::types::OutputFormat;
use anyhow::{Result, bail};
use nestform_engine::PostedData;
use nestform_runtime::{SubmitOutcome, Workspace};
use nestform_types::RecordId;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn handle(
    workspace: &Workspace,
    model: &str,
    id: Option<RecordId>,
    data: &PostedData,
    format: OutputFormat,
) -> Result<()> {
    match workspace.submit(model, id, data)? {
        SubmitOutcome::Saved {
            instance,
            diagnostics,
        } => {
            for mismatch in &diagnostics.reconciliation_mismatches {
                tracing::warn!(
                    prefix = %mismatch.prefix,
                    posted_total = mismatch.posted_total,
                    corrected_total = mismatch.corrected_total,
                    "management counters disagreed with posted rows"
                );
            }

            match format {
                OutputFormat::Json => print_json(&json!({
                    "status": "saved",
                    "instance": instance,
                    "diagnostics": diagnostics,
                })),
                OutputFormat::Plain => {
                    let id = instance.id.map(|id| id.to_string()).unwrap_or_default();
                    if stdout_is_terminal() {
                        println!("{} {} #{}", "Saved".green().bold(), instance.model, id);
                    } else {
                        println!("Saved {} #{}", instance.model, id);
                    }
                    if !diagnostics.is_clean() {
                        println!(
                            "  corrected {} stale management counter set(s)",
                            diagnostics.mismatch_count()
                        );
                    }
                    Ok(())
                }
            }
        }

        SubmitOutcome::Invalid { errors, .. } => {
            match format {
                OutputFormat::Json => print_json(&json!({
                    "status": "invalid",
                    "errors": errors,
                }))?,
                OutputFormat::Plain => {
                    for error in &errors {
                        let name = if error.name.is_empty() {
                            "(form)"
                        } else {
                            error.name.as_str()
                        };
                        if stdout_is_terminal() {
                            println!("{}: {}", name.yellow(), error.message);
                        } else {
                            println!("{}: {}", name, error.message);
                        }
                    }
                }
            }
            bail!("{} submission is invalid ({} errors)", model, errors.len())
        }
    }
}
