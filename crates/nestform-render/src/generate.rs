use nestform_engine::FormSpec;
use std::fs;
use std::path::{Path, PathBuf};

use crate::html::MarkupRenderer;
use crate::tree::TemplateRenderer;
use crate::{Error, Result};

pub const DEFAULT_EXTENSION: &str = "form";

/// Where generated row templates are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateGenConfig {
    pub output_dir: PathBuf,
    pub extension: String,
}

impl TemplateGenConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn path_for(&self, form_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", form_name, self.extension))
    }
}

/// Writes one `<FormType>.<extension>` file per distinct child form type
/// found below any of `specs`. Returns the written paths in discovery order.
pub fn generate_templates<R: MarkupRenderer>(
    specs: &[FormSpec],
    renderer: &TemplateRenderer<R>,
    config: &TemplateGenConfig,
) -> Result<Vec<PathBuf>> {
    create_dir(&config.output_dir)?;

    let mut written: Vec<PathBuf> = Vec::new();
    for spec in specs {
        for template in renderer.row_templates(spec) {
            let path = config.path_for(&template.form_name);
            if written.contains(&path) {
                continue;
            }
            fs::write(&path, &template.markup).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "wrote row template");
            written.push(path);
        }
    }

    tracing::info!(
        count = written.len(),
        dir = %config.output_dir.display(),
        "generated row templates"
    );
    Ok(written)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })
}
