use nestform_engine::{Diagnostics, FormSpec, NestedFormNode, PostedData, ReportedError, delete_tree};
use nestform_index::Database;
use nestform_render::{HtmlRenderer, TemplateRenderer, generate_templates};
use nestform_types::{Instance, RecordId, Store};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::registry::FormRegistry;
use crate::{Error, Result};

/// What `init` did
#[derive(Debug, Clone)]
pub struct InitReport {
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub database_path: PathBuf,
    pub created_config: bool,
}

/// Result of binding and saving one submitted tree
#[derive(Debug)]
pub enum SubmitOutcome {
    Saved {
        instance: Instance,
        diagnostics: Diagnostics,
    },
    /// Validation failed; the bound tree is kept for re-rendering.
    Invalid {
        node: Box<NestedFormNode>,
        errors: Vec<ReportedError>,
    },
}

/// An opened data directory: config, record store and form registry.
pub struct Workspace {
    data_dir: PathBuf,
    config: Config,
    db: Database,
    registry: FormRegistry,
    renderer: TemplateRenderer<HtmlRenderer>,
}

impl Workspace {
    /// Writes the default config when absent and creates the database.
    pub fn init(data_dir: &Path) -> Result<InitReport> {
        std::fs::create_dir_all(data_dir)?;

        let config_path = Config::path_in(data_dir);
        let created_config = !config_path.exists();
        let config = if created_config {
            let config = Config::default();
            config.save_to(&config_path)?;
            config
        } else {
            Config::load_from(&config_path)?
        };

        let database_path = config.database_path(data_dir);
        Database::open(&database_path)?;

        tracing::info!(dir = %data_dir.display(), created_config, "initialized workspace");
        Ok(InitReport {
            data_dir: data_dir.to_path_buf(),
            config_path,
            database_path,
            created_config,
        })
    }

    pub fn open(data_dir: &Path) -> Result<Self> {
        let config_path = Config::path_in(data_dir);
        if !config_path.exists() {
            return Err(Error::NotInitialized(format!(
                "{} not found; run `nestform init` first",
                config_path.display()
            )));
        }

        let config = Config::load_from(&config_path)?;
        let db = Database::open(&config.database_path(data_dir))?;
        Self::with_parts(data_dir.to_path_buf(), config, db)
    }

    /// Workspace over an in-memory database, for tests and dry runs.
    pub fn in_memory(config: Config) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Self::with_parts(PathBuf::from("."), config, db)
    }

    fn with_parts(data_dir: PathBuf, config: Config, db: Database) -> Result<Self> {
        let registry = FormRegistry::demo(config.forms.options())?;
        Ok(Self {
            data_dir,
            config,
            db,
            registry,
            renderer: TemplateRenderer::new(HtmlRenderer),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &FormRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn Store {
        &self.db
    }

    pub fn renderer(&self) -> &TemplateRenderer<HtmlRenderer> {
        &self.renderer
    }

    pub fn spec(&self, model: &str) -> Result<&FormSpec> {
        self.registry.get(model)
    }

    /// The persisted instance, or a fresh one when `id` is `None`.
    pub fn load(&self, model: &str, id: Option<RecordId>) -> Result<Instance> {
        let spec = self.spec(model)?;
        match id {
            None => Ok(Instance::new(&spec.model)),
            Some(id) => self.db.get(&spec.model, id)?.ok_or_else(|| {
                nestform_types::Error::NotFound {
                    model: spec.model.name.clone(),
                    id,
                }
                .into()
            }),
        }
    }

    /// Unbound tree for display.
    pub fn display(&self, model: &str, id: Option<RecordId>) -> Result<NestedFormNode> {
        let spec = self.spec(model)?;
        let instance = self.load(model, id)?;
        Ok(NestedFormNode::new(spec, instance, "", &self.db)?)
    }

    /// Binds, validates and saves a submitted tree.
    pub fn submit(&self, model: &str, id: Option<RecordId>, data: &PostedData) -> Result<SubmitOutcome> {
        let spec = self.spec(model)?;
        let instance = self.load(model, id)?;
        let mut node = NestedFormNode::bind(spec, instance, data, "", &self.db)?;

        if !node.is_valid() {
            let errors = node.reported_errors();
            tracing::debug!(model, errors = errors.len(), "submission invalid");
            return Ok(SubmitOutcome::Invalid {
                node: Box::new(node),
                errors,
            });
        }

        let saved = if self.config.save.atomic {
            node.save_atomic(&self.db)?
        } else {
            node.save(&self.db, true, true)?
        };

        let instance = saved.instance().cloned().ok_or_else(|| {
            Error::InvalidOperation(format!("{} save produced no instance", spec.form_name()))
        })?;
        tracing::info!(model, id = ?instance.id, "saved tree");

        Ok(SubmitOutcome::Saved {
            instance,
            diagnostics: node.diagnostics(),
        })
    }

    pub fn list(&self, model: &str) -> Result<Vec<Instance>> {
        let spec = self.spec(model)?;
        Ok(self.db.list(&spec.model)?)
    }

    /// Deletes a record and its descendants. Returns the number removed.
    pub fn delete(&self, model: &str, id: RecordId) -> Result<usize> {
        let spec = self.spec(model)?;
        self.load(model, Some(id))?;

        if !self.config.save.atomic {
            return Ok(delete_tree(spec, id, &self.db)?);
        }

        self.db.begin()?;
        match delete_tree(spec, id, &self.db) {
            Ok(removed) => {
                self.db.commit()?;
                Ok(removed)
            }
            Err(err) => {
                if let Err(rollback) = self.db.rollback() {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    /// A complete form page for `node`, posting to `action`.
    pub fn render_page(&self, node: &NestedFormNode, action: &str) -> Result<String> {
        Ok(self.renderer.render_page(node, action)?)
    }

    /// Writes one row template file per child form type.
    pub fn generate_templates(&self, output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut config = self.config.template_gen_config(&self.data_dir);
        if let Some(dir) = output_dir {
            config.output_dir = dir.to_path_buf();
        }

        let specs: Vec<FormSpec> = self.registry.specs().cloned().collect();
        Ok(generate_templates(&specs, &self.renderer, &config)?)
    }
}
