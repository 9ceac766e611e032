pub mod bundle;
pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod workspace;

pub use bundle::{TemplateBundle, build_bundle, watch_bundle, write_bundle};
pub use config::{Config, resolve_workspace_path};
pub use error::{Error, Result};
pub use http::{Method, Request, Response, Router, action_path, edit_path};
pub use registry::FormRegistry;
pub use workspace::{InitReport, SubmitOutcome, Workspace};
