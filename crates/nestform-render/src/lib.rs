// Render module - markup for nested form trees
// Field markup goes through a MarkupRenderer; the tree renderer adds
// containers, management blocks, row templates and the client descriptor.

pub mod descriptor;
pub mod error;
pub mod generate;
pub mod html;
pub mod tree;

pub use descriptor::{ChildDescriptor, ClientDescriptor};
pub use error::{Error, Result};
pub use generate::{TemplateGenConfig, generate_templates};
pub use html::{HtmlRenderer, MarkupRenderer, escape};
pub use tree::{DESCRIPTOR_ELEMENT_ID, RowTemplate, TemplateRenderer};
