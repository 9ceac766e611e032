pub mod error;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Error, Result};
pub use schema::{EntityModel, FieldKind, FieldSpec, ParentLink, Schema};
pub use store::Store;
pub use value::{FieldValue, Fields, Instance, RecordId};
