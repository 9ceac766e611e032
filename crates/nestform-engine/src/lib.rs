// Engine module - nested form composition protocol
// Binds posted data into a form tree, reconciles management counters,
// validates bottom-up and saves top-down against a `Store`.

pub mod diagnostics;
pub mod error;
pub mod form;
pub mod formset;
pub mod management;
pub mod naming;
pub mod node;
pub mod posted;
pub mod spec;

pub use diagnostics::{Diagnostics, ReportedError};
pub use error::{Error, PreconditionError, Result};
pub use form::{BoundField, FieldError, FieldForm, RowError, Saved, Tombstone, ValidationResult};
pub use formset::FormsetController;
pub use management::{
    ManagementCounters, ReconciledPlan, ReconciliationMismatch, RowObservation, reconcile,
};
pub use node::{NestedFormNode, NodeKind, NodeState, delete_tree};
pub use posted::PostedData;
pub use spec::{ChildSpec, FormSpec, FormsetOptions};
