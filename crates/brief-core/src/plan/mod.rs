//! Plan document model and `brief.toml` workspace files.

pub mod document;
pub mod workspace;

pub use document::{PlanDocument, PlanField, PlanFieldParseError};
pub use workspace::{
    PlanSection, Workspace, WorkspaceError, load_workspace, parse_workspace, save_workspace,
};
