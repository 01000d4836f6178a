pub mod account;
pub mod entity;
pub mod id;
pub mod label;
pub mod note;
pub mod project;
pub mod query;
pub mod task;

pub use account::Account;
pub use entity::{DirtyState, Entity, EntityKind, Scope};
pub use id::EntityId;
pub use label::Label;
pub use note::Note;
pub use project::Project;
pub use query::SavedQuery;
pub use task::Task;
