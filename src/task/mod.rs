//! @ai:module:intent Task definitions, role bookkeeping and loading
//! @ai:module:layer domain
//! @ai:module:public_api Task, Truth, TaskType, ColRole, RowRole, TaskLoader, generators

pub mod generators;
pub mod loader;
pub mod roles;
#[allow(clippy::module_inception)]
pub mod task;

pub use loader::{TaskLoader, TaskLoaderTrait};
pub use roles::{ColRole, ColRoles, RowRole, RowRoles, TaskType};
pub use task::{Task, Truth};
