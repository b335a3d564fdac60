//! Scheduling: which programmes are on air, which come next, and which make the cut

pub mod index;
pub mod selector;
pub mod window;

pub use index::ProgrammeIndex;
pub use selector::{EntryRoles, EventSelector};
pub use window::{Window, WindowClassifier};
