//! Git operations and repository management.

pub mod entity;
pub mod repository;
pub mod status;

pub use entity::{GitCommit, GitDiff, GitEntity};
pub use repository::GitRepository;
pub use status::{FileChange, FileStatus};
