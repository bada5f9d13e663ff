use std::{ffi::OsString, path::PathBuf};

use thiserror::Error;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_INCOMPLETE: i32 = 4;

/// Checks that must pass before anything is deleted.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("{0:?} is not a valid cog name")]
    InvalidCogName(OsString),
    #[error("cog folder {} not found", .0.display())]
    CogNotFound(PathBuf),
    #[error("install root {} not found", .0.display())]
    InstallRootNotFound(PathBuf),
}

impl PreconditionError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PreconditionError::InvalidCogName(_) | PreconditionError::CogNotFound(_) => 2,
            PreconditionError::InstallRootNotFound(_) => 3,
        }
    }
}

/// A single removal that did not go through. These are collected, not propagated.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),
    #[error("failed to remove {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeleteError {
    pub fn path(&self) -> &PathBuf {
        match self {
            DeleteError::IsDirectory(path) => path,
            DeleteError::Io { path, .. } => path,
        }
    }
}
