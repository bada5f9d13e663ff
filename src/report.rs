use ansi_term::Color;
use color_eyre::eyre::Result;
use serde::{Serialize, Serializer};
use std::{
    ffi::OsStr,
    fs::FileType,
    path::{Path, PathBuf},
};

use crate::error::DeleteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

// Paths are not always UTF-8, and the report is printed after deletion already happened.
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Removed {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        kind: EntryKind,
    },
    /// What a dry run would have removed
    Planned {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        kind: EntryKind,
    },
    Missing {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
    },
    Failed {
        #[serde(serialize_with = "lossy_path")]
        path: PathBuf,
        reason: String,
    },
}

impl From<DeleteError> for Outcome {
    fn from(err: DeleteError) -> Self {
        let path = err.path().clone();
        let reason = match err {
            DeleteError::IsDirectory(_) => "is a directory".to_string(),
            DeleteError::Io { source, .. } => source.to_string(),
        };
        Outcome::Failed { path, reason }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub cog: String,
    pub dry_run: bool,
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn new(cog: impl AsRef<OsStr>, dry_run: bool) -> Self {
        Report {
            cog: cog.as_ref().to_string_lossy().into_owned(),
            dry_run,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn removed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Removed { .. } | Outcome::Planned { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Failed { .. }))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn print_summary(&self) {
        for outcome in &self.outcomes {
            match outcome {
                Outcome::Removed { path, .. } => {
                    println!("{} {}", Color::Green.paint("removed"), path.display())
                }
                Outcome::Planned { path, .. } => {
                    println!("{} {}", Color::Yellow.paint("would remove"), path.display())
                }
                Outcome::Failed { path, reason } => println!(
                    "{} {} ({})",
                    Color::Red.paint("failed"),
                    path.display(),
                    reason
                ),
                // nothing to say about files that were never installed
                Outcome::Missing { .. } => {}
            }
        }
        let verb = if self.dry_run { "would be removed" } else { "removed" };
        println!(
            "{}: {} {}, {} failed",
            self.cog,
            self.removed_count(),
            verb,
            self.failed_count()
        );
    }
}
