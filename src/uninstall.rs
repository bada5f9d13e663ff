use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
};

use color_eyre::eyre::Result;
use tracing::{debug, info, warn};

use crate::{
    error::{DeleteError, PreconditionError},
    report::{EntryKind, Outcome, Report},
    util,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Options {
    pub dry_run: bool,
    pub keep_data: bool,
}

/// Everything resolved up front for one cog.
#[derive(Debug)]
pub struct Plan {
    pub cog_name: OsString,
    pub cog_folder: PathBuf,
    pub data_path: PathBuf,
    pub cogs_path: PathBuf,
    pub entries: Vec<OsString>,
}

/// Validates the cog folder and install root, in that order, and lists the cog's entries.
pub fn plan(source: &Path, cog_name: impl AsRef<OsStr>, install_root: &Path) -> Result<Plan> {
    let cog_name = cog_name.as_ref();
    if !util::is_valid_cog_name(cog_name) {
        return Err(PreconditionError::InvalidCogName(cog_name.to_os_string()).into());
    }
    let cog_folder = source.join(cog_name);
    if !cog_folder.is_dir() {
        return Err(PreconditionError::CogNotFound(cog_folder).into());
    }
    if !install_root.is_dir() {
        return Err(PreconditionError::InstallRootNotFound(install_root.to_path_buf()).into());
    }
    let entries = util::list_cog_entries(&cog_folder)?;
    debug!("Found {} entries in {}", entries.len(), cog_folder.display());

    Ok(Plan {
        cog_name: cog_name.to_os_string(),
        data_path: util::get_data_path(install_root, cog_name),
        cogs_path: util::get_cogs_path(install_root),
        cog_folder,
        entries,
    })
}

/// Removes the cog's data directory and every installed file named like an entry
/// of the cog folder. Individual failures end up in the report and do not stop the run.
pub fn uninstall(plan: &Plan, options: &Options) -> Report {
    let mut report = Report::new(&plan.cog_name, options.dry_run);

    if options.keep_data {
        info!("Keeping data directory {}", plan.data_path.display());
    } else {
        report.push(remove_data(&plan.data_path, options.dry_run));
    }

    for entry in &plan.entries {
        let target = plan.cogs_path.join(entry);
        report.push(remove_cog_file(&target, options.dry_run));
    }

    report
}

fn inspect(path: &Path) -> io::Result<Option<EntryKind>> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata.file_type().into())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn io_failure(path: &Path, source: io::Error) -> Outcome {
    let err = DeleteError::Io {
        path: path.to_path_buf(),
        source,
    };
    warn!("{}", err);
    err.into()
}

fn remove_data(path: &Path, dry_run: bool) -> Outcome {
    let kind = match inspect(path) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            debug!("No data directory at {}", path.display());
            return Outcome::Missing {
                path: path.to_path_buf(),
            };
        }
        Err(e) => return io_failure(path, e),
    };
    if dry_run {
        return Outcome::Planned {
            path: path.to_path_buf(),
            kind,
        };
    }
    let result = match kind {
        EntryKind::Directory => fs::remove_dir_all(path),
        // a link is removed, never what it points to
        EntryKind::File | EntryKind::Symlink => fs::remove_file(path),
    };
    match result {
        Ok(()) => {
            info!("Removed data {}", path.display());
            Outcome::Removed {
                path: path.to_path_buf(),
                kind,
            }
        }
        Err(e) => io_failure(path, e),
    }
}

fn remove_cog_file(path: &Path, dry_run: bool) -> Outcome {
    let kind = match inspect(path) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            debug!("{} is not installed, skipping", path.display());
            return Outcome::Missing {
                path: path.to_path_buf(),
            };
        }
        Err(e) => return io_failure(path, e),
    };
    if kind == EntryKind::Directory {
        let err = DeleteError::IsDirectory(path.to_path_buf());
        warn!("{}, not removing it", err);
        return err.into();
    }
    if dry_run {
        return Outcome::Planned {
            path: path.to_path_buf(),
            kind,
        };
    }
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed {}", path.display());
            Outcome::Removed {
                path: path.to_path_buf(),
                kind,
            }
        }
        Err(e) => io_failure(path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        root: PathBuf,
    }

    // source/bsdata/{bsdata.py, info.json}
    // root/cogs/{bsdata.py, info.json, other.py}, root/data/bsdata/settings.json
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("repo");
        let root = dir.path().join("bot");
        fs::create_dir_all(source.join("bsdata")).unwrap();
        fs::write(source.join("bsdata/bsdata.py"), "").unwrap();
        fs::write(source.join("bsdata/info.json"), "{}").unwrap();
        fs::create_dir_all(root.join("cogs")).unwrap();
        fs::create_dir_all(root.join("data/bsdata")).unwrap();
        fs::write(root.join("cogs/bsdata.py"), "").unwrap();
        fs::write(root.join("cogs/info.json"), "{}").unwrap();
        fs::write(root.join("cogs/other.py"), "").unwrap();
        fs::write(root.join("data/bsdata/settings.json"), "{}").unwrap();
        Fixture {
            _dir: dir,
            source,
            root,
        }
    }

    fn precondition(err: color_eyre::eyre::Report) -> i32 {
        err.downcast_ref::<PreconditionError>()
            .expect("expected a precondition error")
            .exit_code()
    }

    #[test]
    fn test_plan_checks_cog_folder_first() {
        let f = fixture();
        let err = plan(&f.source, "missing", &f.root.join("nope")).unwrap_err();
        assert_eq!(precondition(err), 2);
    }

    #[test]
    fn test_plan_rejects_escaping_names() {
        let f = fixture();
        for name in ["..", ".", "", "bsdata/../bsdata"] {
            let err = plan(&f.source, name, &f.root).unwrap_err();
            assert_eq!(precondition(err), 2, "name {:?}", name);
        }
    }

    #[test]
    fn test_plan_missing_install_root() {
        let f = fixture();
        let err = plan(&f.source, "bsdata", &f.root.join("nope")).unwrap_err();
        assert_eq!(precondition(err), 3);
    }

    #[test]
    fn test_plan_install_root_is_file() {
        let f = fixture();
        let file = f.root.join("cogs/other.py");
        let err = plan(&f.source, "bsdata", &file).unwrap_err();
        assert_eq!(precondition(err), 3);
    }

    #[test]
    fn test_uninstall_removes_data_and_files() {
        let f = fixture();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(&plan, &Options::default());

        assert!(!f.root.join("data/bsdata").exists());
        assert!(!f.root.join("cogs/bsdata.py").exists());
        assert!(!f.root.join("cogs/info.json").exists());
        assert!(f.root.join("cogs/other.py").exists());
        assert!(f.root.join("data").is_dir());
        assert_eq!(report.removed_count(), 3);
        assert!(!report.has_failures());
        // the cog folder itself is left alone
        assert!(f.source.join("bsdata/bsdata.py").exists());
    }

    #[test]
    fn test_uninstall_twice() {
        let f = fixture();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        uninstall(&plan, &Options::default());
        let report = uninstall(&plan, &Options::default());

        assert!(!report.has_failures());
        assert_eq!(report.removed_count(), 0);
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Missing { .. })));
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let f = fixture();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(
            &plan,
            &Options {
                dry_run: true,
                keep_data: false,
            },
        );

        assert!(f.root.join("data/bsdata/settings.json").exists());
        assert!(f.root.join("cogs/bsdata.py").exists());
        assert_eq!(
            report.outcomes[0],
            Outcome::Planned {
                path: f.root.join("data/bsdata"),
                kind: EntryKind::Directory,
            }
        );
        assert_eq!(report.removed_count(), 3);
    }

    #[test]
    fn test_keep_data() {
        let f = fixture();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(
            &plan,
            &Options {
                dry_run: false,
                keep_data: true,
            },
        );

        assert!(f.root.join("data/bsdata/settings.json").exists());
        assert!(!f.root.join("cogs/bsdata.py").exists());
        assert_eq!(report.removed_count(), 2);
    }

    #[test]
    fn test_directory_target_is_not_removed() {
        let f = fixture();
        fs::create_dir(f.source.join("bsdata/assets")).unwrap();
        fs::create_dir_all(f.root.join("cogs/assets/img")).unwrap();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(&plan, &Options::default());

        assert!(f.root.join("cogs/assets/img").is_dir());
        assert!(!f.root.join("cogs/bsdata.py").exists());
        assert_eq!(report.failed_count(), 1);
        assert!(report.outcomes.contains(&Outcome::Failed {
            path: f.root.join("cogs/assets"),
            reason: "is a directory".to_string(),
        }));
    }

    #[test]
    fn test_missing_cogs_and_data_dirs() {
        let f = fixture();
        fs::remove_dir_all(f.root.join("cogs")).unwrap();
        fs::remove_dir_all(f.root.join("data")).unwrap();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(&plan, &Options::default());

        assert!(!report.has_failures());
        assert!(!f.root.join("cogs").exists());
        assert!(!f.root.join("data").exists());
    }

    #[test]
    fn test_data_file_instead_of_dir() {
        let f = fixture();
        fs::remove_dir_all(f.root.join("data/bsdata")).unwrap();
        fs::write(f.root.join("data/bsdata"), "stale").unwrap();
        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(&plan, &Options::default());

        assert!(!f.root.join("data/bsdata").exists());
        assert!(!report.has_failures());
    }

    #[cfg(unix)]
    #[test]
    fn test_data_symlink_keeps_target() {
        let f = fixture();
        let elsewhere = f.source.parent().unwrap().join("shared");
        fs::create_dir(&elsewhere).unwrap();
        fs::write(elsewhere.join("settings.json"), "{}").unwrap();
        fs::remove_dir_all(f.root.join("data/bsdata")).unwrap();
        std::os::unix::fs::symlink(&elsewhere, f.root.join("data/bsdata")).unwrap();

        let plan = plan(&f.source, "bsdata", &f.root).unwrap();
        let report = uninstall(&plan, &Options::default());

        assert_eq!(
            report.outcomes[0],
            Outcome::Removed {
                path: f.root.join("data/bsdata"),
                kind: EntryKind::Symlink,
            }
        );
        assert!(fs::symlink_metadata(f.root.join("data/bsdata")).is_err());
        assert!(elsewhere.join("settings.json").exists());
    }
}
