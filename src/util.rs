use color_eyre::eyre::{Context, Result};
use std::{
    env,
    ffi::{OsStr, OsString},
    fs,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

pub const LOG_ENV: &str = "COG_UNINSTALL_LOG";

pub fn get_log_filter(default: &str) -> String {
    match env::var(LOG_ENV) {
        Ok(val) if !val.trim().is_empty() => val,
        _ => default.to_string(),
    }
}

/// Expands a leading `~` to the home directory, for paths the shell left quoted.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) if rest.as_os_str().is_empty() => home,
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// A cog name has to be exactly one plain path component,
/// otherwise `data/<cog>` could point outside the install root.
pub fn is_valid_cog_name(name: impl AsRef<OsStr>) -> bool {
    let mut components = Path::new(name.as_ref()).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn get_data_path(install_root: &Path, cog_name: &OsStr) -> PathBuf {
    install_root.join("data").join(cog_name)
}

pub fn get_cogs_path(install_root: &Path) -> PathBuf {
    install_root.join("cogs")
}

/// Names directly inside the cog folder, sorted, hidden entries left out.
pub fn list_cog_entries(cog_folder: &Path) -> Result<Vec<OsString>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(cog_folder)
        .wrap_err_with(|| format!("Failed to read cog folder {}", cog_folder.display()))?
    {
        let name = entry?.file_name();
        if name.to_string_lossy().starts_with('.') {
            debug!("Skipping hidden entry {:?}", name);
            continue;
        }
        entries.push(name);
    }
    entries.sort();
    Ok(entries)
}
