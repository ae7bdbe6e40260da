use freedesktop_desktop_entry::DesktopEntry;
use std::path::PathBuf;
use std::process::Command;
use walkdir::WalkDir;

use shellbridge_core::{AppDescriptor, AppEntry, BridgeError, BridgeResult, LaunchOutcome};

use crate::traits::AppRegistry;

/// [`AppRegistry`] backed by XDG desktop entries.
///
/// Every query rescans, so the result always reflects the current state of
/// the application directories.
pub struct DesktopAppRegistry {
    dirs_to_scan: Vec<PathBuf>,
}

impl DesktopAppRegistry {
    pub fn new(extra_dirs: &[PathBuf]) -> Self {
        let mut dirs_to_scan: Vec<PathBuf> = vec![
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
        ];

        if let Some(data_home) = dirs::data_local_dir() {
            dirs_to_scan.push(data_home.join("applications"));
        }

        if let Some(home) = dirs::home_dir() {
            dirs_to_scan.push(home.join(".local/share/flatpak/exports/share/applications"));
        }

        dirs_to_scan.push(PathBuf::from("/var/lib/snapd/desktop/applications"));

        dirs_to_scan.extend(extra_dirs.iter().cloned());

        Self { dirs_to_scan }
    }

    /// Fresh scan of all configured directories
    fn scan(&self) -> BridgeResult<Vec<AppEntry>> {
        let mut entries = Vec::new();

        for dir in &self.dirs_to_scan {
            if dir.exists() {
                Self::scan_directory(dir, &mut entries)?;
            }
        }

        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        Ok(entries)
    }

    fn scan_directory(dir: &PathBuf, entries: &mut Vec<AppEntry>) -> BridgeResult<()> {
        for entry in WalkDir::new(dir).max_depth(2) {
            let entry = match entry {
                Ok(entry) => entry,
                // An unreadable root is a real query failure; unreadable
                // children (dangling symlinks etc.) are skipped.
                Err(e) if e.depth() == 0 => {
                    return Err(BridgeError::OperationFailed(format!(
                        "Failed to read {}: {}",
                        dir.display(),
                        e
                    )));
                }
                Err(_) => continue,
            };

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "desktop") {
                if let Some(app_entry) = Self::parse_desktop_file(path.to_path_buf()) {
                    if !entries.iter().any(|e| e.id == app_entry.id) {
                        entries.push(app_entry);
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_desktop_file(path: PathBuf) -> Option<AppEntry> {
        let content = std::fs::read_to_string(&path).ok()?;
        let entry = DesktopEntry::from_str(&path, &content, Some(&["en"])).ok()?;

        if entry.no_display() || entry.hidden() {
            return None;
        }

        let locales: &[&str] = &[];
        let name = entry.name(locales)?.to_string();
        let exec = entry.exec()?.to_string();
        let id = path.file_stem()?.to_string_lossy().to_string();
        let icon = entry.icon().map(|s| s.to_string());
        let description = entry.comment(locales).map(|s| s.to_string());

        Some(AppEntry {
            id,
            name,
            exec,
            icon,
            description,
        })
    }

    /// Remove desktop-entry field codes like %f, %u, %F, %U
    fn strip_field_codes(exec: &str) -> String {
        exec.replace("%f", "")
            .replace("%F", "")
            .replace("%u", "")
            .replace("%U", "")
            .replace("%i", "")
            .replace("%c", "")
            .replace("%k", "")
    }

    fn spawn(app: &AppEntry) -> LaunchOutcome {
        let exec = Self::strip_field_codes(&app.exec);

        let parts: Vec<&str> = exec.split_whitespace().collect();
        if parts.is_empty() {
            return LaunchOutcome::Failed {
                reason: format!("Empty exec command for {}", app.name),
            };
        }

        let program = parts[0];
        let args = &parts[1..];

        match Command::new(program).args(args).spawn() {
            Ok(_) => LaunchOutcome::Launched,
            Err(e) => LaunchOutcome::Failed {
                reason: format!("Failed to launch {}: {}", app.name, e),
            },
        }
    }
}

impl AppRegistry for DesktopAppRegistry {
    fn list_apps(&self) -> BridgeResult<Vec<AppDescriptor>> {
        Ok(self.scan()?.iter().map(AppEntry::descriptor).collect())
    }

    fn launch(&self, id: &str) -> BridgeResult<LaunchOutcome> {
        let entries = self.scan()?;
        match entries.iter().find(|e| e.id == id) {
            Some(app) => Ok(Self::spawn(app)),
            None => Ok(LaunchOutcome::NotFound),
        }
    }
}
