use chrono::{DateTime, Local};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// One row of a directory listing.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub modified: SystemTime,
    pub extension: String,
}

impl FileEntry {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let symlink_meta = fs::symlink_metadata(&path).ok()?;
        let is_symlink = symlink_meta.is_symlink();

        let name = path.file_name()?.to_string_lossy().to_string();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        // Follow symlinks; a dangling link keeps its own metadata
        let metadata = fs::metadata(&path).ok();
        let is_dir = metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .or_else(|| symlink_meta.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        Some(Self {
            path,
            name,
            is_dir,
            is_symlink,
            size,
            modified,
            extension,
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn get_icon(&self) -> &str {
        if self.is_dir {
            return "\u{f07b}";
        }
        match self.extension.as_str() {
            "txt" | "md" => "\u{f15c}",
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" => "\u{f1c5}",
            "mp4" | "mkv" | "mov" | "avi" | "webm" => "\u{f03d}",
            "mp3" | "wav" | "flac" | "ogg" | "m4a" => "\u{f001}",
            "zip" | "tar" | "gz" | "7z" | "rar" | "xz" | "bz2" => "\u{f410}",
            "pdf" => "\u{f1c1}",
            "doc" | "docx" | "odt" => "\u{f1c2}",
            "xls" | "xlsx" | "ods" => "\u{f1c3}",
            "sh" | "bash" | "zsh" => "\u{f489}",
            _ => "\u{f15b}",
        }
    }

    pub fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{} \u{2192}", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Local modification time, as shown in the listing.
    pub fn modified_string(&self) -> String {
        let modified: DateTime<Local> = self.modified.into();
        modified.format("%Y-%m-%d %H:%M").to_string()
    }

    pub fn get_permissions_string(&self) -> String {
        #[cfg(unix)]
        {
            match fs::metadata(&self.path) {
                Ok(metadata) => {
                    let mode = metadata.permissions().mode();
                    let owner = format_perms((mode >> 6) & 0o7);
                    let group = format_perms((mode >> 3) & 0o7);
                    let others = format_perms(mode & 0o7);
                    format!("{}{}{}", owner, group, others)
                }
                Err(_) => "unknown".to_string(),
            }
        }

        #[cfg(not(unix))]
        {
            match fs::metadata(&self.path) {
                Ok(metadata) if metadata.permissions().readonly() => "read-only".to_string(),
                Ok(_) => "read-write".to_string(),
                Err(_) => "unknown".to_string(),
            }
        }
    }
}

#[cfg(unix)]
fn format_perms(mode: u32) -> String {
    let r = if mode & 0o4 != 0 { "r" } else { "-" };
    let w = if mode & 0o2 != 0 { "w" } else { "-" };
    let x = if mode & 0o1 != 0 { "x" } else { "-" };
    format!("{}{}{}", r, w, x)
}
