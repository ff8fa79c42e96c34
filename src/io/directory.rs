use crate::entry::FileEntry;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::trace;

pub fn read_directory(path: &Path, show_hidden: bool) -> Result<Vec<FileEntry>, std::io::Error> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)?.flatten() {
        let Some(file_entry) = FileEntry::from_path(entry.path()) else {
            continue;
        };
        if !show_hidden && file_entry.is_hidden() {
            continue;
        }
        entries.push(file_entry);
    }
    sort_entries(&mut entries);
    Ok(entries)
}

/// Directories first, then case-insensitive by name.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        if a.is_dir != b.is_dir {
            return b.is_dir.cmp(&a.is_dir);
        }
        a.name.to_lowercase().cmp(&b.name.to_lowercase())
    });
}

/// Walk `root` collecting names that fuzzy-match `query`.
///
/// Hidden entries and ignored files are skipped and symlinks are not
/// followed. Stops after `limit` hits or when `cancelled` returns true.
pub fn search_directory(
    root: &Path,
    query: &str,
    limit: usize,
    cancelled: impl Fn() -> bool,
) -> Vec<FileEntry> {
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut hits = Vec::new();
    for entry in walker {
        if cancelled() || hits.len() >= limit {
            break;
        }
        // Unreadable entries are skipped
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                trace!("search skipped an entry: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !fuzzy_match(&name, query) {
            continue;
        }
        if let Some(file_entry) = FileEntry::from_path(entry.into_path()) {
            hits.push(file_entry);
        }
    }
    hits
}

pub fn fuzzy_match(text: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let mut q_chars = query.chars();
    let mut q_char = match q_chars.next() {
        Some(c) => c,
        None => return true,
    };
    for t_char in text.chars() {
        if t_char.eq_ignore_ascii_case(&q_char) {
            q_char = match q_chars.next() {
                Some(c) => c,
                None => return true,
            };
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("projects/invoices")).unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::write(dir.path().join("A.txt"), b"").unwrap();
        fs::write(dir.path().join(".hidden"), b"").unwrap();
        fs::write(dir.path().join("projects/invoices/invoice-03.pdf"), b"").unwrap();
        dir
    }

    #[test]
    fn directories_first_then_names() {
        let dir = tree();
        let names: Vec<String> = read_directory(dir.path(), false)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["projects", "A.txt", "b.txt"]);
        assert_eq!(read_directory(dir.path(), true).unwrap().len(), 4);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_directory(&dir.path().join("gone"), false).is_err());
    }

    #[test]
    fn search_walks_subdirectories() {
        let dir = tree();
        let names: Vec<String> = search_directory(dir.path(), "inv", 10, || false)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["invoices", "invoice-03.pdf"]);
        assert_eq!(search_directory(dir.path(), "inv", 1, || false).len(), 1);
        assert!(search_directory(dir.path(), "inv", 10, || true).is_empty());
    }

    #[test]
    fn search_skips_hidden_directories() {
        let dir = tree();
        fs::create_dir_all(dir.path().join(".cache/invoices-old")).unwrap();
        let hits = search_directory(dir.path(), "invoices", 10, || false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, dir.path().join("projects/invoices"));
    }

    #[test]
    fn fuzzy() {
        assert!(fuzzy_match("invoice-03.pdf", "i03"));
        assert!(fuzzy_match("Projects", "PRJ"));
        assert!(!fuzzy_match("abc", "abd"));
        assert!(fuzzy_match("anything", ""));
    }
}
