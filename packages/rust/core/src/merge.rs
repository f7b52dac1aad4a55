//! Merge stage.
//!
//! Reads every chapter file back from the output directory, orders them by
//! the numeric key in their file names, and writes one merged document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use novel_dl_shared::{ChapterFile, NovelDlError, Result};
use novel_dl_text::sanitize;

/// Output from a successful merge.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Path of the merged document.
    pub path: PathBuf,
    /// Number of chapter files merged.
    pub chapter_count: usize,
}

/// Merge all chapter files in `output_dir` into `output_dir/merged_file_name`.
///
/// The merged file itself, non-file entries, dot-prefixed temp files, and
/// `links_file` (when it lives in `output_dir`) are ignored. Files are
/// stable-sorted by [`ChapterFile::ordering_key`], each body is re-sanitized,
/// and bodies are joined with one blank line. Any prior merged document is
/// replaced.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn merge_chapters(
    output_dir: &Path,
    merged_file_name: &str,
    links_file: Option<&Path>,
) -> Result<MergeResult> {
    if merged_file_name.trim().is_empty() {
        return Err(NovelDlError::validation("merged file name is empty"));
    }

    let links_name = links_file.and_then(|path| name_inside(output_dir, path));
    let mut chapters = collect_chapter_files(output_dir, merged_file_name, links_name.as_ref())?;
    chapters.sort_by_key(|c| c.ordering_key);

    info!(chapters = chapters.len(), "merging chapters");

    let mut bodies = Vec::with_capacity(chapters.len());
    for chapter in &chapters {
        let raw = std::fs::read_to_string(&chapter.path)
            .map_err(|e| NovelDlError::io(&chapter.path, e))?;
        let body = sanitize(&raw);
        debug!(file = %chapter.file_name(), key = chapter.ordering_key, "chapter read");
        if !body.is_empty() {
            bodies.push(body);
        }
    }

    let mut merged = bodies.join("\n\n");
    merged.push('\n');

    let path = output_dir.join(merged_file_name);
    write_atomic(output_dir, merged_file_name, &merged)?;

    info!(path = %path.display(), chapter_count = chapters.len(), "merge complete");

    Ok(MergeResult {
        path,
        chapter_count: chapters.len(),
    })
}

/// List mergeable chapter files in enumeration order.
fn collect_chapter_files(
    output_dir: &Path,
    merged_file_name: &str,
    skip: Option<&OsString>,
) -> Result<Vec<ChapterFile>> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| NovelDlError::io(output_dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| NovelDlError::io(output_dir, e))?;
        let os_name = entry.file_name();
        if skip == Some(&os_name) {
            continue;
        }
        let name = os_name.to_string_lossy();
        if name == merged_file_name || name.starts_with('.') {
            continue;
        }
        let file_type = entry
            .file_type()
            .map_err(|e| NovelDlError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        files.push(ChapterFile::from_path(entry.path()));
    }

    Ok(files)
}

/// File name of `path` if its parent directory is `dir`.
fn name_inside(dir: &Path, path: &Path) -> Option<OsString> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let same_dir = std::fs::canonicalize(parent).ok()? == std::fs::canonicalize(dir).ok()?;
    if same_dir {
        path.file_name().map(OsString::from)
    } else {
        None
    }
}

fn write_atomic(dir: &Path, file_name: &str, content: &str) -> Result<()> {
    let target = dir.join(file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));

    if let Err(e) = std::fs::write(&temp, content) {
        let _ = std::fs::remove_file(&temp);
        return Err(NovelDlError::io(&temp, e));
    }
    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(NovelDlError::io(&target, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nd-merge-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn orders_by_numeric_key_not_lexically() {
        let dir = temp_dir();
        write(&dir, "ch_10.txt", "J");
        write(&dir, "ch_1.txt", "A");
        write(&dir, "ch_2.txt", "B");

        let result = merge_chapters(&dir, "merged.txt", None).unwrap();

        assert_eq!(result.chapter_count, 3);
        assert_eq!(result.path, dir.join("merged.txt"));
        assert_eq!(std::fs::read_to_string(&result.path).unwrap(), "A\n\nB\n\nJ\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rerun_is_idempotent() {
        let dir = temp_dir();
        write(&dir, "0001_first.txt", "one\n\ntwo");
        write(&dir, "0002_second.txt", "three");

        merge_chapters(&dir, "merged.txt", None).unwrap();
        let first = std::fs::read_to_string(dir.join("merged.txt")).unwrap();
        let again = merge_chapters(&dir, "merged.txt", None).unwrap();
        let second = std::fs::read_to_string(dir.join("merged.txt")).unwrap();

        assert_eq!(first, second);
        // The prior merged file is not read back as a chapter.
        assert_eq!(again.chapter_count, 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ignores_dotfiles_and_directories() {
        let dir = temp_dir();
        write(&dir, "0001_a.txt", "a");
        write(&dir, ".0002_b.txt.tmp", "partial");
        std::fs::create_dir_all(dir.join("0003_sub")).unwrap();

        let result = merge_chapters(&dir, "merged.txt", None).unwrap();

        assert_eq!(result.chapter_count, 1);
        assert_eq!(std::fs::read_to_string(&result.path).unwrap(), "a\n");
        assert!(!dir.join(".merged.txt.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn gaps_in_positions_keep_order() {
        let dir = temp_dir();
        write(&dir, "0005_e.txt", "five");
        write(&dir, "0001_a.txt", "one");
        write(&dir, "0002_b.txt", "two");

        let result = merge_chapters(&dir, "merged.txt", None).unwrap();
        assert_eq!(
            std::fs::read_to_string(&result.path).unwrap(),
            "one\n\ntwo\n\nfive\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn keyless_files_sort_first() {
        let dir = temp_dir();
        write(&dir, "ch_1.txt", "one");
        write(&dir, "prologue.txt", "pro");

        let result = merge_chapters(&dir, "merged.txt", None).unwrap();
        assert_eq!(std::fs::read_to_string(&result.path).unwrap(), "pro\n\none\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bodies_are_resanitized() {
        let dir = temp_dir();
        write(&dir, "1.txt", "<p>hello</p>   world\n\n\n\nend");

        let result = merge_chapters(&dir, "merged.txt", None).unwrap();
        assert_eq!(
            std::fs::read_to_string(&result.path).unwrap(),
            "hello\nworld\n\nend\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_writes_empty_document() {
        let dir = temp_dir();
        let result = merge_chapters(&dir, "merged.txt", None).unwrap();
        assert_eq!(result.chapter_count, 0);
        assert_eq!(std::fs::read_to_string(&result.path).unwrap(), "\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn link_list_inside_output_dir_is_not_a_chapter() {
        let dir = temp_dir();
        write(&dir, "0001_a.txt", "a");
        write(&dir, "0002_b.txt", "b");
        write(&dir, "links.txt", "https://novels.example.com/1\n");

        let links_file = dir.join("links.txt");
        let result = merge_chapters(&dir, "merged.txt", Some(links_file.as_path())).unwrap();

        assert_eq!(result.chapter_count, 2);
        assert_eq!(std::fs::read_to_string(&result.path).unwrap(), "a\n\nb\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn link_list_elsewhere_does_not_hide_chapters() {
        let dir = temp_dir();
        write(&dir, "links.txt", "kept");
        let other = temp_dir();

        let result =
            merge_chapters(&dir, "merged.txt", Some(other.join("links.txt").as_path())).unwrap();
        assert_eq!(result.chapter_count, 1);

        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_dir_all(&other);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = std::env::temp_dir().join(format!("nd-merge-missing-{}", uuid::Uuid::now_v7()));
        let err = merge_chapters(&dir, "merged.txt", None).unwrap_err();
        assert!(matches!(err, NovelDlError::Io { .. }));
    }
}
