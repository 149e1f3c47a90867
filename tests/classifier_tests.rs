// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for path classification

use std::fs;
use std::path::PathBuf;
use streamforge::MediaKind;
use streamforge::media::scan_paths;

fn touch(path: &PathBuf) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

#[test]
fn test_directory_expanded_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    for name in ["b.mp4", "a.wav", "notes.txt", "sub/c.webm", "sub/deeper/d.flac"] {
        touch(&root.join(name));
    }

    let result = scan_paths(&[&root]);

    let found: Vec<PathBuf> = result.items.iter().map(|i| i.path().to_path_buf()).collect();
    assert_eq!(
        found,
        vec![
            root.join("a.wav"),
            root.join("b.mp4"),
            root.join("sub/c.webm"),
            root.join("sub/deeper/d.flac"),
        ]
    );
    // Unknown files inside directories are skipped silently
    assert!(result.errors.is_empty());
    assert_eq!(result.count(MediaKind::Video), 2);
    assert_eq!(result.count(MediaKind::Audio), 2);
}

#[test]
fn test_explicit_unsupported_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    touch(&notes);

    let result = scan_paths(&[&notes]);

    assert!(result.items.is_empty());
    assert_eq!(
        result.errors[0].to_string(),
        format!("Unsupported file format: {}", notes.display())
    );
}

#[test]
fn test_mixed_paths_keep_going_after_errors() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.MOV");
    let song = dir.path().join("song.Mp3");
    touch(&clip);
    touch(&song);
    let missing = dir.path().join("missing.mp4");

    let result = scan_paths(&[&missing, &clip, &song]);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].kind(), MediaKind::Video);
    assert_eq!(result.items[1].kind(), MediaKind::Audio);
}

#[test]
fn test_relative_paths_made_absolute() {
    let result = scan_paths(&["definitely/not/here.mp4"]);

    assert_eq!(result.errors.len(), 1);
    let message = result.errors[0].to_string();
    let reported = message.trim_start_matches("File or directory not found: ");
    assert!(PathBuf::from(reported).is_absolute());
}

#[test]
fn test_empty_directory_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let result = scan_paths(&[dir.path()]);
    assert!(result.items.is_empty());
    assert!(result.errors.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    touch(&root.join("clips/a.mp4"));
    // Points back at its own parent, so following it would never end
    std::os::unix::fs::symlink(&root, root.join("clips/loop")).unwrap();

    let result = scan_paths(&[&root]);

    let found: Vec<PathBuf> = result.items.iter().map(|i| i.path().to_path_buf()).collect();
    assert_eq!(found, vec![root.join("clips/a.mp4")]);
    assert!(result.errors.is_empty());
}
