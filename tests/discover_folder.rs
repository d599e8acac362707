use std::path::Path;

use mediastack::{MediaKind, StackError, discover};

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"").unwrap();
}

fn names(dir: &Path) -> Vec<String> {
    discover(dir)
        .unwrap()
        .into_iter()
        .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn empty_folder_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(discover(dir.path()).unwrap().is_empty());
}

#[test]
fn mixed_folder_keeps_only_media() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "video.mp4");
    touch(dir.path(), "image.png");
    touch(dir.path(), "document.txt");

    let found = discover(dir.path()).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].kind, MediaKind::Image);
    assert!(found[0].path.ends_with("image.png"));
    assert_eq!(found[1].kind, MediaKind::Video);
    assert!(found[1].path.ends_with("video.mp4"));
}

#[test]
fn sorted_by_file_name() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "z_video.mp4");
    touch(dir.path(), "a_image.png");
    touch(dir.path(), "m_video.avi");

    assert_eq!(
        names(dir.path()),
        vec!["a_image.png", "m_video.avi", "z_video.mp4"]
    );
}

#[test]
fn ordering_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "B.PNG");
    touch(dir.path(), "a.mp4");
    touch(dir.path(), "C.jpg");

    assert_eq!(names(dir.path()), vec!["a.mp4", "B.PNG", "C.jpg"]);
}

#[test]
fn subdirectories_are_skipped_even_with_media_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();
    touch(dir.path().join("nested.mp4").as_path(), "inner.png");
    touch(dir.path(), "top.png");

    assert_eq!(names(dir.path()), vec!["top.png"]);
}

#[test]
fn discovery_is_idempotent_and_renames_reorder() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "b_clip.mov");
    touch(dir.path(), "c_photo.webp");

    let first = discover(dir.path()).unwrap();
    let second = discover(dir.path()).unwrap();
    assert_eq!(first, second);

    std::fs::rename(dir.path().join("c_photo.webp"), dir.path().join("a_photo.webp")).unwrap();
    assert_eq!(names(dir.path()), vec!["a_photo.webp", "b_clip.mov"]);
}

#[test]
fn file_path_is_not_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "clip.mp4");
    let err = discover(&dir.path().join("clip.mp4")).unwrap_err();
    assert!(matches!(err, StackError::NotADirectory(_)));
}
