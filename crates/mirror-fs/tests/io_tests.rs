use mirror_fs::{NormalizedPath, RobustnessConfig, io};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn config() -> RobustnessConfig {
    RobustnessConfig {
        retry_budget: Duration::from_millis(100),
        initial_interval: Duration::from_millis(1),
        enable_fsync: false,
    }
}

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("a/b/test.txt"));

    io::write_atomic(&path, b"hello world", config()).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_overwrites_and_leaves_no_temp_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.txt");
    fs::write(&file_path, "original").unwrap();

    io::write_atomic(&NormalizedPath::new(&file_path), b"updated", config()).unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}

#[test]
fn test_copy_file_is_byte_exact() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src.bin");
    let dst = temp.path().join("dst.bin");
    let bytes: Vec<u8> = (0..=255).collect();
    fs::write(&src, &bytes).unwrap();

    let copied = io::copy_file(&NormalizedPath::new(&src), &NormalizedPath::new(&dst), config()).unwrap();

    assert_eq!(copied, 256);
    assert_eq!(fs::read(&dst).unwrap(), bytes);
}

#[test]
fn test_create_empty_truncates() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("placeholder.txt");
    fs::write(&file_path, "stale").unwrap();

    io::create_empty(&NormalizedPath::new(&file_path), config()).unwrap();

    assert_eq!(fs::read(&file_path).unwrap(), b"");
}

#[test]
fn test_create_empty_creates_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("x/y/new.txt"));

    io::create_empty(&path, config()).unwrap();

    assert!(path.is_file());
}

#[test]
fn test_remove_path_handles_files_dirs_and_missing() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("f.txt");
    let dir = temp.path().join("d");
    fs::write(&file, "x").unwrap();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/g.txt"), "y").unwrap();

    assert!(io::remove_path(&NormalizedPath::new(&file), config()).unwrap());
    assert!(io::remove_path(&NormalizedPath::new(&dir), config()).unwrap());
    assert!(!io::remove_path(&NormalizedPath::new(&file), config()).unwrap());
    assert!(!file.exists());
    assert!(!dir.exists());
}

#[test]
fn test_read_bytes_or_empty_on_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.txt"));

    assert!(io::read_bytes(&path, config()).unwrap_err().is_not_found());
    assert!(io::read_bytes_or_empty(&path, config()).unwrap().is_empty());
}

#[test]
fn test_path_exists() {
    let temp = TempDir::new().unwrap();
    assert!(io::path_exists(&NormalizedPath::new(temp.path())));
    assert!(!io::path_exists(&NormalizedPath::new(temp.path().join("nope"))));
}
