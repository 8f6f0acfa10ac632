use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;
use xcheck::builder::ImageBuilder;
use xcheck::initializer::initialize;
use xcheck::types::ROOT_INODE;
use xcheck::{check_image, CheckError, Layout};

fn write_image(bytes: &[u8]) -> NamedTempFile {
    let mut tf = NamedTempFile::new().unwrap();
    tf.write_all(bytes).unwrap();
    tf.flush().unwrap();
    tf
}

fn sample_image() -> Vec<u8> {
    let mut b = ImageBuilder::new(Layout::default()).unwrap();
    let f = b.add_file(ROOT_INODE, "ls", &[3; 1500]).unwrap();
    let d = b.add_dir(ROOT_INODE, "bin").unwrap();
    b.link(d, "ls", f).unwrap();
    b.build()
}

#[test]
fn mapped_image_checks_like_the_buffer() {
    let tf = write_image(&sample_image());

    let img = initialize(tf.path()).unwrap();

    assert_eq!(check_image(&img, Layout::default()), Ok(()));
}

#[test]
fn empty_image_file_is_malformed() {
    let tf = write_image(&[]);
    let img = initialize(tf.path()).unwrap();
    assert!(matches!(
        check_image(&img, Layout::default()),
        Err(CheckError::Malformed(_))
    ));
}

#[test]
fn cli_prints_done_for_consistent_image() {
    let tf = write_image(&sample_image());

    let out = Command::new(env!("CARGO_BIN_EXE_xcheck"))
        .arg(tf.path())
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "done\n");
}

#[test]
fn cli_reports_violation_and_fails() {
    let mut b = ImageBuilder::new(Layout::default()).unwrap();
    b.set_bitmap_bit(700, true);
    let tf = write_image(&b.build());

    let out = Command::new(env!("CARGO_BIN_EXE_xcheck"))
        .arg(tf.path())
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "ERROR: bitmap marks block in use but it is not in use.\n"
    );
}

#[test]
fn cli_dumps_requested_inode() {
    let tf = write_image(&sample_image());

    let out = Command::new(env!("CARGO_BIN_EXE_xcheck"))
        .args(&["--show-inode", "2"])
        .arg(tf.path())
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success());
    assert!(stdout.contains("type: file\n"));
    assert!(stdout.contains("nlink: 2\n"));
    assert!(stdout.ends_with("done\n"));
}

#[test]
fn cli_fails_on_missing_image() {
    let dir = tempfile::tempdir().unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_xcheck"))
        .arg(dir.path().join("fs.img"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "image not found\n");
}
