use std::fs;

use assert_cmd::Command;
use ebook_test_support::{write_file, SAMPLE_OUTLINE};
use predicates::prelude::*;
use tempfile::TempDir;

fn make_mobi(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("make_mobi").expect("binary");
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_usage_without_both_directories() {
    let temp = TempDir::new().expect("tempdir");

    make_mobi(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("make_mobi usage:"));

    make_mobi(&temp)
        .arg("only-source")
        .assert()
        .success()
        .stdout(predicate::str::contains("make_mobi <source_dir> <output_dir>"));

    assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[test]
fn builds_navigation_and_links_index() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", SAMPLE_OUTLINE);
    write_file(temp.path(), "book/2.html", "<p>one</p>");

    make_mobi(&temp)
        .args(["book", "out"])
        .assert()
        .success()
        .stdout(predicate::eq("success\n"));

    let book = temp.path().join("book");
    assert!(book.join("toc.html").is_file());
    assert!(book.join("toc.ncx").is_file());
    assert!(book.join("cover.jpg").is_file());

    let link = temp.path().join("out/My Book.html");
    assert!(fs::symlink_metadata(&link).is_ok());
    assert!(!temp.path().join("out/My Book.mobi").exists());
}

#[test]
fn quiet_and_no_link_are_honoured() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", SAMPLE_OUTLINE);

    make_mobi(&temp)
        .args(["-q", "--no-link", "book", "out"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(temp.path().join("book/toc.html").is_file());
    assert!(fs::read_dir(temp.path().join("out")).unwrap().next().is_none());
}

#[test]
fn missing_outline_fails_with_message() {
    let temp = TempDir::new().expect("tempdir");
    fs::create_dir(temp.path().join("book")).unwrap();

    make_mobi(&temp)
        .args(["book", "out"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("make_mobi error:"))
        .stderr(predicate::str::contains("toc.md"));

    assert!(!temp.path().join("out").exists());
}

#[test]
fn empty_outline_reports_nothing_to_do() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", "\n\n");

    make_mobi(&temp)
        .args(["book", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do:"))
        .stdout(predicate::str::contains("has no title"));

    assert!(!temp.path().join("book/toc.html").exists());
}

#[test]
fn invalid_config_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", SAMPLE_OUTLINE);
    write_file(
        temp.path(),
        "custom.toml",
        "[outline]\norphan_subsection = \"adopt\"\n",
    );

    make_mobi(&temp)
        .args(["--config", "custom.toml", "book", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("orphan_subsection"));
}

#[test]
fn missing_compiler_fails_packaging() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", SAMPLE_OUTLINE);
    write_file(
        temp.path(),
        ".ebook-maker.toml",
        "[package]\ncompiler = \"ebook-maker-no-such-compiler\"\n",
    );

    make_mobi(&temp)
        .args(["--mobi", "book", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ebook-maker-no-such-compiler"));

    // the staging directory does not outlive the failure
    let leftovers: Vec<_> = fs::read_dir(temp.path().join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[cfg(unix)]
#[test]
fn packages_with_configured_compiler() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "book/toc.md", SAMPLE_OUTLINE);
    write_file(
        temp.path(),
        ".ebook-maker.toml",
        r#"[package]
compiler = "sh"
args = ["-c", "cp \"$1\" \"${1%.opf}.mobi\"", "fake-kindlegen"]
"#,
    );

    make_mobi(&temp)
        .args(["--mobi", "--author", "Ferris", "book", "out"])
        .assert()
        .success()
        .stdout(predicate::eq("success\n"));

    let package = fs::read_to_string(temp.path().join("out/My Book.mobi")).expect("package");
    assert!(package.contains(r#"<dc:creator opf:role="aut">Ferris</dc:creator>"#));
    assert!(temp.path().join("out/My Book.html").exists());
}
