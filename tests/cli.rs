use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn seed_corpus(workspace: &TempDir) {
    let corpus = workspace.path().join("corpus");
    for (domain, files) in [
        ("news", vec!["breaking\n\nweather\n", "weather\n\nsports\n"]),
        ("forum", vec!["hi all\n\n\n\nbye\n"]),
    ] {
        let dir = corpus.join(domain);
        fs::create_dir_all(&dir).expect("create domain dir");
        for (index, content) in files.iter().enumerate() {
            fs::write(dir.join(format!("{index}.txt")), content).expect("write input");
        }
    }
    fs::write(corpus.join("news").join("ignored.json"), "{}").expect("write non-text file");
}

#[test]
fn merge_writes_deduplicated_domain_files() {
    let workspace = temp_workspace();
    seed_corpus(&workspace);

    let mut merge = Command::cargo_bin("corpus-merge").expect("binary exists");
    let output = merge
        .current_dir(workspace.path())
        .args(["--quiet", "merge", "corpus", "-o", "merged", "--no-progress", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("metrics are valid JSON");
    let domains = report["domains"].as_array().expect("domains array");
    assert_eq!(domains.len(), 2);
    assert_eq!(domains[0]["domain"], "forum");
    assert_eq!(domains[1]["domain"], "news");
    assert_eq!(domains[1]["flushes"][0]["sessions_duplicate"], 1);

    let news = fs::read_to_string(workspace.path().join("merged/news/news.0000.txt"))
        .expect("news output");
    assert_eq!(news, "breaking\n\nweather\n\nsports\n\n");
    let forum = fs::read_to_string(workspace.path().join("merged/forum/forum.0000.txt"))
        .expect("forum output");
    assert_eq!(forum, "hi all\n\nbye\n\n");
}

#[test]
fn merge_honours_config_file_and_flag_overrides() {
    let workspace = temp_workspace();
    seed_corpus(&workspace);
    fs::write(
        workspace.path().join("merge.json"),
        r#"{"output_dir": "from_config", "size_limit_bytes": 1}"#,
    )
    .expect("write config");

    let mut merge = Command::cargo_bin("corpus-merge").expect("binary exists");
    merge
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "merge",
            "corpus",
            "--config",
            "merge.json",
            "--no-progress",
        ])
        .assert()
        .success();

    let news_dir = workspace.path().join("from_config/news");
    assert!(news_dir.join("news.0000.txt").exists());
    assert!(news_dir.join("news.0001.txt").exists());
    assert!(news_dir.join("news.0002.txt").exists());
    let second = fs::read_to_string(news_dir.join("news.0001.txt")).expect("second output");
    assert_eq!(second, "sports\n\n");
}

#[test]
fn domains_lists_groups_without_writing() {
    let workspace = temp_workspace();
    seed_corpus(&workspace);

    let mut domains = Command::cargo_bin("corpus-merge").expect("binary exists");
    let output = domains
        .current_dir(workspace.path())
        .args(["--quiet", "domains", "corpus", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let listing: Value = serde_json::from_slice(&output).expect("listing is valid JSON");
    let entries = listing.as_array().expect("listing array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["domain"], "news");
    assert_eq!(entries[1]["files"], 2);
    assert_eq!(entries[1]["planned_outputs"], 1);
    assert!(!workspace.path().join("corpus_merged").exists());
}

#[test]
fn merge_fails_on_top_level_file() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("loose.txt"), "orphan\n").expect("write input");

    let mut merge = Command::cargo_bin("corpus-merge").expect("binary exists");
    merge
        .current_dir(workspace.path())
        .args(["--quiet", "merge", "loose.txt", "--no-progress"])
        .assert()
        .failure();
}

#[test]
fn repeated_merge_in_place_ignores_output_root() {
    let workspace = temp_workspace();
    let dir = workspace.path().join("notes");
    fs::create_dir_all(&dir).expect("create domain dir");
    fs::write(dir.join("a.txt"), "alpha\n\nbeta\n").expect("write input");

    for _ in 0..2 {
        let mut merge = Command::cargo_bin("corpus-merge").expect("binary exists");
        let output = merge
            .current_dir(workspace.path())
            .args(["--quiet", "merge", "--no-progress", "--json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let report: Value = serde_json::from_slice(&output).expect("metrics are valid JSON");
        let domains = report["domains"].as_array().expect("domains array");
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0]["files"], 1);
    }

    let notes = fs::read_to_string(workspace.path().join("corpus_merged/notes/notes.0000.txt"))
        .expect("notes output");
    assert_eq!(notes, "alpha\n\nbeta\n\n");
}
