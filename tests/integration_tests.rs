use backtidy::cli::{Cli, load_config, render_json, run_cli};
/// Integration tests for backtidy
///
/// These tests build realistic backup directories on disk and run the full
/// discovery, categorization and archival pipeline against them.
///
/// Test categories:
/// 1. Thinning and archive layout
/// 2. Re-running over an organized archive
/// 3. Quarantine and dry-run modes
/// 4. Configuration files and the CLI entry point
/// 5. Error scenarios
use backtidy::{Config, InputDir, Operation, OrganizeError, PatternSyntax, RunOptions, organize};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary backup directory with helpers to populate and inspect it.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file whose modification time is `modified` (local time).
    fn create_file(&self, rel_path: &str, modified: NaiveDateTime) {
        let path = self.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let file = File::create(&path).expect("Failed to create file");
        let local = Local
            .from_local_datetime(&modified)
            .earliest()
            .expect("Local time should exist");
        file.set_modified(local.into())
            .expect("Failed to set modification time");
    }

    /// Create a file dated in its name, modified early on that same day.
    fn create_backup(&self, name: &str, day: NaiveDate) {
        self.create_file(name, day.and_hms_opt(1, 30, 0).unwrap());
    }

    fn input_dir(&self, patterns: &[&str]) -> InputDir {
        InputDir::new(self.path(), patterns.iter().map(|p| p.to_string()).collect())
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// All files under the fixture, relative to it, sorted.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), &mut files);
        let mut relative: Vec<PathBuf> = files
            .into_iter()
            .map(|p| p.strip_prefix(self.path()).unwrap().to_path_buf())
            .collect();
        relative.sort();
        relative
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The instant every test run measures ages from.
fn now() -> NaiveDateTime {
    date(2024, 6, 15).and_hms_opt(12, 0, 0).unwrap()
}

fn config_for(dirs: Vec<InputDir>) -> Config {
    Config {
        input_dirs: dirs,
        ..Config::default()
    }
}

fn populate_nightly_dumps(fixture: &TestFixture) {
    fixture.create_backup("db-2024-06-15.sql", date(2024, 6, 15));
    fixture.create_backup("db-2024-06-14.sql", date(2024, 6, 14));
    fixture.create_file(
        "db-2024-06-10.sql",
        date(2024, 6, 10).and_hms_opt(1, 0, 0).unwrap(),
    );
    fixture.create_file(
        "db-2024-06-10.retry.sql",
        date(2024, 6, 10).and_hms_opt(3, 0, 0).unwrap(),
    );
    fixture.create_backup("db-2024-05-20.sql", date(2024, 5, 20));
    fixture.create_backup("db-2023-11-02.sql", date(2023, 11, 2));
    fixture.create_backup("db-2023-11-28.sql", date(2023, 11, 28));
    fixture.create_backup("db-2021-03-05.sql", date(2021, 3, 5));
    fixture.create_backup("db-2021-03-18.sql", date(2021, 3, 18));
    fixture.create_backup("notes.txt", date(2021, 1, 1));
}

// ============================================================================
// Test Suite 1: Thinning and Layout
// ============================================================================

#[test]
fn test_nightly_dumps_are_thinned_into_buckets() {
    let fixture = TestFixture::new();
    populate_nightly_dumps(&fixture);

    let config = config_for(vec![fixture.input_dir(&[r"^db-.*\.sql$"])]);
    let report = organize(&config, now(), RunOptions::default()).expect("Run should succeed");

    let expected: Vec<PathBuf> = [
        "archive/2021/db-2021-03-18.sql",
        "archive/2023/db-2023-11-28.sql",
        "archive/last-month/db-2024-05-20.sql",
        "archive/last-month/db-2024-06-10.retry.sql",
        "archive/recent/db-2024-06-14.sql",
        "archive/recent/db-2024-06-15.sql",
        "notes.txt",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(fixture.list_files_recursive(), expected);

    let totals = &report.directories[0].totals;
    assert_eq!(totals.matched, 9);
    assert_eq!(totals.garbage, 3);
    assert_eq!(totals.recent, 2);
    assert_eq!(totals.last_month, 2);
    assert_eq!(totals.years_total(), 2);
}

#[test]
fn test_later_day_in_month_survives() {
    let fixture = TestFixture::new();
    fixture.create_backup("dump-2021-03-05.sql", date(2021, 3, 5));
    fixture.create_backup("dump-2021-03-18.sql", date(2021, 3, 18));

    let config = config_for(vec![fixture.input_dir(&[r"\.sql$"])]);
    organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/2021/dump-2021-03-18.sql");
    fixture.assert_file_not_exists("archive/2021/dump-2021-03-05.sql");
    fixture.assert_file_not_exists("dump-2021-03-05.sql");
}

#[test]
fn test_unparsable_name_date_falls_back_to_modification_time() {
    let fixture = TestFixture::new();
    fixture.create_file(
        "dump-2021-13-40.sql",
        date(2022, 8, 9).and_hms_opt(4, 0, 0).unwrap(),
    );

    let config = config_for(vec![fixture.input_dir(&[r"\.sql$"])]);
    organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/2022/dump-2021-13-40.sql");
}

#[test]
fn test_pattern_groups_do_not_compete() {
    let fixture = TestFixture::new();
    fixture.create_backup("pg-2021-03-05.sql", date(2021, 3, 5));
    fixture.create_backup("redis-2021-03-05.rdb", date(2021, 3, 5));

    let config = config_for(vec![fixture.input_dir(&["^pg-", "^redis-"])]);
    let report = organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/2021/pg-2021-03-05.sql");
    fixture.assert_file_exists("archive/2021/redis-2021-03-05.rdb");
    assert_eq!(report.directories[0].groups.len(), 2);
    assert_eq!(report.directories[0].totals.garbage, 0);
}

#[test]
fn test_files_in_subdirectories_are_collected() {
    let fixture = TestFixture::new();
    fixture.create_backup("hosts/a/db-2024-06-01.sql", date(2024, 6, 1));

    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);
    organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/last-month/db-2024-06-01.sql");
    fixture.assert_file_not_exists("hosts/a/db-2024-06-01.sql");
}

#[test]
fn test_glob_patterns() {
    let fixture = TestFixture::new();
    fixture.create_backup("dump-2024-06-15.rdb", date(2024, 6, 15));
    fixture.create_backup("dump-2024-06-15.rdb.part", date(2024, 6, 15));

    let mut dir = fixture.input_dir(&["dump-*.rdb"]);
    dir.pattern_syntax = PatternSyntax::Glob;
    organize(&config_for(vec![dir]), now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/recent/dump-2024-06-15.rdb");
    fixture.assert_file_exists("dump-2024-06-15.rdb.part");
}

#[test]
fn test_custom_output_dir() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2024-06-15.sql", date(2024, 6, 15));

    let config = Config {
        output_dir: "old-dumps".to_string(),
        ..config_for(vec![fixture.input_dir(&[r"^db-"])])
    };
    organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("old-dumps/recent/db-2024-06-15.sql");
}

// ============================================================================
// Test Suite 2: Re-running
// ============================================================================

#[test]
fn test_second_run_moves_nothing() {
    let fixture = TestFixture::new();
    populate_nightly_dumps(&fixture);
    let config = config_for(vec![fixture.input_dir(&[r"^db-.*\.sql$"])]);

    organize(&config, now(), RunOptions::default()).unwrap();
    let after_first = fixture.list_files_recursive();

    let report = organize(&config, now(), RunOptions::default()).unwrap();
    assert!(
        report.directories[0].operations.is_empty(),
        "Unexpected operations: {:?}",
        report.directories[0].operations
    );
    assert_eq!(fixture.list_files_recursive(), after_first);
}

#[test]
fn test_aging_moves_files_between_buckets() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2024-06-14.sql", date(2024, 6, 14));
    fixture.create_backup("db-2024-06-13.sql", date(2024, 6, 13));
    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);

    organize(&config, now(), RunOptions::default()).unwrap();
    fixture.assert_file_exists("archive/recent/db-2024-06-14.sql");
    fixture.assert_file_exists("archive/last-month/db-2024-06-13.sql");

    let two_months_later = date(2024, 8, 20).and_hms_opt(12, 0, 0).unwrap();
    organize(&config, two_months_later, RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/2024/db-2024-06-14.sql");
    fixture.assert_file_not_exists("archive/recent/db-2024-06-14.sql");
    fixture.assert_file_not_exists("archive/last-month/db-2024-06-13.sql");
    fixture.assert_file_not_exists("archive/2024/db-2024-06-13.sql");
}

// ============================================================================
// Test Suite 3: Quarantine and Dry Run
// ============================================================================

#[test]
fn test_quarantine_keeps_garbage_on_disk() {
    let fixture = TestFixture::new();
    populate_nightly_dumps(&fixture);

    let mut dir = fixture.input_dir(&[r"^db-.*\.sql$"]);
    dir.quarantine_garbage = true;
    organize(&config_for(vec![dir]), now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("archive/delete-me/db-2024-06-10.sql");
    fixture.assert_file_exists("archive/delete-me/db-2023-11-02.sql");
    fixture.assert_file_exists("archive/delete-me/db-2021-03-05.sql");
    fixture.assert_file_exists("archive/last-month/db-2024-06-10.retry.sql");
}

#[test]
fn test_quarantined_files_are_reconsidered_on_next_run() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2021-03-05.sql", date(2021, 3, 5));
    fixture.create_backup("db-2021-03-18.sql", date(2021, 3, 18));

    let mut dir = fixture.input_dir(&[r"^db-"]);
    dir.quarantine_garbage = true;
    let config = config_for(vec![dir]);

    organize(&config, now(), RunOptions::default()).unwrap();
    let report = organize(&config, now(), RunOptions::default()).unwrap();

    assert!(report.directories[0].operations.is_empty());
    fixture.assert_file_exists("archive/delete-me/db-2021-03-05.sql");
}

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    populate_nightly_dumps(&fixture);
    let before = fixture.list_files_recursive();

    let config = config_for(vec![fixture.input_dir(&[r"^db-.*\.sql$"])]);
    let options = RunOptions {
        dry_run: true,
        show_progress: false,
    };
    let report = organize(&config, now(), options).unwrap();

    assert_eq!(fixture.list_files_recursive(), before);
    let operations = &report.directories[0].operations;
    let deletes = operations
        .iter()
        .filter(|op| matches!(op, Operation::Delete { .. }))
        .count();
    let moves = operations
        .iter()
        .filter(|op| matches!(op, Operation::Move { .. }))
        .count();
    assert_eq!(deletes, 3);
    assert_eq!(moves, 6);
}

// ============================================================================
// Test Suite 4: Configuration and CLI
// ============================================================================

#[test]
fn test_config_file_drives_run() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2021-03-05.sql", date(2021, 3, 5));
    fixture.create_backup("db-2021-03-18.sql", date(2021, 3, 18));

    let config_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_dir.path().join("backtidy.toml");
    let toml = format!(
        "output_dir = \"kept\"\n\n[[input_dirs]]\npath = '{}'\npatterns = ['^db-']\nquarantine_garbage = true\n",
        fixture.path().display()
    );
    fs::write(&config_path, toml).unwrap();

    let cli = Cli {
        config: Some(config_path),
        ..Cli::default()
    };
    let config = load_config(&cli).expect("Config should load");
    organize(&config, now(), RunOptions::default()).unwrap();

    fixture.assert_file_exists("kept/2021/db-2021-03-18.sql");
    fixture.assert_file_exists("kept/delete-me/db-2021-03-05.sql");
}

#[test]
fn test_cli_overrides_config_file() {
    let fixture = TestFixture::new();
    let config_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_dir.path().join("backtidy.toml");
    let toml = format!(
        "[[input_dirs]]\npath = '{}'\npatterns = ['^db-']\n",
        fixture.path().display()
    );
    fs::write(&config_path, toml).unwrap();

    let cli = Cli {
        config: Some(config_path),
        output_dir: Some("elsewhere".to_string()),
        quarantine: true,
        ..Cli::default()
    };
    let config = load_config(&cli).unwrap();
    assert_eq!(config.output_dir, "elsewhere");
    assert!(config.input_dirs[0].quarantine_garbage);
}

#[test]
fn test_output_dir_must_stay_inside_input_dir() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2021-03-18.sql", date(2021, 3, 18));
    let outside = TempDir::new().expect("Failed to create temp directory");
    let config_path = fixture.path().join("backtidy.toml");
    let toml = format!(
        "[[input_dirs]]\npath = '{}'\npatterns = ['^db-']\n",
        fixture.path().display()
    );
    fs::write(&config_path, toml).unwrap();

    let absolute = outside.path().join("arch").display().to_string();
    for output_dir in [absolute, "..".to_string(), "../arch".to_string()] {
        let cli = Cli {
            config: Some(config_path.clone()),
            output_dir: Some(output_dir.clone()),
            ..Cli::default()
        };
        assert!(
            matches!(
                load_config(&cli),
                Err(backtidy::ConfigError::OutputDirEscapesInput(ref dir)) if *dir == output_dir
            ),
            "{output_dir} should be rejected"
        );
    }

    fs::write(
        &config_path,
        format!(
            "output_dir = '{}'\n\n[[input_dirs]]\npath = '{}'\npatterns = ['^db-']\n",
            outside.path().join("arch").display(),
            fixture.path().display()
        ),
    )
    .unwrap();
    let cli = Cli {
        config: Some(config_path),
        ..Cli::default()
    };
    assert!(matches!(
        load_config(&cli),
        Err(backtidy::ConfigError::OutputDirEscapesInput(_))
    ));

    assert!(!outside.path().join("arch").exists());
    fixture.assert_file_exists("db-2021-03-18.sql");
}

#[test]
fn test_config_with_missing_directory_is_rejected() {
    let config_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_dir.path().join("backtidy.toml");
    let missing = config_dir.path().join("no-such-dir");
    let toml = format!(
        "[[input_dirs]]\npath = '{}'\npatterns = ['x']\n",
        missing.display()
    );
    fs::write(&config_path, toml).unwrap();

    let cli = Cli {
        config: Some(config_path),
        ..Cli::default()
    };
    assert!(matches!(
        load_config(&cli),
        Err(backtidy::ConfigError::MissingDirectory(p)) if p == missing
    ));
}

#[test]
fn test_config_without_patterns_is_rejected() {
    let fixture = TestFixture::new();
    let config_path = fixture.path().join("backtidy.toml");
    let toml = format!("[[input_dirs]]\npath = '{}'\n", fixture.path().display());
    fs::write(&config_path, toml).unwrap();

    let cli = Cli {
        config: Some(config_path),
        ..Cli::default()
    };
    assert!(matches!(
        load_config(&cli),
        Err(backtidy::ConfigError::IncompleteInputDir { index: 0 })
    ));
}

#[test]
fn test_run_cli_uses_current_time() {
    let fixture = TestFixture::new();
    let today = Local::now().date_naive();
    let name = format!("db-{}.sql", today.format("%Y-%m-%d"));
    fixture.create_backup(&name, today);

    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);
    let cli = Cli {
        json: true,
        ..Cli::default()
    };
    let report = run_cli(&cli, &config).expect("Run should succeed");

    assert_eq!(report.directories[0].totals.recent, 1);
    fixture.assert_file_exists(&format!("archive/recent/{}", name));

    let json = render_json(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["directories"][0]["totals"]["recent"], 1);
    assert_eq!(value["directories"][0]["groups"][0]["pattern"], "^db-");
    assert_eq!(value["dry_run"], false);
}

// ============================================================================
// Test Suite 5: Error Scenarios
// ============================================================================

#[test]
fn test_archive_path_occupied_by_file_fails_run() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2021-03-05.sql", date(2021, 3, 5));
    fs::write(fixture.path().join("archive"), "in the way").unwrap();

    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);
    let result = organize(&config, now(), RunOptions::default());

    assert!(matches!(result, Err(OrganizeError::Archive { .. })));
    fixture.assert_file_exists("db-2021-03-05.sql");
}

#[test]
fn test_same_name_from_two_hosts_fails_run_before_changes() {
    let fixture = TestFixture::new();
    fixture.create_file(
        "host-a/db-latest.sql",
        date(2021, 3, 18).and_hms_opt(2, 0, 0).unwrap(),
    );
    fixture.create_file(
        "host-b/db-latest.sql",
        date(2021, 5, 2).and_hms_opt(2, 0, 0).unwrap(),
    );
    let before = fixture.list_files_recursive();

    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);
    let result = organize(&config, now(), RunOptions::default());

    assert!(matches!(
        result,
        Err(OrganizeError::Archive {
            source: backtidy::ArchiveError::DestinationTaken { .. },
            ..
        })
    ));
    assert_eq!(fixture.list_files_recursive(), before);
    fixture.assert_file_not_exists("archive");
}

#[test]
fn test_invalid_pattern_fails_run_before_changes() {
    let fixture = TestFixture::new();
    fixture.create_backup("db-2021-03-05.sql", date(2021, 3, 5));

    let config = config_for(vec![fixture.input_dir(&[r"^db-", "[unclosed"])]);
    let result = organize(&config, now(), RunOptions::default());

    assert!(matches!(result, Err(OrganizeError::Discovery { .. })));
    fixture.assert_file_exists("db-2021-03-05.sql");
    fixture.assert_file_not_exists("archive");
}

#[test]
fn test_empty_directory_creates_bucket_skeleton() {
    let fixture = TestFixture::new();

    let config = config_for(vec![fixture.input_dir(&[r"^db-"])]);
    let report = organize(&config, now(), RunOptions::default()).unwrap();

    assert_eq!(report.directories[0].totals.matched, 0);
    assert!(fixture.path().join("archive/recent").is_dir());
    assert!(fixture.path().join("archive/last-month").is_dir());
    assert!(fixture.list_files_recursive().is_empty());
}
