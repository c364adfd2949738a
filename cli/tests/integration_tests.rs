use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;

fn d1_migrate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_d1-migrate"))
        .args(args)
        .output()
        .expect("failed to run d1-migrate")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Writes two migrations into `<dir>/migrations` and returns its path.
fn write_migrations(dir: &TempDir) -> String {
    let migrations = dir.path().join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(
        migrations.join("1_users.sql"),
        "-- +migrate Up\nCREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\n\n-- +migrate Down\nDROP TABLE users;\n",
    )
    .unwrap();
    fs::write(
        migrations.join("2_seed.sql"),
        "-- +migrate Up notransaction\nINSERT INTO users (name) VALUES ('ada');\nINSERT INTO users (name) VALUES ('grace');\n\n-- +migrate Down\nDELETE FROM users;\n",
    )
    .unwrap();
    migrations.to_string_lossy().into_owned()
}

fn ledger(db: &Path, table: &str) -> Vec<String> {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT id FROM {table} ORDER BY rowid"))
        .unwrap();
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    ids
}

// ---------------------------------------------------------------------------
// new
// ---------------------------------------------------------------------------

#[test]
fn new_creates_timestamped_template() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("migrations");
    let output = d1_migrate(&["new", "add_users", "--dir", target.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let entries: Vec<_> = fs::read_dir(&target).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries.len(), 1);
    let name = entries[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("-add_users.sql"), "unexpected name {name}");
    assert_eq!(name.len(), "YYYYMMDDHHMMSS-add_users.sql".len());

    let contents = fs::read_to_string(&entries[0]).unwrap();
    assert!(contents.contains("-- +migrate Up"));
    assert!(contents.contains("-- +migrate Down"));
}

#[test]
fn new_rejects_bad_name() {
    let dir = TempDir::new().unwrap();
    let output = d1_migrate(&["new", "bad name", "--dir", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid migration name"));
}

// ---------------------------------------------------------------------------
// up / down / status / plan
// ---------------------------------------------------------------------------

#[test]
fn up_status_down_round_trip() {
    let dir = TempDir::new().unwrap();
    let migrations = write_migrations(&dir);
    let db = dir.path().join("app.sqlite");
    let db_arg = db.to_str().unwrap();

    let output = d1_migrate(&["up", "--db", db_arg, "--dir", &migrations]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Applied 2 migration(s)."));
    assert_eq!(ledger(&db, "d1_migrations"), ["1_users.sql", "2_seed.sql"]);

    let output = d1_migrate(&["up", "--db", db_arg, "--dir", &migrations]);
    assert!(stdout(&output).contains("Applied 0 migration(s)."));

    let output = d1_migrate(&["status", "--db", db_arg, "--dir", &migrations]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1_users.sql"));
    assert!(text.contains("2 applied, 0 pending."));

    let output = d1_migrate(&["down", "--db", db_arg, "--dir", &migrations, "--max", "1"]);
    assert!(stdout(&output).contains("Reverted 1 migration(s)."));
    assert_eq!(ledger(&db, "d1_migrations"), ["1_users.sql"]);

    let output = d1_migrate(&["status", "--db", db_arg, "--dir", &migrations]);
    assert!(stdout(&output).contains("1 applied, 1 pending."));
}

#[test]
fn plan_does_not_execute() {
    let dir = TempDir::new().unwrap();
    let migrations = write_migrations(&dir);
    let db = dir.path().join("app.sqlite");
    let db_arg = db.to_str().unwrap();

    let output = d1_migrate(&["plan", "--db", db_arg, "--dir", &migrations]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("up 1_users.sql (1 statement(s))"));
    assert!(text.contains("up 2_seed.sql (2 statement(s), notransaction)"));
    assert!(ledger(&db, "d1_migrations").is_empty());

    let output = d1_migrate(&["plan", "--db", db_arg, "--dir", &migrations, "--direction", "down"]);
    assert!(stdout(&output).contains("Nothing to down."));
}

#[test]
fn config_file_sets_table_and_dir() {
    let dir = TempDir::new().unwrap();
    let migrations = write_migrations(&dir);
    let config = dir.path().join("migrate.yaml");
    fs::write(&config, format!("table: history\ndir: {migrations}\nmax: 1\n")).unwrap();
    let db = dir.path().join("app.sqlite");

    let output = d1_migrate(&[
        "up",
        "--db",
        db.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Applied 1 migration(s)."));
    assert_eq!(ledger(&db, "history"), ["1_users.sql"]);
}

#[test]
fn failing_migration_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let migrations = write_migrations(&dir);
    fs::write(
        Path::new(&migrations).join("3_broken.sql"),
        "-- +migrate Up\nCREATE TABLE (;\n",
    )
    .unwrap();
    let db = dir.path().join("app.sqlite");

    let output = d1_migrate(&["up", "--db", db.to_str().unwrap(), "--dir", &migrations]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("Applied 2 migration(s) before failing."));
    assert!(stderr(&output).contains("failed to apply migration 3_broken.sql (up)"));
    assert_eq!(ledger(&db, "d1_migrations"), ["1_users.sql", "2_seed.sql"]);
}

#[test]
fn invalid_table_name_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let migrations = write_migrations(&dir);
    let db = dir.path().join("app.sqlite");
    let output = d1_migrate(&[
        "up",
        "--db",
        db.to_str().unwrap(),
        "--dir",
        &migrations,
        "--table",
        "drop-me",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid table name 'drop-me'"));
}
