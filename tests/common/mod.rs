#![allow(dead_code)]

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use finpulse::value::Row;
use tempfile::{TempDir, tempdir};

/// The three rows used throughout the end-to-end checks.
pub const SALES_CSV: &str = "\
id,revenue,cost,department,created_at
A-1,100,40,Sales,2024-01-05
A-2,200,50,Sales,2024-02-10
A-3,50,60,Marketing,2024-01-20
";

pub fn sales_rows() -> Vec<Row> {
    vec![
        sale("A-1", 100.0, 40.0, "Sales", "2024-01-05"),
        sale("A-2", 200.0, 50.0, "Sales", "2024-02-10"),
        sale("A-3", 50.0, 60.0, "Marketing", "2024-01-20"),
    ]
}

pub fn sale(id: &str, revenue: f64, cost: f64, department: &str, created_at: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("revenue", revenue)
        .with("cost", cost)
        .with("department", department)
        .with("created_at", created_at)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Appends `contents` to an existing file under the workspace.
    pub fn append(&self, name: &str, contents: &str) {
        let path = self.temp_dir.path().join(name);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .expect("open temp file for append");
        file.write_all(contents.as_bytes())
            .expect("append temp file contents");
        file.flush().expect("flush temp file");
    }

    pub fn path_str(&self) -> &str {
        self.path().to_str().expect("utf-8 temp path")
    }
}
