//! Write a SHA-256 checksum file for every file matching a glob pattern.
//!
//! ```bash
//! CHECKSUM_PATTERN='data/**/*.bin' CHECKSUM_OUTPUT=sums cargo run --example checksum
//! cargo run --example checksum -- -c -e   # resume, retrying failures
//! ```

use anyhow::Context;
use longtask::{exit_code, run_cli, ErrorClass, ProcessError, Task};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

struct ChecksumTask {
    pattern: String,
    output: PathBuf,
}

impl Task for ChecksumTask {
    type Item = PathBuf;
    type Id = String;

    fn name(&self) -> &str {
        "Checksum"
    }

    fn items(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = glob::glob(&self.pattern)
            .with_context(|| format!("Invalid pattern '{}'", self.pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        paths.sort();
        Ok(paths)
    }

    fn item_id(&self, path: &PathBuf) -> String {
        path.to_string_lossy().into_owned()
    }

    fn process_item(&mut self, path: &PathBuf) -> Result<(), ProcessError> {
        let data = fs::read(path)?;
        if data.is_empty() {
            return Err(ProcessError::failed(ErrorClass::Validation, "file is empty"));
        }

        let digest = Sha256::digest(&data);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::create_dir_all(&self.output)?;
        fs::write(
            self.output.join(format!("{}.sha256", file_name)),
            format!("{}  {}\n", hex, path.display()),
        )?;
        Ok(())
    }
}

fn main() {
    let task = ChecksumTask {
        pattern: std::env::var("CHECKSUM_PATTERN").unwrap_or_else(|_| "*.txt".to_string()),
        output: std::env::var("CHECKSUM_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("checksums")),
    };

    if let Err(e) = run_cli(task) {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}
