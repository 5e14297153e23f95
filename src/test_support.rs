//! Shared fixtures: a throwaway scanner install backed by shell scripts.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::ScannerConfig;
use crate::scanner::Scanner;

/// Mimics `mpclient`: reports the EICAR test signature, nothing else.
const DETECTING_SCRIPT: &str = r#"#!/bin/sh
echo "main(): The map file wasn't found, symbols wont be available"
echo "main(): Scanning $1..."
echo "EngineScanCallback(): Scanning input"
if grep -q "EICAR-STANDARD-ANTIVIRUS-TEST-FILE" "$1"; then
  echo "EngineScanCallback(): Threat Virus:DOS/EICAR_Test_File identified."
fi
"#;

/// The EICAR test string, assembled at runtime.
pub fn eicar() -> String {
    [
        r"X5O!P%@AP[4\PZX54(P^)7CC)7}$",
        "EICAR-STANDARD-ANTIVIRUS-TEST-FILE",
        "!$H+H*",
    ]
    .concat()
}

pub struct StubScanner {
    root: TempDir,
}

impl StubScanner {
    pub fn detecting() -> Self {
        Self::with_script(DETECTING_SCRIPT)
    }

    pub fn with_script(script: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let install = root.path().join("loadlibrary");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::create_dir_all(root.path().join("malware")).unwrap();

        let binary = install.join("mpclient");
        std::fs::write(&binary, script).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        std::fs::write(root.path().join("UPDATED"), "201707071530").unwrap();
        Self { root }
    }

    pub fn install_dir(&self) -> PathBuf {
        self.root.path().join("loadlibrary")
    }

    /// Staging area for samples and uploads.
    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("malware")
    }

    pub fn config(&self) -> ScannerConfig {
        ScannerConfig {
            install_dir: self.install_dir(),
            binary: PathBuf::from("mpclient"),
            marker_file: self.root.path().join("UPDATED"),
            engine: String::new(),
        }
    }

    pub fn scanner(&self) -> Scanner {
        Scanner::new(&self.config())
    }

    pub fn write_sample(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.work_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
