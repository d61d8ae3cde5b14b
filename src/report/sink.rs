use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Destination for exported artifacts, addressed by file name.
pub trait Sink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Sink for DirectorySink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating output directory {}", self.root.display()))?;
        let target = self.root.join(name);
        let partial = self.root.join(format!(".{name}.tmp"));
        std::fs::write(&partial, bytes).with_context(|| format!("writing {}", partial.display()))?;
        std::fs::rename(&partial, &target)
            .with_context(|| format!("moving output into {}", target.display()))?;
        log::info!("Wrote {}", target.display());
        Ok(())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub files: BTreeMap<String, Vec<u8>>,
}

impl Sink for MemorySink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_sink_creates_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        sink.write("a.json", b"{}").unwrap();
        sink.write("a.json", b"[1]").unwrap();

        let written = std::fs::read(dir.path().join("out/a.json")).unwrap();
        assert_eq!(written, b"[1]");
        assert!(!dir.path().join("out/.a.json.tmp").exists());
    }
}
