//! Parameter stores: where curve sets come from and go to

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::curve::CurveSet;
use crate::{de, ser};

/// Get/put collection of curve sets keyed by module
pub trait ParamStore {
    /// Current parameters; `None` if the store exists but holds nothing yet
    fn load(&self) -> Result<Option<CurveSet>>;
    /// Replace the stored parameters with `curves`
    fn store(&mut self, curves: &CurveSet) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    curves: Option<CurveSet>,
}

impl MemoryStore {
    pub fn new(curves: Option<CurveSet>) -> Self {
        MemoryStore { curves }
    }
}

impl ParamStore for MemoryStore {
    fn load(&self) -> Result<Option<CurveSet>> {
        Ok(self.curves.clone())
    }

    fn store(&mut self, curves: &CurveSet) -> Result<()> {
        self.curves = Some(curves.clone());
        Ok(())
    }
}

/// Curve set kept in one `.tcal.zst` file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// The directory holding `path` must already exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.is_dir() {
            bail!("parameter directory {} does not exist", dir.display());
        }
        Ok(FileStore { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParamStore for FileStore {
    fn load(&self) -> Result<Option<CurveSet>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let f = File::open(&self.path).with_context(|| format!("cannot open {}", self.path.display()))?;
        let curves = de::curves(BufReader::new(f))
            .with_context(|| format!("cannot read parameters from {}", self.path.display()))?;
        info!("read {} calibrated modules from {}", curves.len(), self.path.display());
        Ok(Some(curves))
    }

    fn store(&mut self, curves: &CurveSet) -> Result<()> {
        // never leave a file behind that `load` would reject
        curves.validate()?;
        // write next to the target and rename, so readers never see half a file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut wtr = BufWriter::new(File::create(&tmp)?);
            ser::curves(&mut wtr, curves)?;
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        info!("wrote {} calibrated modules to {}", curves.len(), self.path.display());
        Ok(())
    }
}
