//! Per-sigma table of factorial-like normalizing constants.
//!
//! Level 0 holds the descending integers `size, size-1, …, 1`; every parent
//! is the product of its two children, so the root equals `size!`. The
//! table depends only on `sigma`, never on message data, which is why it is
//! computed once and cached across blocks, runs and processes.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use num_bigint::BigUint;
use tracing::{debug, info};

use crate::error::Result;

/// File name suffix for cached tables.
const DELTA_FILE_SUFFIX: &str = ".delta";

/// Segment tree of big-integer constants for one block size.
///
/// Indexed by `(level, position)` with level 0 at the leaves; level `l`
/// holds `size >> l` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaTable {
    sigma: u32,
    levels: Vec<Vec<BigUint>>,
}

impl DeltaTable {
    /// Computes the table bottom-up for the given `sigma`.
    pub fn eval(sigma: u32) -> Self {
        let size = 1usize << sigma;
        let mut levels = Vec::with_capacity(sigma as usize + 1);
        levels.push(
            (0..size)
                .map(|i| BigUint::from(size - i))
                .collect::<Vec<_>>(),
        );
        for level in 1..=sigma as usize {
            let below = &levels[level - 1];
            let cols = size >> level;
            let mut row = Vec::with_capacity(cols);
            for j in 0..cols {
                row.push(&below[2 * j] * &below[2 * j + 1]);
            }
            levels.push(row);
        }
        DeltaTable { sigma, levels }
    }

    /// Returns the table for `sigma`, loading it from `cache` when present
    /// and computing-then-storing it otherwise.
    pub fn get(sigma: u32, cache: &dyn DeltaCache) -> Result<Self> {
        if let Some(table) = cache.load(sigma)? {
            debug!(sigma, "delta table loaded from cache");
            return Ok(table);
        }
        let table = Self::eval(sigma);
        cache.store(&table)?;
        info!(sigma, "delta table computed and cached");
        Ok(table)
    }

    /// Block size exponent this table was built for.
    pub fn sigma(&self) -> u32 {
        self.sigma
    }

    /// The root constant, `size!`.
    pub fn root(&self) -> &BigUint {
        &self.levels[self.sigma as usize][0]
    }

    /// Constant at `(level, position)`.
    pub(crate) fn at(&self, level: usize, position: usize) -> &BigUint {
        &self.levels[level][position]
    }

    /// Dumps the table level-major, position-minor; each integer as a
    /// 32-bit big-endian byte-length prefix followed by its big-endian
    /// magnitude bytes.
    fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        for row in &self.levels {
            for value in row {
                let bytes = value.to_bytes_be();
                out.write_all(&(bytes.len() as u32).to_be_bytes())?;
                out.write_all(&bytes)?;
            }
        }
        Ok(())
    }

    /// Exact inverse of [`write_to`](Self::write_to); the record count is
    /// implied by `sigma`.
    fn read_from(sigma: u32, input: &mut impl Read) -> std::io::Result<Self> {
        let size = 1usize << sigma;
        let mut levels = Vec::with_capacity(sigma as usize + 1);
        for level in 0..=sigma as usize {
            let cols = size >> level;
            let mut row = Vec::with_capacity(cols);
            for _ in 0..cols {
                let mut len_bytes = [0u8; 4];
                input.read_exact(&mut len_bytes)?;
                let mut bytes = vec![0u8; u32::from_be_bytes(len_bytes) as usize];
                input.read_exact(&mut bytes)?;
                row.push(BigUint::from_bytes_be(&bytes));
            }
            levels.push(row);
        }
        Ok(DeltaTable { sigma, levels })
    }
}

/// Source of cached delta tables.
///
/// Table content depends only on `sigma`, so any provider that returns what
/// was stored is correct; tests substitute [`MemoryDeltaCache`].
pub trait DeltaCache {
    /// Returns the cached table for `sigma`, or `None` when absent.
    fn load(&self, sigma: u32) -> Result<Option<DeltaTable>>;

    /// Persists the table for later [`load`](Self::load) calls.
    fn store(&self, table: &DeltaTable) -> Result<()>;
}

/// File-backed cache: one `<sigma>.delta` file per block size in `dir`.
///
/// An existing file is trusted as-is (no checksum); an absent one is
/// rebuilt and stored by [`DeltaTable::get`].
pub struct FileDeltaCache {
    dir: PathBuf,
}

impl FileDeltaCache {
    /// Creates a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileDeltaCache { dir: dir.into() }
    }

    fn path_for(&self, sigma: u32) -> PathBuf {
        self.dir.join(format!("{sigma}{DELTA_FILE_SUFFIX}"))
    }
}

impl DeltaCache for FileDeltaCache {
    fn load(&self, sigma: u32) -> Result<Option<DeltaTable>> {
        let path = self.path_for(sigma);
        if !path.exists() {
            return Ok(None);
        }
        let mut file = fs::File::open(&path)?;
        Ok(Some(DeltaTable::read_from(sigma, &mut file)?))
    }

    fn store(&self, table: &DeltaTable) -> Result<()> {
        let mut file = fs::File::create(self.path_for(table.sigma()))?;
        table.write_to(&mut file)?;
        Ok(())
    }
}

/// In-memory cache for tests.
///
/// Stores the same serialized form as [`FileDeltaCache`], so the record
/// codec is exercised either way.
#[derive(Default)]
pub struct MemoryDeltaCache {
    entries: Mutex<HashMap<u32, Vec<u8>>>,
}

impl MemoryDeltaCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeltaCache for MemoryDeltaCache {
    fn load(&self, sigma: u32) -> Result<Option<DeltaTable>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&sigma) {
            Some(bytes) => Ok(Some(DeltaTable::read_from(sigma, &mut bytes.as_slice())?)),
            None => Ok(None),
        }
    }

    fn store(&self, table: &DeltaTable) -> Result<()> {
        let mut bytes = Vec::new();
        table.write_to(&mut bytes)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table.sigma(), bytes);
        Ok(())
    }
}
