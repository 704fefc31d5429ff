//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Current on-disk layout version, stored under `meta/schema_version`.
pub const SCHEMA_VERSION: u32 = 2;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) tx_results_db: Database<Bytes, Bytes>,
    pub(crate) height_db: Database<Bytes, Bytes>,
    pub(crate) event_db: Database<Bytes, Bytes>,
    pub(crate) sketch_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process per path and the
        // memory map is never modified outside of heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let tx_results_db = env.create_database(&mut wtxn, Some("tx_results"))?;
        let height_db = env.create_database(&mut wtxn, Some("height_index"))?;
        let event_db = env.create_database(&mut wtxn, Some("event_index"))?;
        let sketch_db = env.create_database(&mut wtxn, Some("sketches"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            None => {
                meta_db.put(&mut wtxn, SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_le_bytes())?;
            }
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Corruption("schema_version has unexpected byte length".into())
                })?;
                let found = u32::from_le_bytes(arr);
                if found != SCHEMA_VERSION {
                    return Err(LmdbError::Corruption(format!(
                        "unsupported schema version {} (expected {})",
                        found, SCHEMA_VERSION
                    )));
                }
            }
        }
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, max_dbs, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            tx_results_db,
            height_db,
            event_db,
            sketch_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Begin a write batch covering every database.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, LmdbError> {
        WriteBatch::new(self)
    }

    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) if bytes.len() == 4 => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(bytes);
                Ok(u32::from_le_bytes(arr))
            }
            Some(_) => Err(LmdbError::Corruption(
                "schema_version has unexpected byte length".into(),
            )),
            None => Ok(0),
        }
    }
}
