//! Binary Backup
//!
//! bincode encoding of the sorted entry map, optionally behind a zstd
//! stream. The file wrappers are the only place the store touches the
//! filesystem.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::storage::{Entry, Store};

/// Compression applied to binary backups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Zstd {
        /// zstd level, 0 picks the library default
        level: i32,
    },
}

impl Compression {
    pub fn zstd() -> Self {
        Compression::Zstd { level: 0 }
    }
}

impl Store {
    /// Encode a point-in-time copy of all entries into `writer`
    pub fn export_bin<W: Write>(&self, writer: W, compression: Compression) -> Result<()> {
        let entries: BTreeMap<String, Entry> = self.sorted_entries().into_iter().collect();

        match compression {
            Compression::None => {
                let mut writer = writer;
                bincode::serialize_into(&mut writer, &entries)?;
                writer.flush()?;
            }
            Compression::Zstd { level } => {
                let mut encoder = zstd::Encoder::new(writer, level)?;
                bincode::serialize_into(&mut encoder, &entries)?;
                // The frame is incomplete until finished
                encoder.finish()?.flush()?;
            }
        }
        Ok(())
    }

    /// Replace the store contents with a binary export
    ///
    /// Nothing changes unless the whole stream decodes.
    pub fn import_bin<R: Read>(&self, reader: R, compression: Compression) -> Result<usize> {
        let entries: BTreeMap<String, Entry> = match compression {
            Compression::None => bincode::deserialize_from(reader)?,
            Compression::Zstd { .. } => {
                let decoder = zstd::Decoder::new(reader)?;
                bincode::deserialize_from(decoder)?
            }
        };

        let count = self.replace_entries(entries);
        info!(entries = count, "imported binary snapshot");
        Ok(count)
    }

    /// Write a binary backup to `path` and sync it to disk
    ///
    /// On error the file may exist but must not be trusted.
    pub fn backup<P: AsRef<Path>>(&self, path: P, compression: Compression) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.export_bin(&mut writer, compression)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        info!(path = %path.display(), "backup written");
        Ok(())
    }

    /// Load a binary backup from `path`
    pub fn restore<P: AsRef<Path>>(&self, path: P, compression: Compression) -> Result<usize> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        self.import_bin(reader, compression)
    }
}
