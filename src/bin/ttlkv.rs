//! ttlkv CLI
//!
//! Runs one command against a store kept in a text snapshot file.

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use ttlkv::{Compression, Store, VacuumConfig};

/// ttlkv - key/value store with expiring entries
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Text snapshot holding the store
    #[arg(short, long, default_value = "ttlkv.snapshot")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the value of a key
    Get { key: String },
    /// Store a value, optionally expiring after some seconds
    Put {
        key: String,
        value: String,
        /// Seconds until the entry expires
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Delete a key
    Del { key: String },
    /// Exit status tells whether the key is present and valid
    Exists { key: String },
    /// Print the raw entry count, expired entries included
    Len,
    /// Remove expired entries
    Vacuum,
    /// Print the text snapshot
    Dump,
    /// Print the store as JSON
    Json,
    /// Write a binary backup
    Backup {
        path: PathBuf,
        /// Compress with zstd
        #[arg(long)]
        zstd: bool,
    },
    /// Replace the store with a binary backup
    Restore {
        path: PathBuf,
        /// Backup is zstd compressed
        #[arg(long)]
        zstd: bool,
    },
}

fn compression(zstd: bool) -> Compression {
    if zstd {
        Compression::zstd()
    } else {
        Compression::None
    }
}

fn open_store(path: &Path) -> anyhow::Result<Store> {
    // One-shot process, nothing to vacuum in the background
    let store = Store::with_config(VacuumConfig::disabled());
    if path.exists() {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        store
            .load(BufReader::new(file))
            .with_context(|| format!("loading {}", path.display()))?;
    }
    Ok(store)
}

/// Sibling of the snapshot with `.tmp` appended to the full file name
fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write next to the target and rename, so a failed dump keeps the old file
fn save_store(store: &Store, path: &Path) -> anyhow::Result<()> {
    let tmp = tmp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        store.dump(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    info!("snapshot saved to {}", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ttlkv=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let store = open_store(&args.snapshot)?;
    let mut stdout = io::stdout().lock();

    let dirty = match args.command {
        Cmd::Get { key } => {
            let before = store.len();
            match store.get(&key) {
                Some(value) => writeln!(stdout, "{}", value)?,
                None => writeln!(stdout, "(nil)")?,
            }
            // A lazily evicted key changes the snapshot
            store.len() != before
        }
        Cmd::Put { key, value, ttl } => {
            match ttl {
                Some(secs) => {
                    store.put_ttl(key, value, Utc::now() + Duration::seconds(secs.into()))
                }
                None => store.put(key, value),
            }
            true
        }
        Cmd::Del { key } => {
            let removed = store.delete(&key);
            writeln!(stdout, "{}", u8::from(removed))?;
            removed
        }
        Cmd::Exists { key } => {
            let exists = store.exists(&key);
            writeln!(stdout, "{}", exists)?;
            if !exists {
                std::process::exit(1);
            }
            false
        }
        Cmd::Len => {
            writeln!(stdout, "{}", store.len())?;
            false
        }
        Cmd::Vacuum => {
            let removed = store.vacuum();
            writeln!(stdout, "removed {} expired entries", removed)?;
            removed > 0
        }
        Cmd::Dump => {
            store.dump(&mut stdout)?;
            false
        }
        Cmd::Json => {
            store.export_json(&mut stdout)?;
            writeln!(stdout)?;
            false
        }
        Cmd::Backup { path, zstd } => {
            store
                .backup(&path, compression(zstd))
                .with_context(|| format!("backing up to {}", path.display()))?;
            false
        }
        Cmd::Restore { path, zstd } => {
            let count = store
                .restore(&path, compression(zstd))
                .with_context(|| format!("restoring from {}", path.display()))?;
            writeln!(stdout, "restored {} entries", count)?;
            true
        }
    };

    if dirty {
        save_store(&store, &args.snapshot)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_path_keeps_extension() {
        assert_eq!(
            tmp_path(Path::new("ttlkv.snapshot")),
            PathBuf::from("ttlkv.snapshot.tmp")
        );
        assert_eq!(
            tmp_path(Path::new("/var/lib/store")),
            PathBuf::from("/var/lib/store.tmp")
        );
    }

    #[test]
    fn test_save_store_leaves_siblings_alone() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("ttlkv.snapshot");
        let sibling = dir.path().join("ttlkv.tmp");
        fs::write(&sibling, "unrelated").unwrap();

        let store = Store::with_config(VacuumConfig::disabled());
        store.put("k", "v");
        save_store(&store, &snapshot).unwrap();

        assert_eq!(fs::read_to_string(&sibling).unwrap(), "unrelated");
        assert_eq!(fs::read_to_string(&snapshot).unwrap(), "---\nk: [v,]\n");
        assert!(!tmp_path(&snapshot).exists());

        let reopened = open_store(&snapshot).unwrap();
        assert_eq!(reopened.get("k").as_deref(), Some("v"));
    }
}
