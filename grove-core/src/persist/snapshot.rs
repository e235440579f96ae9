//! Index directory layout: `property.json` plus a checksummed bincode
//! snapshot.
//!
//! The snapshot is `[bincode payload][b"GRV1"][CRC32 of payload, BE]`. Both
//! files are written to a temporary sibling and renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accuracy::AccuracyTable;
use crate::error::{IndexError, Result};
use crate::graph::GraphImage;
use crate::object::ObjectsImage;
use crate::property::Property;
use crate::tree::VpTree;

pub(crate) const PROPERTY_FILE: &str = "property.json";
pub(crate) const SNAPSHOT_FILE: &str = "snapshot.bin";
const SNAPSHOT_MAGIC: &[u8; 4] = b"GRV1";
const FOOTER_LEN: usize = 8;
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PropertyDocument {
    format_version: u32,
    property: Property,
}

/// Everything persisted for an index.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub(crate) property: Property,
    pub(crate) objects: ObjectsImage,
    pub(crate) graph: GraphImage,
    pub(crate) tree: VpTree,
    pub(crate) accuracy: AccuracyTable,
}

pub(crate) fn exists(dir: &Path) -> bool {
    dir.join(PROPERTY_FILE).exists()
}

pub(crate) fn write(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    fs::create_dir_all(dir).map_err(|error| IndexError::io(dir, error))?;

    let property_path = dir.join(PROPERTY_FILE);
    let document = PropertyDocument {
        format_version: FORMAT_VERSION,
        property: snapshot.property,
    };
    let json = serde_json::to_vec_pretty(&document)
        .map_err(|error| IndexError::io(&property_path, io::Error::other(error)))?;
    write_atomic(&property_path, &json)?;

    let snapshot_path = dir.join(SNAPSHOT_FILE);
    let payload = bincode::serialize(snapshot)
        .map_err(|error| IndexError::io(&snapshot_path, io::Error::other(error)))?;
    let crc = crc32fast::hash(&payload);
    let mut output = Vec::with_capacity(payload.len() + FOOTER_LEN);
    output.extend_from_slice(&payload);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());
    write_atomic(&snapshot_path, &output)?;

    debug!(
        path = %snapshot_path.display(),
        bytes = payload.len(),
        crc = format_args!("{crc:#010x}"),
        "wrote index snapshot"
    );
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temporary = temporary_path(path);
    fs::write(&temporary, bytes).map_err(|error| IndexError::io(&temporary, error))?;
    fs::rename(&temporary, path).map_err(|error| IndexError::io(path, error))
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn read_property(dir: &Path) -> Result<Property> {
    let path = dir.join(PROPERTY_FILE);
    let raw = fs::read(&path).map_err(|error| IndexError::io(&path, error))?;
    let document: PropertyDocument =
        serde_json::from_slice(&raw).map_err(|error| IndexError::corrupt(&path, error))?;
    if document.format_version != FORMAT_VERSION {
        return Err(IndexError::corrupt(
            &path,
            format!("unsupported format version {}", document.format_version),
        ));
    }
    document
        .property
        .validate()
        .map_err(|error| IndexError::corrupt(&path, error))?;
    Ok(document.property)
}

pub(crate) fn read(dir: &Path) -> Result<Snapshot> {
    let property = read_property(dir)?;
    let path = dir.join(SNAPSHOT_FILE);
    let raw = fs::read(&path).map_err(|error| IndexError::io(&path, error))?;

    let Some(payload_len) = raw.len().checked_sub(FOOTER_LEN) else {
        return Err(IndexError::corrupt(&path, "snapshot is shorter than its footer"));
    };
    let (payload, footer) = raw.split_at(payload_len);
    let (magic, crc_bytes) = footer.split_at(SNAPSHOT_MAGIC.len());
    if magic != SNAPSHOT_MAGIC {
        return Err(IndexError::corrupt(&path, "missing snapshot footer"));
    }
    let stored_crc = u32::from_be_bytes(
        crc_bytes
            .try_into()
            .map_err(|_| IndexError::corrupt(&path, "truncated checksum"))?,
    );
    let computed_crc = crc32fast::hash(payload);
    if stored_crc != computed_crc {
        return Err(IndexError::corrupt(
            &path,
            format!("checksum mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"),
        ));
    }

    let snapshot: Snapshot =
        bincode::deserialize(payload).map_err(|error| IndexError::corrupt(&path, error))?;
    if snapshot.property != property {
        return Err(IndexError::corrupt(
            &path,
            format!("{PROPERTY_FILE} disagrees with the snapshot property"),
        ));
    }
    debug!(path = %path.display(), crc = format_args!("{stored_crc:#010x}"), "verified index snapshot");
    Ok(snapshot)
}
