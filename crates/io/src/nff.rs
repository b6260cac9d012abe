use std::fs::File;
use std::path::Path;

use ketch_core::{Error, Result, SType};
use ketch_storage::{Buffer, Column, DataTable, TableColumn};
use log::{debug, trace};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

/// Name of the manifest inside a frame directory.
pub const MANIFEST_FILE: &str = "_meta.nff";

const FORMAT_VERSION: u32 = 1;

/// The frame manifest: dimensions plus one entry per column carrying the
/// column file name, the stype code and an optional meta string
/// (`offoff=N` for string columns).
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    nrows: u64,
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnEntry {
    name: String,
    file: String,
    stype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<String>,
}

/// Persist a frame as a directory: one raw little-endian file per column
/// plus the JSON manifest. Views are materialized first.
pub fn save(frame: &DataTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let frame = frame.materialize()?;
    std::fs::create_dir_all(path)?;

    let mut entries = Vec::with_capacity(frame.ncols());
    for idx in 0..frame.ncols() {
        let name = frame
            .name_at(idx)
            .ok_or_else(|| Error::value(format!("column index {idx} out of range")))?;
        let col = frame
            .column(idx)
            .and_then(TableColumn::data)
            .ok_or_else(|| Error::value(format!("column '{name}' is not materialized")))?;
        let file = format!("c{idx}");
        std::fs::write(path.join(&file), col.as_bytes())?;
        trace!("wrote column '{}' ({} bytes) to {}", name, col.data_size(), file);
        entries.push(ColumnEntry {
            name: name.to_string(),
            file,
            stype: col.stype().code().to_string(),
            meta: col.offoff().map(|o| format!("offoff={o}")),
        });
    }

    let manifest = Manifest {
        version: FORMAT_VERSION,
        nrows: frame.nrows() as u64,
        columns: entries,
    };
    let out = File::create(path.join(MANIFEST_FILE))?;
    serde_json::to_writer_pretty(out, &manifest)?;
    debug!(
        "saved frame ({} rows, {} columns) to {}",
        frame.nrows(),
        frame.ncols(),
        path.display()
    );
    Ok(())
}

/// Open a frame directory, memory-mapping every column file read-only.
///
/// All structural validation happens here: manifest version, stype codes,
/// file sizes against the advertised row count, string offset metadata.
pub fn open(path: impl AsRef<Path>) -> Result<DataTable> {
    let path = path.as_ref();
    let manifest_file = File::open(path.join(MANIFEST_FILE))?;
    let manifest: Manifest = serde_json::from_reader(manifest_file)?;
    if manifest.version != FORMAT_VERSION {
        return Err(Error::format(format!(
            "unsupported format version {}",
            manifest.version
        )));
    }
    let nrows = usize::try_from(manifest.nrows)
        .map_err(|_| Error::format("row count exceeds the addressable range"))?;

    let mut columns = Vec::with_capacity(manifest.columns.len());
    for entry in &manifest.columns {
        let stype = SType::from_code(&entry.stype)
            .ok_or_else(|| Error::format(format!("unrecognized stype: {}", entry.stype)))?;
        let buffer = map_column_file(path, &entry.file)?;
        let offoff = parse_meta(stype, entry.meta.as_deref())?;
        let col = Column::from_buffer(stype, nrows, buffer, offoff).map_err(|e| {
            Error::format(format!("column '{}': {e}", entry.name))
        })?;
        trace!(
            "mapped column '{}' ({}, {} bytes)",
            entry.name,
            entry.stype,
            col.data_size()
        );
        columns.push((entry.name.clone(), col));
    }

    let frame = DataTable::new(columns)?;
    debug!(
        "opened frame ({} rows, {} columns) from {}",
        frame.nrows(),
        frame.ncols(),
        path.display()
    );
    Ok(frame)
}

fn map_column_file(dir: &Path, file: &str) -> Result<Buffer> {
    if file.is_empty()
        || file.contains('/')
        || file.contains('\\')
        || file == "."
        || file == ".."
    {
        return Err(Error::format(format!("invalid column file name '{file}'")));
    }
    let path = dir.join(file);
    let file = File::open(&path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        // Zero-length files cannot be mapped.
        return Ok(Buffer::from_vec(Vec::new()));
    }
    let map = unsafe { Mmap::map(&file)? };
    Ok(Buffer::from_mmap(map))
}

fn parse_meta(stype: SType, meta: Option<&str>) -> Result<Option<usize>> {
    match (stype.is_string(), meta) {
        (true, Some(meta)) => {
            let value = meta
                .strip_prefix("offoff=")
                .and_then(|v| v.parse::<usize>().ok())
                .ok_or_else(|| Error::format(format!("malformed meta string '{meta}'")))?;
            Ok(Some(value))
        }
        (true, None) => Err(Error::format(format!(
            "stype {stype} requires an offoff meta string"
        ))),
        (false, Some(meta)) => Err(Error::format(format!(
            "stype {stype} does not take a meta string, got '{meta}'"
        ))),
        (false, None) => Ok(None),
    }
}
