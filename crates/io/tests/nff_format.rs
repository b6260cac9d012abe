use ketch_core::Value;
use ketch_io::{MANIFEST_FILE, open, save};
use ketch_storage::{Column, DataTable, MType, RowIndex, TableColumn};

fn sample() -> DataTable {
    DataTable::new(vec![
        ("flag".to_string(), Column::bool8(&[Some(true), None, Some(false)])),
        ("small".to_string(), Column::int8(&[Some(-5), Some(5), None])),
        ("count".to_string(), Column::int64(&[Some(1), Some(2), Some(3)])),
        ("ratio".to_string(), Column::float64(&[Some(0.25), None, Some(-1.5)])),
        (
            "label".to_string(),
            Column::str32(&[Some("alpha"), Some(""), None]).unwrap(),
        ),
    ])
    .unwrap()
}

#[test]
fn round_trip_preserves_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    let frame = sample();
    save(&frame, &path).unwrap();

    let loaded = open(&path).unwrap();
    assert_eq!(loaded.nrows(), frame.nrows());
    assert_eq!(loaded.names(), frame.names());
    for row in 0..frame.nrows() {
        for col in 0..frame.ncols() {
            assert_eq!(loaded.cell(row, col), frame.cell(row, col), "cell {row},{col}");
        }
    }
}

#[test]
fn opened_columns_are_memory_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    save(&sample(), &path).unwrap();

    let loaded = open(&path).unwrap();
    for idx in 0..loaded.ncols() {
        let col = loaded.column(idx).and_then(TableColumn::data).unwrap();
        if col.data_size() > 0 {
            assert_eq!(col.mtype(), MType::Mapped);
        }
    }
}

#[test]
fn views_are_materialized_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    let frame = sample();
    let ri = RowIndex::from_array(vec![Some(2), Some(0)]);
    let view = frame.select(&ri, Some(&[2, 4])).unwrap();
    save(&view, &path).unwrap();

    let loaded = open(&path).unwrap();
    assert!(!loaded.is_view());
    assert_eq!(loaded.nrows(), 2);
    assert_eq!(loaded.names(), vec!["count", "label"]);
    assert_eq!(loaded.cell(0, 0), Some(Value::Int(3)));
    assert_eq!(loaded.cell(1, 1), Some(Value::Str("alpha".to_string())));
}

#[test]
fn empty_frame_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    let frame = DataTable::new(vec![
        ("a".to_string(), Column::int32(&[])),
        ("b".to_string(), Column::str32::<&str>(&[]).unwrap()),
    ])
    .unwrap();
    save(&frame, &path).unwrap();

    let loaded = open(&path).unwrap();
    assert_eq!(loaded.nrows(), 0);
    assert_eq!(loaded.names(), vec!["a", "b"]);
}

#[test]
fn missing_manifest_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(open(dir.path()).is_err());
}

#[test]
fn unrecognized_stype_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    save(&sample(), &path).unwrap();

    let manifest_path = path.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&manifest_path).unwrap();
    std::fs::write(&manifest_path, text.replace("i8i", "q9q")).unwrap();

    let err = open(&path).unwrap_err();
    assert!(err.to_string().contains("unrecognized stype"), "{err}");
}

#[test]
fn version_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    save(&sample(), &path).unwrap();

    let manifest_path = path.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&manifest_path).unwrap();
    std::fs::write(&manifest_path, text.replace("\"version\": 1", "\"version\": 9")).unwrap();

    let err = open(&path).unwrap_err();
    assert!(err.to_string().contains("format version"), "{err}");
}

#[test]
fn truncated_column_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    save(&sample(), &path).unwrap();

    // "count" is c2: 3 rows of i64 = 24 bytes. Cut it short.
    let col_path = path.join("c2");
    let bytes = std::fs::read(&col_path).unwrap();
    std::fs::write(&col_path, &bytes[..8]).unwrap();

    let err = open(&path).unwrap_err();
    assert!(err.to_string().contains("count"), "{err}");
}

#[test]
fn corrupt_string_offsets_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    save(&sample(), &path).unwrap();

    // "label" is c4. Point its first offset far past the string section.
    let col_path = path.join("c4");
    let mut bytes = std::fs::read(&col_path).unwrap();
    let offoff = bytes.len() - 3 * 4;
    bytes[offoff..offoff + 4].copy_from_slice(&10_000i32.to_le_bytes());
    std::fs::write(&col_path, &bytes).unwrap();

    let err = open(&path).unwrap_err();
    assert!(err.to_string().contains("label"), "{err}");
}
