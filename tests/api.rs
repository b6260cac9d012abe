//! End-to-end checks of the public surface: `VERSION`, `DataTable` and
//! `open` are usable from the crate root.

use ketch::{Column, DataTable, Ftrl, FtrlParams, MType, RowIndex, TableColumn, Value, open, save};

#[test]
fn version_matches_the_package() {
    assert_eq!(ketch::VERSION, env!("CARGO_PKG_VERSION"));
    assert!(!ketch::VERSION.is_empty());
}

#[test]
fn build_save_open() {
    let frame = DataTable::new(vec![
        (
            "city".to_string(),
            Column::str32(&[Some("oslo"), Some("lima"), None]).unwrap(),
        ),
        (
            "population".to_string(),
            Column::int64(&[Some(709_000), Some(9_752_000), Some(42)]),
        ),
        (
            "rainfall".to_string(),
            Column::float64(&[Some(763.0), None, Some(0.5)]),
        ),
    ])
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cities");
    save(&frame, &path).unwrap();

    let loaded = open(&path).unwrap();
    assert_eq!(loaded.nrows(), 3);
    assert_eq!(loaded.names(), vec!["city", "population", "rainfall"]);
    assert_eq!(loaded.cell_by_name(1, "city"), Some(Value::Str("lima".into())));
    assert_eq!(loaded.cell_by_name(2, "rainfall"), Some(Value::Real(0.5)));

    // Columns come back memory-mapped.
    let col = loaded.column(1).and_then(TableColumn::data).unwrap();
    assert_eq!(col.mtype(), MType::Mapped);

    // Selection over a mapped frame behaves like over an owned one.
    let ri = RowIndex::from_slice(2, 3, -1).unwrap();
    let view = loaded.select(&ri, None).unwrap();
    assert_eq!(view.cell_by_name(2, "city"), Some(Value::Str("oslo".into())));

    let stats = loaded.column_stats("population").unwrap();
    assert_eq!(stats.min, Some(42.0));
}

#[test]
fn model_round_trip_through_disk() {
    // Train on a frame that went through the mmap path.
    let labels: Vec<Option<bool>> = (0..30).map(|i| Some(i % 3 == 0)).collect();
    let frame = DataTable::new(vec![
        ("signal".to_string(), Column::bool8(&labels)),
        ("y".to_string(), Column::bool8(&labels)),
    ])
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train");
    save(&frame, &path).unwrap();
    let loaded = open(&path).unwrap();

    let params = FtrlParams {
        alpha: 0.1,
        nbins: 128,
        nepochs: 10,
        ..FtrlParams::default()
    };
    let mut model = Ftrl::new(params).unwrap();
    model.fit(&loaded, "y").unwrap();
    assert!(model.is_trained());

    let features = loaded
        .select(
            &RowIndex::from_slice(0, loaded.nrows(), 1).unwrap(),
            Some(&[0]),
        )
        .unwrap();
    let scores = model.predict(&features).unwrap();
    let p0 = scores.cell(0, 0).unwrap().as_real().unwrap();
    let p1 = scores.cell(1, 0).unwrap().as_real().unwrap();
    assert!(p0 > p1, "positive row should outscore negative row ({p0} vs {p1})");
}
