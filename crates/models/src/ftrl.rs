use ketch_core::{Error, LType, Result, Value};
use ketch_storage::{Column, DataTable, TableColumn};
use log::debug;

use crate::hash::{RowHasher, murmur2};

/// FTRL-Proximal hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FtrlParams {
    pub alpha: f64,
    pub beta: f64,
    pub lambda1: f64,
    pub lambda2: f64,
    pub nbins: u64,
    pub nepochs: usize,
    pub interactions: bool,
}

impl Default for FtrlParams {
    fn default() -> Self {
        FtrlParams {
            alpha: 0.005,
            beta: 1.0,
            lambda1: 0.0,
            lambda2: 1.0,
            nbins: 1_000_000,
            nepochs: 1,
            interactions: false,
        }
    }
}

impl FtrlParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0) {
            return Err(Error::value("alpha must be positive"));
        }
        if self.beta < 0.0 {
            return Err(Error::value("beta must be non-negative"));
        }
        if self.lambda1 < 0.0 || self.lambda2 < 0.0 {
            return Err(Error::value("lambda1 and lambda2 must be non-negative"));
        }
        if self.nbins == 0 {
            return Err(Error::value("nbins must be positive"));
        }
        Ok(())
    }
}

/// Binary logistic FTRL-Proximal learner over hashed frame columns.
///
/// Every feature column is hashed row by row, folded with the hash of its
/// column name and bucketed modulo `nbins`; with interactions enabled each
/// column pair contributes an extra feature. The model itself is the pair of
/// `z`/`n` accumulator vectors, one slot per bin.
pub struct Ftrl {
    params: FtrlParams,
    z: Vec<f64>,
    n: Vec<f64>,
    fi: Vec<f64>,
    feature_names: Vec<String>,
    colname_hashes: Vec<u64>,
    ncols: usize,
    trained: bool,
}

impl Ftrl {
    pub fn new(params: FtrlParams) -> Result<Ftrl> {
        params.validate()?;
        Ok(Ftrl {
            params,
            z: Vec::new(),
            n: Vec::new(),
            fi: Vec::new(),
            feature_names: Vec::new(),
            colname_hashes: Vec::new(),
            ncols: 0,
            trained: false,
        })
    }

    pub fn params(&self) -> &FtrlParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn nfeatures(&self) -> usize {
        self.feature_names.len()
    }

    /// Forget the model and feature importances.
    pub fn reset(&mut self) {
        self.z.clear();
        self.n.clear();
        self.fi.clear();
        self.feature_names.clear();
        self.colname_hashes.clear();
        self.ncols = 0;
        self.trained = false;
    }

    /// Fit on `frame`, using `target` as the binary label column and every
    /// other column as a feature.
    ///
    /// The label is read as truthy (`true`, non-zero) versus falsy; rows
    /// with an NA label are skipped. Repeated calls with the same feature
    /// layout continue training the same model.
    pub fn fit(&mut self, frame: &DataTable, target: &str) -> Result<()> {
        let target_idx = frame
            .column_index(target)
            .ok_or_else(|| Error::column_not_found(target))?;
        let frame = frame.materialize()?;

        let feature_idx: Vec<usize> = (0..frame.ncols()).filter(|&i| i != target_idx).collect();
        if feature_idx.is_empty() {
            return Err(Error::value("frame has no feature columns"));
        }

        let names: Vec<String> = feature_idx
            .iter()
            .filter_map(|&i| frame.name_at(i).map(str::to_string))
            .collect();
        self.define_features(names)?;

        let target_col = data_column(&frame, target_idx)?;
        if target_col.ltype() == LType::String {
            return Err(Error::type_error(format!(
                "target column '{target}' must be boolean or numeric"
            )));
        }

        let feature_cols: Vec<&Column> = feature_idx
            .iter()
            .map(|&i| data_column(&frame, i))
            .collect::<Result<_>>()?;
        let hashers: Vec<RowHasher> = feature_cols.iter().map(|c| RowHasher::new(c)).collect();

        let nfeatures = self.nfeatures();
        let mut x = vec![0u64; nfeatures];
        let mut w = vec![0.0f64; nfeatures];
        let mut fitted_rows = 0usize;
        for epoch in 0..self.params.nepochs {
            for row in 0..frame.nrows() {
                let y = match label_at(target_col, row) {
                    Some(y) => y,
                    None => continue,
                };
                self.hash_row(&hashers, &mut x, row);
                let p = sigmoid(self.predict_row(&x, &mut w));
                self.update(&x, &w, p, y);
                fitted_rows += 1;
            }
            debug!("ftrl: finished epoch {} of {}", epoch + 1, self.params.nepochs);
        }

        self.trained = true;
        debug!(
            "ftrl: fitted {} rows over {} features into {} bins",
            fitted_rows,
            nfeatures,
            self.params.nbins
        );
        Ok(())
    }

    /// Score every row of `frame`, which must carry the same feature columns
    /// the model was fitted on. Returns a one-column `f64` frame named
    /// `target`.
    pub fn predict(&self, frame: &DataTable) -> Result<DataTable> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        let frame = frame.materialize()?;
        if frame.ncols() != self.ncols {
            return Err(Error::value(format!(
                "frame has {} feature columns, model was fitted on {}",
                frame.ncols(),
                self.ncols
            )));
        }

        let feature_cols: Vec<&Column> = (0..frame.ncols())
            .map(|i| data_column(&frame, i))
            .collect::<Result<_>>()?;
        let hashers: Vec<RowHasher> = feature_cols.iter().map(|c| RowHasher::new(c)).collect();

        let nfeatures = self.nfeatures();
        let mut x = vec![0u64; nfeatures];
        let mut w = vec![0.0f64; nfeatures];
        let mut scores = Vec::with_capacity(frame.nrows());
        for row in 0..frame.nrows() {
            self.hash_row(&hashers, &mut x, row);
            scores.push(Some(sigmoid(self.predict_row(&x, &mut w))));
        }
        debug!("ftrl: scored {} rows", scores.len());
        DataTable::new(vec![("target".to_string(), Column::float64(&scores))])
    }

    /// The model as a two-column frame `z`/`n` with one row per bin.
    pub fn model(&self) -> Result<DataTable> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        let z: Vec<Option<f64>> = self.z.iter().map(|&v| Some(v)).collect();
        let n: Vec<Option<f64>> = self.n.iter().map(|&v| Some(v)).collect();
        DataTable::new(vec![
            ("z".to_string(), Column::float64(&z)),
            ("n".to_string(), Column::float64(&n)),
        ])
    }

    /// Accumulated importance per feature, as a `feature`/`fi` frame.
    pub fn feature_importances(&self) -> Result<DataTable> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        let names: Vec<Option<&str>> = self.feature_names.iter().map(|n| Some(n.as_str())).collect();
        let fi: Vec<Option<f64>> = self.fi.iter().map(|&v| Some(v)).collect();
        DataTable::new(vec![
            ("feature".to_string(), Column::str32(&names)?),
            ("fi".to_string(), Column::float64(&fi)),
        ])
    }

    fn define_features(&mut self, colnames: Vec<String>) -> Result<()> {
        let mut feature_names = colnames.clone();
        if self.params.interactions {
            for i in 0..colnames.len() {
                for j in (i + 1)..colnames.len() {
                    feature_names.push(format!("{}:{}", colnames[i], colnames[j]));
                }
            }
        }
        if self.trained && feature_names != self.feature_names {
            return Err(Error::value(
                "feature columns changed since the model was fitted; reset first",
            ));
        }
        if self.z.is_empty() {
            let nbins = self.params.nbins as usize;
            self.z = vec![0.0; nbins];
            self.n = vec![0.0; nbins];
        }
        if self.fi.len() != feature_names.len() {
            self.fi = vec![0.0; feature_names.len()];
        }
        self.ncols = colnames.len();
        self.colname_hashes = colnames
            .iter()
            .map(|name| murmur2(name.as_bytes(), 0))
            .collect();
        self.feature_names = feature_names;
        Ok(())
    }

    fn hash_row(&self, hashers: &[RowHasher], x: &mut [u64], row: usize) {
        let nbins = self.params.nbins;
        for (j, hasher) in hashers.iter().enumerate() {
            x[j] = hasher.hash(row).wrapping_add(self.colname_hashes[j]) % nbins;
        }
        if self.params.interactions {
            let ncols = hashers.len();
            let mut idx = ncols;
            for i in 0..ncols {
                for j in (i + 1)..ncols {
                    let folded = x[i]
                        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
                        .wrapping_add(x[j]);
                    x[idx] = folded % nbins;
                    idx += 1;
                }
            }
        }
    }

    /// Weights for the active bins and their sum, the raw margin.
    fn predict_row(&self, x: &[u64], w: &mut [f64]) -> f64 {
        let p = &self.params;
        let mut margin = 0.0;
        for (j, &f) in x.iter().enumerate() {
            let f = f as usize;
            let zf = self.z[f];
            let wj = if zf.abs() <= p.lambda1 {
                0.0
            } else {
                -(zf - zf.signum() * p.lambda1)
                    / ((p.beta + self.n[f].sqrt()) / p.alpha + p.lambda2)
            };
            w[j] = wj;
            margin += wj;
        }
        margin
    }

    fn update(&mut self, x: &[u64], w: &[f64], p: f64, y: f64) {
        let g = p - y;
        for (j, &f) in x.iter().enumerate() {
            let f = f as usize;
            let sigma = ((self.n[f] + g * g).sqrt() - self.n[f].sqrt()) / self.params.alpha;
            self.z[f] += g - sigma * w[j];
            self.n[f] += g * g;
            self.fi[j] += (w[j] * g).abs();
        }
    }
}

fn data_column<'a>(frame: &'a DataTable, idx: usize) -> Result<&'a Column> {
    frame
        .column(idx)
        .and_then(TableColumn::data)
        .ok_or_else(|| Error::value(format!("column {idx} is not materialized")))
}

fn label_at(col: &Column, row: usize) -> Option<f64> {
    match col.value(row) {
        Value::Null => None,
        Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        Value::Int(i) => Some(if i != 0 { 1.0 } else { 0.0 }),
        Value::Real(r) => Some(if r != 0.0 { 1.0 } else { 0.0 }),
        Value::Str(_) => None,
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
