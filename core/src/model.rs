//! Inference runtime for exported sequence classifiers.
//!
//! An artifact is a flat stack of layers (embedding, LSTM, pooling, dense)
//! with their trained weights, stored as JSON (`.json`) or bincode (`.bin`).
//! Weights use the Keras layout: kernels are `[input, output]`, LSTM gates are
//! packed in i, f, c, o order.

use crate::encoder::EncodedBatch;
use crate::error::{Error, Result};
use crate::scorer::Scorer;
use anyhow::{anyhow, bail};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: Array1<f32>) -> Array1<f32> {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.mapv(|v| v.max(0.0)),
            Activation::Tanh => x.mapv(f32::tanh),
            Activation::Sigmoid => x.mapv(sigmoid),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Embedding {
        weights: Vec<Vec<f32>>,
        #[serde(default)]
        mask_zero: bool,
    },
    Lstm {
        kernel: Vec<Vec<f32>>,
        recurrent_kernel: Vec<Vec<f32>>,
        bias: Vec<f32>,
        #[serde(default)]
        return_sequences: bool,
    },
    GlobalAveragePooling1d,
    GlobalMaxPooling1d,
    Dropout {
        #[serde(default)]
        rate: f32,
    },
    Dense {
        kernel: Vec<Vec<f32>>,
        bias: Vec<f32>,
        #[serde(default)]
        activation: Activation,
    },
}

/// Serialized form of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub name: Option<String>,
    /// Expected sequence width; checked against every batch when set.
    #[serde(default)]
    pub input_length: Option<usize>,
    pub layers: Vec<LayerSpec>,
}

impl ModelArtifact {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path).map_err(|source| Error::ModelIo { path: path.to_path_buf(), source })?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)
            .map_err(|source| Error::ModelIo { path: path.to_path_buf(), source })?;
        match extension(path) {
            Some("json") => serde_json::from_slice(&buf).map_err(|e| Error::ModelArtifact(e.to_string())),
            Some("bin") => bincode::deserialize(&buf).map_err(|e| Error::ModelArtifact(e.to_string())),
            other => Err(Error::ModelArtifact(format!("unsupported artifact extension {other:?}"))),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let bytes = match extension(path) {
            Some("json") => serde_json::to_vec_pretty(self).map_err(|e| Error::ModelArtifact(e.to_string()))?,
            Some("bin") => bincode::serialize(self).map_err(|e| Error::ModelArtifact(e.to_string()))?,
            other => return Err(Error::ModelArtifact(format!("unsupported artifact extension {other:?}"))),
        };
        let mut f = File::create(path)?;
        f.write_all(&bytes)?;
        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

#[derive(Debug, Clone)]
struct Lstm {
    kernel: Array2<f32>,
    recurrent: Array2<f32>,
    bias: Array1<f32>,
    units: usize,
    return_sequences: bool,
}

#[derive(Debug, Clone)]
enum Layer {
    Embedding { table: Array2<f32>, mask_zero: bool },
    Lstm(Lstm),
    AveragePool,
    MaxPool,
    Dense { kernel: Array2<f32>, bias: Array1<f32>, activation: Activation },
}

/// Shape flowing between layers while validating an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Ids,
    Sequence(usize),
    Vector(usize),
}

enum Tensor {
    Sequence { steps: Array2<f32>, mask: Option<Vec<bool>> },
    Vector(Array1<f32>),
}

/// A validated, ready-to-run model.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    name: Option<String>,
    input_length: Option<usize>,
    layers: Vec<Layer>,
}

impl SequenceModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model = Self::from_artifact(ModelArtifact::load(path.as_ref())?)?;
        info!(path = %path.as_ref().display(), layers = model.layers.len(), "model artifact loaded");
        Ok(model)
    }

    /// Check shapes end to end; the network must finish in a single sigmoid unit.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let invalid = |msg: String| Error::ModelArtifact(msg);
        let mut shape = Shape::Ids;
        let mut layers = Vec::with_capacity(artifact.layers.len());
        let mut last_activation = None;

        for (i, spec) in artifact.layers.into_iter().enumerate() {
            let layer = match (spec, shape) {
                (LayerSpec::Embedding { weights, mask_zero }, Shape::Ids) => {
                    let table = matrix(weights).map_err(|e| invalid(format!("layer {i} embedding: {e}")))?;
                    shape = Shape::Sequence(table.ncols());
                    Layer::Embedding { table, mask_zero }
                }
                (LayerSpec::Lstm { kernel, recurrent_kernel, bias, return_sequences }, Shape::Sequence(dim)) => {
                    let kernel = matrix(kernel).map_err(|e| invalid(format!("layer {i} lstm kernel: {e}")))?;
                    let recurrent =
                        matrix(recurrent_kernel).map_err(|e| invalid(format!("layer {i} lstm recurrent: {e}")))?;
                    let units = recurrent.nrows();
                    if kernel.nrows() != dim
                        || kernel.ncols() != 4 * units
                        || recurrent.ncols() != 4 * units
                        || bias.len() != 4 * units
                    {
                        return Err(invalid(format!(
                            "layer {i} lstm: kernel {:?}, recurrent {:?}, bias {} do not fit input {dim} / {units} units",
                            kernel.dim(),
                            recurrent.dim(),
                            bias.len()
                        )));
                    }
                    shape = if return_sequences { Shape::Sequence(units) } else { Shape::Vector(units) };
                    Layer::Lstm(Lstm { kernel, recurrent, bias: Array1::from(bias), units, return_sequences })
                }
                (LayerSpec::GlobalAveragePooling1d, Shape::Sequence(dim)) => {
                    shape = Shape::Vector(dim);
                    Layer::AveragePool
                }
                (LayerSpec::GlobalMaxPooling1d, Shape::Sequence(dim)) => {
                    shape = Shape::Vector(dim);
                    Layer::MaxPool
                }
                (LayerSpec::Dropout { .. }, _) => continue,
                (LayerSpec::Dense { kernel, bias, activation }, Shape::Vector(dim)) => {
                    let kernel = matrix(kernel).map_err(|e| invalid(format!("layer {i} dense: {e}")))?;
                    if kernel.nrows() != dim || bias.len() != kernel.ncols() {
                        return Err(invalid(format!(
                            "layer {i} dense: kernel {:?} and bias {} do not fit input {dim}",
                            kernel.dim(),
                            bias.len()
                        )));
                    }
                    shape = Shape::Vector(kernel.ncols());
                    last_activation = Some(activation);
                    Layer::Dense { kernel, bias: Array1::from(bias), activation }
                }
                (spec, shape) => {
                    return Err(invalid(format!("layer {i} {} cannot follow {shape:?}", layer_name(&spec))));
                }
            };
            if !matches!(layer, Layer::Dense { .. }) {
                last_activation = None;
            }
            layers.push(layer);
        }

        if shape != Shape::Vector(1) || last_activation != Some(Activation::Sigmoid) {
            return Err(invalid(format!(
                "network must end in a one-unit sigmoid dense layer, ends in {shape:?}"
            )));
        }
        Ok(Self { name: artifact.name, input_length: artifact.input_length, layers })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn forward(&self, ids: ArrayView1<u32>) -> anyhow::Result<f32> {
        let mut tensor: Option<Tensor> = None;
        for layer in &self.layers {
            tensor = Some(match (layer, tensor.take()) {
                (Layer::Embedding { table, mask_zero }, None) => {
                    let mut rows = Vec::with_capacity(ids.len());
                    for &id in ids.iter() {
                        if id as usize >= table.nrows() {
                            bail!("token id {id} out of range for embedding with {} rows", table.nrows());
                        }
                        rows.push(id as usize);
                    }
                    let steps = table.select(Axis(0), &rows);
                    let mask = mask_zero.then(|| ids.iter().map(|&id| id != 0).collect());
                    Tensor::Sequence { steps, mask }
                }
                (Layer::Lstm(lstm), Some(Tensor::Sequence { steps, mask })) => lstm.run(&steps, mask),
                (Layer::AveragePool, Some(Tensor::Sequence { steps, mask })) => {
                    Tensor::Vector(pool(&steps, mask.as_deref(), |acc, row| acc + &row, |sum, n| sum / n as f32))
                }
                (Layer::MaxPool, Some(Tensor::Sequence { steps, mask })) => Tensor::Vector(pool(
                    &steps,
                    mask.as_deref(),
                    |acc, row| ndarray::Zip::from(&acc).and(&row).map_collect(|a, b| a.max(*b)),
                    |max, _| max,
                )),
                (Layer::Dense { kernel, bias, activation }, Some(Tensor::Vector(x))) => {
                    Tensor::Vector(activation.apply(x.dot(kernel) + bias))
                }
                _ => bail!("layer received an input of the wrong kind"),
            });
        }
        match tensor {
            Some(Tensor::Vector(out)) if out.len() == 1 => Ok(out[0]),
            _ => Err(anyhow!("network produced no scalar output")),
        }
    }
}

impl Lstm {
    fn run(&self, steps: &Array2<f32>, mask: Option<Vec<bool>>) -> Tensor {
        let u = self.units;
        let mut h = Array1::<f32>::zeros(u);
        let mut c = Array1::<f32>::zeros(u);
        let mut outputs = Array2::<f32>::zeros((steps.nrows(), u));
        for (t, x) in steps.outer_iter().enumerate() {
            // Masked steps carry the previous state forward.
            if mask.as_ref().map_or(true, |m| m[t]) {
                let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
                let i = z.slice(s![0..u]).mapv(sigmoid);
                let f = z.slice(s![u..2 * u]).mapv(sigmoid);
                let g = z.slice(s![2 * u..3 * u]).mapv(f32::tanh);
                let o = z.slice(s![3 * u..4 * u]).mapv(sigmoid);
                c = &f * &c + &i * &g;
                h = &o * &c.mapv(f32::tanh);
            }
            outputs.row_mut(t).assign(&h);
        }
        if self.return_sequences {
            Tensor::Sequence { steps: outputs, mask }
        } else {
            Tensor::Vector(h)
        }
    }
}

/// Fold the unmasked rows of `steps`; an all-masked sequence pools to zeros.
fn pool<F, G>(steps: &Array2<f32>, mask: Option<&[bool]>, fold: F, finish: G) -> Array1<f32>
where
    F: Fn(Array1<f32>, ArrayView1<f32>) -> Array1<f32>,
    G: Fn(Array1<f32>, usize) -> Array1<f32>,
{
    let mut acc: Option<Array1<f32>> = None;
    let mut n = 0usize;
    for (t, row) in steps.outer_iter().enumerate() {
        if mask.map_or(false, |m| !m[t]) {
            continue;
        }
        n += 1;
        acc = Some(match acc {
            None => row.to_owned(),
            Some(a) => fold(a, row),
        });
    }
    match acc {
        Some(a) => finish(a, n),
        None => Array1::zeros(steps.ncols()),
    }
}

impl Scorer for SequenceModel {
    fn predict(&self, batch: &EncodedBatch) -> anyhow::Result<Vec<f32>> {
        if let Some(expected) = self.input_length {
            if batch.ncols() != expected {
                bail!("expected sequences of length {expected}, got {}", batch.ncols());
            }
        }
        batch.outer_iter().map(|row| self.forward(row)).collect()
    }
}

fn matrix(rows: Vec<Vec<f32>>) -> std::result::Result<Array2<f32>, String> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if nrows == 0 || ncols == 0 {
        return Err("empty weight matrix".into());
    }
    if rows.iter().any(|r| r.len() != ncols) {
        return Err("ragged weight matrix".into());
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| e.to_string())
}

fn layer_name(spec: &LayerSpec) -> &'static str {
    match spec {
        LayerSpec::Embedding { .. } => "embedding",
        LayerSpec::Lstm { .. } => "lstm",
        LayerSpec::GlobalAveragePooling1d => "global_average_pooling1d",
        LayerSpec::GlobalMaxPooling1d => "global_max_pooling1d",
        LayerSpec::Dropout { .. } => "dropout",
        LayerSpec::Dense { .. } => "dense",
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
