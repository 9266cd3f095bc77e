use linfa::traits::{Fit, Predict, PredictInplace};
use linfa::DatasetBase;
use ndarray::{array, Array, Array1, Array2, Axis, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::PlantConfig;
use crate::error::{AppError, Result};

pub const MIN_LEVEL: i64 = 0;
pub const MAX_LEVEL: i64 = 5;

const BETA_1: f64 = 0.9;
const BETA_2: f64 = 0.999;
const EPSILON: f64 = 1e-8;
const L2_PENALTY: f64 = 1e-4;
const TOLERANCE: f64 = 1e-4;
const PATIENCE: usize = 10;

/// Hyperparameters for the growth regressor: a single ReLU hidden layer
/// trained with Adam on squared loss.
#[derive(Debug, Clone)]
pub struct GrowthRegressorParams {
    hidden_units: usize,
    learning_rate: f64,
    max_iter: usize,
    seed: u64,
}

impl Default for GrowthRegressorParams {
    fn default() -> Self {
        Self::from(&PlantConfig::default())
    }
}

impl From<&PlantConfig> for GrowthRegressorParams {
    fn from(config: &PlantConfig) -> Self {
        Self {
            hidden_units: config.hidden_units,
            learning_rate: config.learning_rate,
            max_iter: config.max_iter,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut Array<f64, D>, grad: &Array<f64, D>, lr_t: f64) {
        self.m.zip_mut_with(grad, |m, &g| *m = BETA_1 * *m + (1.0 - BETA_1) * g);
        self.v.zip_mut_with(grad, |v, &g| *v = BETA_2 * *v + (1.0 - BETA_2) * g * g);
        ndarray::Zip::from(param)
            .and(&self.m)
            .and(&self.v)
            .for_each(|p, &m, &v| *p -= lr_t * m / (v.sqrt() + EPSILON));
    }
}

struct Gradients {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

/// Fitted two-layer perceptron. Adam state survives between updates so
/// [`GrowthRegressor::partial_fit`] continues the same optimisation.
#[derive(Debug, Clone)]
pub struct GrowthRegressor {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    w1_moments: Moments<ndarray::Ix2>,
    b1_moments: Moments<ndarray::Ix1>,
    w2_moments: Moments<ndarray::Ix2>,
    b2_moments: Moments<ndarray::Ix1>,
    learning_rate: f64,
    steps: i32,
    loss_curve: Vec<f64>,
}

fn glorot_uniform(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> (Array2<f64>, Array1<f64>) {
    let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let weights = Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound));
    let bias = Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound));
    (weights, bias)
}

impl GrowthRegressor {
    fn initialise(params: &GrowthRegressorParams, n_inputs: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let (w1, b1) = glorot_uniform(&mut rng, n_inputs, params.hidden_units);
        let (w2, b2) = glorot_uniform(&mut rng, params.hidden_units, 1);

        Self {
            w1_moments: Moments::like(&w1),
            b1_moments: Moments::like(&b1),
            w2_moments: Moments::like(&w2),
            b2_moments: Moments::like(&b2),
            w1,
            b1,
            w2,
            b2,
            learning_rate: params.learning_rate,
            steps: 0,
            loss_curve: Vec::new(),
        }
    }

    fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let hidden = (x.dot(&self.w1) + &self.b1).mapv(|z| z.max(0.0));
        let output = hidden.dot(&self.w2) + &self.b2;
        (hidden, output)
    }

    /// Squared loss with L2 penalty, averaged over the batch.
    fn loss(&self, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let (_, output) = self.forward(x);
        let n = x.nrows() as f64;
        let residual = output.column(0).to_owned() - y;
        let squared = residual.mapv(|r| r * r).sum() / (2.0 * n);
        let penalty = (self.w1.mapv(|w| w * w).sum() + self.w2.mapv(|w| w * w).sum())
            * L2_PENALTY
            / (2.0 * n);
        squared + penalty
    }

    fn gradients(&self, x: &Array2<f64>, y: &Array1<f64>) -> Gradients {
        let n = x.nrows() as f64;
        let (hidden, output) = self.forward(x);

        let delta_out = &output - &y.view().insert_axis(Axis(1));
        let w2 = (hidden.t().dot(&delta_out) + &self.w2 * L2_PENALTY) / n;
        let b2 = delta_out.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(1));

        let mut delta_hidden = delta_out.dot(&self.w2.t());
        delta_hidden.zip_mut_with(&hidden, |d, &h| {
            if h <= 0.0 {
                *d = 0.0;
            }
        });
        let w1 = (x.t().dot(&delta_hidden) + &self.w1 * L2_PENALTY) / n;
        let b1 = delta_hidden
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.b1.len()));

        Gradients { w1, b1, w2, b2 }
    }

    fn adam_step(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let grads = self.gradients(x, y);
        self.steps += 1;
        let lr_t = self.learning_rate * (1.0 - BETA_2.powi(self.steps)).sqrt()
            / (1.0 - BETA_1.powi(self.steps));

        self.w1_moments.step(&mut self.w1, &grads.w1, lr_t);
        self.b1_moments.step(&mut self.b1, &grads.b1, lr_t);
        self.w2_moments.step(&mut self.w2, &grads.w2, lr_t);
        self.b2_moments.step(&mut self.b2, &grads.b2, lr_t);
    }

    /// One optimisation step on the given samples, continuing from the
    /// current weights.
    pub fn partial_fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(linfa::Error::MismatchedShapes(x.nrows(), y.len()).into());
        }
        self.adam_step(x, y);
        Ok(())
    }

    pub fn updates(&self) -> i32 {
        self.steps
    }

    /// Loss of each initial-fit epoch, measured before that epoch's update.
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }
}

impl Fit<Array2<f64>, Array1<f64>, AppError> for GrowthRegressorParams {
    type Object = GrowthRegressor;

    fn fit(&self, dataset: &DatasetBase<Array2<f64>, Array1<f64>>) -> Result<Self::Object> {
        let x = &dataset.records;
        let y = &dataset.targets;

        if x.nrows() == 0 {
            return Err(linfa::Error::NotEnoughSamples.into());
        }
        if self.hidden_units == 0 || self.learning_rate <= 0.0 {
            return Err(linfa::Error::Parameters(
                "hidden_units and learning_rate must be positive".to_string(),
            )
            .into());
        }

        let mut model = GrowthRegressor::initialise(self, x.ncols());
        let mut best_loss = f64::INFINITY;
        let mut stale_epochs = 0;

        for epoch in 0..self.max_iter {
            let loss = model.loss(x, y);
            model.adam_step(x, y);
            model.loss_curve.push(loss);

            if loss > best_loss - TOLERANCE {
                stale_epochs += 1;
            } else {
                stale_epochs = 0;
            }
            best_loss = best_loss.min(loss);

            if stale_epochs > PATIENCE {
                log::debug!("growth regressor stopped after {} epochs, loss {:.4}", epoch + 1, loss);
                break;
            }
        }

        Ok(model)
    }
}

impl PredictInplace<Array2<f64>, Array1<f64>> for GrowthRegressor {
    fn predict_inplace(&self, x: &Array2<f64>, y: &mut Array1<f64>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        let (_, output) = self.forward(x);
        y.assign(&output.column(0));
    }

    fn default_target(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub water: i64,
    pub sunlight: i64,
    pub growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    SmallPlant,
    MediumPlant,
    LargePlant,
}

impl GrowthStage {
    pub fn from_growth(growth: f64) -> Self {
        if growth < 2.0 {
            GrowthStage::Seed
        } else if growth < 4.0 {
            GrowthStage::SmallPlant
        } else if growth < 6.0 {
            GrowthStage::MediumPlant
        } else {
            GrowthStage::LargePlant
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurve {
    pub data_points: Vec<usize>,
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenStep {
    pub water: i64,
    pub sunlight: i64,
    pub growth: f64,
    pub stage: GrowthStage,
    pub learning_progress: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenSummary {
    pub data_points: usize,
    pub final_growth: f64,
    pub message: String,
}

fn validate_level(field: &'static str, value: i64) -> Result<()> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&value) {
        Ok(())
    } else {
        Err(AppError::OutOfRange {
            field,
            value,
            min: MIN_LEVEL,
            max: MAX_LEVEL,
        })
    }
}

/// Online-learning growth model plus the history it has been taught.
///
/// The history is kept only for plotting; it is never replayed into the
/// network.
pub struct PlantGrowthModel {
    params: GrowthRegressorParams,
    regressor: GrowthRegressor,
    history: Vec<Observation>,
}

impl PlantGrowthModel {
    pub fn new(params: GrowthRegressorParams) -> Result<Self> {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let regressor = params.fit(&DatasetBase::new(x, y))?;

        Ok(Self {
            params,
            regressor,
            history: Vec::new(),
        })
    }

    pub fn predict(&self, water: i64, sunlight: i64) -> Result<f64> {
        validate_level("water", water)?;
        validate_level("sunlight", sunlight)?;
        let x = array![[water as f64, sunlight as f64]];
        let y: Array1<f64> = self.regressor.predict(&x);
        Ok(y[0])
    }

    pub fn improve(&mut self, water: i64, sunlight: i64, growth: f64) -> Result<()> {
        validate_level("water", water)?;
        validate_level("sunlight", sunlight)?;
        if !growth.is_finite() {
            return Err(AppError::Validation(format!(
                "growth must be a finite number, got {}",
                growth
            )));
        }

        self.history.push(Observation {
            water,
            sunlight,
            growth,
        });
        self.regressor
            .partial_fit(&array![[water as f64, sunlight as f64]], &array![growth])
    }

    /// Current predictions for every historical input, indexed from 1.
    pub fn get_learning_curve(&self) -> LearningCurve {
        if self.history.is_empty() {
            return LearningCurve {
                data_points: Vec::new(),
                predictions: Vec::new(),
            };
        }

        let x = Array2::from_shape_fn((self.history.len(), 2), |(row, col)| {
            let obs = &self.history[row];
            if col == 0 {
                obs.water as f64
            } else {
                obs.sunlight as f64
            }
        });
        let predictions: Array1<f64> = self.regressor.predict(&x);

        LearningCurve {
            data_points: (1..=self.history.len()).collect(),
            predictions: predictions.to_vec(),
        }
    }

    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    /// Percentage of the ten interactions a full lesson expects.
    pub fn learning_progress(&self) -> f64 {
        (self.history.len() as f64 / 10.0 * 100.0).min(100.0)
    }

    pub fn reset(&mut self) -> Result<()> {
        *self = PlantGrowthModel::new(self.params.clone())?;
        Ok(())
    }
}

/// The garden game: the model predicts growth for the chosen levels and then
/// learns from its own prediction.
pub struct GardenGame {
    model: PlantGrowthModel,
    growth: f64,
}

impl GardenGame {
    pub fn new(params: GrowthRegressorParams) -> Result<Self> {
        Ok(Self {
            model: PlantGrowthModel::new(params)?,
            growth: 0.0,
        })
    }

    pub fn model(&self) -> &PlantGrowthModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut PlantGrowthModel {
        &mut self.model
    }

    pub fn growth(&self) -> f64 {
        self.growth
    }

    pub fn apply_changes(&mut self, water: i64, sunlight: i64) -> Result<GardenStep> {
        let predicted = self.model.predict(water, sunlight)?;
        self.model.improve(water, sunlight, predicted)?;
        self.growth = predicted;

        Ok(GardenStep {
            water,
            sunlight,
            growth: predicted,
            stage: GrowthStage::from_growth(predicted),
            learning_progress: self.model.learning_progress(),
            feedback: format!("AI predicted and learned: {:.2} growth.", predicted),
        })
    }

    pub fn reset(&mut self) -> Result<()> {
        self.model.reset()?;
        self.growth = 0.0;
        log::info!("garden model reset");
        Ok(())
    }

    pub fn summary(&self) -> GardenSummary {
        let data_points = self.model.history().len();
        GardenSummary {
            data_points,
            final_growth: self.growth,
            message: format!(
                "Great job! Here's what the AI learned:\n\n\
                 - You provided {} data points.\n\
                 - The AI's final growth prediction was {:.2}.\n\n\
                 Fun Fact: AI is used in real life to help farmers grow crops more efficiently!",
                data_points, self.growth
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_follow_growth_thresholds() {
        assert_eq!(GrowthStage::from_growth(0.5), GrowthStage::Seed);
        assert_eq!(GrowthStage::from_growth(2.0), GrowthStage::SmallPlant);
        assert_eq!(GrowthStage::from_growth(5.9), GrowthStage::MediumPlant);
        assert_eq!(GrowthStage::from_growth(6.0), GrowthStage::LargePlant);
    }

    #[test]
    fn seeded_fits_are_reproducible() {
        let a = PlantGrowthModel::new(GrowthRegressorParams::default()).unwrap();
        let b = PlantGrowthModel::new(GrowthRegressorParams::default()).unwrap();
        assert_eq!(a.predict(3, 4).unwrap(), b.predict(3, 4).unwrap());
    }

    #[test]
    fn partial_fit_moves_toward_the_target() {
        let mut model = PlantGrowthModel::new(GrowthRegressorParams::default()).unwrap();
        let before = model.predict(3, 3).unwrap();
        for _ in 0..50 {
            model.improve(3, 3, 20.0).unwrap();
        }
        let after = model.predict(3, 3).unwrap();
        assert!(after > before, "expected {} > {}", after, before);
    }

    #[test]
    fn rejects_levels_outside_the_slider_range() {
        let mut model = PlantGrowthModel::new(GrowthRegressorParams::default()).unwrap();
        assert!(matches!(
            model.predict(6, 0),
            Err(AppError::OutOfRange { field: "water", .. })
        ));
        assert!(matches!(
            model.improve(0, -1, 1.0),
            Err(AppError::OutOfRange { field: "sunlight", .. })
        ));
        assert!(model.history().is_empty());
    }

    #[test]
    fn mismatched_partial_fit_is_an_error() {
        let mut model = PlantGrowthModel::new(GrowthRegressorParams::default()).unwrap();
        let result = model
            .regressor
            .partial_fit(&array![[1.0, 1.0]], &array![1.0, 2.0]);
        assert!(matches!(result, Err(AppError::Linfa(_))));
    }

    #[test]
    fn first_recorded_loss_is_the_untrained_loss() {
        let params = GrowthRegressorParams::default();
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![1.0, 2.0, 3.0];

        let untrained = GrowthRegressor::initialise(&params, 2).loss(&x, &y);
        let fitted = params.fit(&DatasetBase::new(x, y)).unwrap();

        assert_eq!(fitted.loss_curve()[0], untrained);
        assert_eq!(fitted.loss_curve().len(), fitted.updates() as usize);
    }
}
