use tracing::info;

use crate::{
    config::ModelConfig,
    error::AppError,
    predict::artifacts::{Preprocessor, Regressor},
    table::Table,
};

/// The loaded preprocessor/regressor pair. Built once at startup and kept
/// behind an `Arc` in `AppState`; the artifacts are immutable for the
/// process lifetime.
pub struct PredictionEngine {
    preprocessor: Preprocessor,
    regressor: Regressor,
}

impl PredictionEngine {
    pub fn new(preprocessor: Preprocessor, regressor: Regressor) -> Result<Self, AppError> {
        if preprocessor.output_width() != regressor.n_features {
            return Err(AppError::ModelLoad(format!(
                "preprocessor produces {} features but regressor expects {}",
                preprocessor.output_width(),
                regressor.n_features
            )));
        }
        Ok(Self {
            preprocessor,
            regressor,
        })
    }

    pub fn load(config: &ModelConfig) -> Result<Self, AppError> {
        let preprocessor = Preprocessor::load(&config.preprocessor_path)?;
        let regressor = Regressor::load(&config.regressor_path)?;
        let engine = Self::new(preprocessor, regressor)?;
        info!(
            preprocessor = %config.preprocessor_path.display(),
            regressor = %config.regressor_path.display(),
            n_features = engine.regressor.n_features,
            members = engine.regressor.members.len(),
            "model artifacts loaded"
        );
        Ok(engine)
    }

    /// Predict for a single synthesized row.
    pub fn predict_one(&self, table: &Table) -> Result<f64, AppError> {
        let predictions = self.predict_table(table)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| AppError::FeatureSchema("input has no rows".into()))
    }

    /// Predict for every row of a table, in row order.
    pub fn predict_table(&self, table: &Table) -> Result<Vec<f64>, AppError> {
        if table.n_rows() == 0 {
            return Err(AppError::FeatureSchema("input has no data rows".into()));
        }
        let features = self.preprocessor.transform(table)?;
        Ok(self.regressor.predict(&features).to_vec())
    }
}
