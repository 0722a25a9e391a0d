//! Serialized model artifacts: a fitted feature preprocessor and a voting
//! ensemble of linear regressors. Both are externally produced and carry a
//! `schema_version` checked at load time, so a mismatched artifact fails
//! loudly instead of deep inside the math.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, table::Table};

pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// How a single input column is turned into numeric features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encoding {
    /// One indicator column per trained category.
    OneHot { categories: Vec<String> },
    /// `(value - mean) / std`.
    Standard { mean: f64, std: f64 },
    /// Raw numeric value.
    Passthrough,
}

impl Encoding {
    pub fn width(&self) -> usize {
        match self {
            Encoding::OneHot { categories } => categories.len(),
            Encoding::Standard { .. } | Encoding::Passthrough => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEncoder {
    pub name: String,
    pub encoding: Encoding,
}

/// The fitted feature preprocessor. Columns are addressed by name; the
/// input table's column order does not matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    pub schema_version: u32,
    pub columns: Vec<ColumnEncoder>,
}

impl Preprocessor {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let pre: Preprocessor = serde_json::from_str(json)
            .map_err(|e| AppError::ModelLoad(format!("preprocessor: {e}")))?;
        pre.validate()?;
        Ok(pre)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(AppError::ModelLoad(format!(
                "preprocessor schema_version {} is not supported (expected {})",
                self.schema_version, SUPPORTED_SCHEMA_VERSION
            )));
        }
        if self.columns.is_empty() {
            return Err(AppError::ModelLoad("preprocessor has no columns".into()));
        }
        for col in &self.columns {
            match &col.encoding {
                Encoding::OneHot { categories } if categories.is_empty() => {
                    return Err(AppError::ModelLoad(format!(
                        "column {:?} has no categories",
                        col.name
                    )));
                }
                Encoding::Standard { std, .. } if *std <= 0.0 => {
                    return Err(AppError::ModelLoad(format!(
                        "column {:?} has non-positive std",
                        col.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Width of the numeric feature matrix this preprocessor produces.
    pub fn output_width(&self) -> usize {
        self.columns.iter().map(|c| c.encoding.width()).sum()
    }

    /// Map a table onto the numeric representation the regressor expects.
    /// Any deviation from the trained schema is a `FeatureSchema` error
    /// naming the offending column.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, AppError> {
        let width = self.output_width();
        let mut features = Array2::<f64>::zeros((table.n_rows(), width));

        for col in &self.columns {
            // fail on missing columns before touching any row
            table.require_column(&col.name)?;
        }

        for row in 0..table.n_rows() {
            let mut offset = 0;
            for col in &self.columns {
                let idx = table.require_column(&col.name)?;
                let cell = table.cell(row, idx);
                match &col.encoding {
                    Encoding::OneHot { categories } => {
                        let text = cell.to_text().ok_or_else(|| {
                            AppError::FeatureSchema(format!(
                                "missing value in column {:?} (row {})",
                                col.name,
                                row + 1
                            ))
                        })?;
                        let pos = categories.iter().position(|c| *c == text).ok_or_else(|| {
                            AppError::FeatureSchema(format!(
                                "unknown category {text:?} in column {:?} (row {})",
                                col.name,
                                row + 1
                            ))
                        })?;
                        features[[row, offset + pos]] = 1.0;
                    }
                    Encoding::Standard { mean, std } => {
                        let value = numeric_cell(cell, &col.name, row)?;
                        features[[row, offset]] = (value - mean) / std;
                    }
                    Encoding::Passthrough => {
                        features[[row, offset]] = numeric_cell(cell, &col.name, row)?;
                    }
                }
                offset += col.encoding.width();
            }
        }
        Ok(features)
    }
}

fn numeric_cell(cell: &crate::table::Cell, column: &str, row: usize) -> Result<f64, AppError> {
    cell.as_f64().ok_or_else(|| {
        AppError::FeatureSchema(format!(
            "non-numeric value {:?} in column {column:?} (row {})",
            cell.display(),
            row + 1
        ))
    })
}

/// One linear member of the voting ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearMember {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// The trained regressor: a voting ensemble averaging the affine outputs
/// of its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regressor {
    pub schema_version: u32,
    pub n_features: usize,
    pub members: Vec<LinearMember>,
}

impl Regressor {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let reg: Regressor = serde_json::from_str(json)
            .map_err(|e| AppError::ModelLoad(format!("regressor: {e}")))?;
        reg.validate()?;
        Ok(reg)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(AppError::ModelLoad(format!(
                "regressor schema_version {} is not supported (expected {})",
                self.schema_version, SUPPORTED_SCHEMA_VERSION
            )));
        }
        if self.members.is_empty() {
            return Err(AppError::ModelLoad("regressor has no members".into()));
        }
        for (i, member) in self.members.iter().enumerate() {
            if member.coefficients.len() != self.n_features {
                return Err(AppError::ModelLoad(format!(
                    "member {i} has {} coefficients, expected {}",
                    member.coefficients.len(),
                    self.n_features
                )));
            }
        }
        Ok(())
    }

    /// Mean of the members' predictions, one value per input row.
    pub fn predict(&self, features: &Array2<f64>) -> Array1<f64> {
        let mut total = Array1::<f64>::zeros(features.nrows());
        for member in &self.members {
            let coef = Array1::from_vec(member.coefficients.clone());
            total = total + features.dot(&coef) + member.intercept;
        }
        total / self.members.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn fixture_preprocessor() -> Preprocessor {
        Preprocessor::from_json(
            r#"{
                "schema_version": 1,
                "columns": [
                    {"name": "product_category", "encoding": {"type": "one_hot", "categories": ["A", "B"]}},
                    {"name": "item_price", "encoding": {"type": "standard", "mean": 10.0, "std": 2.0}},
                    {"name": "promotion", "encoding": {"type": "passthrough"}}
                ]
            }"#,
        )
        .unwrap()
    }

    fn one_row(category: &str, price: Cell, promotion: Cell) -> Table {
        Table::new(
            vec![
                "product_category".into(),
                "item_price".into(),
                "promotion".into(),
            ],
            vec![vec![Cell::Text(category.into()), price, promotion]],
        )
    }

    #[test]
    fn transform_encodes_one_row() {
        let pre = fixture_preprocessor();
        assert_eq!(pre.output_width(), 4);

        let table = one_row("B", Cell::Float(14.0), Cell::Int(1));
        let features = pre.transform(&table).unwrap();
        assert_eq!(features.shape(), &[1, 4]);
        assert_eq!(
            features.row(0).to_vec(),
            vec![0.0, 1.0, 2.0, 1.0] // one-hot B, (14-10)/2, raw 1
        );
    }

    #[test]
    fn transform_ignores_column_order_and_extras() {
        let pre = fixture_preprocessor();
        let table = Table::new(
            vec![
                "promotion".into(),
                "irrelevant".into(),
                "item_price".into(),
                "product_category".into(),
            ],
            vec![vec![
                Cell::Int(0),
                Cell::Text("noise".into()),
                Cell::Text("12".into()),
                Cell::Text("A".into()),
            ]],
        );
        let features = pre.transform(&table).unwrap();
        assert_eq!(features.row(0).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn transform_rejects_missing_column() {
        let pre = fixture_preprocessor();
        let table = Table::new(
            vec!["product_category".into(), "item_price".into()],
            vec![vec![Cell::Text("A".into()), Cell::Float(10.0)]],
        );
        let err = pre.transform(&table).unwrap_err();
        match err {
            AppError::FeatureSchema(msg) => assert!(msg.contains("promotion")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn transform_rejects_unknown_category() {
        let pre = fixture_preprocessor();
        let table = one_row("C", Cell::Float(10.0), Cell::Int(0));
        let err = pre.transform(&table).unwrap_err();
        match err {
            AppError::FeatureSchema(msg) => {
                assert!(msg.contains("product_category"));
                assert!(msg.contains("\"C\""));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn transform_rejects_non_numeric_value() {
        let pre = fixture_preprocessor();
        let table = one_row("A", Cell::Text("expensive".into()), Cell::Int(0));
        let err = pre.transform(&table).unwrap_err();
        match err {
            AppError::FeatureSchema(msg) => assert!(msg.contains("item_price")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn preprocessor_rejects_bad_artifacts() {
        let wrong_version = r#"{"schema_version": 2, "columns": [
            {"name": "x", "encoding": {"type": "passthrough"}}]}"#;
        assert!(matches!(
            Preprocessor::from_json(wrong_version),
            Err(AppError::ModelLoad(_))
        ));

        let zero_std = r#"{"schema_version": 1, "columns": [
            {"name": "x", "encoding": {"type": "standard", "mean": 0.0, "std": 0.0}}]}"#;
        assert!(matches!(
            Preprocessor::from_json(zero_std),
            Err(AppError::ModelLoad(_))
        ));

        assert!(matches!(
            Preprocessor::from_json("not json"),
            Err(AppError::ModelLoad(_))
        ));
    }

    #[test]
    fn regressor_validates_member_widths() {
        let mismatched = r#"{"schema_version": 1, "n_features": 3,
            "members": [{"coefficients": [1.0, 2.0], "intercept": 0.0}]}"#;
        assert!(matches!(
            Regressor::from_json(mismatched),
            Err(AppError::ModelLoad(_))
        ));

        let empty = r#"{"schema_version": 1, "n_features": 3, "members": []}"#;
        assert!(matches!(
            Regressor::from_json(empty),
            Err(AppError::ModelLoad(_))
        ));
    }

    #[test]
    fn ensemble_predict_averages_members() {
        let reg = Regressor::from_json(
            r#"{"schema_version": 1, "n_features": 2, "members": [
                {"coefficients": [1.0, 0.0], "intercept": 0.0},
                {"coefficients": [0.0, 1.0], "intercept": 2.0}
            ]}"#,
        )
        .unwrap();
        let features = ndarray::arr2(&[[4.0, 6.0], [0.0, 0.0]]);
        let out = reg.predict(&features);
        // row 0: (4 + 8) / 2 = 6; row 1: (0 + 2) / 2 = 1
        assert_eq!(out.to_vec(), vec![6.0, 1.0]);
    }
}
