use serde::Deserialize;

use crate::{
    error::AppError,
    table::{Cell, Table},
};

/// The ten form fields of a single prediction request. Values arrive as
/// strings and are parsed explicitly so a bad value reports which field
/// it came from.
#[derive(Debug, Deserialize)]
pub struct SingleForm {
    pub product_category: String,
    pub item_id: String,
    pub season: String,
    pub item_price: String,
    pub promotion: String,
    pub competitor_activity: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub day_of_week: String,
}

fn parse_f64(field: &'static str, value: &str) -> Result<f64, AppError> {
    value.trim().parse::<f64>().map_err(|_| AppError::InputParse {
        field,
        value: value.to_string(),
    })
}

fn parse_i64(field: &'static str, value: &str) -> Result<i64, AppError> {
    value.trim().parse::<i64>().map_err(|_| AppError::InputParse {
        field,
        value: value.to_string(),
    })
}

impl SingleForm {
    /// Synthesize the one-row table the preprocessor consumes.
    pub fn into_table(self) -> Result<Table, AppError> {
        let row = vec![
            Cell::Text(self.product_category.trim().to_string()),
            Cell::Text(self.item_id.trim().to_string()),
            Cell::Int(parse_i64("promotion", &self.promotion)?),
            Cell::Int(parse_i64("competitor_activity", &self.competitor_activity)?),
            Cell::Float(parse_f64("item_price", &self.item_price)?),
            Cell::Text(self.season.trim().to_string()),
            Cell::Int(parse_i64("year", &self.year)?),
            Cell::Int(parse_i64("month", &self.month)?),
            Cell::Int(parse_i64("day", &self.day)?),
            Cell::Int(parse_i64("day_of_week", &self.day_of_week)?),
        ];
        Ok(Table::new(
            vec![
                "product_category".into(),
                "item_id".into(),
                "promotion".into(),
                "competitor_activity".into(),
                "item_price".into(),
                "season".into(),
                "year".into(),
                "month".into(),
                "day".into(),
                "day_of_week".into(),
            ],
            vec![row],
        ))
    }
}
