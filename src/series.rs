//! Named numeric series: the common result of summary extraction and the
//! tabular importers.

use time::PrimitiveDateTime;

use crate::summary::VarCategory;

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub category: VarCategory,
    pub unit: Option<String>,
    pub values: Vec<f64>,
    /// One entry per value when the source carries time; empty otherwise.
    pub timestamps: Vec<PrimitiveDateTime>,
}

impl NamedSeries {
    /// A series categorised from its vector name (`WOPR:P1` is a well vector).
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        let name = name.into();
        let keyword = name.split(':').next().unwrap_or_default();
        Self {
            category: VarCategory::identify(keyword),
            name,
            unit: None,
            values,
            timestamps: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: VarCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.unit = (!unit.trim().is_empty()).then(|| unit.trim().to_string());
        self
    }

    pub fn with_timestamps(mut self, timestamps: Vec<PrimitiveDateTime>) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of importing one tabular file.
///
/// Importers never return `Err` for bad content: a file that cannot be used
/// at all yields `success == false` with `error_text`, while individual bad
/// rows are skipped and counted.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub series: Vec<NamedSeries>,
    pub skipped_rows: usize,
    pub error_text: Option<String>,
    pub success: bool,
}

impl ImportReport {
    pub fn ok(series: Vec<NamedSeries>, skipped_rows: usize) -> Self {
        Self {
            series,
            skipped_rows,
            error_text: None,
            success: true,
        }
    }

    pub fn failed(error_text: impl Into<String>) -> Self {
        Self {
            series: Vec::new(),
            skipped_rows: 0,
            error_text: Some(error_text.into()),
            success: false,
        }
    }

    pub fn find(&self, name: &str) -> Option<&NamedSeries> {
        self.series.iter().find(|s| s.name == name)
    }
}
