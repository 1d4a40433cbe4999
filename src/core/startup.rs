//! Startup, metrics and document records.

use serde::{Deserialize, Serialize};

/// A portfolio startup: the subject of every report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Startup {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Sector / category (e.g. `"Fintech"`).
    #[serde(default)]
    pub sector: Option<String>,
    /// Funding stage.
    #[serde(default)]
    pub stage: Option<String>,
    /// Country of incorporation.
    #[serde(default)]
    pub country: Option<String>,
    /// Free-text team information.
    #[serde(default)]
    pub team_info: Option<String>,
    /// Latest investment memo text.
    #[serde(default)]
    pub memo: Option<String>,
}

impl Startup {
    /// Creates a startup with a fresh v4 UUID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sector.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Financial metrics entered for a startup.
///
/// Every field is optional; a metrics upsert only touches the fields
/// that are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Annual recurring revenue.
    #[serde(default)]
    pub arr: Option<f64>,
    /// Monthly recurring revenue.
    #[serde(default)]
    pub mrr: Option<f64>,
    /// Customer acquisition cost.
    #[serde(default)]
    pub cac: Option<f64>,
    /// Customer lifetime value.
    #[serde(default)]
    pub ltv: Option<f64>,
    /// Monthly churn rate in percent.
    #[serde(default)]
    pub churn_rate: Option<f64>,
    /// Runway in months.
    #[serde(default)]
    pub runway_months: Option<f64>,
    /// Monthly burn.
    #[serde(default)]
    pub burn_rate: Option<f64>,
    /// Number of paying customers.
    #[serde(default)]
    pub customer_count: Option<f64>,
    /// Year-over-year revenue growth in percent.
    #[serde(default)]
    pub revenue_growth: Option<f64>,
}

impl Metrics {
    /// Returns `true` if no metric has been entered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.arr.is_none()
            && self.mrr.is_none()
            && self.cac.is_none()
            && self.ltv.is_none()
            && self.churn_rate.is_none()
            && self.runway_months.is_none()
            && self.burn_rate.is_none()
            && self.customer_count.is_none()
            && self.revenue_growth.is_none()
    }

    /// Label/value pairs for the entered metrics, in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        [
            ("ARR", self.arr),
            ("MRR", self.mrr),
            ("CAC", self.cac),
            ("LTV", self.ltv),
            ("Churn Rate (%)", self.churn_rate),
            ("Runway (months)", self.runway_months),
            ("Burn Rate", self.burn_rate),
            ("Customers", self.customer_count),
            ("Revenue Growth (%)", self.revenue_growth),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }

    /// Renders the metrics as `Label: value` lines for prompts.
    #[must_use]
    pub fn to_prompt_block(&self) -> String {
        if self.is_empty() {
            return "No metrics available".to_string();
        }
        self.entries()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A processed document attached to a startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document name (file name or title).
    pub name: String,
    /// Document type (e.g. `"pitch_deck"`).
    #[serde(default)]
    pub doc_type: String,
    /// Model summary.
    #[serde(default)]
    pub summary: String,
    /// Extracted KPIs.
    #[serde(default)]
    pub kpis: String,
    /// Red flags raised by the model.
    #[serde(default)]
    pub red_flags: String,
}

/// A persisted document row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Row identifier.
    pub id: i64,
    /// Owning startup.
    pub startup_id: String,
    /// Processed content.
    #[serde(flatten)]
    pub summary: DocumentSummary,
    /// Creation timestamp.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_new_assigns_uuid() {
        let a = Startup::new("Acme");
        let b = Startup::new("Acme");
        assert_eq!(a.name, "Acme");
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_metrics_prompt_block_empty() {
        assert_eq!(Metrics::default().to_prompt_block(), "No metrics available");
    }

    #[test]
    fn test_metrics_prompt_block_lists_present_fields() {
        let metrics = Metrics {
            arr: Some(1_200_000.0),
            churn_rate: Some(2.5),
            ..Metrics::default()
        };
        let block = metrics.to_prompt_block();
        assert!(block.contains("ARR: 1200000"));
        assert!(block.contains("Churn Rate (%): 2.5"));
        assert!(!block.contains("MRR"));
    }
}
