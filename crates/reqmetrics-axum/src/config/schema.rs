use reqmetrics_core::desc::validate_name;
use reqmetrics_core::error::{MetricsError, Result};
use reqmetrics_core::histogram::validate_buckets;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentConfig {
    pub version: u32,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub api_group: String,

    /// Absent means counter-only.
    #[serde(default)]
    pub histogram: Option<HistogramSection>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            version: 1,
            namespace: default_namespace(),
            api_group: String::new(),
            histogram: None,
        }
    }
}

impl InstrumentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion);
        }
        validate_name(&self.namespace).map_err(|_| {
            MetricsError::BadConfig(format!(
                "namespace {:?} is not a valid metric name",
                self.namespace
            ))
        })?;

        if let Some(h) = &self.histogram {
            validate_buckets(&h.buckets)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramSection {
    /// Upper bounds in seconds. Empty selects the default latency buckets.
    #[serde(default)]
    pub buckets: Vec<f64>,
}

pub(crate) fn default_namespace() -> String {
    "http".into()
}
