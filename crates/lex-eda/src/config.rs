//! Configuration types for the EDA session.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic session setup. Every default reproduces the
//! fixed cleaning and charting heuristics; the knobs exist so tests and
//! hosts can shrink images or pin the sampling seed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the EDA session.
///
/// Use [`EdaConfig::builder()`] to create a new configuration with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_eda::config::EdaConfig;
///
/// let config = EdaConfig::builder()
///     .store_path("session_plots.db")
///     .sample_seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaConfig {
    /// Columns with a missing fraction below this value get their nulls filled
    /// with `0` (numeric) or `"None"` (categorical).
    /// Default: 0.05 (5%)
    pub low_missing_threshold: f64,

    /// Columns with a missing fraction at or above this value are dropped.
    /// Between the two thresholds numeric columns are mean-filled.
    /// Default: 0.40 (40%)
    pub drop_column_threshold: f64,

    /// Number of most frequent categories kept for categorical charts.
    /// Default: 10
    pub top_categories: usize,

    /// Category labels longer than this are shortened for display.
    /// Default: 15
    pub max_label_len: usize,

    /// Line charts over longer series are drawn from a random sample of this many rows.
    /// Default: 1000
    pub line_sample_size: usize,

    /// Line series with more points than this are smoothed.
    /// Default: 100
    pub smoothing_min_points: usize,

    /// Trailing moving-average window used for smoothing.
    /// Default: 5
    pub smoothing_window: usize,

    /// Number of histogram bins.
    /// Default: 50
    pub histogram_bins: usize,

    /// Rendered image width in pixels.
    /// Default: 900
    pub image_width: u32,

    /// Rendered image height in pixels.
    /// Default: 600
    pub image_height: u32,

    /// Location of the plot store file.
    /// Default: "plots.db"
    pub store_path: PathBuf,

    /// Seed for line-chart row sampling. `None` seeds from entropy.
    /// Default: None
    pub sample_seed: Option<u64>,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            low_missing_threshold: 0.05,
            drop_column_threshold: 0.40,
            top_categories: 10,
            max_label_len: 15,
            line_sample_size: 1000,
            smoothing_min_points: 100,
            smoothing_window: 5,
            histogram_bins: 50,
            image_width: 900,
            image_height: 600,
            store_path: PathBuf::from("plots.db"),
            sample_seed: None,
        }
    }
}

impl EdaConfig {
    /// Smallest accepted image edge in pixels.
    pub const MIN_IMAGE_EDGE: u32 = 64;

    /// Create a new configuration builder.
    pub fn builder() -> EdaConfigBuilder {
        EdaConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("low_missing_threshold", self.low_missing_threshold),
            ("drop_column_threshold", self.drop_column_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.low_missing_threshold > self.drop_column_threshold {
            return Err(ConfigValidationError::ThresholdOrder {
                low: self.low_missing_threshold,
                drop: self.drop_column_threshold,
            });
        }

        for (field, value) in [
            ("top_categories", self.top_categories),
            ("max_label_len", self.max_label_len),
            ("line_sample_size", self.line_sample_size),
            ("smoothing_window", self.smoothing_window),
            ("histogram_bins", self.histogram_bins),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        if self.image_width < Self::MIN_IMAGE_EDGE || self.image_height < Self::MIN_IMAGE_EDGE {
            return Err(ConfigValidationError::ImageTooSmall {
                width: self.image_width,
                height: self.image_height,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Low-missing threshold {low} exceeds drop threshold {drop}")]
    ThresholdOrder { low: f64, drop: f64 },

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Image size {width}x{height} is below the 64px minimum")]
    ImageTooSmall { width: u32, height: u32 },
}

impl From<ConfigValidationError> for crate::error::EdaError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::EdaError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EdaConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EdaConfigBuilder {
    low_missing_threshold: Option<f64>,
    drop_column_threshold: Option<f64>,
    top_categories: Option<usize>,
    max_label_len: Option<usize>,
    line_sample_size: Option<usize>,
    smoothing_min_points: Option<usize>,
    smoothing_window: Option<usize>,
    histogram_bins: Option<usize>,
    image_width: Option<u32>,
    image_height: Option<u32>,
    store_path: Option<PathBuf>,
    sample_seed: Option<u64>,
}

impl EdaConfigBuilder {
    /// Set the threshold below which nulls are filled with constants.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.05 = 5%)
    pub fn low_missing_threshold(mut self, threshold: f64) -> Self {
        self.low_missing_threshold = Some(threshold);
        self
    }

    /// Set the threshold at or above which columns are dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.4 = 40%)
    pub fn drop_column_threshold(mut self, threshold: f64) -> Self {
        self.drop_column_threshold = Some(threshold);
        self
    }

    /// Set how many of the most frequent categories are charted.
    pub fn top_categories(mut self, n: usize) -> Self {
        self.top_categories = Some(n);
        self
    }

    /// Set the display length after which category labels are shortened.
    pub fn max_label_len(mut self, len: usize) -> Self {
        self.max_label_len = Some(len);
        self
    }

    /// Set the sample size for long line charts.
    pub fn line_sample_size(mut self, n: usize) -> Self {
        self.line_sample_size = Some(n);
        self
    }

    /// Set the number of points above which line charts are smoothed.
    pub fn smoothing_min_points(mut self, n: usize) -> Self {
        self.smoothing_min_points = Some(n);
        self
    }

    /// Set the moving-average window.
    pub fn smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = Some(window);
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set the rendered image size in pixels.
    pub fn image_size(mut self, width: u32, height: u32) -> Self {
        self.image_width = Some(width);
        self.image_height = Some(height);
        self
    }

    /// Set the plot store location.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Pin the seed used for line-chart sampling.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EdaConfig` or an error if validation fails.
    pub fn build(self) -> Result<EdaConfig, ConfigValidationError> {
        let defaults = EdaConfig::default();
        let config = EdaConfig {
            low_missing_threshold: self
                .low_missing_threshold
                .unwrap_or(defaults.low_missing_threshold),
            drop_column_threshold: self
                .drop_column_threshold
                .unwrap_or(defaults.drop_column_threshold),
            top_categories: self.top_categories.unwrap_or(defaults.top_categories),
            max_label_len: self.max_label_len.unwrap_or(defaults.max_label_len),
            line_sample_size: self.line_sample_size.unwrap_or(defaults.line_sample_size),
            smoothing_min_points: self
                .smoothing_min_points
                .unwrap_or(defaults.smoothing_min_points),
            smoothing_window: self.smoothing_window.unwrap_or(defaults.smoothing_window),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            image_width: self.image_width.unwrap_or(defaults.image_width),
            image_height: self.image_height.unwrap_or(defaults.image_height),
            store_path: self.store_path.unwrap_or(defaults.store_path),
            sample_seed: self.sample_seed,
        };

        config.validate()?;
        Ok(config)
    }
}
