//! Rendering configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest resolution accepted for rasterization.
pub const MAX_DPI: u32 = 1200;

/// What a page is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// One raster image per page
    #[default]
    Image,
    /// Layout-labelled text spans per page
    TextSpans,
}

impl RenderMode {
    /// Canonical name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Image => "image",
            RenderMode::TextSpans => "text-spans",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(RenderMode::Image),
            "text-spans" | "text_spans" | "spans" | "text" => Ok(RenderMode::TextSpans),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

/// Encoding used for page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (smaller, lossy)
    #[default]
    Jpeg,
    /// PNG (lossless)
    Png,
}

impl ImageFormat {
    /// MIME type for data URIs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Options controlling how documents are rendered into page units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Rasterization resolution in dots per inch
    pub dpi: u32,

    /// Output kind
    pub mode: RenderMode,

    /// Allowed annotation labels, copied verbatim into every record
    pub labels: Vec<String>,

    /// Page image encoding
    pub image_format: ImageFormat,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Skip the page preview image in text-spans mode
    pub hide_preview: bool,

    /// Default number of units rendered ahead of the consumer
    pub lookahead: usize,

    /// Process documents in parallel where the pipeline allows it
    pub parallel: bool,
}

impl RenderConfig {
    /// Create new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rasterization resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the output mode.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Render layout spans instead of images.
    pub fn text_spans(mut self) -> Self {
        self.mode = RenderMode::TextSpans;
        self
    }

    /// Set the label set.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the label set from a comma-separated string.
    pub fn with_label_list(self, labels: &str) -> Self {
        self.with_labels(split_labels(labels))
    }

    /// Set image encoding.
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Set JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Enable or disable the page preview in text-spans mode.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.hide_preview = !preview;
        self
    }

    /// Set the default prefetch depth.
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Load config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        // Surface an unknown mode as a mode error rather than a serde message.
        if let Some(mode) = value.get("mode").and_then(|m| m.as_str()) {
            mode.parse::<RenderMode>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(Error::InvalidConfig(format!(
                "dpi must be between 1 and {}, got {}",
                MAX_DPI, self.dpi
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(Error::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Pixels per PDF point at the configured resolution.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            mode: RenderMode::Image,
            labels: Vec::new(),
            image_format: ImageFormat::Jpeg,
            jpeg_quality: 85,
            hide_preview: false,
            lookahead: 2,
            parallel: true,
        }
    }
}

/// Split a comma-separated label string, dropping blanks.
pub fn split_labels(labels: &str) -> Vec<String> {
    labels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
