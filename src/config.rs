//! Configuration types for file conversion.
//!
//! All conversion behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. The output directory is explicit
//! configuration handed to the converter at construction; nothing in the
//! library reads a process-wide location.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Configuration for a [`crate::Converter`].
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use file_converter::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .output_dir("/tmp/converted")
///     .concurrency(8)
///     .codec_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Directory where artifacts are written. Created on first use.
    /// Default: `converted`.
    pub output_dir: PathBuf,

    /// Number of files converted at the same time within one batch. Default: 4.
    ///
    /// Codec calls are CPU-bound and run on the blocking pool, so values far
    /// above the core count only add memory pressure.
    pub concurrency: usize,

    /// Upper bound on a single codec call in seconds. Default: 60.
    pub codec_timeout_secs: u64,

    /// JPEG quality for image re-encoding and image-stack PDFs. Range: 1–100.
    /// Default: 90.
    pub jpeg_quality: u8,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("converted"),
            concurrency: 4,
            codec_timeout_secs: 60,
            jpeg_quality: 90,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("codec_timeout_secs", &self.codec_timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn codec_timeout_secs(mut self, secs: u64) -> Self {
        self.config.codec_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.codec_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Codec timeout must be ≥ 1 second".into(),
            ));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgressCallback;
    use std::sync::Arc;

    #[test]
    fn defaults_are_valid() {
        let config = ConverterConfig::builder().build().unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.codec_timeout_secs, 60);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.output_dir, PathBuf::from("converted"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = ConverterConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(ConverterConfig::builder()
            .codec_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let err = ConverterConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(err.to_string().contains("got 0"));
        assert!(ConverterConfig::builder().jpeg_quality(101).build().is_err());
    }

    #[test]
    fn debug_hides_callback() {
        let config = ConverterConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<dyn ConversionProgressCallback>"));
    }
}
