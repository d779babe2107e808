use std::path::{Path, PathBuf};

use crate::helper::{Colors, Rgb};
use crate::png::FilterStrategy;
use crate::segment::EncodeMode;
use crate::version::{ErrorLevel, Mask, Version};

/// Where the finished PNG goes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OutputTarget {
    /// Return the bytes to the caller.
    Memory,
    /// Create or truncate a file at this path.
    File(PathBuf),
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::File(PathBuf::from("qr.png"))
    }
}

/// Settings for one run of the pipeline.
///
/// ```
/// use qrpng::{ErrorLevel, OutputTarget, QrOptions, Rgb};
///
/// let options = QrOptions::default()
///     .with_level(ErrorLevel::High)
///     .with_dark_color(Rgb::new(0, 0, 128))
///     .with_scale(8)
///     .with_target(OutputTarget::Memory);
/// assert_eq!(options.quiet_zone, 4);
/// ```
#[derive(Clone, Debug)]
pub struct QrOptions {
    pub level: ErrorLevel,
    pub target: OutputTarget,
    pub colors: Colors,
    pub case_sensitive: bool,
    pub mode: EncodeMode,
    /// Pixels per module.
    pub scale: u32,
    /// Light modules around the symbol.
    pub quiet_zone: u32,
    pub min_version: Version,
    pub max_version: Version,
    /// Forces a mask instead of picking the lowest penalty.
    pub mask: Option<Mask>,
    /// Raises the level while the data still fits the chosen version.
    pub boost_level: bool,
    pub filter: FilterStrategy,
}

impl Default for QrOptions {
    fn default() -> Self {
        QrOptions {
            level: ErrorLevel::Medium,
            target: OutputTarget::default(),
            colors: Colors::default(),
            case_sensitive: true,
            mode: EncodeMode::Auto,
            scale: 1,
            quiet_zone: 4,
            min_version: Version::MIN,
            max_version: Version::MAX,
            mask: None,
            boost_level: false,
            filter: FilterStrategy::default(),
        }
    }
}

impl QrOptions {
    pub fn with_level(mut self, level: ErrorLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_target(mut self, target: OutputTarget) -> Self {
        self.target = target;
        self
    }

    /// Shorthand for `with_target(OutputTarget::File(path))`.
    pub fn with_output_file(self, path: impl AsRef<Path>) -> Self {
        self.with_target(OutputTarget::File(path.as_ref().to_path_buf()))
    }

    pub fn with_colors(mut self, colors: Colors) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_dark_color(mut self, dark: Rgb) -> Self {
        self.colors.dark = dark;
        self
    }

    pub fn with_light_color(mut self, light: Rgb) -> Self {
        self.colors.light = light;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_mode(mut self, mode: EncodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_quiet_zone(mut self, quiet_zone: u32) -> Self {
        self.quiet_zone = quiet_zone;
        self
    }

    pub fn with_versions(mut self, min: Version, max: Version) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    pub fn with_mask(mut self, mask: Option<Mask>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_boost_level(mut self, boost: bool) -> Self {
        self.boost_level = boost;
        self
    }

    pub fn with_filter(mut self, filter: FilterStrategy) -> Self {
        self.filter = filter;
        self
    }
}
