//! Configuration of a correlation calculation.
//!
//! A [`CorrelationConfig`] names every recognized option. It can be built
//! programmatically (most conveniently through [`KKCorrelationBuilder`]) or
//! loaded from json. Options that aren't recognized are rejected, rather
//! than silently ignored.
//!
//! The configuration is validated exactly once, when the accumulator is
//! constructed.

use std::path::Path;

use kkcorr_internal::SplitMethod;
use serde::{Deserialize, Serialize};

use crate::{BinGrid, Error, KKCorrelation, Metric, SepUnits};

/// the default output precision of ascii files
pub(crate) const DEFAULT_PRECISION: usize = 4;
/// the default depth of the top-level cells in a field
pub(crate) const DEFAULT_MAX_TOP: usize = 10;

/// Every option of a correlation calculation. All of them are optional.
///
/// Extra entries are not ignored: deserializing a config with an unknown
/// (e.g. misspelled) key fails with a configuration error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrelationConfig {
    pub min_sep: Option<f64>,
    pub max_sep: Option<f64>,
    pub nbins: Option<usize>,
    pub bin_size: Option<f64>,
    /// the tree-approximation tolerance in units of `bin_size`
    pub bin_slop: Option<f64>,
    /// e.g. "arcmin" or "degrees"
    pub sep_units: Option<String>,
    /// the default metric (e.g. "Flat", "3D" or "Rperp")
    pub metric: Option<String>,
    /// the number of threads to use. When omitted, rayon's global thread
    /// pool is used
    pub num_threads: Option<usize>,
    /// the number of digits after the decimal point in ascii output
    pub precision: Option<usize>,
    /// "middle", "median" or "mean"
    pub split_method: Option<String>,
    pub max_top: Option<usize>,
    /// emit a log event as each top-level cell is finished
    pub output_dots: Option<bool>,
}

/// Runtime parameters that don't have a meaningful impact on the output
/// (results are consistent, if not bitwise identical), but impact
/// performance or diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeSpec {
    pub num_threads: Option<usize>,
    pub output_dots: bool,
}

/// the result of validating a [`CorrelationConfig`]
pub(crate) struct ValidatedConfig {
    pub(crate) grid: BinGrid,
    pub(crate) b: f64,
    pub(crate) metric: Option<Metric>,
    pub(crate) split_method: SplitMethod,
    pub(crate) max_top: usize,
    pub(crate) precision: usize,
    pub(crate) runtime: RuntimeSpec,
}

fn parse_split_method(name: &str) -> Result<SplitMethod, Error> {
    match name.to_lowercase().as_str() {
        "middle" => Ok(SplitMethod::Middle),
        "median" => Ok(SplitMethod::Median),
        "mean" => Ok(SplitMethod::Mean),
        _ => Err(Error::config(format!(
            "\"{name}\" is not a split method. Choices include: middle, median, mean"
        ))),
    }
}

impl CorrelationConfig {
    pub fn from_json_str(json: &str) -> Result<CorrelationConfig, Error> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<CorrelationConfig, Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        CorrelationConfig::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization("encoding config".to_owned(), e.to_string()))
    }

    /// The tree-approximation tolerance for a given `bin_size`.
    ///
    /// When `bin_slop` is omitted, we use 1 for narrow bins and otherwise
    /// pick the value that makes `b` equal to 0.1.
    fn b(&self, bin_size: f64) -> Result<f64, Error> {
        let bin_slop = match self.bin_slop {
            Some(bin_slop) if !(bin_slop >= 0.0 && bin_slop.is_finite()) => {
                return Err(Error::config(format!(
                    "bin_slop must be non-negative. It has a value of {bin_slop}"
                )));
            }
            Some(bin_slop) => bin_slop,
            None if bin_size <= 0.1 => 1.0,
            None => 0.1 / bin_size,
        };
        Ok(bin_slop * bin_size)
    }

    pub(crate) fn validate(&self) -> Result<ValidatedConfig, Error> {
        let sep_units = match self.sep_units {
            Some(ref name) => name.parse::<SepUnits>()?.radians_per_unit(),
            None => 1.0,
        };
        let grid = BinGrid::new(
            self.min_sep,
            self.max_sep,
            self.nbins,
            self.bin_size,
            sep_units,
        )?;
        let b = self.b(grid.bin_size())?;

        let metric = self
            .metric
            .as_deref()
            .map(str::parse::<Metric>)
            .transpose()?;
        let split_method = match self.split_method {
            Some(ref name) => parse_split_method(name)?,
            None => SplitMethod::default(),
        };
        if self.num_threads == Some(0) {
            return Err(Error::config("num_threads must be positive".to_owned()));
        }

        Ok(ValidatedConfig {
            grid,
            b,
            metric,
            split_method,
            max_top: self.max_top.unwrap_or(DEFAULT_MAX_TOP),
            precision: self.precision.unwrap_or(DEFAULT_PRECISION),
            runtime: RuntimeSpec {
                num_threads: self.num_threads,
                output_dots: self.output_dots.unwrap_or(false),
            },
        })
    }
}

/// Builds a [`KKCorrelation`].
///
/// ```
/// use kkcorr::KKCorrelationBuilder;
///
/// let corr = KKCorrelationBuilder::new()
///     .min_sep(1.0)
///     .max_sep(100.0)
///     .nbins(10)
///     .build()
///     .unwrap();
/// assert_eq!(corr.bin_grid().nbins(), 10);
/// ```
#[derive(Clone, Debug, Default)]
pub struct KKCorrelationBuilder {
    config: CorrelationConfig,
}

impl KKCorrelationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// start from an existing configuration
    pub fn from_config(config: CorrelationConfig) -> Self {
        Self { config }
    }

    pub fn min_sep(mut self, min_sep: f64) -> Self {
        self.config.min_sep = Some(min_sep);
        self
    }

    pub fn max_sep(mut self, max_sep: f64) -> Self {
        self.config.max_sep = Some(max_sep);
        self
    }

    pub fn nbins(mut self, nbins: usize) -> Self {
        self.config.nbins = Some(nbins);
        self
    }

    pub fn bin_size(mut self, bin_size: f64) -> Self {
        self.config.bin_size = Some(bin_size);
        self
    }

    pub fn bin_slop(mut self, bin_slop: f64) -> Self {
        self.config.bin_slop = Some(bin_slop);
        self
    }

    pub fn sep_units(mut self, sep_units: &str) -> Self {
        self.config.sep_units = Some(sep_units.to_owned());
        self
    }

    pub fn metric(mut self, metric: &str) -> Self {
        self.config.metric = Some(metric.to_owned());
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = Some(num_threads);
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.config.precision = Some(precision);
        self
    }

    pub fn split_method(mut self, split_method: &str) -> Self {
        self.config.split_method = Some(split_method.to_owned());
        self
    }

    pub fn max_top(mut self, max_top: usize) -> Self {
        self.config.max_top = Some(max_top);
        self
    }

    pub fn output_dots(mut self, output_dots: bool) -> Self {
        self.config.output_dots = Some(output_dots);
        self
    }

    pub fn build(&self) -> Result<KKCorrelation, Error> {
        KKCorrelation::new(&self.config)
    }
}
