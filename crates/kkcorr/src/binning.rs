//! Logarithmic separation bins.
//!
//! A [`BinGrid`] is described by `min_sep`, `max_sep`, `nbins` and
//! `bin_size` (the width of each bin in `ln(r)`). Any 3 of these determine
//! the 4th. When all 4 are given, they must be mutually consistent.
//!
//! `min_sep` and `max_sep` are expressed in "separation units". When the
//! positions are angles, these units can be anything listed in [`SepUnits`];
//! otherwise they are the same units as the positions. Internally, the pair
//! kernels always work with physical separations (e.g. radians).

use std::str::FromStr;

use kkcorr_internal::LogBinEdges;
use ndarray::Array1;

use crate::Error;

/// The relative tolerance used to check that over-specified bins are
/// consistent
const CONSISTENCY_RTOL: f64 = 1e-8;

/// Named angular units for separations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SepUnits {
    Radians,
    Hours,
    Degrees,
    Arcmin,
    Arcsec,
}

impl SepUnits {
    /// the size of a single unit, in radians
    pub fn radians_per_unit(&self) -> f64 {
        match self {
            SepUnits::Radians => 1.0,
            SepUnits::Hours => std::f64::consts::PI / 12.0,
            SepUnits::Degrees => std::f64::consts::PI / 180.0,
            SepUnits::Arcmin => std::f64::consts::PI / (180.0 * 60.0),
            SepUnits::Arcsec => std::f64::consts::PI / (180.0 * 3600.0),
        }
    }
}

impl FromStr for SepUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "radians" | "radian" | "rad" => Ok(SepUnits::Radians),
            "hours" | "hour" | "hrs" | "hr" => Ok(SepUnits::Hours),
            "degrees" | "degree" | "deg" => Ok(SepUnits::Degrees),
            "arcminutes" | "arcminute" | "arcmin" => Ok(SepUnits::Arcmin),
            "arcseconds" | "arcsecond" | "arcsec" => Ok(SepUnits::Arcsec),
            _ => Err(Error::config(format!(
                "\"{s}\" is not a known separation unit. Choices include: \
                 radians, hours, degrees, arcmin, arcsec"
            ))),
        }
    }
}

/// The logarithmic bins of a correlation function. Immutable once
/// constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct BinGrid {
    min_sep: f64,
    max_sep: f64,
    nbins: usize,
    bin_size: f64,
    sep_units: f64,
    log_sep_units: f64,
}

fn check_positive(name: &str, value: Option<f64>) -> Result<(), Error> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(Error::config(format!(
            "{name} must be positive and finite. It has a value of {v}"
        ))),
        _ => Ok(()),
    }
}

impl BinGrid {
    /// Construct a grid from 3 or 4 of the binning parameters.
    ///
    /// `sep_units` is the size of a separation unit in physical units (use
    /// 1.0 when `min_sep` and `max_sep` are already physical separations).
    ///
    /// When `nbins` is derived, it is rounded up to the nearest integer and
    /// `max_sep` is then increased to match.
    pub fn new(
        min_sep: Option<f64>,
        max_sep: Option<f64>,
        nbins: Option<usize>,
        bin_size: Option<f64>,
        sep_units: f64,
    ) -> Result<BinGrid, Error> {
        check_positive("min_sep", min_sep)?;
        check_positive("max_sep", max_sep)?;
        check_positive("bin_size", bin_size)?;
        check_positive("sep_units", Some(sep_units))?;
        if nbins == Some(0) {
            return Err(Error::config("nbins must be positive".to_owned()));
        }

        let (min_sep, max_sep, nbins, bin_size) = match (min_sep, max_sep, nbins, bin_size) {
            (Some(min_sep), Some(max_sep), Some(nbins), Some(bin_size)) => {
                check_order(min_sep, max_sep)?;
                let log_ratio = (max_sep / min_sep).ln();
                let diff = (log_ratio - (nbins as f64) * bin_size).abs();
                if diff > CONSISTENCY_RTOL * log_ratio {
                    return Err(Error::config(format!(
                        "min_sep, max_sep, nbins & bin_size are inconsistent: \
                         ln(max_sep/min_sep) = {log_ratio}, while nbins*bin_size = {}",
                        (nbins as f64) * bin_size
                    )));
                }
                (min_sep, max_sep, nbins, bin_size)
            }
            (Some(min_sep), Some(max_sep), None, Some(bin_size)) => {
                check_order(min_sep, max_sep)?;
                let nbins = ((max_sep / min_sep).ln() / bin_size).ceil() as usize;
                let max_sep = min_sep * ((nbins as f64) * bin_size).exp();
                (min_sep, max_sep, nbins, bin_size)
            }
            (Some(min_sep), Some(max_sep), Some(nbins), None) => {
                check_order(min_sep, max_sep)?;
                let bin_size = (max_sep / min_sep).ln() / (nbins as f64);
                (min_sep, max_sep, nbins, bin_size)
            }
            (Some(min_sep), None, Some(nbins), Some(bin_size)) => {
                let max_sep = min_sep * ((nbins as f64) * bin_size).exp();
                (min_sep, max_sep, nbins, bin_size)
            }
            (None, Some(max_sep), Some(nbins), Some(bin_size)) => {
                let min_sep = max_sep * (-(nbins as f64) * bin_size).exp();
                (min_sep, max_sep, nbins, bin_size)
            }
            _ => {
                return Err(Error::config(
                    "at least 3 of min_sep, max_sep, nbins & bin_size must be specified"
                        .to_owned(),
                ));
            }
        };

        // exp() can overflow or underflow for extreme inputs
        check_positive("min_sep", Some(min_sep))?;
        check_positive("max_sep", Some(max_sep))?;

        Ok(BinGrid {
            min_sep,
            max_sep,
            nbins,
            bin_size,
            sep_units,
            log_sep_units: sep_units.ln(),
        })
    }

    pub fn min_sep(&self) -> f64 {
        self.min_sep
    }

    pub fn max_sep(&self) -> f64 {
        self.max_sep
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn sep_units(&self) -> f64 {
        self.sep_units
    }

    pub fn log_sep_units(&self) -> f64 {
        self.log_sep_units
    }

    /// The nominal centers of the bins in `ln(r)`, where `r` is in
    /// separation units
    pub fn logr(&self) -> Array1<f64> {
        let log_min_sep = self.min_sep.ln();
        Array1::from_shape_fn(self.nbins, |i| {
            log_min_sep + ((i as f64) + 0.5) * self.bin_size
        })
    }

    /// Returns `true` when both grids have the same bins, measured in the
    /// same separation units.
    pub fn is_compatible(&self, other: &BinGrid) -> bool {
        self.nbins == other.nbins
            && self.min_sep == other.min_sep
            && self.max_sep == other.max_sep
            && self.bin_size == other.bin_size
            && self.sep_units == other.sep_units
    }

    /// the bin edges in physical units, as used by the pair kernels
    pub(crate) fn physical_edges(&self) -> Result<LogBinEdges, Error> {
        LogBinEdges::new(
            self.min_sep * self.sep_units,
            self.max_sep * self.sep_units,
            self.nbins,
            self.bin_size,
        )
        .map_err(Error::internal_legacy_adhoc)
    }
}

fn check_order(min_sep: f64, max_sep: f64) -> Result<(), Error> {
    if min_sep >= max_sep {
        Err(Error::config(format!(
            "min_sep ({min_sep}) must be less than max_sep ({max_sep})"
        )))
    } else {
        Ok(())
    }
}
