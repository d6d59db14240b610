use std::str::FromStr;

use crate::{Coords, Error};

/// The definition of separation used to bin pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Euclidean distance between flat (2D) positions
    Flat,
    /// Euclidean distance between 3D positions. For positions on the unit
    /// sphere, this is the chord distance.
    ThreeD,
    /// The component of the 3D separation that is perpendicular to the line
    /// of sight
    Rperp,
}

/// The kind of pairs that get accumulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessMode {
    /// every distinct pair of points within a single catalog
    Auto,
    /// every pair with one point from each of 2 catalogs
    Cross,
    /// only the pairs formed by the i-th point of each catalog
    Pairwise,
}

impl Metric {
    /// The metric that gets used when none is specified
    pub fn default_for(coords: Coords) -> Metric {
        match coords {
            Coords::Flat => Metric::Flat,
            Coords::ThreeD | Coords::Spherical => Metric::ThreeD,
        }
    }

    /// check that the metric can be used with positions in `coords`
    pub(crate) fn check_coords(self, coords: Coords) -> Result<(), Error> {
        let compatible = match self {
            Metric::Flat => coords == Coords::Flat,
            Metric::ThreeD => coords != Coords::Flat,
            // we need each point's distance along the line of sight
            Metric::Rperp => coords == Coords::ThreeD,
        };
        if compatible {
            Ok(())
        } else {
            Err(Error::incompatible_coordinates(format!(
                "the {self} metric can't be used with {coords:?} coordinates"
            )))
        }
    }

    fn choices() -> Vec<String> {
        ["Flat", "3D", "Rperp"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl core::fmt::Display for Metric {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let name = match self {
            Metric::Flat => "Flat",
            Metric::ThreeD => "3D",
            Metric::Rperp => "Rperp",
        };
        f.write_str(name)
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Metric::Flat),
            "3d" | "threed" | "euclidean" => Ok(Metric::ThreeD),
            "rperp" => Ok(Metric::Rperp),
            _ => Err(Error::metric_name(s.to_owned(), Metric::choices())),
        }
    }
}

impl core::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let name = match self {
            ProcessMode::Auto => "auto",
            ProcessMode::Cross => "cross",
            ProcessMode::Pairwise => "pairwise",
        };
        f.write_str(name)
    }
}
