//! Defines [`KKCorrelation`], the accumulator of a scalar-scalar two-point
//! correlation function.
//!
//! # Lifecycle
//!
//! An accumulator starts out [`AccumState::Empty`]. Each call to one of the
//! `process_*` methods adds pairs to the raw per-bin sums (and moves the
//! accumulator to [`AccumState::Accumulating`]). Accumulators can be merged
//! while they hold raw sums. Finally, [`KKCorrelation::finalize`] divides
//! the sums by the total weight in each bin, which is only allowed once.
//! [`KKCorrelation::clear`] returns an accumulator of any state to `Empty`.
//!
//! [`KKCorrelation::process`] drives this entire sequence for lists of
//! catalogs.
//!
//! Operations that aren't allowed in the current state return an error and
//! leave the accumulator untouched.

use std::path::Path;
use std::sync::Arc;

use kkcorr_internal::{
    BinnedSums, Distance, FlatDistance, KField, LogBinEdges, RperpDistance, ScalarPoints,
    SplitMethod, ThreeDDistance, process_auto, process_cross, process_pairwise,
};
use ndarray::{Array1, ArrayView1};
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::config::ValidatedConfig;
use crate::io::{ColumnTable, FileType};
use crate::{
    BinGrid, Catalog, Coords, CorrelationConfig, Error, Metric, ProcessMode, RuntimeSpec,
    calculate_var_k,
};

/// The names of the columns in output files
const COLUMN_NAMES: [&str; 7] = [
    "R_nom", "meanR", "meanlogR", "xi", "sigma_xi", "weight", "npairs",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumState {
    /// no pairs have been accumulated since construction (or the last clear)
    Empty,
    /// the accumulator holds raw sums
    Accumulating,
    /// the sums have been normalized
    Finalized,
}

impl AccumState {
    fn name(&self) -> &'static str {
        match self {
            AccumState::Empty => "Empty",
            AccumState::Accumulating => "Accumulating",
            AccumState::Finalized => "Finalized",
        }
    }
}

/// The spatial inputs to one of the pair kernels
enum KernelInput<'a> {
    Auto(&'a KField),
    Cross(&'a KField, &'a KField),
    Pairwise(&'a ScalarPoints<'a>, &'a ScalarPoints<'a>),
}

impl KernelInput<'_> {
    fn mode(&self) -> ProcessMode {
        match self {
            KernelInput::Auto(_) => ProcessMode::Auto,
            KernelInput::Cross(..) => ProcessMode::Cross,
            KernelInput::Pairwise(..) => ProcessMode::Pairwise,
        }
    }
}

/// execute `op` within `pool` (or rayon's global pool, if there isn't one)
fn in_pool<R: Send>(pool: Option<&ThreadPool>, op: impl FnOnce() -> R + Send) -> R {
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Accumulates a scalar-scalar (KK) two-point correlation function.
///
/// Before [`KKCorrelation::finalize`] is called, [`KKCorrelation::xi`],
/// [`KKCorrelation::meanr`], [`KKCorrelation::meanlogr`],
/// [`KKCorrelation::weight`] and [`KKCorrelation::npairs`] hold raw sums.
/// Afterwards, `xi`, `meanr` and `meanlogr` hold weighted means, `meanr`
/// and `meanlogr` are expressed in separation units, and
/// [`KKCorrelation::varxi`] holds the shot-noise variance of `xi`.
///
/// Cloning an accumulator produces an independent copy (clones share the
/// thread pool, if any).
#[derive(Clone)]
pub struct KKCorrelation {
    grid: BinGrid,
    // the bins in physical units
    edges: LogBinEdges,
    b: f64,
    metric: Option<Metric>,
    split_method: SplitMethod,
    max_top: usize,
    precision: usize,
    runtime: RuntimeSpec,
    pool: Option<Arc<ThreadPool>>,
    sums: BinnedSums,
    varxi: Array1<f64>,
    state: AccumState,
}

impl KKCorrelation {
    pub fn new(config: &CorrelationConfig) -> Result<KKCorrelation, Error> {
        let ValidatedConfig {
            grid,
            b,
            metric,
            split_method,
            max_top,
            precision,
            runtime,
        } = config.validate()?;

        let pool = match runtime.num_threads {
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|_| Error::internal_legacy_adhoc("failed to build the thread pool"))?;
                Some(Arc::new(pool))
            }
            None => None,
        };

        let edges = grid.physical_edges()?;
        let nbins = grid.nbins();
        debug!(
            nbins,
            min_sep = grid.min_sep(),
            max_sep = grid.max_sep(),
            bin_size = grid.bin_size(),
            b,
            "built KKCorrelation"
        );
        Ok(KKCorrelation {
            grid,
            edges,
            b,
            metric,
            split_method,
            max_top,
            precision,
            runtime,
            pool,
            sums: BinnedSums::zeros(nbins),
            varxi: Array1::zeros(nbins),
            state: AccumState::Empty,
        })
    }

    pub fn bin_grid(&self) -> &BinGrid {
        &self.grid
    }

    /// the tree-approximation tolerance (`bin_slop * bin_size`)
    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn state(&self) -> AccumState {
        self.state
    }

    pub fn runtime(&self) -> &RuntimeSpec {
        &self.runtime
    }

    /// The nominal centers of the bins in `ln(r)` (`r` in separation units)
    pub fn logr(&self) -> Array1<f64> {
        self.grid.logr()
    }

    pub fn xi(&self) -> ArrayView1<'_, f64> {
        self.sums.row(BinnedSums::XI)
    }

    pub fn meanr(&self) -> ArrayView1<'_, f64> {
        self.sums.row(BinnedSums::MEANR)
    }

    pub fn meanlogr(&self) -> ArrayView1<'_, f64> {
        self.sums.row(BinnedSums::MEANLOGR)
    }

    pub fn weight(&self) -> ArrayView1<'_, f64> {
        self.sums.row(BinnedSums::WEIGHT)
    }

    pub fn npairs(&self) -> ArrayView1<'_, f64> {
        self.sums.row(BinnedSums::NPAIRS)
    }

    /// The shot-noise variance of `xi`. This is only meaningful after
    /// finalization.
    pub fn varxi(&self) -> ArrayView1<'_, f64> {
        self.varxi.view()
    }

    /// Reset all sums to zero. This is allowed in every state.
    pub fn clear(&mut self) {
        self.sums.clear();
        self.varxi.fill(0.0);
        self.state = AccumState::Empty;
    }

    fn check_can_process(&self) -> Result<(), Error> {
        if self.state == AccumState::Finalized {
            Err(Error::state("process", self.state.name()))
        } else {
            Ok(())
        }
    }

    /// pick the metric and check that it's compatible with `coords`
    fn resolve_metric(&self, metric: Option<Metric>, coords: Coords) -> Result<Metric, Error> {
        let metric = metric
            .or(self.metric)
            .unwrap_or_else(|| Metric::default_for(coords));
        metric.check_coords(coords)?;
        Ok(metric)
    }

    fn build_field(&self, catalog: &Catalog) -> Result<KField, Error> {
        let points = catalog.points()?;
        let field = KField::new(
            &points,
            self.edges.min_sep(),
            self.b,
            self.split_method,
            self.max_top,
        );
        debug!(
            catalog = catalog.name(),
            n_points = field.n_points(),
            n_top_level = field.n_top_level(),
            "built field"
        );
        Ok(field)
    }

    /// resolve the (metric, mode) combination to a kernel and execute it
    fn exec_kernel(&mut self, input: KernelInput, metric: Metric) -> Result<(), Error> {
        debug!(mode = %input.mode(), %metric, "executing pair kernel");
        let result = match metric {
            Metric::Flat => self.exec_kernel_with::<FlatDistance>(input),
            Metric::ThreeD => self.exec_kernel_with::<ThreeDDistance>(input),
            Metric::Rperp => self.exec_kernel_with::<RperpDistance>(input),
        };
        result.map_err(Error::internal_legacy_adhoc)?;
        self.state = AccumState::Accumulating;
        Ok(())
    }

    fn exec_kernel_with<M: Distance>(&mut self, input: KernelInput) -> Result<(), &'static str> {
        let sums = &mut self.sums;
        let edges = &self.edges;
        let (b, output_dots) = (self.b, self.runtime.output_dots);
        in_pool(self.pool.as_deref(), || match input {
            KernelInput::Auto(field) => process_auto::<M>(sums, field, edges, b, output_dots),
            KernelInput::Cross(field1, field2) => {
                process_cross::<M>(sums, field1, field2, edges, b, output_dots)
            }
            KernelInput::Pairwise(points1, points2) => {
                process_pairwise::<M>(sums, points1, points2, edges)
            }
        })
    }

    /// Accumulate every distinct pair of points in `catalog`.
    ///
    /// When `metric` is `None`, the configured metric is used (or, if none
    /// was configured, the default metric for the catalog's coordinates).
    pub fn process_auto(&mut self, catalog: &Catalog, metric: Option<Metric>) -> Result<(), Error> {
        self.check_can_process()?;
        let metric = self.resolve_metric(metric, catalog.coords())?;
        info!(catalog = catalog.name(), %metric, "starting auto-correlation");
        let field = self.build_field(catalog)?;
        self.exec_kernel(KernelInput::Auto(&field), metric)
    }

    /// Accumulate every pair with one point from `catalog1` and the other
    /// from `catalog2`.
    pub fn process_cross(
        &mut self,
        catalog1: &Catalog,
        catalog2: &Catalog,
        metric: Option<Metric>,
    ) -> Result<(), Error> {
        self.check_can_process()?;
        check_same_coords(catalog1, catalog2)?;
        let metric = self.resolve_metric(metric, catalog1.coords())?;
        info!(
            catalog1 = catalog1.name(),
            catalog2 = catalog2.name(),
            %metric,
            "starting cross-correlation"
        );
        let field1 = self.build_field(catalog1)?;
        let field2 = self.build_field(catalog2)?;
        self.exec_kernel(KernelInput::Cross(&field1, &field2), metric)
    }

    /// Accumulate the pairs formed by the i-th point of `catalog1` and the
    /// i-th point of `catalog2` (for every i).
    ///
    /// A pair where either point has zero weight is skipped entirely, so it
    /// doesn't count towards `npairs` either. This matches how the tree
    /// kernels of [`Self::process_auto`] and [`Self::process_cross`] drop
    /// zero-weight points.
    pub fn process_pairwise(
        &mut self,
        catalog1: &Catalog,
        catalog2: &Catalog,
        metric: Option<Metric>,
    ) -> Result<(), Error> {
        self.check_can_process()?;
        check_same_coords(catalog1, catalog2)?;
        if catalog1.n_points() != catalog2.n_points() {
            return Err(Error::incompatible(format!(
                "pairwise processing needs catalogs of equal length, not {} and {}",
                catalog1.n_points(),
                catalog2.n_points()
            )));
        }
        let metric = self.resolve_metric(metric, catalog1.coords())?;
        info!(
            catalog1 = catalog1.name(),
            catalog2 = catalog2.name(),
            %metric,
            "starting pairwise correlation"
        );
        let points1 = catalog1.points()?;
        let points2 = catalog2.points()?;
        self.exec_kernel(KernelInput::Pairwise(&points1, &points2), metric)
    }

    /// Convert the raw sums into the correlation function.
    ///
    /// `var1` and `var2` are the variances of the scalar values of the 2
    /// fields (they're equal for an auto-correlation). Bins without any
    /// weight report the nominal separation of the bin.
    pub fn finalize(&mut self, var1: f64, var2: f64) -> Result<(), Error> {
        if self.state == AccumState::Finalized {
            return Err(Error::state("finalize", self.state.name()));
        }

        let logr = self.grid.logr();
        let (sep_units, log_sep_units) = (self.grid.sep_units(), self.grid.log_sep_units());
        let mut data = self.sums.as_array_view_mut();
        for i in 0..self.grid.nbins() {
            let weight = data[[BinnedSums::WEIGHT, i]];
            if weight != 0.0 {
                data[[BinnedSums::XI, i]] /= weight;
                data[[BinnedSums::MEANR, i]] /= weight * sep_units;
                data[[BinnedSums::MEANLOGR, i]] = data[[BinnedSums::MEANLOGR, i]] / weight
                    - log_sep_units;
                self.varxi[i] = var1 * var2 / weight;
            } else {
                data[[BinnedSums::MEANR, i]] = logr[i].exp();
                data[[BinnedSums::MEANLOGR, i]] = logr[i];
                self.varxi[i] = 0.0;
            }
        }
        self.state = AccumState::Finalized;
        Ok(())
    }

    /// Add the raw sums of `other` to `self`.
    ///
    /// Both accumulators must hold raw sums (i.e. neither can be finalized)
    /// and they must have the same bins in the same separation units.
    pub fn merge(&mut self, other: &KKCorrelation) -> Result<(), Error> {
        if self.state == AccumState::Finalized || other.state == AccumState::Finalized {
            return Err(Error::state("merge", AccumState::Finalized.name()));
        }
        if !self.grid.is_compatible(&other.grid) {
            return Err(Error::incompatible(format!(
                "can't merge a correlation with {} bins spanning [{}, {}) (separation \
                 unit = {} radians) into one with {} bins spanning [{}, {}) (separation \
                 unit = {} radians)",
                other.grid.nbins(),
                other.grid.min_sep(),
                other.grid.max_sep(),
                other.grid.sep_units(),
                self.grid.nbins(),
                self.grid.min_sep(),
                self.grid.max_sep(),
                self.grid.sep_units()
            )));
        }
        self.sums.merge(&other.sums);
        if other.state == AccumState::Accumulating {
            self.state = AccumState::Accumulating;
        }
        Ok(())
    }

    /// Compute the correlation function from scratch.
    ///
    /// When `cat2` is `None` (or empty), this computes the auto-correlation
    /// of the catalogs in `cat1` (pairs within each catalog and pairs across
    /// catalogs). Otherwise, it computes the cross-correlation between every
    /// catalog in `cat1` and every catalog in `cat2`. Any previous results
    /// are discarded, and the accumulator is finalized on success.
    pub fn process(
        &mut self,
        cat1: &[&Catalog],
        cat2: Option<&[&Catalog]>,
        metric: Option<Metric>,
    ) -> Result<(), Error> {
        if cat1.is_empty() {
            return Err(Error::empty_input());
        }
        let cat2 = cat2.filter(|cats| !cats.is_empty());

        // check all of the inputs before we touch the sums
        let coords = cat1[0].coords();
        for catalog in cat1.iter().chain(cat2.unwrap_or(&[])) {
            if catalog.coords() != coords {
                return Err(Error::incompatible_coordinates(format!(
                    "{} has {:?} coordinates, while {} has {:?} coordinates",
                    cat1[0].name(),
                    coords,
                    catalog.name(),
                    catalog.coords()
                )));
            }
        }
        let metric = self.resolve_metric(metric, coords)?;

        self.clear();
        let (var1, var2) = match cat2 {
            None => {
                let vark = calculate_var_k(cat1);
                info!(vark, sig_k = vark.sqrt(), "computed variance");
                for (i, catalog) in cat1.iter().enumerate() {
                    self.process_auto(catalog, Some(metric))?;
                    for other in &cat1[i + 1..] {
                        self.process_cross(catalog, other, Some(metric))?;
                    }
                }
                (vark, vark)
            }
            Some(cat2) => {
                let vark1 = calculate_var_k(cat1);
                let vark2 = calculate_var_k(cat2);
                info!(vark1, sig_k1 = vark1.sqrt(), "computed variance of cat1");
                info!(vark2, sig_k2 = vark2.sqrt(), "computed variance of cat2");
                for catalog1 in cat1 {
                    for catalog2 in cat2 {
                        self.process_cross(catalog1, catalog2, Some(metric))?;
                    }
                }
                (vark1, vark2)
            }
        };
        self.finalize(var1, var2)
    }

    /// Write the finalized correlation function to `path`, inferring the
    /// file type from the extension and using the configured precision.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        self.write_with(path, None, None)
    }

    /// Write the finalized correlation function to `path`.
    ///
    /// The file holds the columns `R_nom`, `meanR`, `meanlogR`, `xi`,
    /// `sigma_xi`, `weight` and `npairs`, with one row per bin.
    pub fn write_with(
        &self,
        path: &Path,
        file_type: Option<FileType>,
        precision: Option<usize>,
    ) -> Result<(), Error> {
        if self.state != AccumState::Finalized {
            return Err(Error::state("write", self.state.name()));
        }
        let file_type = file_type.unwrap_or_else(|| FileType::from_path(path));
        info!(path = %path.display(), ?file_type, "writing KK correlations");

        let columns = [
            self.logr().mapv(f64::exp).to_vec(),
            self.meanr().to_vec(),
            self.meanlogr().to_vec(),
            self.xi().to_vec(),
            self.varxi.mapv(f64::sqrt).to_vec(),
            self.weight().to_vec(),
            self.npairs().to_vec(),
        ];
        let mut table = ColumnTable::new();
        for (name, column) in COLUMN_NAMES.into_iter().zip(columns) {
            table.push(name, column);
        }
        table.write(path, file_type, precision.unwrap_or(self.precision))
    }

    /// Read a correlation function from `path`, inferring the file type from
    /// the extension.
    pub fn read(&mut self, path: &Path) -> Result<(), Error> {
        self.read_with(path, None)
    }

    /// Read a correlation function that was written by [`Self::write_with`].
    ///
    /// The accumulator ends up in the [`AccumState::Finalized`] state. The
    /// raw sums can't be recovered from a file, so the result can't be
    /// merged with other accumulators.
    ///
    /// We don't check that the file's bins match `self`'s bins (the `R_nom`
    /// column is ignored). That is the caller's responsibility.
    pub fn read_with(&mut self, path: &Path, file_type: Option<FileType>) -> Result<(), Error> {
        let file_type = file_type.unwrap_or_else(|| FileType::from_path(path));
        info!(path = %path.display(), ?file_type, "reading KK correlations");
        let table = ColumnTable::read(path, file_type)?;

        let nbins = self.grid.nbins();
        let column = |name| table_column(&table, name, nbins, path);
        // validate every column before modifying anything
        for name in COLUMN_NAMES {
            column(name)?;
        }

        let rows = [
            (BinnedSums::MEANR, "meanR"),
            (BinnedSums::MEANLOGR, "meanlogR"),
            (BinnedSums::XI, "xi"),
            (BinnedSums::WEIGHT, "weight"),
            (BinnedSums::NPAIRS, "npairs"),
        ];
        let mut data = self.sums.as_array_view_mut();
        for (row, name) in rows {
            let values = column(name)?;
            for i in 0..nbins {
                data[[row, i]] = values[i];
            }
        }
        let sigma_xi = column("sigma_xi")?;
        for i in 0..nbins {
            self.varxi[i] = sigma_xi[i] * sigma_xi[i];
        }
        self.state = AccumState::Finalized;
        Ok(())
    }
}

/// fetch a column of `table` (read from `path`) that must hold `nbins` rows
fn table_column<'t>(
    table: &'t ColumnTable,
    name: &str,
    nbins: usize,
    path: &Path,
) -> Result<&'t [f64], Error> {
    match table.column(name) {
        Some(values) if values.len() == nbins => Ok(values),
        Some(values) => Err(Error::table_shape(format!(
            "the {name} column of {} has {} entries, rather than {nbins}",
            path.display(),
            values.len()
        ))),
        None => Err(Error::table_shape(format!(
            "{} has no {name} column",
            path.display()
        ))),
    }
}

fn check_same_coords(catalog1: &Catalog, catalog2: &Catalog) -> Result<(), Error> {
    if catalog1.coords() != catalog2.coords() {
        Err(Error::incompatible_coordinates(format!(
            "{} has {:?} coordinates, while {} has {:?} coordinates",
            catalog1.name(),
            catalog1.coords(),
            catalog2.name(),
            catalog2.coords()
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KKCorrelationBuilder;

    fn two_point_catalogs() -> (Catalog, Catalog) {
        let cat1 = Catalog::from_flat(&[0.0], &[0.0], &[2.0], None).unwrap();
        let cat2 = Catalog::from_flat(&[3.0], &[4.0], &[-3.0], None).unwrap();
        (cat1, cat2)
    }

    fn build() -> KKCorrelation {
        KKCorrelationBuilder::new()
            .min_sep(1.0)
            .max_sep(100.0)
            .nbins(4)
            .build()
            .unwrap()
    }

    #[test]
    fn state_transitions() {
        let (cat1, cat2) = two_point_catalogs();
        let mut corr = build();
        assert_eq!(corr.state(), AccumState::Empty);

        corr.process_cross(&cat1, &cat2, None).unwrap();
        assert_eq!(corr.state(), AccumState::Accumulating);

        corr.finalize(1.0, 1.0).unwrap();
        assert_eq!(corr.state(), AccumState::Finalized);

        // neither processing nor finalizing is allowed anymore
        let snapshot = corr.clone();
        assert!(corr.finalize(1.0, 1.0).unwrap_err().is_state());
        assert!(corr.process_auto(&cat1, None).unwrap_err().is_state());
        assert_eq!(corr.xi(), snapshot.xi());
        assert_eq!(corr.varxi(), snapshot.varxi());

        corr.clear();
        assert_eq!(corr.state(), AccumState::Empty);
        assert!(corr.process_auto(&cat1, None).is_ok());
    }

    #[test]
    fn finalize_empty() {
        let mut corr = build();
        corr.finalize(1.0, 1.0).unwrap();
        let logr = corr.logr();
        for i in 0..4 {
            assert_eq!(corr.meanr()[i], logr[i].exp());
            assert_eq!(corr.meanlogr()[i], logr[i]);
            assert_eq!(corr.xi()[i], 0.0);
            assert_eq!(corr.varxi()[i], 0.0);
        }
    }

    #[test]
    fn mismatched_coords() {
        let (cat1, _) = two_point_catalogs();
        let cat3 = Catalog::from_xyz(&[1.0], &[1.0], &[1.0], &[1.0], None).unwrap();
        let mut corr = build();
        let err = corr.process_cross(&cat1, &cat3, None).unwrap_err();
        assert!(err.is_incompatible_coordinates());
        let err = corr.process_pairwise(&cat1, &cat3, None).unwrap_err();
        assert!(err.is_incompatible_coordinates());
        let err = corr.process_auto(&cat1, Some(Metric::Rperp)).unwrap_err();
        assert!(err.is_incompatible_coordinates());
        assert_eq!(corr.state(), AccumState::Empty);
    }

    #[test]
    fn sep_units_finalize() {
        // separations are physical radians, the bins are in arcmin
        let arcmin = std::f64::consts::PI / (180.0 * 60.0);
        let mut corr = KKCorrelationBuilder::new()
            .min_sep(1.0)
            .max_sep(10.0)
            .nbins(1)
            .sep_units("arcmin")
            .build()
            .unwrap();
        let cat1 = Catalog::from_ra_dec(&[0.0], &[0.0], None, &[1.0], None).unwrap();
        let cat2 = Catalog::from_ra_dec(&[5.0 * arcmin], &[0.0], None, &[1.0], None).unwrap();
        corr.process_cross(&cat1, &cat2, None).unwrap();
        assert_eq!(corr.npairs()[0], 1.0);
        corr.finalize(0.0, 0.0).unwrap();

        // the chord distance is extremely close to the arc length
        assert!((corr.meanr()[0] - 5.0).abs() < 1e-6);
        assert!((corr.meanlogr()[0] - 5.0_f64.ln()).abs() < 1e-6);
    }
}
