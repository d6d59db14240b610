mod common;

use std::io::Write;

use common::{assert_allclose, to_catalog};
use kkcorr::{AccumState, CorrelationConfig, FileType, KKCorrelation, KKCorrelationBuilder};
use kkcorr_test::RandomCatalog;

fn finalized_corr() -> KKCorrelation {
    let data = RandomCatalog::from_random(400, 2, 10.0, 8675309);
    let catalog = to_catalog(&data);
    // the last bin doesn't get any pairs
    let mut corr = KKCorrelationBuilder::new()
        .min_sep(0.5)
        .max_sep(32.0)
        .nbins(6)
        .build()
        .unwrap();
    corr.process(&[&catalog], None, None).unwrap();
    corr
}

fn fresh_corr() -> KKCorrelation {
    KKCorrelationBuilder::new()
        .min_sep(0.5)
        .max_sep(32.0)
        .nbins(6)
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn binary_round_trip() {
        let corr = finalized_corr();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kk.bin");
        corr.write(&path).unwrap();

        let mut loaded = fresh_corr();
        loaded.read(&path).unwrap();
        assert_eq!(loaded.state(), AccumState::Finalized);
        assert_eq!(loaded.xi(), corr.xi());
        assert_eq!(loaded.meanr(), corr.meanr());
        assert_eq!(loaded.meanlogr(), corr.meanlogr());
        assert_eq!(loaded.weight(), corr.weight());
        assert_eq!(loaded.npairs(), corr.npairs());
        let varxi = corr.varxi().to_vec();
        assert_allclose(loaded.varxi(), &varxi, 1e-15, 0.0, "varxi");
    }

    #[test]
    fn ascii_round_trip() {
        let corr = finalized_corr();
        assert_eq!(corr.weight()[5], 0.0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kk.out");
        corr.write_with(&path, None, Some(10)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        let names: Vec<&str> = header.trim_start_matches('#').split_whitespace().collect();
        assert_eq!(
            names,
            ["R_nom", "meanR", "meanlogR", "xi", "sigma_xi", "weight", "npairs"]
        );
        assert_eq!(text.lines().count(), 7);

        let mut loaded = fresh_corr();
        loaded.read_with(&path, Some(FileType::Ascii)).unwrap();
        let rtol = 1e-9;
        assert_allclose(loaded.xi(), &corr.xi().to_vec(), rtol, 0.0, "xi");
        assert_allclose(loaded.meanr(), &corr.meanr().to_vec(), rtol, 0.0, "meanr");
        let meanlogr = corr.meanlogr().to_vec();
        assert_allclose(loaded.meanlogr(), &meanlogr, rtol, 0.0, "meanlogr");
        assert_allclose(loaded.weight(), &corr.weight().to_vec(), rtol, 0.0, "weight");
        assert_eq!(loaded.npairs(), corr.npairs());
        let varxi = corr.varxi().to_vec();
        assert_allclose(loaded.varxi(), &varxi, 1e-8, 0.0, "varxi");
    }

    #[test]
    fn default_precision() {
        let corr = finalized_corr();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kk.dat");
        corr.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let first_row = text.lines().nth(1).unwrap();
        // R_nom of the first bin is 0.5*sqrt(2)
        let value = first_row.split_whitespace().next().unwrap();
        assert_eq!(value, "7.0711e-01");
    }

    #[test]
    fn write_requires_finalized() {
        let corr = fresh_corr();
        let dir = tempfile::tempdir().unwrap();
        let err = corr.write(&dir.path().join("kk.out")).unwrap_err();
        assert!(err.is_state());
        assert!(!dir.path().join("kk.out").exists());
    }

    #[test]
    fn read_errors() {
        let dir = tempfile::tempdir().unwrap();

        let mut corr = fresh_corr();
        let err = corr.read(&dir.path().join("missing.out")).unwrap_err();
        assert!(err.is_io());

        // a required column is missing
        let path = dir.path().join("partial.out");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#  R_nom  meanR  meanlogR  xi  weight  npairs").unwrap();
        for _ in 0..6 {
            writeln!(file, "1.0 1.0 0.0 0.5 2.0 2.0").unwrap();
        }
        drop(file);
        assert!(corr.read(&path).unwrap_err().is_table_shape());

        // the wrong number of rows
        let corr_src = finalized_corr();
        let path = dir.path().join("kk.out");
        corr_src.write(&path).unwrap();
        let mut fewer_bins = KKCorrelationBuilder::new()
            .min_sep(0.5)
            .max_sep(16.0)
            .nbins(5)
            .build()
            .unwrap();
        assert!(fewer_bins.read(&path).unwrap_err().is_table_shape());

        assert_eq!(corr.state(), AccumState::Empty);
        assert_eq!(fewer_bins.state(), AccumState::Empty);
    }

    #[test]
    fn read_results_are_not_mergeable() {
        let corr = finalized_corr();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kk.bin");
        corr.write(&path).unwrap();

        let mut loaded = fresh_corr();
        loaded.read(&path).unwrap();
        let mut target = fresh_corr();
        assert!(target.merge(&loaded).unwrap_err().is_state());
    }

    #[test]
    fn config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"min_sep": 0.5, "max_sep": 32.0, "nbins": 6, "precision": 6}"#,
        )
        .unwrap();
        let config = CorrelationConfig::from_json_file(&path).unwrap();
        let corr = KKCorrelation::new(&config).unwrap();
        assert_eq!(corr.bin_grid().nbins(), 6);

        std::fs::write(&path, r#"{"min_sep": 0.5, "max_sep": 32.0, "nbin": 6}"#).unwrap();
        let err = CorrelationConfig::from_json_file(&path).unwrap_err();
        assert!(err.is_config());
    }
}
