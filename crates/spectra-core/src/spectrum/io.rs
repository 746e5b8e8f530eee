use super::Spectrum;
use crate::domain::SpectraError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SpectrumIoError {
    #[error("failed to read spectrum '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse spectrum '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write spectrum '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<SpectrumIoError> for SpectraError {
    fn from(error: SpectrumIoError) -> Self {
        let placeholder = match &error {
            SpectrumIoError::Read { .. } => "IO.SPECTRUM_READ",
            SpectrumIoError::Parse { .. } => "INPUT.SPECTRUM_PARSE",
            SpectrumIoError::Write { .. } => "IO.SPECTRUM_WRITE",
        };
        match error {
            SpectrumIoError::Parse { .. } => {
                SpectraError::configuration(placeholder, error.to_string())
            }
            _ => SpectraError::io_system(placeholder, error.to_string()),
        }
    }
}

pub fn load_spectrum(path: impl AsRef<Path>) -> Result<Spectrum, SpectrumIoError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| SpectrumIoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| SpectrumIoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_spectrum(spectrum: &Spectrum, path: impl AsRef<Path>) -> Result<(), SpectrumIoError> {
    let path = path.as_ref();
    let rendered = serde_json::to_string_pretty(spectrum).map_err(|source| {
        SpectrumIoError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SpectrumIoError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, rendered).map_err(|source| SpectrumIoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{SpectrumIoError, load_spectrum, save_spectrum};
    use crate::domain::{Quantity, SpectraError, SpectraErrorCategory, WaveUnit};
    use crate::spectrum::Spectrum;
    use tempfile::TempDir;

    #[test]
    fn saved_spectrum_loads_back_unchanged() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.json");
        let mut spectrum = Spectrum::new(WaveUnit::Wavenumber, vec![2000.0, 2000.5, 2001.0])
            .unwrap()
            .with_quantity(Quantity::Abscoeff, vec![0.1, 0.2, 0.3], "cm-1")
            .unwrap();
        spectrum.conditions.mole_fraction = Some(0.1);

        save_spectrum(&spectrum, &path).expect("spectrum should be written");
        let loaded = load_spectrum(&path).expect("spectrum should be read");
        assert_eq!(loaded, spectrum);
    }

    #[test]
    fn saturated_values_survive_a_save_and_load() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("saturated.json");
        let spectrum = Spectrum::new(WaveUnit::Wavenumber, vec![2000.0, 2001.0, 2002.0])
            .unwrap()
            .with_quantity(
                Quantity::Absorbance,
                vec![0.69, f64::INFINITY, f64::NAN],
                "",
            )
            .unwrap();

        save_spectrum(&spectrum, &path).expect("spectrum should be written");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"inf\""), "{written}");
        assert!(!written.contains("null"), "{written}");

        let loaded = load_spectrum(&path).expect("spectrum should be read");
        let absorbance = loaded.get(Quantity::Absorbance).unwrap();
        assert_eq!(absorbance[0], 0.69);
        assert_eq!(absorbance[1], f64::INFINITY);
        assert!(absorbance[2].is_nan());
    }

    #[test]
    fn unknown_value_label_is_a_parse_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("labelled.json");
        std::fs::write(
            &path,
            r#"{"waveunit": "cm-1", "wavespace": [2000.0], "quantities": {"absorbance": ["big"]}}"#,
        )
        .unwrap();

        let error = load_spectrum(&path).expect_err("unknown label");
        assert!(matches!(error, SpectrumIoError::Parse { .. }));
        assert!(error.to_string().contains("'big'"), "{error}");
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load_spectrum(temp.path().join("missing.json")).expect_err("missing file");
        assert!(matches!(error, SpectrumIoError::Read { .. }));

        let error = SpectraError::from(error);
        assert_eq!(error.category(), SpectraErrorCategory::IoSystem);
        assert_eq!(error.placeholder(), "IO.SPECTRUM_READ");
    }

    #[test]
    fn inconsistent_lengths_are_rejected_while_parsing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"waveunit": "nm", "wavespace": [500.0, 501.0], "quantities": {"abscoeff": [1.0]}}"#,
        )
        .unwrap();

        let error = load_spectrum(&path).expect_err("length mismatch");
        assert!(error.to_string().contains("SPECTRUM.LENGTH_MISMATCH"), "{error}");
        assert_eq!(
            SpectraError::from(error).category(),
            SpectraErrorCategory::Configuration
        );
    }
}
