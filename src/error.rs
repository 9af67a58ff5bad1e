use std::path::PathBuf;
use thiserror::Error;

/// Failures of the shapefile converter. Each maps to its own exit status.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Usage: district-prep convert <input.shp> <output.geojson>")]
    Usage,

    #[error("Input .shp not found: {0:?}")]
    MissingInput(PathBuf),

    #[error("Failed to read shapefile {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to write output GeoJSON {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Usage => 1,
            ConvertError::MissingInput(_) => 2,
            ConvertError::Decode { .. } => 3,
            ConvertError::Write { .. } => 4,
        }
    }
}

/// Missing inputs for the batch commands (refine, split, dissolve, preview).
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("{what} not found: {path:?}")]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("{0:?} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection(PathBuf),
}

/// Everything that is not a converter failure exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConvertError>() {
        Some(convert) => convert.exit_code(),
        None => 1,
    }
}
