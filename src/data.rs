use crate::error::PrepError;
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One `<key>.geojson` file from a per-state directory.
#[derive(Debug, Clone)]
pub struct StateFile {
    pub key: String,
    pub path: PathBuf,
}

pub fn require_file(what: &'static str, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(PrepError::MissingInput { what, path: path.to_path_buf() }.into());
    }
    Ok(())
}

pub fn require_dir(what: &'static str, path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(PrepError::MissingInput { what, path: path.to_path_buf() }.into());
    }
    Ok(())
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(PrepError::NotFeatureCollection(path.to_path_buf()).into()),
    }
}

/// `*.geojson` files in `dir`, sorted by file name so runs are reproducible.
pub fn list_state_files(dir: &Path) -> Result<Vec<StateFile>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {:?}", dir))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("geojson") {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push(StateFile { key: key.to_string(), path });
    }
    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

pub fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Overwrites `path` with compact JSON, creating parent directories.
pub fn write_feature_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, fc)
        .with_context(|| format!("Failed to serialize GeoJSON: {:?}", path))?;
    writer.flush().with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(())
}
