use super::{Catalog, CatalogError, CatalogItem};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

#[derive(serde::Serialize, serde::Deserialize)]
struct CatalogFile {
    items: Vec<CatalogItem>,
}

pub fn catalog_to_json(catalog: &Catalog) -> Result<String> {
    let file = CatalogFile {
        items: catalog.items().to_vec(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

pub fn catalog_from_json(json: &str) -> Result<Catalog> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(Catalog::new(file.items)?)
}

pub fn save_catalog_to_file(catalog: &Catalog, path: &Path) -> Result<()> {
    let json = catalog_to_json(catalog)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_catalog_from_file(path: &Path) -> Result<Catalog> {
    let json = std::fs::read_to_string(path)?;
    let catalog = catalog_from_json(&json)?;
    log::info!("Loaded {} catalog items from {:?}", catalog.len(), path);
    Ok(catalog)
}
