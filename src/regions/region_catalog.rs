//! Loads the static region hierarchy (`area.json`) and flattens it into the
//! ordered list of region codes to ingest.
//!
//! The document groups region codes under forecast centers and maps each
//! office code to display metadata:
//!
//! ```json
//! {
//!   "centers": { "010300": { "name": "関東甲信地方", "children": ["080000", "130000"] } },
//!   "offices": { "130000": { "name": "東京都" } }
//! }
//! ```

use crate::config::CatalogSource;
use crate::regions::error::CatalogLoadError;
use crate::types::region_code::RegionCode;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const CENTERS_KEY: &str = "centers";
const OFFICES_KEY: &str = "offices";

#[derive(Debug, Deserialize)]
struct CenterEntry {
    #[serde(default)]
    name: Option<String>,
    children: Vec<RegionCode>,
}

#[derive(Debug, Deserialize)]
struct OfficeEntry {
    #[serde(default)]
    name: Option<String>,
}

/// A forecast center and the region codes grouped under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Center {
    pub code: String,
    pub name: Option<String>,
    pub children: Vec<RegionCode>,
}

/// The parsed region hierarchy, in document order.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    centers: Vec<Center>,
    office_names: HashMap<RegionCode, String>,
}

impl RegionCatalog {
    /// Loads the catalog from wherever the configuration points.
    pub async fn load(source: &CatalogSource, client: &Client) -> Result<Self, CatalogLoadError> {
        match source {
            CatalogSource::File(path) => Self::from_file(path).await,
            CatalogSource::Url(url) => Self::from_url(client, url).await,
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self, CatalogLoadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CatalogLoadError::FileRead(path.to_path_buf(), e))?;
        let catalog = Self::from_value(serde_json::from_slice(&bytes)?)?;
        info!(
            "Loaded {} region codes from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub async fn from_url(client: &Client, url: &str) -> Result<Self, CatalogLoadError> {
        debug!("Fetching region catalog from {}", url);
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogLoadError::NetworkRequest(url.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => CatalogLoadError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    },
                    None => CatalogLoadError::NetworkRequest(url.to_string(), e),
                });
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogLoadError::NetworkRequest(url.to_string(), e))?;
        let catalog = Self::from_value(serde_json::from_slice(&bytes)?)?;
        info!("Loaded {} region codes from {}", catalog.len(), url);
        Ok(catalog)
    }

    /// Builds the catalog from an already-parsed document.
    ///
    /// `centers` is mandatory and every center needs a `children` array;
    /// `offices` is optional and only feeds [`RegionCatalog::name_of`].
    pub fn from_value(document: Value) -> Result<Self, CatalogLoadError> {
        let Value::Object(mut root) = document else {
            return Err(CatalogLoadError::NotAnObject);
        };
        let Some(Value::Object(centers_map)) = root.remove(CENTERS_KEY) else {
            return Err(CatalogLoadError::MissingGrouping(CENTERS_KEY));
        };

        let mut centers = Vec::with_capacity(centers_map.len());
        for (code, entry) in centers_map {
            let entry = CenterEntry::deserialize(entry).map_err(|source| {
                CatalogLoadError::InvalidCenter {
                    center: code.clone(),
                    source,
                }
            })?;
            centers.push(Center {
                code,
                name: entry.name,
                children: entry.children,
            });
        }

        // Offices only carry display names; a malformed entry just has no name.
        let office_names = match root.remove(OFFICES_KEY) {
            Some(Value::Object(offices)) => offices
                .into_iter()
                .filter_map(|(code, entry)| {
                    let name = OfficeEntry::deserialize(entry).ok()?.name?;
                    Some((RegionCode::from(code), name))
                })
                .collect(),
            _ => HashMap::new(),
        };

        Ok(Self {
            centers,
            office_names,
        })
    }

    /// Every center's children, concatenated in center-then-child order.
    /// Duplicates are kept.
    pub fn region_codes(&self) -> Vec<RegionCode> {
        self.centers
            .iter()
            .flat_map(|center| center.children.iter().cloned())
            .collect()
    }

    pub fn centers(&self) -> &[Center] {
        &self.centers
    }

    /// Display name of an office region, if the catalog lists one.
    pub fn name_of(&self, code: &RegionCode) -> Option<&str> {
        self.office_names.get(code).map(String::as_str)
    }

    /// Number of region codes, duplicates included.
    pub fn len(&self) -> usize {
        self.centers.iter().map(|c| c.children.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flattens a region hierarchy document into the ordered list of region codes.
///
/// # Examples
///
/// ```
/// use jma_forecast::{load_region_codes, RegionCode};
/// use serde_json::json;
///
/// let codes = load_region_codes(json!({
///     "centers": {
///         "010100": { "children": ["011000", "012000"] },
///         "010200": { "children": ["020000"] }
///     }
/// })).unwrap();
/// assert_eq!(codes, vec![RegionCode::from("011000"), "012000".into(), "020000".into()]);
/// ```
pub fn load_region_codes(document: Value) -> Result<Vec<RegionCode>, CatalogLoadError> {
    RegionCatalog::from_value(document).map(|catalog| catalog.region_codes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;

    const AREA_FIXTURE: &str = include_str!("../../data/fixtures/area.json");

    fn fixture_catalog() -> RegionCatalog {
        RegionCatalog::from_value(serde_json::from_str(AREA_FIXTURE).unwrap()).unwrap()
    }

    #[test]
    fn test_flattens_centers_in_document_order() {
        let catalog = fixture_catalog();
        let codes = catalog.region_codes();
        let expected: Vec<RegionCode> = ["011000", "012000", "080000", "130000", "471000"]
            .into_iter()
            .map(RegionCode::from)
            .collect();
        assert_eq!(codes, expected);
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.centers()[0].code, "010100");
        assert_eq!(catalog.centers()[0].name.as_deref(), Some("北海道地方"));
    }

    #[test]
    fn test_order_is_not_sorted_by_key() {
        let codes = load_region_codes(json!({
            "centers": {
                "zz": { "children": ["3", "1"] },
                "aa": { "children": ["2"] }
            }
        }))
        .unwrap();
        assert_eq!(codes, vec![RegionCode::from("3"), "1".into(), "2".into()]);
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let codes = load_region_codes(json!({
            "centers": {
                "a": { "children": ["130000", "140000"] },
                "b": { "children": ["130000"] }
            }
        }))
        .unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[0], codes[2]);
    }

    #[test]
    fn test_office_names() {
        let catalog = fixture_catalog();
        assert_eq!(catalog.name_of(&"130000".into()), Some("東京都"));
        assert_eq!(catalog.name_of(&"999999".into()), None);
    }

    #[test]
    fn test_missing_offices_is_tolerated() {
        let catalog = RegionCatalog::from_value(json!({
            "centers": { "a": { "children": ["130000"] } }
        }))
        .unwrap();
        assert_eq!(catalog.region_codes(), vec![RegionCode::from("130000")]);
        assert_eq!(catalog.name_of(&"130000".into()), None);
    }

    #[test]
    fn test_missing_centers_is_an_error() {
        let err = load_region_codes(json!({ "offices": {} })).unwrap_err();
        assert!(matches!(err, CatalogLoadError::MissingGrouping("centers")));

        let err = load_region_codes(json!({ "centers": ["130000"] })).unwrap_err();
        assert!(matches!(err, CatalogLoadError::MissingGrouping("centers")));

        let err = load_region_codes(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CatalogLoadError::NotAnObject));
    }

    #[test]
    fn test_center_without_children_is_an_error() {
        let err = load_region_codes(json!({
            "centers": { "010100": { "name": "北海道地方" } }
        }))
        .unwrap_err();
        match err {
            CatalogLoadError::InvalidCenter { center, .. } => assert_eq!(center, "010100"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = RegionCatalog::from_file(&path).await.unwrap_err();
        assert!(matches!(err, CatalogLoadError::JsonParse(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.json");
        let err = RegionCatalog::from_file(&path).await.unwrap_err();
        assert!(matches!(err, CatalogLoadError::FileRead(p, _) if p == path));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.json");
        tokio::fs::write(&path, AREA_FIXTURE).await.unwrap();
        let catalog = RegionCatalog::load(&CatalogSource::File(path), &Client::new())
            .await
            .unwrap();
        assert_eq!(catalog.len(), 5);
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_load_from_url() {
        let base = serve(
            Router::new()
                .route("/area.json", get(|| async { AREA_FIXTURE }))
                .route(
                    "/missing.json",
                    get(|| async { (StatusCode::NOT_FOUND, "not here") }),
                ),
        )
        .await;
        let client = Client::new();

        let source = CatalogSource::Url(format!("{base}/area.json"));
        let catalog = RegionCatalog::load(&source, &client).await.unwrap();
        assert_eq!(catalog.len(), 5);

        let err = RegionCatalog::from_url(&client, &format!("{base}/missing.json"))
            .await
            .unwrap_err();
        match err {
            CatalogLoadError::HttpStatus { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
