//! Item sources: one [`Item`] per job to submit.
//!
//! Items come from exactly one of a line-delimited text file, a JSON array
//! of string maps, or a brace-expansion pattern. Order is submission order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::braces;
use crate::error::{QupodsError, Result};

/// Per-job template variables: position, primary token, and all attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub index: usize,
    pub item: String,
    pub values: BTreeMap<String, String>,
}

impl Item {
    /// An item carrying only its primary token, exposed as `values.item` too.
    pub fn from_token(index: usize, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            index,
            values: BTreeMap::from([("item".to_string(), token.clone())]),
            item: token,
        }
    }

    pub fn from_values(index: usize, values: BTreeMap<String, String>) -> Self {
        Self {
            index,
            item: values.get("item").cloned().unwrap_or_default(),
            values,
        }
    }
}

/// Where items are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    Text(PathBuf),
    Json(PathBuf),
    Braces(String),
}

impl ItemSource {
    /// Pick the single configured source; none or several is a configuration error.
    pub fn select(
        items: Option<PathBuf>,
        json: Option<PathBuf>,
        braces: Option<String>,
    ) -> Result<Self> {
        let items = items.filter(|p| !p.as_os_str().is_empty());
        let json = json.filter(|p| !p.as_os_str().is_empty());
        let braces = braces.filter(|b| !b.is_empty());

        match (items, json, braces) {
            (Some(path), None, None) => Ok(ItemSource::Text(path)),
            (None, Some(path), None) => Ok(ItemSource::Json(path)),
            (None, None, Some(pattern)) => Ok(ItemSource::Braces(pattern)),
            (None, None, None) => Err(QupodsError::Config(
                "must specify one of --items, --json, --braces".into(),
            )),
            _ => Err(QupodsError::Config(
                "must specify only one of --items, --json, --braces".into(),
            )),
        }
    }

    pub async fn load(&self) -> Result<Vec<Item>> {
        match self {
            ItemSource::Text(path) => {
                let text = read(path).await?;
                Ok(parse_lines(&text))
            }
            ItemSource::Json(path) => {
                let text = read(path).await?;
                parse_json(&text).map_err(|source| QupodsError::Items {
                    path: path.clone(),
                    source,
                })
            }
            ItemSource::Braces(pattern) => Ok(braces::expand(pattern)?
                .into_iter()
                .enumerate()
                .map(|(i, token)| Item::from_token(i, token))
                .collect()),
        }
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| QupodsError::io(path, e))
}

/// One item per non-empty line. Whitespace-only lines are items too.
pub fn parse_lines(text: &str) -> Vec<Item> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| Item::from_token(i, line))
        .collect()
}

/// A JSON array of objects with string values only.
pub fn parse_json(text: &str) -> std::result::Result<Vec<Item>, serde_json::Error> {
    let maps: Vec<BTreeMap<String, String>> = serde_json::from_str(text)?;
    Ok(maps
        .into_iter()
        .enumerate()
        .map(|(i, values)| Item::from_values(i, values))
        .collect())
}
