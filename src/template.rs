//! Job template rendering.
//!
//! Templates are minijinja text rendered against an [`Item`]:
//! `{{ index }}`, `{{ item }}` and `{{ values.KEY }}`. Undefined references
//! are errors. The rendered manifest must be a YAML document carrying
//! `metadata.name`, which becomes the job name.

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Deserialize;

use crate::error::{QupodsError, Result};
use crate::items::Item;

/// A manifest rendered for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedJob {
    pub name: String,
    pub manifest: String,
}

#[derive(Debug, Deserialize)]
struct ManifestHead {
    #[serde(default)]
    metadata: Option<ManifestMetadata>,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    #[serde(default)]
    name: Option<String>,
}

pub struct TemplateRenderer {
    env: Environment<'static>,
    source: String,
}

impl TemplateRenderer {
    /// Compile `source` once up front so syntax errors surface before any submission.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let syntax = Environment::new();
        syntax
            .template_from_str(&source)
            .map_err(QupodsError::Template)?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Ok(Self { env, source })
    }

    /// Render the manifest for `item` and read its job name.
    pub fn render(&self, item: &Item) -> Result<RenderedJob> {
        let manifest = self
            .env
            .render_str(&self.source, Value::from_serialize(item))
            .map_err(|source| QupodsError::Render {
                index: item.index,
                source,
            })?;
        let name = job_name(item.index, &manifest)?;
        Ok(RenderedJob { name, manifest })
    }
}

/// Read `metadata.name` from a rendered manifest.
pub fn job_name(index: usize, manifest: &str) -> Result<String> {
    let head: ManifestHead = serde_yaml::from_str(manifest)
        .map_err(|source| QupodsError::Manifest { index, source })?;
    head.metadata
        .and_then(|m| m.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or(QupodsError::MissingJobName { index })
}
