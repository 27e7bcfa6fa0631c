//! Template lookup by name

use super::error::TemplateError;
use super::types::Template;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolves a template name to its reference pixels.
pub trait TemplateStore {
    fn load(&self, name: &str) -> Result<Template, TemplateError>;
}

/// File-backed store: `name` is a file name relative to `root`.
///
/// Templates are read from disk on every call, so edits to the directory are
/// picked up by the next match without restarting.
#[derive(Debug, Clone)]
pub struct DirTemplateStore {
    root: PathBuf,
}

impl DirTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// PNG files in the root directory, sorted for consistent ordering.
    pub fn list(&self) -> std::io::Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.to_lowercase().ends_with(".png"))
            .collect();
        names.sort();
        Ok(names)
    }
}

impl TemplateStore for DirTemplateStore {
    fn load(&self, name: &str) -> Result<Template, TemplateError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                name: name.to_string(),
                path,
            });
        }
        let image = image::open(&path).map_err(|source| TemplateError::Decode {
            name: name.to_string(),
            source,
        })?;
        let template = Template::new(name, image.to_rgb8());
        template.ensure_not_empty()?;
        Ok(template)
    }
}

/// Preloaded templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, Template>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn with(mut self, template: Template) -> Self {
        self.insert(template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, name: &str) -> Result<Template, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::Unknown {
                name: name.to_string(),
            })
    }
}
