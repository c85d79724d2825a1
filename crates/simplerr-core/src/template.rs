//! Template rendering over a site directory.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderErrorReason,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file does not exist under the site root.
    #[error("template not found: {0}")]
    NotFound(String),

    /// The template file exists but failed to parse.
    #[error("template parse error in {name}: {message}")]
    Parse { name: String, message: String },

    /// Rendering failed, usually a helper error.
    #[error("template render error in {name}: {message}")]
    Render { name: String, message: String },
}

struct Inner {
    registry: Handlebars<'static>,
    loaded: HashSet<String>,
}

/// Lazily-loading template engine rooted at the site directory.
///
/// Templates are registered on first use and cached for the lifetime
/// of the application.
pub struct TemplateEngine {
    root: PathBuf,
    inner: Mutex<Inner>,
}

impl TemplateEngine {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: Mutex::new(Inner {
                registry: Handlebars::new(),
                loaded: HashSet::new(),
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Register a string filter usable as `{{name value}}`.
    pub fn filter<F>(&self, name: &str, filter: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner
            .registry
            .register_helper(name, Box::new(FilterHelper(Box::new(filter))));
    }

    /// Render a template by its path relative to the site root.
    pub fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        let name = name.trim_start_matches('/');
        let mut inner = self.lock();

        if !inner.loaded.contains(name) {
            let path = self.root.join(name);
            if !path.is_file() {
                return Err(TemplateError::NotFound(name.to_owned()));
            }
            inner
                .registry
                .register_template_file(name, &path)
                .map_err(|err| TemplateError::Parse {
                    name: name.to_owned(),
                    message: err.to_string(),
                })?;
            inner.loaded.insert(name.to_owned());
        }

        inner
            .registry
            .render(name, context)
            .map_err(|err| TemplateError::Render {
                name: name.to_owned(),
                message: err.to_string(),
            })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

struct FilterHelper(Box<dyn Fn(&str) -> String + Send + Sync>);

impl HelperDef for FilterHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        helper: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let param = helper
            .param(0)
            .map(|param| match param.value() {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        out.write(&(self.0)(&param))
            .map_err(|err| RenderErrorReason::Other(err.to_string()))?;
        Ok(())
    }
}
