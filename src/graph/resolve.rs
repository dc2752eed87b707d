//! Import specifier resolution against the candidate file set.

use crate::utils::paths::{extension_of, join_normalized, parent_dir};
use std::collections::HashSet;

const SCRIPT_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs", ".py"];

/// Maps import specifiers to repository files. External packages resolve to
/// `None`.
pub struct ModuleResolver<'a> {
    paths: HashSet<&'a str>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self { paths: paths.into_iter().collect() }
    }

    pub fn resolve(&self, importer: &str, specifier: &str) -> Option<String> {
        let resolved = if matches!(extension_of(importer).as_deref(), Some("py" | "pyi")) {
            self.resolve_python(importer, specifier)
        } else {
            self.resolve_script(importer, specifier)
        };
        resolved.filter(|path| path != importer)
    }

    fn resolve_script(&self, importer: &str, specifier: &str) -> Option<String> {
        let base = if specifier.starts_with("./") || specifier.starts_with("../") {
            join_normalized(parent_dir(importer), specifier)?
        } else {
            join_normalized("", specifier.trim_start_matches('/'))?
        };
        if base.is_empty() {
            return None;
        }
        if let Some(found) = self.probe(&base) {
            return Some(found);
        }
        // ESM sources import `./x.js` while the file on disk is `x.ts`.
        let (stem, ext) = base.rsplit_once('.')?;
        if matches!(ext, "js" | "jsx" | "mjs" | "cjs") && !stem.ends_with('/') {
            return self.probe(stem);
        }
        None
    }

    fn resolve_python(&self, importer: &str, specifier: &str) -> Option<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let module_path = specifier[dots..].replace('.', "/");

        if dots > 0 {
            let mut dir = parent_dir(importer).to_string();
            for _ in 1..dots {
                dir = join_normalized(&dir, "..")?;
            }
            let base = join_normalized(&dir, &module_path)?;
            return self.probe_python(&base);
        }

        // Absolute imports: nearest enclosing directory first, then the root.
        let mut dir = parent_dir(importer);
        loop {
            if let Some(base) = join_normalized(dir, &module_path) {
                if let Some(found) = self.probe_python(&base) {
                    return Some(found);
                }
            }
            if dir.is_empty() {
                return None;
            }
            dir = parent_dir(dir);
        }
    }

    fn probe(&self, base: &str) -> Option<String> {
        if self.paths.contains(base) {
            return Some(base.to_string());
        }
        SCRIPT_EXTENSIONS
            .iter()
            .map(|ext| format!("{base}{ext}"))
            .chain(SCRIPT_EXTENSIONS.iter().map(|ext| format!("{base}/index{ext}")))
            .chain(std::iter::once(format!("{base}/__init__.py")))
            .find(|candidate| self.paths.contains(candidate.as_str()))
    }

    fn probe_python(&self, base: &str) -> Option<String> {
        let candidates = if base.is_empty() {
            vec!["__init__.py".to_string()]
        } else {
            vec![format!("{base}.py"), format!("{base}.pyi"), format!("{base}/__init__.py")]
        };
        candidates.into_iter().find(|candidate| self.paths.contains(candidate.as_str()))
    }
}
