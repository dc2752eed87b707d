//! Detection of files that only add noise to a diff context: lock files,
//! minified bundles and vendored code.

const MINIFIED_INDICATORS: &[&str] = &[".min.", ".bundle.", ".packed."];

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "pipfile.lock",
    "cargo.lock",
    "gemfile.lock",
    "composer.lock",
    "go.sum",
];

const VENDOR_DIRS: &[&str] =
    &["vendor/", "vendors/", "third_party/", "third-party/", "thirdparty/", "node_modules/"];

pub fn is_lock_file(rel_path: &str) -> bool {
    let name = crate::utils::paths::file_name(rel_path).to_ascii_lowercase();
    LOCK_FILES.contains(&name.as_str())
}

pub fn is_minified_name(rel_path: &str) -> bool {
    let name = crate::utils::paths::file_name(rel_path).to_ascii_lowercase();
    MINIFIED_INDICATORS.iter().any(|ind| name.contains(ind))
}

pub fn is_vendored(rel_path: &str) -> bool {
    let lower = format!("/{}", rel_path.to_ascii_lowercase());
    VENDOR_DIRS.iter().any(|dir| lower.contains(&format!("/{dir}")))
}

pub fn is_noise_path(rel_path: &str) -> bool {
    is_lock_file(rel_path) || is_minified_name(rel_path) || is_vendored(rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_and_minified_files_are_noise() {
        assert!(is_noise_path("web/package-lock.json"));
        assert!(is_noise_path("Cargo.lock"));
        assert!(is_noise_path("static/app.min.js"));
        assert!(is_noise_path("vendor/github.com/x/y.go"));
        assert!(!is_noise_path("src/vendor_client.py"));
        assert!(!is_noise_path("src/app.js"));
    }
}
