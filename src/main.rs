//! diff-context: build bounded context packs for a git diff

use anyhow::Result;

fn main() -> Result<()> {
    diff_context::cli::run()
}
