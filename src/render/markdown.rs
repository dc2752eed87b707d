//! Markdown rendering of a diff context.

use super::timestamp;
use crate::domain::{DiffContext, FragmentKind};
use crate::utils::paths::extension_of;

pub fn render_markdown(context: &DiffContext, include_timestamp: bool) -> String {
    let mut out = String::new();
    out.push_str("# Diff Context\n\n");
    if include_timestamp {
        out.push_str(&format!("Generated: {}\n\n", timestamp()));
    }

    let stats = &context.stats;
    out.push_str(&format!(
        "- Fragments: {} ({} changed file(s))\n",
        context.fragment_count, stats.seed_count
    ));
    out.push_str(&format!(
        "- Tokens: {} / {}\n",
        context.tokens_used, context.budget_tokens
    ));
    out.push_str(&format!(
        "- Graph: {} node(s), {} edge(s)\n",
        stats.graph_nodes, stats.graph_edges
    ));
    out.push_str(&format!(
        "- Signals: {} lexical edge(s) from {} term(s), {} hub(s) suppressed; \
         {} co-change pair(s) from {} commit(s)\n",
        stats.lexical_edges,
        stats.lexical_terms,
        stats.lexical_hubs_suppressed,
        stats.cochange_pairs,
        stats.cochange_commits_used
    ));
    if let Some(reason) = &stats.cochange_truncated {
        out.push_str(&format!(
            "- History walk truncated ({}) after {} commit(s)\n",
            reason, stats.cochange_commits_walked
        ));
    }
    if stats.seeds_over_budget {
        out.push_str("- Warning: changed files alone exceed the token budget\n");
    }

    for fragment in &context.fragments {
        let label = match fragment.kind {
            FragmentKind::SeedHunks => "changed, hunks",
            FragmentKind::SeedFile => "changed",
            FragmentKind::Placeholder => "changed, unavailable",
            FragmentKind::Expansion => "related",
        };
        out.push_str(&format!("\n## `{}` ({})\n\n", fragment.path, label));
        if fragment.kind == FragmentKind::Expansion {
            out.push_str(&format!("Score: {:.4}\n\n", fragment.score));
        }
        if fragment.truncated {
            out.push_str("_Truncated to fit the budget._\n\n");
        }

        let lang = match fragment.kind {
            FragmentKind::SeedHunks => "diff".to_string(),
            FragmentKind::Placeholder => "text".to_string(),
            _ => extension_of(&fragment.path).unwrap_or_default(),
        };
        let fence = fence_for(&fragment.content);
        out.push_str(&format!("{fence}{lang}\n"));
        out.push_str(&fragment.content);
        if !fragment.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{fence}\n"));
    }
    out
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in content.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
