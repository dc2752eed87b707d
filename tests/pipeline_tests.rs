//! End-to-end tests of diff context construction against real repositories.

mod common;

use common::{tax_repo, TestRepo};
use diff_context::domain::SeedContent;
use diff_context::utils::estimate_tokens;
use diff_context::{build_diff_context, Config, ContextEngine, ContextError, FragmentKind};
use std::collections::BTreeSet;

fn paths(context: &diff_context::DiffContext) -> Vec<&str> {
    context.paths().collect()
}

#[test]
fn changed_function_pulls_in_caller_and_test() {
    let repo = tax_repo();
    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");

    assert_eq!(context.fragments[0].path, "src/tax.py");
    assert_eq!(context.fragments[0].kind, FragmentKind::SeedHunks);
    assert!(context.fragments[0].content.contains("+    return round(amount * rate, 2)"));
    assert!(context.contains_path("src/checkout.py"));
    assert!(context.contains_path("tests/test_tax.py"));
    assert!(!context.contains_path("src/garbage.py"));

    assert_eq!(context.stats.seed_count, 1);
    assert!(context.stats.ppr_converged);
    assert_eq!(context.budget_tokens, Config::default().limits.default_budget_tokens);
    assert_eq!(context.fragment_count, context.fragments.len());
    assert_eq!(context.tokens_used, context.fragments.iter().map(|f| f.tokens).sum::<usize>());
}

#[test]
fn expansions_follow_the_seeds_in_score_order() {
    let repo = tax_repo();
    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");

    let expansions: Vec<_> =
        context.fragments.iter().filter(|f| f.kind == FragmentKind::Expansion).collect();
    assert!(!expansions.is_empty());
    assert!(expansions.iter().all(|f| f.score > 0.0));
    assert!(expansions.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(context.fragments[..1].iter().all(|f| f.kind.is_seed()));
}

#[test]
fn unrelated_file_is_never_selected() {
    let repo = tax_repo();
    for budget in [100, 1_000, 100_000] {
        let context =
            build_diff_context(repo.path(), "HEAD~1..HEAD", Some(budget)).expect("context");
        assert!(!context.contains_path("src/garbage.py"), "budget {budget}");
    }
}

#[test]
fn small_budget_keeps_seeds_and_stays_within_budget() {
    let repo = tax_repo();
    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", Some(500)).expect("context");

    assert!(context.contains_path("src/tax.py"));
    assert!(context.tokens_used <= 500);
    assert_eq!(context.budget_tokens, 500);
}

#[test]
fn small_budget_on_large_related_content_keeps_seeds_first() {
    let repo = TestRepo::new();
    repo.write("billing/tax.py", "def calculate_tax(amount, rate):\n    return amount * rate\n");
    let notes: String =
        (0..60).map(|i| format!("# invoice reconciliation note number {i:03}\n")).collect();
    let mut related_tokens = 0;
    for i in 0..10 {
        let body = format!(
            "from billing.tax import calculate_tax\n\n\ndef total_{i}(amount):\n    \
             return amount + calculate_tax(amount, 0.{i})\n\n{notes}"
        );
        related_tokens += estimate_tokens(&body);
        repo.write(&format!("billing/caller_{i}.py"), body);
    }
    repo.commit("initial");
    repo.write(
        "billing/tax.py",
        "def calculate_tax(amount, rate):\n    return round(amount * rate, 2)\n",
    );
    repo.commit("round tax");
    assert!(related_tokens > 5_000, "fixture too small: {related_tokens}");

    let full = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("full");
    assert_eq!(full.fragment_count, 11);

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", Some(500)).expect("context");
    assert!(context.fragment_count < full.fragment_count);
    assert_eq!(context.fragments[0].path, "billing/tax.py");
    assert!(context.fragments[0].kind.is_seed());
    assert!(context.tokens_used <= 500);
    assert!(!context.stats.seeds_over_budget);
}

#[test]
fn larger_budgets_only_add_fragments() {
    let repo = tax_repo();
    let mut previous: BTreeSet<String> = BTreeSet::new();
    for budget in [30, 60, 90, 120, 500, 50_000] {
        let context =
            build_diff_context(repo.path(), "HEAD~1..HEAD", Some(budget)).expect("context");
        let current: BTreeSet<String> = context.paths().map(str::to_string).collect();
        assert!(previous.is_subset(&current), "budget {budget}: {previous:?} vs {current:?}");
        assert!(current.contains("src/tax.py"));
        previous = current;
    }
}

#[test]
fn repeated_runs_are_identical() {
    let repo = tax_repo();
    let first = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("first");
    let second = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("second");
    similar_asserts::assert_eq!(first, second);
}

#[test]
fn new_import_pulls_in_definition_but_not_later_unrelated_commit() {
    let repo = TestRepo::new();
    repo.write("utils/math.py", "def calculate_tax(amount, rate):\n    return amount * rate\n");
    repo.write("main.py", "def main():\n    print(\"hello\")\n");
    repo.commit("initial");
    repo.write("garbage.py", "def format_banner(text):\n    return text.upper()\n");
    repo.commit("add banner helper");
    repo.write(
        "main.py",
        "from utils.math import calculate_tax\n\n\ndef main():\n    \
         print(calculate_tax(100, 0.2))\n",
    );
    repo.commit("print tax");

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(paths(&context), vec!["main.py", "utils/math.py"]);
    assert!(context.fragments[1].content.contains("def calculate_tax"));
    assert!(context.fragments[0].content.contains("+from utils.math import calculate_tax"));

    for budget in [60, 200, 2_000] {
        let context =
            build_diff_context(repo.path(), "HEAD~1..HEAD", Some(budget)).expect("context");
        assert!(!context.contains_path("garbage.py"), "budget {budget}");
    }
}

#[test]
fn shared_rare_config_key_links_manifests() {
    let repo = TestRepo::new();
    repo.write("deploy/service.yaml", "gateway_timeout: 30\n");
    repo.write("helm/values.yaml", "payment_gateway_timeout_ms: 5000\n");
    for i in 0..9 {
        repo.write(
            &format!("jobs/job_{i}.py"),
            format!("def nightly_job_{i}():\n    return batch_size_{i}\n"),
        );
    }
    repo.commit("initial");
    repo.write("deploy/service.yaml", "payment_gateway_timeout_ms: 3000\n");
    repo.commit("rename timeout key");

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(context.stats.files_scanned, 11);
    assert_eq!(context.stats.lexical_edges, 2);
    assert!(context.stats.lexical_terms >= 1);
    assert_eq!(paths(&context), vec!["deploy/service.yaml", "helm/values.yaml"]);
    assert!(context.fragments[1].score > 0.0);
}

#[test]
fn fragment_cap_is_enforced() {
    let repo = tax_repo();
    let mut config = Config::default();
    config.limits.max_fragments = 1;
    let context =
        ContextEngine::new(config).build(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(paths(&context), vec!["src/tax.py"]);
}

#[test]
fn full_seed_content_uses_the_current_file() {
    let repo = tax_repo();
    let mut config = Config::default();
    config.assemble.seed_content = SeedContent::Full;
    let context =
        ContextEngine::new(config).build(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(context.fragments[0].kind, FragmentKind::SeedFile);
    assert_eq!(
        context.fragments[0].content,
        "def calculate_tax(amount, rate):\n    return round(amount * rate, 2)\n"
    );
}

#[test]
fn working_tree_changes_are_seeds() {
    let repo = tax_repo();
    repo.write(
        "src/checkout.py",
        "from src.tax import calculate_tax\n\n\ndef checkout_total(subtotal):\n    \
         return subtotal + calculate_tax(subtotal, 0.25)\n",
    );
    let context = build_diff_context(repo.path(), "HEAD", None).expect("context");

    assert_eq!(context.fragments[0].path, "src/checkout.py");
    assert!(context.contains_path("src/tax.py"));
    assert!(!context.contains_path("src/garbage.py"));
}

#[test]
fn deleted_and_binary_seeds_become_placeholders() {
    let repo = TestRepo::new();
    repo.write("app.py", "def main():\n    return 1\n");
    repo.write("old.py", "def legacy():\n    return 0\n");
    repo.write("logo.png", [0x89u8, b'P', b'N', b'G', 0, 0, 1, 2, 3]);
    repo.commit("initial");

    repo.write("app.py", "def main():\n    return 2\n");
    repo.remove("old.py");
    repo.write("logo.png", [0x89u8, b'P', b'N', b'G', 0, 0, 9, 9, 9, 9]);
    repo.commit("churn");

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");
    let kinds: Vec<(&str, FragmentKind)> =
        context.fragments.iter().map(|f| (f.path.as_str(), f.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("app.py", FragmentKind::SeedHunks),
            ("logo.png", FragmentKind::Placeholder),
            ("old.py", FragmentKind::Placeholder),
        ]
    );
}

#[test]
fn terraform_change_includes_sibling_files() {
    let repo = TestRepo::new();
    repo.write(
        "infra/main.tf",
        "resource \"aws_s3_bucket\" \"logs\" {\n  bucket = var.bucket_name\n}\n",
    );
    repo.write("infra/variables.tf", "variable \"bucket_name\" {\n  type = string\n}\n");
    repo.write("infra/outputs.tf", "output \"logs_arn\" {\n  value = aws_s3_bucket.logs.arn\n}\n");
    repo.write("app/greeting.py", "def greet(person):\n    return person.title()\n");
    repo.commit("initial");

    repo.write(
        "infra/main.tf",
        "resource \"aws_s3_bucket\" \"logs\" {\n  bucket = var.bucket_name\n  \
         force_destroy = true\n}\n",
    );
    repo.commit("allow destroy");

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(context.fragments[0].path, "infra/main.tf");
    assert!(context.contains_path("infra/variables.tf"));
    assert!(context.contains_path("infra/outputs.tf"));
    assert!(!context.contains_path("app/greeting.py"));
    assert_eq!(context.stats.sibling_candidates, 2);
}

#[test]
fn files_that_change_together_are_linked() {
    let repo = TestRepo::new();
    repo.write("service/app.py", "def handler(event):\n    return 0\n");
    repo.write("deploy/app.yaml", "replicas: 0\n");
    repo.write("service/other.py", "def unrelated():\n    return None\n");
    repo.commit("initial");
    for i in 1..=3 {
        repo.write("service/app.py", format!("def handler(event):\n    return {i}\n"));
        repo.write("deploy/app.yaml", format!("replicas: {i}\n"));
        repo.commit(&format!("release {i}"));
    }
    repo.write("service/other.py", "def unrelated():\n    return 1\n");
    repo.commit("other");
    repo.write("service/app.py", "def handler(event):\n    return 99\n");
    repo.commit("hotfix");

    let context = build_diff_context(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert!(context.contains_path("deploy/app.yaml"));
    assert!(!context.contains_path("service/other.py"));
    assert_eq!(context.stats.cochange_edges, 2);
    assert_eq!(context.stats.cochange_pairs, 1);
    assert_eq!(context.stats.cochange_commits_walked, 6);
    assert_eq!(context.stats.cochange_commits_used, 5);
    assert_eq!(context.stats.cochange_truncated, None);
}

#[test]
fn commit_ceiling_is_reported() {
    let repo = TestRepo::new();
    for i in 0..5 {
        repo.write("app.py", format!("VALUE = {i}\n"));
        repo.commit(&format!("change {i}"));
    }
    let mut config = Config::default();
    config.cochange.commits_limit = 2;
    let context =
        ContextEngine::new(config).build(repo.path(), "HEAD~1..HEAD", None).expect("context");
    assert_eq!(context.stats.cochange_commits_walked, 2);
    assert_eq!(context.stats.cochange_truncated.as_deref(), Some("commit_limit"));
}

#[test]
fn empty_range_yields_empty_context() {
    let repo = tax_repo();
    let context = build_diff_context(repo.path(), "HEAD..HEAD", None).expect("context");
    assert_eq!(context.fragment_count, 0);
    assert_eq!(context.tokens_used, 0);
}

#[test]
fn input_errors_are_reported() {
    let repo = tax_repo();
    assert!(matches!(
        build_diff_context(repo.path(), "HEAD~1..HEAD", Some(0)),
        Err(ContextError::InvalidBudget)
    ));
    assert!(matches!(
        build_diff_context(repo.path(), "a..b..c", None),
        Err(ContextError::InvalidRange { .. })
    ));
    assert!(matches!(
        build_diff_context(repo.path(), "no-such-branch..HEAD", None),
        Err(ContextError::InvalidRange { .. })
    ));

    let plain = tempfile::TempDir::new().expect("tmp");
    assert!(matches!(
        build_diff_context(plain.path(), "HEAD~1..HEAD", None),
        Err(ContextError::RepositoryNotFound { .. })
    ));
}
