//! Regex-based extraction for languages without a grammar (Terraform, YAML,
//! Java, C and friends). Coarse, but enough to link definitions to uses.

use crate::domain::SemanticInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^\s*(?:(?:pub(?:\([a-z]+\))?|export|public|private|protected|static|final",
        r"|abstract|async|inline)\s+)*",
        r"(?:def|fn|func|function|class|struct|enum|interface|trait|record|object",
        r"|typedef\s+struct|module)\s+([A-Za-z_][A-Za-z0-9_]*)",
    ))
    .expect("valid definition regex")
});

static BLOCK_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:resource|data)\s+"[^"]+"\s+"([^"]+)""#).expect("valid block regex")
});

static NAMED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:variable|output|module|provider)\s+"([^"]+)""#)
        .expect("valid named block regex")
});

static LOCALS_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^locals\s*\{(.*?)^\}").expect("valid locals regex")
});

static ASSIGNMENT_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("valid assignment regex")
});

static CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid call regex")
});

// Capitalized words with at least one lowercase letter; skips SHOUTING_CONSTANTS.
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z0-9_]*[a-z][A-Za-z0-9_]*)\b").expect("valid type regex")
});

static HCL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:var|local|module)\.([A-Za-z_][A-Za-z0-9_-]*)").expect("valid hcl regex")
});

static RESOURCE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:data\.)?[a-z][a-z0-9]*_[a-z0-9_]+\.([A-Za-z_][A-Za-z0-9_-]*)\.")
        .expect("valid resource reference regex")
});

const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "return", "catch", "sizeof", "elif", "match", "with", "assert",
    "print", "typeof", "defined", "function", "func", "def", "fn", "new", "not", "and", "or", "in",
];

/// Extract symbol facts with line-oriented patterns. Never fails.
pub fn extract(path: &str, content: &str) -> SemanticInfo {
    let mut defines = BTreeSet::new();
    for pattern in [&*DEFINITION, &*BLOCK_LABEL, &*NAMED_BLOCK] {
        for caps in pattern.captures_iter(content) {
            defines.insert(caps[1].to_string());
        }
    }
    if is_hcl(path) {
        for block in LOCALS_ENTRY.captures_iter(content) {
            for caps in ASSIGNMENT_KEY.captures_iter(&block[1]) {
                defines.insert(caps[1].to_string());
            }
        }
    }

    let calls: BTreeSet<String> = CALL
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|name| !CALL_KEYWORDS.contains(&name.as_str()) && !defines.contains(name))
        .collect();

    let type_refs: BTreeSet<String> = TYPE_NAME
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|name| !defines.contains(name) && !calls.contains(name))
        .collect();

    let references: BTreeSet<String> = HCL_REFERENCE
        .captures_iter(content)
        .chain(RESOURCE_REFERENCE.captures_iter(content))
        .map(|caps| caps[1].to_string())
        .filter(|name| !defines.contains(name))
        .collect();

    SemanticInfo { defines, references, calls, type_refs, module: None }
}

fn is_hcl(path: &str) -> bool {
    matches!(crate::utils::paths::extension_of(path).as_deref(), Some("tf" | "tfvars" | "hcl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terraform_blocks_define_and_reference() {
        let variables = "variable \"region\" {\n  default = \"eu-west-1\"\n}\n";
        let main = r#"
resource "aws_s3_bucket" "assets" {
  bucket = "assets-${var.region}"
}

resource "aws_s3_bucket_policy" "assets" {
  bucket = aws_s3_bucket.assets.id
}

locals {
  prefix = "svc"
}
"#;
        let vars = extract("infra/variables.tf", variables);
        assert!(vars.defines.contains("region"));

        let info = extract("infra/main.tf", main);
        assert!(info.defines.contains("assets"));
        assert!(info.defines.contains("prefix"));
        assert!(info.references.contains("region"));
        assert!(!info.references.contains("assets"));
    }

    #[test]
    fn java_like_sources_yield_definitions_and_calls() {
        let source = r#"
public class OrderService {
    public Total compute(Order order) {
        return TaxRules.apply(order.lines());
    }
}
"#;
        let info = extract("src/OrderService.java", source);
        assert!(info.defines.contains("OrderService"));
        assert!(info.calls.contains("apply"));
        assert!(info.calls.contains("compute"));
        assert!(!info.calls.contains("return"));
        assert!(info.type_refs.contains("Order"));
        assert!(info.type_refs.contains("TaxRules"));
        assert!(info.module.is_none());
    }

    #[test]
    fn plain_text_is_empty() {
        let info = extract("notes.txt", "nothing to see here\n");
        assert!(info.is_empty());
    }
}
