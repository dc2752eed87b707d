//! Syntax-tree based extraction for Python, Rust, JavaScript, TypeScript and Go.

use super::Language;
use crate::domain::{ModuleFacts, SemanticInfo};
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

/// Node kinds per grammar. Every definition kind carries a `name` field.
struct Grammar {
    definitions: &'static [&'static str],
    /// Bindings that only count as definitions at module level.
    top_level_bindings: &'static [&'static str],
    calls: &'static [&'static str],
    type_identifiers: &'static [&'static str],
}

const PYTHON: Grammar = Grammar {
    definitions: &["function_definition", "class_definition"],
    top_level_bindings: &["assignment"],
    calls: &["call"],
    type_identifiers: &[],
};

const RUST: Grammar = Grammar {
    definitions: &[
        "function_item",
        "function_signature_item",
        "struct_item",
        "enum_item",
        "union_item",
        "trait_item",
        "type_item",
        "const_item",
        "static_item",
        "mod_item",
        "macro_definition",
    ],
    top_level_bindings: &[],
    calls: &["call_expression", "macro_invocation"],
    type_identifiers: &["type_identifier"],
};

const JAVASCRIPT: Grammar = Grammar {
    definitions: &[
        "function_declaration",
        "generator_function_declaration",
        "class_declaration",
        "method_definition",
    ],
    top_level_bindings: &["variable_declarator"],
    calls: &["call_expression", "new_expression"],
    type_identifiers: &[],
};

const TYPESCRIPT: Grammar = Grammar {
    definitions: &[
        "function_declaration",
        "generator_function_declaration",
        "class_declaration",
        "abstract_class_declaration",
        "method_definition",
        "interface_declaration",
        "type_alias_declaration",
        "enum_declaration",
    ],
    top_level_bindings: &["variable_declarator"],
    calls: &["call_expression", "new_expression"],
    type_identifiers: &["type_identifier"],
};

const GO: Grammar = Grammar {
    definitions: &["function_declaration", "method_declaration", "type_spec"],
    top_level_bindings: &["const_spec", "var_spec"],
    calls: &["call_expression"],
    type_identifiers: &["type_identifier"],
};

const ROOT_KINDS: &[&str] = &["module", "program", "source_file"];
const BINDING_WRAPPERS: &[&str] = &[
    "expression_statement",
    "lexical_declaration",
    "variable_declaration",
    "export_statement",
    "const_declaration",
    "var_declaration",
];
const IGNORED_IDENTIFIERS: &[&str] = &["self", "cls", "super", "_"];

/// Returns `None` when the language has no grammar or the parser gives up.
pub fn extract(language: Language, content: &str) -> Option<SemanticInfo> {
    let (ts_language, grammar): (tree_sitter::Language, &'static Grammar) = match language {
        Language::Python => (tree_sitter_python::LANGUAGE.into(), &PYTHON),
        Language::Rust => (tree_sitter_rust::LANGUAGE.into(), &RUST),
        Language::JavaScript => (tree_sitter_javascript::LANGUAGE.into(), &JAVASCRIPT),
        Language::TypeScript => (tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), &TYPESCRIPT),
        Language::Tsx => (tree_sitter_typescript::LANGUAGE_TSX.into(), &TYPESCRIPT),
        Language::Go => (tree_sitter_go::LANGUAGE.into(), &GO),
        Language::Other => return None,
    };

    let mut parser = Parser::new();
    parser.set_language(&ts_language).ok()?;
    let tree = parser.parse(content, None)?;

    let mut collector = Collector::new(language, grammar, content.as_bytes());
    collector.walk(tree.root_node());
    Some(collector.finish())
}

struct Collector<'a> {
    language: Language,
    grammar: &'static Grammar,
    source: &'a [u8],
    defines: BTreeSet<String>,
    calls: BTreeSet<String>,
    type_refs: BTreeSet<String>,
    identifiers: BTreeSet<String>,
    imports: BTreeSet<String>,
    exports: BTreeSet<String>,
}

impl<'a> Collector<'a> {
    fn new(language: Language, grammar: &'static Grammar, source: &'a [u8]) -> Self {
        Self {
            language,
            grammar,
            source,
            defines: BTreeSet::new(),
            calls: BTreeSet::new(),
            type_refs: BTreeSet::new(),
            identifiers: BTreeSet::new(),
            imports: BTreeSet::new(),
            exports: BTreeSet::new(),
        }
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        node.utf8_text(self.source).ok()
    }

    fn walk(&mut self, root: Node) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.visit(node);
            for i in (0..node.named_child_count()).rev() {
                if let Some(child) = node.named_child(i) {
                    stack.push(child);
                }
            }
        }
    }

    fn visit(&mut self, node: Node) {
        let kind = node.kind();

        if self.grammar.definitions.contains(&kind) {
            if let Some(name) = node.child_by_field_name("name").and_then(|n| self.text(n)) {
                self.defines.insert(name.to_string());
            }
        } else if self.grammar.top_level_bindings.contains(&kind) && is_top_level(node) {
            self.record_binding(node);
        }

        if self.grammar.calls.contains(&kind) {
            self.record_call(node);
        }

        if self.grammar.type_identifiers.contains(&kind) {
            self.insert_symbol(Symbol::Type, node);
        } else if kind == "identifier" {
            self.insert_symbol(Symbol::Identifier, node);
        }

        match (self.language, kind) {
            (Language::Python, "type") => self.collect_identifiers_as_types(node),
            (Language::Python, "class_definition") => {
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    self.collect_identifiers_as_types(bases);
                }
            }
            (Language::Python, "import_statement") => self.record_python_import(node),
            (Language::Python, "import_from_statement") => self.record_python_from_import(node),
            (Language::JavaScript | Language::TypeScript | Language::Tsx, _) => {
                self.visit_js_module_node(node)
            }
            (Language::Rust, "impl_item") => {
                for field in ["type", "trait"] {
                    if let Some(target) = node.child_by_field_name(field) {
                        self.collect_type_names(target);
                    }
                }
            }
            _ => {}
        }
    }

    fn record_binding(&mut self, node: Node) {
        let field = if node.kind() == "assignment" { "left" } else { "name" };
        let Some(target) = node.child_by_field_name(field) else {
            return;
        };
        if target.kind() == "identifier" {
            if let Some(name) = self.text(target) {
                self.defines.insert(name.to_string());
            }
        }
    }

    fn record_call(&mut self, node: Node) {
        let callee = match node.kind() {
            "new_expression" => node.child_by_field_name("constructor"),
            "macro_invocation" => node.child_by_field_name("macro"),
            _ => node.child_by_field_name("function"),
        };
        let Some(callee) = callee else {
            return;
        };
        if let Some(name) = self.callee_name(callee) {
            if !IGNORED_IDENTIFIERS.contains(&name) {
                self.calls.insert(name.to_string());
            }
        }
        if matches!(self.language, Language::JavaScript | Language::TypeScript | Language::Tsx) {
            self.record_require(node, callee);
        }
    }

    /// Rightmost name of a possibly qualified callee (`a.b.c()` gives `c`).
    fn callee_name(&self, node: Node) -> Option<&'a str> {
        let field = match node.kind() {
            "identifier" | "type_identifier" | "field_identifier" | "property_identifier" => {
                return self.text(node);
            }
            "attribute" => "attribute",
            "member_expression" => "property",
            "field_expression" | "selector_expression" => "field",
            "scoped_identifier" => "name",
            "generic_function" => "function",
            _ => return None,
        };
        node.child_by_field_name(field).and_then(|n| self.callee_name(n))
    }

    fn insert_symbol(&mut self, kind: Symbol, node: Node) {
        let Some(name) = self.text(node) else {
            return;
        };
        if name.len() < 2 || IGNORED_IDENTIFIERS.contains(&name) {
            return;
        }
        match kind {
            Symbol::Type => self.type_refs.insert(name.to_string()),
            Symbol::Identifier => self.identifiers.insert(name.to_string()),
        };
    }

    fn collect_identifiers_as_types(&mut self, node: Node) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "identifier" {
                self.insert_symbol(Symbol::Type, current);
            }
            for i in 0..current.named_child_count() {
                if let Some(child) = current.named_child(i) {
                    stack.push(child);
                }
            }
        }
    }

    fn collect_type_names(&mut self, node: Node) {
        match node.kind() {
            "type_identifier" => self.insert_symbol(Symbol::Type, node),
            "generic_type" | "scoped_type_identifier" => {
                let field = if node.kind() == "generic_type" { "type" } else { "name" };
                if let Some(inner) = node.child_by_field_name(field) {
                    self.collect_type_names(inner);
                }
            }
            _ => {}
        }
    }

    fn record_python_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let dotted = if name.kind() == "aliased_import" {
                name.child_by_field_name("name")
            } else {
                Some(name)
            };
            if let Some(module) = dotted.and_then(|n| self.text(n)) {
                self.imports.insert(module.to_string());
            }
        }
    }

    fn record_python_from_import(&mut self, node: Node) {
        let Some(module) = node.child_by_field_name("module_name").and_then(|n| self.text(n))
        else {
            return;
        };
        self.imports.insert(module.to_string());

        // `from . import helpers` names sibling modules, not symbols.
        if module.chars().all(|c| c == '.') {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let dotted = if name.kind() == "aliased_import" {
                    name.child_by_field_name("name")
                } else {
                    Some(name)
                };
                if let Some(imported) = dotted.and_then(|n| self.text(n)) {
                    self.imports.insert(format!("{module}{imported}"));
                }
            }
        }
    }

    fn visit_js_module_node(&mut self, node: Node) {
        match node.kind() {
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.insert_import_literal(source);
                }
            }
            "export_statement" => self.record_js_export(node),
            "class_heritage" => self.collect_identifiers_as_types(node),
            _ => {}
        }
    }

    fn record_js_export(&mut self, node: Node) {
        if let Some(source) = node.child_by_field_name("source") {
            self.insert_import_literal(source);
        }
        if let Some(declaration) = node.child_by_field_name("declaration") {
            if let Some(name) = declaration.child_by_field_name("name").and_then(|n| self.text(n)) {
                self.exports.insert(name.to_string());
            }
            for i in 0..declaration.named_child_count() {
                let Some(child) = declaration.named_child(i) else {
                    continue;
                };
                if child.kind() == "variable_declarator" {
                    if let Some(name) = child.child_by_field_name("name").and_then(|n| self.text(n))
                    {
                        self.exports.insert(name.to_string());
                    }
                }
            }
        }
        for i in 0..node.named_child_count() {
            let Some(clause) = node.named_child(i) else {
                continue;
            };
            if clause.kind() != "export_clause" {
                continue;
            }
            for j in 0..clause.named_child_count() {
                let Some(specifier) = clause.named_child(j) else {
                    continue;
                };
                let exported = specifier
                    .child_by_field_name("alias")
                    .or_else(|| specifier.child_by_field_name("name"))
                    .and_then(|n| self.text(n));
                if let Some(name) = exported {
                    self.exports.insert(name.to_string());
                }
            }
        }
    }

    fn record_require(&mut self, call: Node, callee: Node) {
        let is_loader = callee.kind() == "import"
            || (callee.kind() == "identifier" && self.text(callee) == Some("require"));
        if !is_loader {
            return;
        }
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        if let Some(first) = arguments.named_child(0) {
            if first.kind() == "string" {
                self.insert_import_literal(first);
            }
        }
    }

    fn insert_import_literal(&mut self, node: Node) {
        if let Some(raw) = self.text(node) {
            let specifier = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');
            if !specifier.is_empty() {
                self.imports.insert(specifier.to_string());
            }
        }
    }

    fn finish(self) -> SemanticInfo {
        let Collector { language, defines, calls, type_refs, identifiers, imports, exports, .. } =
            self;

        let type_refs: BTreeSet<String> = type_refs.difference(&defines).cloned().collect();
        let references: BTreeSet<String> = identifiers
            .into_iter()
            .filter(|name| {
                !defines.contains(name) && !calls.contains(name) && !type_refs.contains(name)
            })
            .collect();
        let module = language.is_module_based().then_some(ModuleFacts { imports, exports });

        SemanticInfo { defines, references, calls, type_refs, module }
    }
}

#[derive(Clone, Copy)]
enum Symbol {
    Type,
    Identifier,
}

fn is_top_level(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        let kind = parent.kind();
        if ROOT_KINDS.contains(&kind) {
            return true;
        }
        if !BINDING_WRAPPERS.contains(&kind) {
            return false;
        }
        current = parent.parent();
    }
    false
}
