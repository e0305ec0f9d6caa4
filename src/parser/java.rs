//! Java parser backed by tree-sitter
//!
//! Extracts every type declaration (class, interface, enum, record, annotation
//! type, including nested ones) together with its directly declared methods and
//! constructors. Methods of anonymous classes are not listed separately; a line
//! inside one resolves to the enclosing named method.

use tree_sitter::{Node, Parser, Tree};

use crate::callgraph::class_facts;
use crate::error::{Result, VulnLensError};
use crate::parser::SourceParser;
use crate::schema::{ClassKind, Parameter, ParsedClass, ParsedFile, ParsedMethod, Position};

/// tree-sitter based [`SourceParser`] for `.java` files
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_tree(source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| VulnLensError::ParseFailure {
                message: format!("Failed to set language: {:?}", e),
            })?;

        parser
            .parse(source, None)
            .ok_or_else(|| VulnLensError::ParseFailure {
                message: "Failed to parse file".to_string(),
            })
    }
}

impl SourceParser for JavaParser {
    fn parse_file(&self, path: &str, source: &str) -> Result<ParsedFile> {
        let tree = Self::parse_tree(source)?;
        let root = tree.root_node();

        if root.has_error() {
            tracing::debug!("{} has syntax errors, extracting what parsed", path);
        }

        let mut classes = Vec::new();
        collect_classes(&root, source, path, &mut classes);

        Ok(ParsedFile {
            path: path.to_string(),
            classes,
        })
    }
}

// ============================================================================
// Declarations
// ============================================================================

fn class_kind(node_kind: &str) -> Option<ClassKind> {
    match node_kind {
        "class_declaration" => Some(ClassKind::Class),
        "interface_declaration" => Some(ClassKind::Interface),
        "enum_declaration" => Some(ClassKind::Enum),
        "record_declaration" => Some(ClassKind::Record),
        "annotation_type_declaration" => Some(ClassKind::Annotation),
        _ => None,
    }
}

/// Pre-order walk so classes come out in source order, outer before nested
fn collect_classes(node: &Node, source: &str, path: &str, out: &mut Vec<ParsedClass>) {
    if let Some(kind) = class_kind(node.kind()) {
        if let Some(class) = build_class(node, kind, source, path) {
            out.push(class);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_classes(&child, source, path, out);
    }
}

fn build_class(node: &Node, kind: ClassKind, source: &str, path: &str) -> Option<ParsedClass> {
    let name = get_node_text(&node.child_by_field_name("name")?, source);
    let code = get_node_text(node, source);

    let methods = match node.child_by_field_name("body") {
        Some(body) => collect_methods(&body, &name, source, path),
        None => Vec::new(),
    };

    let (calls, references) = class_facts(&name, &code);

    Some(ParsedClass {
        name,
        file: path.to_string(),
        kind,
        position: position_of(node),
        code,
        calls,
        references,
        methods,
    })
}

/// Methods and constructors declared directly in a class body
fn collect_methods(body: &Node, class_name: &str, source: &str, path: &str) -> Vec<ParsedMethod> {
    let mut methods = Vec::new();
    let mut cursor = body.walk();

    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "method_declaration" => {
                if let Some(method) = build_method(&member, class_name, source, path) {
                    methods.push(method);
                }
            }
            "constructor_declaration" | "compact_constructor_declaration" => {
                methods.push(build_constructor(&member, class_name, source, path));
            }
            // enum constants come first; members live in a nested node
            "enum_body_declarations" => {
                methods.extend(collect_methods(&member, class_name, source, path));
            }
            _ => {}
        }
    }

    methods
}

fn build_method(node: &Node, class_name: &str, source: &str, path: &str) -> Option<ParsedMethod> {
    let name = get_node_text(&node.child_by_field_name("name")?, source);
    let return_type = node
        .child_by_field_name("type")
        .map(|t| get_node_text(&t, source))
        .unwrap_or_else(|| "void".to_string());

    Some(ParsedMethod {
        name,
        class: class_name.to_string(),
        file: path.to_string(),
        return_type,
        parameters: extract_parameters(node, source),
        position: position_of(node),
        code: get_node_text(node, source),
    })
}

/// Constructors are recorded as methods named after their class
fn build_constructor(node: &Node, class_name: &str, source: &str, path: &str) -> ParsedMethod {
    ParsedMethod {
        name: class_name.to_string(),
        class: class_name.to_string(),
        file: path.to_string(),
        return_type: class_name.to_string(),
        parameters: extract_parameters(node, source),
        position: position_of(node),
        code: get_node_text(node, source),
    }
}

fn extract_parameters(node: &Node, source: &str) -> Vec<Parameter> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut parameters = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let name = param
                    .child_by_field_name("name")
                    .map(|n| get_node_text(&n, source))
                    .unwrap_or_else(|| "unknown".to_string());
                let param_type = param
                    .child_by_field_name("type")
                    .map(|t| get_node_text(&t, source))
                    .unwrap_or_else(|| "unknown".to_string());
                parameters.push(Parameter { name, param_type });
            }
            "spread_parameter" => parameters.push(spread_parameter(&param, source)),
            _ => {}
        }
    }
    parameters
}

/// `String... args`
fn spread_parameter(node: &Node, source: &str) -> Parameter {
    let mut param_type = "unknown".to_string();
    let mut name = "unknown".to_string();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "variable_declarator" => {
                if let Some(n) = child.child_by_field_name("name") {
                    name = get_node_text(&n, source);
                }
            }
            "modifiers" => {}
            _ if param_type == "unknown" => {
                param_type = format!("{}...", get_node_text(&child, source));
            }
            _ => {}
        }
    }

    Parameter { name, param_type }
}

// ============================================================================
// Node helpers
// ============================================================================

fn get_node_text(node: &Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

fn position_of(node: &Node) -> Position {
    let start = node.start_position();
    let end = node.end_position();
    Position {
        start_line: start.row + 1,
        end_line: end.row + 1,
        start_column: start.column,
        end_column: end.column,
    }
}
