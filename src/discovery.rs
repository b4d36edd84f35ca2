//! Position discovery: map a declaration path onto a byte offset by walking
//! the syntax tree one path segment at a time.
//!
//! The walk is greedy. A child that names the current segment is entered and
//! the segment is consumed; wrapper nodes are entered without consuming
//! anything; everything else is skipped. The first branch that consumes the
//! whole path wins, so a qualified path lands on the nested declaration even
//! when the same leaf name appears earlier in the file.

use tree_sitter::Node;

use crate::source_cache::ParsedSourceFile;
use crate::types::DeclarationPath;

/// Path segment used for the global scope, and the keyword it stands for.
const GLOBAL_SCOPE_ALIAS: (&str, &str) = ("__global", "global");

/// Name given to anonymous default-exported classes.
const ANONYMOUS_DEFAULT_NAME: &str = "default";

/// Wrapper nodes walked through without consuming a segment.
const TRANSPARENT_KINDS: &[&str] = &[
    "ERROR",
    "class_body",
    "enum_body",
    "export_statement",
    "expression_statement",
    "interface_body",
    "lexical_declaration",
    "object",
    "object_type",
    "type_annotation",
    "variable_declaration",
];

/// Parents whose `statement_block` is a declaration scope. Function and
/// method bodies are never searched.
const SCOPE_BLOCK_PARENTS: &[&str] = &["ERROR", "ambient_declaration", "internal_module", "module"];

/// Class-like and interface-like declarations.
const STRUCTURAL_KINDS: &[&str] = &[
    "abstract_class_declaration",
    "class",
    "class_declaration",
    "enum_declaration",
    "interface_declaration",
    "type_alias_declaration",
];

/// Member and value declarations, matched by their name (or key) text.
const MEMBER_KINDS: &[&str] = &[
    "abstract_method_signature",
    "enum_assignment",
    "function_declaration",
    "function_signature",
    "generator_function_declaration",
    "method_definition",
    "method_signature",
    "pair",
    "property_signature",
    "public_field_definition",
    "variable_declarator",
];

/// Find the byte offset of the declaration named by `path`.
///
/// The offset points at the declaration's name when it has one, so leading
/// modifiers and decorators are skipped. Returns `None` when no branch of the
/// tree consumes the whole path.
pub fn find_position(file: &ParsedSourceFile, path: &DeclarationPath) -> Option<usize> {
    let root = file.root()?;
    let walker = PathWalker {
        segments: path.segments(),
        source: file.source(),
    };
    return walker.walk(root, 0);
}

/// What the walk does with one child node.
enum Step<'tree> {
    /// Walk into `node` after consuming `consumed` path segments.
    Enter {
        /// Segments matched by this node (zero for wrappers).
        consumed: usize,
        /// Node whose children are searched next.
        node: Node<'tree>,
    },
    /// The child can't lead to the current segment.
    Skip,
}

/// Walk state shared by every level of the recursion.
struct PathWalker<'a> {
    /// The declaration path being matched.
    segments: &'a [String],
    /// Text of the file the tree was parsed from.
    source: &'a str,
}

impl PathWalker<'_> {
    /// Search the children of `node` for the segments from `index` on.
    fn walk(&self, node: Node<'_>, index: usize) -> Option<usize> {
        if index >= self.segments.len() {
            return Some(declaration_start(node));
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        let mut previous: Option<Node<'_>> = None;

        for &child in &children {
            let step = self.classify(child, previous, node.kind(), index);
            previous = Some(child);

            let Step::Enter { consumed, node: next } = step else {
                continue;
            };
            if let Some(offset) = self.walk(next, index.saturating_add(consumed)) {
                return Some(offset);
            }
        }

        return None;
    }

    /// Decide how `child` relates to the segment at `index`.
    fn classify<'tree>(
        &self,
        child: Node<'tree>,
        previous: Option<Node<'tree>>,
        parent_kind: &str,
        index: usize,
    ) -> Step<'tree> {
        let Some(segment) = self.segments.get(index) else {
            return Step::Skip;
        };
        let kind = child.kind();

        // `global { ... }` nested in a module body has no node of its own:
        // it shows up as a `global` marker followed by a bare block.
        if kind == "statement_block"
            && matches!(parent_kind, "program" | "statement_block" | "ERROR")
            && previous.is_some_and(|p| return self.is_global_marker(p))
        {
            return enter_if(module_name_matches(GLOBAL_SCOPE_ALIAS.1, segment), child, 1);
        }

        if kind == "module" || kind == "internal_module" {
            return self.module_step(child, index);
        }

        if kind == "ambient_declaration" {
            if is_declare_global(child) {
                return enter_if(module_name_matches(GLOBAL_SCOPE_ALIAS.1, segment), child, 1);
            }
            return Step::Enter { consumed: 0, node: child };
        }

        if kind == "statement_block" {
            return enter_if(SCOPE_BLOCK_PARENTS.contains(&parent_kind), child, 0);
        }

        if TRANSPARENT_KINDS.contains(&kind) {
            return Step::Enter { consumed: 0, node: child };
        }

        if STRUCTURAL_KINDS.contains(&kind) {
            let name = self.name_text(child).unwrap_or(ANONYMOUS_DEFAULT_NAME);
            return enter_if(name == segment, child, 1);
        }

        if MEMBER_KINDS.contains(&kind) {
            let name = self.name_text(child);
            return enter_if(name == Some(segment.as_str()), child, 1);
        }

        // Bare enum members (`enum E { A, B }`) are the identifier itself.
        if kind == "property_identifier" && parent_kind == "enum_body" {
            return enter_if(self.text(child) == Some(segment.as_str()), child, 1);
        }

        return Step::Skip;
    }

    /// Step for `module` / `internal_module` nodes. String-named modules are
    /// ambient wrappers and never appear in a path; identifier names consume
    /// one segment per dotted part (`namespace A.B` consumes `A` and `B`).
    fn module_step<'tree>(&self, child: Node<'tree>, index: usize) -> Step<'tree> {
        let Some(name) = child.child_by_field_name("name") else {
            return Step::Skip;
        };
        if name.kind() == "string" {
            return Step::Enter { consumed: 0, node: child };
        }
        let Some(text) = self.text(name) else {
            return Step::Skip;
        };

        let parts: Vec<&str> = text.split('.').map(str::trim).collect();
        let matched = parts.iter().enumerate().all(|(offset, part)| {
            return self
                .segments
                .get(index.saturating_add(offset))
                .is_some_and(|segment| return module_name_matches(part, segment));
        });
        return enter_if(matched, child, parts.len());
    }

    /// Whether `node` is the `global` keyword left in front of a nested
    /// global block.
    fn is_global_marker(&self, node: Node<'_>) -> bool {
        if !matches!(node.kind(), "identifier" | "expression_statement" | "ERROR") {
            return false;
        }
        return self
            .text(node)
            .is_some_and(|t| return t.trim().trim_end_matches(';').trim_end() == GLOBAL_SCOPE_ALIAS.1);
    }

    /// Text of the node's `name` (or `key`) field.
    fn name_text(&self, node: Node<'_>) -> Option<&str> {
        return self.text(name_node(node)?);
    }

    /// Source text covered by `node`.
    fn text(&self, node: Node<'_>) -> Option<&str> {
        return node.utf8_text(self.source.as_bytes()).ok();
    }
}

/// Module-like names match their own spelling, and the global block also
/// matches the global-scope path segment.
fn module_name_matches(name: &str, segment: &str) -> bool {
    return name == segment || (name == GLOBAL_SCOPE_ALIAS.1 && segment == GLOBAL_SCOPE_ALIAS.0);
}

/// `declare global { ... }`: an ambient declaration carrying the `global` keyword.
fn is_declare_global(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    return node
        .children(&mut cursor)
        .any(|c| return !c.is_named() && c.kind() == GLOBAL_SCOPE_ALIAS.1);
}

/// The sub-node naming a declaration: `name` for declarations, `key` for
/// object-literal entries.
fn name_node(node: Node<'_>) -> Option<Node<'_>> {
    return node
        .child_by_field_name("name")
        .or_else(|| return node.child_by_field_name("key"));
}

/// Start of a fully matched declaration: its name if it has one, else the node.
fn declaration_start(node: Node<'_>) -> usize {
    return name_node(node).unwrap_or(node).start_byte();
}

/// `Enter` consuming `consumed` segments when `matched`, otherwise `Skip`.
const fn enter_if(matched: bool, node: Node<'_>, consumed: usize) -> Step<'_> {
    if matched {
        return Step::Enter { consumed, node };
    }
    return Step::Skip;
}
