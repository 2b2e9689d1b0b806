//! Structured debug dumps.
//!
//! A node dumps as `{"type": <kind name>, <scalar fields>, <child fields>,
//! "loc": ...}`. Child fields appear in [`NodeKind::for_each_slot`] order,
//! which is what lets [`DumpShape::from_json`] recover the kind tree from a
//! dump without re-parsing any source.

use crate::ast::Ast;
use crate::node::{MetaPropertyKind, MethodKind, NodeKind, PropertyKind};
use crate::types::NodeId;
use crate::visitor::Slot;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("invalid dump: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a node object, found {0}")]
    NotANode(String),
    #[error("node object has no \"type\" field")]
    MissingType,
}

/// Turns (part of) an [`Ast`] into a JSON tree.
pub struct AstDumper<'a> {
    ast: &'a Ast,
    with_loc: bool,
}

impl<'a> AstDumper<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self { ast, with_loc: true }
    }

    /// Omit `"loc"` entries, for dumps compared across edits.
    pub fn without_locations(mut self) -> Self {
        self.with_loc = false;
        self
    }

    pub fn dump(&self, id: NodeId) -> Value {
        let kind = self.ast.kind(id);
        let mut map = Map::new();
        map.insert("type".into(), Value::from(kind.type_name()));
        self.scalar_fields(kind, &mut map);
        kind.for_each_slot(&mut |field, slot| {
            let value = match slot {
                Slot::Required(child) => self.dump(child),
                Slot::Optional(child) => child.map_or(Value::Null, |c| self.dump(c)),
                Slot::List(children) => {
                    Value::Array(children.iter().map(|&c| self.dump(c)).collect())
                }
            };
            map.insert(field.into(), value);
        });
        if self.with_loc {
            let range = self.ast.range(id);
            let lines = self.ast.line_map();
            map.insert(
                "loc".into(),
                json!({
                    "start": lines.line_column(range.pos),
                    "end": lines.line_column(range.end),
                }),
            );
        }
        Value::Object(map)
    }

    pub fn dump_to_string(&self, id: NodeId) -> String {
        // A `Value` always serializes.
        serde_json::to_string_pretty(&self.dump(id)).unwrap_or_default()
    }

    fn scalar_fields(&self, kind: &NodeKind, map: &mut Map<String, Value>) {
        let ast = self.ast;
        let mut put = |key: &str, value: Value| {
            map.insert(key.to_string(), value);
        };
        match kind {
            NodeKind::NumberLiteral { value } => put("value", Value::from(*value)),
            NodeKind::StringLiteral { value } | NodeKind::BigIntLiteral { value } => {
                put("value", Value::from(ast.str(*value)))
            }
            NodeKind::BooleanLiteral { value } => put("value", Value::from(*value)),
            NodeKind::NullLiteral => put("value", Value::Null),
            NodeKind::RegExpLiteral { pattern, flags } => {
                put("pattern", Value::from(ast.str(*pattern)));
                put("flags", Value::from(ast.str(*flags)));
            }
            NodeKind::TemplateLiteral { quasis, .. } => put(
                "quasis",
                quasis.iter().map(|q| Value::from(ast.str(*q))).collect(),
            ),
            NodeKind::Identifier { name, optional, .. } => {
                put("name", Value::from(ast.str(*name)));
                if *optional {
                    put("optional", Value::from(true));
                }
            }
            NodeKind::Property {
                kind,
                computed,
                shorthand,
                ..
            } => {
                put(
                    "kind",
                    Value::from(match kind {
                        PropertyKind::Init => "init",
                        PropertyKind::Get => "get",
                        PropertyKind::Set => "set",
                        PropertyKind::Method => "method",
                    }),
                );
                put("computed", Value::from(*computed));
                put("shorthand", Value::from(*shorthand));
            }
            NodeKind::UnaryExpression { operator, .. } => {
                put("operator", Value::from(operator.as_str()))
            }
            NodeKind::UpdateExpression {
                operator, prefix, ..
            } => {
                put("operator", Value::from(operator.as_str()));
                put("prefix", Value::from(*prefix));
            }
            NodeKind::BinaryExpression { operator, .. } => {
                put("operator", Value::from(operator.as_str()))
            }
            NodeKind::AssignmentExpression { operator, .. } => {
                put("operator", Value::from(operator.as_str()))
            }
            NodeKind::CallExpression { optional, .. } => put("optional", Value::from(*optional)),
            NodeKind::MemberExpression {
                computed, optional, ..
            } => {
                put("computed", Value::from(*computed));
                put("optional", Value::from(*optional));
            }
            NodeKind::YieldExpression { delegate, .. } => put("delegate", Value::from(*delegate)),
            NodeKind::MetaProperty { kind } => put(
                "kind",
                Value::from(match kind {
                    MetaPropertyKind::NewTarget => "new.target",
                    MetaPropertyKind::ImportMeta => "import.meta",
                }),
            ),
            NodeKind::ScriptFunction { flags, .. } => {
                put("generator", Value::from(flags.is_generator()));
                put("async", Value::from(flags.is_async()));
                put("arrow", Value::from(flags.is_arrow()));
            }
            NodeKind::MethodDefinition {
                kind,
                is_static,
                computed,
                ..
            } => {
                put(
                    "kind",
                    Value::from(match kind {
                        MethodKind::Constructor => "constructor",
                        MethodKind::Method => "method",
                        MethodKind::Get => "get",
                        MethodKind::Set => "set",
                    }),
                );
                put("static", Value::from(*is_static));
                put("computed", Value::from(*computed));
            }
            NodeKind::ClassProperty {
                is_static,
                readonly,
                optional,
                computed,
                ..
            } => {
                put("static", Value::from(*is_static));
                put("readonly", Value::from(*readonly));
                put("optional", Value::from(*optional));
                put("computed", Value::from(*computed));
            }
            NodeKind::VariableDeclaration { kind, declare, .. } => {
                put("kind", Value::from(kind.as_str()));
                put("declare", Value::from(*declare));
            }
            NodeKind::ForOfStatement { is_await, .. } => put("await", Value::from(*is_await)),
            NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => put(
                "label",
                label.map_or(Value::Null, |l| Value::from(ast.str(l))),
            ),
            NodeKind::LabelledStatement { label, .. } => {
                put("label", Value::from(ast.str(*label)))
            }
            NodeKind::TSTypeAliasDeclaration { id, .. }
            | NodeKind::TSInterfaceDeclaration { id, .. } => {
                put("id", Value::from(ast.str(*id)))
            }
            NodeKind::TSTypeParameter { name, .. } => put("name", Value::from(ast.str(*name))),
            NodeKind::TSTypeReference { type_name, .. } => {
                put("typeName", Value::from(ast.str(*type_name)))
            }
            NodeKind::TSPropertySignature {
                key,
                optional,
                readonly,
                ..
            } => {
                put("key", Value::from(ast.str(*key)));
                put("optional", Value::from(*optional));
                put("readonly", Value::from(*readonly));
            }
            NodeKind::TSMethodSignature { key, optional, .. } => {
                put("key", Value::from(ast.str(*key)));
                put("optional", Value::from(*optional));
            }
            NodeKind::TSIndexSignature {
                param_name,
                readonly,
                ..
            } => {
                put("parameterName", Value::from(ast.str(*param_name)));
                put("readonly", Value::from(*readonly));
            }
            NodeKind::TSTypeQuery { expr_name } => {
                put("exprName", Value::from(ast.str(*expr_name)))
            }
            NodeKind::TSTypePredicate {
                parameter_name,
                asserts,
                ..
            } => {
                put("parameterName", Value::from(ast.str(*parameter_name)));
                put("asserts", Value::from(*asserts));
            }
            NodeKind::TSImportType {
                argument,
                qualifier,
            } => {
                put("argument", Value::from(ast.str(*argument)));
                put(
                    "qualifier",
                    qualifier.map_or(Value::Null, |q| Value::from(ast.str(q))),
                );
            }
            _ => {}
        }
    }
}

/// The kind-name skeleton of a tree: what survives a dump round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpShape {
    pub kind: String,
    pub children: Vec<DumpShape>,
}

impl DumpShape {
    /// Shape of the subtree rooted at `id`.
    pub fn of(ast: &Ast, id: NodeId) -> Self {
        DumpShape {
            kind: ast.kind(id).type_name().to_string(),
            children: ast.children(id).into_iter().map(|c| Self::of(ast, c)).collect(),
        }
    }

    /// Recover a shape from a dump produced by [`AstDumper`].
    pub fn from_json(value: &Value) -> Result<Self, DumpError> {
        let Value::Object(map) = value else {
            return Err(DumpError::NotANode(value.to_string()));
        };
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DumpError::MissingType)?
            .to_string();
        let mut children = Vec::new();
        for (key, field) in map {
            if key == "type" || key == "loc" {
                continue;
            }
            match field {
                Value::Object(_) => children.push(Self::from_json(field)?),
                Value::Array(items) => {
                    for item in items.iter().filter(|i| i.is_object()) {
                        children.push(Self::from_json(item)?);
                    }
                }
                _ => {}
            }
        }
        Ok(DumpShape { kind, children })
    }

    pub fn parse(text: &str) -> Result<Self, DumpError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Number of nodes in the shape.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DumpShape::size).sum::<usize>()
    }
}
