//! Rendering types for diagnostics.

use espanda_ast::TypeId;
use espanda_core::collections::VisitedSet;
use espanda_core::{format_number, StringInterner};
use std::fmt::Write;

use crate::types::{ObjectKind, ObjectType, Signature, TypeKind, TypeTable};

/// Render `id` the way diagnostics print types: `number[]`, `"a" | 1`,
/// `(x: number) => string`, `{ a: number; b?: string; }`.
pub fn type_to_string(table: &TypeTable, interner: &StringInterner, id: TypeId) -> String {
    let mut printer = TypePrinter {
        table,
        interner,
        visiting: VisitedSet::new(),
        out: String::new(),
    };
    printer.print(id);
    printer.out
}

struct TypePrinter<'a> {
    table: &'a TypeTable,
    interner: &'a StringInterner,
    visiting: VisitedSet<TypeId>,
    out: String,
}

impl TypePrinter<'_> {
    fn print(&mut self, id: TypeId) {
        let table = self.table;
        match table.kind(id) {
            TypeKind::Any => self.out.push_str("any"),
            TypeKind::Unknown => self.out.push_str("unknown"),
            TypeKind::Never => self.out.push_str("never"),
            TypeKind::Void => self.out.push_str("void"),
            TypeKind::Undefined => self.out.push_str("undefined"),
            TypeKind::Null => self.out.push_str("null"),
            TypeKind::Number => self.out.push_str("number"),
            TypeKind::String => self.out.push_str("string"),
            TypeKind::Boolean => self.out.push_str("boolean"),
            TypeKind::BigInt => self.out.push_str("bigint"),
            TypeKind::Symbol => self.out.push_str("symbol"),
            TypeKind::NonPrimitive => self.out.push_str("object"),
            TypeKind::NumberLiteral(value) => self.out.push_str(&format_number(*value)),
            TypeKind::StringLiteral(value) => {
                let _ = write!(self.out, "\"{}\"", self.interner.resolve(*value));
            }
            TypeKind::BooleanLiteral(value) => self.out.push_str(if *value { "true" } else { "false" }),
            TypeKind::BigIntLiteral(value) => {
                let _ = write!(self.out, "{}n", self.interner.resolve(*value));
            }
            TypeKind::Array(element) => {
                let wrap = matches!(
                    table.kind(*element),
                    TypeKind::Union(_) | TypeKind::Intersection(_)
                ) || table.object_type(*element).is_some_and(is_anonymous_function);
                if wrap {
                    self.out.push('(');
                    self.print(*element);
                    self.out.push(')');
                } else {
                    self.print(*element);
                }
                self.out.push_str("[]");
            }
            TypeKind::Tuple(elements) => {
                self.out.push('[');
                self.list(elements, ", ");
                self.out.push(']');
            }
            TypeKind::Union(members) => self.list(members, " | "),
            TypeKind::Intersection(members) => self.list(members, " & "),
            TypeKind::TypeParameter { name, .. } => self.out.push_str(self.interner.resolve(*name)),
            TypeKind::Object(object) => {
                if !self.visiting.enter(id) {
                    self.out.push_str("any");
                    return;
                }
                self.object(object);
                self.visiting.leave(id);
            }
        }
    }

    fn list(&mut self, members: &[TypeId], separator: &str) {
        for (i, &member) in members.iter().enumerate() {
            if i > 0 {
                self.out.push_str(separator);
            }
            self.print(member);
        }
    }

    fn object(&mut self, object: &ObjectType) {
        if let Some(name) = object.name.filter(|_| {
            matches!(object.kind, ObjectKind::Interface | ObjectKind::ClassInstance)
        }) {
            self.out.push_str(self.interner.resolve(name));
            if !object.type_args.is_empty() {
                self.out.push('<');
                self.list(&object.type_args, ", ");
                self.out.push('>');
            }
            return;
        }
        if object.kind == ObjectKind::Constructor {
            if let Some(name) = object.name {
                let _ = write!(self.out, "typeof {}", self.interner.resolve(name));
                return;
            }
        }

        let desc = &object.desc;
        if desc.properties.is_empty() && desc.string_index.is_none() && desc.number_index.is_none() {
            match (desc.call_signatures.as_slice(), desc.construct_signatures.as_slice()) {
                ([call], []) => return self.signature(call, "=>", ""),
                ([], [construct]) => return self.signature(construct, "=>", "new "),
                ([], []) => return self.out.push_str("{}"),
                _ => {}
            }
        }

        self.out.push_str("{ ");
        for signature in &desc.call_signatures {
            self.signature(signature, ":", "");
            self.out.push_str("; ");
        }
        for signature in &desc.construct_signatures {
            self.signature(signature, ":", "new ");
            self.out.push_str("; ");
        }
        for (index, key) in [(&desc.string_index, "string"), (&desc.number_index, "number")] {
            if let Some(index) = index {
                if index.readonly {
                    self.out.push_str("readonly ");
                }
                let _ = write!(self.out, "[x: {key}]: ");
                self.print(index.ty);
                self.out.push_str("; ");
            }
        }
        for property in desc.properties.values() {
            if property.readonly {
                self.out.push_str("readonly ");
            }
            self.out.push_str(self.interner.resolve(property.name));
            if property.optional {
                self.out.push('?');
            }
            self.out.push_str(": ");
            self.print(property.ty);
            self.out.push_str("; ");
        }
        self.out.push('}');
    }

    fn signature(&mut self, signature: &Signature, arrow: &str, prefix: &str) {
        self.out.push_str(prefix);
        if !signature.type_params.is_empty() {
            self.out.push('<');
            self.list(&signature.type_params, ", ");
            self.out.push('>');
        }
        self.out.push('(');
        for (i, param) in signature.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(self.interner.resolve(param.name));
            if param.optional {
                self.out.push('?');
            }
            self.out.push_str(": ");
            self.print(param.ty);
        }
        if let Some(rest) = signature.rest {
            if !signature.params.is_empty() {
                self.out.push_str(", ");
            }
            self.out.push_str("...args: ");
            self.print(rest);
        }
        let _ = write!(self.out, ") {arrow} ");
        self.print(signature.return_type);
    }
}

fn is_anonymous_function(object: &ObjectType) -> bool {
    object.name.is_none() && object.desc.properties.is_empty() && !object.desc.call_signatures.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectDescriptor, Param, Property};

    #[test]
    fn test_primitives_and_literals() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let one = table.number_literal(1.0);
        let a = table.string_literal(interner.intern("a"));
        let big = table.bigint_literal(interner.intern("10"));
        assert_eq!(type_to_string(&table, &interner, g.number), "number");
        assert_eq!(type_to_string(&table, &interner, one), "1");
        assert_eq!(type_to_string(&table, &interner, a), "\"a\"");
        assert_eq!(type_to_string(&table, &interner, big), "10n");
        let union = table.union([g.string, g.null]);
        assert_eq!(type_to_string(&table, &interner, union), "string | null");
    }

    #[test]
    fn test_arrays_and_tuples() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let numbers = table.array(g.number);
        assert_eq!(type_to_string(&table, &interner, numbers), "number[]");
        let union = table.union([g.string, g.number]);
        let mixed = table.array(union);
        assert_eq!(type_to_string(&table, &interner, mixed), "(string | number)[]");
        let pair = table.tuple(vec![g.string, g.boolean]);
        assert_eq!(type_to_string(&table, &interner, pair), "[string, boolean]");
    }

    #[test]
    fn test_objects_and_functions() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let (a, b, x) = (interner.intern("a"), interner.intern("b"), interner.intern("x"));
        let mut desc = ObjectDescriptor::default();
        desc.properties.insert(a, Property::new(a, g.number));
        desc.properties.insert(
            b,
            Property {
                optional: true,
                ..Property::new(b, g.string)
            },
        );
        let literal = table.object(ObjectKind::ObjectLiteral, None, desc);
        assert_eq!(type_to_string(&table, &interner, literal), "{ a: number; b?: string; }");
        assert_eq!(type_to_string(&table, &interner, g.empty_object), "{}");

        let function = table.function(Signature::new(
            vec![Param {
                name: x,
                ty: g.number,
                optional: false,
            }],
            g.string,
        ));
        assert_eq!(type_to_string(&table, &interner, function), "(x: number) => string");
    }
}
