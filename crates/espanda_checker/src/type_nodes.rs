//! Types written in annotations: keywords, references to aliases,
//! interfaces, classes and type parameters, and the structural forms.

use espanda_ast::{KeywordType, NodeId, NodeKind, SignatureKind, TypeId, VariableId};
use espanda_binder::VariableKind;
use espanda_core::Atom;
use espanda_diagnostics::messages;

use crate::checker::Checker;
use crate::instantiate::Instantiator;
use crate::types::{IndexInfo, ObjectDescriptor, ObjectKind, ObjectType, Property, Signature, TypeKind};

/// Library types accepted by name without a declaration.
const BUILTIN_TYPES: &[&str] = &[
    "Object",
    "Function",
    "String",
    "Number",
    "Boolean",
    "Symbol",
    "BigInt",
    "Promise",
    "PromiseLike",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Date",
    "Error",
    "TypeError",
    "RangeError",
    "Iterable",
    "Iterator",
    "IterableIterator",
    "Generator",
    "AsyncGenerator",
    "ArrayLike",
    "Record",
    "Partial",
    "Required",
    "Readonly",
    "Pick",
    "Omit",
    "Exclude",
    "Extract",
    "NonNullable",
    "ReturnType",
    "Parameters",
    "InstanceType",
];

impl<'a> Checker<'a> {
    /// The type an annotation node denotes.
    pub(crate) fn type_from_node(&mut self, node: NodeId) -> TypeId {
        if let Some(ty) = self.node_cache.get(node) {
            return ty;
        }
        let ty = self.compute_type_from_node(node);
        self.node_cache.insert(node, ty);
        ty
    }

    fn compute_type_from_node(&mut self, node: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        match ast.kind(node) {
            NodeKind::TSKeywordType { keyword } => match keyword {
                KeywordType::Any => g.any,
                KeywordType::Unknown => g.unknown,
                KeywordType::Number => g.number,
                KeywordType::String => g.string,
                KeywordType::Boolean => g.boolean,
                KeywordType::BigInt => g.bigint,
                KeywordType::Symbol => g.symbol,
                KeywordType::Object => g.object,
                KeywordType::Void => g.void,
                KeywordType::Undefined => g.undefined,
                KeywordType::Null => g.null,
                KeywordType::Never => g.never,
            },
            NodeKind::TSLiteralType { literal } => self.check_expression(*literal),
            NodeKind::TSTypeReference { type_name, type_args } => self.type_reference(node, *type_name, type_args),
            NodeKind::TSUnionType { types } => {
                let members: Vec<TypeId> = types.iter().map(|&t| self.type_from_node(t)).collect();
                self.table.union(members)
            }
            NodeKind::TSIntersectionType { types } => {
                let members: Vec<TypeId> = types.iter().map(|&t| self.type_from_node(t)).collect();
                self.table.intersection(members)
            }
            NodeKind::TSArrayType { element_type } => {
                let element = self.type_from_node(*element_type);
                self.table.array(element)
            }
            NodeKind::TSTupleType { element_types } => {
                let elements = element_types.iter().map(|&t| self.type_from_node(t)).collect();
                self.table.tuple(elements)
            }
            NodeKind::TSFunctionType {
                type_params,
                params,
                return_type,
            } => {
                let signature = self.signature_type(node, *type_params, params, Some(*return_type));
                self.table.function(signature)
            }
            NodeKind::TSConstructorType {
                type_params,
                params,
                return_type,
            } => {
                let signature = self.signature_type(node, *type_params, params, Some(*return_type));
                let desc = ObjectDescriptor {
                    construct_signatures: vec![signature],
                    ..ObjectDescriptor::default()
                };
                self.table.object(ObjectKind::Function, None, desc)
            }
            NodeKind::TSTypeLiteral { members } => {
                let mut desc = ObjectDescriptor::default();
                self.fill_type_members(members, &mut desc);
                self.table.object(ObjectKind::ObjectLiteral, None, desc)
            }
            NodeKind::TSParenthesizedType { type_annotation } => self.type_from_node(*type_annotation),
            NodeKind::TSTypeQuery { expr_name } => self.type_query(node, *expr_name),
            NodeKind::TSTypePredicate { asserts, .. } => {
                if *asserts {
                    g.void
                } else {
                    g.boolean
                }
            }
            NodeKind::TSImportType { .. } => {
                self.unsupported(node, "import type");
                g.any
            }
            _ => g.any,
        }
    }

    /// The signature of a function type, method signature or call/construct
    /// signature member. Its parameters live in the node's own scope.
    fn signature_type(
        &mut self,
        node: NodeId,
        type_params: Option<NodeId>,
        params: &[NodeId],
        return_type: Option<NodeId>,
    ) -> Signature {
        let g = *self.table.globals();
        self.with_scope(node, |c| {
            let type_params = c.type_parameters(type_params);
            let mut signature = c.signature_from_params(node, params);
            signature.type_params = type_params;
            signature.return_type = return_type.map_or(g.any, |r| c.type_from_node(r));
            signature.decl = Some(node);
            signature
        })
    }

    /// Add the members of a type literal or interface body to `desc`.
    /// Properties already present are kept; repeated method signatures
    /// become overloads.
    pub(crate) fn fill_type_members(&mut self, members: &[NodeId], desc: &mut ObjectDescriptor) {
        let ast = self.ast;
        let g = *self.table.globals();
        for &member in members {
            match ast.kind(member) {
                NodeKind::TSPropertySignature {
                    key,
                    type_annotation,
                    optional,
                    readonly,
                } => {
                    let ty = type_annotation.map_or(g.any, |a| self.type_from_node(a));
                    desc.properties.entry(*key).or_insert(Property {
                        name: *key,
                        ty,
                        optional: *optional,
                        readonly: *readonly,
                    });
                }
                NodeKind::TSMethodSignature {
                    key,
                    type_params,
                    params,
                    return_type,
                    optional,
                } => {
                    let signature = self.signature_type(member, *type_params, params, *return_type);
                    let existing = desc.properties.get(key).map(|p| p.ty);
                    let overloads = existing.and_then(|ty| match self.table.kind(ty) {
                        TypeKind::Object(object) if object.kind == ObjectKind::Function => Some(ty),
                        _ => None,
                    });
                    match overloads {
                        Some(ty) => {
                            if let TypeKind::Object(object) = self.table.kind_mut(ty) {
                                object.desc.call_signatures.push(signature);
                            }
                        }
                        None if existing.is_none() => {
                            let ty = self.table.function(signature);
                            desc.properties.insert(
                                *key,
                                Property {
                                    optional: *optional,
                                    ..Property::new(*key, ty)
                                },
                            );
                        }
                        None => {}
                    }
                }
                NodeKind::TSSignatureDeclaration {
                    kind,
                    type_params,
                    params,
                    return_type,
                } => {
                    let signature = self.signature_type(member, *type_params, params, *return_type);
                    match kind {
                        SignatureKind::Call => desc.call_signatures.push(signature),
                        SignatureKind::Construct => desc.construct_signatures.push(signature),
                    }
                }
                NodeKind::TSIndexSignature {
                    key_type,
                    type_annotation,
                    readonly,
                    ..
                } => {
                    let key = self.type_from_node(*key_type);
                    let info = IndexInfo {
                        ty: self.type_from_node(*type_annotation),
                        readonly: *readonly,
                    };
                    let slot = if self.table.kind(key).is_number_like() {
                        &mut desc.number_index
                    } else {
                        &mut desc.string_index
                    };
                    slot.get_or_insert(info);
                }
                _ => {}
            }
        }
    }

    /// `typeof x` and `typeof x.y.z` in type position.
    fn type_query(&mut self, node: NodeId, expr_name: Atom) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let text = ast.str(expr_name);
        let mut segments = text.split('.');
        let head = segments.next().unwrap_or(text);
        let mut ty = match self.scopes.reference(node) {
            Some(var) => self.type_of_variable(var),
            None => match head {
                "undefined" => g.undefined,
                _ => {
                    self.error(node, &messages::CANNOT_FIND_NAME_0, &[head]);
                    return g.any;
                }
            },
        };
        for segment in segments {
            let name = ast.intern(segment);
            ty = self.property_of_type(ty, name, Some(node));
        }
        ty
    }

    // ========================================================================
    // References
    // ========================================================================

    fn type_reference(&mut self, node: NodeId, name: Atom, type_args: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let Some(var) = self.scopes.reference(node) else {
            return self.unresolved_type_reference(node, name, type_args);
        };
        let declared = self.declared_type_of(var);
        let params = self.generic_params.get(&var).cloned().unwrap_or_default();
        let args: Vec<TypeId> = type_args.iter().map(|&a| self.type_from_node(a)).collect();
        let text = ast.str(name);
        if params.is_empty() {
            if !args.is_empty() {
                self.error(node, &messages::TYPE_0_IS_NOT_GENERIC, &[text]);
            }
            return declared;
        }
        let required = params
            .iter()
            .take_while(|&&p| !matches!(self.table.kind(p), TypeKind::TypeParameter { default: Some(_), .. }))
            .count();
        if args.len() < required || args.len() > params.len() {
            let display = self.generic_display(text, &params);
            self.error(
                node,
                &messages::GENERIC_TYPE_0_REQUIRES_1_TYPE_ARGUMENTS,
                &[&display, &required.to_string()],
            );
            return g.any;
        }
        let args = self.fill_type_arguments(&params, &args);
        if args == params {
            return declared;
        }
        if let Some(&ty) = self.generic_refs.get(&(var, args.clone())) {
            return ty;
        }
        let mut instantiator = Instantiator::from_pairs(&params, &args);
        let ty = instantiator.instantiate(&mut self.table, declared);
        self.generic_refs.insert((var, args), ty);
        ty
    }

    /// `Name<T, U>` as shown in arity errors.
    fn generic_display(&self, name: &str, params: &[TypeId]) -> String {
        let names: Vec<&str> = params
            .iter()
            .map(|&p| match self.table.kind(p) {
                TypeKind::TypeParameter { name, .. } => self.ast.str(*name),
                _ => "T",
            })
            .collect();
        format!("{name}<{}>", names.join(", "))
    }

    fn unresolved_type_reference(&mut self, node: NodeId, name: Atom, type_args: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let args: Vec<TypeId> = type_args.iter().map(|&a| self.type_from_node(a)).collect();
        let text = ast.str(name);
        match text {
            "" => g.any,
            "Array" | "ReadonlyArray" => match args.as_slice() {
                [element] => self.table.array(*element),
                _ => {
                    let display = format!("{text}<T>");
                    self.error(node, &messages::GENERIC_TYPE_0_REQUIRES_1_TYPE_ARGUMENTS, &[&display, "1"]);
                    g.any
                }
            },
            "RegExp" => self.regexp_type(),
            _ if BUILTIN_TYPES.contains(&text) || text.contains('.') => g.any,
            _ => {
                let scope = self.enclosing_scope(node);
                if self.scopes.lookup_value(scope, name).is_some() {
                    self.error(node, &messages::_0_REFERS_TO_A_VALUE_BUT_IS_BEING_USED_AS_A_TYPE_HERE, &[text]);
                } else {
                    self.error(node, &messages::CANNOT_FIND_NAME_0, &[text]);
                }
                g.any
            }
        }
    }

    // ========================================================================
    // Declarations in the type namespace
    // ========================================================================

    /// The type a type-namespace variable declares: an alias target, an
    /// interface, a class instance type or a type parameter.
    pub(crate) fn declared_type_of(&mut self, var: VariableId) -> TypeId {
        if let Some(&ty) = self.declared_types.get(&var) {
            return ty;
        }
        let g = *self.table.globals();
        let variable = self.scopes.variable(var);
        let (kind, decl) = (variable.kind, variable.decl);
        let declarations = variable.declarations.to_vec();
        let class = declarations.iter().find_map(|&d| self.class_definition_of(d));
        match kind {
            VariableKind::TypeParameter => self.type_parameter_type(var, decl),
            VariableKind::TypeAlias => self.alias_type(var, decl),
            VariableKind::Interface | VariableKind::Class => match class {
                Some(definition) => {
                    let instance = self.class_types(definition).instance;
                    self.declared_types.entry(var).or_insert(instance);
                    instance
                }
                None => self.interface_type(var, &declarations),
            },
            _ => g.any,
        }
    }

    fn alias_type(&mut self, var: VariableId, decl: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let NodeKind::TSTypeAliasDeclaration {
            id,
            type_params,
            type_annotation,
        } = ast.kind(decl)
        else {
            return g.any;
        };
        if !self.resolving_types.insert(var) {
            if self.reported_circular.insert(var) {
                let name = ast.str(*id);
                self.error(decl, &messages::TYPE_ALIAS_0_CIRCULARLY_REFERENCES_ITSELF, &[name]);
            }
            return g.any;
        }
        let ty = self.with_scope(decl, |c| {
            let params = c.type_parameters(*type_params);
            if !params.is_empty() {
                c.generic_params.insert(var, params);
            }
            match ast.kind(*type_annotation) {
                // object types may refer to themselves through their members
                NodeKind::TSTypeLiteral { members } => {
                    let placeholder = c.table.object(ObjectKind::ObjectLiteral, None, ObjectDescriptor::default());
                    c.declared_types.insert(var, placeholder);
                    c.node_cache.insert(*type_annotation, placeholder);
                    let mut desc = ObjectDescriptor::default();
                    c.fill_type_members(members, &mut desc);
                    c.table.set_kind(
                        placeholder,
                        TypeKind::Object(ObjectType {
                            kind: ObjectKind::ObjectLiteral,
                            name: None,
                            type_args: Vec::new(),
                            desc,
                        }),
                    );
                    placeholder
                }
                _ => c.type_from_node(*type_annotation),
            }
        });
        self.resolving_types.remove(&var);
        self.declared_types.insert(var, ty);
        ty
    }

    fn interface_type(&mut self, var: VariableId, declarations: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let name = self.scopes.variable(var).name;
        let placeholder = self.table.object(ObjectKind::Interface, Some(name), ObjectDescriptor::default());
        self.declared_types.insert(var, placeholder);

        let type_params = declarations.iter().find_map(|&d| match ast.kind(d) {
            NodeKind::TSInterfaceDeclaration {
                type_params: Some(type_params),
                ..
            } => Some((d, *type_params)),
            _ => None,
        });
        let params = match type_params {
            Some((decl, type_params)) => self.with_scope(decl, |c| c.type_parameters(Some(type_params))),
            None => Vec::new(),
        };
        if !params.is_empty() {
            self.generic_params.insert(var, params.clone());
        }

        let mut desc = ObjectDescriptor::default();
        let mut bases = Vec::new();
        for &decl in declarations {
            let NodeKind::TSInterfaceDeclaration { extends, body, .. } = ast.kind(decl) else {
                continue;
            };
            self.with_scope(decl, |c| {
                c.fill_type_members(body, &mut desc);
                for &heritage in extends {
                    if let NodeKind::TSInterfaceHeritage { expression } = ast.kind(heritage) {
                        bases.push(c.type_from_node(*expression));
                    }
                }
            });
        }
        for base in bases {
            self.inherit_members(base, &mut desc);
        }

        self.table.set_kind(
            placeholder,
            TypeKind::Object(ObjectType {
                kind: ObjectKind::Interface,
                name: Some(name),
                type_args: params,
                desc,
            }),
        );
        tracing::trace!(?var, "built interface type");
        placeholder
    }

    /// Copy the members of `base` that `desc` does not redeclare.
    fn inherit_members(&self, base: TypeId, desc: &mut ObjectDescriptor) {
        let Some(object) = self.table.object_type(base) else {
            return;
        };
        for property in object.desc.properties.values() {
            if !desc.properties.contains_key(&property.name) {
                desc.properties.insert(property.name, property.clone());
            }
        }
        desc.call_signatures.extend(object.desc.call_signatures.iter().cloned());
        desc.construct_signatures
            .extend(object.desc.construct_signatures.iter().cloned());
        if desc.string_index.is_none() {
            desc.string_index = object.desc.string_index.clone();
        }
        if desc.number_index.is_none() {
            desc.number_index = object.desc.number_index.clone();
        }
    }

    /// Interface declarations merged into a class add their members to the
    /// instance type.
    pub(crate) fn merge_interface_declarations(&mut self, var: VariableId, desc: &mut ObjectDescriptor) {
        let ast = self.ast;
        let declarations = self.scopes.variable(var).declarations.to_vec();
        for decl in declarations {
            let NodeKind::TSInterfaceDeclaration { body, .. } = ast.kind(decl) else {
                continue;
            };
            let mut merged = ObjectDescriptor::default();
            self.with_scope(decl, |c| c.fill_type_members(body, &mut merged));
            for (name, property) in merged.properties {
                desc.properties.entry(name).or_insert(property);
            }
            desc.call_signatures.extend(merged.call_signatures);
        }
    }

    // ========================================================================
    // Type parameters
    // ========================================================================

    /// The type parameters declared by a `<...>` list, in order.
    pub(crate) fn type_parameters(&mut self, type_params: Option<NodeId>) -> Vec<TypeId> {
        let ast = self.ast;
        let Some(type_params) = type_params else {
            return Vec::new();
        };
        let NodeKind::TSTypeParameterDeclaration { params } = ast.kind(type_params) else {
            return Vec::new();
        };
        params
            .iter()
            .map(|&param| match self.decl_vars.get(&param).copied() {
                Some(var) => self.declared_type_of(var),
                None => self.fresh_type_parameter(param),
            })
            .collect()
    }

    fn type_parameter_type(&mut self, var: VariableId, decl: NodeId) -> TypeId {
        let ty = self.fresh_type_parameter(decl);
        self.declared_types.insert(var, ty);
        ty
    }

    /// Allocate the parameter before resolving its constraint and default,
    /// which may mention it.
    fn fresh_type_parameter(&mut self, decl: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let NodeKind::TSTypeParameter {
            name,
            constraint,
            default,
        } = ast.kind(decl)
        else {
            return g.unknown;
        };
        let ty = self.table.alloc(TypeKind::TypeParameter {
            name: *name,
            constraint: None,
            default: None,
        });
        if let Some(&var) = self.decl_vars.get(&decl) {
            self.declared_types.insert(var, ty);
        }
        let constraint = constraint.map(|c| self.type_from_node(c));
        let default = default.map(|d| self.type_from_node(d));
        self.table.set_kind(
            ty,
            TypeKind::TypeParameter {
                name: *name,
                constraint,
                default,
            },
        );
        ty
    }
}
