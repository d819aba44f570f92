//! Composer seam and the structural default implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::composition::errors::CompositionError;
use crate::registry::ServiceDescriptor;
use crate::schema::{self, parse_partial, TypeKind};

/// A field of a merged type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedField {
    /// Named type the field resolves to, wrappers stripped.
    pub type_name: String,
    /// Type expression as written (`[Review!]!`).
    pub type_text: String,
    /// Service that contributed the field.
    pub contributed_by: String,
}

/// A type in the composed schema, with fields merged across services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedType {
    pub kind: TypeKind,
    /// Service that defined the base type.
    pub owner: String,
    pub fields: BTreeMap<String, MergedField>,
    /// Enum values or union members.
    pub members: Vec<String>,
}

/// The unified schema produced by a successful composition.
///
/// Immutable once built. Deterministic for a given descriptor set: types and
/// fields are kept in name order, so equal inputs render equal documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedSchema {
    /// Rendered supergraph document.
    pub sdl: String,
    pub types: BTreeMap<String, MergedType>,
}

impl ComposedSchema {
    /// Whether the composed schema exposes `type_name.field`.
    pub fn has_field(&self, type_name: &str, field: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.fields.contains_key(field))
    }
}

/// The composition algorithm boundary.
///
/// Implementations must be pure and deterministic: the same descriptor set
/// always produces the same result, and failures leave no trace.
pub trait Composer: Send + Sync {
    fn compose(&self, services: &[ServiceDescriptor]) -> Result<ComposedSchema, Vec<CompositionError>>;
}

/// Structural composition: merges type definitions and extensions across
/// services and rejects sets that cannot form one coherent graph.
///
/// This stands in for the real federation algorithm, which is an external
/// collaborator. It enforces the structural half of the contract: unique
/// type ownership, resolvable extensions and field references, exactly one
/// `Query` root.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralComposer;

impl Composer for StructuralComposer {
    fn compose(&self, services: &[ServiceDescriptor]) -> Result<ComposedSchema, Vec<CompositionError>> {
        let mut errors = Vec::new();
        let mut parsed = Vec::new();

        for svc in services {
            match parse_partial(&svc.schema_sdl) {
                Ok(schema) => parsed.push((svc.name.as_str(), schema)),
                Err(e) => errors.push(CompositionError::InvalidPartialSchema {
                    service: svc.name.clone(),
                    detail: e.to_string(),
                }),
            }
        }

        // Base definitions: exactly one owner per type name.
        let mut types: BTreeMap<String, MergedType> = BTreeMap::new();
        for (service, schema) in &parsed {
            for def in schema.types.iter().filter(|t| !t.extend) {
                if let Some(existing) = types.get(&def.name) {
                    errors.push(CompositionError::DuplicateTypeOwnership {
                        type_name: def.name.clone(),
                        first: existing.owner.clone(),
                        second: service.to_string(),
                    });
                    continue;
                }
                let fields = def
                    .fields
                    .iter()
                    .map(|f| {
                        (
                            f.name.clone(),
                            MergedField {
                                type_name: f.type_name.clone(),
                                type_text: f.type_text.clone(),
                                contributed_by: service.to_string(),
                            },
                        )
                    })
                    .collect();
                types.insert(
                    def.name.clone(),
                    MergedType {
                        kind: def.kind,
                        owner: service.to_string(),
                        fields,
                        members: def.members.clone(),
                    },
                );
            }
        }

        // Extensions: target must exist, contributed fields must not collide.
        for (service, schema) in &parsed {
            for ext in schema.types.iter().filter(|t| t.extend) {
                let Some(target) = types.get_mut(&ext.name) else {
                    errors.push(CompositionError::UnresolvedExtension {
                        service: service.to_string(),
                        type_name: ext.name.clone(),
                    });
                    continue;
                };
                for field in &ext.fields {
                    if let Some(existing) = target.fields.get(&field.name) {
                        errors.push(CompositionError::FieldConflict {
                            type_name: ext.name.clone(),
                            field: field.name.clone(),
                            first: existing.contributed_by.clone(),
                            second: service.to_string(),
                        });
                        continue;
                    }
                    target.fields.insert(
                        field.name.clone(),
                        MergedField {
                            type_name: field.type_name.clone(),
                            type_text: field.type_text.clone(),
                            contributed_by: service.to_string(),
                        },
                    );
                }
            }
        }

        // Every field must resolve to a known type or a built-in scalar.
        for (type_name, merged) in &types {
            for (field_name, field) in &merged.fields {
                if !types.contains_key(&field.type_name) && !schema::is_builtin_scalar(&field.type_name) {
                    errors.push(CompositionError::UnresolvedFieldType {
                        service: field.contributed_by.clone(),
                        type_name: type_name.clone(),
                        field: field_name.clone(),
                        referenced: field.type_name.clone(),
                    });
                }
            }
        }

        if !types.get("Query").is_some_and(|t| t.kind == TypeKind::Object) {
            errors.push(CompositionError::MissingQueryRoot);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let sdl = render_supergraph(&types);
        Ok(ComposedSchema { sdl, types })
    }
}

fn render_supergraph(types: &BTreeMap<String, MergedType>) -> String {
    let mut out = String::new();
    for (name, ty) in types {
        match ty.kind {
            TypeKind::Scalar => {
                out.push_str(&format!("scalar {name}\n\n"));
            }
            TypeKind::Union => {
                out.push_str(&format!("union {name} = {}\n\n", ty.members.join(" | ")));
            }
            TypeKind::Enum => {
                out.push_str(&format!("enum {name} {{\n"));
                for value in &ty.members {
                    out.push_str(&format!("  {value}\n"));
                }
                out.push_str("}\n\n");
            }
            TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
                let keyword = match ty.kind {
                    TypeKind::Interface => "interface",
                    TypeKind::Input => "input",
                    _ => "type",
                };
                out.push_str(&format!("{keyword} {name} {{\n"));
                for (field_name, field) in &ty.fields {
                    out.push_str(&format!("  {field_name}: {}\n", field.type_text));
                }
                out.push_str("}\n\n");
            }
        }
    }
    out
}
