//! Closed classification of field types.
//!
//! Every [`TypeExpr`] resolves to exactly one [`TypeDescriptor`] at
//! registration time. Resolution is total: shapes the engine does not
//! specialize become [`TypeDescriptor::Opaque`] and pass through untouched.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::record::{EnumDef, RecordId, TypeExpr};
use crate::schema::SchemaRegistry;
use crate::value::{self, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Integer,
    Float,
    String,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enum(Arc<EnumDescriptor>),
    Optional(Box<TypeDescriptor>),
    Sequence(Box<TypeDescriptor>),
    Mapping(Box<TypeDescriptor>, Box<TypeDescriptor>),
    NestedRecord(RecordId),
    Opaque,
}

impl TypeDescriptor {
    /// The descriptor with one level of `Optional` removed.
    pub fn unwrap_optional(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner,
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    fn optional(inner: TypeDescriptor) -> Self {
        match inner {
            TypeDescriptor::Optional(_) => inner,
            other => TypeDescriptor::Optional(Box::new(other)),
        }
    }
}

/// Resolved enum: members in declaration order plus a case-insensitive name index.
#[derive(Debug)]
pub struct EnumDescriptor {
    type_id: TypeId,
    name: &'static str,
    members: Vec<EnumMember>,
    by_name: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
}

impl EnumDescriptor {
    fn from_def(def: &EnumDef) -> Self {
        let mut members = Vec::with_capacity(def.members.len());
        let mut by_name = HashMap::new();
        for (name, value) in &def.members {
            by_name.entry(name.to_lowercase()).or_insert(members.len());
            members.push(EnumMember {
                name: name.clone(),
                value: value.clone(),
            });
        }
        Self {
            type_id: def.type_id,
            name: def.name,
            members,
            by_name,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// Index of the first member whose underlying value equals `value`.
    pub fn position_by_value(&self, value: &Value) -> Option<usize> {
        self.members.iter().position(|m| &m.value == value)
    }

    /// Index of the first member whose underlying scalar value prints as `text`.
    pub fn position_by_text(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.members
            .iter()
            .position(|m| value::scalar_text(&m.value).as_deref() == Some(text))
    }

    /// Index of the member whose declared name matches `name`, ignoring case.
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// Classify a declared type. Nested record types are registered on first sight;
/// `pending` holds the records whose registration is in progress, so a record
/// that refers to itself resolves to a `NestedRecord` without recursing.
pub(crate) fn resolve_type(
    expr: &TypeExpr,
    registry: &SchemaRegistry,
    pending: &mut Vec<TypeId>,
) -> TypeDescriptor {
    match expr {
        TypeExpr::Bool => TypeDescriptor::Primitive(PrimitiveKind::Bool),
        TypeExpr::Int => TypeDescriptor::Primitive(PrimitiveKind::Integer),
        TypeExpr::Float => TypeDescriptor::Primitive(PrimitiveKind::Float),
        TypeExpr::Str => TypeDescriptor::Primitive(PrimitiveKind::String),
        TypeExpr::Any | TypeExpr::Null | TypeExpr::Tuple(_) => TypeDescriptor::Opaque,
        TypeExpr::Optional(inner) => {
            TypeDescriptor::optional(resolve_type(inner, registry, pending))
        }
        TypeExpr::Union(members) => {
            let nullable = members.iter().any(|m| matches!(m, TypeExpr::Null));
            let others: Vec<&TypeExpr> = members
                .iter()
                .filter(|m| !matches!(m, TypeExpr::Null))
                .collect();
            let inner = match others.as_slice() {
                [single] => resolve_type(single, registry, pending),
                _ => TypeDescriptor::Opaque,
            };
            if nullable && !others.is_empty() {
                TypeDescriptor::optional(inner)
            } else {
                inner
            }
        }
        TypeExpr::List(element) => {
            TypeDescriptor::Sequence(Box::new(resolve_type(element, registry, pending)))
        }
        TypeExpr::Map(key, value) => TypeDescriptor::Mapping(
            Box::new(resolve_type(key, registry, pending)),
            Box::new(resolve_type(value, registry, pending)),
        ),
        TypeExpr::Enum(def) => TypeDescriptor::Enum(Arc::new(EnumDescriptor::from_def(def))),
        TypeExpr::Record(record) => {
            registry.ensure(*record, pending);
            TypeDescriptor::NestedRecord(record.id())
        }
    }
}
