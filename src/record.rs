//! Record declarations: how a Rust type tells recfig about its fields.
//!
//! A record type implements [`Record`] and lists its fields through the
//! [`Fields`] builder. Each field carries a declared [`TypeExpr`], usually
//! derived from the Rust field type via [`Describe`]:
//!
//! ```ignore
//! impl Record for ServerConfig {
//!     const NAME: &'static str = "ServerConfig";
//!
//!     fn describe(fields: &mut Fields) {
//!         fields.field::<String>("host").default("localhost");
//!         fields.field::<u16>("port");
//!         fields.field::<Mode>("mode").default("fast");
//!         fields.field::<DbConfig>("db").default(Mapping::new());
//!     }
//! }
//! ```
//!
//! Declarations are consumed once, when the [`SchemaRegistry`](crate::SchemaRegistry)
//! first sees the type; everything downstream works on the resolved schema.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// A declared record type.
pub trait Record: 'static {
    /// Name used in diagnostics and `Debug` output.
    const NAME: &'static str;

    /// Declare the fields of this record, in order.
    fn describe(fields: &mut Fields);
}

/// Identity of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    type_id: TypeId,
    name: &'static str,
}

impl RecordId {
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::NAME,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Type-erased handle on a [`Record`] implementation.
#[derive(Clone, Copy)]
pub struct RecordType {
    id: RecordId,
    describe: fn(&mut Fields),
}

impl RecordType {
    pub fn of<R: Record>() -> Self {
        Self {
            id: RecordId::of::<R>(),
            describe: R::describe,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub(crate) fn declare(&self) -> Vec<FieldDecl> {
        let mut fields = Fields::default();
        (self.describe)(&mut fields);
        fields.decls
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordType").field(&self.id.name).finish()
    }
}

/// Declaration of an enum type: member names and their underlying values.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) members: Vec<(String, Value)>,
}

impl EnumDef {
    /// Start an enum declaration keyed on the Rust type `E`.
    pub fn new<E: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name,
            members: Vec::new(),
        }
    }

    /// Add a member with its declared name and underlying value.
    pub fn member(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.members.push((name.to_string(), value.into()));
        self
    }
}

/// A declared field type, before resolution.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Bool,
    Int,
    Float,
    Str,
    /// Anything; no coercion.
    Any,
    /// The null type, only meaningful inside a [`Union`](TypeExpr::Union).
    Null,
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Enum(EnumDef),
    Record(RecordType),
}

impl TypeExpr {
    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List(Box::new(element))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(key), Box::new(value))
    }

    pub fn record<R: Record>() -> Self {
        TypeExpr::Record(RecordType::of::<R>())
    }
}

/// Maps a Rust type onto its declared [`TypeExpr`].
///
/// Implemented for primitives, strings, paths, `Option`, `Vec`, the common
/// map types, [`Value`] and every [`Record`]. Enums implement it by hand
/// with an [`EnumDef`].
pub trait Describe {
    fn type_expr() -> TypeExpr;
}

macro_rules! describe_as {
    ($expr:expr => $($ty:ty),+) => {
        $(impl Describe for $ty {
            fn type_expr() -> TypeExpr {
                $expr
            }
        })+
    };
}

describe_as!(TypeExpr::Bool => bool);
describe_as!(TypeExpr::Int => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
describe_as!(TypeExpr::Float => f32, f64);
describe_as!(TypeExpr::Str => String, char, PathBuf);
describe_as!(TypeExpr::Any => Value);

impl<T: Describe> Describe for Option<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::optional(T::type_expr())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::list(T::type_expr())
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(K::type_expr(), V::type_expr())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(K::type_expr(), V::type_expr())
    }
}

impl<K: Describe, V: Describe, S> Describe for IndexMap<K, V, S> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(K::type_expr(), V::type_expr())
    }
}

impl<A: Describe, B: Describe> Describe for (A, B) {
    fn type_expr() -> TypeExpr {
        TypeExpr::Tuple(vec![A::type_expr(), B::type_expr()])
    }
}

impl<R: Record> Describe for R {
    fn type_expr() -> TypeExpr {
        TypeExpr::record::<R>()
    }
}

/// Per-field conversion hook for values the built-in coercion does not cover
/// (colors, paths, units...).
///
/// Runs in place of primitive coercion for `Primitive` and `Opaque` fields.
/// When it fails, a non-strict hook leaves the raw value in place; a strict
/// hook turns the failure into [`RecfigError::InvalidValue`](crate::RecfigError::InvalidValue).
pub trait FieldConverter: Send + Sync {
    fn convert(&self, raw: Value) -> Result<Value, String>;

    fn strict(&self) -> bool {
        false
    }
}

impl<F> FieldConverter for F
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync,
{
    fn convert(&self, raw: Value) -> Result<Value, String> {
        self(raw)
    }
}

/// How a field obtains its value when the input does not supply one.
#[derive(Clone)]
pub enum FieldDefault {
    Required,
    Value(Value),
    /// Invoked fresh on every conversion.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    pub fn is_required(&self) -> bool {
        matches!(self, FieldDefault::Required)
    }

    /// Produce the default value, if there is one.
    pub fn materialize(&self) -> Option<Value> {
        match self {
            FieldDefault::Required => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(factory) => Some(factory()),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Required => write!(f, "Required"),
            FieldDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldDefault::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// One field declaration. Built through [`Fields`].
pub struct FieldDecl {
    pub(crate) name: String,
    pub(crate) ty: TypeExpr,
    pub(crate) default: FieldDefault,
    pub(crate) converter: Option<Arc<dyn FieldConverter>>,
    pub(crate) init: bool,
    pub(crate) repr: bool,
    pub(crate) compare: bool,
}

impl FieldDecl {
    fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: FieldDefault::Required,
            converter: None,
            init: true,
            repr: true,
            compare: true,
        }
    }

    /// Static default value.
    pub fn default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Default produced by `factory` each time it is needed.
    pub fn default_with(&mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> &mut Self {
        self.default = FieldDefault::Factory(Arc::new(factory));
        self
    }

    pub fn converter(&mut self, converter: impl FieldConverter + 'static) -> &mut Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Whether the field is read from input at all. Non-init fields always
    /// take their default.
    pub fn init(&mut self, init: bool) -> &mut Self {
        self.init = init;
        self
    }

    /// Whether the field shows up in `Debug` output of instances.
    pub fn repr(&mut self, repr: bool) -> &mut Self {
        self.repr = repr;
        self
    }

    /// Whether the field takes part in instance equality.
    pub fn compare(&mut self, compare: bool) -> &mut Self {
        self.compare = compare;
        self
    }
}

/// Ordered field declarations for one record.
#[derive(Default)]
pub struct Fields {
    decls: Vec<FieldDecl>,
}

impl Fields {
    /// Declare a field whose type comes from `T`. Required unless a default is set.
    pub fn field<T: Describe>(&mut self, name: &str) -> &mut FieldDecl {
        self.field_as(name, T::type_expr())
    }

    /// Declare a field with an explicit type expression.
    pub fn field_as(&mut self, name: &str, ty: TypeExpr) -> &mut FieldDecl {
        let index = self.decls.len();
        self.decls.push(FieldDecl::new(name, ty));
        &mut self.decls[index]
    }
}
