//! Resolved schemas and the registry that owns them.
//!
//! A [`Schema`] is built once per record type, on first use, and lives as
//! long as its [`SchemaRegistry`]. The registry is an explicit object rather
//! than a global: callers share it through an `Arc` when several components
//! need the same view of the record types.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::descriptor::{self, TypeDescriptor};
use crate::error::{RecfigError, Result};
use crate::record::{FieldConverter, FieldDefault, Record, RecordId, RecordType};

/// One resolved field.
pub struct FieldSpec {
    name: String,
    descriptor: TypeDescriptor,
    default: FieldDefault,
    converter: Option<Arc<dyn FieldConverter>>,
    init: bool,
    repr: bool,
    compare: bool,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_required()
    }

    pub fn init(&self) -> bool {
        self.init
    }

    pub fn repr(&self) -> bool {
        self.repr
    }

    pub fn compare(&self) -> bool {
        self.compare
    }

    pub(crate) fn converter(&self) -> Option<&dyn FieldConverter> {
        self.converter.as_deref()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("default", &self.default)
            .field("converter", &self.converter.is_some())
            .field("init", &self.init)
            .field("repr", &self.repr)
            .field("compare", &self.compare)
            .finish()
    }
}

/// Ordered fields of one record type.
#[derive(Debug)]
pub struct Schema {
    id: RecordId,
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl Schema {
    fn build(record: RecordType, registry: &SchemaRegistry, pending: &mut Vec<TypeId>) -> Self {
        let id = record.id();
        let mut fields = Vec::new();
        let mut index = HashMap::new();
        for decl in record.declare() {
            if index.contains_key(&decl.name) {
                warn!(record = id.name(), field = %decl.name, "duplicate field declaration ignored");
                continue;
            }
            let descriptor = descriptor::resolve_type(&decl.ty, registry, pending);
            index.insert(decl.name.clone(), fields.len());
            fields.push(FieldSpec {
                name: decl.name,
                descriptor,
                default: decl.default,
                converter: decl.converter,
                init: decl.init,
                repr: decl.repr,
                compare: decl.compare,
            });
        }
        debug!(record = id.name(), fields = fields.len(), "registered schema");
        Self { id, fields, index }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|i| &self.fields[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Process-scoped table of record schemas, keyed by record type.
///
/// Registration is idempotent and safe under concurrent first use: the schema
/// is built outside the lock and inserted only if absent, so racing threads
/// all end up holding the same `Arc<Schema>`.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for `R`, registering it (and any nested records) if needed.
    pub fn register<R: Record>(&self) -> Arc<Schema> {
        self.register_type(RecordType::of::<R>())
    }

    pub fn register_type(&self, record: RecordType) -> Arc<Schema> {
        self.insert(record, &mut Vec::new())
    }

    pub fn get(&self, id: RecordId) -> Option<Arc<Schema>> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        schemas.get(&id.type_id()).cloned()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn schema(&self, id: RecordId) -> Result<Arc<Schema>> {
        self.get(id)
            .ok_or(RecfigError::UnregisteredRecord(id.name()))
    }

    /// Register `record` unless it is already known or being registered.
    pub(crate) fn ensure(&self, record: RecordType, pending: &mut Vec<TypeId>) {
        let type_id = record.id().type_id();
        if pending.contains(&type_id) || self.contains(record.id()) {
            return;
        }
        self.insert(record, pending);
    }

    fn insert(&self, record: RecordType, pending: &mut Vec<TypeId>) -> Arc<Schema> {
        if let Some(schema) = self.get(record.id()) {
            return schema;
        }
        let type_id = record.id().type_id();
        pending.push(type_id);
        let schema = Schema::build(record, self, pending);
        pending.pop();

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(schemas.entry(type_id).or_insert_with(|| Arc::new(schema)))
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list()
            .entries(schemas.values().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PrimitiveKind;
    use crate::fixtures::test::{Duplicated, TestConfig, TestDbConfig};
    use std::thread;

    #[test]
    fn register_builds_ordered_fields() {
        let registry = SchemaRegistry::new();
        let schema = registry.register::<TestConfig>();
        assert_eq!(schema.name(), "TestConfig");
        assert_eq!(schema.position("host"), Some(0));
        assert_eq!(schema.position("database"), Some(5));
        let port = schema.field("port").unwrap();
        assert_eq!(
            port.descriptor(),
            &TypeDescriptor::Primitive(PrimitiveKind::Integer)
        );
        assert!(port.has_default());
    }

    #[test]
    fn nested_records_are_registered_too() {
        let registry = SchemaRegistry::new();
        registry.register::<TestConfig>();
        assert!(registry.contains(RecordId::of::<TestDbConfig>()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn register_is_idempotent() {
        let registry = SchemaRegistry::new();
        let a = registry.register::<TestConfig>();
        let b = registry.register::<TestConfig>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_first_use_yields_one_schema() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register::<TestConfig>())
            })
            .collect();
        let schemas: Vec<Arc<Schema>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &schemas[0])));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_field_keeps_first() {
        let registry = SchemaRegistry::new();
        let schema = registry.register::<Duplicated>();
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(
            schema.field("value").unwrap().descriptor(),
            &TypeDescriptor::Primitive(PrimitiveKind::Integer)
        );
    }

    #[test]
    fn unregistered_record_is_an_error() {
        let registry = SchemaRegistry::new();
        let err = registry.schema(RecordId::of::<TestDbConfig>()).unwrap_err();
        assert!(err.to_string().contains("TestDbConfig"));
    }
}
