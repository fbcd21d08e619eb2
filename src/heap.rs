//! The object heap facade.
//!
//! [`Heap`] owns every store the representation layer needs: the descriptor,
//! property, getter/setter pair, collection and bytecode arenas, the
//! interned name table and the lookup cache. All mutation goes through it,
//! matching the embedding model where the host serializes every call into
//! the runtime; there is no internal locking because there is no concurrent
//! mutation.
//!
//! Construction, reference counting and value ownership live here; the
//! property list algorithms are in [`crate::property`], the descriptor
//! bridge in [`crate::descriptor`] and bytecode lifetime in
//! [`crate::bytecode`].

use crate::arena::Arena;
use crate::bytecode::CompiledCode;
use crate::error::{Fatal, fatal};
use crate::lcache::LookupCache;
use crate::object::{ObjectDescriptor, ObjectKind, ObjectType};
use crate::property::{
    GetterSetterPair, InternalPayload, PropertyId, PropertyKind, PropertyRecord,
};
use crate::strings::{StringId, StringTable};
use crate::value::{
    CollectionId, ExternalPointer, NativeFreeFn, ObjectId, Value, ValueCollection,
};

/// The representation-layer heap.
pub struct Heap {
    pub(crate) objects: Arena<ObjectDescriptor>,
    pub(crate) properties: Arena<PropertyRecord>,
    pub(crate) pairs: Arena<GetterSetterPair>,
    pub(crate) collections: Arena<ValueCollection>,
    pub(crate) bytecode: Arena<CompiledCode>,
    strings: StringTable,
    pub(crate) cache: LookupCache,
    native_free: Option<NativeFreeFn>,
}

impl Heap {
    /// Create an empty heap with the common property names pre-interned.
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            properties: Arena::new(),
            pairs: Arena::new(),
            collections: Arena::new(),
            bytecode: Arena::new(),
            strings: StringTable::with_common_names(),
            cache: LookupCache::new(),
            native_free: None,
        }
    }

    /// Register the hook invoked when an external pointer payload is
    /// released.
    pub fn set_native_free_hook(&mut self, hook: NativeFreeFn) {
        self.native_free = Some(hook);
    }

    pub(crate) fn run_native_free_hook(&mut self, pointer: ExternalPointer) {
        if let Some(hook) = self.native_free {
            hook(pointer);
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an ordinary object with the given prototype (or none) and
    /// [[Extensible]] value. Reference count starts at 1; the property list
    /// is empty.
    pub fn create_object(
        &mut self,
        prototype: Option<ObjectId>,
        is_extensible: bool,
        object_type: ObjectType,
    ) -> ObjectId {
        self.objects.insert(ObjectDescriptor::new(ObjectKind::Ordinary {
            object_type,
            extensible: is_extensible,
            built_in: false,
            prototype,
            property_list: None,
        }))
    }

    /// Create a declarative lexical environment with the given outer
    /// environment (or none, for the global environment).
    pub fn create_declarative_env(&mut self, outer: Option<ObjectId>) -> ObjectId {
        self.objects
            .insert(ObjectDescriptor::new(ObjectKind::DeclarativeEnv {
                outer,
                property_list: None,
            }))
    }

    /// Create an object-bound lexical environment.
    ///
    /// Precondition: `binding_object` is not itself a lexical environment.
    pub fn create_object_env(
        &mut self,
        outer: Option<ObjectId>,
        binding_object: ObjectId,
        provide_this: bool,
    ) -> ObjectId {
        debug_assert!(!self.object(binding_object).is_lexical_environment());

        self.objects
            .insert(ObjectDescriptor::new(ObjectKind::ObjectBoundEnv {
                outer,
                binding_object,
                provide_this,
            }))
    }

    // ========================================================================
    // Descriptor access and reference counting
    // ========================================================================

    /// Resolve a descriptor handle.
    pub fn object(&self, id: ObjectId) -> &ObjectDescriptor {
        match self.objects.get(id) {
            Some(descriptor) => descriptor,
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Resolve a descriptor handle mutably.
    pub fn object_mut(&mut self, id: ObjectId) -> &mut ObjectDescriptor {
        match self.objects.get_mut(id) {
            Some(descriptor) => descriptor,
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Take a reference to a descriptor. Fatal at the maximum count.
    pub fn ref_object(&mut self, id: ObjectId) {
        let descriptor = self.object_mut(id);
        if descriptor.refs >= u16::MAX {
            fatal(Fatal::RefCountLimit);
        }
        descriptor.refs += 1;
    }

    /// Release one reference to a descriptor. Destroying the descriptor
    /// once the count reaches zero is the external collector's job.
    pub fn deref_object(&mut self, id: ObjectId) {
        let descriptor = self.object_mut(id);
        debug_assert!(descriptor.refs > 0);
        descriptor.refs = descriptor.refs.saturating_sub(1);
    }

    /// Destroy a descriptor whose properties have been torn down. Intended
    /// for the external collector's sweep.
    ///
    /// Precondition: [`Heap::free_object_properties`] ran first (the
    /// property list must be empty or absent).
    pub fn destroy_object(&mut self, id: ObjectId) {
        debug_assert!(
            !matches!(
                self.object(id).kind,
                ObjectKind::Ordinary {
                    property_list: Some(_),
                    ..
                } | ObjectKind::DeclarativeEnv {
                    property_list: Some(_),
                    ..
                }
            ),
            "destroying a descriptor with live properties"
        );
        self.cache.invalidate_object(id);
        self.objects.remove(id);
    }

    /// Resolve a property handle.
    pub fn property(&self, id: PropertyId) -> &PropertyRecord {
        match self.properties.get(id) {
            Some(record) => record,
            None => fatal(Fatal::DeadHandle),
        }
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> &mut PropertyRecord {
        match self.properties.get_mut(id) {
            Some(record) => record,
            None => fatal(Fatal::DeadHandle),
        }
    }

    // ========================================================================
    // Interned strings
    // ========================================================================

    /// Intern a property name, taking a reference to it.
    pub fn intern(&mut self, s: &str) -> StringId {
        self.strings.intern(s)
    }

    /// Take an additional reference to an interned name.
    pub fn ref_string(&mut self, id: StringId) {
        self.strings.ref_string(id);
    }

    /// Release one reference to an interned name.
    pub fn deref_string(&mut self, id: StringId) {
        self.strings.deref_string(id);
    }

    /// Read-only view of the name table.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    // ========================================================================
    // Value ownership
    // ========================================================================

    /// Copy a value, taking ownership of the copy: a new number box, a new
    /// string reference, and a new object reference.
    pub fn copy_value(&mut self, value: &Value) -> Value {
        let copy = self.copy_value_if_not_object(value);
        if let Value::Object(object) = &copy {
            self.ref_object(*object);
        }
        copy
    }

    /// Like [`Heap::copy_value`], but object references are copied without
    /// taking a reference. This is the flavor used by property value slots,
    /// which never own their objects.
    pub fn copy_value_if_not_object(&mut self, value: &Value) -> Value {
        match value {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Number(n) => Value::Number(Box::new(**n)),
            Value::String(s) => {
                self.strings.ref_string(*s);
                Value::String(*s)
            }
            Value::Object(o) => Value::Object(*o),
        }
    }

    /// Release an owned value, including an object reference.
    pub fn free_value(&mut self, value: Value) {
        match value {
            Value::String(s) => self.strings.deref_string(s),
            Value::Object(o) => self.deref_object(o),
            Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_) => {}
        }
    }

    /// Release an owned value, except that object references are left
    /// untouched (the value slot never owned them).
    pub fn free_value_if_not_object(&mut self, value: Value) {
        match value {
            Value::String(s) => self.strings.deref_string(s),
            Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_)
            | Value::Object(_) => {}
        }
    }

    // ========================================================================
    // Value collections
    // ========================================================================

    /// Allocate an empty collection.
    pub fn create_collection(&mut self) -> CollectionId {
        self.collections.insert(ValueCollection::default())
    }

    /// Append a value; ownership moves into the collection.
    pub fn collection_push(&mut self, id: CollectionId, value: Value) {
        match self.collections.get_mut(id) {
            Some(collection) => collection.values.push(value),
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Resolve a collection handle.
    pub fn collection(&self, id: CollectionId) -> &ValueCollection {
        match self.collections.get(id) {
            Some(collection) => collection,
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Free a collection. With `free_values` the contained values are
    /// released too (object references excepted, as always); without it
    /// they are dropped unreleased, for collections that stored values they
    /// did not own.
    pub fn free_collection(&mut self, id: CollectionId, free_values: bool) {
        let collection = match self.collections.remove(id) {
            Some(collection) => collection,
            None => fatal(Fatal::DeadHandle),
        };
        if free_values {
            for value in collection.values {
                self.free_value_if_not_object(value);
            }
        }
    }

    // ========================================================================
    // Collector support
    // ========================================================================

    /// Enumerate every object reference owned by a descriptor, without
    /// creating new references: the prototype or outer environment, the
    /// bound object, property values, getters and setters, and internal
    /// payloads that hold objects.
    pub fn visit_object_references<F: FnMut(ObjectId)>(&self, id: ObjectId, mut visitor: F) {
        match self.object(id).kind {
            ObjectKind::Ordinary {
                prototype,
                property_list,
                ..
            } => {
                if let Some(prototype) = prototype {
                    visitor(prototype);
                }
                self.visit_property_references(property_list, &mut visitor);
            }
            ObjectKind::DeclarativeEnv {
                outer,
                property_list,
            } => {
                if let Some(outer) = outer {
                    visitor(outer);
                }
                self.visit_property_references(property_list, &mut visitor);
            }
            ObjectKind::ObjectBoundEnv {
                outer,
                binding_object,
                ..
            } => {
                if let Some(outer) = outer {
                    visitor(outer);
                }
                visitor(binding_object);
            }
        }
    }

    fn visit_property_references<F: FnMut(ObjectId)>(
        &self,
        head: Option<PropertyId>,
        visitor: &mut F,
    ) {
        let mut cursor = head;
        while let Some(prop) = cursor {
            let record = self.property(prop);
            cursor = record.next;

            match &record.kind {
                PropertyKind::NamedData { value, .. } => {
                    if let Value::Object(object) = value {
                        visitor(*object);
                    }
                }
                PropertyKind::NamedAccessor { pair, .. } => {
                    if let Some(pair) = self.pairs.get(*pair) {
                        if let Some(getter) = pair.getter {
                            visitor(getter);
                        }
                        if let Some(setter) = pair.setter {
                            visitor(setter);
                        }
                    }
                }
                PropertyKind::Internal { payload, .. } => match payload {
                    InternalPayload::Object(object) => visitor(*object),
                    InternalPayload::Value(Value::Object(object)) => visitor(*object),
                    InternalPayload::Collection(collection) => {
                        if let Some(collection) = self.collections.get(*collection) {
                            for value in &collection.values {
                                if let Value::Object(object) = value {
                                    visitor(*object);
                                }
                            }
                        }
                    }
                    _ => {}
                },
            }
        }
    }

    /// Heap occupancy counters.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.objects.len(),
            live_properties: self.properties.len(),
            interned_strings: self.strings.len(),
            live_bytecode: self.bytecode.len(),
            cached_lookups: self.cache.len(),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Occupancy counters, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    pub live_objects: usize,
    pub live_properties: usize,
    pub interned_strings: usize,
    pub live_bytecode: usize,
    pub cached_lookups: usize,
}
