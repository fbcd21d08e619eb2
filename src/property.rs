//! Property records and the per-descriptor property list.
//!
//! Each descriptor owns a singly-linked list of property records: named data
//! properties, named accessor properties and engine-internal slots. Records
//! are created singly and always prepended, so insertion is O(1); removal
//! unlinks from wherever the record sits and is O(n). List order carries no
//! meaning beyond "each property appears exactly once".
//!
//! Name lookup consults the lookup cache first and falls back to a linear
//! scan. Every completed scan is reported back to the cache, negative
//! results included, and every structural change invalidates the affected
//! entry. See [`crate::lcache`] for the contract.

use crate::arena::Id;
use crate::bytecode::BytecodeId;
use crate::error::{Fatal, fatal};
use crate::heap::Heap;
use crate::lcache::CacheLookup;
use crate::object::ObjectKind;
use crate::strings::StringId;
use crate::value::{CollectionId, ExternalPointer, ObjectId, Value};

/// Handle to a property record.
pub type PropertyId = Id<PropertyRecord>;

/// Handle to a getter/setter pair.
pub type PairId = Id<GetterSetterPair>;

/// One property attached to a descriptor.
pub struct PropertyRecord {
    pub(crate) kind: PropertyKind,
    pub(crate) next: Option<PropertyId>,
}

/// The three property kinds. Exactly one per record; "data and accessor at
/// once" is unrepresentable.
pub enum PropertyKind {
    NamedData {
        /// Owns one string-table reference.
        name: StringId,
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
        lcached: bool,
    },
    NamedAccessor {
        /// Owns one string-table reference.
        name: StringId,
        /// Exclusively owned by this record.
        pair: PairId,
        enumerable: bool,
        configurable: bool,
        lcached: bool,
    },
    Internal {
        kind: InternalKind,
        payload: InternalPayload,
    },
}

impl PropertyRecord {
    pub fn is_named_data(&self) -> bool {
        matches!(self.kind, PropertyKind::NamedData { .. })
    }

    pub fn is_named_accessor(&self) -> bool {
        matches!(self.kind, PropertyKind::NamedAccessor { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, PropertyKind::Internal { .. })
    }

    /// Name of a named property; `None` for internal records.
    pub fn name(&self) -> Option<StringId> {
        match self.kind {
            PropertyKind::NamedData { name, .. } | PropertyKind::NamedAccessor { name, .. } => {
                Some(name)
            }
            PropertyKind::Internal { .. } => None,
        }
    }

    /// Next record in the owning descriptor's list.
    pub fn next(&self) -> Option<PropertyId> {
        self.next
    }
}

/// Getter and setter references of an accessor property.
///
/// The referenced objects are not owned here; the collector keeps them
/// alive through reachability.
#[derive(Default)]
pub struct GetterSetterPair {
    pub getter: Option<ObjectId>,
    pub setter: Option<ObjectId>,
}

/// Engine-internal slot identifiers.
///
/// At most one internal property of a given kind may exist on a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalKind {
    /// Mirror of the descriptor's prototype field; never stored as a record.
    Prototype,
    /// Mirror of the descriptor's extensible flag; never stored as a record.
    Extensible,
    /// Array storage keyed by numeric index. Collection payload.
    NumberIndexedArrayValues,
    /// Array storage keyed by string. Collection payload.
    StringIndexedArrayValues,
    /// Boxed primitive string value of a String wrapper object.
    PrimitiveStringValue,
    /// Boxed primitive number value of a Number wrapper object.
    PrimitiveNumberValue,
    /// Boxed primitive boolean value of a Boolean wrapper object.
    PrimitiveBooleanValue,
    /// External code pointer. Released through the native hook.
    NativeCode,
    /// External data handle. Released through the native hook.
    NativeHandle,
    /// External free callback. Released through the native hook.
    FreeCallback,
    /// [[Scope]] of a function: a lexical environment reference.
    Scope,
    /// Parameters map of an arguments object.
    ParametersMap,
    /// [[Class]] tag.
    Class,
    /// Identifier of a built-in object.
    BuiltInId,
    /// Routine identifier within a built-in object.
    BuiltInRoutineDesc,
    /// Extension object identifier.
    ExtensionId,
    /// Instantiation bit-mask of built-in properties 0..=31.
    NonInstantiatedBuiltInMask0_31,
    /// Instantiation bit-mask of built-in properties 32..=63.
    NonInstantiatedBuiltInMask32_63,
    /// [[TargetFunction]] of a bound function. Unowned object reference.
    BoundFunctionTargetFunction,
    /// [[BoundThis]] of a bound function. Owned value.
    BoundFunctionBoundThis,
    /// [[BoundArgs]] of a bound function. Collection payload; the values
    /// themselves are not owned by the collection.
    BoundFunctionBoundArgs,
    /// Compiled-function bytecode reference.
    CodeBytecode,
    /// Regular-expression bytecode reference; absent until first compile.
    RegexpBytecode,
}

/// Payload of an internal property. Interpretation is fixed by the kind;
/// a freshly created record holds [`InternalPayload::None`].
pub enum InternalPayload {
    None,
    Collection(CollectionId),
    /// Owns one string-table reference.
    InternedString(StringId),
    /// Unowned object reference.
    Object(ObjectId),
    /// Owned value (the object-reference exception applies on release).
    Value(Value),
    Number(Box<f64>),
    Bool(bool),
    Uint(u32),
    External(ExternalPointer),
    Bytecode(Option<BytecodeId>),
}

// ============================================================================
// Property list operations
// ============================================================================

impl Heap {
    /// Create an internal property of `kind` and prepend it to the list.
    ///
    /// Precondition: no internal property of `kind` exists on `object`.
    pub fn create_internal_property(&mut self, object: ObjectId, kind: InternalKind) -> PropertyId {
        debug_assert!(
            self.find_internal_property(object, kind).is_none(),
            "duplicate internal property"
        );

        self.link_property(
            object,
            PropertyKind::Internal {
                kind,
                payload: InternalPayload::None,
            },
        )
    }

    /// Find an internal property by kind.
    ///
    /// `Prototype` and `Extensible` live on the descriptor itself and are
    /// never found here.
    pub fn find_internal_property(
        &self,
        object: ObjectId,
        kind: InternalKind,
    ) -> Option<PropertyId> {
        debug_assert!(kind != InternalKind::Prototype && kind != InternalKind::Extensible);

        let mut cursor = self.object(object).property_list_head();
        while let Some(prop) = cursor {
            let record = self.property(prop);
            if let PropertyKind::Internal { kind: found, .. } = record.kind {
                if found == kind {
                    return Some(prop);
                }
            }
            cursor = record.next;
        }
        None
    }

    /// Like [`Heap::find_internal_property`], but the property must exist.
    pub fn get_internal_property(&self, object: ObjectId, kind: InternalKind) -> PropertyId {
        match self.find_internal_property(object, kind) {
            Some(prop) => prop,
            #[allow(clippy::panic)]
            None => panic!("internal property {kind:?} must exist"),
        }
    }

    /// Create a named data property with the given attributes and an
    /// undefined value, and prepend it to the list.
    ///
    /// Takes a new reference to `name`. Precondition: no named property
    /// with `name` exists on `object`.
    pub fn create_named_data_property(
        &mut self,
        object: ObjectId,
        name: StringId,
        is_writable: bool,
        is_enumerable: bool,
        is_configurable: bool,
    ) -> PropertyId {
        debug_assert!(
            self.scan_named_property(object, name).is_none(),
            "duplicate named property"
        );

        self.ref_string(name);
        let prop = self.link_property(
            object,
            PropertyKind::NamedData {
                name,
                value: Value::Undefined,
                writable: is_writable,
                enumerable: is_enumerable,
                configurable: is_configurable,
                lcached: false,
            },
        );

        self.cache.invalidate(object, name);

        prop
    }

    /// Create a named accessor property and prepend it to the list.
    ///
    /// Takes a new reference to `name`; allocates the getter/setter pair.
    /// Precondition: no named property with `name` exists on `object`.
    pub fn create_named_accessor_property(
        &mut self,
        object: ObjectId,
        name: StringId,
        getter: Option<ObjectId>,
        setter: Option<ObjectId>,
        is_enumerable: bool,
        is_configurable: bool,
    ) -> PropertyId {
        debug_assert!(
            self.scan_named_property(object, name).is_none(),
            "duplicate named property"
        );

        self.ref_string(name);
        let pair = self.pairs.insert(GetterSetterPair::default());
        let prop = self.link_property(
            object,
            PropertyKind::NamedAccessor {
                name,
                pair,
                enumerable: is_enumerable,
                configurable: is_configurable,
                lcached: false,
            },
        );

        // The accessor setters assert the record is reachable from the
        // descriptor, so assignment must happen after linking.
        self.set_accessor_getter(object, prop, getter);
        self.set_accessor_setter(object, prop, setter);

        self.cache.invalidate(object, name);

        prop
    }

    /// Find a named (data or accessor) property.
    ///
    /// Asks the lookup cache first; a hit is trusted. On a miss the list is
    /// scanned, skipping internal records, and the result is reported back
    /// to the cache whether found or absent.
    pub fn find_named_property(&mut self, object: ObjectId, name: StringId) -> Option<PropertyId> {
        if let CacheLookup::Hit(memoized) = self.cache.lookup(object, name) {
            return memoized;
        }

        let found = self.scan_named_property(object, name);
        self.cache.insert(object, name, found);
        if let Some(prop) = found {
            self.set_property_lcached(prop, true);
        }
        found
    }

    /// Like [`Heap::find_named_property`], but the property must exist.
    pub fn get_named_property(&mut self, object: ObjectId, name: StringId) -> PropertyId {
        match self.find_named_property(object, name) {
            Some(prop) => prop,
            #[allow(clippy::panic)]
            None => panic!("named property must exist"),
        }
    }

    /// Like [`Heap::get_named_property`], and the property must be a data
    /// property.
    pub fn get_named_data_property(&mut self, object: ObjectId, name: StringId) -> PropertyId {
        let prop = self.get_named_property(object, name);
        debug_assert!(self.property(prop).is_named_data());
        prop
    }

    /// Linear list scan by name, bypassing the cache. Interned names make
    /// the comparison a handle comparison.
    fn scan_named_property(&self, object: ObjectId, name: StringId) -> Option<PropertyId> {
        let mut cursor = self.object(object).property_list_head();
        while let Some(prop) = cursor {
            let record = self.property(prop);
            if record.name() == Some(name) {
                return Some(prop);
            }
            cursor = record.next;
        }
        None
    }

    /// Remove `prop` from `object`'s list and release its payload.
    ///
    /// Precondition: the record is owned by `object` (debug-checked).
    pub fn delete_property(&mut self, object: ObjectId, prop: PropertyId) {
        let mut prev: Option<PropertyId> = None;
        let mut cursor = self.object(object).property_list_head();

        while let Some(current) = cursor {
            let next = self.property(current).next;

            if current == prop {
                self.free_property(object, prop);
                match prev {
                    None => self.object_mut(object).set_property_list_head(next),
                    Some(prev) => {
                        if let Some(record) = self.properties.get_mut(prev) {
                            record.next = next;
                        }
                    }
                }
                return;
            }

            prev = Some(current);
            cursor = next;
        }

        debug_assert!(false, "delete_property: record not owned by descriptor");
    }

    /// Release a record's payload and the record itself without unlinking.
    ///
    /// Used when the whole list is being torn down and relinking would be
    /// wasted work; use [`Heap::delete_property`] otherwise.
    pub fn free_property(&mut self, object: ObjectId, prop: PropertyId) {
        let record = match self.properties.remove(prop) {
            Some(record) => record,
            None => fatal(Fatal::DeadHandle),
        };

        match record.kind {
            PropertyKind::NamedData {
                name,
                value,
                lcached,
                ..
            } => {
                if lcached {
                    self.cache.invalidate(object, name);
                }
                self.deref_string(name);
                // Object references are kept alive by the collector's
                // reachability graph, never by the value slot.
                self.free_value_if_not_object(value);
            }
            PropertyKind::NamedAccessor {
                name,
                pair,
                lcached,
                ..
            } => {
                if lcached {
                    self.cache.invalidate(object, name);
                }
                self.deref_string(name);
                // The getter/setter objects themselves stay alive; only the
                // pair record is owned here.
                self.pairs.remove(pair);
            }
            PropertyKind::Internal { kind, payload } => {
                self.free_internal_payload(kind, payload);
            }
        }
    }

    /// Tear down every property of a descriptor via [`Heap::free_property`].
    ///
    /// Called by the external collector before the descriptor is destroyed.
    pub fn free_object_properties(&mut self, object: ObjectId) {
        if !self.has_property_list(object) {
            return;
        }

        let mut cursor = self.object(object).property_list_head();
        while let Some(prop) = cursor {
            cursor = self.property(prop).next;
            self.free_property(object, prop);
        }
        self.object_mut(object).set_property_list_head(None);
    }

    /// Whether the record is reachable from the descriptor's list.
    pub(crate) fn contains_property(&self, object: ObjectId, prop: PropertyId) -> bool {
        if !self.has_property_list(object) {
            return false;
        }
        let mut cursor = self.object(object).property_list_head();
        while let Some(current) = cursor {
            if current == prop {
                return true;
            }
            cursor = self.property(current).next;
        }
        false
    }

    fn has_property_list(&self, object: ObjectId) -> bool {
        !matches!(self.object(object).kind, ObjectKind::ObjectBoundEnv { .. })
    }

    fn link_property(&mut self, object: ObjectId, kind: PropertyKind) -> PropertyId {
        let head = self.object(object).property_list_head();
        let prop = self.properties.insert(PropertyRecord { kind, next: head });
        self.object_mut(object).set_property_list_head(Some(prop));
        prop
    }

    /// Release an internal payload according to its kind.
    fn free_internal_payload(&mut self, kind: InternalKind, payload: InternalPayload) {
        match kind {
            InternalKind::NumberIndexedArrayValues | InternalKind::StringIndexedArrayValues => {
                if let InternalPayload::Collection(collection) = payload {
                    self.free_collection(collection, true);
                }
            }
            InternalKind::PrimitiveStringValue => {
                if let InternalPayload::InternedString(name) = payload {
                    self.deref_string(name);
                }
            }
            InternalKind::PrimitiveNumberValue => {
                // The boxed number is dropped with the payload.
            }
            InternalKind::NativeCode | InternalKind::NativeHandle | InternalKind::FreeCallback => {
                if let InternalPayload::External(pointer) = payload {
                    self.run_native_free_hook(pointer);
                }
            }
            InternalKind::BoundFunctionBoundThis => {
                if let InternalPayload::Value(value) = payload {
                    self.free_value_if_not_object(value);
                }
            }
            InternalKind::BoundFunctionBoundArgs => {
                // The argument values were stored without taking ownership.
                if let InternalPayload::Collection(collection) = payload {
                    self.free_collection(collection, false);
                }
            }
            InternalKind::CodeBytecode | InternalKind::RegexpBytecode => {
                // A regexp slot may be empty until its first compilation.
                if let InternalPayload::Bytecode(Some(bytecode)) = payload {
                    self.bytecode_deref(bytecode);
                }
            }
            InternalKind::Prototype
            | InternalKind::Extensible
            | InternalKind::PrimitiveBooleanValue
            | InternalKind::Scope
            | InternalKind::ParametersMap
            | InternalKind::Class
            | InternalKind::BuiltInId
            | InternalKind::BuiltInRoutineDesc
            | InternalKind::ExtensionId
            | InternalKind::NonInstantiatedBuiltInMask0_31
            | InternalKind::NonInstantiatedBuiltInMask32_63
            | InternalKind::BoundFunctionTargetFunction => {
                // Inline payloads and unowned references: nothing to release.
            }
        }
    }
}

// ============================================================================
// Record accessors
// ============================================================================

impl Heap {
    /// 'Writable' attribute. Data properties only.
    pub fn is_property_writable(&self, prop: PropertyId) -> bool {
        match self.property(prop).kind {
            PropertyKind::NamedData { writable, .. } => writable,
            _ => {
                debug_assert!(false, "writable is only defined for data properties");
                false
            }
        }
    }

    pub fn set_property_writable(&mut self, prop: PropertyId, is_writable: bool) {
        match &mut self.property_mut(prop).kind {
            PropertyKind::NamedData { writable, .. } => *writable = is_writable,
            _ => debug_assert!(false, "writable is only defined for data properties"),
        }
    }

    /// 'Enumerable' attribute. Named properties only.
    pub fn is_property_enumerable(&self, prop: PropertyId) -> bool {
        match self.property(prop).kind {
            PropertyKind::NamedData { enumerable, .. }
            | PropertyKind::NamedAccessor { enumerable, .. } => enumerable,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "enumerable is only defined for named properties");
                false
            }
        }
    }

    pub fn set_property_enumerable(&mut self, prop: PropertyId, is_enumerable: bool) {
        match &mut self.property_mut(prop).kind {
            PropertyKind::NamedData { enumerable, .. }
            | PropertyKind::NamedAccessor { enumerable, .. } => *enumerable = is_enumerable,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "enumerable is only defined for named properties")
            }
        }
    }

    /// 'Configurable' attribute. Named properties only.
    pub fn is_property_configurable(&self, prop: PropertyId) -> bool {
        match self.property(prop).kind {
            PropertyKind::NamedData { configurable, .. }
            | PropertyKind::NamedAccessor { configurable, .. } => configurable,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "configurable is only defined for named properties");
                false
            }
        }
    }

    pub fn set_property_configurable(&mut self, prop: PropertyId, is_configurable: bool) {
        match &mut self.property_mut(prop).kind {
            PropertyKind::NamedData { configurable, .. }
            | PropertyKind::NamedAccessor { configurable, .. } => *configurable = is_configurable,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "configurable is only defined for named properties")
            }
        }
    }

    /// Whether the record currently has a positive cache entry.
    pub fn is_property_lcached(&self, prop: PropertyId) -> bool {
        match self.property(prop).kind {
            PropertyKind::NamedData { lcached, .. }
            | PropertyKind::NamedAccessor { lcached, .. } => lcached,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "lcached is only defined for named properties");
                false
            }
        }
    }

    pub fn set_property_lcached(&mut self, prop: PropertyId, is_lcached: bool) {
        match &mut self.property_mut(prop).kind {
            PropertyKind::NamedData { lcached, .. }
            | PropertyKind::NamedAccessor { lcached, .. } => *lcached = is_lcached,
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "lcached is only defined for named properties")
            }
        }
    }

    /// Value of a named data property.
    pub fn named_data_value(&self, prop: PropertyId) -> &Value {
        match &self.property(prop).kind {
            PropertyKind::NamedData { value, .. } => value,
            _ => discriminant_violation("named_data_value on a non-data property"),
        }
    }

    /// Raw store into a data property's value slot. The previous value is
    /// returned, not released; use [`Heap::assign_named_data_value`] for the
    /// releasing flavor.
    pub fn set_named_data_value(&mut self, prop: PropertyId, value: Value) -> Value {
        match &mut self.property_mut(prop).kind {
            PropertyKind::NamedData { value: slot, .. } => std::mem::replace(slot, value),
            _ => discriminant_violation("set_named_data_value on a non-data property"),
        }
    }

    /// Assign to a data property, releasing the previous value.
    ///
    /// When both the old and the new value are numeric the existing number
    /// box is overwritten in place, avoiding a reallocation. The stored
    /// value is a copy; `value` stays owned by the caller.
    ///
    /// Precondition: `prop` is a data record owned by `object`.
    pub fn assign_named_data_value(&mut self, object: ObjectId, prop: PropertyId, value: &Value) {
        debug_assert!(self.contains_property(object, prop));

        {
            let record = self.property_mut(prop);
            match &mut record.kind {
                PropertyKind::NamedData { value: slot, .. } => {
                    if let (Value::Number(dst), Value::Number(src)) = (&mut *slot, value) {
                        **dst = **src;
                        return;
                    }
                }
                _ => discriminant_violation("assign_named_data_value on a non-data property"),
            }
        }

        let old = self.set_named_data_value(prop, Value::Undefined);
        self.free_value_if_not_object(old);
        let copy = self.copy_value_if_not_object(value);
        self.set_named_data_value(prop, copy);
    }

    /// Getter reference of an accessor property.
    pub fn accessor_getter(&self, prop: PropertyId) -> Option<ObjectId> {
        self.accessor_pair(prop).getter
    }

    /// Setter reference of an accessor property.
    pub fn accessor_setter(&self, prop: PropertyId) -> Option<ObjectId> {
        self.accessor_pair(prop).setter
    }

    /// Set the getter. Precondition: `prop` is an accessor record owned by
    /// `object` (the record must already be linked).
    pub fn set_accessor_getter(
        &mut self,
        object: ObjectId,
        prop: PropertyId,
        getter: Option<ObjectId>,
    ) {
        debug_assert!(self.contains_property(object, prop));
        self.accessor_pair_mut(prop).getter = getter;
    }

    /// Set the setter. Same preconditions as [`Heap::set_accessor_getter`].
    pub fn set_accessor_setter(
        &mut self,
        object: ObjectId,
        prop: PropertyId,
        setter: Option<ObjectId>,
    ) {
        debug_assert!(self.contains_property(object, prop));
        self.accessor_pair_mut(prop).setter = setter;
    }

    fn accessor_pair(&self, prop: PropertyId) -> &GetterSetterPair {
        match self.property(prop).kind {
            PropertyKind::NamedAccessor { pair, .. } => match self.pairs.get(pair) {
                Some(pair) => pair,
                None => fatal(Fatal::DeadHandle),
            },
            _ => discriminant_violation("accessor pair of a non-accessor property"),
        }
    }

    fn accessor_pair_mut(&mut self, prop: PropertyId) -> &mut GetterSetterPair {
        match self.property(prop).kind {
            PropertyKind::NamedAccessor { pair, .. } => match self.pairs.get_mut(pair) {
                Some(pair) => pair,
                None => fatal(Fatal::DeadHandle),
            },
            _ => discriminant_violation("accessor pair of a non-accessor property"),
        }
    }

    /// Kind tag of an internal property.
    pub fn internal_kind(&self, prop: PropertyId) -> InternalKind {
        match self.property(prop).kind {
            PropertyKind::Internal { kind, .. } => kind,
            _ => discriminant_violation("internal_kind on a named property"),
        }
    }

    /// Payload of an internal property.
    pub fn internal_payload(&self, prop: PropertyId) -> &InternalPayload {
        match &self.property(prop).kind {
            PropertyKind::Internal { payload, .. } => payload,
            _ => discriminant_violation("internal_payload on a named property"),
        }
    }

    /// Raw store into an internal property's payload. The previous payload
    /// is returned, not released; ownership of `payload` moves in.
    pub fn set_internal_payload(
        &mut self,
        prop: PropertyId,
        payload: InternalPayload,
    ) -> InternalPayload {
        match &mut self.property_mut(prop).kind {
            PropertyKind::Internal { payload: slot, .. } => std::mem::replace(slot, payload),
            _ => discriminant_violation("set_internal_payload on a named property"),
        }
    }
}

#[allow(clippy::panic)]
fn discriminant_violation(what: &str) -> ! {
    panic!("property discriminant violation: {what}")
}
