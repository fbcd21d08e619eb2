//! Detached property descriptors.
//!
//! A [`PropertyDescriptor`] carries property state across the boundary
//! between this core and the object-model algorithms (the
//! `[[DefineOwnProperty]]` family) without holding a live handle into a
//! property list. Building one from a live record clones the owned value
//! and takes a reference to each getter/setter object, so the snapshot must
//! be released on every exit path that does not pass ownership onward.

use crate::heap::Heap;
use crate::property::{PropertyId, PropertyKind};
use crate::value::{ObjectId, Value};

/// A snapshot of (or request for) property state. Each field is paired with
/// an is-defined flag; an empty descriptor has every flag false.
#[derive(Debug, Default)]
pub struct PropertyDescriptor {
    pub is_value_defined: bool,
    pub value: Value,

    pub is_writable_defined: bool,
    pub is_writable: bool,

    pub is_enumerable_defined: bool,
    pub is_enumerable: bool,

    pub is_configurable_defined: bool,
    pub is_configurable: bool,

    pub is_get_defined: bool,
    pub getter: Option<ObjectId>,

    pub is_set_defined: bool,
    pub setter: Option<ObjectId>,
}

impl PropertyDescriptor {
    /// All is-defined flags false, neutral defaults everywhere else.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Heap {
    /// Snapshot a live named property.
    ///
    /// Enumerable and configurable are always set. A data record
    /// additionally yields a clone of its value (a new string reference or
    /// number box; a new object reference for object values) and its
    /// writable flag. An accessor record yields its getter and setter with
    /// a new reference taken to each non-null one, and leaves writable
    /// undefined.
    pub fn property_descriptor_from_property(&mut self, prop: PropertyId) -> PropertyDescriptor {
        let mut desc = PropertyDescriptor::empty();

        desc.is_enumerable = self.is_property_enumerable(prop);
        desc.is_enumerable_defined = true;
        desc.is_configurable = self.is_property_configurable(prop);
        desc.is_configurable_defined = true;

        match &self.property(prop).kind {
            PropertyKind::NamedData {
                value, writable, ..
            } => {
                desc.is_writable = *writable;
                desc.is_writable_defined = true;
                // Shallow copy first; the ownership side (string reference,
                // object reference) is settled below, once the record
                // borrow has ended.
                desc.value = match value {
                    Value::Undefined => Value::Undefined,
                    Value::Null => Value::Null,
                    Value::Boolean(b) => Value::Boolean(*b),
                    Value::Number(n) => Value::Number(Box::new(**n)),
                    Value::String(s) => Value::String(*s),
                    Value::Object(o) => Value::Object(*o),
                };
                desc.is_value_defined = true;
            }
            PropertyKind::NamedAccessor { .. } => {
                desc.getter = self.accessor_getter(prop);
                desc.is_get_defined = true;
                desc.setter = self.accessor_setter(prop);
                desc.is_set_defined = true;
            }
            PropertyKind::Internal { .. } => {
                debug_assert!(false, "descriptor snapshot of an internal property");
            }
        }

        if desc.is_value_defined {
            match desc.value {
                Value::String(s) => self.ref_string(s),
                Value::Object(o) => self.ref_object(o),
                _ => {}
            }
        }
        if let Some(getter) = desc.getter {
            self.ref_object(getter);
        }
        if let Some(setter) = desc.setter {
            self.ref_object(setter);
        }

        desc
    }

    /// Release everything a descriptor owns and reset it to empty.
    pub fn free_property_descriptor(&mut self, desc: &mut PropertyDescriptor) {
        if desc.is_value_defined {
            let value = std::mem::take(&mut desc.value);
            self.free_value(value);
        }

        if desc.is_get_defined {
            if let Some(getter) = desc.getter {
                self.deref_object(getter);
            }
        }

        if desc.is_set_defined {
            if let Some(setter) = desc.setter {
                self.deref_object(setter);
            }
        }

        *desc = PropertyDescriptor::empty();
    }
}
