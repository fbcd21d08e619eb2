//! Object and property representation core for embeddable JavaScript
//! runtimes.
//!
//! This crate implements the heap-side object model of an ECMA-262-style
//! engine: object and lexical environment descriptors, the three property
//! kinds (named data, named accessor, engine-internal), detached property
//! descriptors, and reference-counted compiled-code blocks. Execution,
//! parsing and the tracing collector are external collaborators; the
//! collector walks this representation through
//! [`Heap::visit_object_references`] and the `gc_visited` mark.
//!
//! # Example
//!
//! ```
//! use jsheap::{Heap, ObjectType, Value};
//!
//! let mut heap = Heap::new();
//! let object = heap.create_object(None, true, ObjectType::General);
//! let name = heap.intern("x");
//!
//! let prop = heap.create_named_data_property(object, name, true, true, true);
//! heap.assign_named_data_value(object, prop, &Value::number(42.0));
//!
//! assert_eq!(heap.find_named_property(object, name), Some(prop));
//! assert_eq!(heap.named_data_value(prop).as_number(), Some(42.0));
//! ```

pub mod arena;
pub mod bytecode;
pub mod descriptor;
pub mod error;
pub mod heap;
pub mod lcache;
pub mod object;
pub mod property;
pub mod strings;
pub mod value;

pub use arena::{Arena, Id};
pub use bytecode::{BytecodeId, CodePayload, CompiledCode};
pub use descriptor::PropertyDescriptor;
pub use error::Fatal;
pub use heap::{Heap, HeapStats};
pub use lcache::{CacheLookup, LookupCache};
pub use object::{LexEnvKind, ObjectDescriptor, ObjectKind, ObjectType};
pub use property::{
    GetterSetterPair, InternalKind, InternalPayload, PairId, PropertyId, PropertyKind,
    PropertyRecord,
};
pub use strings::{StringId, StringTable};
pub use value::{CollectionId, ExternalPointer, NativeFreeFn, ObjectId, Value, ValueCollection};
