//! Object and lexical environment descriptors.
//!
//! One descriptor represents either an ordinary object or a scope-chain
//! node. The original packed representation kept a single type/flag word and
//! reused one pointer slot for "prototype or outer environment" and another
//! for "property list or bound object"; here the discriminated union is an
//! explicit enum and each variant carries only the fields that are valid
//! for it, so the aliasing cannot be misused by construction.
//!
//! Discriminant preconditions (reading the prototype of an environment,
//! the binding object of an ordinary object, and so on) are caller bugs.
//! They are enforced with a loud panic: the checks are single pattern
//! matches, and Rust's enums leave no way to return an "undefined" answer.

use crate::property::PropertyId;
use crate::value::ObjectId;

/// Implementation-defined subtype of an ordinary object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    General,
    Class,
    Function,
    ExternalFunction,
    BoundFunction,
    Array,
    String,
    Arguments,
}

/// Subtype of a lexical environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexEnvKind {
    /// Bindings stored as properties of the environment itself.
    Declarative,
    /// Bindings resolved through a binding object.
    ObjectBound,
    /// Object-bound, and the binding object also provides `this`.
    ThisObjectBound,
}

/// Variant payload of a descriptor.
pub enum ObjectKind {
    Ordinary {
        object_type: ObjectType,
        extensible: bool,
        built_in: bool,
        prototype: Option<ObjectId>,
        property_list: Option<PropertyId>,
    },
    DeclarativeEnv {
        outer: Option<ObjectId>,
        property_list: Option<PropertyId>,
    },
    ObjectBoundEnv {
        outer: Option<ObjectId>,
        binding_object: ObjectId,
        provide_this: bool,
    },
}

/// An object or lexical environment.
///
/// Reference count starts at 1 on creation and saturation is fatal; the
/// descriptor is destroyed by the external collector once every owned
/// property has been released and the count reaches zero.
pub struct ObjectDescriptor {
    pub(crate) kind: ObjectKind,
    pub(crate) refs: u16,
    pub(crate) gc_visited: bool,
}

impl ObjectDescriptor {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            refs: 1,
            gc_visited: false,
        }
    }

    /// True iff this descriptor was built by an environment constructor.
    /// A pure function of the discriminant.
    pub fn is_lexical_environment(&self) -> bool {
        !matches!(self.kind, ObjectKind::Ordinary { .. })
    }

    /// Subtype of an ordinary object.
    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            ObjectKind::Ordinary { object_type, .. } => object_type,
            _ => discriminant_violation("object_type on a lexical environment"),
        }
    }

    /// Change the subtype. Not meaningful for built-in objects.
    pub fn set_object_type(&mut self, new_type: ObjectType) {
        match &mut self.kind {
            ObjectKind::Ordinary {
                object_type,
                built_in,
                ..
            } => {
                debug_assert!(!*built_in);
                *object_type = new_type;
            }
            _ => discriminant_violation("set_object_type on a lexical environment"),
        }
    }

    /// Value of the [[Extensible]] internal slot.
    pub fn is_extensible(&self) -> bool {
        match self.kind {
            ObjectKind::Ordinary { extensible, .. } => extensible,
            _ => discriminant_violation("is_extensible on a lexical environment"),
        }
    }

    pub fn set_extensible(&mut self, value: bool) {
        match &mut self.kind {
            ObjectKind::Ordinary { extensible, .. } => *extensible = value,
            _ => discriminant_violation("set_extensible on a lexical environment"),
        }
    }

    /// Whether the object is one of the engine's built-ins.
    pub fn is_built_in(&self) -> bool {
        match self.kind {
            ObjectKind::Ordinary { built_in, .. } => built_in,
            _ => discriminant_violation("is_built_in on a lexical environment"),
        }
    }

    pub fn set_built_in(&mut self) {
        match &mut self.kind {
            ObjectKind::Ordinary { built_in, .. } => *built_in = true,
            _ => discriminant_violation("set_built_in on a lexical environment"),
        }
    }

    /// Prototype reference of an ordinary object.
    pub fn prototype(&self) -> Option<ObjectId> {
        match self.kind {
            ObjectKind::Ordinary { prototype, .. } => prototype,
            _ => discriminant_violation("prototype on a lexical environment"),
        }
    }

    /// Environment subtype.
    pub fn lex_env_kind(&self) -> LexEnvKind {
        match self.kind {
            ObjectKind::DeclarativeEnv { .. } => LexEnvKind::Declarative,
            ObjectKind::ObjectBoundEnv { provide_this, .. } => {
                if provide_this {
                    LexEnvKind::ThisObjectBound
                } else {
                    LexEnvKind::ObjectBound
                }
            }
            ObjectKind::Ordinary { .. } => {
                discriminant_violation("lex_env_kind on an ordinary object")
            }
        }
    }

    /// Outer environment reference.
    pub fn outer_reference(&self) -> Option<ObjectId> {
        match self.kind {
            ObjectKind::DeclarativeEnv { outer, .. } | ObjectKind::ObjectBoundEnv { outer, .. } => {
                outer
            }
            ObjectKind::Ordinary { .. } => {
                discriminant_violation("outer_reference on an ordinary object")
            }
        }
    }

    /// Binding object of an object-bound environment.
    pub fn binding_object(&self) -> ObjectId {
        match self.kind {
            ObjectKind::ObjectBoundEnv { binding_object, .. } => binding_object,
            _ => discriminant_violation("binding_object on a non-object-bound descriptor"),
        }
    }

    /// Whether the binding object also provides `this`.
    pub fn provide_this(&self) -> bool {
        match self.kind {
            ObjectKind::ObjectBoundEnv { provide_this, .. } => provide_this,
            _ => discriminant_violation("provide_this on a non-object-bound descriptor"),
        }
    }

    /// Head of the property list. Ordinary objects and declarative
    /// environments only; object-bound environments have no list.
    pub fn property_list_head(&self) -> Option<PropertyId> {
        match self.kind {
            ObjectKind::Ordinary { property_list, .. }
            | ObjectKind::DeclarativeEnv { property_list, .. } => property_list,
            ObjectKind::ObjectBoundEnv { .. } => {
                discriminant_violation("property list of an object-bound environment")
            }
        }
    }

    pub(crate) fn set_property_list_head(&mut self, head: Option<PropertyId>) {
        match &mut self.kind {
            ObjectKind::Ordinary { property_list, .. }
            | ObjectKind::DeclarativeEnv { property_list, .. } => *property_list = head,
            ObjectKind::ObjectBoundEnv { .. } => {
                discriminant_violation("property list of an object-bound environment")
            }
        }
    }

    /// Mark used by the tracing collector.
    pub fn gc_visited(&self) -> bool {
        self.gc_visited
    }

    pub fn set_gc_visited(&mut self, visited: bool) {
        self.gc_visited = visited;
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u16 {
        self.refs
    }
}

#[allow(clippy::panic)]
fn discriminant_violation(what: &str) -> ! {
    panic!("descriptor discriminant violation: {what}")
}
