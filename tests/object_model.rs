//! End-to-end tests for the object/property representation layer.
//!
//! These exercise the public `Heap` API the way the object-model algorithm
//! layer does: constructors, property creation and lookup, descriptor
//! snapshots, value assignment and teardown.

use jsheap::{Heap, InternalKind, InternalPayload, ObjectType, Value};

fn heap_with_object() -> (Heap, jsheap::ObjectId) {
    let mut heap = Heap::new();
    let object = heap.create_object(None, true, ObjectType::General);
    (heap, object)
}

// ============================================================================
// Descriptors and environments
// ============================================================================

#[test]
fn test_is_lexical_environment_tracks_constructor() {
    let mut heap = Heap::new();

    let object = heap.create_object(None, true, ObjectType::General);
    let decl = heap.create_declarative_env(None);
    let bound = heap.create_object_env(Some(decl), object, false);
    let this_bound = heap.create_object_env(Some(decl), object, true);

    assert!(!heap.object(object).is_lexical_environment());
    assert!(heap.object(decl).is_lexical_environment());
    assert!(heap.object(bound).is_lexical_environment());
    assert!(heap.object(this_bound).is_lexical_environment());
}

#[test]
fn test_environment_chain_and_binding_object() {
    let mut heap = Heap::new();
    let global = heap.create_declarative_env(None);
    let binding = heap.create_object(None, true, ObjectType::General);
    let with_env = heap.create_object_env(Some(global), binding, true);

    assert_eq!(heap.object(global).outer_reference(), None);
    assert_eq!(heap.object(with_env).outer_reference(), Some(global));
    assert_eq!(heap.object(with_env).binding_object(), binding);
    assert!(heap.object(with_env).provide_this());
    assert_eq!(
        heap.object(with_env).lex_env_kind(),
        jsheap::LexEnvKind::ThisObjectBound
    );
}

#[test]
fn test_object_flags_and_prototype() {
    let mut heap = Heap::new();
    let proto = heap.create_object(None, true, ObjectType::General);
    let object = heap.create_object(Some(proto), false, ObjectType::Array);

    assert_eq!(heap.object(object).prototype(), Some(proto));
    assert_eq!(heap.object(object).object_type(), ObjectType::Array);
    assert!(!heap.object(object).is_extensible());

    heap.object_mut(object).set_extensible(true);
    assert!(heap.object(object).is_extensible());

    assert!(!heap.object(object).is_built_in());
    heap.object_mut(object).set_built_in();
    assert!(heap.object(object).is_built_in());
}

#[test]
fn test_declarative_env_owns_a_property_list() {
    let mut heap = Heap::new();
    let env = heap.create_declarative_env(None);
    let name = heap.intern("binding");

    let prop = heap.create_named_data_property(env, name, true, false, false);
    assert_eq!(heap.find_named_property(env, name), Some(prop));
}

// ============================================================================
// Named property scenario from the object-model layer's perspective
// ============================================================================

#[test]
fn test_data_property_full_scenario() {
    // Create O (extensible, null prototype); add "x"; assign 42; delete.
    let (mut heap, object) = heap_with_object();
    let name = heap.intern("x");

    let prop = heap.create_named_data_property(object, name, true, true, true);
    heap.assign_named_data_value(object, prop, &Value::number(0.0));

    // Warm the cache so deletion has a memoized entry to invalidate.
    assert_eq!(heap.find_named_property(object, name), Some(prop));
    assert!(heap.is_property_lcached(prop));

    heap.assign_named_data_value(object, prop, &Value::number(42.0));
    assert_eq!(heap.named_data_value(prop).as_number(), Some(42.0));

    heap.delete_property(object, prop);
    assert_eq!(heap.find_named_property(object, name), None);
    // And again, now served by the memoized negative entry.
    assert_eq!(heap.find_named_property(object, name), None);
}

#[test]
fn test_delete_is_cache_consistent_without_prior_lookup() {
    // Same deletion, but the cache never saw the record.
    let (mut heap, object) = heap_with_object();
    let name = heap.intern("x");

    let prop = heap.create_named_data_property(object, name, true, true, true);
    heap.delete_property(object, prop);

    assert_eq!(heap.find_named_property(object, name), None);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "duplicate named property")]
fn test_duplicate_named_property_is_a_caller_bug() {
    let (mut heap, object) = heap_with_object();
    let name = heap.intern("x");

    heap.create_named_data_property(object, name, true, true, true);
    heap.create_named_data_property(object, name, false, false, false);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "duplicate internal property")]
fn test_duplicate_internal_kind_is_a_caller_bug() {
    let (mut heap, object) = heap_with_object();

    heap.create_internal_property(object, InternalKind::Scope);
    heap.create_internal_property(object, InternalKind::Scope);
}

// ============================================================================
// Descriptor bridge
// ============================================================================

#[test]
fn test_accessor_snapshot_leaves_getter_setter_alive() {
    let (mut heap, object) = heap_with_object();
    let getter = heap.create_object(None, true, ObjectType::Function);
    let setter = heap.create_object(None, true, ObjectType::Function);
    let name = heap.intern("y");

    let prop =
        heap.create_named_accessor_property(object, name, Some(getter), Some(setter), false, true);

    let mut desc = heap.property_descriptor_from_property(prop);
    assert!(desc.is_get_defined);
    assert!(desc.is_set_defined);
    assert!(!desc.is_writable_defined);
    assert!(!desc.is_enumerable);
    assert!(desc.is_configurable);

    heap.free_property_descriptor(&mut desc);

    // G and S keep their construction reference; the snapshot's extra
    // references are gone.
    assert_eq!(heap.object(getter).ref_count(), 1);
    assert_eq!(heap.object(setter).ref_count(), 1);
    heap.delete_property(object, prop);
    assert_eq!(heap.object(getter).ref_count(), 1);
    assert_eq!(heap.object(setter).ref_count(), 1);
}

#[test]
fn test_object_value_snapshot_counts_and_releases_the_reference() {
    let (mut heap, object) = heap_with_object();
    let target = heap.create_object(None, true, ObjectType::General);
    let name = heap.intern("ref");
    let prop = heap.create_named_data_property(object, name, true, true, true);

    // The value slot stores the object without owning it.
    heap.assign_named_data_value(object, prop, &Value::Object(target));
    assert_eq!(heap.object(target).ref_count(), 1);

    let mut desc = heap.property_descriptor_from_property(prop);
    assert_eq!(heap.object(target).ref_count(), 2);

    heap.free_property_descriptor(&mut desc);
    assert_eq!(heap.object(target).ref_count(), 1);

    // Deleting the property must not touch the object's count either.
    heap.delete_property(object, prop);
    assert_eq!(heap.object(target).ref_count(), 1);
}

// ============================================================================
// Internal property payloads
// ============================================================================

#[test]
fn test_bound_this_value_released_on_delete() {
    let (mut heap, object) = heap_with_object();
    let this_str = heap.intern("this-value");

    let prop = heap.create_internal_property(object, InternalKind::BoundFunctionBoundThis);
    heap.ref_string(this_str);
    heap.set_internal_payload(prop, InternalPayload::Value(Value::String(this_str)));
    assert_eq!(heap.strings().ref_count(this_str), 2);

    heap.delete_property(object, prop);
    assert_eq!(heap.strings().ref_count(this_str), 1);
}

#[test]
fn test_bound_args_collection_does_not_release_values() {
    let (mut heap, object) = heap_with_object();
    let arg = heap.intern("argument");
    heap.ref_string(arg);

    let collection = heap.create_collection();
    heap.collection_push(collection, Value::String(arg));

    let prop = heap.create_internal_property(object, InternalKind::BoundFunctionBoundArgs);
    heap.set_internal_payload(prop, InternalPayload::Collection(collection));

    heap.delete_property(object, prop);
    // The collection is gone but the argument value was never owned by it.
    assert_eq!(heap.strings().ref_count(arg), 2);
    heap.deref_string(arg);
    heap.deref_string(arg);
}

#[test]
fn test_array_values_collection_releases_values() {
    let (mut heap, object) = heap_with_object();
    let element = heap.intern("element");
    heap.ref_string(element);

    let collection = heap.create_collection();
    heap.collection_push(collection, Value::String(element));

    let prop = heap.create_internal_property(object, InternalKind::NumberIndexedArrayValues);
    heap.set_internal_payload(prop, InternalPayload::Collection(collection));

    heap.delete_property(object, prop);
    assert_eq!(heap.strings().ref_count(element), 1);
}

#[test]
fn test_native_handle_release_invokes_hook() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    fn on_free(pointer: jsheap::ExternalPointer) {
        RELEASED.fetch_add(pointer.0, Ordering::SeqCst);
    }

    let (mut heap, object) = heap_with_object();
    heap.set_native_free_hook(on_free);

    let prop = heap.create_internal_property(object, InternalKind::NativeHandle);
    heap.set_internal_payload(prop, InternalPayload::External(jsheap::ExternalPointer(7)));

    heap.delete_property(object, prop);
    assert_eq!(RELEASED.load(Ordering::SeqCst), 7);
}

// ============================================================================
// Collector support
// ============================================================================

#[test]
fn test_visit_references_covers_every_owned_edge() {
    let mut heap = Heap::new();
    let proto = heap.create_object(None, true, ObjectType::General);
    let object = heap.create_object(Some(proto), true, ObjectType::General);
    let child = heap.create_object(None, true, ObjectType::General);
    let getter = heap.create_object(None, true, ObjectType::Function);
    let scope = heap.create_declarative_env(None);

    let data_name = heap.intern("data");
    let accessor_name = heap.intern("accessor");
    let data = heap.create_named_data_property(object, data_name, true, true, true);
    heap.assign_named_data_value(object, data, &Value::Object(child));
    heap.create_named_accessor_property(object, accessor_name, Some(getter), None, true, true);
    let scope_prop = heap.create_internal_property(object, InternalKind::Scope);
    heap.set_internal_payload(scope_prop, InternalPayload::Object(scope));

    let mut visited = Vec::new();
    heap.visit_object_references(object, |id| visited.push(id));

    assert!(visited.contains(&proto));
    assert!(visited.contains(&child));
    assert!(visited.contains(&getter));
    assert!(visited.contains(&scope));
    assert_eq!(visited.len(), 4);
}

#[test]
fn test_gc_visited_flag_round_trip() {
    let (mut heap, object) = heap_with_object();

    assert!(!heap.object(object).gc_visited());
    heap.object_mut(object).set_gc_visited(true);
    assert!(heap.object(object).gc_visited());
    heap.object_mut(object).set_gc_visited(false);
    assert!(!heap.object(object).gc_visited());
}

#[test]
fn test_teardown_returns_heap_to_baseline() {
    let mut heap = Heap::new();
    let baseline = heap.stats();

    let object = heap.create_object(None, true, ObjectType::General);
    let name = heap.intern("a");
    let other = heap.intern("b");
    heap.create_named_data_property(object, name, true, true, true);
    let accessor_target = heap.create_object(None, true, ObjectType::Function);
    heap.create_named_accessor_property(object, other, Some(accessor_target), None, true, true);
    heap.create_internal_property(object, InternalKind::Class);

    // Collector sweep: drop the handles the mutator held, tear down the
    // property lists, destroy the descriptors.
    heap.deref_string(name);
    heap.deref_string(other);
    heap.free_object_properties(object);
    heap.destroy_object(object);
    heap.deref_object(accessor_target);
    heap.free_object_properties(accessor_target);
    heap.destroy_object(accessor_target);

    let stats = heap.stats();
    assert_eq!(stats.live_objects, baseline.live_objects);
    assert_eq!(stats.live_properties, baseline.live_properties);
    assert_eq!(stats.interned_strings, baseline.interned_strings);
}

#[test]
fn test_stale_property_handle_is_detected() {
    let (mut heap, object) = heap_with_object();
    let name = heap.intern("x");
    let prop = heap.create_named_data_property(object, name, true, true, true);

    heap.delete_property(object, prop);

    // The record is gone; the arena refuses to resolve the stale handle.
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = heap.property(prop);
    }));
    assert!(result.is_err());
}
