//! End-to-end tests for bytecode reference counting, including the
//! self-reference exception and the interaction with internal properties.

use jsheap::{Heap, InternalKind, InternalPayload, ObjectType};

#[test]
fn test_function_bytecode_shared_by_two_closures() {
    let mut heap = Heap::new();
    let bc = heap.alloc_function_bytecode(Box::new([0x01]), Box::new([3, 4]));

    // Two function objects share the compiled code.
    heap.bytecode_ref(bc);
    assert_eq!(heap.bytecode_ref_count(bc), 2);

    heap.bytecode_deref(bc);
    assert!(heap.bytecode_is_live(bc));
    heap.bytecode_deref(bc);
    assert!(!heap.bytecode_is_live(bc));
}

#[test]
fn test_self_referencing_literal_table_frees_once() {
    let mut heap = Heap::new();
    let baseline = heap.stats().live_bytecode;

    let bc = heap.alloc_function_bytecode(Box::new([0x01, 0x02]), Box::new([]));
    heap.push_bytecode_ref(bc, bc);

    // The self entry was never counted, so one reference is all there is.
    assert_eq!(heap.bytecode_ref_count(bc), 1);

    // Reaches zero exactly once: no infinite recursion, no double free.
    heap.bytecode_deref(bc);
    assert!(!heap.bytecode_is_live(bc));
    assert_eq!(heap.stats().live_bytecode, baseline);
}

#[test]
fn test_mixed_literal_table_skips_only_the_self_entry() {
    let mut heap = Heap::new();
    let inner = heap.alloc_function_bytecode(Box::new([0x0a]), Box::new([]));
    let outer = heap.alloc_function_bytecode(Box::new([0x0b]), Box::new([]));

    heap.push_bytecode_ref(outer, inner);
    heap.push_bytecode_ref(outer, outer);
    heap.push_bytecode_ref(outer, inner);
    assert_eq!(heap.bytecode_ref_count(inner), 3);
    assert_eq!(heap.bytecode_ref_count(outer), 1);

    // The compiler's own handle to inner goes away first.
    heap.bytecode_deref(inner);

    heap.bytecode_deref(outer);
    assert!(!heap.bytecode_is_live(outer));
    assert!(!heap.bytecode_is_live(inner));
}

#[test]
fn test_code_bytecode_property_releases_on_delete() {
    let mut heap = Heap::new();
    let function = heap.create_object(None, true, ObjectType::Function);
    let bc = heap.alloc_function_bytecode(Box::new([0x01]), Box::new([9]));

    let prop = heap.create_internal_property(function, InternalKind::CodeBytecode);
    // Ownership of the compiler's reference moves into the property.
    heap.set_internal_payload(prop, InternalPayload::Bytecode(Some(bc)));

    heap.delete_property(function, prop);
    assert!(!heap.bytecode_is_live(bc));
}

#[test]
fn test_uncompiled_regexp_slot_releases_as_a_no_op() {
    let mut heap = Heap::new();
    let regexp = heap.create_object(None, true, ObjectType::General);

    let prop = heap.create_internal_property(regexp, InternalKind::RegexpBytecode);
    heap.set_internal_payload(prop, InternalPayload::Bytecode(None));

    // Deleting the not-yet-compiled slot must not touch the bytecode store.
    heap.delete_property(regexp, prop);
    assert_eq!(heap.stats().live_bytecode, 0);
}

#[test]
fn test_regexp_bytecode_releases_pattern_string() {
    let mut heap = Heap::new();
    let regexp = heap.create_object(None, true, ObjectType::General);
    let pattern = heap.intern("[a-z]+");

    // The bytecode takes over the pattern reference we interned.
    let bc = heap.alloc_regexp_bytecode(Box::new([0x20, 0x21]), Some(pattern));
    let prop = heap.create_internal_property(regexp, InternalKind::RegexpBytecode);
    heap.set_internal_payload(prop, InternalPayload::Bytecode(Some(bc)));

    heap.delete_property(regexp, prop);
    assert!(!heap.bytecode_is_live(bc));
    assert!(!heap.strings().contains(pattern));
}

#[test]
fn test_deep_literal_chain_releases_transitively() {
    let mut heap = Heap::new();

    // bc[0] <- bc[1] <- ... <- bc[n]: each block's table references the
    // previous one.
    let mut blocks = Vec::new();
    for i in 0..64u8 {
        let bc = heap.alloc_function_bytecode(Box::new([i]), Box::new([]));
        if let Some(&prev) = blocks.last() {
            heap.push_bytecode_ref(bc, prev);
            heap.bytecode_deref(prev);
        }
        blocks.push(bc);
    }

    let last = match blocks.last() {
        Some(&bc) => bc,
        None => unreachable_state(),
    };
    assert_eq!(heap.stats().live_bytecode, 64);

    heap.bytecode_deref(last);
    assert_eq!(heap.stats().live_bytecode, 0);
}

#[allow(clippy::panic)]
fn unreachable_state() -> ! {
    panic!("test built at least one block")
}
