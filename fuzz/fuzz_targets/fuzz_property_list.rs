#![no_main]

use libfuzzer_sys::fuzz_target;

use jsheap::{Heap, ObjectType, Value};

const MAX_OPS: usize = 4_096;

// Drive random create/find/assign/delete sequences against one object and
// check that lookups always agree with a shadow list of live names.
fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    let object = heap.create_object(None, true, ObjectType::General);

    let names: Vec<_> = (0..16).map(|i| heap.intern(&format!("n{i}"))).collect();
    let mut live: Vec<Option<jsheap::PropertyId>> = vec![None; names.len()];

    for chunk in data.chunks(2).take(MAX_OPS) {
        let op = chunk.first().copied().unwrap_or(0);
        let slot = chunk.get(1).copied().unwrap_or(0) as usize % names.len();
        let Some(&name) = names.get(slot) else {
            return;
        };

        match op % 4 {
            0 => {
                if live[slot].is_none() {
                    let prop = heap.create_named_data_property(object, name, true, true, true);
                    live[slot] = Some(prop);
                }
            }
            1 => {
                if let Some(prop) = live[slot] {
                    heap.assign_named_data_value(object, prop, &Value::number(f64::from(op)));
                }
            }
            2 => {
                if let Some(prop) = live[slot].take() {
                    heap.delete_property(object, prop);
                }
            }
            _ => {
                assert_eq!(heap.find_named_property(object, name), live[slot]);
            }
        }

        assert_eq!(heap.find_named_property(object, name), live[slot]);
    }

    heap.free_object_properties(object);
    for &name in &names {
        assert_eq!(heap.find_named_property(object, name), None);
    }
});
