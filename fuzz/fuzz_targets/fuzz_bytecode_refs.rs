#![no_main]

use libfuzzer_sys::fuzz_target;

use jsheap::{BytecodeId, Heap};

const MAX_BLOCKS: usize = 32;
// Bounded well below u16::MAX so a long input cannot legitimately saturate
// a reference count and trip the fatal path.
const MAX_OPS: usize = 8_192;

// Build arbitrary literal-table graphs, including self references, and
// check that dropping the root references never double-frees or leaks a
// live count below what the graph still holds.
fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    let mut blocks: Vec<BytecodeId> = Vec::new();

    let mut bytes = data.iter().copied().take(MAX_OPS);
    while let Some(op) = bytes.next() {
        match op % 3 {
            0 if blocks.len() < MAX_BLOCKS => {
                blocks.push(heap.alloc_function_bytecode(Box::new([op]), Box::new([])));
            }
            1 => {
                let (Some(&from), Some(target)) = (
                    blocks.get(op as usize % blocks.len().max(1)),
                    bytes.next(),
                ) else {
                    continue;
                };
                let Some(&to) = blocks.get(target as usize % blocks.len().max(1)) else {
                    continue;
                };
                if heap.bytecode_is_live(from) && heap.bytecode_is_live(to) {
                    heap.push_bytecode_ref(from, to);
                }
            }
            _ => {}
        }
    }

    // Drop the allocation references in order; transitive releases follow
    // the literal tables.
    for bc in blocks {
        if heap.bytecode_is_live(bc) {
            heap.bytecode_deref(bc);
        }
    }
});
