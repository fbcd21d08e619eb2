//! Reference-counted compiled-code blocks.
//!
//! Bytecode produced by the external compiler is shared across function
//! closures and literal tables, so it is reference counted with a saturating
//! 16-bit counter; saturation is fatal, never a wrap.
//!
//! A compiled function's literal table contains a region of references to
//! other bytecode blocks. An entry may refer back to the block that owns the
//! table (a function whose literals mention itself). Such self-references
//! were never counted when the table was stored, so release must skip
//! exactly them: dereferencing a self-entry would free the block while it is
//! still being torn down, and counting them at store time would make the
//! block immortal. Only self-references get this treatment; a genuine cycle
//! through another block is still counted normally.

use crate::arena::Id;
use crate::error::{Fatal, fatal};
use crate::heap::Heap;
use crate::strings::StringId;

/// Handle to a compiled-code block.
pub type BytecodeId = Id<CompiledCode>;

/// A reference-counted block of compiled code.
pub struct CompiledCode {
    pub(crate) refs: u16,
    pub(crate) payload: CodePayload,
}

/// Payload variants of a compiled-code block.
pub enum CodePayload {
    /// A compiled function: instruction bytes plus a literal table.
    Function {
        code: Box<[u8]>,
        /// Constant-literal region. The entries are owned by the external
        /// literal storage and are never released here.
        const_literals: Box<[u32]>,
        /// Bytecode-reference region. Each entry holds one counted
        /// reference, except entries referring to this block itself.
        bytecode_refs: Vec<BytecodeId>,
    },
    /// Any other compiled payload, e.g. a regular expression. The pattern
    /// string is owned and released with the block.
    Other {
        code: Box<[u8]>,
        pattern: Option<StringId>,
    },
}

impl CompiledCode {
    /// Whether this block is a compiled function.
    pub fn is_function(&self) -> bool {
        matches!(self.payload, CodePayload::Function { .. })
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u16 {
        self.refs
    }
}

impl Heap {
    /// Store a compiled function. The returned handle holds the initial
    /// reference (count 1); the bytecode-reference region starts empty and
    /// is filled through [`Heap::push_bytecode_ref`].
    pub fn alloc_function_bytecode(
        &mut self,
        code: Box<[u8]>,
        const_literals: Box<[u32]>,
    ) -> BytecodeId {
        self.bytecode.insert(CompiledCode {
            refs: 1,
            payload: CodePayload::Function {
                code,
                const_literals,
                bytecode_refs: Vec::new(),
            },
        })
    }

    /// Store a non-function payload (e.g. compiled regular expression).
    /// Ownership of the pattern reference moves into the block.
    pub fn alloc_regexp_bytecode(
        &mut self,
        code: Box<[u8]>,
        pattern: Option<StringId>,
    ) -> BytecodeId {
        self.bytecode.insert(CompiledCode {
            refs: 1,
            payload: CodePayload::Other { code, pattern },
        })
    }

    /// Append `target` to the bytecode-reference region of `bytecode`.
    ///
    /// Takes a counted reference to `target` unless it is `bytecode` itself;
    /// self-references are stored uncounted and skipped again on release.
    pub fn push_bytecode_ref(&mut self, bytecode: BytecodeId, target: BytecodeId) {
        if target != bytecode {
            self.bytecode_ref(target);
        }

        match &mut self.compiled_mut(bytecode).payload {
            CodePayload::Function { bytecode_refs, .. } => bytecode_refs.push(target),
            CodePayload::Other { .. } => {
                discriminant_violation("bytecode-reference region of a non-function block")
            }
        }
    }

    /// Increment the reference count. Fatal at the maximum: wrapping would
    /// eventually free a block that is still referenced.
    pub fn bytecode_ref(&mut self, bytecode: BytecodeId) {
        let code = self.compiled_mut(bytecode);
        if code.refs >= u16::MAX {
            fatal(Fatal::RefCountLimit);
        }
        code.refs += 1;
    }

    /// Decrement the reference count, releasing the block at zero.
    ///
    /// Releasing a compiled function dereferences every entry of its
    /// bytecode-reference region except self-references; releasing any
    /// other payload dereferences its pattern string, if present.
    pub fn bytecode_deref(&mut self, bytecode: BytecodeId) {
        {
            let code = self.compiled_mut(bytecode);
            debug_assert!(code.refs > 0);
            code.refs -= 1;
            if code.refs > 0 {
                return;
            }
        }

        let code = match self.bytecode.remove(bytecode) {
            Some(code) => code,
            None => fatal(Fatal::DeadHandle),
        };

        match code.payload {
            CodePayload::Function { bytecode_refs, .. } => {
                for target in bytecode_refs {
                    // Self references are ignored.
                    if target != bytecode {
                        self.bytecode_deref(target);
                    }
                }
            }
            CodePayload::Other { pattern, .. } => {
                if let Some(pattern) = pattern {
                    self.deref_string(pattern);
                }
            }
        }
    }

    /// Current reference count of a block.
    pub fn bytecode_ref_count(&self, bytecode: BytecodeId) -> u16 {
        self.compiled(bytecode).refs
    }

    /// Whether a block holds a compiled function.
    pub fn bytecode_is_function(&self, bytecode: BytecodeId) -> bool {
        self.compiled(bytecode).is_function()
    }

    /// Whether the handle still refers to a live block.
    pub fn bytecode_is_live(&self, bytecode: BytecodeId) -> bool {
        self.bytecode.contains(bytecode)
    }

    fn compiled(&self, bytecode: BytecodeId) -> &CompiledCode {
        match self.bytecode.get(bytecode) {
            Some(code) => code,
            None => fatal(Fatal::DeadHandle),
        }
    }

    fn compiled_mut(&mut self, bytecode: BytecodeId) -> &mut CompiledCode {
        match self.bytecode.get_mut(bytecode) {
            Some(code) => code,
            None => fatal(Fatal::DeadHandle),
        }
    }
}

#[allow(clippy::panic)]
fn discriminant_violation(what: &str) -> ! {
    panic!("bytecode discriminant violation: {what}")
}
