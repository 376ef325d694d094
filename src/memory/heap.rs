//! Argument buffer heap
//!
//! Host string and sequence arguments have to look like native pointers to
//! the translated code, so they are serialized into byte buffers owned by
//! this heap and passed as addresses. Buffers live for the lifetime of the
//! session; callers that reuse a session across calls keep earlier buffers
//! addressable.
//!
//! # Error Handling
//!
//! Methods return `Result<_, String>`. This is an internal API and the string
//! errors are converted to the public error type at the invoke boundary.

use super::value::{Address, Value};
use rustc_hash::FxHashMap;

/// Addresses start well above zero so that a null pointer can never collide
/// with a live buffer.
pub const HEAP_ADDRESS_START: Address = 0x1000_0000;

/// A block of buffer memory
#[derive(Debug, Clone)]
pub struct HeapBlock {
    pub data: Vec<u8>,
}

/// Bump-allocating buffer arena, keyed by base address.
#[derive(Debug, Clone)]
pub struct Heap {
    allocations: FxHashMap<Address, HeapBlock>,
    /// String literal content -> buffer address, so re-evaluating the same
    /// literal does not grow the arena.
    strings: FxHashMap<String, Address>,
    next_address: Address,
    total_allocated_bytes: usize,
    max_heap_size: usize,
}

impl Heap {
    /// Create a new heap with a maximum size limit
    pub fn new(max_heap_size: usize) -> Self {
        Heap {
            allocations: FxHashMap::default(),
            strings: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
            total_allocated_bytes: 0,
            max_heap_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_heap_size
    }

    pub fn total_allocated(&self) -> usize {
        self.total_allocated_bytes
    }

    /// Allocate a zero-filled block and return its base address.
    pub fn allocate(&mut self, size: usize) -> Result<Address, String> {
        if self.total_allocated_bytes + size > self.max_heap_size {
            return Err(format!(
                "buffer arena exhausted: {} bytes requested, {} of {} in use",
                size, self.total_allocated_bytes, self.max_heap_size
            ));
        }
        let address = self.next_address;
        // Round the next base up to 16 so consecutive buffers never share
        // an alignment-sensitive boundary.
        let stride = (size.max(1) + 15) & !15;
        self.next_address += stride as Address;
        self.total_allocated_bytes += size;
        self.allocations.insert(
            address,
            HeapBlock {
                data: vec![0; size],
            },
        );
        Ok(address)
    }

    /// Copy a NUL-terminated C string into a fresh buffer.
    pub fn allocate_c_string(&mut self, s: &str) -> Result<Address, String> {
        let bytes = s.as_bytes();
        let address = self.allocate(bytes.len() + 1)?;
        let block = self
            .allocations
            .get_mut(&address)
            .ok_or_else(|| "freshly allocated block missing".to_string())?;
        block.data[..bytes.len()].copy_from_slice(bytes);
        Ok(address)
    }

    /// Buffer holding a string literal's content, shared across evaluations
    /// of the same literal.
    pub fn intern_c_string(&mut self, s: &str) -> Result<Address, String> {
        if let Some(&address) = self.strings.get(s) {
            return Ok(address);
        }
        let address = self.allocate_c_string(s)?;
        self.strings.insert(s.to_string(), address);
        Ok(address)
    }

    /// Serialize scalar elements into a fresh buffer, each at `elem_size`
    /// stride, with one zeroed trailing element as a terminator.
    pub fn allocate_sequence(
        &mut self,
        elems: &[Value],
        elem_size: usize,
    ) -> Result<Address, String> {
        let address = self.allocate((elems.len() + 1) * elem_size)?;
        let block = self
            .allocations
            .get_mut(&address)
            .ok_or_else(|| "freshly allocated block missing".to_string())?;
        for (i, elem) in elems.iter().enumerate() {
            let bytes = elem.to_le_bytes()?;
            if bytes.len() != elem_size {
                return Err(format!(
                    "sequence element {} is {} bytes, expected {}",
                    i,
                    bytes.len(),
                    elem_size
                ));
            }
            let offset = i * elem_size;
            block.data[offset..offset + elem_size].copy_from_slice(&bytes);
        }
        Ok(address)
    }

    /// Read bytes starting at an address inside some live buffer.
    pub fn read_bytes(&self, address: Address, size: usize) -> Result<&[u8], String> {
        for (&base, block) in &self.allocations {
            if address >= base && (address - base) as usize + size <= block.data.len() {
                let offset = (address - base) as usize;
                return Ok(&block.data[offset..offset + size]);
            }
        }
        Err(format!(
            "address {:#x} does not fall inside a live buffer",
            address
        ))
    }
}
