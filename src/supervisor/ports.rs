//! Unique port allocation for concurrently running workers.

use std::sync::atomic::{AtomicU16, Ordering};

/// Hands out monotonically increasing port numbers from an ephemeral-range
/// base. Unique ports per worker are a caller precondition, not enforced by
/// the supervisor; sharing one allocator across a test session satisfies it.
#[derive(Debug)]
pub struct PortAllocator {
    next: AtomicU16,
}

impl PortAllocator {
    /// Start of the default ephemeral range.
    pub const DEFAULT_BASE: u16 = 55000;

    /// Create an allocator starting at [`Self::DEFAULT_BASE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(Self::DEFAULT_BASE)
    }

    /// Create an allocator starting at `base`.
    #[must_use]
    pub fn with_base(base: u16) -> Self {
        Self {
            next: AtomicU16::new(base),
        }
    }

    /// Allocate the next port.
    pub fn next(&self) -> u16 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_are_unique_and_increasing() {
        let allocator = PortAllocator::new();
        let a = allocator.next();
        let b = allocator.next();
        let c = allocator.next();
        assert_eq!(a, PortAllocator::DEFAULT_BASE);
        assert_eq!(b, a + 1);
        assert_eq!(c, b + 1);
    }

    #[test]
    fn test_custom_base() {
        let allocator = PortAllocator::with_base(60000);
        assert_eq!(allocator.next(), 60000);
    }
}
