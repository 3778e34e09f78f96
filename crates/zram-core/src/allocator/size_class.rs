use super::Allocator;

const FLOOR: usize = 64;

/// Rounds every request up to the next power of two (floor 64 bytes), the way a
/// slab allocator's size classes would. The actual reserved size may exceed the
/// literal request.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeClassAllocator;

impl Allocator for SizeClassAllocator {
    fn size_for(&self, requested: usize) -> usize {
        if requested == 0 {
            return 0;
        }
        requested.max(FLOOR).next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_power_of_two() {
        let a = SizeClassAllocator;
        assert_eq!(a.size_for(0), 0);
        assert_eq!(a.size_for(1), 64);
        assert_eq!(a.size_for(64), 64);
        assert_eq!(a.size_for(65), 128);
        assert_eq!(a.size_for(4096), 4096);
        assert_eq!(a.size_for(4097), 8192);
    }
}
