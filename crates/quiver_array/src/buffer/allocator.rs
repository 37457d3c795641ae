use std::alloc::Layout;
use std::fmt::Debug;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quiver_error::{QuiverError, Result};

/// Alignment in bytes of every buffer allocation.
pub const BUFFER_ALIGNMENT: usize = 64;

/// Low level allocation interface used by buffers.
pub trait RawAllocator: Debug + Send + Sync {
    /// Allocate a block of memory for the given layout.
    ///
    /// The layout's size is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Deallocate a block previously returned by `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been allocated by this allocator with the same layout.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocates using the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalAllocator;

impl RawAllocator for GlobalAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        debug_assert_ne!(0, layout.size());
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| {
            QuiverError::new("Failed to allocate memory").with_field("bytes", layout.size())
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

/// Global allocator wrapper keeping count of bytes currently allocated.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    allocated: AtomicUsize,
    allocations: AtomicUsize,
}

impl TrackingAllocator {
    /// Number of bytes currently allocated.
    pub fn bytes_allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of allocations made over the lifetime of this allocator.
    pub fn total_allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }
}

impl RawAllocator for TrackingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let ptr = GlobalAllocator.allocate(layout)?;
        self.allocated.fetch_add(layout.size(), Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        GlobalAllocator.deallocate(ptr, layout);
        self.allocated.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

/// The allocator a buffer allocates through.
///
/// Equality is identity based. Two allocators are equal if they're both the
/// global allocator, or if they share the same underlying instance.
#[derive(Debug, Clone, Default)]
pub enum BufferAllocator {
    #[default]
    Global,
    Tracking(Arc<TrackingAllocator>),
    Custom(Arc<dyn RawAllocator>),
}

impl BufferAllocator {
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        match self {
            Self::Global => GlobalAllocator.allocate(layout),
            Self::Tracking(a) => a.allocate(layout),
            Self::Custom(a) => a.allocate(layout),
        }
    }

    /// # Safety
    ///
    /// See [`RawAllocator::deallocate`].
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        match self {
            Self::Global => GlobalAllocator.deallocate(ptr, layout),
            Self::Tracking(a) => a.deallocate(ptr, layout),
            Self::Custom(a) => a.deallocate(ptr, layout),
        }
    }
}

impl PartialEq for BufferAllocator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Global, Self::Global) => true,
            (Self::Tracking(a), Self::Tracking(b)) => Arc::ptr_eq(a, b),
            (Self::Custom(a), Self::Custom(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl Eq for BufferAllocator {}

impl From<Arc<TrackingAllocator>> for BufferAllocator {
    fn from(value: Arc<TrackingAllocator>) -> Self {
        BufferAllocator::Tracking(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_counts_bytes() {
        let tracker = TrackingAllocator::default();
        let layout = Layout::from_size_align(128, BUFFER_ALIGNMENT).unwrap();

        let ptr = tracker.allocate(layout).unwrap();
        assert_eq!(128, tracker.bytes_allocated());
        assert_eq!(0, ptr.as_ptr() as usize % BUFFER_ALIGNMENT);

        unsafe { tracker.deallocate(ptr, layout) };
        assert_eq!(0, tracker.bytes_allocated());
        assert_eq!(1, tracker.total_allocations());
    }

    #[test]
    fn allocator_equality_is_identity() {
        let a = Arc::new(TrackingAllocator::default());
        let b = Arc::new(TrackingAllocator::default());

        assert_eq!(BufferAllocator::Global, BufferAllocator::Global);
        assert_eq!(
            BufferAllocator::Tracking(a.clone()),
            BufferAllocator::Tracking(a.clone())
        );
        assert_ne!(BufferAllocator::Tracking(a), BufferAllocator::Tracking(b));
        assert_ne!(
            BufferAllocator::Global,
            BufferAllocator::Custom(Arc::new(GlobalAllocator))
        );
    }
}
