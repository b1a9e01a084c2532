//! Heap accounting for the benchmark's peak-memory column.
//!
//! [`CountingAllocator`] must be installed as the `#[global_allocator]` of the executable; otherwise every
//! [`PeakWindow`] reports zero.
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: jsonbench::memory::CountingAllocator = jsonbench::memory::CountingAllocator;
//! ```
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};


static CURRENT: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// System allocator that keeps the number of live heap bytes and its high-water mark.
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let ptr = System.alloc(layout);
    if !ptr.is_null() {
      grow(layout.size());
    }
    ptr
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    let ptr = System.alloc_zeroed(layout);
    if !ptr.is_null() {
      grow(layout.size());
    }
    ptr
  }

  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    System.dealloc(ptr, layout);
    shrink(layout.size());
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    let new_ptr = System.realloc(ptr, layout, new_size);
    if !new_ptr.is_null() {
      if new_size > layout.size() {
        grow(new_size - layout.size());
      } else {
        shrink(layout.size() - new_size);
      }
    }
    new_ptr
  }
}

#[inline]
fn grow(size: usize) {
  INSTALLED.store(true, Ordering::Relaxed);
  let now = CURRENT.fetch_add(size, Ordering::Relaxed) + size;
  PEAK.fetch_max(now, Ordering::Relaxed);
}

#[inline]
fn shrink(size: usize) {
  CURRENT.fetch_sub(size, Ordering::Relaxed);
}

/// Whether [`CountingAllocator`] serves the allocations of this process.
pub fn is_tracking() -> bool {
  INSTALLED.load(Ordering::Relaxed)
}

/// Live heap bytes allocated through [`CountingAllocator`].
pub fn allocated() -> usize {
  CURRENT.load(Ordering::Relaxed)
}

/// Measures the heap high-water mark between [`PeakWindow::open`] and [`PeakWindow::close`].
///
/// The counters are process wide, so allocations made by other threads during the window are included.
#[derive(Debug)]
pub struct PeakWindow {
  baseline: usize,
}

impl PeakWindow {
  pub fn open() -> Self {
    let baseline = CURRENT.load(Ordering::Relaxed);
    PEAK.store(baseline, Ordering::Relaxed);
    Self { baseline }
  }

  /// Peak growth in bytes so far.
  pub fn peak(&self) -> u64 {
    PEAK.load(Ordering::Relaxed).saturating_sub(self.baseline) as u64
  }

  /// Peak growth in bytes over the level at which the window was opened.
  pub fn close(self) -> u64 {
    self.peak()
  }
}

// Windows reset the shared high-water mark; tests that read it take this lock.
#[cfg(test)]
pub(crate) static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());
