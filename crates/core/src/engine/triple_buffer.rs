use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// Packed state word: bits 0-1 hold the shared slot index, bit 2 is
// the dirty flag. Mutated only via compare-and-swap.
const INDEX_MASK: u8 = 0b011;
const DIRTY: u8 = 0b100;

struct Shared<T> {
    slots: [UnsafeCell<T>; 3],
    state: AtomicU8,
}

// The handoff protocol guarantees each slot is owned by exactly one
// of {writer, shared, reader} at any instant: the writer only touches
// its private slot, the reader only its own, and ownership moves
// through the atomic state word. So cross-thread access to the
// UnsafeCells is never aliased mutably.
unsafe impl<T: Send> Sync for Shared<T> {}

/// Producer half of a lock-free single-writer/single-reader triple
/// buffer. Mutate the write slot in place, then [`publish`] to make
/// the whole frame visible atomically.
///
/// [`publish`]: Writer::publish
pub struct Writer<T> {
    shared: Arc<Shared<T>>,
    write_idx: u8,
}

/// Consumer half. [`refresh`] claims the latest published frame if
/// there is one; otherwise the reader keeps its current slot, so a
/// slow producer never blocks the consumer.
///
/// [`refresh`]: Reader::refresh
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
    read_idx: u8,
}

/// Build a writer/reader pair with all three slots cloned from
/// `initial`. A read before any publish observes `initial`.
pub fn triple_buffer<T: Clone + Send>(initial: T) -> (Writer<T>, Reader<T>) {
    let shared = Arc::new(Shared {
        slots: [
            UnsafeCell::new(initial.clone()),
            UnsafeCell::new(initial.clone()),
            UnsafeCell::new(initial),
        ],
        // write=0, shared=1, read=2, nothing dirty yet.
        state: AtomicU8::new(1),
    });
    (
        Writer {
            shared: Arc::clone(&shared),
            write_idx: 0,
        },
        Reader {
            shared,
            read_idx: 2,
        },
    )
}

impl<T> Writer<T> {
    /// The writer's private slot, for in-place mutation.
    pub fn slot(&mut self) -> &mut T {
        // Safe: write_idx is owned exclusively by this writer until
        // the next publish, and &mut self prevents re-entry.
        unsafe { &mut *self.shared.slots[self.write_idx as usize].get() }
    }

    /// Swap the write slot into the shared position (marking it
    /// dirty) and claim the previous shared slot for the next frame.
    pub fn publish(&mut self) {
        let mut current = self.shared.state.load(Ordering::Relaxed);
        loop {
            let next = self.write_idx | DIRTY;
            match self.shared.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(previous) => {
                    self.write_idx = previous & INDEX_MASK;
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }
}

impl<T> Reader<T> {
    /// Claim the shared slot if the writer has published since the
    /// last refresh. Returns false (and keeps the current slot) when
    /// nothing new is available.
    pub fn refresh(&mut self) -> bool {
        let mut current = self.shared.state.load(Ordering::Acquire);
        loop {
            if current & DIRTY == 0 {
                return false;
            }
            match self.shared.state.compare_exchange_weak(
                current,
                self.read_idx,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => {
                    self.read_idx = previous & INDEX_MASK;
                    return true;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// The reader's current slot. Stable until the next [`refresh`].
    ///
    /// [`refresh`]: Reader::refresh
    pub fn slot(&self) -> &T {
        // Safe: read_idx is owned exclusively by this reader until
        // the next refresh.
        unsafe { &*self.shared.slots[self.read_idx as usize].get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_any_write_observes_initial() {
        let (_writer, mut reader) = triple_buffer(7u32);
        assert!(!reader.refresh());
        assert_eq!(*reader.slot(), 7);
    }

    #[test]
    fn one_publish_one_observation() {
        let (mut writer, mut reader) = triple_buffer(0u32);
        *writer.slot() = 42;
        writer.publish();

        assert!(reader.refresh());
        assert_eq!(*reader.slot(), 42);

        // No intervening publish: refresh reports nothing new and the
        // slot re-reads the same value.
        assert!(!reader.refresh());
        assert_eq!(*reader.slot(), 42);
    }

    #[test]
    fn reader_skips_to_latest_frame() {
        let (mut writer, mut reader) = triple_buffer(0u32);
        for value in 1..=5 {
            *writer.slot() = value;
            writer.publish();
        }
        assert!(reader.refresh());
        assert_eq!(*reader.slot(), 5);
    }

    #[test]
    fn works_with_vector_frames() {
        let (mut writer, mut reader) = triple_buffer(vec![0u8; 4]);
        writer.slot()[2] = 9;
        writer.publish();
        assert!(reader.refresh());
        assert_eq!(reader.slot(), &vec![0, 0, 9, 0]);
    }

    #[test]
    fn concurrent_writer_and_reader() {
        let (mut writer, mut reader) = triple_buffer((0u64, 0u64));
        let producer = std::thread::spawn(move || {
            for i in 1..=10_000u64 {
                *writer.slot() = (i, i * 2);
                writer.publish();
            }
        });
        let consumer = std::thread::spawn(move || {
            let mut last = 0;
            for _ in 0..100_000 {
                reader.refresh();
                let (a, b) = *reader.slot();
                // Frames are atomically visible: never a torn pair,
                // never going backwards.
                assert_eq!(b, a * 2);
                assert!(a >= last);
                last = a;
            }
        });
        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
