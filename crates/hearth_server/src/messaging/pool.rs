//! Reusable message buffer pool.
//!
//! Buffers are handed out as [`PooledMessage`] guards. Dropping a guard resets
//! the buffer's cursors and puts it back on the free list, so every exit path
//! of the code holding it (normal return, `?`, panic unwinding) releases it
//! exactly once. Released buffers are not zeroed.
//!
//! The pool has no upper bound: under load it grows to the peak number of
//! buffers in flight and keeps them for reuse.

use super::codec::MessageBuffer;
use crossbeam::queue::SegQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct PoolInner {
    free: SegQueue<Box<MessageBuffer>>,
    allocated: AtomicUsize,
    in_use: AtomicUsize,
}

/// Thread-safe pool of [`MessageBuffer`]s. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MessagePool {
    inner: Arc<PoolInner>,
}

impl MessagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a buffer from the free list, allocating one if the list is empty.
    ///
    /// The returned buffer always has both cursors at zero.
    pub fn acquire(&self) -> PooledMessage {
        let buffer = match self.inner.free.pop() {
            Some(buffer) => buffer,
            None => {
                self.inner.allocated.fetch_add(1, Ordering::Relaxed);
                Box::new(MessageBuffer::new())
            }
        };
        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        PooledMessage {
            buffer: Some(buffer),
            pool: self.clone(),
        }
    }

    /// Total number of buffers ever allocated by this pool.
    pub fn allocated(&self) -> usize {
        self.inner.allocated.load(Ordering::Relaxed)
    }

    /// Number of buffers currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Relaxed)
    }

    /// Number of buffers waiting on the free list.
    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    fn release(&self, mut buffer: Box<MessageBuffer>) {
        buffer.reset_position();
        self.inner.in_use.fetch_sub(1, Ordering::Relaxed);
        self.inner.free.push(buffer);
    }
}

/// A buffer on loan from a [`MessagePool`]; returned on drop.
#[derive(Debug)]
pub struct PooledMessage {
    buffer: Option<Box<MessageBuffer>>,
    pool: MessagePool,
}

impl Deref for PooledMessage {
    type Target = MessageBuffer;

    fn deref(&self) -> &MessageBuffer {
        // Only `Drop` takes the buffer out.
        self.buffer.as_deref().unwrap_or_else(|| unreachable!("pooled buffer already released"))
    }
}

impl DerefMut for PooledMessage {
    fn deref_mut(&mut self) -> &mut MessageBuffer {
        self.buffer.as_deref_mut().unwrap_or_else(|| unreachable!("pooled buffer already released"))
    }
}

impl Drop for PooledMessage {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
