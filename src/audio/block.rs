use crate::error::{Error, Result};
use crossbeam_channel::{bounded, select_biased, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A fixed-size run of mono samples in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
}

impl AudioBlock {
    pub fn silent(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Bounded FIFO handing filled blocks from the producer to the consumer.
///
/// [BlockQueue::push] blocks while the queue is full and [BlockQueue::pop]
/// blocks while it is empty. [BlockQueue::close] wakes both: pushes fail
/// from then on, while blocks already queued can still be popped until the
/// queue is drained.
///
/// Consumed blocks can be handed back with [BlockQueue::recycle] and reused
/// by [BlockQueue::acquire], so steady-state playback does not allocate.
#[derive(Debug)]
pub struct BlockQueue {
    sender: Sender<AudioBlock>,
    receiver: Receiver<AudioBlock>,
    closed: AtomicBool,
    // Nothing is ever sent on this channel; dropping its sender disconnects
    // `close_watch`, which wakes every select waiting on it.
    close_signal: Mutex<Option<Sender<()>>>,
    close_watch: Receiver<()>,
    spare_sender: Sender<AudioBlock>,
    spare_receiver: Receiver<AudioBlock>,
    capacity: usize,
    block_samples: usize,
}

impl BlockQueue {
    pub fn new(capacity: usize, block_samples: usize) -> Self {
        // A zero-capacity crossbeam channel is a rendezvous, not a buffer.
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let (close_signal, close_watch) = bounded(0);
        // One block can be filling and one playing on top of a full queue.
        let (spare_sender, spare_receiver) = bounded(capacity + 2);
        Self {
            sender,
            receiver,
            closed: AtomicBool::new(false),
            close_signal: Mutex::new(Some(close_signal)),
            close_watch,
            spare_sender,
            spare_receiver,
            capacity,
            block_samples,
        }
    }

    /// Appends `block`, waiting for space if the queue is full.
    ///
    /// Returns [Error::QueueClosed] if the queue is or becomes closed before
    /// the block could be queued; the block is dropped in that case.
    pub fn push(&self, block: AudioBlock) -> Result<()> {
        if self.is_closed() {
            return Err(Error::QueueClosed);
        }
        select_biased! {
            recv(self.close_watch) -> _ => Err(Error::QueueClosed),
            send(self.sender, block) -> sent => sent.map_err(|_| Error::QueueClosed),
        }
    }

    /// Removes the oldest block, waiting while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<AudioBlock> {
        select_biased! {
            recv(self.receiver) -> block => block.ok(),
            recv(self.close_watch) -> _ => self.receiver.try_recv().ok(),
        }
    }

    /// Marks the queue closed and wakes all waiters. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn block_samples(&self) -> usize {
        self.block_samples
    }

    /// A block ready to be filled: recycled when one is available.
    pub fn acquire(&self) -> AudioBlock {
        match self.spare_receiver.try_recv() {
            Ok(block) if block.len() == self.block_samples => block,
            _ => AudioBlock::silent(self.block_samples),
        }
    }

    /// Returns a consumed block to the pool. Surplus blocks are dropped.
    pub fn recycle(&self, block: AudioBlock) {
        let _ = self.spare_sender.try_send(block);
    }
}
