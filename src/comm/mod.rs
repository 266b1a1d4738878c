//! Message-passing substrate for the bulk-synchronous engine.
//!
//! The engine is written against the [`Communicator`] trait: non-blocking
//! byte-level send/receive between ranks plus rank/size queries. Three
//! backends are provided:
//!
//! - [`NoComm`] — the single-rank degenerate case; every boundary helper
//!   collapses to an identity.
//! - [`ThreadComm`] — ranks are threads of one process exchanging through
//!   a global mailbox. This is what the test suite and the CLI front-end
//!   run on.
//! - `MpiComm` — real multi-process ranks over MPI, behind the
//!   `mpi-support` feature.
//!
//! Wire conventions: payloads are `bytemuck::Pod` values cast to bytes,
//! fixed-width and `#[repr(C)]`. Receivers size their buffers exactly;
//! where lengths are not known a priori the collective layer exchanges
//! sizes first. Message order between a fixed `(source, dest, tag)` pair
//! is FIFO, which is what lets the collective layer reuse one tag per
//! call site across super-steps.

pub mod collective;
pub mod distribute;
pub mod sort;

use once_cell::sync::Lazy;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    /// Send handles complete with `None`.
    fn wait(self) -> Option<Vec<u8>>;
}

/// Non-blocking communication interface (minimal by design).
///
/// Implementors provide asynchronous send/receive and waitable handles;
/// everything collective is layered on top in [`collective`].
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;

    /// Post a receive. `buf` is a sizing template: only its length is
    /// consulted, the data comes back from the handle's `wait`.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of this process (0..size-1).
    fn rank(&self) -> usize;
    /// Total number of ranks.
    fn size(&self) -> usize;

    /// Synchronization barrier (default: no-op for backends whose
    /// collectives are already synchronizing).
    fn barrier(&self) {}
}

/// Tag newtype for safer tag arithmetic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CommTag(u16);

impl CommTag {
    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Offset the tag by `dx`, wrapping on overflow. Collectives that
    /// need several phases derive their phase tags this way.
    #[inline]
    pub const fn offset(self, dx: u16) -> Self {
        Self(self.0.wrapping_add(dx))
    }
}

impl From<u16> for CommTag {
    #[inline]
    fn from(x: u16) -> Self {
        CommTag::new(x)
    }
}

/// Compile-time no-op comm for single-rank runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}

    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- ThreadComm: ranks as threads of one process ---

/// Mailbox key: (world, src, dst, tag). The world id keeps concurrently
/// running rank groups (e.g. parallel tests) from reading each other's
/// queues.
type Key = (u64, usize, usize, u16);

#[derive(Default)]
struct Slot {
    q: VecDeque<Vec<u8>>,
}

struct Mailbox {
    map: Mutex<HashMap<Key, Arc<(Mutex<Slot>, Condvar)>>>,
}

static MAILBOX: Lazy<Mailbox> = Lazy::new(|| Mailbox {
    map: Mutex::new(HashMap::new()),
});

static NEXT_WORLD: AtomicU64 = AtomicU64::new(1);

fn mailbox_entry(key: Key) -> Arc<(Mutex<Slot>, Condvar)> {
    let mut g = MAILBOX.map.lock().expect("mailbox poisoned");
    g.entry(key)
        .or_insert_with(|| Arc::new((Mutex::new(Slot::default()), Condvar::new())))
        .clone()
}

pub struct LocalSendHandle;

impl Wait for LocalSendHandle {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

pub struct LocalRecvHandle {
    cell: Arc<(Mutex<Slot>, Condvar)>,
    want_len: usize,
}

impl Wait for LocalRecvHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let (lock, cv) = &*self.cell;
        let mut slot = lock.lock().expect("slot poisoned");
        while slot.q.is_empty() {
            slot = cv.wait(slot).expect("condvar poisoned");
        }
        let mut msg = slot.q.pop_front().expect("queue non-empty");
        msg.truncate(self.want_len.min(msg.len()));
        Some(msg)
    }
}

/// In-process communicator: one instance per rank, all sharing the
/// global mailbox within their world.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    world: u64,
    rank: usize,
    size: usize,
}

impl ThreadComm {
    /// Communicators for all `size` ranks of a fresh world. Hand one to
    /// each thread.
    pub fn split_world(size: usize) -> Vec<ThreadComm> {
        let world = NEXT_WORLD.fetch_add(1, AtomicOrdering::Relaxed);
        (0..size)
            .map(|rank| ThreadComm { world, rank, size })
            .collect()
    }
}

impl Communicator for ThreadComm {
    type SendHandle = LocalSendHandle;
    type RecvHandle = LocalRecvHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let entry = mailbox_entry((self.world, self.rank, peer, tag));
        let (lock, cv) = &*entry;
        {
            let mut slot = lock.lock().expect("slot poisoned");
            slot.q.push_back(buf.to_vec());
        }
        cv.notify_all();
        LocalSendHandle
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalRecvHandle {
            cell: mailbox_entry((self.world, peer, self.rank, tag)),
            want_len: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use core::ptr::NonNull;
    use mpi::collective::CommunicatorCollectives;
    use mpi::environment::Universe;
    use mpi::point_to_point::{Destination, Source};
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    /// One rank of an MPI job. Owns the universe; construct exactly once
    /// per process.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl Default for MpiComm {
        fn default() -> Self {
            let uni = mpi::initialize().expect("MPI initialize");
            let world = uni.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                _universe: uni,
                world,
                rank,
                size,
            }
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
            use mpi::request::StaticScope;
            let boxed = buf.to_vec().into_boxed_slice();
            let raw: *mut [u8] = Box::into_raw(boxed);
            let slice: &[u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, slice, tag as i32);
            MpiSendHandle {
                req: Some(req),
                buf: Some(unsafe { NonNull::new_unchecked(raw) }),
            }
        }

        fn irecv(&self, peer: usize, tag: u16, template: &mut [u8]) -> Self::RecvHandle {
            use mpi::request::StaticScope;
            let len = template.len();
            let boxed = vec![0u8; len].into_boxed_slice();
            let raw: *mut [u8] = Box::into_raw(boxed);
            let slice_mut: &mut [u8] = unsafe { &mut *raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, slice_mut, tag as i32);
            MpiRecvHandle {
                req: Some(req),
                buf: Some(unsafe { NonNull::new_unchecked(raw) }),
                len,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) {
            self.world.barrier();
        }
    }

    pub struct MpiSendHandle {
        req: Option<mpi::request::Request<'static, [u8], mpi::request::StaticScope>>,
        buf: Option<NonNull<[u8]>>,
    }

    impl Wait for MpiSendHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe { drop(Box::from_raw(ptr.as_ptr())) };
            }
            None
        }
    }

    impl Drop for MpiSendHandle {
        fn drop(&mut self) {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe { drop(Box::from_raw(ptr.as_ptr())) };
            }
        }
    }

    pub struct MpiRecvHandle {
        req: Option<mpi::request::Request<'static, [u8], mpi::request::StaticScope>>,
        buf: Option<NonNull<[u8]>>,
        len: usize,
    }

    impl Wait for MpiRecvHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            let ptr = self.buf.take()?;
            let boxed: Box<[u8]> = unsafe { Box::from_raw(ptr.as_ptr()) };
            let mut v = Vec::from(boxed);
            v.truncate(self.len);
            Some(v)
        }
    }

    impl Drop for MpiRecvHandle {
        fn drop(&mut self) {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe { drop(Box::from_raw(ptr.as_ptr())) };
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_round_trip() {
        let comms = ThreadComm::split_world(2);
        let msg = b"hello";
        let _s = comms[0].isend(1, 0x100, msg);
        let h = comms[1].irecv(0, 0x100, &mut [0u8; 5]);
        assert_eq!(h.wait().unwrap(), msg);
    }

    #[test]
    fn thread_fifo_order() {
        let comms = ThreadComm::split_world(2);
        for i in 0..10u8 {
            let _ = comms[0].isend(1, 0x101, &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let h = comms[1].irecv(0, 0x101, &mut [0u8; 1]);
            out.push(h.wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10).collect::<Vec<_>>());
    }

    #[test]
    fn worlds_are_isolated() {
        let a = ThreadComm::split_world(2);
        let b = ThreadComm::split_world(2);
        let _ = a[0].isend(1, 0x102, &[7]);
        let _ = b[0].isend(1, 0x102, &[9]);
        let h = b[1].irecv(0, 0x102, &mut [0u8; 1]);
        assert_eq!(h.wait().unwrap(), vec![9]);
        let h = a[1].irecv(0, 0x102, &mut [0u8; 1]);
        assert_eq!(h.wait().unwrap(), vec![7]);
    }

    #[test]
    fn truncation_to_template_len() {
        let comms = ThreadComm::split_world(2);
        let _ = comms[0].isend(1, 0x103, &[1, 2, 3, 4, 5, 6]);
        let h = comms[1].irecv(0, 0x103, &mut [0u8; 4]);
        assert_eq!(h.wait().unwrap(), vec![1, 2, 3, 4]);
    }
}
