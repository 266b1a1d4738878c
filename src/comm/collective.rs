//! Collective operations layered on the point-to-point substrate.
//!
//! Every rank of the communicator must call each collective in the same
//! order — the engine is bulk-synchronous, so this falls out of the
//! super-step structure. Collectives that need more than one message
//! phase derive phase tags with [`CommTag::offset`]; callers reserve a
//! small tag range per call site (FIFO ordering per `(src, dst, tag)`
//! makes reuse across iterations safe).
//!
//! Scan and shift identities are expressed as `Option`: rank 0 of a
//! prefix scan (and the last rank of a suffix scan) receives `None`
//! rather than an unspecified value that callers would have to guard by
//! rank check.
//!
//! Scan reducers are called as `f(acc, next)` where `next` is the
//! contribution from the rank nearer the receiving rank; commutative
//! reducers can ignore the distinction.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

use crate::comm::{CommTag, Communicator, Wait};
use crate::error::LogccError;

fn recv_value<T: Pod, C: Communicator>(
    comm: &C,
    peer: usize,
    tag: CommTag,
    phase: &'static str,
) -> Result<T, LogccError> {
    let h = comm.irecv(peer, tag.get(), &mut vec![0u8; size_of::<T>()]);
    let data = h.wait().ok_or(LogccError::Recv { peer, phase })?;
    if data.len() != size_of::<T>() {
        return Err(LogccError::Recv { peer, phase });
    }
    Ok(bytemuck::pod_read_unaligned(&data))
}

fn recv_slice<T: Pod, C: Communicator>(
    comm: &C,
    peer: usize,
    tag: CommTag,
    count: usize,
    phase: &'static str,
) -> Result<Vec<T>, LogccError> {
    let h = comm.irecv(peer, tag.get(), &mut vec![0u8; count * size_of::<T>()]);
    let data = h.wait().ok_or(LogccError::Recv { peer, phase })?;
    if data.len() != count * size_of::<T>() {
        return Err(LogccError::Recv { peer, phase });
    }
    let mut out = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&data);
    Ok(out)
}

/// Exclusive prefix scan: returns the reduction of the contributions of
/// all strictly lower ranks, or `None` on rank 0.
pub fn exscan<T, C, F>(comm: &C, tag: CommTag, x: T, f: F) -> Result<Option<T>, LogccError>
where
    T: Pod,
    C: Communicator,
    F: Fn(&T, &T) -> T,
{
    let r = comm.rank();
    let p = comm.size();
    let prev = if r > 0 {
        Some(recv_value::<T, C>(comm, r - 1, tag, "exscan")?)
    } else {
        None
    };
    if r + 1 < p {
        let fwd = match &prev {
            Some(acc) => f(acc, &x),
            None => x,
        };
        comm.isend(r + 1, tag.get(), bytemuck::bytes_of(&fwd)).wait();
    }
    Ok(prev)
}

/// Exclusive suffix scan: returns the reduction of the contributions of
/// all strictly higher ranks, or `None` on the last rank.
pub fn rev_exscan<T, C, F>(comm: &C, tag: CommTag, x: T, f: F) -> Result<Option<T>, LogccError>
where
    T: Pod,
    C: Communicator,
    F: Fn(&T, &T) -> T,
{
    let r = comm.rank();
    let p = comm.size();
    let next = if r + 1 < p {
        Some(recv_value::<T, C>(comm, r + 1, tag, "rev_exscan")?)
    } else {
        None
    };
    if r > 0 {
        let fwd = match &next {
            Some(acc) => f(acc, &x),
            None => x,
        };
        comm.isend(r - 1, tag.get(), bytemuck::bytes_of(&fwd)).wait();
    }
    Ok(next)
}

/// Each rank receives the value contributed by `rank - 1`; rank 0
/// receives `None`.
pub fn right_shift<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    x: T,
) -> Result<Option<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    if r + 1 < p {
        comm.isend(r + 1, tag.get(), bytemuck::bytes_of(&x)).wait();
    }
    if r > 0 {
        Ok(Some(recv_value::<T, C>(comm, r - 1, tag, "right_shift")?))
    } else {
        Ok(None)
    }
}

/// Each rank receives the value contributed by `rank + 1`; the last rank
/// receives `None`.
pub fn left_shift<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    x: T,
) -> Result<Option<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    if r > 0 {
        comm.isend(r - 1, tag.get(), bytemuck::bytes_of(&x)).wait();
    }
    if r + 1 < p {
        Ok(Some(recv_value::<T, C>(comm, r + 1, tag, "left_shift")?))
    } else {
        Ok(None)
    }
}

/// Every rank receives every rank's contribution, indexed by rank.
pub fn allgather<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    x: T,
) -> Result<Vec<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    let mut out = vec![T::zeroed(); p];
    out[r] = x;
    let handles: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| (j, comm.irecv(j, tag.get(), &mut vec![0u8; size_of::<T>()])))
        .collect();
    let sends: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| comm.isend(j, tag.get(), bytemuck::bytes_of(&x)))
        .collect();
    for (j, h) in handles {
        let data = h.wait().ok_or(LogccError::Recv {
            peer: j,
            phase: "allgather",
        })?;
        out[j] = bytemuck::pod_read_unaligned(&data);
    }
    for s in sends {
        s.wait();
    }
    Ok(out)
}

/// Variable-length allgather: concatenation of every rank's buffer in
/// rank order. Uses `tag` for sizes and `tag + 1` for payloads.
pub fn allgatherv<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    v: &[T],
) -> Result<Vec<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    if p == 1 {
        return Ok(v.to_vec());
    }
    let counts = allgather(comm, tag, v.len() as u64)?;
    let data_tag = tag.offset(1);
    let sends: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| comm.isend(j, data_tag.get(), bytemuck::cast_slice(v)))
        .collect();
    let mut out = Vec::with_capacity(counts.iter().sum::<u64>() as usize);
    for j in 0..p {
        if j == r {
            out.extend_from_slice(v);
        } else {
            out.extend(recv_slice::<T, C>(
                comm,
                j,
                data_tag,
                counts[j] as usize,
                "allgatherv",
            )?);
        }
    }
    for s in sends {
        s.wait();
    }
    Ok(out)
}

/// Personalized all-to-all: `data` split by `counts` (one slice per
/// destination rank, in rank order); returns the concatenation of what
/// every rank sent here, in source-rank order. Uses `tag` for counts and
/// `tag + 1` for payloads.
pub fn all2allv<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    data: &[T],
    counts: &[usize],
) -> Result<Vec<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    debug_assert_eq!(counts.len(), p);
    debug_assert_eq!(counts.iter().sum::<usize>(), data.len());
    if p == 1 {
        return Ok(data.to_vec());
    }

    let mut offsets = Vec::with_capacity(p + 1);
    offsets.push(0usize);
    for &c in counts {
        offsets.push(offsets.last().unwrap() + c);
    }

    // phase 1: counts
    let count_handles: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| (j, comm.irecv(j, tag.get(), &mut vec![0u8; 8])))
        .collect();
    let count_sends: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| comm.isend(j, tag.get(), &(counts[j] as u64).to_le_bytes()))
        .collect();
    let mut recv_counts = vec![0usize; p];
    recv_counts[r] = counts[r];
    for (j, h) in count_handles {
        let bytes = h.wait().ok_or(LogccError::Recv {
            peer: j,
            phase: "all2allv",
        })?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        recv_counts[j] = u64::from_le_bytes(raw) as usize;
    }
    for s in count_sends {
        s.wait();
    }

    // phase 2: payloads
    let data_tag = tag.offset(1);
    let data_sends: Vec<_> = (0..p)
        .filter(|&j| j != r)
        .map(|j| {
            let slice = &data[offsets[j]..offsets[j + 1]];
            comm.isend(j, data_tag.get(), bytemuck::cast_slice(slice))
        })
        .collect();
    let mut out = Vec::with_capacity(recv_counts.iter().sum());
    for j in 0..p {
        if j == r {
            out.extend_from_slice(&data[offsets[r]..offsets[r + 1]]);
        } else {
            out.extend(recv_slice::<T, C>(
                comm,
                j,
                data_tag,
                recv_counts[j],
                "all2allv",
            )?);
        }
    }
    for s in data_sends {
        s.wait();
    }
    Ok(out)
}

/// Gather every rank's buffer on rank 0 (rank order, rank 0 first);
/// other ranks return an empty vector. Uses `tag` and `tag + 1`.
pub fn gather_to_root<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    v: &[T],
) -> Result<Vec<T>, LogccError> {
    let r = comm.rank();
    let p = comm.size();
    if p == 1 {
        return Ok(v.to_vec());
    }
    let data_tag = tag.offset(1);
    if r == 0 {
        let mut out = v.to_vec();
        for j in 1..p {
            let count = recv_value::<u64, C>(comm, j, tag, "gather_to_root")? as usize;
            out.extend(recv_slice::<T, C>(comm, j, data_tag, count, "gather_to_root")?);
        }
        Ok(out)
    } else {
        comm.isend(0, tag.get(), &(v.len() as u64).to_le_bytes())
            .wait();
        comm.isend(0, data_tag.get(), bytemuck::cast_slice(v)).wait();
        Ok(Vec::new())
    }
}

/// Global conjunction: true iff every rank contributed true.
pub fn test_all<C: Communicator>(comm: &C, tag: CommTag, local: bool) -> Result<bool, LogccError> {
    let flags = allgather(comm, tag, local as u8)?;
    Ok(flags.iter().all(|&f| f != 0))
}

/// A contiguous subgroup view over a parent communicator.
///
/// Messages are relayed through the parent with translated rank indices;
/// since the member sets of different colors are disjoint, subgroups can
/// share the parent's tag space without cross-talk.
pub struct SubComm<'a, C: Communicator> {
    parent: &'a C,
    members: Vec<usize>,
    rank: usize,
}

impl<'a, C: Communicator> SubComm<'a, C> {
    /// Parent rank of a subgroup member.
    pub fn member(&self, sub_rank: usize) -> usize {
        self.members[sub_rank]
    }
}

impl<'a, C: Communicator> Communicator for SubComm<'a, C> {
    type SendHandle = C::SendHandle;
    type RecvHandle = C::RecvHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.parent.isend(self.members[peer], tag, buf)
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        self.parent.irecv(self.members[peer], tag, buf)
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.members.len()
    }
}

/// Form the subgroup of ranks that pass `member`. Collective over the
/// parent; returns `None` on ranks outside the subgroup. The returned
/// view is only valid for the current iteration's traffic.
pub fn split<C: Communicator>(
    comm: &C,
    tag: CommTag,
    member: bool,
) -> Result<Option<SubComm<'_, C>>, LogccError> {
    let flags = allgather(comm, tag, member as u8)?;
    if !member {
        return Ok(None);
    }
    let members: Vec<usize> = flags
        .iter()
        .enumerate()
        .filter(|(_, &f)| f != 0)
        .map(|(j, _)| j)
        .collect();
    let rank = members
        .iter()
        .position(|&j| j == comm.rank())
        .expect("member rank missing from its own subgroup");
    Ok(Some(SubComm {
        parent: comm,
        members,
        rank,
    }))
}
