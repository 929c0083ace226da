//! Collects chunk digests in whatever order workers finish and folds them in
//! index order into the multipart digest:
//! `MD5(MD5(chunk_0) || MD5(chunk_1) || ... || MD5(chunk_n-1))`.

use crate::chunk::{finalize, ChunkResult};
use crate::error::VerifyError;
use crate::etag::DIGEST_LEN;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};

pub(crate) enum AggregatorEvent {
    Chunk(ChunkResult),
    Failed(VerifyError),
    /// Sent by the dispatcher once no further jobs will be issued.
    AllSent { dispatched: u32 },
}

/// One aggregation run. The result channel lives and dies with it.
pub(crate) struct Aggregator {
    expected: u32,
    digests: BTreeMap<u32, [u8; DIGEST_LEN]>,
    events: Receiver<AggregatorEvent>,
}

impl Aggregator {
    pub(crate) fn new(expected: u32) -> (Self, Sender<AggregatorEvent>) {
        let (tx, rx) = unbounded();
        (
            Self {
                expected,
                digests: BTreeMap::new(),
                events: rx,
            },
            tx,
        )
    }

    /// Run on a dedicated thread; joining the handle is the completion signal.
    pub(crate) fn spawn(self) -> JoinHandle<Result<[u8; DIGEST_LEN], VerifyError>> {
        thread::spawn(move || self.run())
    }

    pub(crate) fn run(mut self) -> Result<[u8; DIGEST_LEN], VerifyError> {
        let mut dispatched = None;
        while dispatched != Some(self.received()) {
            match self.events.recv() {
                Ok(AggregatorEvent::Chunk(result)) => self.insert(result)?,
                Ok(AggregatorEvent::Failed(e)) => return Err(e),
                Ok(AggregatorEvent::AllSent { dispatched: n }) => dispatched = Some(n),
                Err(_) => break,
            }
        }
        if self.received() != self.expected {
            return Err(VerifyError::Incomplete {
                received: self.received(),
                expected: self.expected,
            });
        }
        Ok(self.fold())
    }

    fn received(&self) -> u32 {
        self.digests.len() as u32
    }

    fn insert(&mut self, result: ChunkResult) -> Result<(), VerifyError> {
        if result.index >= self.expected || self.digests.contains_key(&result.index) {
            return Err(VerifyError::DuplicateChunk(result.index));
        }
        debug!("Aggregated chunk {}", result.index);
        self.digests.insert(result.index, result.digest);
        Ok(())
    }

    /// BTreeMap iteration is ascending by key, i.e. by chunk index.
    fn fold(&self) -> [u8; DIGEST_LEN] {
        let mut hasher = Md5::new();
        for digest in self.digests.values() {
            hasher.update(digest);
        }
        finalize(hasher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, data: &[u8]) -> AggregatorEvent {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&Md5::digest(data));
        AggregatorEvent::Chunk(ChunkResult { index, digest })
    }

    fn reference(parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
        let mut outer = Md5::new();
        for part in parts {
            outer.update(Md5::digest(part));
        }
        finalize(outer)
    }

    #[test]
    fn folds_in_index_order_regardless_of_arrival() {
        let (agg, tx) = Aggregator::new(3);
        tx.send(chunk(2, b"three")).unwrap();
        tx.send(chunk(0, b"one")).unwrap();
        tx.send(AggregatorEvent::AllSent { dispatched: 3 }).unwrap();
        tx.send(chunk(1, b"two")).unwrap();
        let digest = agg.run().unwrap();
        assert_eq!(digest, reference(&[&b"one"[..], &b"two"[..], &b"three"[..]]));
    }

    #[test]
    fn failure_discards_partial_results() {
        let (agg, tx) = Aggregator::new(2);
        tx.send(chunk(0, b"one")).unwrap();
        tx.send(AggregatorEvent::Failed(VerifyError::ShortRead {
            index: 1,
            expected: 10,
            actual: 4,
        }))
        .unwrap();
        assert!(matches!(agg.run(), Err(VerifyError::ShortRead { index: 1, .. })));
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let (agg, tx) = Aggregator::new(2);
        tx.send(chunk(0, b"one")).unwrap();
        tx.send(chunk(0, b"one")).unwrap();
        assert!(matches!(agg.run(), Err(VerifyError::DuplicateChunk(0))));
    }

    #[test]
    fn disconnect_before_all_chunks_is_incomplete() {
        let (agg, tx) = Aggregator::new(2);
        tx.send(chunk(0, b"one")).unwrap();
        drop(tx);
        assert!(matches!(
            agg.run(),
            Err(VerifyError::Incomplete {
                received: 1,
                expected: 2
            })
        ));
    }
}
