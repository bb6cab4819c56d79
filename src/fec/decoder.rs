use crate::error::{FountainError, Result};
use crate::fec::codec::Codec;
use crate::fec::encoder::EncodedBlock;
use crate::fec::matrix::DecodeMatrix;
use crate::fec::symbol::Symbol;
use crate::telemetry;
use crossbeam_queue::SegQueue;
use log::{debug, warn};
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeState {
    Collecting,
    Determined,
    Decoded,
}

/// Single-use decoding session for one message.
///
/// Blocks from any producer are accepted alike; nothing here can tell two
/// messages of the same size and codec apart.
#[derive(Debug)]
pub struct Decoder {
    codec: Arc<Codec>,
    message_size: usize,
    symbol_size: usize,
    matrix: DecodeMatrix,
    state: DecodeState,
    seen: usize,
    accepted: usize,
    decoded: Option<Vec<u8>>,
}

impl Decoder {
    pub fn new(codec: Arc<Codec>, message_size: usize) -> Result<Self> {
        if message_size == 0 {
            return Err(FountainError::config("message_size must be at least 1"));
        }
        let symbol_size = codec.symbol_size(message_size);
        let mut matrix = DecodeMatrix::new(codec.intermediate_symbols());
        for row in codec.constraints() {
            matrix.add_row(row, Symbol::zero(symbol_size));
        }
        Ok(Self {
            codec,
            message_size,
            symbol_size,
            matrix,
            state: DecodeState::Collecting,
            seen: 0,
            accepted: 0,
            decoded: None,
        })
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn is_determined(&self) -> bool {
        self.state != DecodeState::Collecting
    }

    /// Independent rows held, precode constraints included.
    pub fn rank(&self) -> usize {
        self.matrix.rank()
    }

    /// Rank at which the system is determined.
    pub fn required(&self) -> usize {
        self.matrix.columns()
    }

    pub fn accepted_blocks(&self) -> usize {
        self.accepted
    }

    pub fn dependent_blocks(&self) -> usize {
        self.matrix.dependent_rows()
    }

    pub fn conflicting_blocks(&self) -> usize {
        self.matrix.conflicting_rows()
    }

    pub fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Feeds blocks in order and returns `true` as soon as the system is
    /// determined; blocks after that point are not read.
    pub fn add_blocks(&mut self, blocks: &[EncodedBlock]) -> Result<bool> {
        for block in blocks {
            if self.add_block(block)? {
                return Ok(true);
            }
        }
        Ok(self.is_determined())
    }

    /// Returns whether the system is determined after this block.
    ///
    /// A payload of the wrong size is an error while collecting and is
    /// skipped once the system is determined.
    pub fn add_block(&mut self, block: &EncodedBlock) -> Result<bool> {
        if self.state == DecodeState::Decoded {
            return Ok(true);
        }
        if block.payload.len() != self.symbol_size {
            if self.state == DecodeState::Determined {
                warn!(
                    "ignoring block {} of {} bytes, system already determined",
                    block.id,
                    block.payload.len()
                );
                return Ok(true);
            }
            return Err(FountainError::PayloadSize {
                expected: self.symbol_size,
                got: block.payload.len(),
            });
        }

        self.seen += 1;
        let neighbors = self.codec.select(block.id);
        let conflicts = self.matrix.conflicting_rows();
        if self
            .matrix
            .add_row(&neighbors, Symbol::from_bytes(block.payload.clone()))
        {
            self.accepted += 1;
            telemetry::ROWS_ACCEPTED.inc();
        } else {
            telemetry::ROWS_DEPENDENT.inc();
            if self.matrix.conflicting_rows() > conflicts {
                telemetry::ROWS_CONFLICTING.inc();
            }
        }

        if self.state == DecodeState::Collecting && self.matrix.determined() {
            self.state = DecodeState::Determined;
            debug!(
                "determined after {} blocks ({} accepted, rank {})",
                self.seen,
                self.accepted,
                self.matrix.rank()
            );
        }
        Ok(self.is_determined())
    }

    /// Reassembles the message. Repeated calls return the same bytes.
    pub fn decode(&mut self) -> Result<Vec<u8>> {
        if let Some(bytes) = &self.decoded {
            return Ok(bytes.clone());
        }
        let solution = self.matrix.solution()?;
        let mut out: Vec<u8> = solution
            .into_iter()
            .take(self.codec.source_symbols())
            .flat_map(Symbol::into_bytes)
            .collect();
        out.truncate(self.message_size);
        self.state = DecodeState::Decoded;
        self.decoded = Some(out.clone());
        telemetry::DECODES.inc();
        Ok(out)
    }
}

/// Lock-free submission from many producers into one decoder.
///
/// Producers push onto a queue; whoever calls `drain` takes the decoder lock
/// and reduces everything queued so far.
#[derive(Debug)]
pub struct SharedDecoder {
    queue: SegQueue<EncodedBlock>,
    decoder: Mutex<Decoder>,
}

impl SharedDecoder {
    pub fn new(decoder: Decoder) -> Self {
        Self {
            queue: SegQueue::new(),
            decoder: Mutex::new(decoder),
        }
    }

    pub fn submit(&self, block: EncodedBlock) {
        self.queue.push(block);
    }

    pub fn submit_all<I: IntoIterator<Item = EncodedBlock>>(&self, blocks: I) {
        for block in blocks {
            self.queue.push(block);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Reduces every queued block. Once determined, further rows can only be
    /// dependent, so draining past that point does not change the solution.
    pub fn drain(&self) -> Result<bool> {
        let mut decoder = self.decoder.lock().map_err(|_| FountainError::LockPoisoned)?;
        while let Some(block) = self.queue.pop() {
            decoder.add_block(&block)?;
        }
        Ok(decoder.is_determined())
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        self.drain()?;
        let mut decoder = self.decoder.lock().map_err(|_| FountainError::LockPoisoned)?;
        decoder.decode()
    }

    pub fn into_inner(self) -> Result<Decoder> {
        self.drain()?;
        self.decoder
            .into_inner()
            .map_err(|_| FountainError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::codec::Redundancy;
    use crate::fec::encoder::encode_blocks;

    const MESSAGE: &[u8] = b"a fountain of blocks, any enough of which rebuild the message";

    fn session(codec: Codec) -> (Arc<Codec>, Decoder) {
        let codec = Arc::new(codec);
        let dec = Decoder::new(codec.clone(), MESSAGE.len()).unwrap();
        (codec, dec)
    }

    #[test]
    fn raptor_roundtrip() {
        let (codec, mut dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        assert_eq!(dec.rank(), 4);
        assert_eq!(dec.required(), 11);
        let ids: Vec<u64> = (0..60).collect();
        let blocks = encode_blocks(MESSAGE, &ids, &codec).unwrap();
        assert!(dec.add_blocks(&blocks).unwrap());
        assert_eq!(dec.state(), DecodeState::Determined);
        assert_eq!(dec.decode().unwrap(), MESSAGE);
        assert_eq!(dec.state(), DecodeState::Decoded);
    }

    #[test]
    fn lt_roundtrip() {
        let (codec, mut dec) = session(Codec::lt(6, Redundancy::new(2)).unwrap());
        let ids: Vec<u64> = (100..160).collect();
        let blocks = encode_blocks(MESSAGE, &ids, &codec).unwrap();
        assert!(dec.add_blocks(&blocks).unwrap());
        assert_eq!(dec.decode().unwrap(), MESSAGE);
    }

    #[test]
    fn decode_too_early_fails() {
        let (codec, mut dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let blocks = encode_blocks(MESSAGE, &[1, 2], &codec).unwrap();
        assert!(!dec.add_blocks(&blocks).unwrap());
        assert_eq!(dec.state(), DecodeState::Collecting);
        assert!(matches!(
            dec.decode(),
            Err(FountainError::NotDetermined { required: 11, .. })
        ));
    }

    #[test]
    fn wrong_payload_size_is_rejected() {
        let (_, mut dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let bad = EncodedBlock::new(1, vec![0; dec.symbol_size() + 1]);
        match dec.add_block(&bad) {
            Err(FountainError::PayloadSize { expected, got }) => {
                assert_eq!(expected, 9);
                assert_eq!(got, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(dec.accepted_blocks(), 0);
    }

    #[test]
    fn determined_session_skips_wrong_size_blocks() {
        let (codec, mut dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let ids: Vec<u64> = (0..60).collect();
        assert!(dec.add_blocks(&encode_blocks(MESSAGE, &ids, &codec).unwrap()).unwrap());
        let (accepted, dependent) = (dec.accepted_blocks(), dec.dependent_blocks());
        let bad = EncodedBlock::new(3, vec![0; dec.symbol_size() + 1]);
        assert!(dec.add_block(&bad).unwrap());
        assert_eq!(dec.state(), DecodeState::Determined);
        assert_eq!((dec.accepted_blocks(), dec.dependent_blocks()), (accepted, dependent));
        assert_eq!(dec.decode().unwrap(), MESSAGE);
    }

    #[test]
    fn zero_message_size_is_rejected() {
        let codec = Arc::new(Codec::new(3, Redundancy::DEFAULT).unwrap());
        assert!(matches!(
            Decoder::new(codec, 0),
            Err(FountainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn duplicate_blocks_are_dependent() {
        let (codec, mut dec) = session(Codec::lt(6, Redundancy::new(2)).unwrap());
        let blocks = encode_blocks(MESSAGE, &[5, 5, 5], &codec).unwrap();
        dec.add_blocks(&blocks).unwrap();
        assert_eq!(dec.accepted_blocks(), 1);
        assert_eq!(dec.dependent_blocks(), 2);
        assert_eq!(dec.conflicting_blocks(), 0);
    }

    #[test]
    fn decoded_session_ignores_further_blocks() {
        let (codec, mut dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let ids: Vec<u64> = (0..60).collect();
        let blocks = encode_blocks(MESSAGE, &ids, &codec).unwrap();
        dec.add_blocks(&blocks).unwrap();
        let first = dec.decode().unwrap();
        let accepted = dec.accepted_blocks();
        assert!(dec.add_block(&EncodedBlock::new(7, vec![1; 3])).unwrap());
        assert_eq!(dec.accepted_blocks(), accepted);
        assert_eq!(dec.decode().unwrap(), first);
    }

    #[test]
    fn shared_decoder_drains_queue() {
        let (codec, dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let shared = SharedDecoder::new(dec);
        let ids: Vec<u64> = (0..60).collect();
        shared.submit_all(encode_blocks(MESSAGE, &ids, &codec).unwrap());
        assert_eq!(shared.pending(), 60);
        assert!(shared.drain().unwrap());
        assert_eq!(shared.pending(), 0);
        assert_eq!(shared.decode().unwrap(), MESSAGE);
        let inner = shared.into_inner().unwrap();
        assert_eq!(inner.state(), DecodeState::Decoded);
    }

    #[test]
    fn shared_decoder_survives_a_late_bad_block() {
        let (codec, dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let shared = SharedDecoder::new(dec);
        let ids: Vec<u64> = (0..60).collect();
        shared.submit_all(encode_blocks(MESSAGE, &ids, &codec).unwrap());
        shared.submit(EncodedBlock::new(61, vec![0xff; 2]));
        assert_eq!(shared.decode().unwrap(), MESSAGE);
        assert_eq!(shared.pending(), 0);
    }

    #[test]
    fn shared_decoder_reports_an_early_bad_block() {
        let (codec, dec) = session(Codec::new(7, Redundancy::new(4)).unwrap());
        let shared = SharedDecoder::new(dec);
        shared.submit(EncodedBlock::new(61, vec![0xff; 2]));
        let ids: Vec<u64> = (0..60).collect();
        shared.submit_all(encode_blocks(MESSAGE, &ids, &codec).unwrap());
        assert!(matches!(
            shared.drain(),
            Err(FountainError::PayloadSize { got: 2, .. })
        ));
        // The offending block is gone; the rest is still queued.
        assert_eq!(shared.pending(), 60);
        assert!(shared.drain().unwrap());
        assert_eq!(shared.decode().unwrap(), MESSAGE);
    }
}
