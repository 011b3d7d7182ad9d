//! Fixed-length chunk segmentation over the ring buffer.
//!
//! The segmenter owns its own read cursor, independent of the VAD cursor.
//! Each time the write cursor advances at least one chunk length past the
//! last emitted boundary, the next chunk is read out and the cursor advances
//! by exactly that length — chunks are strictly ordered, exact-length,
//! non-overlapping, and none are skipped.

use tracing::debug;

use super::{chunk::AudioChunk, distance, SampleSource};

pub struct ChunkSegmenter {
    last_chunk_pos: usize,
    chunk_len: usize,
    sample_rate: u32,
    channels: u16,
}

impl ChunkSegmenter {
    /// `chunk_len` is the emitted length in interleaved samples; `0`
    /// disables segmentation entirely (no emission, no error).
    pub fn new(chunk_len: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            last_chunk_pos: 0,
            chunk_len,
            sample_rate,
            channels,
        }
    }

    /// Rewind the read cursor for a fresh recording.
    pub fn reset(&mut self) {
        self.last_chunk_pos = 0;
    }

    pub fn last_chunk_pos(&self) -> usize {
        self.last_chunk_pos
    }

    /// Emit every complete chunk between the read cursor and `write_pos`.
    ///
    /// `voice_detected` tags each emitted chunk with the VAD decision in
    /// effect for this tick.
    pub fn poll(
        &mut self,
        write_pos: usize,
        source: &dyn SampleSource,
        voice_detected: bool,
    ) -> Vec<AudioChunk> {
        if self.chunk_len == 0 {
            return Vec::new();
        }
        let cap = source.capacity();
        let mut chunks = Vec::new();
        while distance(self.last_chunk_pos, write_pos, cap) >= self.chunk_len {
            let samples = source.read(self.last_chunk_pos, self.chunk_len);
            self.last_chunk_pos = (self.last_chunk_pos + self.chunk_len) % cap;
            chunks.push(AudioChunk::new(
                samples,
                self.sample_rate,
                self.channels,
                voice_detected,
            ));
        }
        if !chunks.is_empty() {
            debug!(
                emitted = chunks.len(),
                cursor = self.last_chunk_pos,
                "chunks segmented"
            );
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffering::SharedRing;

    #[test]
    fn emits_three_chunks_after_writing_24000_samples() {
        // 10 s at 16 kHz mono, 0.5 s chunks.
        let ring = SharedRing::new(160_000);
        let mut segmenter = ChunkSegmenter::new(8_000, 16_000, 1);

        ring.push(&vec![0.1; 24_000]);
        let chunks = segmenter.poll(ring.write_pos(), &ring, false);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.samples.len() == 8_000));
        assert_eq!(segmenter.last_chunk_pos(), 24_000);

        // No new audio: nothing further comes out.
        assert!(segmenter.poll(ring.write_pos(), &ring, false).is_empty());
    }

    #[test]
    fn chunks_never_overlap_and_cover_written_audio_in_order() {
        let ring = SharedRing::new(64);
        let mut segmenter = ChunkSegmenter::new(16, 16_000, 1);

        // A ramp makes gaps and overlaps visible in the output.
        let ramp: Vec<f32> = (0..48).map(|i| i as f32).collect();
        ring.push(&ramp);

        let chunks = segmenter.poll(ring.write_pos(), &ring, false);
        assert_eq!(chunks.len(), 3);

        let concatenated: Vec<f32> = chunks.into_iter().flat_map(|c| c.samples).collect();
        assert_eq!(concatenated, ramp);
        assert!(concatenated.len() <= 48);
    }

    #[test]
    fn keeps_emitting_across_the_wrap_boundary() {
        let ring = SharedRing::new(40);
        let mut segmenter = ChunkSegmenter::new(16, 16_000, 1);

        ring.push(&(0..32).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(segmenter.poll(ring.write_pos(), &ring, false).len(), 2);

        // Write 24 more: cursor wraps from 32 to 16.
        ring.push(&(32..56).map(|i| i as f32).collect::<Vec<_>>());
        let chunks = segmenter.poll(ring.write_pos(), &ring, true);
        assert_eq!(chunks.len(), 1);
        // The wrap-spanning chunk is concatenated in temporal order.
        let expected: Vec<f32> = (32..48).map(|i| i as f32).collect();
        assert_eq!(chunks[0].samples, expected);
        assert!(chunks[0].voice_detected);
        assert_eq!(segmenter.last_chunk_pos(), 8);
    }

    #[test]
    fn zero_chunk_length_disables_emission() {
        let ring = SharedRing::new(1_000);
        let mut segmenter = ChunkSegmenter::new(0, 16_000, 1);
        ring.push(&vec![0.5; 900]);
        assert!(segmenter.poll(ring.write_pos(), &ring, false).is_empty());
    }
}
