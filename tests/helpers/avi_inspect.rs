//! Minimal RIFF walker for inspecting exported AVI containers.
//!
//! Only understands what the tests need: locating the movi list and
//! splitting it into stream chunks. Headers and the idx1 index are
//! covered by the muxer's own unit tests.

/// One chunk from the movi list.
pub struct MoviChunk {
    pub fourcc: [u8; 4],
    pub payload: Vec<u8>,
}

impl MoviChunk {
    pub fn is_video(&self) -> bool {
        &self.fourcc == b"00dc"
    }

    pub fn is_audio(&self) -> bool {
        &self.fourcc == b"01wb"
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

/// All stream chunks inside the container's movi list, in file order.
pub fn movi_chunks(bytes: &[u8]) -> Vec<MoviChunk> {
    assert_eq!(&bytes[0..4], b"RIFF", "not a RIFF file");
    assert_eq!(&bytes[8..12], b"AVI ", "not an AVI container");

    let mut at = 12;
    while at + 12 <= bytes.len() {
        let fourcc = &bytes[at..at + 4];
        let size = read_u32(bytes, at + 4) as usize;
        if fourcc == b"LIST" && &bytes[at + 8..at + 12] == b"movi" {
            return parse_movi(&bytes[at + 12..at + 8 + size]);
        }
        at += 8 + size + (size & 1);
    }
    panic!("container has no movi list");
}

fn parse_movi(data: &[u8]) -> Vec<MoviChunk> {
    let mut chunks = Vec::new();
    let mut at = 0;
    while at + 8 <= data.len() {
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&data[at..at + 4]);
        let size = read_u32(data, at + 4) as usize;
        chunks.push(MoviChunk {
            fourcc,
            payload: data[at + 8..at + 8 + size].to_vec(),
        });
        at += 8 + size + (size & 1);
    }
    chunks
}

/// JPEG payloads of the video chunks, in presentation order.
pub fn video_payloads(bytes: &[u8]) -> Vec<Vec<u8>> {
    movi_chunks(bytes)
        .into_iter()
        .filter(|chunk| chunk.is_video())
        .map(|chunk| chunk.payload)
        .collect()
}

/// Total PCM byte count across all audio chunks.
pub fn audio_payload_bytes(bytes: &[u8]) -> usize {
    movi_chunks(bytes)
        .iter()
        .filter(|chunk| chunk.is_audio())
        .map(|chunk| chunk.payload.len())
        .sum()
}
