pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;

/// Text to fixed-length vector. Must be deterministic for identical
/// input so re-embedding a query matches previously indexed chunks.
pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Local hashed-trigram embedder: character trigrams of the lowercased
/// text are FNV-hashed into a fixed number of buckets and the counts
/// L2-normalized. Not a semantic model, but deterministic, offline,
/// and good enough to make nearest-neighbor behavior testable.
#[derive(Debug, Clone, Copy)]
pub struct HashedTrigramEmbedder {
    dimensions: usize,
}

impl HashedTrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashedTrigramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for HashedTrigramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let characters: Vec<char> = text.to_lowercase().chars().collect();

        for window in characters.windows(3) {
            let bucket = (fnv1a(window) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(window: &[char]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for character in window {
        let mut buffer = [0u8; 4];
        for byte in character.encode_utf8(&mut buffer).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashedTrigramEmbedder};

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashedTrigramEmbedder::default();
        assert_eq!(
            embedder.embed("quarterly invoice totals"),
            embedder.embed("quarterly invoice totals")
        );
    }

    #[test]
    fn embedding_has_fixed_length_and_unit_norm() {
        let embedder = HashedTrigramEmbedder::new(64);
        let vector = embedder.embed("some document text");

        assert_eq!(vector.len(), 64);
        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashedTrigramEmbedder::new(16);
        assert!(embedder.embed("").iter().all(|v| *v == 0.0));
    }
}
