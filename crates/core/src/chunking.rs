#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1_200,
            overlap_chars: 120,
            min_chars: 80,
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits extracted text into ordered chunks: paragraphs (blank-line
/// separated) are normalized and merged greedily up to `max_chars`,
/// then any oversized chunk is windowed with `overlap_chars` of
/// carry-over so no span of text is lost at a boundary.
pub fn split_into_chunks(text: &str, config: ChunkingConfig) -> Vec<String> {
    let paragraphs = text
        .split("\n\n")
        .map(normalize_whitespace)
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>();

    let mut merged = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if current.is_empty() {
            current = paragraph;
            continue;
        }

        if current.len() + paragraph.len() + 1 <= config.max_chars {
            current.push(' ');
            current.push_str(&paragraph);
        } else {
            merged.push(std::mem::replace(&mut current, paragraph));
        }
    }
    if !current.is_empty() {
        merged.push(current);
    }

    let mut chunks = Vec::new();
    for piece in merged {
        if piece.len() <= config.max_chars {
            if piece.len() >= config.min_chars || chunks.is_empty() {
                chunks.push(piece);
            }
            continue;
        }

        let characters: Vec<char> = piece.chars().collect();
        let step = config
            .max_chars
            .saturating_sub(config.overlap_chars)
            .max(1);
        let mut start = 0;
        while start < characters.len() {
            let end = (start + config.max_chars).min(characters.len());
            chunks.push(characters[start..end].iter().collect());
            if end == characters.len() {
                break;
            }
            start += step;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{normalize_whitespace, split_into_chunks, ChunkingConfig};

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof \u{a0} spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }

    #[test]
    fn paragraphs_merge_up_to_the_limit() {
        let config = ChunkingConfig {
            max_chars: 40,
            overlap_chars: 5,
            min_chars: 1,
        };
        let text = "one short paragraph\n\nanother one\n\na third paragraph that stands alone";
        let chunks = split_into_chunks(text, config);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "one short paragraph another one");
        assert_eq!(chunks[1], "a third paragraph that stands alone");
    }

    #[test]
    fn oversized_chunks_are_windowed_with_overlap() {
        let config = ChunkingConfig {
            max_chars: 10,
            overlap_chars: 3,
            min_chars: 1,
        };
        let chunks = split_into_chunks("abcdefghijklmnop", config);

        assert_eq!(chunks[0], "abcdefghij");
        assert!(chunks[1].starts_with("hij"));
        assert_eq!(
            chunks.concat().chars().filter(|c| *c == 'p').count(),
            1,
            "last character must survive windowing"
        );
    }

    #[test]
    fn tiny_text_still_yields_one_chunk() {
        let chunks = split_into_chunks("short note", ChunkingConfig::default());
        assert_eq!(chunks, vec!["short note".to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_into_chunks("  \n\n \t ", ChunkingConfig::default()).is_empty());
    }
}
