//! PalmDoc LZ77 compression.
//!
//! ```text
//! 0x00        literal byte
//! 0x01..0x08  copy the next N bytes verbatim
//! 0x09..0x7F  literal byte
//! 0x80..0xBF  2-byte back-reference: 11-bit distance, 3-bit length - 3
//! 0xC0..0xFF  space followed by (byte ^ 0x80)
//! ```
//!
//! Back-references with a distance of 0, or one that reaches before the start
//! of the output, are skipped without emitting anything. Legacy encoders
//! produce them and rejecting the record would lose the rest of the text.

use std::collections::HashMap;

/// Largest distance a back-reference can encode.
pub const MAX_DISTANCE: usize = 2047;

/// Longest and shortest match lengths a back-reference can encode.
const MAX_MATCH: usize = 10;
const MIN_MATCH: usize = 3;

/// Decompress a PalmDoc LZ77 stream.
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        i += 1;

        match c {
            0x01..=0x08 => {
                let end = (i + c as usize).min(input.len());
                out.extend_from_slice(&input[i..end]);
                i += c as usize;
            }
            0x00 | 0x09..=0x7F => out.push(c),
            0xC0..=0xFF => {
                out.push(b' ');
                out.push(c ^ 0x80);
            }
            0x80..=0xBF => {
                let Some(&next) = input.get(i) else {
                    break;
                };
                i += 1;
                let pair = (u16::from(c) << 8) | u16::from(next);
                let length = (pair & 0x0007) as usize + MIN_MATCH;
                let distance = ((pair >> 3) & 0x07FF) as usize;
                if distance == 0 || distance > out.len() {
                    continue;
                }
                // Byte-by-byte so overlapping runs repeat the pattern.
                for _ in 0..length {
                    out.push(out[out.len() - distance]);
                }
            }
        }
    }

    out
}

/// Compress bytes into a PalmDoc LZ77 stream.
///
/// Greedy: at each position the longest back-reference (3 to 10 bytes, the
/// nearest one on ties) within [`MAX_DISTANCE`] wins; otherwise a space followed by a byte in
/// `0x40..=0x7F` is folded into one byte, plain bytes are emitted as-is and
/// runs of bytes that collide with the control ranges are packed into literal
/// runs of up to 8. `decode(&encode(b)) == b` for every input.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut window = MatchWindow::default();
    let mut i = 0;

    while i < input.len() {
        window.advance(input, i);
        if i > MAX_MATCH && input.len() - i > MAX_MATCH {
            if let Some((distance, length)) = window.longest_match(input, i) {
                let pair = (distance << 3) as u16 + (length - MIN_MATCH) as u16;
                out.push(0x80 | (pair >> 8) as u8);
                out.push((pair & 0xFF) as u8);
                i += length;
                continue;
            }
        }

        let c = input[i];
        i += 1;

        if c == b' ' {
            if let Some(&next) = input.get(i) {
                if (0x40..=0x7F).contains(&next) {
                    out.push(next ^ 0x80);
                    i += 1;
                    continue;
                }
            }
        }

        if is_plain(c) {
            out.push(c);
            continue;
        }

        let start = i - 1;
        let mut end = i;
        while end < input.len() && end - start < 8 && !is_plain(input[end]) {
            end += 1;
        }
        out.push((end - start) as u8);
        out.extend_from_slice(&input[start..end]);
        i = end;
    }

    out
}

/// Bytes that decode as themselves when emitted alone.
fn is_plain(b: u8) -> bool {
    b == 0 || (0x09..0x80).contains(&b)
}

/// Positions of every 3-byte prefix seen so far, most recent last.
#[derive(Default)]
struct MatchWindow {
    chains: HashMap<[u8; 3], Vec<usize>>,
    indexed: usize,
}

impl MatchWindow {
    /// Index every position before `pos`.
    fn advance(&mut self, data: &[u8], pos: usize) {
        while self.indexed < pos {
            if let Some(key) = prefix(data, self.indexed) {
                self.chains.entry(key).or_default().push(self.indexed);
            }
            self.indexed += 1;
        }
    }

    /// Longest earlier match for the bytes at `pos` as `(distance, length)`.
    /// Among equally long matches the nearest wins. Sources never overlap `pos`.
    fn longest_match(&self, data: &[u8], pos: usize) -> Option<(usize, usize)> {
        let key = prefix(data, pos)?;
        let chain = self.chains.get(&key)?;
        let mut best: Option<(usize, usize)> = None;

        for &start in chain.iter().rev() {
            let distance = pos - start;
            if distance > MAX_DISTANCE {
                break;
            }
            let limit = MAX_MATCH.min(distance).min(data.len() - pos);
            let length = data[start..start + limit]
                .iter()
                .zip(&data[pos..pos + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if length >= MIN_MATCH && best.map_or(true, |(_, l)| length > l) {
                best = Some((distance, length));
                if length == MAX_MATCH {
                    break;
                }
            }
        }
        best
    }
}

fn prefix(data: &[u8], pos: usize) -> Option<[u8; 3]> {
    data.get(pos..pos + MIN_MATCH)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literals_and_runs() {
        assert_eq!(decode(b"abc"), b"abc");
        assert_eq!(decode(&[0x02, 0xE4, 0x01, b'x']), vec![0xE4, 0x01, b'x']);
        assert_eq!(decode(&[0x00, 0x09]), vec![0x00, 0x09]);
    }

    #[test]
    fn test_decode_space_fold() {
        // 0xE1 = ' ' + ('a' ^ 0x80 ^ 0x80)
        assert_eq!(decode(&[b'x', 0xE1]), b"x a");
    }

    #[test]
    fn test_decode_overlapping_backreference() {
        // "ab" then copy distance 2, length 6 -> "abababab"
        let pair: u16 = (2 << 3) | (6 - 3);
        let input = [b'a', b'b', 0x80 | (pair >> 8) as u8, (pair & 0xFF) as u8];
        assert_eq!(decode(&input), b"abababab");
    }

    #[test]
    fn test_decode_skips_invalid_distance() {
        let far: u16 = (100 << 3) | 1;
        let zero: u16 = 0;
        let input = [
            b'a',
            0x80 | (far >> 8) as u8,
            (far & 0xFF) as u8,
            0x80 | (zero >> 8) as u8,
            (zero & 0xFF) as u8,
            b'b',
        ];
        assert_eq!(decode(&input), b"ab");
    }

    #[test]
    fn test_decode_truncated_descriptor() {
        assert_eq!(decode(&[b'a', 0x80]), b"a");
        assert_eq!(decode(&[0x05, b'a']), b"a");
    }

    #[test]
    fn test_roundtrip_markup() {
        let text = b"<html><head><guide></guide></head><body><p>The quick brown fox \
jumps over the lazy dog. The quick brown fox jumps over the lazy dog.</p></body></html>";
        let encoded = encode(text);
        assert!(encoded.len() < text.len());
        assert_eq!(decode(&encoded), text.to_vec());
    }

    #[test]
    fn test_roundtrip_multibyte_utf8() {
        let text = "Sanskrit: काचं शक्नोम्यत्तुम् । नोपहिनस्ति माम् ॥ Japanische Märchen \u{2014} 日本の昔話";
        let encoded = encode(text.as_bytes());
        assert_eq!(String::from_utf8(decode(&encoded)).unwrap(), text);
    }

    #[test]
    fn test_roundtrip_control_bytes() {
        let data: Vec<u8> = (0u8..=255).chain(0u8..=255).collect();
        assert_eq!(decode(&encode(&data)), data);
    }

    #[test]
    fn test_roundtrip_space_before_control() {
        let data = b" \x01 \xff  @ \x7f end";
        assert_eq!(decode(&encode(data)), data.to_vec());
    }

    #[test]
    fn test_match_window_limit() {
        // The repeat sits more than MAX_DISTANCE back, so no back-reference may use it.
        let mut data = b"0123456789abcdef".to_vec();
        data.extend((0..3000).map(|i| b'A' + (i % 26) as u8));
        data.extend_from_slice(b"0123456789abcdef");
        assert_eq!(decode(&encode(&data)), data);
    }
}
