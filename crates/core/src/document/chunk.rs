/// Maximum characters per address line accepted by the document schema.
pub const ADDRESS_LINE_WIDTH: usize = 30;

/// Splits `text` into consecutive segments of at most `width` characters.
///
/// Works on `char`s, so multi-byte characters are never split. Joining the
/// segments yields `text` again. An empty input yields no segments.
pub fn chunk_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|segment| segment.iter().collect())
        .collect()
}
