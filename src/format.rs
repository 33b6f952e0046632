//! Memory-block rendering for read responses.
//!
//! Registers print 16 words per line in hex, coils 64 bits per line in groups
//! of 8. Every line starts at a natural boundary: the first line is
//! left-padded with blank placeholders down to the start address, and each
//! line is prefixed with its offset in hex.

const WORDS_PER_LINE: usize = 16;
const BITS_PER_LINE: usize = 64;
const BIT_GROUP: usize = 8;

/// Format a register block read starting at `start`.
#[must_use]
pub fn format_registers(words: &[u16], start: u16) -> Vec<String> {
    let pad = usize::from(start) % WORDS_PER_LINE;
    let mut offset = usize::from(start) - pad;
    let cells: Vec<String> = std::iter::repeat("    ".to_string())
        .take(pad)
        .chain(words.iter().map(|w| format!("{w:04x}")))
        .collect();

    let mut lines = Vec::new();
    for row in cells.chunks(WORDS_PER_LINE) {
        lines.push(format!("{offset:04x}: {}", row.join(" ")));
        offset += WORDS_PER_LINE;
    }
    lines
}

/// Format a coil/discrete-input block read starting at `start`.
#[must_use]
pub fn format_coils(bits: &[bool], start: u16) -> Vec<String> {
    let pad = usize::from(start) % BITS_PER_LINE;
    let mut offset = usize::from(start) - pad;
    let cells: Vec<char> = std::iter::repeat(' ')
        .take(pad)
        .chain(bits.iter().map(|&b| if b { '1' } else { '0' }))
        .collect();

    let mut lines = Vec::new();
    for row in cells.chunks(BITS_PER_LINE) {
        let groups: Vec<String> = row
            .chunks(BIT_GROUP)
            .map(|g| g.iter().collect::<String>())
            .collect();
        lines.push(format!("{offset:04x}: {}", groups.join(" ")));
        offset += BITS_PER_LINE;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_aligned_start() {
        let lines = format_registers(&[0x0001, 0xbeef, 0xffff], 0);
        assert_eq!(lines, vec!["0000: 0001 beef ffff"]);
    }

    #[test]
    fn registers_unaligned_start_pads_to_boundary() {
        let words: Vec<u16> = (0..20).collect();
        let lines = format_registers(&words, 5);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000:      "), "line was {:?}", lines[0]);
        // first real value appears in column 5
        assert!(lines[0].contains("0000 0001"));
        assert!(lines[1].starts_with("0010: "));
        assert!(lines[1].ends_with("0013"));
    }

    #[test]
    fn registers_line_offsets_advance_by_sixteen() {
        let words = vec![0u16; 33];
        let lines = format_registers(&words, 0);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0000: "));
        assert!(lines[1].starts_with("0010: "));
        assert!(lines[2].starts_with("0020: "));
    }

    #[test]
    fn coils_grouped_by_eight() {
        let bits = vec![true, false, true, true, false, false, false, true, true];
        let lines = format_coils(&bits, 0);
        assert_eq!(lines, vec!["0000: 10110001 1"]);
    }

    #[test]
    fn coils_unaligned_start_pads_with_blanks() {
        let bits = vec![true; 4];
        let lines = format_coils(&bits, 66);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("0040: "));
        assert_eq!(lines[0], "0040:   1111");
    }
}
