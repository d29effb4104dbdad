//! Splitting long replies into Discord-sized messages.

/// Discord's message length limit for standard users.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Running segment with its length tracked in characters.
#[derive(Default)]
struct Segment {
    text: String,
    len: usize,
}

impl Segment {
    fn push(&mut self, piece: &str, separator: char) {
        self.text.push_str(piece);
        self.text.push(separator);
        self.len += piece.chars().count() + 1;
    }

    /// Turns the separator after the last word into a line break.
    fn end_line(&mut self) {
        if self.text.ends_with(' ') {
            self.text.pop();
            self.text.push('\n');
        }
    }

    /// Moves the trimmed segment into `out`, skipping it if blank.
    fn flush_into(&mut self, out: &mut Vec<String>) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        self.text.clear();
        self.len = 0;
    }
}

/// Greedily packs `text` into segments of at most `max_len` characters.
///
/// Lines are kept whole where possible. A line longer than `max_len` is packed
/// word by word instead; a single word longer than `max_len` is emitted as is.
#[must_use]
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut segments = Vec::new();
    let mut current = Segment::default();

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if current.len + line_len + 1 <= max_len {
            current.push(line, '\n');
            continue;
        }

        current.flush_into(&mut segments);

        if line_len <= max_len {
            current.push(line, '\n');
            continue;
        }

        for word in line.split(' ') {
            if current.len + word.chars().count() + 1 > max_len {
                current.flush_into(&mut segments);
            }
            current.push(word, ' ');
        }
        current.end_line();
    }

    current.flush_into(&mut segments);
    segments
}
