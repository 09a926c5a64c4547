//! The recursive character splitter. Lengths are counted in chars.

use std::collections::VecDeque;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into trimmed, non-empty chunks of at most `size` chars, with
/// up to `overlap` chars repeated between neighbours.
///
/// Text that already fits is returned whole. Callers keep `overlap < size`.
pub fn split_text<S: AsRef<str>>(
    text: &str,
    size: usize,
    overlap: usize,
    separators: &[S],
) -> Vec<String> {
    let size = size.max(1);
    if size >= char_len(text) {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut out = Vec::new();
    split_recursive(text, size, overlap, separators, &mut out);
    out.into_iter()
        .filter_map(|chunk| {
            let trimmed = chunk.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Chunk each row on its own and concatenate in row order.
pub fn split_rows<R: AsRef<str>, S: AsRef<str>>(
    rows: &[R],
    size: usize,
    overlap: usize,
    separators: &[S],
) -> Vec<String> {
    rows.iter()
        .flat_map(|row| split_text(row.as_ref(), size, overlap, separators))
        .collect()
}

fn split_recursive<S: AsRef<str>>(
    text: &str,
    size: usize,
    overlap: usize,
    separators: &[S],
    out: &mut Vec<String>,
) {
    let (separator, remaining) = choose_separator(text, separators);

    let mut good: Vec<&str> = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < size {
            good.push(piece);
            continue;
        }
        if !good.is_empty() {
            merge_splits(&good, size, overlap, out);
            good.clear();
        }
        match remaining {
            Some(rest) => split_recursive(piece, size, overlap, rest, out),
            // A single char that still does not fit.
            None => out.push(piece.to_string()),
        }
    }
    if !good.is_empty() {
        merge_splits(&good, size, overlap, out);
    }
}

/// The first separator that occurs in `text`, plus the finer separators to
/// recurse with. The empty separator (explicit, or when nothing matches)
/// splits into single chars and ends the recursion.
fn choose_separator<'a, S: AsRef<str>>(
    text: &str,
    separators: &'a [S],
) -> (&'a str, Option<&'a [S]>) {
    for (i, sep) in separators.iter().enumerate() {
        let sep = sep.as_ref();
        if sep.is_empty() {
            return ("", None);
        }
        if text.contains(sep) {
            return (sep, Some(&separators[i + 1..]));
        }
    }
    ("", None)
}

/// Cut before every position where `separator` starts, so each piece after
/// the first begins with the separator. Occurrences may overlap.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.char_indices().skip(1) {
        if text[i..].starts_with(separator) {
            pieces.push(&text[start..i]);
            start = i;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Greedily pack `splits` into chunks of at most `size` chars. When a chunk
/// closes, pieces are dropped from its front until at most `overlap` chars
/// remain and the next piece fits; the rest seeds the next chunk.
fn merge_splits(splits: &[&str], size: usize, overlap: usize, out: &mut Vec<String>) {
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in splits {
        let len = char_len(piece);
        if total + len > size && !current.is_empty() {
            push_joined(&current, out);
            while total > overlap || (total + len > size && total > 0) {
                match current.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }
        current.push_back(piece);
        total += len;
    }
    push_joined(&current, out);
}

fn push_joined(current: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = current.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_separator_at_piece_start() {
        assert_eq!(
            split_keeping_separator("a b c", " "),
            vec!["a", " b", " c"]
        );
    }

    #[test]
    fn overlapping_occurrences_each_cut() {
        assert_eq!(
            split_keeping_separator("A\n\n\nB", "\n\n"),
            vec!["A", "\n", "\n\nB"]
        );
    }

    #[test]
    fn leading_separator_gives_no_empty_piece() {
        assert_eq!(split_keeping_separator("\nX\nY", "\n"), vec!["\nX", "\nY"]);
    }

    #[test]
    fn empty_separator_splits_chars() {
        assert_eq!(split_keeping_separator("héj", ""), vec!["h", "é", "j"]);
    }

    #[test]
    fn chooses_first_present() {
        let seps = ["\n\n", "\n", " ", ""];
        let (sep, rest) = choose_separator("a\nb c", &seps);
        assert_eq!(sep, "\n");
        assert_eq!(rest.map(|r| r.len()), Some(2));
    }

    #[test]
    fn falls_back_to_chars_when_nothing_matches() {
        let seps = ["\n\n", "|"];
        assert_eq!(choose_separator("abc", &seps), ("", None));
    }

    #[test]
    fn merge_without_overlap() {
        let mut out = Vec::new();
        merge_splits(&["ab", "cd", "ef"], 4, 0, &mut out);
        assert_eq!(out, vec!["abcd", "ef"]);
    }
}
