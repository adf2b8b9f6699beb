//! Pure layout functions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Greedy word wrap at a character count.
///
/// Whitespace runs collapse to a single space. Words longer than `width` are
/// split across lines. Widths are counted in `char`s, not pixels; with a
/// proportional font this is an approximation.
///
/// # Examples
/// ```
/// # use daily_vibes::imaging::calculations::wrap_text;
/// assert_eq!(
///     wrap_text("the quick brown fox", 10),
///     vec!["the quick", "brown fox"]
/// );
/// ```
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        // Hard-split words that can never fit on one line
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Line advance for a font size: 1.5× the size.
pub fn line_height(font_size: u32) -> u32 {
    font_size * 3 / 2
}

/// Top edge of a text block of `line_count` lines vertically centered on a
/// canvas of `canvas_height`. Negative when the block is taller than the canvas.
pub fn block_top(line_count: usize, line_height: u32, canvas_height: u32) -> i32 {
    let block = line_count as i64 * line_height as i64;
    ((canvas_height as i64 - block) / 2) as i32
}

/// Composite black at `alpha` (0-255) over one channel value.
pub fn darken(channel: u8, alpha: u8) -> u8 {
    let keep = 255 - alpha as u32;
    ((channel as u32 * keep + 127) / 255) as u8
}

/// Integer scale factor for the 8×8 fallback glyphs at a nominal font size.
pub fn bitmap_scale(font_size: u32) -> u32 {
    (font_size / 15).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_short_text_is_single_line() {
        assert_eq!(wrap_text("Rise and shine", 25), vec!["Rise and shine"]);
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap_text(
            "Every sunrise is an invitation to brighten someone's day",
            25,
        );
        assert_eq!(
            lines,
            vec!["Every sunrise is an", "invitation to brighten", "someone's day"]
        );
        assert!(lines.iter().all(|l| l.chars().count() <= 25));
    }

    #[test]
    fn wrap_collapses_whitespace() {
        assert_eq!(wrap_text("  a \n\t b  ", 10), vec!["a b"]);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        assert_eq!(wrap_text("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn wrap_empty_text_has_no_lines() {
        assert!(wrap_text("   ", 25).is_empty());
    }

    #[test]
    fn wrap_counts_chars_not_bytes() {
        // 5 chars, 10 bytes
        assert_eq!(wrap_text("ÜÜÜÜÜ ab", 8), vec!["ÜÜÜÜÜ ab"]);
    }

    #[test]
    fn line_height_is_one_and_a_half() {
        assert_eq!(line_height(60), 90);
        assert_eq!(line_height(40), 60);
    }

    #[test]
    fn block_is_vertically_centered() {
        // 3 lines of 90px on 1080: (1080 - 270) / 2
        assert_eq!(block_top(3, 90, 1080), 405);
        assert_eq!(block_top(0, 90, 1080), 540);
    }

    #[test]
    fn block_taller_than_canvas_goes_negative() {
        assert!(block_top(20, 90, 1080) < 0);
    }

    #[test]
    fn darken_bounds() {
        assert_eq!(darken(200, 0), 200);
        assert_eq!(darken(200, 255), 0);
        assert_eq!(darken(255, 80), 175);
    }

    #[test]
    fn bitmap_scale_never_zero() {
        assert_eq!(bitmap_scale(60), 4);
        assert_eq!(bitmap_scale(40), 2);
        assert_eq!(bitmap_scale(5), 1);
    }
}
