use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns.
///
/// CJK characters and most emoji take two columns, combining marks none.
///
/// ```
/// use marquee::util::display_width;
///
/// assert_eq!(display_width("Amélie"), 6);
/// assert_eq!(display_width("千と千尋"), 8);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates `s` to at most `max_width` columns, appending `...` when text
/// was cut.
///
/// Widths of 3 or less have no room for an ellipsis; the longest prefix that
/// fits is returned instead. Borrows when the string already fits.
///
/// ```
/// use marquee::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Alien", 10), "Alien");
/// assert_eq!(truncate_to_width("The Shawshank Redemption", 10), "The Sha...");
/// assert_eq!(truncate_to_width("千と千尋の神隠し", 9), "千と千...");
/// assert_eq!(truncate_to_width("Heat", 2), "He");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        return Cow::Owned(s[..prefix_end(s, max_width)].to_string());
    }

    let cut = prefix_end(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Byte index ending the longest prefix of `s` that fits in `width` columns.
fn prefix_end(s: &str, width: usize) -> usize {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return idx;
        }
        used += w;
    }
    s.len()
}

/// Truncates or right-pads `s` with spaces to exactly `width` columns.
///
/// Used to line up list columns; wide characters that would straddle the
/// boundary are dropped and replaced by padding.
pub fn fit_to_width(s: &str, width: usize) -> String {
    let truncated = truncate_to_width(s, width);
    let pad = width.saturating_sub(display_width(&truncated));
    let mut out = String::with_capacity(truncated.len() + pad);
    out.push_str(&truncated);
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

/// Greedy word wrap to lines of at most `width` columns.
///
/// Words longer than a full line are truncated with an ellipsis rather than
/// split. Existing line breaks start a new paragraph line.
pub fn wrap_to_width(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if width == 0 {
        return lines;
    }

    for paragraph in s.lines() {
        let mut line = String::new();
        let mut line_width = 0;

        for word in paragraph.split_whitespace() {
            let word = truncate_to_width(word, width);
            let word_width = display_width(&word);

            if line_width > 0 && line_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            if line_width > 0 {
                line.push(' ');
                line_width += 1;
            }
            line.push_str(&word);
            line_width += word_width;
        }

        lines.push(line);
    }

    lines
}

/// SEC-001: Strip terminal control characters and ANSI escape sequences.
///
/// Catalog titles and overviews are third-party text printed straight to the
/// terminal. Removes C0 controls other than tab, newline and carriage
/// return, DEL, CSI sequences (`ESC [` ... final byte 0x40-0x7E), OSC
/// sequences (`ESC ]` ... BEL or `ESC \`) and any other ESC.
///
/// Borrows when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(is_stripped_byte) {
        return Cow::Borrowed(s);
    }

    enum State {
        Text,
        Escape,
        Csi,
        Osc,
        OscEscape,
    }

    let mut out = String::with_capacity(s.len());
    let mut state = State::Text;

    for c in s.chars() {
        state = match state {
            State::Text => match c {
                '\x1b' => State::Escape,
                c if c.is_ascii() && is_stripped_byte(c as u8) => State::Text,
                c => {
                    out.push(c);
                    State::Text
                }
            },
            State::Escape => match c {
                '[' => State::Csi,
                ']' => State::Osc,
                // Bare ESC: drop it and keep the following character
                '\x1b' => State::Escape,
                c => {
                    if !(c.is_ascii() && is_stripped_byte(c as u8)) {
                        out.push(c);
                    }
                    State::Text
                }
            },
            State::Csi => {
                if ('\x40'..='\x7e').contains(&c) {
                    State::Text
                } else {
                    State::Csi
                }
            }
            State::Osc => match c {
                '\x07' => State::Text,
                '\x1b' => State::OscEscape,
                _ => State::Osc,
            },
            State::OscEscape => match c {
                '\\' => State::Text,
                '\x1b' => State::OscEscape,
                _ => State::Osc,
            },
        };
    }

    Cow::Owned(out)
}

fn is_stripped_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}
