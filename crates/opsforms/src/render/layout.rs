use super::fonts::Font;

/// Break `text` into lines no wider than `max_width` points.
///
/// Explicit newlines start a new paragraph; blank paragraphs produce no
/// lines. Words fill each line greedily; a word wider than the column on its
/// own is split between characters. Runs of whitespace collapse to a single
/// space, every other character is kept.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(
            paragraph.trim_end_matches('\r'),
            font,
            size,
            max_width,
            &mut lines,
        );
    }
    lines
}

fn wrap_paragraph(paragraph: &str, font: Font, size: f32, max_width: f32, lines: &mut Vec<String>) {
    let fits = |candidate: &str| font.text_width(candidate, size) <= max_width;
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current = word.to_string();
            continue;
        }

        for ch in word.chars() {
            current.push(ch);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
}
