//! Caption reflow into short paragraphs.

use super::normalize::strip_hashtags;

/// Sentences per paragraph when the caption arrives as one block.
const SENTENCES_PER_PARAGRAPH: usize = 2;

/// Strip hashtags and reflow a caption into short paragraphs separated by a
/// blank line.
///
/// Explicit line breaks are respected (one paragraph per non-empty line);
/// single-block text is split on sentence boundaries and regrouped.
pub fn format_caption(text: &str) -> String {
    let cleaned = strip_hashtags(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return String::new();
    }

    let paragraphs: Vec<String> = if cleaned.contains('\n') {
        cleaned
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        split_sentences(cleaned)
            .chunks(SENTENCES_PER_PARAGRAPH)
            .map(|group| group.join(" "))
            .collect()
    };

    paragraphs.join("\n\n")
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closing_mark(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | '”' | '’' | '»')
}

/// Split on `.`, `!`, `?` or `…` runs followed by whitespace or end of text.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !is_terminator(c) {
            continue;
        }
        while let Some(&next) = chars.peek() {
            if is_terminator(next) || is_closing_mark(next) {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if chars.peek().is_none_or(|n| n.is_whitespace()) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_two_sentences_per_paragraph() {
        let out = format_caption("Primeira frase. Segunda frase! Terceira? Quarta.");
        assert_eq!(out, "Primeira frase. Segunda frase!\n\nTerceira? Quarta.");
    }

    #[test]
    fn odd_sentence_count_leaves_short_last_paragraph() {
        let out = format_caption("Um. Dois. Três.");
        assert_eq!(out, "Um. Dois.\n\nTrês.");
    }

    #[test]
    fn explicit_line_breaks_become_paragraphs() {
        let out = format_caption("Linha um\n\n   Linha dois #tag\n#a #b");
        assert_eq!(out, "Linha um\n\nLinha dois");
    }

    #[test]
    fn hashtags_are_removed() {
        assert_eq!(
            format_caption("Compre já. Só hoje! #promo #oferta"),
            "Compre já. Só hoje!"
        );
        assert_eq!(format_caption("#so #hashtags"), "");
        assert_eq!(format_caption("   "), "");
    }

    #[test]
    fn decimals_do_not_split_sentences() {
        assert_eq!(
            format_caption("Custa R$ 10.50 hoje. Aproveite."),
            "Custa R$ 10.50 hoje. Aproveite."
        );
    }

    #[test]
    fn terminator_runs_stay_with_their_sentence() {
        assert_eq!(format_caption("Uau... Sério?! Sim."), "Uau... Sério?!\n\nSim.");
    }
}
