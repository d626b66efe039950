//! Script structuring: maps `label: content` lines produced by the model to
//! a fixed catalog of script sections with canonical headings.

use super::normalize::{fold_char, normalize_key, strip_decorative};

/// One canonical script section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub key: &'static str,
    /// Heading emitted in the structured script, with its fixed emoji.
    pub heading: &'static str,
    /// Normalized labels (lowercase, accent-free) that map to this section.
    pub aliases: &'static [&'static str],
}

/// Section catalog, in matching priority order.
pub const SECTIONS: &[Section] = &[
    Section {
        key: "hook",
        heading: "🎣 Gancho",
        aliases: &["gancho", "hook", "abertura", "chamada inicial"],
    },
    Section {
        key: "problem",
        heading: "❗ Problema",
        aliases: &["problema", "problem", "dor"],
    },
    Section {
        key: "insight",
        heading: "💡 Insight",
        aliases: &["insight", "sacada", "ideia central"],
    },
    Section {
        key: "development",
        heading: "📈 Desenvolvimento",
        aliases: &["desenvolvimento", "development", "corpo", "conteudo"],
    },
    Section {
        key: "demonstration",
        heading: "🎬 Demonstração",
        aliases: &["demonstracao", "demonstration", "demo", "exemplo"],
    },
    Section {
        key: "solution",
        heading: "✅ Solução",
        aliases: &["solucao", "solution", "resolucao"],
    },
    Section {
        key: "attention",
        heading: "👀 Atenção",
        aliases: &["atencao", "attention"],
    },
    Section {
        key: "interest",
        heading: "🤔 Interesse",
        aliases: &["interesse", "interest"],
    },
    Section {
        key: "desire",
        heading: "🔥 Desejo",
        aliases: &["desejo", "desire"],
    },
    Section {
        key: "final_cta",
        heading: "📣 CTA final",
        aliases: &[
            "cta final",
            "cta",
            "chamada para acao",
            "call to action",
            "acao",
            "action",
            "fechamento",
        ],
    },
    Section {
        key: "agitation",
        heading: "😣 Agitação",
        aliases: &["agitacao", "agitation", "agitar"],
    },
    Section {
        key: "context",
        heading: "🧭 Contexto",
        aliases: &["contexto", "context", "cenario"],
    },
    Section {
        key: "conflict",
        heading: "⚔️ Conflito",
        aliases: &["conflito", "conflict", "virada"],
    },
    Section {
        key: "offer",
        heading: "🎁 Oferta",
        aliases: &["oferta", "offer", "proposta"],
    },
];

/// Labels longer than this are treated as prose that happens to contain a colon.
const MAX_LABEL_CHARS: usize = 48;
const MAX_LABEL_WORDS: usize = 6;

/// Look up a section by key.
pub fn section(key: &str) -> Option<&'static Section> {
    SECTIONS.iter().find(|s| s.key == key)
}

/// Match a raw label against the catalog by exact, prefix or suffix
/// containment of an alias on the normalized label.
pub fn match_section(label: &str) -> Option<&'static Section> {
    let label = normalize_key(label);
    if label.is_empty() {
        return None;
    }
    SECTIONS.iter().find(|section| {
        section.aliases.iter().any(|alias| {
            label == *alias
                || label.starts_with(&format!("{alias} "))
                || label.ends_with(&format!(" {alias}"))
        })
    })
}

/// Restructure a raw script into headed sections.
///
/// Lines of the form `label: content` whose label matches the catalog become
/// the section heading (emitted once while consecutive lines share it)
/// followed by the content. Any other line is kept verbatim as its own
/// paragraph.
pub fn structure_script(raw: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut current: Option<&'static Section> = None;

    for raw_line in raw.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let matched = split_label(line)
            .and_then(|(label, content)| match_section(label).map(|s| (s, content)));

        match matched {
            Some((section, content)) => {
                if current != Some(section) {
                    if !out.is_empty() {
                        out.push(String::new());
                    }
                    out.push(section.heading.to_string());
                    current = Some(section);
                }
                let content = strip_restated_heading(&strip_decorative(content), section);
                if !content.is_empty() {
                    out.push(content);
                }
            }
            None => {
                if !out.is_empty() {
                    out.push(String::new());
                }
                out.push(line.to_string());
                current = None;
            }
        }
    }

    out.join("\n")
}

/// Split `label: content`, tolerating list markers and markdown emphasis.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let line = strip_list_marker(line);
    let (label, content) = line.split_once([':', '：'])?;
    let label = label.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '[' | ']'));
    if label.is_empty()
        || label.chars().count() > MAX_LABEL_CHARS
        || label.split_whitespace().count() > MAX_LABEL_WORDS
        || content.starts_with("//")
    {
        return None;
    }
    let content = content.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_'));
    Some((label, content.trim_end()))
}

/// Drop a leading bullet (`-`, `*`, `•`, `>`, `#`) or `1.` / `1)` numbering.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| matches!(c, '-' | '•' | '>' | '#') || c.is_whitespace());
    let line = line.strip_prefix("* ").unwrap_or(line);
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

/// Remove a leading restatement of the section name from the content
/// (`"Gancho - Você sabia?"` under the hook heading -> `"Você sabia?"`).
fn strip_restated_heading(content: &str, section: &Section) -> String {
    let folded: Vec<char> = content.chars().map(fold_char).collect();
    for alias in section.aliases {
        let alias: Vec<char> = alias.chars().collect();
        if folded.len() < alias.len() || folded[..alias.len()] != alias[..] {
            continue;
        }
        if folded.get(alias.len()).is_none_or(|c| !c.is_alphanumeric()) {
            let rest: String = content.chars().skip(alias.len()).collect();
            return rest
                .trim_start_matches(|c: char| {
                    c.is_whitespace() || matches!(c, ':' | '-' | '–' | '—' | '|' | '.' | '*')
                })
                .to_string();
        }
    }
    content.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_labels_to_canonical_headings() {
        let raw = "Gancho: Você sabia que 80% erram?\nProblema: Muita gente posta sem plano.\nCTA: Comente PLANO!";
        assert_eq!(
            structure_script(raw),
            "🎣 Gancho\nVocê sabia que 80% erram?\n\n❗ Problema\nMuita gente posta sem plano.\n\n📣 CTA final\nComente PLANO!"
        );
    }

    #[test]
    fn consecutive_lines_of_one_section_share_a_heading() {
        let raw = "Hook: primeira parte\nGancho: segunda parte";
        assert_eq!(structure_script(raw), "🎣 Gancho\nprimeira parte\nsegunda parte");
    }

    #[test]
    fn unmatched_lines_are_kept_verbatim() {
        let raw = "Texto solto sem rótulo\nObs: lembrar da luz natural";
        assert_eq!(
            structure_script(raw),
            "Texto solto sem rótulo\n\nObs: lembrar da luz natural"
        );
    }

    #[test]
    fn fallback_paragraph_resets_heading() {
        let raw = "Gancho: a\nnota solta\nGancho: b";
        assert_eq!(structure_script(raw), "🎣 Gancho\na\n\nnota solta\n\n🎣 Gancho\nb");
    }

    #[test]
    fn restated_heading_is_stripped_from_content() {
        let raw = "Gancho: Gancho - Você sabia?\nSolução: solução: use um calendário";
        assert_eq!(
            structure_script(raw),
            "🎣 Gancho\nVocê sabia?\n\n✅ Solução\nuse um calendário"
        );
    }

    #[test]
    fn decorations_are_stripped_but_heading_emoji_kept() {
        let raw = "**Solução:** ✅ Use o app 🚀";
        assert_eq!(structure_script(raw), "✅ Solução\nUse o app");
    }

    #[test]
    fn list_markers_and_label_suffixes_are_tolerated() {
        let raw = "1. Gancho (0-3s): Pare tudo!\n- Parte 3 - Oferta: Leve 2, pague 1";
        assert_eq!(
            structure_script(raw),
            "🎣 Gancho\nPare tudo!\n\n🎁 Oferta\nLeve 2, pague 1"
        );
    }

    #[test]
    fn accents_and_case_in_labels_do_not_matter() {
        assert_eq!(match_section("AGITAÇÃO").map(|s| s.key), Some("agitation"));
        assert_eq!(match_section("Chamada para ação").map(|s| s.key), Some("final_cta"));
        assert_eq!(match_section("Observação"), None);
    }

    #[test]
    fn urls_are_not_labels() {
        let raw = "https://exemplo.com/promo";
        assert_eq!(structure_script(raw), raw);
    }

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys: Vec<&str> = SECTIONS.iter().map(|s| s.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), SECTIONS.len());
        assert_eq!(section("final_cta").map(|s| s.heading), Some("📣 CTA final"));
    }
}
