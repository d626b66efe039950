//! Script strategy catalog.
//!
//! A strategy names the ordered script sections the model must write. The
//! section keys refer to [`crate::text::script::SECTIONS`].

use serde::Serialize;

use crate::plan::AutoPlanError;
use crate::text::script::{self, Section};

/// Key used when the request names no strategy.
pub const DEFAULT_STRATEGY: &str = "hook_insight_cta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptStrategy {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub sections: &'static [&'static str],
}

pub const STRATEGIES: &[ScriptStrategy] = &[
    ScriptStrategy {
        key: "hook_insight_cta",
        name: "Gancho, insight e CTA",
        description: "Abre com um gancho forte, entrega uma ideia útil e fecha com uma chamada para ação.",
        sections: &["hook", "insight", "development", "final_cta"],
    },
    ScriptStrategy {
        key: "pas",
        name: "Problema, agitação e solução",
        description: "Apresenta uma dor do público, intensifica o incômodo e mostra a solução.",
        sections: &["problem", "agitation", "solution"],
    },
    ScriptStrategy {
        key: "aida",
        name: "AIDA",
        description: "Atenção, interesse, desejo e ação, na ordem clássica de persuasão.",
        sections: &["attention", "interest", "desire", "final_cta"],
    },
    ScriptStrategy {
        key: "storytelling",
        name: "Storytelling",
        description: "Conta uma história curta com contexto, conflito e resolução.",
        sections: &["context", "conflict", "solution", "final_cta"],
    },
    ScriptStrategy {
        key: "demonstration",
        name: "Demonstração",
        description: "Mostra na prática como o produto ou a técnica funciona.",
        sections: &["hook", "demonstration", "final_cta"],
    },
    ScriptStrategy {
        key: "offer",
        name: "Oferta direta",
        description: "Conecta uma dor a uma oferta clara com senso de urgência.",
        sections: &["hook", "problem", "offer", "final_cta"],
    },
];

pub fn strategy(key: &str) -> Option<&'static ScriptStrategy> {
    STRATEGIES.iter().find(|s| s.key == key)
}

/// Resolve a requested key; absent or blank selects [`DEFAULT_STRATEGY`].
pub fn resolve_strategy(key: Option<&str>) -> Result<&'static ScriptStrategy, AutoPlanError> {
    let key = key.map(str::trim).filter(|k| !k.is_empty()).unwrap_or(DEFAULT_STRATEGY);
    strategy(key).ok_or_else(|| AutoPlanError::UnknownStrategy(key.to_string()))
}

impl ScriptStrategy {
    /// Catalog sections of this strategy, in script order.
    pub fn section_defs(&self) -> impl Iterator<Item = &'static Section> + use<> {
        let sections = self.sections;
        sections.iter().filter_map(|key| script::section(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_strategy_section_is_in_the_catalog() {
        for s in STRATEGIES {
            assert_eq!(s.section_defs().count(), s.sections.len(), "strategy {}", s.key);
        }
    }

    #[test]
    fn default_strategy_exists() {
        assert_eq!(resolve_strategy(None).unwrap().key, DEFAULT_STRATEGY);
        assert_eq!(resolve_strategy(Some("  ")).unwrap().key, DEFAULT_STRATEGY);
    }

    #[test]
    fn resolve_known_and_unknown_keys() {
        assert_eq!(resolve_strategy(Some("aida")).unwrap().sections.len(), 4);
        assert_eq!(resolve_strategy(Some(" pas ")).unwrap().key, "pas");
        let err = resolve_strategy(Some("viral")).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_STRATEGY");
    }
}
