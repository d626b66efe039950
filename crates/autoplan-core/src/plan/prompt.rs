//! Prompt construction for monthly plans and single-item regeneration.
//!
//! Pure string assembly; no I/O.

use chrono::NaiveDate;

use autoplan_db::models::{CalendarItem, ContentProfile};

use crate::plan::strategy::ScriptStrategy;
use crate::schedule::Month;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the monthly plan prompt embeds.
#[derive(Debug, Clone)]
pub struct PlanPromptContext<'a> {
    pub profile: &'a ContentProfile,
    pub month: Month,
    /// Free dates the model must fill, ascending.
    pub slots: &'a [NaiveDate],
    /// Topics already on the calendar this month.
    pub existing_topics: &'a [String],
    pub strategy: &'static ScriptStrategy,
}

// ---------------------------------------------------------------------------
// Fixed prompt sections
// ---------------------------------------------------------------------------

/// Output contract for a monthly plan.
const PLAN_RESPONSE_SCHEMA: &str = r##"## Formato da resposta

Responda APENAS com um objeto JSON válido, sem texto antes ou depois:

```json
{
  "items": [
    {
      "date": "AAAA-MM-DD",
      "topic": "tema curto e específico",
      "recommended_time": "HH:MM",
      "recommended_time_reason": "por que este horário funciona para o público",
      "script": "Rótulo da seção: conteúdo\nRótulo da seção: conteúdo",
      "caption": "legenda pronta para publicar",
      "hashtags": "#exemplo #outra"
    }
  ]
}
```
"##;

/// Output contract for regenerating one item.
const REGENERATE_RESPONSE_SCHEMA: &str = r##"## Formato da resposta

Responda APENAS com um objeto JSON válido, sem texto antes ou depois:

```json
{
  "script": "Rótulo da seção: conteúdo\nRótulo da seção: conteúdo",
  "caption": "legenda pronta para publicar",
  "hashtags": "#exemplo #outra"
}
```
"##;

const WRITING_RULES: &str = r#"## Regras de escrita

1. Escreva em português do Brasil, no tom de voz indicado no perfil.
2. No roteiro, escreva uma linha por seção no formato `Rótulo: conteúdo`, usando os rótulos da estratégia na ordem indicada.
3. Não use emojis no roteiro; os títulos das seções são formatados pelo sistema.
4. A legenda deve ter frases curtas, sem hashtags no meio do texto.
5. Use de 3 a 8 hashtags relevantes, cada uma começando com `#`, sem espaços.
6. O horário recomendado deve estar no formato HH:MM (24 horas).
"#;

// ---------------------------------------------------------------------------
// Monthly plan
// ---------------------------------------------------------------------------

/// System instruction for a monthly plan.
pub fn build_plan_system_prompt(strategy: &ScriptStrategy) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str("# Planejador de conteúdo\n\n");
    prompt.push_str(
        "Você é um estrategista de conteúdo para redes sociais. \
         Sua tarefa é montar o calendário editorial de um mês para um negócio, \
         com uma publicação por data disponível.\n\n",
    );

    prompt.push_str(PLAN_RESPONSE_SCHEMA);
    prompt.push('\n');
    prompt.push_str(WRITING_RULES);
    prompt.push('\n');
    push_strategy(&mut prompt, strategy);

    prompt.push_str("\n## Restrições\n\n");
    prompt.push_str("- Use somente as datas fornecidas, no máximo um item por data.\n");
    prompt.push_str("- Nunca repita um tema, nem um tema já existente no calendário.\n");

    prompt
}

/// User message for a monthly plan: profile, dates and existing topics.
pub fn build_plan_user_prompt(ctx: &PlanPromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(2048);

    push_profile(&mut prompt, ctx.profile);

    prompt.push_str(&format!("\n## Mês: {}\n\n", ctx.month));
    prompt.push_str(&format!(
        "Crie exatamente {} publicações, uma para cada data abaixo:\n\n",
        ctx.slots.len()
    ));
    for date in ctx.slots {
        prompt.push_str(&format!("- {date}\n"));
    }

    prompt.push_str("\n## Temas já existentes neste mês\n\n");
    if ctx.existing_topics.is_empty() {
        prompt.push_str("Nenhum.\n");
    } else {
        prompt.push_str("Não repita nenhum destes temas:\n\n");
        for topic in ctx.existing_topics {
            prompt.push_str(&format!("- {topic}\n"));
        }
    }

    prompt
}

// ---------------------------------------------------------------------------
// Single item regeneration
// ---------------------------------------------------------------------------

pub fn build_regenerate_system_prompt(strategy: &ScriptStrategy) -> String {
    let mut prompt = String::with_capacity(1536);

    prompt.push_str("# Redator de conteúdo\n\n");
    prompt.push_str(
        "Você é um redator de conteúdo para redes sociais. \
         Reescreva o roteiro, a legenda e as hashtags de uma publicação já planejada, \
         mantendo o tema.\n\n",
    );
    prompt.push_str(REGENERATE_RESPONSE_SCHEMA);
    prompt.push('\n');
    prompt.push_str(WRITING_RULES);
    prompt.push('\n');
    push_strategy(&mut prompt, strategy);

    prompt
}

pub fn build_regenerate_user_prompt(profile: &ContentProfile, item: &CalendarItem) -> String {
    let mut prompt = String::with_capacity(1024);

    push_profile(&mut prompt, profile);

    prompt.push_str("\n## Publicação\n\n");
    prompt.push_str(&format!("- **Data:** {}\n", item.scheduled_date));
    prompt.push_str(&format!("- **Tema:** {}\n", item.topic));
    if let Some(script) = item.script.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\nRoteiro atual (escreva uma versão diferente):\n\n");
        prompt.push_str(script);
        prompt.push('\n');
    }

    prompt
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "não informado"
    } else {
        value.trim()
    }
}

fn push_profile(prompt: &mut String, profile: &ContentProfile) {
    prompt.push_str("## Perfil do negócio\n\n");
    prompt.push_str(&format!("- **Negócio:** {}\n", or_unset(&profile.business_name)));
    prompt.push_str(&format!("- **Nicho:** {}\n", or_unset(&profile.niche)));
    prompt.push_str(&format!("- **Público:** {}\n", or_unset(&profile.audience)));
    prompt.push_str(&format!("- **Tom de voz:** {}\n", or_unset(&profile.tone)));
    prompt.push_str(&format!("- **Objetivos:** {}\n", or_unset(&profile.goals)));

    let platforms = profile.platforms.join(", ");
    prompt.push_str(&format!("- **Plataformas:** {}\n", or_unset(&platforms)));
    prompt.push_str(&format!(
        "- **Frequência desejada:** {} publicações por semana\n",
        profile.weekly_frequency
    ));
}

fn push_strategy(prompt: &mut String, strategy: &ScriptStrategy) {
    prompt.push_str(&format!("## Estratégia de roteiro: {}\n\n", strategy.name));
    prompt.push_str(strategy.description);
    prompt.push_str("\n\nSeções do roteiro, nesta ordem:\n\n");
    for section in strategy.section_defs() {
        let label = section
            .heading
            .split_once(' ')
            .map_or(section.heading, |(_, label)| label);
        prompt.push_str(&format!("- `{label}:` (exibido como {})\n", section.heading));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
