use uuid::Uuid;

use crate::llm::LlmError;
use crate::plan::response::ResponseParseError;
use crate::schedule::Month;

/// Errors surfaced by the planning operations.
///
/// Each variant maps to a stable machine-readable [`code`](Self::code), an
/// HTTP status and a user-facing message. Upstream and persistence details
/// stay in the error chain for logging and never reach the message.
#[derive(Debug, thiserror::Error)]
pub enum AutoPlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid month: {0}")]
    InvalidMonth(String),

    #[error("unknown script strategy: {0:?}")]
    UnknownStrategy(String),

    #[error("user has no content profile")]
    ProfileRequired,

    #[error("automatic plan already generated for {0}")]
    AlreadyGenerated(Month),

    #[error("calendar item {0} not found")]
    ItemNotFound(Uuid),

    #[error("language model call failed")]
    Llm(#[from] LlmError),

    #[error("language model response is unusable")]
    Response(#[from] ResponseParseError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AutoPlanError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidMonth(_) => "INVALID_MONTH",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::ProfileRequired => "PROFILE_REQUIRED",
            Self::AlreadyGenerated(_) => "AUTO_PLAN_ALREADY_USED",
            Self::ItemNotFound(_) => "NOT_FOUND",
            Self::Llm(_) | Self::Response(_) => "AI_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidMonth(_)
            | Self::UnknownStrategy(_)
            | Self::ProfileRequired
            | Self::AlreadyGenerated(_) => 400,
            Self::ItemNotFound(_) => 404,
            Self::Llm(_) | Self::Response(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to show the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(detail) => format!("Dados inválidos: {detail}"),
            Self::InvalidMonth(_) => {
                "Mês inválido. Informe um mês atual ou futuro no formato AAAA-MM.".to_string()
            }
            Self::UnknownStrategy(key) => format!("Estratégia de roteiro desconhecida: {key}"),
            Self::ProfileRequired => {
                "Complete seu perfil de conteúdo antes de gerar o planejamento.".to_string()
            }
            Self::AlreadyGenerated(month) => format!(
                "O planejamento automático de {month} já foi gerado. Você poderá gerar novamente no próximo mês."
            ),
            Self::ItemNotFound(_) => "Item do calendário não encontrado.".to_string(),
            Self::Llm(_) | Self::Response(_) => {
                "O serviço de IA está indisponível no momento. Tente novamente em instantes."
                    .to_string()
            }
            Self::Internal(_) => "Erro interno. Tente novamente mais tarde.".to_string(),
        }
    }

    /// Whether the failure came from outside the caller's control.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::Response(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let month = Month::new(2026, 11).unwrap();
        let cases: Vec<(AutoPlanError, &str, u16)> = vec![
            (AutoPlanError::InvalidInput("x".into()), "INVALID_INPUT", 400),
            (AutoPlanError::InvalidMonth("x".into()), "INVALID_MONTH", 400),
            (AutoPlanError::UnknownStrategy("x".into()), "UNKNOWN_STRATEGY", 400),
            (AutoPlanError::ProfileRequired, "PROFILE_REQUIRED", 400),
            (AutoPlanError::AlreadyGenerated(month), "AUTO_PLAN_ALREADY_USED", 400),
            (AutoPlanError::ItemNotFound(Uuid::nil()), "NOT_FOUND", 404),
            (AutoPlanError::Llm(LlmError::Timeout), "AI_UNAVAILABLE", 503),
            (
                AutoPlanError::Response(ResponseParseError::NoJsonObject),
                "AI_UNAVAILABLE",
                503,
            ),
            (AutoPlanError::Internal(anyhow::anyhow!("db down")), "INTERNAL", 500),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.http_status(), status, "{code}");
        }
    }

    #[test]
    fn upstream_details_stay_out_of_user_message() {
        let err = AutoPlanError::Llm(LlmError::Status {
            status: 401,
            body: "invalid api key sk-123".into(),
        });
        assert!(!err.user_message().contains("sk-123"));
        assert!(err.is_upstream());

        let err = AutoPlanError::Internal(anyhow::anyhow!("relation calendar_items does not exist"));
        assert!(!err.user_message().contains("calendar_items"));
    }

    #[test]
    fn conflict_message_names_the_month() {
        let err = AutoPlanError::AlreadyGenerated(Month::new(2026, 11).unwrap());
        assert!(err.user_message().contains("2026-11"));
        assert!(!err.is_upstream());
    }
}
