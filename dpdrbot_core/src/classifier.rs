//! Literal-match routing of inbound text.
//!
//! Every message is normalised (trimmed, lower-cased) and matched against a
//! fixed priority list: feedback buttons, courtesy phrases, FAQ triggers.
//! Anything else is content for the assistant.

const FEEDBACK_POSITIVE: &str = "👍 útil";
const FEEDBACK_NEGATIVE: &str = "👎 no útil";
const FEEDBACK_NEW_QUESTION: &str = "❓ nueva pregunta";

const COURTESY: [&str; 6] = ["de nada", "gracias", "ok", "vale", "👍", "👎"];

const FEEDBACK_PROMPT_SUPPRESSORS: [&str; 4] = ["útil", "gracias", "ok", "vale"];

const FAQ_EXPLAIN_TO_FAMILY: &str = "ayuda a entenderme";
const FAQ_GENERAL_OVERVIEW: &str = "entender dpdr";

const EXPLAIN_TO_FAMILY_PROMPT: &str =
    "Explica qué es el DPDR de manera tranquilizadora para familiares y amigos";

const EXPLAIN_TO_FAMILY_INSTRUCTIONS: &str = "Proporciona una explicación del DPDR para familiares y amigos usando exactamente este formato y estructura:\n\n\
1. ¿Qué es DPDR?\n\
Explica que es una respuesta de defensa del cerebro ante la ansiedad/estrés. \
Usa la analogía de ver la vida a través de una pantalla de TV o un cristal, \
enfatizando que no es peligroso ni permanente.\n\n\
2. ¿Por qué ocurre?\n\
Explica la respuesta de congelación como mecanismo de protección natural, \
similar a cuando el cerebro se 'desconecta' temporalmente para protegerse.\n\n\
3. ¿Cómo se siente?\n\
Describe las sensaciones usando ejemplos cotidianos como: sentirse como en un sueño despierto, \
o como si estuvieras viendo una película de tu propia vida.\n\n\
4. ¿Es real o está solo en mi cabeza?\n\
Valida la experiencia pero enfatiza su temporalidad.\n\n\
5. ¿Cómo puedo apoyar a alguien con DPDR?\n\
Lista de formas prácticas de apoyo.\n\n\
6. La recuperación es posible\n\
Mensaje esperanzador sobre la recuperación.\n\n\
7. Conclusión\n\
Agradecimiento y recordatorio final positivo.\n\n\
Mantén el mismo tono tranquilizador y empático, usando analogías naturales y cotidianas.";

const GENERAL_OVERVIEW_INSTRUCTIONS: &str = "Proporciona una explicación general del DPDR como un mecanismo de protección del cerebro ante el estrés, \
enfatizando su naturaleza temporal y tratable. Incluye una breve explicación de su origen como respuesta \
natural de protección, pero mantén un tono informativo y tranquilizador.";

const CONTENT_INSTRUCTIONS: &str = "Proporciona respuestas concisas y específicas sobre DPDR.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Positive,
    Negative,
    NewQuestion,
}

impl FeedbackKind {
    /// Canned reply for the button; a new question is just absorbed.
    #[must_use]
    pub const fn acknowledgment(self) -> Option<&'static str> {
        match self {
            Self::Positive => Some("¡Gracias por tu feedback positivo!"),
            Self::Negative => {
                Some("Gracias por tu feedback. ¿Podrías decirme cómo puedo mejorar?")
            }
            Self::NewQuestion => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqTemplate {
    /// Structured explanation meant to be shared with family and friends.
    ExplainToFamily,
    GeneralOverview,
}

impl FaqTemplate {
    #[must_use]
    pub const fn instructions(self) -> &'static str {
        match self {
            Self::ExplainToFamily => EXPLAIN_TO_FAMILY_INSTRUCTIONS,
            Self::GeneralOverview => GENERAL_OVERVIEW_INSTRUCTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Feedback(FeedbackKind),
    Courtesy,
    FaqCategory {
        template: FaqTemplate,
        prompt: String,
    },
    Content {
        prompt: String,
    },
}

impl Classification {
    /// Whether this message has to go through the assistant.
    #[must_use]
    pub const fn needs_backend(&self) -> bool {
        matches!(self, Self::FaqCategory { .. } | Self::Content { .. })
    }

    /// Run instructions for backend-bound messages.
    #[must_use]
    pub const fn instructions(&self) -> Option<&'static str> {
        match self {
            Self::FaqCategory { template, .. } => Some(template.instructions()),
            Self::Content { .. } => Some(CONTENT_INSTRUCTIONS),
            Self::Feedback(_) | Self::Courtesy => None,
        }
    }

    /// Text appended to the thread for backend-bound messages.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::FaqCategory { prompt, .. } | Self::Content { prompt } => Some(prompt),
            Self::Feedback(_) | Self::Courtesy => None,
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[must_use]
pub fn classify(raw: &str) -> Classification {
    let text = normalize(raw);

    match text.as_str() {
        FEEDBACK_POSITIVE => return Classification::Feedback(FeedbackKind::Positive),
        FEEDBACK_NEGATIVE => return Classification::Feedback(FeedbackKind::Negative),
        FEEDBACK_NEW_QUESTION => return Classification::Feedback(FeedbackKind::NewQuestion),
        _ => {}
    }

    if COURTESY.contains(&text.as_str()) {
        return Classification::Courtesy;
    }

    match text.as_str() {
        FAQ_EXPLAIN_TO_FAMILY => Classification::FaqCategory {
            template: FaqTemplate::ExplainToFamily,
            prompt: EXPLAIN_TO_FAMILY_PROMPT.to_string(),
        },
        FAQ_GENERAL_OVERVIEW => Classification::FaqCategory {
            template: FaqTemplate::GeneralOverview,
            prompt: text,
        },
        _ => Classification::Content { prompt: text },
    }
}

/// Whether a feedback request should be skipped after replying to `raw`.
///
/// Substring match, so "ok" also suppresses on words like "token".
#[must_use]
pub fn suppresses_feedback_prompt(raw: &str) -> bool {
    let text = normalize(raw);
    FEEDBACK_PROMPT_SUPPRESSORS
        .iter()
        .any(|keyword| text.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_buttons_win_over_everything() {
        assert_eq!(
            classify("👍 Útil"),
            Classification::Feedback(FeedbackKind::Positive)
        );
        assert_eq!(
            classify("  👎 No útil "),
            Classification::Feedback(FeedbackKind::Negative)
        );
        assert_eq!(
            classify("❓ Nueva pregunta"),
            Classification::Feedback(FeedbackKind::NewQuestion)
        );
    }

    #[test]
    fn only_rating_buttons_are_acknowledged() {
        assert!(FeedbackKind::Positive.acknowledgment().is_some());
        assert!(FeedbackKind::Negative.acknowledgment().is_some());
        assert!(FeedbackKind::NewQuestion.acknowledgment().is_none());
    }

    #[test]
    fn courtesy_phrases_are_absorbed() {
        for phrase in ["de nada", "Gracias", "OK", "vale", "👍", "👎"] {
            let c = classify(phrase);
            assert_eq!(c, Classification::Courtesy, "{phrase}");
            assert!(!c.needs_backend());
        }
    }

    #[test]
    fn courtesy_requires_exact_match() {
        assert!(matches!(
            classify("gracias por todo"),
            Classification::Content { .. }
        ));
    }

    #[test]
    fn explain_to_family_rewrites_prompt() {
        let c = classify("Ayuda a Entenderme");
        assert_eq!(
            c,
            Classification::FaqCategory {
                template: FaqTemplate::ExplainToFamily,
                prompt: EXPLAIN_TO_FAMILY_PROMPT.to_string(),
            }
        );
        assert!(c.instructions().unwrap().contains("7. Conclusión"));
    }

    #[test]
    fn overview_uses_short_template() {
        let c = classify("Entender DPDR");
        assert_eq!(c.prompt(), Some("entender dpdr"));
        assert_eq!(c.instructions(), Some(GENERAL_OVERVIEW_INSTRUCTIONS));
    }

    #[test]
    fn other_text_is_content_with_generic_instructions() {
        let c = classify("¿Es peligroso el DPDR?");
        assert_eq!(c.prompt(), Some("¿es peligroso el dpdr?"));
        assert_eq!(c.instructions(), Some(CONTENT_INSTRUCTIONS));
        assert!(c.needs_backend());
    }

    #[test]
    fn feedback_prompt_suppression_is_substring_based() {
        assert!(suppresses_feedback_prompt("Muchas gracias por la info"));
        assert!(suppresses_feedback_prompt("fue útil"));
        assert!(!suppresses_feedback_prompt("entender dpdr"));
        assert!(!suppresses_feedback_prompt("¿qué es la desrealización?"));
    }
}
