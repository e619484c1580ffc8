use dpdrbot_conversation::UsageReport;
use dpdrbot_core::{OutboundMessage, PlanCatalog, PlanId};
use std::fmt::Write;
use teloxide::types::BotCommand;

const WELCOME: &str = "¡Hola! Soy un asistente especializado en los síntomas de la ansiedad DPDR (despersonalización y desrealización). \
Puedo ayudarte con información y consejos basados en guías y recursos especializados.\n\n\
📌 Comandos disponibles:\n\
/faq - Ver categorías principales\n\
/help - Ver todos los comandos\n\
/plan - Ver tu plan actual y límites\n\
/reset - Reiniciar conversación\n\n\
¿En qué puedo ayudarte?";

const HELP: &str = "Comandos disponibles:\n\
/start - Inicia el bot\n\
/help - Muestra esta ayuda\n\
/reset - Reinicia tu conversación\n\
/faq - Categorías de preguntas frecuentes\n\
/feedback - Valora la última respuesta\n\
/plan - Tu plan actual y límites\n\
/upgrade - Mejora tu plan\n\
\nPuedes preguntarme cualquier cosa sobre DPDR y despersonalización.";

pub const RESET_DONE: &str = "He reiniciado tu conversación. Puedes empezar de nuevo.";

const FAQ: &str = "Selecciona una categoría:\n\n\
💡 'Entender DPDR' te da una visión general del trastorno.\n\
❤️ 'Ayuda a Entenderme' está pensado para compartir con familiares y \
amigos, ayudándoles a comprender mejor tu experiencia.";

const FAQ_KEYBOARD: [[&str; 2]; 3] = [
    ["Entender DPDR", "Síntomas"],
    ["Tratamientos", "Ejercicios"],
    ["Ayuda a Entenderme", "Recursos"],
];

const FEEDBACK: &str = "¿Te fue útil mi última respuesta?";
const FEEDBACK_KEYBOARD: [[&str; 2]; 1] = [["👍 Útil", "👎 No útil"]];

const UPGRADE_CANCEL: &str = "❌ Cancelar";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Reset,
    Faq,
    Feedback,
    Plan,
    Upgrade,
}

impl Command {
    fn all() -> Vec<BotCommand> {
        [
            ("start", "Inicia el bot"),
            ("help", "Muestra la ayuda"),
            ("reset", "Reinicia tu conversación"),
            ("faq", "Categorías de preguntas frecuentes"),
            ("feedback", "Valora la última respuesta"),
            ("plan", "Tu plan actual y límites"),
            ("upgrade", "Mejora tu plan"),
        ]
        .into_iter()
        .map(|(command, description)| BotCommand::new(command, description))
        .collect()
    }

    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        Self::all()
    }

    /// Parse the leading command token; arguments after it are ignored.
    #[must_use]
    pub fn parse_from_text(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?.to_lowercase();

        // Remove bot mention if present (e.g., "/plan@my_bot")
        let command = token.split('@').next().unwrap_or(&token);

        match command {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/reset" => Some(Self::Reset),
            "/faq" => Some(Self::Faq),
            "/feedback" => Some(Self::Feedback),
            "/plan" => Some(Self::Plan),
            "/upgrade" => Some(Self::Upgrade),
            _ => None,
        }
    }

    /// Whether `text` is addressed to the bot as a command, known or not.
    #[must_use]
    pub fn is_command(text: &str) -> bool {
        text.trim_start().starts_with('/')
    }

    /// Reply for commands that need no per-user state.
    #[must_use]
    pub fn static_reply(self) -> Option<OutboundMessage> {
        match self {
            Self::Start => Some(OutboundMessage::text(WELCOME)),
            Self::Help => Some(OutboundMessage::text(HELP)),
            Self::Faq => Some(OutboundMessage::text(FAQ).with_keyboard(FAQ_KEYBOARD)),
            Self::Feedback => {
                Some(OutboundMessage::text(FEEDBACK).with_keyboard(FEEDBACK_KEYBOARD))
            }
            Self::Upgrade => Some(upgrade_offer()),
            Self::Reset | Self::Plan => None,
        }
    }
}

const fn plan_icon(id: PlanId) -> &'static str {
    match id {
        PlanId::Free => "🆓",
        PlanId::Basic => "💎",
        PlanId::Premium => "👑",
    }
}

const fn plan_title(id: PlanId) -> &'static str {
    match id {
        PlanId::Free => "Free",
        PlanId::Basic => "Basic",
        PlanId::Premium => "Premium",
    }
}

fn upgrade_offer() -> OutboundMessage {
    let mut text = String::from("Selecciona el plan al que quieres actualizar:");
    let mut rows = Vec::new();
    for plan in PlanCatalog::all().into_iter().filter(|plan| plan.id.is_paid()) {
        let icon = plan_icon(plan.id);
        let title = plan_title(plan.id);
        let _ = write!(
            text,
            "\n\n{icon} Plan {title} ({:.2}€/mes):\n- {} mensajes/día\n- {} tokens/día",
            plan.price, plan.daily_message_limit, plan.daily_token_limit
        );
        rows.push(vec![format!("{icon} Plan {title} - {:.2}€/mes", plan.price)]);
    }
    rows.push(vec![UPGRADE_CANCEL.to_string()]);

    OutboundMessage::text(text).with_keyboard(rows)
}

/// Render the `/plan` report: current tier, today's usage and the tier list.
#[must_use]
pub fn format_plan_report(report: &UsageReport) -> String {
    let plan = report.plan;
    let mut text = String::new();
    let _ = writeln!(text, "📊 Tu plan actual: {}", plan.name);
    let _ = writeln!(
        text,
        "📝 Mensajes usados hoy: {}/{}",
        report.usage.message_count, plan.daily_message_limit
    );
    let _ = writeln!(
        text,
        "🔢 Tokens disponibles por día: {}",
        plan.daily_token_limit
    );
    if let Some(expiry) = report.subscription.and_then(|sub| sub.expires_at) {
        let _ = writeln!(
            text,
            "📅 Tu suscripción vence el: {}",
            expiry.format("%d/%m/%Y")
        );
    }

    text.push_str("\n💡 Planes disponibles:\n\n");
    for tier in PlanCatalog::all() {
        let _ = writeln!(text, "{}:", tier.id);
        let _ = writeln!(text, "- {}", tier.tagline);
        let _ = writeln!(text, "- {} mensajes/día", tier.daily_message_limit);
        if tier.id.is_paid() {
            let _ = writeln!(text, "- Precio: {:.2}€/mes", tier.price);
        }
        text.push('\n');
    }

    if !plan.id.is_paid() {
        text.push_str("\n🌟 Usa /upgrade para mejorar tu plan");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use dpdrbot_core::{UsageRecord, UserSubscription};

    fn report(plan: PlanId, used: u32, subscription: Option<UserSubscription>) -> UsageReport {
        let mut usage = UsageRecord::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        usage.message_count = used;
        UsageReport {
            plan: PlanCatalog::resolve(plan),
            usage,
            subscription,
        }
    }

    #[test]
    fn parses_commands_with_mentions() {
        assert_eq!(Command::parse_from_text("/plan@dpdr_bot"), Some(Command::Plan));
        assert_eq!(Command::parse_from_text(" /FAQ "), Some(Command::Faq));
        assert_eq!(Command::parse_from_text("/upgrade"), Some(Command::Upgrade));
        assert_eq!(Command::parse_from_text("plan"), None);
        assert_eq!(Command::parse_from_text("/unknown"), None);
    }

    #[test]
    fn arguments_after_a_command_are_ignored() {
        assert_eq!(Command::parse_from_text("/start ref123"), Some(Command::Start));
        assert_eq!(Command::parse_from_text("/plan hoy"), Some(Command::Plan));
        assert_eq!(
            Command::parse_from_text("/reset@dpdr_bot ahora"),
            Some(Command::Reset)
        );
        assert_eq!(Command::parse_from_text("   "), None);
        assert_eq!(Command::parse_from_text("hola /plan"), None);
    }

    #[test]
    fn unknown_commands_are_still_commands() {
        assert_eq!(Command::parse_from_text("/foo"), None);
        assert!(Command::is_command("/foo"));
        assert!(Command::is_command(" /foo bar"));
        assert!(!Command::is_command("¿qué es /plan?"));
    }

    #[test]
    fn menu_lists_every_command() {
        let names: Vec<_> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(
            names,
            ["start", "help", "reset", "faq", "feedback", "plan", "upgrade"]
        );
    }

    #[test]
    fn faq_offers_category_keyboard() {
        let reply = Command::Faq.static_reply().unwrap();
        let keyboard = reply.keyboard.unwrap();
        assert_eq!(keyboard.len(), 3);
        assert_eq!(keyboard[2], vec!["Ayuda a Entenderme", "Recursos"]);
    }

    #[test]
    fn stateful_commands_have_no_static_reply() {
        assert!(Command::Reset.static_reply().is_none());
        assert!(Command::Plan.static_reply().is_none());
    }

    #[test]
    fn upgrade_lists_paid_tiers() {
        let reply = Command::Upgrade.static_reply().unwrap();
        assert!(reply.text.contains("💎 Plan Basic (2.99€/mes):\n- 10 mensajes/día\n- 5000 tokens/día"));
        assert!(reply.text.contains("👑 Plan Premium (6.99€/mes):\n- 20 mensajes/día\n- 10000 tokens/día"));
        assert_eq!(
            reply.keyboard.unwrap(),
            vec![
                vec!["💎 Plan Basic - 2.99€/mes".to_string()],
                vec!["👑 Plan Premium - 6.99€/mes".to_string()],
                vec!["❌ Cancelar".to_string()],
            ]
        );
    }

    #[test]
    fn free_report_suggests_upgrade() {
        let text = format_plan_report(&report(PlanId::Free, 2, None));
        assert!(text.starts_with("📊 Tu plan actual: Plan básico gratuito\n"));
        assert!(text.contains("📝 Mensajes usados hoy: 2/3\n"));
        assert!(text.contains("🔢 Tokens disponibles por día: 2000\n"));
        assert!(text.contains("BASIC:\n- Para uso regular\n- 10 mensajes/día\n- Precio: 2.99€/mes\n"));
        assert!(!text.contains("vence"));
        assert!(text.ends_with("🌟 Usa /upgrade para mejorar tu plan"));
    }

    #[test]
    fn paid_report_shows_expiry() {
        let expiry = Utc.with_ymd_and_hms(2024, 7, 5, 12, 0, 0).unwrap();
        let sub = UserSubscription::new(PlanId::Premium, Some(expiry));
        let text = format_plan_report(&report(PlanId::Premium, 4, Some(sub)));
        assert!(text.contains("📝 Mensajes usados hoy: 4/20\n"));
        assert!(text.contains("📅 Tu suscripción vence el: 05/07/2024\n"));
        assert!(!text.contains("/upgrade"));
    }
}
