// ============================
// dropmate-backend-lib/src/commands.rs
// ============================
//! Owner commands arriving as chat text or rich-menu postbacks.
//!
//! Text: `<verb> [LOCKER_ID]`. The verb is the first whitespace-separated
//! token, matched whole and case-insensitively against its English or Thai
//! spelling. Postbacks: form-encoded `action=<verb>&locker_id=<id>`.
use serde::Deserialize;

/// What the owner asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerCommand {
    Status(String),
    Disable(String),
    Enable(String),
    Unlock(String),
}

/// Verb without its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Status,
    Disable,
    Enable,
    Unlock,
}

impl Verb {
    /// Whole-token match; the token must already be lowercased.
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "status" | "สถานะ" => Some(Verb::Status),
            "disable" | "ปิด" => Some(Verb::Disable),
            "enable" | "เปิด" => Some(Verb::Enable),
            "unlock" | "ปลดล็อก" => Some(Verb::Unlock),
            _ => None,
        }
    }

    fn with_locker(self, locker_id: String) -> OwnerCommand {
        match self {
            Verb::Status => OwnerCommand::Status(locker_id),
            Verb::Disable => OwnerCommand::Disable(locker_id),
            Verb::Enable => OwnerCommand::Enable(locker_id),
            Verb::Unlock => OwnerCommand::Unlock(locker_id),
        }
    }
}

impl OwnerCommand {
    /// Parse a chat message. `None` means "show the help text".
    pub fn parse_text(text: &str, default_locker_id: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let verb = Verb::from_token(&tokens.next()?.to_lowercase())?;
        let locker_id = tokens.next().unwrap_or(default_locker_id).to_string();
        Some(verb.with_locker(locker_id))
    }

    /// Parse rich-menu postback data. `None` means an unknown action.
    pub fn parse_postback(data: &str, default_locker_id: &str) -> Option<Self> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Postback {
            action: String,
            locker_id: String,
        }

        let postback: Postback = serde_urlencoded::from_str(data).unwrap_or_default();
        let verb = Verb::from_token(&postback.action.trim().to_lowercase())?;
        let locker_id = match postback.locker_id.trim() {
            "" => default_locker_id.to_string(),
            id => id.to_string(),
        };
        Some(verb.with_locker(locker_id))
    }

    pub fn locker_id(&self) -> &str {
        match self {
            OwnerCommand::Status(id)
            | OwnerCommand::Disable(id)
            | OwnerCommand::Enable(id)
            | OwnerCommand::Unlock(id) => id.as_str(),
        }
    }
}

/// Reply for anything that is not a command.
pub fn help_text(default_locker_id: &str) -> String {
    format!(
        "คำสั่ง:\n\
         • สถานะ [LOCKER_ID]  → แสดง QR & ประตู\n\
         • เปิด [LOCKER_ID]    → เปิด QR\n\
         • ปิด [LOCKER_ID]     → ปิด QR\n\
         • ปลดล็อก [LOCKER_ID] → เปิดประตูชั่วคราว\n\
         (ไม่ใส่ LOCKER_ID จะใช้ {default_locker_id})"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "LOCKER001";

    #[test]
    fn english_and_thai_verbs() {
        assert_eq!(
            OwnerCommand::parse_text("status", DEFAULT),
            Some(OwnerCommand::Status(DEFAULT.to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_text("สถานะ L3", DEFAULT),
            Some(OwnerCommand::Status("L3".to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_text("ปิด", DEFAULT),
            Some(OwnerCommand::Disable(DEFAULT.to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_text("  Enable   L9 ", DEFAULT),
            Some(OwnerCommand::Enable("L9".to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_text("ปลดล็อก L2", DEFAULT),
            Some(OwnerCommand::Unlock("L2".to_string()))
        );
    }

    #[test]
    fn verbs_are_case_insensitive_but_ids_keep_their_case() {
        assert_eq!(
            OwnerCommand::parse_text("UNLOCK Locker-A", DEFAULT),
            Some(OwnerCommand::Unlock("Locker-A".to_string()))
        );
    }

    #[test]
    fn verbs_match_whole_tokens_only() {
        for text in ["statuses", "unlocked L1", "please unlock", "ปิดตู้", "เปิดประตู", "", "   "] {
            assert_eq!(OwnerCommand::parse_text(text, DEFAULT), None, "{text:?}");
        }
    }

    #[test]
    fn postback_data() {
        assert_eq!(
            OwnerCommand::parse_postback("action=unlock&locker_id=L7", DEFAULT),
            Some(OwnerCommand::Unlock("L7".to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_postback("action=STATUS", DEFAULT),
            Some(OwnerCommand::Status(DEFAULT.to_string()))
        );
        assert_eq!(
            OwnerCommand::parse_postback("locker_id=L%20B&action=disable", DEFAULT),
            Some(OwnerCommand::Disable("L B".to_string()))
        );
        assert_eq!(OwnerCommand::parse_postback("action=explode", DEFAULT), None);
        assert_eq!(OwnerCommand::parse_postback("", DEFAULT), None);
    }

    #[test]
    fn help_lists_all_four_verbs() {
        let help = help_text(DEFAULT);
        for verb in ["สถานะ", "เปิด", "ปิด", "ปลดล็อก", DEFAULT] {
            assert!(help.contains(verb), "{verb}");
        }
    }
}
