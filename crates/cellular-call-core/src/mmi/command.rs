//! Dial string classification per the 3GPP TS 22.030 MMI grammar

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ClirMode;

// 1 = full code, 2 = action, 3 = service code, 5/7/9 = SIA/SIB/SIC,
// 11 = password, 12 = trailing dial string
static MMI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((\*|#|\*#|\*\*|##)(\d{2,3})(\*([^*#]*)(\*([^*#]*)(\*([^*#]*)(\*([^*#]*))?)?)?)?#)(.*)$")
        .expect("MMI pattern is valid")
});

/// Service codes whose trailing dial string carries a per-call CLIR prefix
const CLIR_PREFIX_CODES: [&str; 2] = ["30", "31"];

/// Action prefix of a supplementary service code
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MmiAction {
    /// `*`
    Activate,
    /// `#`
    Deactivate,
    /// `*#`
    Interrogate,
    /// `**`
    Register,
    /// `##`
    Erase,
}

impl MmiAction {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "*" => Some(MmiAction::Activate),
            "#" => Some(MmiAction::Deactivate),
            "*#" => Some(MmiAction::Interrogate),
            "**" => Some(MmiAction::Register),
            "##" => Some(MmiAction::Erase),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            MmiAction::Activate => "*",
            MmiAction::Deactivate => "#",
            MmiAction::Interrogate => "*#",
            MmiAction::Register => "**",
            MmiAction::Erase => "##",
        }
    }
}

/// A parsed supplementary service control sequence.
///
/// Commands recognised only by their trailing `#` keep every structured
/// field empty and carry the raw input in `full_string`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmiCommand {
    pub full_string: String,
    pub action: Option<MmiAction>,
    pub service_code: String,
    pub service_info_a: String,
    pub service_info_b: String,
    pub service_info_c: String,
    pub password: String,
    pub dial_string: String,
}

impl MmiCommand {
    /// Parse a dial string, returning `None` when it should be dialled as is
    pub fn parse(dial_string: &str) -> Option<Self> {
        if dial_string.is_empty() {
            return None;
        }

        if let Some(caps) = MMI_PATTERN.captures(dial_string) {
            let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
            return Some(Self {
                full_string: group(1),
                action: caps.get(2).and_then(|m| MmiAction::from_symbol(m.as_str())),
                service_code: group(3),
                service_info_a: group(5),
                service_info_b: group(7),
                service_info_c: group(9),
                password: group(11),
                dial_string: group(12),
            });
        }

        if dial_string.ends_with('#') {
            return Some(Self {
                full_string: dial_string.to_string(),
                ..Default::default()
            });
        }

        None
    }

    /// Whether only the raw string is known
    pub fn is_unstructured(&self) -> bool {
        self.service_code.is_empty()
    }

    /// CLIR mode requested by a `*30#number` style prefix.
    ///
    /// Such a dial string is an ordinary call with adjusted caller id
    /// presentation, not a supplementary service request.
    pub fn clir_override(&self) -> Option<ClirMode> {
        if self.dial_string.is_empty() || !CLIR_PREFIX_CODES.contains(&self.service_code.as_str()) {
            return None;
        }
        Some(match self.action {
            Some(MmiAction::Activate) => ClirMode::Invocation,
            Some(MmiAction::Deactivate) => ClirMode::Suppression,
            _ => ClirMode::Default,
        })
    }
}

/// Whether `dial_string` must be handled as a supplementary service code
/// rather than dialled.
pub fn needs_mmi_handling(dial_string: &str) -> bool {
    match MmiCommand::parse(dial_string) {
        Some(command) => command.clir_override().is_none(),
        None => false,
    }
}
