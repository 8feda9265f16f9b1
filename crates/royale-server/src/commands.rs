use serde::{Deserialize, Serialize};

use royale_core::parser::{CombatParameters, parse_combat_parameters};
use royale_core::participant::AvatarColor;

/// One chat line as delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable sender handle; becomes the participant id.
    pub sender: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sender's chat colour as `#RRGGBB`, when the transport knows it.
    #[serde(default)]
    pub chat_color: Option<String>,
    pub text: String,
}

/// A recognised chat command. Anything that does not parse into one of
/// these is dropped without reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Join the match, or recolour an existing avatar.
    Join { color: Option<AvatarColor> },
    /// Turn by this many degrees.
    Direction(i32),
    /// Tilt by this many degrees, already in engine convention (negative is up).
    Elevation(i32),
    Power(i32),
    Lifetime(f64),
    Aim(CombatParameters),
    Cancel,
    Relocate,
    Teleport { direction: Option<i32> },
    StartRounds,
    NewArena,
    Hazard,
}

impl ChatCommand {
    /// Lowercase the message, split on whitespace, and match the first token.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        let mut tokens = lowered.split_whitespace();
        let command = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        let parsed = match command {
            "!join" | "!color" => match args.first() {
                Some(name) => ChatCommand::Join {
                    color: Some(AvatarColor::from_name(name)?),
                },
                None => ChatCommand::Join { color: None },
            },
            "!direction" => ChatCommand::Direction(first_int(&args)?),
            // Operators type positive for up.
            "!elevation" => ChatCommand::Elevation(first_int(&args)?.checked_neg()?),
            "!power" => ChatCommand::Power(first_int(&args)?),
            "!lifetime" => {
                let value = args.first()?.parse::<f64>().ok()?;
                if !value.is_finite() {
                    return None;
                }
                ChatCommand::Lifetime(value)
            },
            "!aim" => ChatCommand::Aim(parse_combat_parameters(&args)?),
            "!cancel" | "!stop" => ChatCommand::Cancel,
            "!relocate" => ChatCommand::Relocate,
            "!teleport" | "!tp" => ChatCommand::Teleport {
                direction: match args.first() {
                    Some(arg) => Some(arg.parse::<i32>().ok()?),
                    None => None,
                },
            },
            "!startrounds" => ChatCommand::StartRounds,
            "!newarena" => ChatCommand::NewArena,
            "!hazard" => ChatCommand::Hazard,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            ChatCommand::StartRounds | ChatCommand::NewArena | ChatCommand::Hazard
        )
    }
}

fn first_int(args: &[&str]) -> Option<i32> {
    args.first()?.parse::<i32>().ok()
}
