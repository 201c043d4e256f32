use crate::draw::model::Tool;
use crate::draw::settings::DrawPreferences;
use serde::{Deserialize, Serialize};

/// Commands sent to a page overlay by the popup, the background worker or
/// keyboard shortcuts. Wire shape is `{"action": "...", ...payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    ToggleDrawing { enabled: bool },
    SetTool { tool: Tool },
    /// Kept as the raw string; an unparseable value leaves the color as is.
    SetColor { color: String },
    SetStrokeSize { size: u32 },
    Undo,
    Redo,
    Clear,
    GetState,
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::ToggleDrawing { .. } => "toggleDrawing",
            Command::SetTool { .. } => "setTool",
            Command::SetColor { .. } => "setColor",
            Command::SetStrokeSize { .. } => "setStrokeSize",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::Clear => "clear",
            Command::GetState => "getState",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    Ack { success: bool },
    State(DrawPreferences),
}

impl CommandReply {
    pub fn ack() -> Self {
        CommandReply::Ack { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::model::Color;
    use serde_json::json;

    #[test]
    fn commands_parse_from_extension_messages() {
        let cases = [
            (
                json!({ "action": "toggleDrawing", "enabled": true }),
                Command::ToggleDrawing { enabled: true },
            ),
            (
                json!({ "action": "setTool", "tool": "highlighter" }),
                Command::SetTool {
                    tool: Tool::Highlighter,
                },
            ),
            (
                json!({ "action": "setColor", "color": "#00ff00" }),
                Command::SetColor {
                    color: "#00ff00".into(),
                },
            ),
            (
                json!({ "action": "setStrokeSize", "size": 12 }),
                Command::SetStrokeSize { size: 12 },
            ),
            (json!({ "action": "undo" }), Command::Undo),
            (json!({ "action": "getState" }), Command::GetState),
        ];
        for (value, expected) in cases {
            let command: Command = serde_json::from_value(value).expect("parse command");
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn unknown_actions_and_tools_are_rejected() {
        assert!(serde_json::from_value::<Command>(json!({ "action": "explode" })).is_err());
        assert!(serde_json::from_value::<Command>(json!({
            "action": "setTool",
            "tool": "spray"
        }))
        .is_err());
    }

    #[test]
    fn replies_match_extension_responses() {
        assert_eq!(
            serde_json::to_value(CommandReply::ack()).expect("ack"),
            json!({ "success": true })
        );
        let state = CommandReply::State(DrawPreferences {
            is_enabled: true,
            current_tool: Tool::Text,
            current_color: Color::rgb(0, 0, 255),
            stroke_size: 6,
        });
        assert_eq!(
            serde_json::to_value(state).expect("state"),
            json!({
                "isEnabled": true,
                "currentTool": "text",
                "currentColor": "#0000FF",
                "strokeSize": 6
            })
        );
        assert_eq!(Command::SetStrokeSize { size: 1 }.action(), "setStrokeSize");
    }
}
