use crate::draw::model::{Color, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store key holding the shared tool/color/size/enabled record.
pub const PREFERENCES_KEY: &str = "epicPenState";
/// Store key holding page-independent options.
pub const SETTINGS_KEY: &str = "epicPenSettings";

/// The preference record every surface mirrors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawPreferences {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default = "default_tool")]
    pub current_tool: Tool,
    #[serde(default = "default_color")]
    pub current_color: Color,
    #[serde(default = "default_stroke_size")]
    pub stroke_size: u32,
}

impl Default for DrawPreferences {
    fn default() -> Self {
        Self {
            is_enabled: false,
            current_tool: default_tool(),
            current_color: default_color(),
            stroke_size: default_stroke_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawSettings {
    #[serde(default = "default_true")]
    pub show_status_indicator: bool,
    #[serde(default = "default_true")]
    pub confirm_clear: bool,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            show_status_indicator: true,
            confirm_clear: true,
        }
    }
}

fn default_tool() -> Tool {
    Tool::Pen
}

fn default_color() -> Color {
    Color::RED
}

fn default_stroke_size() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

/// Fields recovered from a stored preference value. Each field is read on
/// its own so one malformed entry does not discard the rest; missing,
/// mistyped or zero values come back as `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub is_enabled: Option<bool>,
    pub current_tool: Option<Tool>,
    pub current_color: Option<Color>,
    pub stroke_size: Option<u32>,
}

impl PreferencesPatch {
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null());
        Self {
            is_enabled: field("isEnabled").and_then(Value::as_bool),
            current_tool: field("currentTool")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            current_color: field("currentColor")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            stroke_size: field("strokeSize")
                .and_then(Value::as_u64)
                .filter(|size| *size > 0)
                .and_then(|size| u32::try_from(size).ok()),
        }
    }

    pub fn apply_to(&self, preferences: &mut DrawPreferences) {
        if let Some(enabled) = self.is_enabled {
            preferences.is_enabled = enabled;
        }
        if let Some(tool) = self.current_tool {
            preferences.current_tool = tool;
        }
        if let Some(color) = self.current_color {
            preferences.current_color = color;
        }
        if let Some(size) = self.stroke_size {
            preferences.stroke_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preferences_use_camel_case_wire_names() {
        let value = serde_json::to_value(DrawPreferences::default()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "isEnabled": false,
                "currentTool": "pen",
                "currentColor": "#FF0000",
                "strokeSize": 4
            })
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let prefs: DrawPreferences =
            serde_json::from_value(json!({ "currentTool": "arrow" })).expect("deserialize");
        assert_eq!(prefs.current_tool, Tool::Arrow);
        assert_eq!(prefs.current_color, Color::RED);
        assert_eq!(prefs.stroke_size, 4);
        assert!(!prefs.is_enabled);

        let settings: DrawSettings = serde_json::from_value(json!({})).expect("settings");
        assert_eq!(settings, DrawSettings::default());
    }

    #[test]
    fn patch_skips_malformed_fields() {
        let patch = PreferencesPatch::from_value(&json!({
            "isEnabled": true,
            "currentTool": "spray-can",
            "currentColor": "#00FF00",
            "strokeSize": 0
        }));
        assert_eq!(
            patch,
            PreferencesPatch {
                is_enabled: Some(true),
                current_tool: None,
                current_color: Some(Color::rgb(0, 255, 0)),
                stroke_size: None,
            }
        );

        let mut prefs = DrawPreferences::default();
        patch.apply_to(&mut prefs);
        assert!(prefs.is_enabled);
        assert_eq!(prefs.current_tool, Tool::Pen);
        assert_eq!(prefs.current_color, Color::rgb(0, 255, 0));
    }
}
