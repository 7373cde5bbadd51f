//! Capture templates and their embedded configuration.

use chrono::{DateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::TemplateId;

/// Pan direction applied to the portrait crop during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    #[default]
    None,
    Left,
    Right,
}

/// Pan configuration for the portrait crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PanConfig {
    /// Direction of the pan across the source frame.
    #[serde(default)]
    pub direction: PanDirection,

    /// Pan speed in normalized frame-widths per second.
    #[serde(default = "default_pan_speed")]
    pub speed: f32,
}

fn default_pan_speed() -> f32 {
    0.05
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            direction: PanDirection::None,
            speed: default_pan_speed(),
        }
    }
}

/// AI content-generation configuration embedded in a template.
///
/// Prompt slots are passed verbatim to the external content generator;
/// the core never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AiConfig {
    /// Overall tone (e.g. "energetic", "deadpan").
    #[serde(default)]
    pub tone: Option<String>,

    /// Narration voice identifier.
    #[serde(default)]
    pub voice: Option<String>,

    /// Free-form generation instructions.
    #[serde(default)]
    pub instructions: Option<String>,

    /// Headline prompt slot.
    #[serde(default)]
    pub headline_prompt: Option<String>,

    /// Caption prompt slot.
    #[serde(default)]
    pub caption_prompt: Option<String>,

    /// Hashtag prompt slot.
    #[serde(default)]
    pub hashtag_prompt: Option<String>,

    /// Opening-hook prompt slot.
    #[serde(default)]
    pub hook_prompt: Option<String>,

    /// Call-to-action prompt slot.
    #[serde(default)]
    pub cta_prompt: Option<String>,
}

impl AiConfig {
    /// Passthrough config carrying only a tone, used when no template applies.
    pub fn passthrough(tone: impl Into<String>) -> Self {
        Self {
            tone: Some(tone.into()),
            ..Default::default()
        }
    }
}

/// Overlay text styling applied during processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayStyle {
    /// Font family name.
    #[serde(default = "default_font")]
    pub font: String,

    /// Vertical anchor for headline text.
    #[serde(default)]
    pub position: OverlayPosition,

    /// Primary text color (hex).
    #[serde(default = "default_primary_color")]
    pub primary_color: String,

    /// Accent/outline color (hex).
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
}

/// Vertical anchor for overlay text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

fn default_font() -> String {
    "Inter".to_string()
}

fn default_primary_color() -> String {
    "#ffffff".to_string()
}

fn default_accent_color() -> String {
    "#ff3355".to_string()
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font: default_font(),
            position: OverlayPosition::default(),
            primary_color: default_primary_color(),
            accent_color: default_accent_color(),
        }
    }
}

/// How finished posts built from a template get published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Operator downloads and posts by hand.
    #[default]
    Manual,
    /// Posted automatically once ready.
    Auto,
    /// Posted at the next configured schedule time.
    Scheduled,
}

/// Reusable capture configuration bundle.
///
/// Administrative edits never retroactively change posts already queued;
/// the resolver snapshots a template at admission time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReelTemplate {
    /// Unique template id.
    pub id: TemplateId,

    /// Human-readable name.
    pub name: String,

    /// Default camera bound to this template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,

    /// Default camera preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,

    /// Clip duration in seconds.
    pub clip_duration_secs: u32,

    /// Pan configuration.
    #[serde(default)]
    pub pan: PanConfig,

    /// AI content-generation configuration.
    #[serde(default)]
    pub ai: AiConfig,

    /// Overlay text styling.
    #[serde(default)]
    pub overlay: OverlayStyle,

    /// Publish mode for finished posts.
    #[serde(default)]
    pub publish_mode: PublishMode,

    /// Daily schedule slots (for `PublishMode::Scheduled`).
    #[serde(default)]
    pub schedule_times: Vec<NaiveTime>,

    /// Title template with `{camera}`/`{date}` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_template: Option<String>,

    /// Description template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_template: Option<String>,

    /// Hashtag template (space-separated tags).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags_template: Option<String>,

    /// Inactive templates cannot be referenced by new capture requests.
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl ReelTemplate {
    /// Create a new active template with defaults.
    pub fn new(name: impl Into<String>, clip_duration_secs: u32) -> Self {
        let now = Utc::now();
        Self {
            id: TemplateId::new(),
            name: name.into(),
            camera_id: None,
            preset_id: None,
            clip_duration_secs,
            pan: PanConfig::default(),
            ai: AiConfig::default(),
            overlay: OverlayStyle::default(),
            publish_mode: PublishMode::default(),
            schedule_times: Vec::new(),
            title_template: None,
            description_template: None,
            hashtags_template: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bind a default camera.
    pub fn with_camera(mut self, camera_id: impl Into<String>) -> Self {
        self.camera_id = Some(camera_id.into());
        self
    }

    /// Bind a default preset.
    pub fn with_preset(mut self, preset_id: impl Into<String>) -> Self {
        self.preset_id = Some(preset_id.into());
        self
    }

    /// Deactivate the template and bump `updated_at`.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_defaults() {
        let tpl = ReelTemplate::new("lobby cam", 30);
        assert!(tpl.is_active);
        assert_eq!(tpl.clip_duration_secs, 30);
        assert_eq!(tpl.pan.direction, PanDirection::None);
        assert!(tpl.camera_id.is_none());
    }

    #[test]
    fn test_template_deactivate() {
        let mut tpl = ReelTemplate::new("lobby cam", 30);
        tpl.deactivate();
        assert!(!tpl.is_active);
        assert!(tpl.updated_at >= tpl.created_at);
    }

    #[test]
    fn test_ai_config_passthrough() {
        let ai = AiConfig::passthrough("neutral");
        assert_eq!(ai.tone.as_deref(), Some("neutral"));
        assert!(ai.headline_prompt.is_none());
    }
}
