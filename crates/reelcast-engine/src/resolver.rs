//! Template resolution for capture requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reelcast_models::{AiConfig, OverlayStyle, PanConfig, ReelTemplate, TemplateId};

use crate::config::EngineConfig;

/// An incoming capture request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Camera to capture from; falls back to the template's bound camera.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,

    /// Preset override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,

    /// Template to resolve against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,

    /// Queue priority; higher is served first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Deadline after which the request must not be executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CaptureRequest {
    /// Request an ad-hoc capture from a camera with no template.
    pub fn for_camera(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: Some(camera_id.into()),
            preset_id: None,
            template_id: None,
            priority: None,
            expires_at: None,
        }
    }

    /// Request a capture from a template's defaults.
    pub fn from_template(template_id: TemplateId) -> Self {
        Self {
            camera_id: None,
            preset_id: None,
            template_id: Some(template_id),
            priority: None,
            expires_at: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Fully resolved capture/processing parameters for one post.
///
/// Snapshotted at admission; later template edits never affect it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedJobSpec {
    pub camera_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    pub clip_duration_secs: u32,
    pub pan: PanConfig,
    pub ai: AiConfig,
    pub overlay: OverlayStyle,
}

/// Resolves capture requests against template snapshots.
///
/// Pure over its inputs: the caller loads (and validity-checks) the template
/// snapshot, so resolution is deterministic and side-effect free.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    default_clip_duration_secs: u32,
}

/// Error cases the caller maps into the engine taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Neither the request nor the template names a camera.
    MissingCamera,
}

impl TemplateResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            default_clip_duration_secs: config.default_clip_duration_secs,
        }
    }

    /// Merge request-level overrides onto template defaults.
    ///
    /// Without a template the product-wide defaults apply: configured clip
    /// duration, no pan, default overlay, passthrough AI tone.
    pub fn resolve(
        &self,
        request: &CaptureRequest,
        template: Option<&ReelTemplate>,
    ) -> Result<ResolvedJobSpec, ResolveError> {
        match template {
            Some(tpl) => {
                let camera_id = request
                    .camera_id
                    .clone()
                    .or_else(|| tpl.camera_id.clone())
                    .ok_or(ResolveError::MissingCamera)?;
                Ok(ResolvedJobSpec {
                    camera_id,
                    preset_id: request.preset_id.clone().or_else(|| tpl.preset_id.clone()),
                    template_id: Some(tpl.id.clone()),
                    clip_duration_secs: tpl.clip_duration_secs,
                    pan: tpl.pan,
                    ai: tpl.ai.clone(),
                    overlay: tpl.overlay.clone(),
                })
            }
            None => {
                let camera_id = request.camera_id.clone().ok_or(ResolveError::MissingCamera)?;
                Ok(ResolvedJobSpec {
                    camera_id,
                    preset_id: request.preset_id.clone(),
                    template_id: None,
                    clip_duration_secs: self.default_clip_duration_secs,
                    pan: PanConfig::default(),
                    ai: AiConfig::passthrough("neutral"),
                    overlay: OverlayStyle::default(),
                })
            }
        }
    }
}
