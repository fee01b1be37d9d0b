//! Runtime configuration.
//!
//! The assistant variants differ only in model, offered modes and answer format, so
//! they are expressed as [`VariantProfile`]s over one pipeline. Values come from the
//! environment (a `.env` file is loaded by the binaries) and may be overridden on the
//! command line.

use crate::error::{HackerbotError, Result};
use crate::hardware::{open_arm, open_frame_source, ArmConfig, CameraConfig, SharedHardware};
use crate::llm::gateways::{GeminiConfig, GeminiGateway, OllamaConfig, OllamaGateway};
use crate::llm::{LlmBroker, LlmGateway};
use crate::session::InteractionMode;
use crate::vision::bounding_box::{BoxParser, BoxSpace};
use crate::vision::geometry::{CameraModel, JointLimits};
use crate::vision::prompts::{locate_prompt, BOUNDING_BOX_MARKER};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Hosted or local model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Ollama,
}

impl FromStr for Provider {
    type Err = HackerbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(HackerbotError::ConfigError(format!("unknown provider '{}'", other))),
        }
    }
}

/// Behavior that varied between the assistant variants.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantProfile {
    pub name: String,
    pub model: String,
    pub modes: Vec<InteractionMode>,
    pub marker: Option<String>,
    pub space: BoxSpace,
}

impl VariantProfile {
    /// Chat, locate and center; marker-prefixed normalized boxes.
    pub fn arm() -> Self {
        Self {
            name: "arm".to_string(),
            model: "gemini-2.5-pro-preview-05-06".to_string(),
            modes: InteractionMode::ALL.to_vec(),
            marker: Some(BOUNDING_BOX_MARKER.to_string()),
            space: BoxSpace::Normalized,
        }
    }

    /// Chat and locate only; the whole reply is a pixel-space box.
    pub fn locate() -> Self {
        Self {
            name: "locate".to_string(),
            model: "gemini-2.0-flash".to_string(),
            modes: vec![InteractionMode::Chat, InteractionMode::Locate],
            marker: None,
            space: BoxSpace::Pixel,
        }
    }

    pub fn by_name(name: &str) -> Result<Self> {
        match name.trim() {
            "arm" => Ok(Self::arm()),
            "locate" => Ok(Self::locate()),
            other => Err(HackerbotError::ConfigError(format!("unknown variant '{}'", other))),
        }
    }

    pub fn offers(&self, mode: InteractionMode) -> bool {
        self.modes.contains(&mode)
    }

    /// The arm is only touched by profiles that can center.
    pub fn drives_arm(&self) -> bool {
        self.offers(InteractionMode::Center)
    }

    pub fn parser(&self) -> BoxParser {
        BoxParser::new(self.marker.as_deref(), self.space)
    }

    pub fn locate_prompt(&self, target: &str, width: u32, height: u32) -> String {
        locate_prompt(target, self.space, self.marker.as_deref(), width, height)
    }
}

const DEFAULT_OLLAMA_MODEL: &str = "qwen3-vl:30b";

/// Everything the chat assistant needs to start.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub provider: Provider,
    pub variant: VariantProfile,
    pub camera: CameraConfig,
    pub arm: ArmConfig,
    pub camera_model: CameraModel,
    pub joint_limits: JointLimits,
    pub output_dir: PathBuf,
    pub gemini: GeminiConfig,
    pub ollama: OllamaConfig,
}

impl AssistantConfig {
    /// Read `HACKERBOT_*` and provider variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let provider: Provider = env_parse("HACKERBOT_PROVIDER", Provider::Gemini)?;

        let variant = match std::env::var("HACKERBOT_VARIANT") {
            Ok(name) => VariantProfile::by_name(&name)?,
            Err(_) => VariantProfile::arm(),
        };

        let mut camera = CameraConfig::default();
        camera.width = env_parse("HACKERBOT_CAPTURE_WIDTH", camera.width)?;
        camera.height = env_parse("HACKERBOT_CAPTURE_HEIGHT", camera.height)?;
        let fov = env_parse("HACKERBOT_FOV_DEGREES", CameraModel::default().fov_degrees)?;
        let camera_model = CameraModel::new(camera.width, camera.height, fov)?;

        let mut config = Self {
            provider,
            variant,
            camera,
            arm: ArmConfig::default(),
            camera_model,
            joint_limits: JointLimits::default(),
            output_dir: std::env::var("HACKERBOT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("hackerbot-images")),
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
        };
        let model = std::env::var("HACKERBOT_MODEL").ok();
        config.apply_overrides(None, None, model.as_deref())?;
        Ok(config)
    }

    /// Replace provider, variant and model. Without an explicit model the provider's
    /// default for the variant is used.
    pub fn apply_overrides(
        &mut self,
        provider: Option<&str>,
        variant: Option<&str>,
        model: Option<&str>,
    ) -> Result<()> {
        if let Some(provider) = provider {
            self.provider = provider.parse()?;
        }
        if let Some(name) = variant {
            self.variant = VariantProfile::by_name(name)?;
        }

        self.variant.model = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => model.to_string(),
            None => match self.provider {
                Provider::Gemini => VariantProfile::by_name(&self.variant.name)?.model,
                Provider::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
            },
        };
        Ok(())
    }

    /// Connect the configured provider. Fails when its credential is missing.
    pub fn build_broker(&self) -> Result<LlmBroker> {
        let gateway: Arc<dyn LlmGateway> = match self.provider {
            Provider::Gemini => Arc::new(GeminiGateway::with_config(self.gemini.clone())?),
            Provider::Ollama => Arc::new(OllamaGateway::with_config(self.ollama.clone())?),
        };
        Ok(LlmBroker::new(self.variant.model.clone(), gateway))
    }

    /// Open the camera, and the arm when the variant can center.
    pub fn build_hardware(&self) -> Result<SharedHardware> {
        let camera = open_frame_source(&self.camera)?;
        let arm = self.variant.drives_arm().then(|| open_arm(&self.arm));
        Ok(SharedHardware::new(camera, arm))
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| HackerbotError::ConfigError(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
        assert!(matches!("openai".parse::<Provider>(), Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_arm_profile() {
        let profile = VariantProfile::arm();

        assert_eq!(profile.modes, InteractionMode::ALL.to_vec());
        assert_eq!(profile.marker.as_deref(), Some("BOUNDING BOX: "));
        assert_eq!(profile.space, BoxSpace::Normalized);
        assert!(profile.drives_arm());
    }

    #[test]
    fn test_locate_profile() {
        let profile = VariantProfile::locate();

        assert!(!profile.offers(InteractionMode::Center));
        assert!(!profile.drives_arm());
        assert_eq!(profile.marker, None);
        assert_eq!(profile.parser().space(), BoxSpace::Pixel);
    }

    #[test]
    fn test_profile_by_name() {
        assert_eq!(VariantProfile::by_name("locate").unwrap().name, "locate");
        assert!(matches!(VariantProfile::by_name("mcp"), Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_profile_prompt_uses_its_format() {
        let prompt = VariantProfile::arm().locate_prompt("blue ball", 640, 480);

        assert!(prompt.contains("\"blue ball\""));
        assert!(prompt.contains("BOUNDING BOX: "));
    }

    #[test]
    fn test_apply_overrides_resolves_model() {
        let mut config = AssistantConfig::from_env().unwrap();

        config.apply_overrides(Some("gemini"), Some("locate"), None).unwrap();
        assert_eq!(config.variant.model, "gemini-2.0-flash");
        assert!(!config.variant.drives_arm());

        config.apply_overrides(Some("ollama"), None, None).unwrap();
        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.variant.model, "qwen3-vl:30b");

        config.apply_overrides(None, Some("arm"), Some("llava:13b")).unwrap();
        assert_eq!(config.variant.model, "llava:13b");
        assert_eq!(config.variant.name, "arm");
    }

    #[test]
    fn test_apply_overrides_rejects_unknown_variant() {
        let mut config = AssistantConfig::from_env().unwrap();

        let result = config.apply_overrides(None, Some("mcp"), None);

        assert!(matches!(result, Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_env_parse_default_and_error() {
        assert_eq!(env_parse("HACKERBOT_TEST_UNSET_KEY", 7u32).unwrap(), 7);

        std::env::set_var("HACKERBOT_TEST_BAD_NUMBER", "wide");
        let result = env_parse::<u32>("HACKERBOT_TEST_BAD_NUMBER", 640);
        std::env::remove_var("HACKERBOT_TEST_BAD_NUMBER");

        assert!(matches!(result, Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_build_broker_requires_gemini_key() {
        let mut config = AssistantConfig::from_env().unwrap();
        config.provider = Provider::Gemini;
        config.gemini.api_key = String::new();

        assert!(matches!(config.build_broker(), Err(HackerbotError::ConfigError(_))));
    }

    #[test]
    fn test_build_hardware_skips_arm_for_locate_profile() {
        let mut config = AssistantConfig::from_env().unwrap();
        config.variant = VariantProfile::locate();
        config.camera.device = "stub://".to_string();

        let hardware = config.build_hardware().unwrap();

        assert!(!hardware.has_arm());
    }
}
