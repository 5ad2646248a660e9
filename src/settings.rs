//! Receiver settings
//!
//! Handles loading/saving of the receiver configuration as XML, either from an
//! explicit path or from `<config dir>/NdiTexture/receiver.xml`.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ndi::{Bandwidth, ColorFormat, RecvOptions};

/// Material property the received frame is bound to by default.
pub const DEFAULT_TARGET_PROPERTY: &str = "_MainTex";

/// Receiver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "NdiReceiver")]
pub struct ReceiverSettings {
    /// Source to receive from, e.g. `STUDIO (Camera 1)`
    #[serde(rename = "ndiName", default)]
    pub ndi_name: String,

    /// Name this receiver announces to senders
    #[serde(rename = "receiverName", default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,

    #[serde(rename = "colorFormat", default)]
    pub color_format: ColorFormat,

    #[serde(rename = "bandwidth", default)]
    pub bandwidth: Bandwidth,

    #[serde(rename = "allowVideoFields", default)]
    pub allow_video_fields: bool,

    /// Material property the received frame is bound to
    #[serde(rename = "targetMaterialProperty", default = "default_target_property")]
    pub target_material_property: String,

    /// Polling rate of the headless receiver (1-240)
    #[serde(rename = "targetFps", default = "default_target_fps")]
    pub target_fps: u32,

    #[serde(rename = "outputWidth", default = "default_output_width")]
    pub output_width: u32,

    #[serde(rename = "outputHeight", default = "default_output_height")]
    pub output_height: u32,

    /// Explicit path to the NDI runtime library
    #[serde(rename = "libraryPath", default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,
}

fn default_target_property() -> String {
    DEFAULT_TARGET_PROPERTY.to_string()
}

fn default_target_fps() -> u32 {
    60
}

fn default_output_width() -> u32 {
    1920
}

fn default_output_height() -> u32 {
    1080
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            ndi_name: String::new(),
            receiver_name: None,
            color_format: ColorFormat::default(),
            bandwidth: Bandwidth::default(),
            allow_video_fields: false,
            target_material_property: default_target_property(),
            target_fps: default_target_fps(),
            output_width: default_output_width(),
            output_height: default_output_height(),
            library_path: None,
        }
    }
}

impl ReceiverSettings {
    /// Clamp values to their valid ranges
    pub fn clamp(&mut self) {
        self.target_fps = self.target_fps.clamp(1, 240);
        self.output_width = self.output_width.max(1);
        self.output_height = self.output_height.max(1);
        if self.target_material_property.is_empty() {
            self.target_material_property = default_target_property();
        }
    }

    /// Options used when creating the native receiver.
    pub fn recv_options(&self) -> RecvOptions {
        RecvOptions {
            color_format: self.color_format,
            bandwidth: self.bandwidth,
            allow_video_fields: self.allow_video_fields,
            name: self.receiver_name.clone().filter(|name| !name.is_empty()),
        }
    }

    pub fn library_path(&self) -> Option<PathBuf> {
        self.library_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Parse settings from XML
    pub fn from_xml(xml: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = from_str(xml)?;
        settings.clamp();
        Ok(settings)
    }

    /// Serialize settings to XML, with declaration
    pub fn to_xml(&self) -> Result<String, SettingsError> {
        let xml = to_string(self)?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml))
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_xml(&contents)
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_xml()?)?;
        Ok(())
    }

    /// Default settings file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("NdiTexture");
            p.push("receiver.xml");
            p
        })
    }

    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::config_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }
}

/// Settings-related errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),

    #[error("Could not find config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ReceiverSettings::default();
        assert!(settings.ndi_name.is_empty());
        assert_eq!(settings.color_format, ColorFormat::Fastest);
        assert_eq!(settings.bandwidth, Bandwidth::Highest);
        assert_eq!(settings.target_material_property, "_MainTex");
        assert_eq!(settings.target_fps, 60);
        assert_eq!((settings.output_width, settings.output_height), (1920, 1080));
        assert_eq!(settings.library_path(), None);
    }

    #[test]
    fn test_clamping() {
        let mut settings = ReceiverSettings {
            target_fps: 500,
            output_width: 0,
            target_material_property: String::new(),
            ..Default::default()
        };
        settings.clamp();
        assert_eq!(settings.target_fps, 240);
        assert_eq!(settings.output_width, 1);
        assert_eq!(settings.target_material_property, "_MainTex");

        settings.target_fps = 0;
        settings.clamp();
        assert_eq!(settings.target_fps, 1);
    }

    #[test]
    fn test_partial_xml_uses_defaults() {
        let xml = r#"<NdiReceiver><ndiName>STUDIO (Camera 1)</ndiName><targetFps>1000</targetFps></NdiReceiver>"#;
        let settings = ReceiverSettings::from_xml(xml).unwrap();
        assert_eq!(settings.ndi_name, "STUDIO (Camera 1)");
        assert_eq!(settings.target_fps, 240);
        assert_eq!(settings.color_format, ColorFormat::Fastest);
        assert_eq!(settings.output_height, 1080);
    }

    #[test]
    fn test_xml_round_trip() {
        let settings = ReceiverSettings {
            ndi_name: "STUDIO (Camera 1)".into(),
            receiver_name: Some("Render Node".into()),
            color_format: ColorFormat::UyvyRgba,
            bandwidth: Bandwidth::Lowest,
            allow_video_fields: true,
            target_material_property: "_EmissionMap".into(),
            target_fps: 30,
            output_width: 1280,
            output_height: 720,
            library_path: Some("/opt/ndi/lib/libndi.so.6".into()),
        };

        let xml = settings.to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<colorFormat>UyvyRgba</colorFormat>"));
        assert_eq!(ReceiverSettings::from_xml(&xml).unwrap(), settings);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("ndi-texture-settings-{}", std::process::id()));
        let path = dir.join("nested").join("receiver.xml");

        let settings = ReceiverSettings {
            ndi_name: "A (One)".into(),
            ..Default::default()
        };
        settings.save_to_file(&path).unwrap();
        let loaded = ReceiverSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_files() {
        let missing = std::env::temp_dir().join("ndi-texture-does-not-exist.xml");
        assert!(matches!(ReceiverSettings::load_from_file(&missing), Err(SettingsError::Io(_))));
        assert!(matches!(
            ReceiverSettings::from_xml("<NdiReceiver><targetFps>fast</targetFps></NdiReceiver>"),
            Err(SettingsError::XmlParse(_))
        ));
    }

    #[test]
    fn test_recv_options() {
        let settings = ReceiverSettings {
            color_format: ColorFormat::BgrxBgra,
            receiver_name: Some(String::new()),
            allow_video_fields: true,
            ..Default::default()
        };
        let options = settings.recv_options();
        assert_eq!(options.color_format, ColorFormat::BgrxBgra);
        assert_eq!(options.bandwidth, Bandwidth::Highest);
        assert!(options.allow_video_fields);
        assert_eq!(options.name, None);
    }
}
