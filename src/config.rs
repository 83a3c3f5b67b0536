use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use home::home_dir;
use ratatui::{style::Color, widgets::BorderType};
use serde::{
    de::{DeserializeOwned, Visitor},
    Deserialize,
};
use tokio::io::AsyncReadExt;
use url::Url;

pub const DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

#[derive(Debug, Clone)]
pub struct LyricFixConfig {
    pub api: ApiConfiguration,
    pub general: GeneralConfiguration,
    pub theme: ThemeConfiguration,
    pub logging: LoggingConfiguration,
}

impl LyricFixConfig {
    /// Reads `path`, or the user's config file, or the built-in defaults, in
    /// that order.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_dir = config_dir()?;
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(config_dir.join("config.toml")).filter(|p| p.exists()),
        };
        match path {
            Some(path) => {
                let mut file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("opening {}", path.display()))?;
                let mut str = String::new();
                file.read_to_string(&mut str).await?;
                let dir = path.parent().unwrap_or(config_dir.as_path());
                Self::read_from_str(&str, dir).await
            }
            None => Self::read_from_str(DEFAULT_CONFIG, &config_dir).await,
        }
    }

    pub async fn read_from_str(str: &str, config_dir: &Path) -> anyhow::Result<Self> {
        let unresolved = toml::from_str::<LyricFixConfigUnresolved>(str)?;
        let theme = unresolved.theme.resolve(config_dir).await?;
        let api = unresolved.api.resolve(config_dir).await?;
        let general = unresolved.general.resolve(config_dir).await?;
        let logging = match unresolved.logging {
            Some(logging) => logging.resolve(config_dir).await?,
            None => LoggingConfiguration::default(),
        };
        api.validate()?;
        general.validate()?;
        Ok(Self {
            theme,
            api,
            general,
            logging,
        })
    }
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = home_dir().context("could not locate the home directory")?;
    Ok(home.join(".config").join("lyricfix"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfiguration {
    pub lyrics_api_url: Url,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl ApiConfiguration {
    fn validate(&self) -> anyhow::Result<()> {
        let url = &self.lyrics_api_url;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("lyrics_api_url must be http(s): {url}");
        }
        if !url.path().ends_with('/') {
            bail!("lyrics_api_url must end with '/': {url}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfiguration {
    pub track_poll_ms: u64,
    pub sync_poll_ms: u64,
    pub min_duration_secs: f64,
    pub duration_fallback: bool,
    pub romanize_unicode: bool,
    pub romanize_exclude: Vec<String>,
    pub scroll_offset: u16,
    pub display: DisplayConfig,
}

impl GeneralConfiguration {
    fn validate(&self) -> anyhow::Result<()> {
        if self.track_poll_ms == 0 || self.sync_poll_ms == 0 {
            bail!("poll intervals must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub title_format: String,
    pub artist_format: String,
    pub show_timestamps: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfiguration {
    pub lyrics: ThemeLyrics,
    pub borders: ThemeBorders,
    pub progress_bar: ThemeProgress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeLyrics {
    pub inactive_text_color: ThemeColor,
    pub active_text_color: ThemeColor,
    pub selected_text_color: ThemeColor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeBorders {
    pub border_color: ThemeColor,
    pub text_color: ThemeColor,
    pub border_style: BorderStyle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeProgress {
    pub color: ThemeColor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfiguration {
    pub filter: String,
    /// Relative paths are resolved against the config directory.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self {
            filter: "lyricfix=info".to_owned(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct ThemeColor(pub Color);

impl<'de> Deserialize<'de> for ThemeColor {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de.deserialize_str(ColorVisitor)
    }
}

struct ColorVisitor;

impl<'v> Visitor<'v> for ColorVisitor {
    type Value = ThemeColor;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a color name or #rrggbb")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let color = match v.strip_prefix('#') {
            Some(hex) => parse_hex_color(hex),
            None => v.parse::<Color>().ok(),
        };
        color
            .map(ThemeColor)
            .ok_or_else(|| E::invalid_value(serde::de::Unexpected::Str(v), &self))
    }
}

/// `rrggbb` without the leading `#`.
fn parse_hex_color(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = u32::from_str_radix(hex, 16).ok()?;
    Some(Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8))
}

#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct BorderStyle(pub BorderType);

impl<'de> Deserialize<'de> for BorderStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(BorderVisitor).map(BorderStyle)
    }
}

struct BorderVisitor;

impl<'v> Visitor<'v> for BorderVisitor {
    type Value = BorderType;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "one of plain, rounded, double or thick")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v.to_ascii_lowercase().as_str() {
            "plain" => Ok(BorderType::Plain),
            "rounded" => Ok(BorderType::Rounded),
            "double" => Ok(BorderType::Double),
            "thick" => Ok(BorderType::Thick),
            _ => Err(E::invalid_value(serde::de::Unexpected::Str(v), &self)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LyricFixConfigUnresolved {
    general: MaybeLink<GeneralConfiguration>,
    api: MaybeLink<ApiConfiguration>,
    theme: MaybeLink<ThemeConfiguration>,
    logging: Option<MaybeLink<LoggingConfiguration>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeLink<V> {
    Link { include: PathBuf },
    Explicit(V),
}

impl<V: DeserializeOwned> MaybeLink<V> {
    async fn resolve(self, config_dir: &Path) -> anyhow::Result<V> {
        match self {
            MaybeLink::Explicit(value) => Ok(value),
            MaybeLink::Link { include } => {
                let path = config_dir.join(include);
                let mut file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("opening included config {}", path.display()))?;
                let mut str = String::new();
                file.read_to_string(&mut str).await?;
                toml::from_str(&str).map_err(anyhow::Error::from)
            }
        }
    }
}
