use handlebars::Handlebars;

use crate::{
    config::{DisplayConfig, GeneralConfiguration},
    event::TrackMetadata,
};

pub mod handler;
pub mod plain_backend;
pub mod synchronizer;
pub mod tui_backend;
pub mod watch;

#[cfg(test)]
mod testing;

/// Renders the configured title/artist templates for a track.
#[derive(Debug)]
pub struct TrackFormatter {
    registry: Handlebars<'static>,
}

impl TrackFormatter {
    pub fn new(display: &DisplayConfig) -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        registry.register_template_string("title", &display.title_format)?;
        registry.register_template_string("artist", &display.artist_format)?;
        Ok(Self { registry })
    }

    pub fn title(&self, track: &TrackMetadata) -> String {
        self.render("title", track, &track.title)
    }

    pub fn artist(&self, track: &TrackMetadata) -> String {
        self.render("artist", track, &track.artist)
    }

    fn render(&self, name: &str, track: &TrackMetadata, fallback: &str) -> String {
        self.registry.render(name, track).unwrap_or_else(|e| {
            tracing::debug!(error = %e, template = name, "display.template");
            fallback.to_owned()
        })
    }
}

/// Romanizes lyric text when enabled, unless it contains an excluded marker.
pub fn display_text(text: &str, general: &GeneralConfiguration) -> String {
    let excluded = general
        .romanize_exclude
        .iter()
        .any(|marker| !marker.is_empty() && text.contains(marker.as_str()));
    if general.romanize_unicode && !excluded {
        deunicode::deunicode(text)
    } else {
        text.to_owned()
    }
}

/// `m:ss`
pub fn fmt_timestamp(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:0>2}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;

    fn general(romanize: bool, exclude: &[&str]) -> GeneralConfiguration {
        GeneralConfiguration {
            track_poll_ms: 1000,
            sync_poll_ms: 200,
            min_duration_secs: 1.0,
            duration_fallback: true,
            romanize_unicode: romanize,
            romanize_exclude: exclude.iter().map(|s| s.to_string()).collect(),
            scroll_offset: 4,
            display: DisplayConfig {
                title_format: "{{title}}".into(),
                artist_format: "{{artist}}".into(),
                show_timestamps: true,
            },
        }
    }

    #[test]
    fn romanizes_unless_excluded() {
        assert_eq!(display_text("Ça va", &general(false, &[])), "Ça va");
        assert_eq!(display_text("Ça va", &general(true, &[])), "Ca va");
        assert_eq!(display_text("Ça va", &general(true, &["Ça"])), "Ça va");
    }

    #[test]
    fn timestamps() {
        assert_eq!(fmt_timestamp(0.0), "0:00");
        assert_eq!(fmt_timestamp(10.0), "0:10");
        assert_eq!(fmt_timestamp(127.9), "2:07");
        assert_eq!(fmt_timestamp(-4.0), "0:00");
    }

    #[test]
    fn formats_track_with_templates() {
        let formatter = TrackFormatter::new(&DisplayConfig {
            title_format: "♪ {{title}}".into(),
            artist_format: "by {{artist}}".into(),
            show_timestamps: false,
        })
        .unwrap();
        let track = TrackMetadata {
            title: "Rock & Roll".into(),
            artist: "Artist".into(),
            duration_secs: 200.0,
        };
        assert_eq!(formatter.title(&track), "♪ Rock & Roll");
        assert_eq!(formatter.artist(&track), "by Artist");
    }

    #[test]
    fn broken_template_is_rejected() {
        let display = DisplayConfig {
            title_format: "{{#if}}".into(),
            artist_format: "{{artist}}".into(),
            show_timestamps: true,
        };
        assert!(TrackFormatter::new(&display).is_err());
    }
}
