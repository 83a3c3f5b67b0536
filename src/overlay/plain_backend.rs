use std::time::Duration;

use crate::{
    config::GeneralConfiguration,
    event::{FetchStatus, StatusEvent},
};

use super::{
    display_text, fmt_timestamp,
    handler::{BackendContext, LyricsBackend, LyricsState},
    TrackFormatter,
};

/// Prints each newly active line to stdout. Ends with the playlist.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainBackend;

#[async_trait::async_trait]
impl LyricsBackend for PlainBackend {
    async fn run_backend(&mut self, ctx: BackendContext) -> anyhow::Result<()> {
        let formatter = TrackFormatter::new(&ctx.config.general.display)?;
        let mut finish_check = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                event = ctx.events.recv_async() => {
                    let Ok(event) = event else { break };
                    let rendered = {
                        let state = ctx.session.state();
                        render_event(&event, &state, &formatter, &ctx.config.general)
                    };
                    if let Some(rendered) = rendered {
                        println!("{rendered}");
                    }
                }
                _ = finish_check.tick() => {
                    if ctx.player.finished() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

fn render_event(
    event: &StatusEvent,
    state: &LyricsState,
    formatter: &TrackFormatter,
    general: &GeneralConfiguration,
) -> Option<String> {
    match event {
        StatusEvent::TrackChanged { metadata } => Some(format!(
            "\n== {} / {} ==",
            formatter.title(metadata),
            formatter.artist(metadata)
        )),
        StatusEvent::Status {
            status: FetchStatus::Unsynced,
            message,
        } => {
            let plain = state.plain_lyrics().unwrap_or_default();
            Some(format!("[{message}]\n{}", display_text(plain, general)))
        }
        StatusEvent::Status { message, .. } => Some(format!("[{message}]")),
        StatusEvent::SwitchLyricLine { transition } => {
            let line = state.lines().get(usize::try_from(transition.to).ok()?)?;
            let words = display_text(&line.text, general);
            if general.display.show_timestamps {
                Some(format!("{:>5}  {words}", fmt_timestamp(line.time)))
            } else {
                Some(words)
            }
        }
    }
}
