use std::{future::Future, sync::Arc};

use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use crate::{
    common::types::GuildId,
    lyrics::TimedLine,
    protocol::events::RoomEvent,
    server::notifier::Notifier,
};

/// Background replay of one track's captions. At most one runs per room.
pub struct CaptionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CaptionTask {
    /// Wait for `lines` (a caption lookup), then emit each line at `anchor + offset`.
    pub fn spawn<F>(
        guild: GuildId,
        title: String,
        anchor: Instant,
        lines: F,
        notifier: Arc<dyn Notifier>,
    ) -> Self
    where
        F: Future<Output = Option<Vec<TimedLine>>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let span = tracing::debug_span!("captions", guild = %guild);

        let handle = tokio::spawn(
            async move {
                let lines = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    lines = lines => lines,
                };

                if token.is_cancelled() {
                    return;
                }

                let Some(lines) = lines.filter(|l| !l.is_empty()) else {
                    debug!("[{}] No captions for '{}'", guild, title);
                    notifier.emit(&guild, RoomEvent::CaptionsNotFound { title });
                    return;
                };

                notifier.emit(
                    &guild,
                    RoomEvent::CaptionsFound {
                        title,
                        lines: lines.len(),
                    },
                );
                replay(&guild, anchor, &lines, &token, notifier.as_ref()).await;
            }
            .instrument(span),
        );

        Self { cancel, handle }
    }

    /// Cancel and wait until the task has fully stopped.
    pub async fn cancel(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                warn!("Caption task panicked: {}", e);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn replay(
    guild: &GuildId,
    anchor: Instant,
    lines: &[TimedLine],
    token: &CancellationToken,
    notifier: &dyn Notifier,
) {
    for (index, line) in lines.iter().enumerate() {
        // Lines already overtaken by the next one (late lookup) are not shown.
        if let Some(next) = lines.get(index + 1) {
            if anchor + next.offset <= Instant::now() {
                continue;
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep_until(anchor + line.offset) => {}
        }

        if token.is_cancelled() {
            return;
        }

        notifier.emit(
            guild,
            RoomEvent::CaptionLine {
                line_index: index,
                line: line.text.clone(),
            },
        );
    }
}
