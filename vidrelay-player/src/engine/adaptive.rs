use crate::capability::{AdaptiveBackend, AdaptivePlayer, ElementEvent, EngineEvent, MediaElement};
use crate::error::Result;
use crate::session::RecoveryTrigger;

use super::{
    software_element_disposition, AttachRequest, Attached, Disposition, PlaybackEngine, Strategy,
    TeardownReport,
};

const LISTENERS: &[ElementEvent] = &[ElementEvent::Ended, ElementEvent::Stalled, ElementEvent::Waiting];

/// Adaptive-manifest playback through the software player.
pub struct AdaptiveEngine {
    player: Box<dyn AdaptivePlayer>,
}

impl AdaptiveEngine {
    pub(super) fn attach(backend: &dyn AdaptiveBackend, request: AttachRequest<'_>) -> Result<Attached> {
        let mut player = backend.create(&request.config.adaptive, request.events)?;

        let wired = player
            .load_source(request.url)
            .and_then(|()| player.attach_media(request.element));
        if let Err(e) = wired {
            // The instance exists, so it must not outlive the failed attach.
            if let Err(teardown) = player.destroy() {
                (request.teardown)("destroy", teardown);
            }
            return Err(e);
        }

        Ok(Attached {
            engine: Box::new(Self { player }),
            playing: false,
            warnings: Vec::new(),
        })
    }
}

impl PlaybackEngine for AdaptiveEngine {
    fn strategy(&self) -> Strategy {
        Strategy::Adaptive
    }

    fn listeners(&self) -> &'static [ElementEvent] {
        LISTENERS
    }

    fn start(&mut self, element: &mut dyn MediaElement) -> Result<()> {
        element.play()
    }

    fn on_engine_event(&mut self, event: EngineEvent) -> Disposition {
        match event {
            EngineEvent::ManifestParsed => Disposition::Ready,
            EngineEvent::AdaptiveError { fatal: true, details } => Disposition::fatal(
                RecoveryTrigger::EngineError,
                format!("adaptive player fatal error: {details}"),
            ),
            EngineEvent::AdaptiveError { fatal: false, details } => {
                Disposition::Warning(format!("adaptive player error: {details}"))
            }
            EngineEvent::DemuxError { .. } => Disposition::Ignore,
        }
    }

    fn on_element_event(&mut self, event: ElementEvent) -> Disposition {
        software_element_disposition(Strategy::Adaptive, event)
    }

    fn destroy(mut self: Box<Self>, element: &mut dyn MediaElement, report: &mut TeardownReport<'_>) {
        element.pause();
        if let Err(e) = self.player.destroy() {
            report("destroy", e);
        }
    }
}
