use crate::capability::{
    DemuxBackend, DemuxErrorKind, DemuxPlayer, ElementEvent, EngineEvent, MediaDataSource,
    MediaElement,
};
use crate::error::Result;
use crate::session::RecoveryTrigger;

use super::{
    software_element_disposition, AttachRequest, Attached, Disposition, PlaybackEngine, Strategy,
    TeardownReport,
};

/// `LoadedMetadata` is only used to note that media actually arrived.
const LISTENERS: &[ElementEvent] = &[
    ElementEvent::LoadedMetadata,
    ElementEvent::Ended,
    ElementEvent::Stalled,
    ElementEvent::Waiting,
];

/// Live transport-stream playback through the software demuxer.
pub struct DemuxEngine {
    player: Box<dyn DemuxPlayer>,
    attached: bool,
}

impl DemuxEngine {
    pub(super) fn attach(backend: &dyn DemuxBackend, request: AttachRequest<'_>) -> Result<Attached> {
        let source = MediaDataSource::live_mpegts(request.url);
        let player = backend.create(&source, &request.config.demux, request.events)?;
        let mut engine = Self {
            player,
            attached: false,
        };

        let wired = engine
            .player
            .attach_media_element(request.element)
            .and_then(|()| {
                engine.attached = true;
                engine.player.load()
            });
        if let Err(e) = wired {
            Box::new(engine).destroy(request.element, request.teardown);
            return Err(e);
        }

        let mut warnings = Vec::new();
        if let Err(e) = engine.player.play() {
            warnings.push(format!("demux player refused to start: {e}"));
        }

        Ok(Attached {
            engine: Box::new(engine),
            playing: true,
            warnings,
        })
    }
}

impl PlaybackEngine for DemuxEngine {
    fn strategy(&self) -> Strategy {
        Strategy::Demux
    }

    fn listeners(&self) -> &'static [ElementEvent] {
        LISTENERS
    }

    fn start(&mut self, _element: &mut dyn MediaElement) -> Result<()> {
        self.player.play()
    }

    fn on_engine_event(&mut self, event: EngineEvent) -> Disposition {
        match event {
            EngineEvent::DemuxError { kind, detail } => match kind {
                DemuxErrorKind::Network | DemuxErrorKind::Media => Disposition::fatal(
                    RecoveryTrigger::EngineError,
                    format!("demux player {kind:?} error: {detail}"),
                ),
                DemuxErrorKind::Other => {
                    Disposition::Warning(format!("demux player error: {detail}"))
                }
            },
            EngineEvent::ManifestParsed | EngineEvent::AdaptiveError { .. } => Disposition::Ignore,
        }
    }

    fn on_element_event(&mut self, event: ElementEvent) -> Disposition {
        match event {
            ElementEvent::LoadedMetadata => Disposition::Ready,
            other => software_element_disposition(Strategy::Demux, other),
        }
    }

    fn destroy(mut self: Box<Self>, element: &mut dyn MediaElement, report: &mut TeardownReport<'_>) {
        if let Err(e) = self.player.pause() {
            report("pause", e);
        }
        if let Err(e) = self.player.unload() {
            report("unload", e);
        }
        if self.attached {
            if let Err(e) = self.player.detach_media_element() {
                report("detach", e);
            }
        }
        if let Err(e) = self.player.destroy() {
            report("destroy", e);
        }
        element.pause();
    }
}
