use crate::capability::{ElementEvent, EngineEvent, MediaElement};
use crate::error::Result;
use crate::session::RecoveryTrigger;

use super::{AttachRequest, Attached, Disposition, PlaybackEngine, Strategy, TeardownReport};

const LISTENERS: &[ElementEvent] = &[
    ElementEvent::LoadedMetadata,
    ElementEvent::Ended,
    ElementEvent::Stalled,
    ElementEvent::Waiting,
    ElementEvent::Error,
];

/// The media element plays the URL itself.
pub struct NativeEngine;

impl NativeEngine {
    pub(super) fn attach(request: AttachRequest<'_>) -> Attached {
        request.element.set_src(request.url);
        Attached {
            engine: Box::new(Self),
            playing: false,
            warnings: Vec::new(),
        }
    }
}

impl PlaybackEngine for NativeEngine {
    fn strategy(&self) -> Strategy {
        Strategy::Native
    }

    fn listeners(&self) -> &'static [ElementEvent] {
        LISTENERS
    }

    fn start(&mut self, element: &mut dyn MediaElement) -> Result<()> {
        element.play()
    }

    fn on_engine_event(&mut self, _event: EngineEvent) -> Disposition {
        Disposition::Ignore
    }

    fn on_element_event(&mut self, event: ElementEvent) -> Disposition {
        match event {
            ElementEvent::LoadedMetadata => Disposition::Ready,
            ElementEvent::Ended => Disposition::fatal(RecoveryTrigger::Ended, "native stream ended"),
            ElementEvent::Stalled => {
                Disposition::fatal(RecoveryTrigger::Stalled, "native stream stalled")
            }
            ElementEvent::Error => {
                Disposition::fatal(RecoveryTrigger::ElementError, "media element error")
            }
            ElementEvent::Waiting => Disposition::Note("element waiting for data".to_string()),
        }
    }

    fn destroy(self: Box<Self>, element: &mut dyn MediaElement, _report: &mut TeardownReport<'_>) {
        element.pause();
        element.clear_src();
        element.load();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{EngineEventSink, MockMediaElement};
    use mockall::{predicate::eq, Sequence};
    use vidrelay_core::config::PlaybackConfig;

    #[test]
    fn test_attach_assigns_source() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let config = PlaybackConfig::default();
        let mut element = MockMediaElement::new();
        element
            .expect_set_src()
            .with(eq("http://cdn.example.com/video.mp4"))
            .times(1)
            .return_const(());

        let attached = NativeEngine::attach(AttachRequest {
            url: "http://cdn.example.com/video.mp4",
            element: &mut element,
            events: EngineEventSink::new(1, tx.downgrade()),
            config: &config,
            teardown: &mut |_, _| {},
        });

        assert!(!attached.playing);
        assert_eq!(attached.engine.strategy(), Strategy::Native);
    }

    #[test]
    fn test_element_events() {
        let mut engine = NativeEngine;
        assert_eq!(engine.on_element_event(ElementEvent::LoadedMetadata), Disposition::Ready);
        assert!(matches!(
            engine.on_element_event(ElementEvent::Error),
            Disposition::Fatal { trigger: RecoveryTrigger::ElementError, .. }
        ));
        assert!(matches!(
            engine.on_element_event(ElementEvent::Ended),
            Disposition::Fatal { trigger: RecoveryTrigger::Ended, .. }
        ));
        assert!(matches!(
            engine.on_element_event(ElementEvent::Waiting),
            Disposition::Note(_)
        ));
        assert_eq!(engine.on_engine_event(EngineEvent::ManifestParsed), Disposition::Ignore);
    }

    #[test]
    fn test_destroy_resets_element() {
        let mut seq = Sequence::new();
        let mut element = MockMediaElement::new();
        element.expect_pause().times(1).in_sequence(&mut seq).return_const(());
        element.expect_clear_src().times(1).in_sequence(&mut seq).return_const(());
        element.expect_load().times(1).in_sequence(&mut seq).return_const(());

        let engine: Box<dyn PlaybackEngine> = Box::new(NativeEngine);
        engine.destroy(&mut element, &mut |_, _| panic!("native teardown cannot fail"));
    }
}
