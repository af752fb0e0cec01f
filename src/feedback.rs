use crate::room::PlayerId;

/// Discrete cues for a sound or visual-effects layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEvent {
    Correct { player_id: PlayerId },
    Incorrect { player_id: PlayerId },
    TimeUp { question_index: usize },
}

pub trait FeedbackListener {
    fn on_feedback(&mut self, event: FeedbackEvent);
}

/// Fan-out to any number of listeners, including none.
#[derive(Default)]
pub struct FeedbackBus {
    listeners: Vec<Box<dyn FeedbackListener>>,
}

impl std::fmt::Debug for FeedbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl FeedbackBus {
    pub fn subscribe(&mut self, listener: Box<dyn FeedbackListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, event: FeedbackEvent) {
        log::trace!("feedback {event:?}");
        for listener in &mut self.listeners {
            listener.on_feedback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<FeedbackEvent>>>);

    impl FeedbackListener for Recorder {
        fn on_feedback(&mut self, event: FeedbackEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn emit_without_listeners_is_fine() {
        let mut bus = FeedbackBus::default();
        bus.emit(FeedbackEvent::TimeUp { question_index: 0 });
        assert!(bus.is_empty());
    }

    #[test]
    fn every_listener_hears_every_event() {
        let a = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::new(RefCell::new(Vec::new()));
        let mut bus = FeedbackBus::default();
        bus.subscribe(Box::new(Recorder(a.clone())));
        bus.subscribe(Box::new(Recorder(b.clone())));

        bus.emit(FeedbackEvent::Correct { player_id: 1 });
        bus.emit(FeedbackEvent::Incorrect { player_id: 2 });

        assert_eq!(bus.len(), 2);
        assert_eq!(*a.borrow(), *b.borrow());
        assert_eq!(
            *a.borrow(),
            vec![
                FeedbackEvent::Correct { player_id: 1 },
                FeedbackEvent::Incorrect { player_id: 2 }
            ]
        );
    }
}
