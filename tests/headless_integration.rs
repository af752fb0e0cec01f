use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use vocab_duel::app::App;
use vocab_duel::runtime::{FixedTicker, QuizEvent, Runner, TestEventSource};
use vocab_duel::session::{Phase, Session, SessionSettings, HOST_ID};
use vocab_duel::vocabulary::VocabularyStore;

fn key(c: char) -> QuizEvent {
    QuizEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn app(seed: u64) -> App {
    let store = VocabularyStore::builtin().unwrap();
    App::new(Session::with_seed(store, SessionSettings::default(), seed), true)
}

// Headless integration using the internal runtime without a TTY: keys come
// through Runner/TestEventSource, virtual time is advanced by hand.
#[test]
fn headless_single_player_game_completes() {
    let mut app = app(21);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(key('s')).unwrap();
    if let QuizEvent::Key(k) = runner.step() {
        app.on_key(k);
    }
    assert_eq!(app.session.phase(), Phase::Countdown);
    app.advance(Duration::from_secs(3));

    for _ in 0..10 {
        assert_eq!(app.session.phase(), Phase::Playing);
        let correct = app
            .session
            .current_question()
            .and_then(|q| q.correct_index())
            .unwrap();
        let digit = char::from_digit(correct as u32 + 1, 10).unwrap();
        tx.send(key(digit)).unwrap();

        match runner.step() {
            QuizEvent::Key(k) => app.on_key(k),
            other => panic!("expected a key, got {other:?}"),
        }
        app.advance(Duration::from_secs(2));
    }

    assert_eq!(app.session.phase(), Phase::Result);
    assert_eq!(app.session.scores()[HOST_ID as usize - 1], 200);
    assert!(app.confetti.is_active(), "a win starts the confetti");

    tx.send(key('r')).unwrap();
    if let QuizEvent::Key(k) = runner.step() {
        app.on_key(k);
    }
    assert_eq!(app.session.phase(), Phase::Menu);
    assert!(!app.confetti.is_active());
}

#[test]
fn headless_idle_ticks_run_the_clock_out() {
    let mut app = app(22);
    let (_tx, rx) = mpsc::channel();
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(2)),
    );

    app.on_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));
    runner.take_elapsed();

    // Real ticks exercise the loop; the session clock is then pushed well
    // past the end of the game.
    for _ in 0..5u32 {
        if let QuizEvent::Tick = runner.step() {
            let elapsed = runner.take_elapsed();
            app.advance(elapsed);
        }
    }
    assert_eq!(app.session.phase(), Phase::Countdown);

    app.advance(Duration::from_secs(600));
    assert_eq!(app.session.phase(), Phase::Result);
}

#[test]
fn headless_quit_on_escape_and_ctrl_c() {
    let mut app = app(23);
    app.on_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
    assert!(app.should_quit);

    let mut app = self::app(24);
    app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
}
