//! Per-user session worker: executes the controller's actions.
//!
//! A [`SessionWorker`] owns one [`TurnController`] and runs as its own tokio
//! task.  Room events arrive over a bounded `mpsc` channel; every piece of
//! downstream work (recognition, translation, synthesis + playback) runs in a
//! spawned task that reports back over an internal unbounded channel, so the
//! worker never blocks on a collaborator and a new speech start is handled
//! immediately.
//!
//! ```text
//! SessionEvent (mpsc) ─┐
//!                      ├─▶ TurnController ─▶ Vec<Action> ─▶ spawn / abort
//! Completion (mpsc) ───┘                                       │
//!        ▲                                                     │
//!        └──────────────── task result ◀───────────────────────┘
//! ```
//!
//! Cancellation is best-effort: `Cancel` aborts the task, and if its result
//! was already queued the controller discards it by request id.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::llm::{LlmError, TranslationRequest, TranslationResult, Translator};
use crate::metrics::UsageCollector;
use crate::stt::{AudioClip, RecognitionError, Recognizer, Utterance};
use crate::tts::{AudioSink, PlaybackTarget, SynthesisError, Synthesizer};

use super::controller::{Action, RequestId, TurnController, TurnId};
use super::state::SessionSnapshot;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Inputs delivered to a session by its room.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Voice activity detected for this user.
    SpeechStarted,
    /// Voice activity ended.
    SpeechStopped,
    /// A partial or final transcript from an upstream recognizer.
    Transcript(Utterance),
    /// A recorded clip to be transcribed by this session's recognizer.
    AudioClip(PathBuf),
    /// The upstream recognizer delivered something unusable.
    RecognitionFailed(RecognitionError),
}

/// Results of spawned work, routed back into the controller.
#[derive(Debug)]
enum Completion {
    Clip {
        turn: TurnId,
        result: Result<Utterance, RecognitionError>,
    },
    Translation {
        id: RequestId,
        result: Result<TranslationResult, LlmError>,
    },
    Playback {
        id: RequestId,
        result: Result<(), SynthesisError>,
    },
}

// ---------------------------------------------------------------------------
// Collaborators / settings
// ---------------------------------------------------------------------------

/// Services shared by every session in the process.
#[derive(Clone)]
pub struct Collaborators {
    pub translator: Arc<dyn Translator>,
    pub recognizer: Arc<dyn Recognizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub sink: Arc<dyn AudioSink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub greeting: bool,
    pub event_buffer: usize,
    pub target_language: String,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            greeting: config.session.greeting,
            event_buffer: config.session.event_buffer.max(1),
            target_language: config.translation.target_language.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SessionWorker
// ---------------------------------------------------------------------------

pub struct SessionWorker {
    room: String,
    user: String,
    log_prefix: String,
    controller: TurnController,
    collab: Collaborators,
    greeting: bool,
    /// Translate / greet / speak tasks keyed by the request they serve.
    tasks: HashMap<RequestId, JoinHandle<()>>,
    /// Recognition tasks; their results are filtered by turn instead.
    clip_tasks: Vec<JoinHandle<()>>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionWorker {
    pub fn new(
        room: impl Into<String>,
        user: impl Into<String>,
        collab: Collaborators,
        settings: &SessionSettings,
        usage: Option<Arc<UsageCollector>>,
    ) -> Self {
        let room = room.into();
        let user = user.into();
        let log_prefix = format!("[{room}/{user}]");

        let mut controller = TurnController::new(&log_prefix, &settings.target_language);
        if let Some(usage) = usage {
            controller = controller.with_usage(usage);
        }

        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());

        Self {
            room,
            user,
            log_prefix,
            controller,
            collab,
            greeting: settings.greeting,
            tasks: HashMap::new(),
            clip_tasks: Vec::new(),
            completion_tx,
            completion_rx,
            snapshot_tx,
        }
    }

    /// Observe the session's state; updated after every event.
    pub fn snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run until `events` is closed (the user left), then cancel outstanding
    /// work and return the final snapshot.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> SessionSnapshot {
        let actions = self.controller.on_session_started(self.greeting);
        self.execute(actions);
        self.publish();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(done) = self.completion_rx.recv() => self.handle_completion(done),
            }
            self.publish();
        }

        let actions = self.controller.on_session_ended();
        self.execute(actions);
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
        for task in self.clip_tasks.drain(..) {
            task.abort();
        }
        self.publish();
        self.controller.snapshot()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    fn handle_event(&mut self, event: SessionEvent) {
        let actions = match event {
            SessionEvent::SpeechStarted => self.controller.on_speech_started(),
            SessionEvent::SpeechStopped => self.controller.on_speech_stopped(),
            SessionEvent::Transcript(utterance) => self.controller.on_utterance(utterance),
            SessionEvent::AudioClip(path) => {
                self.spawn_recognition(path);
                Vec::new()
            }
            SessionEvent::RecognitionFailed(error) => {
                self.controller.on_recognition_failed(error)
            }
        };
        self.execute(actions);
    }

    fn handle_completion(&mut self, done: Completion) {
        let actions = match done {
            Completion::Clip { turn, result } => {
                self.clip_tasks.retain(|t| !t.is_finished());
                self.controller.on_clip_transcribed(turn, result)
            }
            Completion::Translation { id, result } => {
                self.tasks.remove(&id);
                self.controller.on_translation_result(id, result)
            }
            Completion::Playback { id, result } => {
                self.tasks.remove(&id);
                self.controller.on_playback_complete(id, result)
            }
        };
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Translate { id, request } => self.spawn_translation(id, request),
                Action::Greet { id } => self.spawn_greeting(id),
                Action::Speak { id, text } => self.spawn_speech(id, text),
                Action::Cancel { id } => {
                    if let Some(task) = self.tasks.remove(&id) {
                        log::debug!("{} aborting request {id}", self.log_prefix);
                        task.abort();
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.controller.snapshot());
    }

    // -----------------------------------------------------------------------
    // Spawned work
    // -----------------------------------------------------------------------

    fn spawn_recognition(&mut self, path: PathBuf) {
        let turn = self.controller.turn();
        let recognizer = Arc::clone(&self.collab.recognizer);
        let tx = self.completion_tx.clone();
        log::debug!(
            "{} transcribing {} for turn {turn}",
            self.log_prefix,
            path.display()
        );

        let task = tokio::spawn(async move {
            let result = match AudioClip::read(&path).await {
                Ok(clip) => recognizer.transcribe(clip).await,
                Err(e) => Err(e),
            };
            let _ = tx.send(Completion::Clip { turn, result });
        });
        self.clip_tasks.push(task);
    }

    fn spawn_translation(&mut self, id: RequestId, request: TranslationRequest) {
        let translator = Arc::clone(&self.collab.translator);
        let tx = self.completion_tx.clone();
        let task = tokio::spawn(async move {
            let result = translator.translate(&request).await;
            let _ = tx.send(Completion::Translation { id, result });
        });
        self.tasks.insert(id, task);
    }

    fn spawn_greeting(&mut self, id: RequestId) {
        let translator = Arc::clone(&self.collab.translator);
        let tx = self.completion_tx.clone();
        let task = tokio::spawn(async move {
            let result = translator
                .greeting()
                .await
                .map(|translated_text| TranslationResult { translated_text });
            let _ = tx.send(Completion::Translation { id, result });
        });
        self.tasks.insert(id, task);
    }

    fn spawn_speech(&mut self, id: RequestId, text: String) {
        let synthesizer = Arc::clone(&self.collab.synthesizer);
        let sink = Arc::clone(&self.collab.sink);
        let tx = self.completion_tx.clone();
        let target = PlaybackTarget {
            room: self.room.clone(),
            user: self.user.clone(),
            turn: self.controller.turn(),
            request: id,
        };

        let task = tokio::spawn(async move {
            let result = match synthesizer.synthesize(&text).await {
                Ok(audio) => sink.play(&target, audio).await,
                Err(e) => Err(e),
            };
            let _ = tx.send(Completion::Playback { id, result });
        });
        self.tasks.insert(id, task);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TurnState;
    use crate::stt::MockRecognizer;
    use crate::tts::SpeechAudio;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Translator with a fixed table of answers.  Text not in the table never
    /// answers, which keeps a request in flight until it is cancelled.
    struct ScriptedTranslator {
        answers: Vec<(&'static str, Result<&'static str, LlmError>)>,
        greeting: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTranslator {
        fn new(answers: Vec<(&'static str, Result<&'static str, LlmError>)>) -> Self {
            Self {
                answers,
                greeting: "你好，我是你的翻译助手。",
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Translator for ScriptedTranslator {
        async fn translate(
            &self,
            request: &TranslationRequest,
        ) -> Result<TranslationResult, LlmError> {
            self.calls.lock().unwrap().push(request.source_text.clone());
            let answer = self
                .answers
                .iter()
                .find(|(src, _)| *src == request.source_text)
                .map(|(_, a)| a.clone());
            match answer {
                Some(Ok(text)) => Ok(TranslationResult {
                    translated_text: text.into(),
                }),
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        }

        async fn greeting(&self) -> Result<String, LlmError> {
            Ok(self.greeting.into())
        }
    }

    #[derive(Default)]
    struct RecordingSynth {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Synthesizer for RecordingSynth {
        async fn synthesize(&self, text: &str) -> Result<SpeechAudio, SynthesisError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(SpeechAudio {
                pcm: vec![0; 4],
                sample_rate: 24_000,
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        targets: Mutex<Vec<PlaybackTarget>>,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play(
            &self,
            target: &PlaybackTarget,
            _audio: SpeechAudio,
        ) -> Result<(), SynthesisError> {
            self.targets.lock().unwrap().push(target.clone());
            Ok(())
        }
    }

    struct Harness {
        translator: Arc<ScriptedTranslator>,
        synth: Arc<RecordingSynth>,
        sink: Arc<RecordingSink>,
        events: mpsc::Sender<SessionEvent>,
        snapshot: watch::Receiver<SessionSnapshot>,
        task: JoinHandle<SessionSnapshot>,
    }

    fn start(translator: ScriptedTranslator, recognizer: MockRecognizer, greeting: bool) -> Harness {
        let translator = Arc::new(translator);
        let synth = Arc::new(RecordingSynth::default());
        let sink = Arc::new(RecordingSink::default());
        let collab = Collaborators {
            translator: translator.clone(),
            recognizer: Arc::new(recognizer),
            synthesizer: synth.clone(),
            sink: sink.clone(),
        };
        let settings = SessionSettings {
            greeting,
            ..SessionSettings::default()
        };

        let worker = SessionWorker::new("lobby", "alice", collab, &settings, None);
        let snapshot = worker.snapshot();
        let (events, rx) = mpsc::channel(settings.event_buffer);
        let task = tokio::spawn(worker.run(rx));

        Harness {
            translator,
            synth,
            sink,
            events,
            snapshot,
            task,
        }
    }

    impl Harness {
        async fn send(&self, event: SessionEvent) {
            self.events.send(event).await.unwrap();
        }

        async fn wait_for(&mut self, what: impl FnMut(&SessionSnapshot) -> bool) {
            tokio::time::timeout(Duration::from_secs(2), self.snapshot.wait_for(what))
                .await
                .expect("session did not reach expected state")
                .unwrap();
        }

        fn spoken(&self) -> Vec<String> {
            self.synth.texts.lock().unwrap().clone()
        }
    }

    fn final_utt(text: &str) -> SessionEvent {
        SessionEvent::Transcript(Utterance::committed(text, "zh", 0.0, 1.0))
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn transcript_is_translated_and_spoken() {
        let mut h = start(
            ScriptedTranslator::new(vec![("你好", Ok("Hello"))]),
            MockRecognizer::ok(""),
            false,
        );

        h.send(SessionEvent::SpeechStarted).await;
        h.send(SessionEvent::Transcript(Utterance::partial("你", "zh"))).await;
        h.send(final_utt("你好")).await;
        h.send(SessionEvent::SpeechStopped).await;
        h.wait_for(|s| s.stats.completed == 1).await;

        assert_eq!(h.spoken(), vec!["Hello"]);
        let targets = h.sink.targets.lock().unwrap().clone();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].room, "lobby");
        assert_eq!(targets[0].user, "alice");
        assert_eq!(h.snapshot.borrow().state, TurnState::Idle);
    }

    #[tokio::test]
    async fn newer_speech_wins_over_slow_translation() {
        // "你好" never answers; only "你好吗" may reach the synthesizer.
        let mut h = start(
            ScriptedTranslator::new(vec![("你好吗", Ok("How are you?"))]),
            MockRecognizer::ok(""),
            false,
        );

        h.send(SessionEvent::SpeechStarted).await;
        h.send(final_utt("你好")).await;
        h.wait_for(|s| s.state == TurnState::Translating).await;

        h.send(SessionEvent::SpeechStarted).await;
        h.send(final_utt("你好吗")).await;
        h.wait_for(|s| s.stats.completed == 1).await;

        assert_eq!(h.spoken(), vec!["How are you?"]);
        assert_eq!(h.snapshot.borrow().stats.superseded, 1);
        let calls = h.translator.calls.lock().unwrap().clone();
        assert_eq!(calls.last().map(String::as_str), Some("你好吗"));
    }

    #[tokio::test]
    async fn greeting_is_spoken_on_join() {
        let mut h = start(ScriptedTranslator::new(vec![]), MockRecognizer::ok(""), true);

        h.wait_for(|s| s.stats.completed == 1).await;
        assert_eq!(h.spoken(), vec!["你好，我是你的翻译助手。"]);
    }

    #[tokio::test]
    async fn audio_clip_is_transcribed_then_translated() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("turn.wav");
        std::fs::write(&clip, b"RIFF").unwrap();

        let mut h = start(
            ScriptedTranslator::new(vec![("谢谢", Ok("Thank you"))]),
            MockRecognizer::ok("谢谢"),
            false,
        );

        h.send(SessionEvent::SpeechStarted).await;
        h.send(SessionEvent::AudioClip(clip)).await;
        h.wait_for(|s| s.stats.completed == 1).await;

        assert_eq!(h.spoken(), vec!["Thank you"]);
    }

    #[tokio::test]
    async fn unreadable_clip_fails_the_turn() {
        let mut h = start(ScriptedTranslator::new(vec![]), MockRecognizer::ok("x"), false);

        h.send(SessionEvent::SpeechStarted).await;
        h.send(SessionEvent::AudioClip(PathBuf::from("/no/such/clip.wav")))
            .await;
        h.wait_for(|s| s.stats.failed == 1).await;

        let snap = h.snapshot.borrow().clone();
        assert_eq!(snap.state, TurnState::Idle);
        assert!(snap
            .last_error
            .as_deref()
            .is_some_and(|e| e.starts_with("recognition failed")));
        assert!(h.spoken().is_empty());
    }

    #[tokio::test]
    async fn translator_error_is_not_spoken() {
        let mut h = start(
            ScriptedTranslator::new(vec![("你好", Err(LlmError::Timeout))]),
            MockRecognizer::ok(""),
            false,
        );

        h.send(SessionEvent::SpeechStarted).await;
        h.send(final_utt("你好")).await;
        h.wait_for(|s| s.stats.failed == 1).await;

        assert!(h.spoken().is_empty());
    }

    #[tokio::test]
    async fn closing_events_returns_final_snapshot() {
        let mut h = start(ScriptedTranslator::new(vec![]), MockRecognizer::ok(""), false);

        h.send(SessionEvent::SpeechStarted).await;
        h.send(final_utt("悬而未决")).await;
        h.wait_for(|s| s.state == TurnState::Translating).await;

        drop(h.events);
        let snap = tokio::time::timeout(Duration::from_secs(2), h.task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.state, TurnState::Idle);
        assert_eq!(snap.stats.superseded, 1);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.session.greeting = false;
        config.session.event_buffer = 0;
        config.translation.target_language = "ja".into();

        let settings = SessionSettings::from_config(&config);
        assert!(!settings.greeting);
        assert_eq!(settings.event_buffer, 1);
        assert_eq!(settings.target_language, "ja");
    }
}
