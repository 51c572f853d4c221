//! Page gating and the end-to-end wizard flow.

mod common;

use common::{options, write_file, FakeBackend, Script, SUMMARY, TRANSCRIPT};
use meetwise::backend::{ProcessingState, ProcessingBackend};
use meetwise::config::Config;
use meetwise::poller::PollLimit;
use meetwise::session::JobState;
use meetwise::source::SourceKind;
use meetwise::wizard::{Page, WizardNavigator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn navigator(backend: &Arc<FakeBackend>) -> WizardNavigator {
    WizardNavigator::new(backend.clone(), options(120), false)
}

#[tokio::test(start_paused = true)]
async fn test_upload_page_gates_on_completed_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "standup.wav", 5 * 1024 * 1024, 7);
    let backend = FakeBackend::completing_after(3);
    let mut wizard = navigator(&backend);

    assert!(wizard.can_advance(1));
    assert!(wizard.next().await);
    assert_eq!(wizard.current_page(), Page::Upload);
    assert!(!wizard.can_advance(2));

    wizard.ingestion_mut().select_file(&path).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    assert!(!wizard.can_advance(2));
    assert!(!wizard.go_to(3).await);
    assert_eq!(wizard.current_page(), Page::Upload);

    wizard.ingestion().settled().await;
    assert!(wizard.can_advance(2));
    assert!(wizard.go_to(3).await);
    assert_eq!(wizard.current_page(), Page::Transcription);
}

#[tokio::test(start_paused = true)]
async fn test_cannot_skip_ahead_past_unfinished_pages() {
    let backend = FakeBackend::new();
    let mut wizard = navigator(&backend);

    assert!(!wizard.go_to(4).await);
    assert_eq!(wizard.current_page(), Page::Welcome);

    assert!(!wizard.go_to(0).await);
    assert!(!wizard.go_to(5).await);
    assert_eq!(wizard.current_page(), Page::Welcome);
    assert!(!wizard.back().await);
}

#[tokio::test(start_paused = true)]
async fn test_back_is_always_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "demo.mp3", 2048, 1);
    let backend = FakeBackend::completing_after(0);
    let mut wizard = navigator(&backend);

    wizard.next().await;
    wizard.ingestion_mut().select_file(&path).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    wizard.ingestion().settled().await;
    assert!(wizard.go_to(3).await);

    assert!(wizard.back().await);
    assert_eq!(wizard.current_page(), Page::Upload);
    assert!(wizard.go_to(1).await);
    assert_eq!(wizard.current_page(), Page::Welcome);

    // Finished pages stay finished, so jumping forward again works.
    assert!(wizard.go_to(3).await);
}

#[tokio::test(start_paused = true)]
async fn test_direct_advance_accepts_a_ready_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "planning.m4a", 2048, 1);
    let backend = FakeBackend::new();
    let mut config = Config::default();
    config.wizard.direct_advance = true;
    let mut wizard = WizardNavigator::from_config(backend.clone(), &config);

    wizard.next().await;
    assert!(!wizard.can_advance(2));

    wizard.ingestion_mut().select_file(&path).await.unwrap();
    assert!(wizard.can_advance(2));
    assert!(wizard.go_to(3).await);
    assert_eq!(backend.calls("upload_file"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_wizard_run_and_finish() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "quarterly.wav", 64 * 1024, 3);
    let backend = FakeBackend::with_script(Script {
        processing: [ProcessingState::Processing].into_iter().collect(),
        processing_default: ProcessingState::Completed,
        transcription_pending: 2,
        summary_pending: 1,
        ..Script::default()
    });
    let mut wizard = navigator(&backend);

    // Upload
    wizard.next().await;
    wizard.ingestion_mut().select_file(&path).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    assert!(wizard.ingestion().settled().await.is_completed());
    assert!(wizard.next().await);

    // Transcription
    wizard.transcription_mut().start().await.unwrap();
    let transcribed = wizard.transcription().settled().await;
    assert_eq!(transcribed.job_state, JobState::Completed);
    assert_eq!(transcribed.result_text, TRANSCRIPT);
    assert_eq!(backend.calls("transcription_status"), 3);
    assert!(wizard.next().await);
    assert_eq!(wizard.current_page(), Page::Summary);

    // Summary
    wizard.summary_mut().start().await.unwrap();
    let summarized = wizard.summary().settled().await;
    assert_eq!(summarized.job_state, JobState::Completed);
    assert_eq!(summarized.result_text, SUMMARY);
    assert_eq!(backend.summary_inputs(), vec![Some(TRANSCRIPT.to_string())]);
    assert!(wizard.can_advance(4));

    // Finish
    assert!(wizard.finish().await);
    assert_eq!(wizard.current_page(), Page::Welcome);
    for session in [wizard.ingestion(), wizard.transcription(), wizard.summary()] {
        assert_eq!(session.job_state(), JobState::Idle);
        assert!(session.result_text().is_empty());
    }
    assert_eq!(wizard.ingestion().selector().kind(), SourceKind::None);
}

#[tokio::test(start_paused = true)]
async fn test_finish_only_from_last_page() {
    let backend = FakeBackend::new();
    let mut wizard = navigator(&backend);

    assert!(!wizard.finish().await);
    assert_eq!(wizard.current_page(), Page::Welcome);
}

#[tokio::test(start_paused = true)]
async fn test_finish_cancels_a_running_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sync.wav", 4096, 3);
    let backend = FakeBackend::with_script(Script {
        processing_default: ProcessingState::Completed,
        summary_pending: u32::MAX,
        ..Script::default()
    });
    let mut wizard = navigator(&backend);

    wizard.next().await;
    wizard.ingestion_mut().select_file(&path).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    wizard.ingestion().settled().await;
    wizard.next().await;
    wizard.transcription_mut().start().await.unwrap();
    wizard.transcription().settled().await;
    wizard.next().await;

    wizard.summary_mut().start().await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(wizard.summary().job_state(), JobState::Processing);

    assert!(wizard.finish().await);
    assert_eq!(backend.calls("cancel_processing"), 1);

    let checks = backend.calls("summary_text");
    sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls("summary_text"), checks);
}

#[tokio::test(start_paused = true)]
async fn test_live_flag_carries_to_later_pages() {
    let backend = FakeBackend::with_script(Script {
        processing_default: ProcessingState::Completed,
        ..Script::default()
    });
    let mut wizard = WizardNavigator::new(backend.clone(), options(2), false);

    wizard.next().await;
    wizard.ingestion_mut().start_recording().await.unwrap();
    assert_eq!(
        wizard.ingestion().selector().kind(),
        SourceKind::LiveRecording
    );
    wizard.ingestion_mut().stop_recording().await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    wizard.ingestion().settled().await;

    assert!(wizard.go_to(3).await);
    assert!(wizard.transcription().is_live_source());
    assert_eq!(wizard.transcription().poll_limit(), PollLimit::Unbounded);
    assert_eq!(wizard.summary().poll_limit(), PollLimit::Bounded(2));
}

#[tokio::test(start_paused = true)]
async fn test_sessions_share_one_backend() {
    let backend = FakeBackend::new();
    let shared: Arc<dyn ProcessingBackend> = backend.clone();
    let wizard = WizardNavigator::new(shared, options(120), false);

    assert_ne!(wizard.ingestion().id(), wizard.transcription().id());
    assert_ne!(wizard.transcription().id(), wizard.summary().id());
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_upload_invalidates_later_pages() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "a.wav", 4096, 1);
    let second = write_file(dir.path(), "b.wav", 4096, 2);
    let backend = FakeBackend::completing_after(0);
    let mut wizard = navigator(&backend);

    wizard.next().await;
    wizard.ingestion_mut().select_file(&first).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    wizard.ingestion().settled().await;
    assert!(wizard.next().await);
    wizard.transcription_mut().start().await.unwrap();
    wizard.transcription().settled().await;
    assert!(wizard.next().await);
    wizard.summary_mut().start().await.unwrap();
    assert!(wizard.summary().settled().await.is_completed());
    assert!(wizard.can_advance(4));

    assert!(wizard.back().await);
    assert!(wizard.back().await);
    assert_eq!(wizard.current_page(), Page::Upload);
    wizard.ingestion_mut().select_file(&second).await.unwrap();
    wizard.ingestion_mut().start().await.unwrap();
    assert!(wizard.ingestion().settled().await.is_completed());

    assert!(wizard.can_advance(2));
    assert!(!wizard.can_advance(3));
    assert!(!wizard.go_to(4).await);
    assert_eq!(wizard.current_page(), Page::Upload);

    assert!(wizard.go_to(3).await);
    assert_eq!(wizard.transcription().job_state(), JobState::Idle);
    assert!(wizard.transcription().result_text().is_empty());

    wizard.transcription_mut().start().await.unwrap();
    wizard.transcription().settled().await;
    assert!(wizard.can_advance(3));
    assert!(wizard.go_to(4).await);
    assert_eq!(wizard.summary().job_state(), JobState::Idle);
    assert!(!wizard.can_advance(4));
    assert_eq!(backend.uploads(), vec!["a.wav", "b.wav"]);
}
