//! Integration tests: full orchestrator runs against scripted pages and
//! `sh` stand-ins for the downloader.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::fake_pages::{refs, FakePages};
use common::scripts::Scripts;
use common::{
    assert_strictly_increasing, count_completed, count_errors, count_finished, drain,
    progress_values,
};
use favdl_core::listing::FetchError;
use favdl_core::media_job::{JobError, JobOutcome};
use favdl_core::orchestrator::{
    DownloadOrchestrator, OrchestratorEvent, RunError, RunOutcome, RunRequest, RunSettings,
    ScheduleMode,
};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn request(
    first_page: &[&str],
    total: usize,
    output_dir: &std::path::Path,
    mode: ScheduleMode,
) -> RunRequest {
    RunRequest {
        listing_id: "42".to_string(),
        first_page: refs(first_page),
        expected_total: total,
        output_dir: output_dir.to_path_buf(),
        mode,
    }
}

fn orchestrator(
    pages: Arc<FakePages>,
    scripts: Scripts,
    settings: RunSettings,
) -> (
    DownloadOrchestrator,
    mpsc::UnboundedReceiver<OrchestratorEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let orch = DownloadOrchestrator::new(pages, Arc::new(scripts), settings, tx);
    (orch, rx)
}

#[tokio::test]
async fn sequential_reports_item_fraction_and_completes() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(3));
    let scripts = Scripts::new().with("b", r"printf 'b 50%%\n'");
    let (orch, mut rx) = orchestrator(pages.clone(), scripts, RunSettings::default());

    let outcome = orch
        .run(request(&["a", "b", "c"], 3, dir.path(), ScheduleMode::Sequential))
        .await;
    let summary = match outcome {
        RunOutcome::Completed(s) => s,
        other => panic!("expected completion, got {:?}", other),
    };
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 3);

    let events = drain(&mut rx);
    let progress = progress_values(&events);
    assert_strictly_increasing(&progress);
    assert!(progress.contains(&50), "mid-item progress missing: {:?}", progress);
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(count_finished(&events), 3);
    assert_eq!(count_completed(&events), 1);
    assert!(matches!(events.last(), Some(OrchestratorEvent::Completed(p)) if p == dir.path()));
    assert!(pages.calls().is_empty(), "single page listing needs no fetch");
}

#[tokio::test]
async fn concurrent_counts_failures_as_processed() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(5).page(2, &["d", "e"]));
    let scripts = Scripts::new().with("b", "exit 1").with("e", "exit 2");
    let (orch, mut rx) = orchestrator(pages.clone(), scripts, RunSettings::default());

    let outcome = orch
        .run(request(&["a", "b", "c"], 5, dir.path(), ScheduleMode::Concurrent))
        .await;
    let summary = match outcome {
        RunOutcome::Completed(s) => s,
        other => panic!("expected completion, got {:?}", other),
    };
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);

    let events = drain(&mut rx);
    let progress = progress_values(&events);
    assert_strictly_increasing(&progress);
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(count_finished(&events), 5);
    assert_eq!(count_completed(&events), 1);
    assert_eq!(count_errors(&events), 0);
    assert!(matches!(events.last(), Some(OrchestratorEvent::Completed(_))));
    assert_eq!(pages.calls(), vec![2]);

    let failed: Vec<_> = events
        .iter()
        .filter_map(|ev| match ev {
            OrchestratorEvent::ItemFinished(r) if !r.outcome.is_success() => {
                Some(r.media.id.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"b".to_string()));
    assert!(failed.contains(&"e".to_string()));
}

#[tokio::test]
async fn concurrency_cap_limits_running_jobs() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(6).page(2, &["d", "e", "f"]));
    // Each job records how many jobs were running when it started, and
    // removes its marker before exiting.
    let scripts = Scripts::new().fallback(
        "mkdir -p running; touch running/$ID; ls running | wc -l > peak_$ID; sleep 0.2; rm running/$ID",
    );
    let settings = RunSettings {
        max_concurrent_jobs: Some(2),
        job_timeout: None,
    };
    let (orch, mut rx) = orchestrator(pages, scripts, settings);

    let outcome = orch
        .run(request(&["a", "b", "c"], 6, dir.path(), ScheduleMode::Concurrent))
        .await;
    assert!(matches!(outcome, RunOutcome::Completed(s) if s.succeeded == 6));

    for id in ["a", "b", "c", "d", "e", "f"] {
        let peak = std::fs::read_to_string(dir.path().join(format!("peak_{}", id))).unwrap();
        let peak: usize = peak.trim().parse().unwrap();
        assert!(peak <= 2, "job {} saw {} running jobs", id, peak);
    }
    assert_eq!(count_completed(&drain(&mut rx)), 1);
}

#[tokio::test]
async fn sequential_paginates_until_total() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(
        FakePages::new(4)
            .page(2, &["c", "d"])
            .page(3, &["never"]),
    );
    let scripts = Scripts::new().fallback("touch done_$ID");
    let (orch, mut rx) = orchestrator(pages.clone(), scripts, RunSettings::default());

    let outcome = orch
        .run(request(&["a", "b"], 4, dir.path(), ScheduleMode::Sequential))
        .await;
    assert!(matches!(outcome, RunOutcome::Completed(s) if s.processed == 4));
    assert_eq!(pages.calls(), vec![2]);
    for id in ["a", "b", "c", "d"] {
        assert!(dir.path().join(format!("done_{}", id)).exists(), "{} not run", id);
    }
    assert!(!dir.path().join("done_never").exists());
    assert_eq!(progress_values(&drain(&mut rx)).last(), Some(&100));
}

#[tokio::test]
async fn empty_listing_completes_immediately() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(0));
    for mode in [ScheduleMode::Sequential, ScheduleMode::Concurrent] {
        let (orch, mut rx) = orchestrator(pages.clone(), Scripts::new(), RunSettings::default());
        let outcome = orch.run(request(&[], 0, dir.path(), mode)).await;
        assert!(matches!(outcome, RunOutcome::Completed(s) if s.processed == 0));
        let events = drain(&mut rx);
        assert_eq!(progress_values(&events), vec![100]);
        assert_eq!(count_completed(&events), 1);
    }
    assert!(pages.calls().is_empty());
}

#[tokio::test]
async fn short_listing_completes_when_pages_run_out() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(5));
    let (orch, mut rx) = orchestrator(pages.clone(), Scripts::new(), RunSettings::default());

    let outcome = orch
        .run(request(&["a", "b"], 5, dir.path(), ScheduleMode::Concurrent))
        .await;
    assert!(matches!(outcome, RunOutcome::Completed(s) if s.processed == 2));
    assert_eq!(pages.calls(), vec![2]);
    let events = drain(&mut rx);
    assert_eq!(count_completed(&events), 1);
    assert_eq!(progress_values(&events).last(), Some(&40));
}

#[tokio::test]
async fn page_failure_emits_single_error() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(4).failing(2, "boom"));
    let (orch, mut rx) = orchestrator(pages, Scripts::new(), RunSettings::default());

    let outcome = orch
        .run(request(&["a", "b"], 4, dir.path(), ScheduleMode::Sequential))
        .await;
    assert!(matches!(
        outcome,
        RunOutcome::Failed(RunError::Fetch(FetchError::Malformed(_)))
    ));

    let events = drain(&mut rx);
    assert_eq!(count_errors(&events), 1);
    assert_eq!(count_completed(&events), 0);
    assert_eq!(count_finished(&events), 2);
    match events.last() {
        Some(OrchestratorEvent::Error(msg)) => assert!(msg.contains("boom"), "{}", msg),
        other => panic!("expected error last, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_page_failure_kills_running_jobs() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(4).failing(2, "gone"));
    let scripts = Scripts::new().fallback("sleep 30");
    let (orch, mut rx) = orchestrator(pages, scripts, RunSettings::default());

    let started = Instant::now();
    let outcome = orch
        .run(request(&["a", "b"], 4, dir.path(), ScheduleMode::Concurrent))
        .await;
    assert!(matches!(outcome, RunOutcome::Failed(RunError::Fetch(_))));
    assert!(started.elapsed() < Duration::from_secs(10));

    let events = drain(&mut rx);
    assert_eq!(count_errors(&events), 1);
    assert_eq!(count_completed(&events), 0);
    assert!(matches!(events.last(), Some(OrchestratorEvent::Error(_))));
}

#[tokio::test]
async fn timed_out_item_counts_as_failed() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(2));
    let scripts = Scripts::new().with("slow", "sleep 30");
    let settings = RunSettings {
        max_concurrent_jobs: None,
        job_timeout: Some(Duration::from_millis(300)),
    };
    let (orch, mut rx) = orchestrator(pages, scripts, settings);

    let outcome = orch
        .run(request(&["slow", "fast"], 2, dir.path(), ScheduleMode::Sequential))
        .await;
    assert!(matches!(
        outcome,
        RunOutcome::Completed(s) if s.processed == 2 && s.succeeded == 1 && s.failed == 1
    ));

    let events = drain(&mut rx);
    let timed_out = events.iter().any(|ev| {
        matches!(
            ev,
            OrchestratorEvent::ItemFinished(r)
                if r.media.id == "slow"
                    && matches!(r.outcome, JobOutcome::Failed(JobError::TimedOut(_)))
        )
    });
    assert!(timed_out);
    assert_eq!(progress_values(&events).last(), Some(&100));
}

#[tokio::test]
async fn unusable_output_dir_fails_run() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let pages = Arc::new(FakePages::new(1));
    let (orch, mut rx) = orchestrator(pages, Scripts::new(), RunSettings::default());

    let outcome = orch
        .run(request(&["a"], 1, &file.join("videos"), ScheduleMode::Sequential))
        .await;
    assert!(matches!(outcome, RunOutcome::Failed(RunError::OutputDir { .. })));
    let events = drain(&mut rx);
    assert_eq!(count_errors(&events), 1);
    assert_eq!(count_completed(&events), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_sequential_run() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(3));
    let scripts = Scripts::new()
        .with("b", r"echo $$ > b.pid; printf '10%%\n'; sleep 30")
        .with("c", "touch c.started");
    let (orch, mut rx) = orchestrator(pages, scripts, RunSettings::default());
    let orch = Arc::new(orch);

    let runner = {
        let orch = Arc::clone(&orch);
        let req = request(&["a", "b", "c"], 3, dir.path(), ScheduleMode::Sequential);
        tokio::spawn(async move { orch.run(req).await })
    };

    // Wait until item b reported its first progress (1.1 / 3 items).
    let mut before = Vec::new();
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("progress before timeout")
            .expect("channel open");
        let reached = matches!(ev, OrchestratorEvent::Progress(p) if p > 33);
        before.push(ev);
        if reached {
            break;
        }
    }
    assert_eq!(count_finished(&before), 1);

    orch.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .expect("run ends after cancel")
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled(s) if s.processed == 1));

    let after = drain(&mut rx);
    assert!(after.is_empty(), "events after cancel: {:?}", after);
    assert!(!dir.path().join("c.started").exists());

    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(dir.path().join("b.pid")).unwrap();
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid.trim()));
        if let Ok(stat) = stat {
            assert!(stat.contains(") Z"), "downloader still alive: {}", stat);
        }
    }

    // Cancelling again is a no-op.
    orch.cancel();
    assert!(orch.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_concurrent_run_and_descendants() {
    let dir = tempdir().unwrap();
    let pages = Arc::new(FakePages::new(3));
    // Each downloader forks a long-running grandchild and waits on it.
    let scripts = Scripts::new().fallback("sleep 60 & echo $! > $ID.child; wait");
    let (orch, mut rx) = orchestrator(pages, scripts, RunSettings::default());
    let orch = Arc::new(orch);

    let runner = {
        let orch = Arc::clone(&orch);
        let req = request(&["a", "b", "c"], 3, dir.path(), ScheduleMode::Concurrent);
        tokio::spawn(async move { orch.run(req).await })
    };

    let child_files: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|id| dir.path().join(format!("{}.child", id)))
        .collect();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut child_pids = Vec::new();
    while child_pids.len() < child_files.len() {
        assert!(Instant::now() < deadline, "grandchildren never started");
        child_pids = child_files
            .iter()
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .filter_map(|s| s.trim().parse::<u32>().ok())
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let before = drain(&mut rx);
    assert_eq!(count_finished(&before), 0);

    let started = Instant::now();
    orch.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .expect("run ends after cancel")
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled(s) if s.processed == 0));
    assert!(started.elapsed() < Duration::from_secs(5));

    let after = drain(&mut rx);
    assert!(after.is_empty(), "events after cancel: {:?}", after);

    #[cfg(target_os = "linux")]
    for pid in child_pids {
        // The killed grandchild is reparented and reaped; allow a moment.
        let gone = (0..50).any(|_| {
            let alive = match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Ok(stat) => !stat.contains(") Z"),
                Err(_) => false,
            };
            if alive {
                std::thread::sleep(Duration::from_millis(20));
            }
            !alive
        });
        assert!(gone, "grandchild {} survived cancel", pid);
    }
}
