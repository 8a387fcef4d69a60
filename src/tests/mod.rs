use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::detector::{Classifier, MissReason, Verdict};
use crate::extractor::PathExtractor;
use crate::fingerprint::Fingerprint;
use crate::frontier::Frontier;
use crate::queue::{StopReason, Task, TaskQueue};

fn allowed() -> HashSet<u16> {
    crate::detector::DEFAULT_ALLOWED_STATUS.into_iter().collect()
}

#[test]
fn fingerprint_comparison_is_exact_after_trimming() {
    let classifier = Classifier::new(allowed(), Fingerprint::new(200, b"  Not Found\n"));
    assert_eq!(
        classifier.classify(200, "text/plain", b"Not Found"),
        Verdict::Miss(MissReason::NotFoundClone)
    );
    assert_eq!(
        classifier.classify(200, "text/plain", b"\tNot Found  "),
        Verdict::Miss(MissReason::NotFoundClone)
    );
    // near misses are different pages
    assert!(classifier.classify(200, "text/plain", b"Not Found.").is_hit());
    assert!(classifier.classify(200, "text/plain", b"not found").is_hit());
}

#[test]
fn unavailable_fingerprint_filters_nothing_but_status_and_html() {
    let classifier = Classifier::new(allowed(), Fingerprint::unavailable());
    assert!(classifier.classify(200, "application/json", b"").is_hit());
    assert_eq!(
        classifier.classify(200, "text/html; charset=utf-8", b"<p>x</p>"),
        Verdict::Miss(MissReason::Html)
    );
    assert_eq!(
        classifier.classify(404, "application/json", b"{}"),
        Verdict::Miss(MissReason::Status)
    );
}

#[test]
fn extracted_paths_and_seeds_share_one_identity() {
    let frontier = Frontier::new("http://x.test/");
    assert_eq!(
        frontier.claim_path("api/users").as_deref(),
        Some("http://x.test/api/users")
    );

    let extractor = PathExtractor::default();
    let found = extractor.extract(r#"fetch("/api/users");fetch("/API/orders/7")"#);
    let claimed: Vec<String> = found
        .iter()
        .filter_map(|p| frontier.claim_path(p))
        .collect();
    assert_eq!(claimed, vec!["http://x.test/API/orders/7".to_string()]);
    assert_eq!(frontier.len(), 2);
}

#[tokio::test]
async fn racing_workers_process_each_url_once() {
    let frontier = Arc::new(Frontier::new("http://x.test"));
    let queue = Arc::new(TaskQueue::new(2));
    let processed = Arc::new(Mutex::new(Vec::new()));
    let seeding = queue.hold();

    let workers: Vec<_> = (0..6)
        .map(|_| {
            let frontier = Arc::clone(&frontier);
            let queue = Arc::clone(&queue);
            let processed = Arc::clone(&processed);
            tokio::spawn(async move {
                while let Some(task) = queue.dequeue().await {
                    let _done = queue.adopt();
                    processed.lock().unwrap().push(task.url().to_string());
                    // every task rediscovers the same small set of paths
                    for n in 0..8 {
                        if let Some(url) = frontier.claim_path(&format!("/api/item/{n}")) {
                            queue.enqueue_discovered(Task::new(url));
                        }
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for seed in ["api/item/0", "/api/item/0", "admin"] {
        if let Some(url) = frontier.claim_path(seed) {
            assert!(queue.enqueue(Task::new(url)).await);
        }
    }
    drop(seeding);

    assert_eq!(queue.watch_termination().await, StopReason::Drained);
    for w in workers {
        w.await.unwrap();
    }

    let processed = processed.lock().unwrap();
    let unique: HashSet<&String> = processed.iter().collect();
    assert_eq!(processed.len(), unique.len());
    assert_eq!(processed.len(), 9);
}

#[test]
fn snippet_respects_char_boundaries() {
    let body = "é".repeat(150);
    let s = crate::detector::snippet(&body, 100);
    assert_eq!(s.chars().count(), 103);
    assert!(s.ends_with("..."));
    assert_eq!(crate::detector::snippet("short", 100), "short");
}
