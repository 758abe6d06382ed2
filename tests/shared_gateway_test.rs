//! Runs sharing one gateway: the response cache, the rate limiter and
//! per-run usage reporting.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use redraft::adapters::generators::ScriptedGenerator;
use redraft::adapters::memory::InMemoryCheckpointStore;
use redraft::domain::models::Termination;
use redraft::services::gateway::MinIntervalRateLimiter;
use redraft::services::prompts::PromptKind;
use redraft::RequestGateway;

use common::{config, controller_on, handle, one_section_draft, repair_json, scored_generator, verdict_json};

#[tokio::test]
async fn test_sequential_runs_report_only_their_own_usage() {
    let generator = scored_generator(vec![4.5]);
    let gateway = Arc::new(RequestGateway::new(generator.clone()));
    let controller = controller_on(
        &config(4.0, 5),
        gateway.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
    );

    let first = controller
        .run("rag", Some(one_section_draft()), Some("a".into()), &handle())
        .await
        .unwrap();
    let second = controller
        .run("rag", Some(one_section_draft()), Some("b".into()), &handle())
        .await
        .unwrap();

    assert_eq!(first.trace.len(), 1);
    assert_eq!(first.gateway.invocations, 1);
    assert_eq!(first.gateway.dispatches, 1);

    // the same draft is scored from the shared cache
    assert_eq!(second.trace.len(), 1);
    assert_eq!(second.gateway.invocations, 1);
    assert_eq!(second.gateway.cache_hits, 1);
    assert_eq!(second.gateway.dispatches, 0);

    assert_eq!(gateway.usage().invocations, 2);
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_cache_and_rate_limiter() {
    let dispatched_at = Arc::new(Mutex::new(Vec::new()));
    let times = dispatched_at.clone();
    let repairs = AtomicUsize::new(0);
    let generator = Arc::new(ScriptedGenerator::with_handler(move |request| {
        times.lock().unwrap().push(Instant::now());
        match PromptKind::detect(&request.prompt) {
            Some(PromptKind::Score) => Ok(verdict_json(3.0)),
            _ => Ok(repair_json(repairs.fetch_add(1, Ordering::SeqCst))),
        }
    }));
    let gateway = Arc::new(
        RequestGateway::new(generator.clone())
            .with_rate_limiter(MinIntervalRateLimiter::from_millis(3_000)),
    );
    let config = config(4.0, 1);
    let first = controller_on(&config, gateway.clone(), Arc::new(InMemoryCheckpointStore::new()));
    let second = controller_on(&config, gateway.clone(), Arc::new(InMemoryCheckpointStore::new()));

    let (handle_a, handle_b) = (handle(), handle());
    let (a, b) = tokio::join!(
        first.run("rag", Some(one_section_draft()), Some("a".into()), &handle_a),
        second.run("rag", Some(one_section_draft()), Some("b".into()), &handle_b),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.termination, Some(Termination::Exhausted));
    assert_eq!(b.termination, Some(Termination::Exhausted));

    // both runs start by scoring the same draft; it is dispatched once
    let requests = generator.requests();
    let opening = &requests[0].prompt;
    assert_eq!(PromptKind::detect(opening), Some(PromptKind::Score));
    assert_eq!(requests.iter().filter(|r| &r.prompt == opening).count(), 1);
    assert!(b.gateway.cache_hits >= 1);

    // every dispatch, from either run, waited out the shared interval
    let mut times = dispatched_at.lock().unwrap().clone();
    times.sort();
    assert_eq!(times.len(), generator.call_count());
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(3_000));
    }

    let total = gateway.usage();
    assert_eq!(total.invocations, a.gateway.invocations + b.gateway.invocations);
    assert_eq!(total.dispatches, a.gateway.dispatches + b.gateway.dispatches);
}
