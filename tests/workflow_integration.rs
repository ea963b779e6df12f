//! End-to-end workflow scenarios against both store backends

use fixhub::FixhubError;
use fixhub::core::{Actor, Location, NewTicket, Priority, Status, TicketPatch};
use fixhub::events::EventHub;
use fixhub::query::TicketQueries;
use fixhub::storage::{FileStore, MemoryStore, TicketStore};
use fixhub::workflow::WorkflowEngine;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn draft(description: &str) -> NewTicket {
    NewTicket::new(
        description,
        Location::new("Main hall").with_zone("north"),
        Priority::Important,
    )
}

fn memory_engine() -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(MemoryStore::new()), EventHub::default())
}

#[test]
fn test_assume_renounce_reassign_resolve() {
    let engine = memory_engine();
    let a = Actor::reporter("a");
    let b = Actor::handler("b");
    let c = Actor::handler("c");

    let ticket = engine.create(&a, draft("door does not lock")).unwrap();
    engine.assume(&ticket.id, &b).unwrap();
    engine.renounce(&ticket.id, &b).unwrap();
    engine.assume(&ticket.id, &c).unwrap();
    let done = engine.resolve(&ticket.id, &c, "lock replaced").unwrap();

    assert_eq!(done.status, Status::Done);
    assert!(done.assignee_id.is_none());
    let resolution = done.resolution.unwrap();
    assert_eq!(resolution.resolved_by, c.id);
    assert_eq!(resolution.description, "lock replaced");
    assert_eq!(done.version, 5);
}

#[test]
fn test_reject_with_empty_reason_leaves_ticket_in_progress() {
    let engine = memory_engine();
    let b = Actor::handler("b");
    let ticket = engine.create(&Actor::reporter("a"), draft("draught")).unwrap();
    engine.assume(&ticket.id, &b).unwrap();

    let err = engine.reject(&ticket.id, &b, "").unwrap_err();
    assert!(matches!(err, FixhubError::InvalidInput(_)));

    let current = engine.get(&ticket.id).unwrap();
    assert_eq!(current.status, Status::InProgress);
    assert_eq!(current.assignee_id, Some(b.id));
}

#[test]
fn test_resolve_by_non_assignee_is_forbidden() {
    let engine = memory_engine();
    let ticket = engine.create(&Actor::reporter("a"), draft("cracked tile")).unwrap();
    let before = engine.assume(&ticket.id, &Actor::handler("b")).unwrap();

    let err = engine
        .resolve(&ticket.id, &Actor::handler("c"), "fixed it")
        .unwrap_err();
    assert!(matches!(err, FixhubError::Forbidden { .. }));
    assert_eq!(engine.get(&ticket.id).unwrap(), before);
}

#[test]
fn test_terminal_status_is_final() {
    let engine = memory_engine();
    let reporter = Actor::reporter("a");
    let handler = Actor::handler("b");
    let ticket = engine.create(&reporter, draft("broken window")).unwrap();
    engine.assume(&ticket.id, &handler).unwrap();
    let rejected = engine.reject(&ticket.id, &handler, "outside our area").unwrap();
    assert_eq!(rejected.status, Status::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("outside our area"));

    assert!(engine.assume(&ticket.id, &handler).is_err());
    assert!(engine.renounce(&ticket.id, &handler).is_err());
    assert!(engine.resolve(&ticket.id, &handler, "late fix").is_err());
    assert!(engine.withdraw(&ticket.id, &reporter).is_err());
    assert!(
        engine
            .edit(
                &ticket.id,
                &reporter,
                TicketPatch {
                    priority: Some(Priority::Urgent),
                    ..TicketPatch::default()
                },
            )
            .is_err()
    );
    assert_eq!(engine.get(&ticket.id).unwrap(), rejected);
}

#[test]
fn test_concurrent_assume_has_exactly_one_winner() {
    for _ in 0..20 {
        let engine = memory_engine();
        let ticket = engine.create(&Actor::reporter("a"), draft("no heating")).unwrap();

        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));
        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let engine = engine.clone();
                let barrier = Arc::clone(&barrier);
                let id = ticket.id.clone();
                thread::spawn(move || {
                    let handler = Actor::handler(format!("handler-{i}"));
                    barrier.wait();
                    (handler.id.clone(), engine.assume(&id, &handler))
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = outcomes.iter().filter(|(_, r)| r.is_ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one assume must succeed");

        for (_, result) in &outcomes {
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        FixhubError::Conflict { .. } | FixhubError::IllegalTransition { .. }
                    ),
                    "unexpected loser error: {e}"
                );
            }
        }

        let final_ticket = engine.get(&ticket.id).unwrap();
        assert_eq!(final_ticket.status, Status::InProgress);
        assert_eq!(final_ticket.assignee_id.as_ref(), Some(&winners[0].0));
        assert_eq!(final_ticket.version, 2);
    }
}

#[test]
fn test_unrelated_tickets_progress_in_parallel() {
    let engine = memory_engine();
    let tickets: Vec<_> = (0..16)
        .map(|i| {
            engine
                .create(&Actor::reporter("a"), draft(&format!("issue {i}")))
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = tickets
        .iter()
        .enumerate()
        .map(|(i, ticket)| {
            let engine = engine.clone();
            let id = ticket.id.clone();
            thread::spawn(move || {
                let handler = Actor::handler(format!("h{i}"));
                engine.assume(&id, &handler)?;
                engine.resolve(&id, &handler, "done")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().status, Status::Done);
    }
}

#[test]
fn test_file_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let reporter = Actor::reporter("a");
    let handler = Actor::handler("b");

    let id = {
        let store = Arc::new(FileStore::open(temp_dir.path()).unwrap());
        let engine = WorkflowEngine::new(store, EventHub::default());
        let ticket = engine.create(&reporter, draft("mould in bathroom")).unwrap();
        engine.assume(&ticket.id, &handler).unwrap();
        ticket.id
    };

    let store: Arc<dyn TicketStore> = Arc::new(FileStore::open(temp_dir.path()).unwrap());
    let engine = WorkflowEngine::new(Arc::clone(&store), EventHub::default());
    let reloaded = engine.get(&id).unwrap();
    assert_eq!(reloaded.status, Status::InProgress);
    assert_eq!(reloaded.assignee_id, Some(handler.id.clone()));
    assert_eq!(reloaded.version, 2);

    engine.resolve(&id, &handler, "treated walls").unwrap();
    let closed = TicketQueries::new(store).closed(&handler, None).unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].id, id);
}

#[test]
fn test_file_store_concurrent_assume() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::open(temp_dir.path()).unwrap());
    let engine = WorkflowEngine::new(store, EventHub::default());
    let ticket = engine.create(&Actor::reporter("a"), draft("lift stuck")).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            let barrier = Arc::clone(&barrier);
            let id = ticket.id.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.assume(&id, &Actor::handler(format!("h{i}"))).is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn test_queries_hide_withdrawn_tickets() {
    let store: Arc<dyn TicketStore> = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(Arc::clone(&store), EventHub::default());
    let queries = TicketQueries::new(store);
    let a = Actor::reporter("a");

    let kept = engine.create(&a, draft("keep me")).unwrap();
    let gone = engine.create(&a, draft("never mind")).unwrap();
    engine.withdraw(&gone.id, &a).unwrap();

    let mine = queries.reported_by(&a, None).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, kept.id);

    let pool = queries.assigned_to(&Actor::handler("b"), None).unwrap();
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_views_survive_a_damaged_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn TicketStore> = Arc::new(FileStore::open(temp_dir.path()).unwrap());
    let engine = WorkflowEngine::new(Arc::clone(&store), EventHub::default());
    let queries = TicketQueries::new(store);
    let a = Actor::reporter("alice");

    let intact = engine.create(&a, draft("leaking tap")).unwrap();
    let damaged = engine.create(&a, draft("noisy fan")).unwrap();
    let path = temp_dir
        .path()
        .join("tickets")
        .join(format!("{}.yaml", damaged.id));
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("PENDING", "CLOSED")).unwrap();

    let mine = queries.reported_by(&a, None).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, intact.id);

    let pool = queries.assigned_to(&Actor::handler("bob"), None).unwrap();
    assert_eq!(pool.len(), 1);
}
