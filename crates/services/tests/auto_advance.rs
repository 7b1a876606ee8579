mod common;

use std::time::Duration;

use common::{FakeCourseApi, course_id, harness, last_watched, lid, three_lectures};
use tokio::sync::Mutex;

#[tokio::test(start_paused = true)]
async fn advance_fires_after_delay() {
    let h = harness(FakeCourseApi::new(three_lectures()));
    let session = Mutex::new(h.service.open(&course_id()).await.unwrap());

    let ticket = {
        let mut guard = session.lock().await;
        h.service
            .mark_complete(&mut guard, &lid("L1"))
            .await
            .unwrap()
            .auto_advance
            .expect("advance scheduled")
    };
    assert_eq!(ticket.delay(), Duration::from_millis(1500));

    let moved = h.service.run_auto_advance(&session, ticket).await;

    assert_eq!(moved, Some(lid("L2")));
    assert_eq!(session.lock().await.current_lecture().unwrap().id(), &lid("L2"));
    assert_eq!(last_watched(&h.slots).await.as_deref(), Some("L2"));
}

#[tokio::test(start_paused = true)]
async fn manual_selection_during_delay_suppresses_advance() {
    let h = harness(FakeCourseApi::new(three_lectures()));
    let session = Mutex::new(h.service.open(&course_id()).await.unwrap());

    let ticket = {
        let mut guard = session.lock().await;
        let outcome = h.service.mark_complete(&mut guard, &lid("L1")).await.unwrap();
        assert_eq!(outcome.progress.percent(), 33.0);
        outcome.auto_advance.expect("advance scheduled")
    };

    let manual = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let mut guard = session.lock().await;
        h.service.select_lecture(&mut guard, &lid("L3")).await.unwrap();
    };
    let (moved, ()) = tokio::join!(h.service.run_auto_advance(&session, ticket), manual);

    assert_eq!(moved, None);
    assert_eq!(session.lock().await.current_lecture().unwrap().id(), &lid("L3"));
    assert_eq!(last_watched(&h.slots).await.as_deref(), Some("L3"));
}

#[tokio::test(start_paused = true)]
async fn newer_completion_replaces_pending_ticket() {
    let h = harness(FakeCourseApi::new(three_lectures()));
    let session = Mutex::new(h.service.open(&course_id()).await.unwrap());

    let (stale, fresh) = {
        let mut guard = session.lock().await;
        let stale = h.service.mark_complete(&mut guard, &lid("L1")).await.unwrap();
        h.service.select_lecture(&mut guard, &lid("L2")).await.unwrap();
        let fresh = h.service.mark_complete(&mut guard, &lid("L2")).await.unwrap();
        (stale.auto_advance.unwrap(), fresh.auto_advance.unwrap())
    };

    assert_eq!(h.service.run_auto_advance(&session, stale).await, None);
    assert_eq!(h.service.run_auto_advance(&session, fresh).await, Some(lid("L3")));
}

#[tokio::test(start_paused = true)]
async fn unmarking_cancels_pending_advance() {
    let h = harness(FakeCourseApi::new(three_lectures()));
    let session = Mutex::new(h.service.open(&course_id()).await.unwrap());

    let ticket = {
        let mut guard = session.lock().await;
        let ticket = h
            .service
            .mark_complete(&mut guard, &lid("L1"))
            .await
            .unwrap()
            .auto_advance
            .unwrap();
        h.service.mark_incomplete(&mut guard, &lid("L1")).await.unwrap();
        assert!(guard.pending_auto_advance().is_none());
        ticket
    };

    assert_eq!(h.service.run_auto_advance(&session, ticket).await, None);
    assert_eq!(session.lock().await.current_lecture().unwrap().id(), &lid("L1"));
}

#[tokio::test]
async fn no_advance_past_completed_or_last_lecture() {
    let h = harness(FakeCourseApi::new(three_lectures()).with_completed(&["L2"]));
    let mut session = h.service.open(&course_id()).await.unwrap();

    let outcome = h.service.mark_complete(&mut session, &lid("L1")).await.unwrap();
    assert!(outcome.auto_advance.is_none());

    let outcome = h.service.mark_complete(&mut session, &lid("L3")).await.unwrap();
    assert!(outcome.auto_advance.is_none());
}
