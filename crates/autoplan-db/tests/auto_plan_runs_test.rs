//! Integration tests for the auto-plan month claim.

use autoplan_db::models::RunStatus;
use autoplan_db::queries::{auto_plan_runs, users};
use autoplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn claim_is_exclusive_until_released() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "claims@example.com").await.unwrap();

    let first = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .expect("first claim should succeed");
    assert_eq!(first.status, RunStatus::Running);

    let second = auto_plan_runs::claim_month(&pool, user.id, "2026-11").await.unwrap();
    assert!(second.is_none(), "a running claim must block a second claim");

    // Other months are independent.
    assert!(
        auto_plan_runs::claim_month(&pool, user.id, "2026-12")
            .await
            .unwrap()
            .is_some()
    );

    auto_plan_runs::fail_run(&pool, user.id, "2026-11", first.started_at)
        .await
        .unwrap();
    let retried = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .expect("a failed run can be claimed again");
    assert_eq!(retried.status, RunStatus::Running);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn completed_claim_blocks_forever() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "done@example.com").await.unwrap();

    let claim = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    auto_plan_runs::complete_run(&pool, user.id, "2026-11", claim.started_at, 7)
        .await
        .unwrap();

    // fail_run only touches running claims.
    auto_plan_runs::fail_run(&pool, user.id, "2026-11", claim.started_at)
        .await
        .unwrap();

    let run = auto_plan_runs::get_run(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.item_count, 7);
    assert!(run.finished_at.is_some());

    assert!(
        auto_plan_runs::claim_month(&pool, user.id, "2026-11")
            .await
            .unwrap()
            .is_none()
    );

    assert!(auto_plan_runs::delete_run(&pool, user.id, "2026-11").await.unwrap());
    assert!(
        auto_plan_runs::claim_month(&pool, user.id, "2026-11")
            .await
            .unwrap()
            .is_some()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn stale_running_claim_can_be_taken_over() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "stale@example.com").await.unwrap();

    auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    sqlx::query(
        "UPDATE auto_plan_runs SET started_at = now() - interval '1 hour' \
         WHERE user_id = $1 AND month = '2026-11'",
    )
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();

    assert!(
        auto_plan_runs::claim_month(&pool, user.id, "2026-11")
            .await
            .unwrap()
            .is_some()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn complete_run_without_claim_errors() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "none@example.com").await.unwrap();

    let result = auto_plan_runs::complete_run(&pool, user.id, "2026-11", chrono::Utc::now(), 1).await;
    assert!(result.is_err());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn taken_over_claim_cannot_be_completed_or_released() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "takeover@example.com").await.unwrap();

    let original = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    sqlx::query(
        "UPDATE auto_plan_runs SET started_at = started_at - interval '1 hour' \
         WHERE user_id = $1 AND month = '2026-11'",
    )
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();
    let stale_started_at = auto_plan_runs::get_run(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap()
        .started_at;
    assert!(stale_started_at < original.started_at);

    let takeover = auto_plan_runs::claim_month(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .expect("stale claim should be taken over");
    assert_ne!(takeover.started_at, stale_started_at);

    // The original holder no longer owns the month.
    let mut tx = pool.begin().await.unwrap();
    let refused =
        auto_plan_runs::complete_run(&mut *tx, user.id, "2026-11", stale_started_at, 3).await;
    assert!(refused.is_err());
    tx.rollback().await.unwrap();

    auto_plan_runs::fail_run(&pool, user.id, "2026-11", stale_started_at)
        .await
        .unwrap();
    let run = auto_plan_runs::get_run(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Running);

    auto_plan_runs::complete_run(&pool, user.id, "2026-11", takeover.started_at, 2)
        .await
        .unwrap();
    let run = auto_plan_runs::get_run(&pool, user.id, "2026-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.item_count, 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}
