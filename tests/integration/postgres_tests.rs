//! Postgres store tests
//!
//! These tests need a disposable database (they create rows and never clean up).
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_tests -- --ignored

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use tokio_test::{assert_err, assert_ok};

use common::{new_book, new_member, RecordingNotifier};
use libris_server::{
    config::CirculationConfig,
    models::{
        book::UpdateBook,
        circulation::{CirculationFilter, NewCirculation},
        enums::MemberStatus,
        member::UpdateMember,
    },
    repository::{CatalogStore, Repository},
    services::circulation::CirculationService,
    AppError,
};

async fn repository() -> Arc<Repository> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(12)
        .connect(&url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
    Arc::new(Repository::new(pool))
}

#[tokio::test]
#[ignore]
async fn test_checkout_and_checkin_move_the_counter() {
    let repo = repository().await;
    let book = repo.create_book(&new_book("Pg Book", "Pg Author", 2)).await.unwrap();
    let member = repo.create_member(&new_member("Pg Reader")).await.unwrap();
    let circulation = CirculationService::new(
        repo.clone(),
        Arc::new(RecordingNotifier::default()),
        CirculationConfig::default(),
    );

    assert_ok!(circulation.issue(book.id, member.id, None).await);
    assert_eq!(repo.get_book(book.id).await.unwrap().available_copies, 1);

    assert_ok!(circulation.return_book(book.id).await);
    assert_eq!(repo.get_book(book.id).await.unwrap().available_copies, 2);

    let err = assert_err!(circulation.return_book(book.id).await);
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_checkouts_respect_copies() {
    let repo = repository().await;
    let book_id = repo
        .create_book(&new_book("Contended", "Pg Author", 3))
        .await
        .unwrap()
        .id;
    let circulation = CirculationService::new(
        repo.clone(),
        Arc::new(RecordingNotifier::default()),
        CirculationConfig::default(),
    );

    let mut handles = Vec::new();
    for i in 0..10 {
        let member = repo
            .create_member(&new_member(&format!("Pg Reader {}", i)))
            .await
            .unwrap();
        let circulation = circulation.clone();
        handles.push(tokio::spawn(async move {
            circulation.issue(book_id, member.id, None).await
        }));
    }

    let mut issued = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(issued, 3);
    let book = repo.get_book(book_id).await.unwrap();
    assert_eq!(book.available_copies, 0);
    let open = repo
        .list_circulation(&CirculationFilter::open_for_book(book_id))
        .await
        .unwrap();
    assert_eq!(open.len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_resize_and_delete_guards() {
    let repo = repository().await;
    let book = repo.create_book(&new_book("Guarded", "Pg Author", 2)).await.unwrap();
    let member = repo.create_member(&new_member("Pg Holder")).await.unwrap();
    let circulation = CirculationService::new(
        repo.clone(),
        Arc::new(RecordingNotifier::default()),
        CirculationConfig::default(),
    );
    assert_ok!(circulation.issue(book.id, member.id, None).await);
    assert_ok!(circulation.issue(book.id, member.id, None).await);

    let shrink = UpdateBook {
        total_copies: Some(1),
        ..Default::default()
    };
    let err = assert_err!(repo.update_book(book.id, &shrink).await);
    assert!(matches!(err, AppError::Conflict(_)));

    let err = assert_err!(repo.delete_book(book.id).await);
    assert!(matches!(err, AppError::Conflict(_)));

    let err = assert_err!(repo.delete_member(member.id).await);
    assert!(matches!(err, AppError::Conflict(_)));
}

fn loan(book_id: uuid::Uuid, member_id: uuid::Uuid) -> NewCirculation {
    let now = Utc::now();
    NewCirculation {
        book_id,
        member_id,
        issue_date: now,
        due_date: now + Duration::days(14),
    }
}

#[tokio::test]
#[ignore]
async fn test_checkout_rechecks_member_inside_transaction() {
    let repo = repository().await;
    let book = repo.create_book(&new_book("Rechecked", "Pg Author", 1)).await.unwrap();
    let member = repo.create_member(&new_member("Pg Suspended")).await.unwrap();
    repo.update_member(
        member.id,
        &UpdateMember {
            status: Some(MemberStatus::Suspended),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = assert_err!(repo.checkout(&loan(book.id, member.id)).await);
    assert!(matches!(err, AppError::Validation(_)));

    let err = assert_err!(repo.checkout(&loan(book.id, uuid::Uuid::new_v4())).await);
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(repo.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_delete_racing_checkout_keeps_loans_consistent() {
    let repo = repository().await;

    for round in 0..20 {
        let book_id = repo
            .create_book(&new_book(&format!("Raced {}", round), "Pg Author", 1))
            .await
            .unwrap()
            .id;
        let member_id = repo
            .create_member(&new_member(&format!("Pg Racer {}", round)))
            .await
            .unwrap()
            .id;

        let issue = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.checkout(&loan(book_id, member_id)).await })
        };
        let delete_book = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.delete_book(book_id).await })
        };
        let delete_member = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.delete_member(member_id).await })
        };

        let issued = issue.await.expect("task panicked");
        let book_deleted = delete_book.await.expect("task panicked").is_ok();
        let member_deleted = delete_member.await.expect("task panicked").is_ok();

        let open = repo
            .list_circulation(&CirculationFilter::open_for_book(book_id))
            .await
            .unwrap();
        match issued {
            Ok(_) => {
                assert!(!book_deleted, "book deleted under an open loan");
                assert!(!member_deleted, "member deleted while holding a loan");
                assert_eq!(open.len(), 1);
                assert_eq!(repo.get_book(book_id).await.unwrap().available_copies, 0);
            }
            Err(e) => {
                assert!(matches!(e, AppError::NotFound(_)), "unexpected error: {}", e);
                assert!(open.is_empty());
            }
        }
    }
}
