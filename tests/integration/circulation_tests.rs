//! Circulation engine and reports against the in-memory store
//!
//! Run with: cargo test --test circulation_tests

mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use common::Library;
use libris_server::{
    models::{
        book::UpdateBook,
        circulation::{Circulation, CirculationFilter, CirculationQuery, CirculationView},
        enums::{BookStatus, CirculationStatus, MemberStatus},
        member::UpdateMember,
    },
    repository::CatalogStore,
    services::{
        changes::{ChangeAction, ChangeTable},
        reports::UNKNOWN_BOOK,
    },
    AppError,
};

async fn open_loans(lib: &Library, book_id: Uuid) -> usize {
    lib.store
        .list_circulation(&CirculationFilter::open_for_book(book_id))
        .await
        .expect("list circulation")
        .len()
}

// =============================================================================
// Issue / return
// =============================================================================

#[tokio::test]
async fn test_issue_then_return_restores_counter() {
    let lib = Library::new();
    let book = lib.book("The Hobbit", 2).await;
    let member = lib.member("Asha Rao").await;

    let loan = assert_ok!(lib.circulation.issue(book.id, member.id, None).await);
    assert_eq!(loan.status, CirculationStatus::Issued);
    assert_eq!(loan.due_date - loan.issue_date, Duration::days(14));

    let after_issue = lib.store.get_book(book.id).await.unwrap();
    assert_eq!(after_issue.available_copies, 1);
    assert_eq!(after_issue.status, BookStatus::Available);

    let returned = assert_ok!(lib.circulation.return_book(book.id).await);
    assert_eq!(returned.id, loan.id);
    assert_eq!(returned.status, CirculationStatus::Returned);
    assert!(returned.return_date.is_some());

    let after_return = lib.store.get_book(book.id).await.unwrap();
    assert_eq!(after_return.available_copies, 2);

    let events = lib.notifier.events();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].table, ChangeTable::Circulation);
    assert_eq!(events[0].action, ChangeAction::Insert);
    assert_eq!(events[1].table, ChangeTable::Books);
    assert_eq!(events[2].action, ChangeAction::Update);
}

#[tokio::test]
async fn test_last_copy_marks_book_issued() {
    let lib = Library::new();
    let book = lib.book("Dune", 1).await;
    let member = lib.member("Bilal Khan").await;

    assert_ok!(lib.circulation.issue(book.id, member.id, Some(7)).await);
    let book_now = lib.store.get_book(book.id).await.unwrap();
    assert_eq!(book_now.available_copies, 0);
    assert_eq!(book_now.status, BookStatus::Issued);

    assert_ok!(lib.circulation.return_book(book.id).await);
    let book_now = lib.store.get_book(book.id).await.unwrap();
    assert_eq!(book_now.status, BookStatus::Available);
}

#[tokio::test]
async fn test_issue_without_copies_is_conflict() {
    let lib = Library::new();
    let book = lib.book("Dune", 1).await;
    let first = lib.member("Bilal Khan").await;
    let second = lib.member("Chitra Nair").await;

    assert_ok!(lib.circulation.issue(book.id, first.id, None).await);
    let err = assert_err!(lib.circulation.issue(book.id, second.id, None).await);
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(open_loans(&lib, book.id).await, 1);
    assert_eq!(lib.store.get_book(book.id).await.unwrap().available_copies, 0);
}

#[tokio::test]
async fn test_double_return_is_conflict() {
    let lib = Library::new();
    let book = lib.book("Emma", 1).await;
    let member = lib.member("Dev Patel").await;

    assert_ok!(lib.circulation.issue(book.id, member.id, None).await);
    assert_ok!(lib.circulation.return_book(book.id).await);

    let err = assert_err!(lib.circulation.return_book(book.id).await);
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(lib.store.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let lib = Library::new();
    let member = lib.member("Esha Gupta").await;

    let err = assert_err!(lib.circulation.issue(Uuid::new_v4(), member.id, None).await);
    assert!(matches!(err, AppError::NotFound(_)));

    let err = assert_err!(lib.circulation.return_book(Uuid::new_v4()).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_return_closes_most_recent_loan() {
    let lib = Library::new();
    let book = lib.book("Ulysses", 3).await;
    let a = lib.member("Farah Ali").await;
    let b = lib.member("Gopal Iyer").await;
    let now = Utc::now();

    let older = assert_ok!(
        lib.circulation
            .issue_at(book.id, a.id, None, now - Duration::days(3))
            .await
    );
    let newer = assert_ok!(lib.circulation.issue_at(book.id, b.id, None, now).await);

    let returned = assert_ok!(lib.circulation.return_book(book.id).await);
    assert_eq!(returned.id, newer.id);

    let still_open = lib
        .store
        .list_circulation(&CirculationFilter::open_for_book(book.id))
        .await
        .unwrap();
    assert_eq!(still_open.len(), 1);
    assert_eq!(still_open[0].id, older.id);
}

#[tokio::test]
async fn test_open_loans_match_copies_out() {
    let lib = Library::new();
    let book = lib.book("Middlemarch", 4).await;
    let members = [
        lib.member("Hana Mori").await,
        lib.member("Imran Shaikh").await,
        lib.member("Jaya Menon").await,
    ];

    for m in &members {
        assert_ok!(lib.circulation.issue(book.id, m.id, None).await);
    }
    assert_ok!(lib.circulation.return_book(book.id).await);

    let book = lib.store.get_book(book.id).await.unwrap();
    assert_eq!(open_loans(&lib, book.id).await as i32, book.total_copies - book.available_copies);
    assert_eq!(book.available_copies, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_never_oversell() {
    let lib = Library::new();
    let book_id = lib.book("Beloved", 3).await.id;

    let mut handles = Vec::new();
    for i in 0..10 {
        let member = lib.member(&format!("Reader {}", i)).await;
        let circulation = lib.circulation.clone();
        handles.push(tokio::spawn(async move {
            circulation.issue(book_id, member.id, None).await
        }));
    }

    let mut issued = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(AppError::Conflict(_)) => refused += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(issued, 3);
    assert_eq!(refused, 7);
    assert_eq!(lib.store.get_book(book_id).await.unwrap().available_copies, 0);
    assert_eq!(open_loans(&lib, book_id).await, 3);
}

#[tokio::test]
async fn test_suspended_member_cannot_borrow() {
    let lib = Library::new();
    let book = lib.book("Persuasion", 1).await;
    let member = lib.member("Kiran Das").await;
    lib.store
        .update_member(
            member.id,
            &UpdateMember {
                status: Some(MemberStatus::Suspended),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = assert_err!(lib.circulation.issue(book.id, member.id, None).await);
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(lib.store.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_loan_period_bounds() {
    let lib = Library::new();
    let book = lib.book("Walden", 1).await;
    let member = lib.member("Leela Bose").await;

    let err = assert_err!(lib.circulation.issue(book.id, member.id, Some(0)).await);
    assert!(matches!(err, AppError::Validation(_)));
    let err = assert_err!(lib.circulation.issue(book.id, member.id, Some(366)).await);
    assert!(matches!(err, AppError::Validation(_)));
    assert!(lib.notifier.events().is_empty());
}

#[tokio::test]
async fn test_shrinking_below_copies_out_is_conflict() {
    let lib = Library::new();
    let book = lib.book("Kim", 3).await;
    let a = lib.member("Maya Roy").await;
    let b = lib.member("Nikhil Jain").await;
    assert_ok!(lib.circulation.issue(book.id, a.id, None).await);
    assert_ok!(lib.circulation.issue(book.id, b.id, None).await);

    let err = assert_err!(
        lib.store
            .update_book(
                book.id,
                &UpdateBook {
                    total_copies: Some(1),
                    ..Default::default()
                },
            )
            .await
    );
    assert!(matches!(err, AppError::Conflict(_)));

    let grown = assert_ok!(
        lib.store
            .update_book(
                book.id,
                &UpdateBook {
                    total_copies: Some(5),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(grown.total_copies, 5);
    assert_eq!(grown.available_copies, 3);
}

#[tokio::test]
async fn test_fine_is_recorded() {
    let lib = Library::new();
    let book = lib.book("Hamlet", 1).await;
    let member = lib.member("Om Prakash").await;
    let loan = assert_ok!(lib.circulation.issue(book.id, member.id, None).await);

    let fined = assert_ok!(lib.circulation.record_fine(loan.id, Decimal::new(250, 2)).await);
    assert_eq!(fined.fine_amount, Decimal::new(250, 2));

    let err = assert_err!(lib.circulation.record_fine(loan.id, Decimal::new(-1, 0)).await);
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_offline_store_is_transient() {
    let lib = Library::new();
    let book = lib.book("Othello", 1).await;
    let member = lib.member("Priya Sen").await;

    lib.store.set_offline(true);
    let err = assert_err!(lib.circulation.issue(book.id, member.id, None).await);
    assert!(matches!(err, AppError::Transient(_)));

    lib.store.set_offline(false);
    assert_ok!(lib.circulation.issue(book.id, member.id, None).await);
}

// =============================================================================
// Dashboard
// =============================================================================

fn imported(book_id: Uuid, member_id: Uuid, due_in_days: i64) -> Circulation {
    let now = Utc::now();
    Circulation {
        id: Uuid::new_v4(),
        book_id,
        member_id,
        issue_date: now - Duration::days(14),
        due_date: now + Duration::days(due_in_days),
        return_date: None,
        status: CirculationStatus::Issued,
        fine_amount: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_overdue_view_uses_the_clock() {
    let lib = Library::new();
    let late_book = lib.book("Late Book", 1).await;
    let fresh_book = lib.book("Fresh Book", 1).await;
    let member = lib.member("Ravi Kumar").await;

    let late = imported(late_book.id, member.id, -1);
    lib.store.import_circulation(late.clone()).await;
    lib.store
        .import_circulation(imported(fresh_book.id, member.id, 1))
        .await;

    let overdue = assert_ok!(
        lib.circulation
            .list(&CirculationQuery {
                view: CirculationView::Overdue,
                ..Default::default()
            })
            .await
    );
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].record.id, late.id);
    assert!(overdue[0].is_overdue);
    assert_eq!(overdue[0].record.status, CirculationStatus::Issued);

    let all = assert_ok!(lib.circulation.list(&CirculationQuery::default()).await);
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_dashboard_search_matches_member_and_title() {
    let lib = Library::new();
    let a = lib.book("Gitanjali", 2).await;
    let b = lib.book("Malgudi Days", 2).await;
    let sita = lib.member("Sita Verma").await;
    let tarun = lib.member("Tarun Joshi").await;
    assert_ok!(lib.circulation.issue(a.id, sita.id, None).await);
    assert_ok!(lib.circulation.issue(b.id, tarun.id, None).await);

    let by_member = assert_ok!(
        lib.circulation
            .list(&CirculationQuery {
                search: Some("sita".to_string()),
                ..Default::default()
            })
            .await
    );
    assert_eq!(by_member.len(), 1);
    assert_eq!(by_member[0].book_title, "Gitanjali");

    let by_title = assert_ok!(
        lib.circulation
            .list(&CirculationQuery {
                view: CirculationView::Issued,
                search: Some("malgudi".to_string()),
                ..Default::default()
            })
            .await
    );
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].member_name, "Tarun Joshi");
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_reports_rank_and_resolve_names() {
    let lib = Library::new();
    let a = lib.book("Book A", 1).await;
    let b = lib.book("Book B", 1).await;
    let c = lib.book("Book C", 1).await;
    let member = lib.member("Uma Shah").await;

    for (book, times) in [(&a, 5), (&b, 3), (&c, 1)] {
        for _ in 0..times {
            assert_ok!(lib.circulation.issue(book.id, member.id, None).await);
            assert_ok!(lib.circulation.return_book(book.id).await);
        }
    }
    assert_ok!(lib.store.delete_book(c.id).await);

    let reports = assert_ok!(lib.reports.get_reports(None).await);
    let ranking: Vec<(String, usize)> = reports
        .most_borrowed
        .iter()
        .map(|r| (r.title.clone(), r.count))
        .collect();
    assert_eq!(
        ranking,
        vec![
            ("Book A".to_string(), 5),
            ("Book B".to_string(), 3),
            (UNKNOWN_BOOK.to_string(), 1),
        ]
    );
    assert_eq!(reports.most_active.len(), 1);
    assert_eq!(reports.most_active[0].name, "Uma Shah");
    assert_eq!(reports.most_active[0].count, 9);
    assert!(reports.currently_issued.is_empty());
    assert!(reports.overdue.is_empty());

    let top = assert_ok!(lib.reports.get_reports(Some(1)).await);
    assert_eq!(top.most_borrowed.len(), 1);
    assert_eq!(top.most_borrowed[0].book_id, a.id);
}

#[tokio::test]
async fn test_reports_list_overdue_loans() {
    let lib = Library::new();
    let book = lib.book("Book D", 2).await;
    let member = lib.member("Varun Pillai").await;
    lib.store
        .import_circulation(imported(book.id, member.id, -2))
        .await;
    assert_ok!(lib.circulation.issue(book.id, member.id, None).await);

    let reports = assert_ok!(lib.reports.get_reports(None).await);
    assert_eq!(reports.currently_issued.len(), 2);
    assert_eq!(reports.overdue.len(), 1);
    assert!(reports.overdue[0].is_overdue);
    assert_eq!(reports.overdue[0].member_name, "Varun Pillai");
}
