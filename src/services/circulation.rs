//! Circulation engine: issue and return of book copies.
//!
//! This is the only code path that moves a book's available counter. The store
//! applies each operation atomically; this layer checks the caller's arguments,
//! resolves the member and publishes changes after commit.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::changes::{ChangeAction, ChangeEvent, ChangeNotifier, ChangeTable};
use super::reports::Directory;
use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        circulation::{
            Circulation, CirculationDetails, CirculationFilter, CirculationQuery, CirculationView,
            NewCirculation,
        },
        enums::CirculationStatus,
        matches_term,
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<dyn ChangeNotifier>,
    config: CirculationConfig,
}

impl CirculationService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        notifier: Arc<dyn ChangeNotifier>,
        config: CirculationConfig,
    ) -> Self {
        Self { store, notifier, config }
    }

    /// Lend one copy of a book to a member for `loan_days` (configured default when absent)
    pub async fn issue(
        &self,
        book_id: Uuid,
        member_id: Uuid,
        loan_days: Option<i64>,
    ) -> AppResult<Circulation> {
        self.issue_at(book_id, member_id, loan_days, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        book_id: Uuid,
        member_id: Uuid,
        loan_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Circulation> {
        let loan_days = loan_days.unwrap_or(self.config.default_loan_days);
        if loan_days < 1 || loan_days > self.config.max_loan_days {
            return Err(AppError::Validation(format!(
                "Loan period must be between 1 and {} days",
                self.config.max_loan_days
            )));
        }

        let member = self.store.get_member(member_id).await?;
        if !member.can_borrow() {
            tracing::warn!("Refused loan of book {} to {} member {}", book_id, member.status, member_id);
            return Err(AppError::Validation(format!(
                "Member {} is {} and cannot borrow",
                member.name, member.status
            )));
        }

        let loan = NewCirculation {
            book_id,
            member_id,
            issue_date: now,
            due_date: now + Duration::days(loan_days),
        };
        let (record, book) = match self.store.checkout(&loan).await {
            Ok(done) => done,
            Err(e) => {
                if matches!(e, AppError::Conflict(_)) {
                    tracing::warn!("No copy of book {} left for member {}", book_id, member_id);
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Issued \"{}\" to {} until {} ({} of {} copies left)",
            book.title,
            member.name,
            record.due_date.format("%Y-%m-%d"),
            book.available_copies,
            book.total_copies
        );
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Circulation, ChangeAction::Insert, record.id));
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Books, ChangeAction::Update, book.id));
        Ok(record)
    }

    /// Close the most recent open loan of a book
    pub async fn return_book(&self, book_id: Uuid) -> AppResult<Circulation> {
        self.return_book_at(book_id, Utc::now()).await
    }

    pub async fn return_book_at(&self, book_id: Uuid, now: DateTime<Utc>) -> AppResult<Circulation> {
        let (record, book) = match self.store.checkin(book_id, now).await {
            Ok(done) => done,
            Err(e) => {
                if matches!(e, AppError::Conflict(_)) {
                    tracing::warn!("Return of book {} refused: no open loan", book_id);
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Returned \"{}\" ({} of {} copies on the shelf)",
            book.title,
            book.available_copies,
            book.total_copies
        );
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Circulation, ChangeAction::Update, record.id));
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Books, ChangeAction::Update, book.id));
        Ok(record)
    }

    /// Store a fine on a loan record
    pub async fn record_fine(&self, id: Uuid, amount: Decimal) -> AppResult<Circulation> {
        if amount.is_sign_negative() {
            return Err(AppError::Validation("Fine amount cannot be negative".to_string()));
        }
        let record = self.store.update_circulation_fine(id, amount).await?;
        tracing::info!("Recorded fine of {} on circulation {}", amount, id);
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Circulation, ChangeAction::Update, record.id));
        Ok(record)
    }

    /// Circulation dashboard listing, newest first
    pub async fn list(&self, query: &CirculationQuery) -> AppResult<Vec<CirculationDetails>> {
        self.list_at(query, Utc::now()).await
    }

    pub async fn list_at(
        &self,
        query: &CirculationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<CirculationDetails>> {
        let mut filter = CirculationFilter {
            book_id: query.book_id,
            member_id: query.member_id,
            newest_first: true,
            ..Default::default()
        };
        match query.view {
            CirculationView::All => {}
            CirculationView::Issued => filter.status = Some(CirculationStatus::Issued),
            CirculationView::Returned => filter.status = Some(CirculationStatus::Returned),
            CirculationView::Overdue => filter.due_before = Some(now),
        }

        let records = self.store.list_circulation(&filter).await?;
        let directory = Directory::load(self.store.as_ref(), &records).await?;

        let term = query.search.as_deref().unwrap_or("");
        let details = records
            .into_iter()
            .map(|record| {
                let (book_title, book_author) = directory.book(record.book_id);
                CirculationDetails {
                    member_name: directory.member(record.member_id),
                    is_overdue: record.is_overdue(now),
                    book_title,
                    book_author,
                    record,
                }
            })
            .filter(|d| {
                matches_term(&d.book_title, term)
                    || matches_term(&d.book_author, term)
                    || matches_term(&d.member_name, term)
            })
            .collect();
        Ok(details)
    }
}
