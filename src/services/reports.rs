//! Circulation reports computed in memory from loan history

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::ReportsConfig,
    error::AppResult,
    models::{
        book::Book,
        circulation::{Circulation, CirculationFilter},
        enums::CirculationStatus,
        member::Member,
    },
    repository::CatalogStore,
};

pub const UNKNOWN_BOOK: &str = "Unknown Book";
pub const UNKNOWN_MEMBER: &str = "Unknown Member";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookCount {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberCount {
    pub member_id: Uuid,
    pub name: String,
    pub count: usize,
}

/// An open loan resolved to its book and member
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedLoan {
    pub circulation_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub member_id: Uuid,
    pub member_name: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Reports {
    pub most_borrowed: Vec<BookCount>,
    pub most_active: Vec<MemberCount>,
    pub currently_issued: Vec<IssuedLoan>,
    pub overdue: Vec<IssuedLoan>,
    pub generated_at: DateTime<Utc>,
}

/// Count records per key, highest first. Ties keep first-encountered order.
fn rank_by<F>(records: &[Circulation], limit: usize, key: F) -> Vec<(Uuid, usize)>
where
    F: Fn(&Circulation) -> Uuid,
{
    let mut counts: IndexMap<Uuid, usize> = IndexMap::new();
    for record in records {
        *counts.entry(key(record)).or_insert(0) += 1;
    }
    let mut ranked: Vec<(Uuid, usize)> = counts.into_iter().collect();
    // stable sort
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

pub fn most_borrowed(records: &[Circulation], limit: usize) -> Vec<(Uuid, usize)> {
    rank_by(records, limit, |r| r.book_id)
}

pub fn most_active(records: &[Circulation], limit: usize) -> Vec<(Uuid, usize)> {
    rank_by(records, limit, |r| r.member_id)
}

pub fn currently_issued(records: &[Circulation]) -> Vec<&Circulation> {
    records
        .iter()
        .filter(|r| r.status == CirculationStatus::Issued)
        .collect()
}

pub fn overdue(records: &[Circulation], now: DateTime<Utc>) -> Vec<&Circulation> {
    currently_issued(records)
        .into_iter()
        .filter(|r| r.is_overdue(now))
        .collect()
}

/// Lookup tables used to resolve records, with placeholders for deleted rows
pub(crate) struct Directory {
    books: HashMap<Uuid, Book>,
    members: HashMap<Uuid, Member>,
}

impl Directory {
    pub(crate) async fn load(store: &dyn CatalogStore, records: &[Circulation]) -> AppResult<Self> {
        let mut book_ids: Vec<Uuid> = records.iter().map(|r| r.book_id).collect();
        book_ids.sort();
        book_ids.dedup();
        let mut member_ids: Vec<Uuid> = records.iter().map(|r| r.member_id).collect();
        member_ids.sort();
        member_ids.dedup();

        let books = store.get_books(&book_ids).await?;
        let members = store.get_members(&member_ids).await?;
        Ok(Self {
            books: books.into_iter().map(|b| (b.id, b)).collect(),
            members: members.into_iter().map(|m| (m.id, m)).collect(),
        })
    }

    /// (title, author)
    pub(crate) fn book(&self, id: Uuid) -> (String, String) {
        match self.books.get(&id) {
            Some(book) => (book.title.clone(), book.author.clone()),
            None => (UNKNOWN_BOOK.to_string(), String::new()),
        }
    }

    pub(crate) fn member(&self, id: Uuid) -> String {
        self.members
            .get(&id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| UNKNOWN_MEMBER.to_string())
    }

    fn issued_loan(&self, record: &Circulation, now: DateTime<Utc>) -> IssuedLoan {
        IssuedLoan {
            circulation_id: record.id,
            book_id: record.book_id,
            book_title: self.book(record.book_id).0,
            member_id: record.member_id,
            member_name: self.member(record.member_id),
            issue_date: record.issue_date,
            due_date: record.due_date,
            is_overdue: record.is_overdue(now),
        }
    }
}

#[derive(Clone)]
pub struct ReportsService {
    store: Arc<dyn CatalogStore>,
    config: ReportsConfig,
}

impl ReportsService {
    pub fn new(store: Arc<dyn CatalogStore>, config: ReportsConfig) -> Self {
        Self { store, config }
    }

    pub async fn get_reports(&self, limit: Option<usize>) -> AppResult<Reports> {
        self.get_reports_at(limit, Utc::now()).await
    }

    /// Rankings cover the most recent `max_records` loans; the issued and
    /// overdue lists cover every open loan regardless of age.
    pub async fn get_reports_at(&self, limit: Option<usize>, now: DateTime<Utc>) -> AppResult<Reports> {
        let limit = limit.unwrap_or(self.config.limit).max(1);
        let records = self
            .store
            .list_circulation(&CirculationFilter {
                newest_first: true,
                limit: Some(self.config.max_records),
                ..Default::default()
            })
            .await?;
        let open = self
            .store
            .list_circulation(&CirculationFilter {
                status: Some(CirculationStatus::Issued),
                newest_first: true,
                ..Default::default()
            })
            .await?;
        let referenced: Vec<Circulation> = records.iter().chain(open.iter()).cloned().collect();
        let directory = Directory::load(self.store.as_ref(), &referenced).await?;

        let most_borrowed = most_borrowed(&records, limit)
            .into_iter()
            .map(|(book_id, count)| {
                let (title, author) = directory.book(book_id);
                BookCount { book_id, title, author, count }
            })
            .collect();

        let most_active = most_active(&records, limit)
            .into_iter()
            .map(|(member_id, count)| MemberCount {
                member_id,
                name: directory.member(member_id),
                count,
            })
            .collect();

        let currently_issued = currently_issued(&open)
            .into_iter()
            .map(|r| directory.issued_loan(r, now))
            .collect();

        let overdue = overdue(&open, now)
            .into_iter()
            .map(|r| directory.issued_loan(r, now))
            .collect();

        tracing::debug!(
            "Built reports over {} recent and {} open circulation records",
            records.len(),
            open.len()
        );

        Ok(Reports {
            most_borrowed,
            most_active,
            currently_issued,
            overdue,
            generated_at: now,
        })
    }
}
