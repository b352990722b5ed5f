//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use libris_server::{
    config::AppConfig,
    models::{
        book::{Book, CreateBook},
        enums::{MemberStatus, MembershipType},
        member::{CreateMember, Member},
    },
    repository::{CatalogStore, MemoryStore},
    services::{
        changes::{ChangeEvent, ChangeNotifier},
        circulation::CirculationService,
        reports::ReportsService,
    },
};

/// Notifier that keeps every published event
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, event: ChangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

pub fn new_book(title: &str, author: &str, total_copies: i32) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        author: author.to_string(),
        isbn: None,
        publisher: None,
        ddc_number: None,
        publication_year: Some(2004),
        price: None,
        language: None,
        category_id: None,
        total_copies,
    }
}

pub fn new_member(name: &str) -> CreateMember {
    CreateMember {
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        phone: None,
        address: None,
        place: None,
        class_name: None,
        register_number: None,
        membership_type: MembershipType::Regular,
        status: MemberStatus::Active,
    }
}

/// Circulation engine over a fresh in-memory store
pub struct Library {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub circulation: CirculationService,
    pub reports: ReportsService,
}

impl Library {
    pub fn new() -> Self {
        let config = AppConfig::default();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let dyn_store: Arc<dyn CatalogStore> = store.clone();
        Self {
            circulation: CirculationService::new(
                dyn_store.clone(),
                notifier.clone(),
                config.circulation.clone(),
            ),
            reports: ReportsService::new(dyn_store, config.reports),
            store,
            notifier,
        }
    }

    pub async fn book(&self, title: &str, total_copies: i32) -> Book {
        self.store
            .create_book(&new_book(title, "Test Author", total_copies))
            .await
            .expect("create book")
    }

    pub async fn member(&self, name: &str) -> Member {
        self.store
            .create_member(&new_member(name))
            .await
            .expect("create member")
    }
}
