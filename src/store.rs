use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::core::LoanRecord;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    LoansChanged { key: String, count: usize },
}

/// Owner of every loan list, keyed by the category persistence key.
/// Views call [`LoanStore::subscribe`] to stay in sync with each other.
pub trait LoanStore: Send + Sync {
    fn load(&self, key: &str) -> Vec<LoanRecord>;
    fn save(&self, key: &str, loans: Vec<LoanRecord>);
    fn snapshot(&self) -> BTreeMap<String, Vec<LoanRecord>>;
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

pub struct InMemoryLoanStore {
    lists: RwLock<BTreeMap<String, Vec<LoanRecord>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            lists: RwLock::new(BTreeMap::new()),
            events,
        }
    }
}

impl Default for InMemoryLoanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LoanStore for InMemoryLoanStore {
    fn load(&self, key: &str) -> Vec<LoanRecord> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn save(&self, key: &str, loans: Vec<LoanRecord>) {
        let count = loans.len();
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), loans);
        info!(key, count, "loan list saved");
        // No subscribers is fine; the write already happened.
        let _ = self.events.send(StoreEvent::LoansChanged {
            key: key.to_string(),
            count,
        });
    }

    fn snapshot(&self) -> BTreeMap<String, Vec<LoanRecord>> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoanCategory, RepaymentMethod};

    fn sample_loan() -> LoanRecord {
        LoanRecord::new(LoanCategory::Mortgage)
            .with_loan_amount(900_000.0)
            .with_rate(3.8)
            .with_term_months(360)
            .with_method(RepaymentMethod::EqualPayment)
    }

    #[test]
    fn load_of_unknown_key_is_empty() {
        let store = InMemoryLoanStore::new();
        assert!(store.load("mortgage-loans").is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn save_replaces_list_and_notifies_subscribers() {
        let store = InMemoryLoanStore::new();
        let mut first_view = store.subscribe();
        let mut second_view = store.subscribe();

        let loan = sample_loan();
        store.save("mortgage-loans", vec![loan.clone()]);
        assert_eq!(store.load("mortgage-loans"), vec![loan]);

        let expected = StoreEvent::LoansChanged {
            key: "mortgage-loans".to_string(),
            count: 1,
        };
        assert_eq!(first_view.try_recv().expect("event"), expected);
        assert_eq!(second_view.try_recv().expect("event"), expected);

        store.save("mortgage-loans", Vec::new());
        assert!(store.load("mortgage-loans").is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn save_without_subscribers_does_not_fail() {
        let store = InMemoryLoanStore::new();
        store.save("car-loans", vec![sample_loan()]);
        assert_eq!(store.load("car-loans").len(), 1);
    }
}
