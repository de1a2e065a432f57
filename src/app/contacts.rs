//! Contact directory with search and per-entry account-number disclosure.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument, warn};

use crate::domain::{AppError, BankingApi, Contact, ContactId, UserId};

use super::scope::ViewScope;
use super::session::ActiveSession;

/// Fixed prefix shown in place of the hidden part of an account number
pub const MASK_PREFIX: &str = "xxxx-xxxx-xxxx-";

/// Number of trailing characters left visible by [`mask_account_number`]
pub const VISIBLE_TAIL: usize = 4;

/// Hide all but the last four characters of an account number.
///
/// Counts characters, not bytes. An empty number stays empty.
#[must_use]
pub fn mask_account_number(number: &str) -> String {
    if number.is_empty() {
        return String::new();
    }
    let len = number.chars().count();
    let tail: String = number.chars().skip(len.saturating_sub(VISIBLE_TAIL)).collect();
    format!("{}{}", MASK_PREFIX, tail)
}

/// One rendered contact with its own disclosure toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    contact: Contact,
    revealed: bool,
}

impl ContactEntry {
    fn new(contact: Contact) -> Self {
        Self {
            contact,
            revealed: false,
        }
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn name(&self) -> &str {
        &self.contact.counterpart.name
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Account number as currently displayed: masked unless revealed
    pub fn display_account_number(&self) -> String {
        let number = &self.contact.linked_account.account_number;
        if self.revealed {
            number.clone()
        } else {
            mask_account_number(number)
        }
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name().to_lowercase().contains(needle)
    }
}

/// What the directory shows right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView {
    /// The fetch has not completed
    Loading,
    /// Entries matching the query, in fetched order
    Populated(Vec<ContactEntry>),
    /// Loaded, but nothing matches the query
    NoMatches,
    /// The fetch failed; shown inline
    Unavailable(String),
}

#[derive(Debug)]
enum DirectoryState {
    Loading,
    Loaded(Vec<ContactEntry>),
    Unavailable(String),
}

#[derive(Debug)]
struct DirectoryInner {
    state: DirectoryState,
    query: String,
    fetch_started: bool,
}

/// A mounted contact directory for one viewing user.
///
/// Dropping it and building a new one is a remount: contacts are fetched
/// again and every entry starts masked.
pub struct ContactDirectory {
    api: Arc<dyn BankingApi>,
    user_id: UserId,
    inner: Mutex<DirectoryInner>,
    scope: ViewScope,
    /// Borrowed scopes are left open on drop
    owns_scope: bool,
}

impl ContactDirectory {
    #[must_use]
    pub fn new(api: Arc<dyn BankingApi>, session: &ActiveSession) -> Self {
        Self::mount(api, session, ViewScope::new(), true)
    }

    /// Mount inside an existing scope, so the owner's teardown cancels the fetch
    #[must_use]
    pub fn with_scope(api: Arc<dyn BankingApi>, session: &ActiveSession, scope: ViewScope) -> Self {
        Self::mount(api, session, scope, false)
    }

    fn mount(
        api: Arc<dyn BankingApi>,
        session: &ActiveSession,
        scope: ViewScope,
        owns_scope: bool,
    ) -> Self {
        Self {
            api,
            user_id: session.user_id(),
            inner: Mutex::new(DirectoryInner {
                state: DirectoryState::Loading,
                query: String::new(),
                fetch_started: false,
            }),
            scope,
            owns_scope,
        }
    }

    /// Fetch the contact list. Only the first call per mount hits the backend.
    ///
    /// A failed fetch leaves the directory `Unavailable` and returns the error;
    /// a cancelled one leaves it `Loading`.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn load(&self) -> Result<usize, AppError> {
        {
            let mut inner = self.lock_inner();
            if inner.fetch_started {
                return Ok(match &inner.state {
                    DirectoryState::Loaded(entries) => entries.len(),
                    _ => 0,
                });
            }
            inner.fetch_started = true;
        }

        match self.scope.run(self.api.get_contacts(self.user_id)).await {
            Ok(contacts) => {
                let count = contacts.len();
                debug!(count, "Contacts loaded");
                self.lock_inner().state =
                    DirectoryState::Loaded(contacts.into_iter().map(ContactEntry::new).collect());
                Ok(count)
            }
            Err(AppError::Cancelled) => {
                debug!("Contact fetch cancelled");
                Err(AppError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Failed to load contacts");
                self.lock_inner().state = DirectoryState::Unavailable(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the search query. Filtering is local; nothing is re-fetched.
    pub fn set_query(&self, query: &str) {
        self.lock_inner().query = query.to_string();
    }

    #[must_use]
    pub fn query(&self) -> String {
        self.lock_inner().query.clone()
    }

    #[must_use]
    pub fn view(&self) -> DirectoryView {
        let inner = self.lock_inner();
        match &inner.state {
            DirectoryState::Loading => DirectoryView::Loading,
            DirectoryState::Unavailable(message) => DirectoryView::Unavailable(message.clone()),
            DirectoryState::Loaded(entries) => {
                let matching = filter_entries(entries, &inner.query);
                if matching.is_empty() {
                    DirectoryView::NoMatches
                } else {
                    DirectoryView::Populated(matching)
                }
            }
        }
    }

    /// Entries matching the current query; empty unless loaded
    #[must_use]
    pub fn filtered(&self) -> Vec<ContactEntry> {
        match self.view() {
            DirectoryView::Populated(entries) => entries,
            _ => Vec::new(),
        }
    }

    /// Every loaded contact regardless of the query
    #[must_use]
    pub fn contacts(&self) -> Vec<Contact> {
        match &self.lock_inner().state {
            DirectoryState::Loaded(entries) => entries.iter().map(|e| e.contact.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Flip one entry between masked and full account number.
    ///
    /// Returns the entry's new state, or `None` if no such entry is loaded.
    pub fn toggle_disclosure(&self, contact_id: ContactId) -> Option<bool> {
        let mut inner = self.lock_inner();
        let DirectoryState::Loaded(entries) = &mut inner.state else {
            return None;
        };
        let entry = entries.iter_mut().find(|e| e.contact.id == contact_id)?;
        entry.revealed = !entry.revealed;
        Some(entry.revealed)
    }

    /// Cancel a fetch still in flight
    pub fn teardown(&self) {
        self.scope.close();
    }

    fn lock_inner(&self) -> MutexGuard<'_, DirectoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ContactDirectory {
    fn drop(&mut self) {
        if self.owns_scope {
            self.scope.close();
        }
    }
}

fn filter_entries(entries: &[ContactEntry], query: &str) -> Vec<ContactEntry> {
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.matches(&needle))
        .cloned()
        .collect()
}
