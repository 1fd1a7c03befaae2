//! Session
//!
//! The customer's client-side state (cart, last known location and profile email)
//! behind a single read/write gateway. Every mutation goes through
//! [`Session::update`], which persists before committing, so a failed mutation
//! or a failed save leaves the in-memory state untouched.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    cart::{Cart, CartConflictPolicy, CartError, CartItem},
    geo::Coordinate,
};

/// Errors from loading, saving or mutating the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// IO error reading or writing session storage
    #[error("session storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored session could not be parsed or written
    #[error("session storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// Cart mutation was rejected
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Everything the client keeps between visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Active cart
    pub cart: Cart,

    /// Last captured customer position
    #[serde(default)]
    pub last_location: Option<Coordinate>,

    /// Email from the customer's profile
    #[serde(default)]
    pub customer_email: Option<String>,

    /// When the state was last persisted
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl SessionState {
    /// Empty state for a first visit.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            cart: Cart::new(currency),
            last_location: None,
            customer_email: None,
            updated_at: None,
        }
    }
}

/// Where session state lives between runs.
pub trait SessionStorage {
    /// Load the stored state, or `None` on a first visit.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if stored state exists but cannot be read.
    fn load(&self) -> Result<Option<SessionState>, SessionError>;

    /// Replace the stored state.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the state cannot be written.
    fn save(&mut self, state: &SessionState) -> Result<(), SessionError>;
}

/// Keeps session state in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    state: Option<SessionState>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        self.state = Some(state.clone());
        Ok(())
    }
}

/// Stores session state as a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Storage backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        serde_json::to_writer_pretty(&mut file, state)?;
        file.flush()?;
        fs::rename(&temp, &self.path)?;

        trace!(path = %self.path.display(), "session saved");

        Ok(())
    }
}

/// Owns the session state and its storage.
#[derive(Debug)]
pub struct Session<S: SessionStorage> {
    storage: S,
    state: SessionState,
}

impl<S: SessionStorage> Session<S> {
    /// Load the session from `storage`, starting empty on a first visit.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if stored state cannot be read.
    pub fn open(storage: S, currency: &'static Currency) -> Result<Self, SessionError> {
        let state = match storage.load()? {
            Some(state) => state,
            None => {
                debug!("no stored session, starting fresh");
                SessionState::new(currency)
            }
        };

        Ok(Self { storage, state })
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current cart.
    pub fn cart(&self) -> &Cart {
        &self.state.cart
    }

    /// The storage backing this session.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply `mutate` to a copy of the state, persist it, then commit it.
    ///
    /// # Errors
    ///
    /// Returns whatever `mutate` returns, or a [`SessionError`] if saving fails. In both
    /// cases the current state is unchanged.
    pub fn update<T>(
        &mut self,
        mutate: impl FnOnce(&mut SessionState) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut next = self.state.clone();
        let out = mutate(&mut next)?;

        next.updated_at = Some(Timestamp::now());
        self.storage.save(&next)?;
        self.state = next;

        Ok(out)
    }

    /// Add an item to the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart rejects the item or saving fails.
    pub fn add_to_cart(
        &mut self,
        item: CartItem,
        policy: CartConflictPolicy,
    ) -> Result<(), SessionError> {
        self.update(|state| Ok(state.cart.add_item(item, policy)?))
    }

    /// Empty the cart. Clearing an empty cart does nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if saving fails.
    pub fn clear_cart(&mut self) -> Result<(), SessionError> {
        if self.state.cart.is_empty() {
            return Ok(());
        }

        self.update(|state| {
            state.cart.clear();
            Ok(())
        })
    }

    /// Replace the stored customer position.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if saving fails.
    pub fn set_location(&mut self, position: Coordinate) -> Result<(), SessionError> {
        self.update(|state| {
            state.last_location = Some(position);
            Ok(())
        })
    }

    /// Record the email from the customer's profile.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if saving fails.
    pub fn set_customer_email(&mut self, email: impl Into<String>) -> Result<(), SessionError> {
        let email = email.into();

        self.update(|state| {
            state.customer_email = Some(email);
            Ok(())
        })
    }
}
