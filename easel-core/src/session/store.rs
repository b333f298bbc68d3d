//! SessionStore: the authenticated-identity state of one running app
//!
//! The store reads persisted storage synchronously on construction, so the
//! first snapshot anyone observes is already resolved. After that it only
//! changes through the login/logout/update operations or through storage
//! events coming from other stores on the same origin.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{Identity, Session, SessionKind, StudentSignIn};
use crate::auth::{AuthBackend, AuthError, Credentials, DemoAuthBackend, HttpAuthBackend, LoginGrant, inspect_token};
use crate::config::{AuthMode, SessionConfig};
use crate::error::{ConfigError, OtpError, StorageError};
use crate::otp::{HttpOtpGateway, OtpGateway, OtpReply};
use crate::storage::{DEFAULT_WRITE_RETRIES, Storage, StorageEvent, write_verified};

/// Role label stamped on student identities
const STUDENT_ROLE: &str = "Student";

/// Single source of truth for who is logged in, and as what role
///
/// There is no in-flight guard: two overlapping `login` calls both run and
/// the last one to finish wins, in memory and in storage. `loading` stays
/// true until every overlapping call has finished or been dropped.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    backend: Arc<dyn AuthBackend>,
    otp: Option<Arc<dyn OtpGateway>>,
    config: SessionConfig,
    state: watch::Sender<Session>,
    logins_in_flight: AtomicUsize,
}

impl SessionStore {
    /// Create a store and bootstrap it from storage
    pub fn new(
        storage: Arc<dyn Storage>,
        backend: Arc<dyn AuthBackend>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::unknown());
        let store = Self {
            storage,
            backend,
            otp: None,
            config,
            state,
            logins_in_flight: AtomicUsize::new(0),
        };
        store.bootstrap();
        store
    }

    /// Create a store with the backends the config asks for
    pub fn from_config(storage: Arc<dyn Storage>, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let backend: Arc<dyn AuthBackend> = match config.auth.mode {
            AuthMode::Demo => Arc::new(DemoAuthBackend::from_config(&config.auth)),
            AuthMode::Remote => Arc::new(HttpAuthBackend::new(&config.auth)?),
        };
        let otp: Option<Arc<dyn OtpGateway>> = if config.otp.enabled {
            Some(Arc::new(HttpOtpGateway::new(&config)?))
        } else {
            None
        };

        let mut store = Self::new(storage, backend, config);
        store.otp = otp;
        Ok(store)
    }

    /// Attach an OTP gateway
    pub fn with_otp(mut self, gateway: Arc<dyn OtpGateway>) -> Self {
        self.otp = Some(gateway);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current snapshot
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Follow session changes (route guards, UI)
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().authenticated()
    }

    pub fn is_student(&self) -> bool {
        self.state.borrow().is_student()
    }

    // ==================== Bootstrap ====================

    /// Re-derive the session from storage
    ///
    /// Invalid records (bad JSON, no email) count as "no session" and are
    /// left in storage untouched. Only in-memory state changes.
    pub fn bootstrap(&self) -> Session {
        let resolved = self.resolve();
        self.state.send_if_modified(|current| {
            let next = resolved.clone().with_loading(current.loading());
            if *current == next {
                return false;
            }
            tracing::debug!(from = %current.state(), to = %next.state(), "session resolved from storage");
            *current = next;
            true
        });
        self.session()
    }

    fn resolve(&self) -> Session {
        for &kind in self.config.profile.kinds() {
            if let Some(identity) = self.stored_identity(kind) {
                return Session::signed_in(kind, identity);
            }
        }
        Session::anonymous()
    }

    /// Read one role's record, independent of which session is active
    pub fn stored_identity(&self, kind: SessionKind) -> Option<Identity> {
        let key = self.config.keys.identity_key(kind);
        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read session record");
                return None;
            }
        };

        match Identity::from_record(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring invalid session record");
                None
            }
        }
    }

    /// Bootstrap, then drop an admin session whose bearer token has expired
    ///
    /// Tokens that are not JWTs are opaque and always accepted.
    pub fn reverify(&self) -> Session {
        let session = self.bootstrap();
        if !session.is_admin() {
            return session;
        }

        let token = match self.storage.get_item(&self.config.keys.token) {
            Ok(Some(token)) => token,
            Ok(None) => return session,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read bearer token");
                return session;
            }
        };

        match inspect_token(&token) {
            Ok(claims) if claims.is_expired(self.config.auth.token_leeway_secs) => {
                tracing::info!("stored bearer token has expired, logging out");
                self.logout();
                self.session()
            }
            Ok(_) => session,
            Err(e) => {
                tracing::trace!(error = %e, "bearer token is opaque");
                session
            }
        }
    }

    // ==================== Login ====================

    /// Admin login through the configured backend
    ///
    /// On success the identity is written to the admin key and the bearer
    /// token, when issued, to the token key. On failure storage is untouched.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        if !self.config.profile.supports(SessionKind::Admin) {
            return Err(AuthError::UnsupportedRole(SessionKind::Admin));
        }
        credentials.validate()?;

        let result = {
            let _in_flight = LoginInFlight::begin(self);
            match self.backend.authenticate(credentials).await {
                Ok(grant) => self.establish_admin(grant),
                Err(e) => Err(e),
            }
        };

        match &result {
            Ok(_) => tracing::info!(email = %credentials.email, "admin logged in"),
            Err(e) => tracing::warn!(email = %credentials.email, error = %e, "admin login failed"),
        }
        result.map(|_| self.session())
    }

    fn establish_admin(&self, grant: LoginGrant) -> Result<Session, AuthError> {
        let identity = grant.identity.with_default_names();
        identity.validate().map_err(|_| AuthError::email_required())?;
        let record = identity
            .to_record()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let admin_key = self.config.keys.admin.as_str();
        let token_key = self.config.keys.token.as_str();
        let previous_admin = self.storage.get_item(admin_key)?;

        self.storage.set_item(admin_key, &record)?;
        match &grant.token {
            Some(token) => {
                if let Err(e) = self.storage.set_item(token_key, token) {
                    self.restore(admin_key, previous_admin);
                    return Err(e.into());
                }
            }
            // A token from an earlier login would outlive this session
            None => {
                if let Err(e) = self.storage.remove_item(token_key) {
                    tracing::warn!(key = token_key, error = %e, "failed to remove stale bearer token");
                }
            }
        }

        let session = Session::signed_in(SessionKind::Admin, identity);
        self.publish(session.clone());
        Ok(session)
    }

    /// Put a key back the way it was before a failed multi-key write
    fn restore(&self, key: &str, previous: Option<String>) {
        let result = match previous {
            Some(value) => self.storage.set_item(key, &value),
            None => self.storage.remove_item(key),
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "failed to roll back session record");
        }
    }

    /// Student login; no backend round trip
    ///
    /// The record is only reported as logged in once it reads back from
    /// storage, retrying the write once.
    pub fn student_login(&self, sign_in: StudentSignIn) -> Result<Session, AuthError> {
        if !self.config.profile.supports(SessionKind::Student) {
            return Err(AuthError::UnsupportedRole(SessionKind::Student));
        }

        let email = sign_in
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(AuthError::email_required)?
            .to_string();

        let mut fields: Map<String, Value> = sign_in.fields;
        fields.remove("password");
        fields.insert("email".to_string(), Value::String(email));
        if let Some(name) = sign_in.name {
            fields.insert("name".to_string(), Value::String(name));
        }

        let mut identity = Identity::merge(None, &fields)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        if identity.id.is_none() {
            identity.id = Some(Uuid::new_v4().to_string());
        }
        if identity.name.as_deref().is_none_or(str::is_empty) {
            identity.name = Some(identity.email_local_part().to_string());
        }
        if identity.role.is_none() {
            identity.role = Some(STUDENT_ROLE.to_string());
        }
        identity.login_time = Some(chrono::Utc::now());

        let record = identity
            .to_record()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let key = self.config.keys.student.as_str();

        write_verified(
            key,
            DEFAULT_WRITE_RETRIES,
            || self.storage.set_item(key, &record),
            || matches!(self.storage.get_item(key), Ok(Some(value)) if value == record),
        )?;

        tracing::info!(email = %identity.email, "student logged in");
        let session = Session::signed_in(SessionKind::Student, identity);
        self.publish(session.clone());
        Ok(session)
    }

    // ==================== Logout / update ====================

    /// Clear memory and every role's persisted keys, whichever was active
    pub fn logout(&self) {
        for key in self.config.keys.all() {
            if let Err(e) = self.storage.remove_item(key) {
                tracing::warn!(key, error = %e, "failed to remove session key");
            }
        }
        let previous = self.publish(Session::anonymous());
        if previous.authenticated() {
            tracing::info!(role = ?previous.kind(), "logged out");
        }
    }

    /// Shallow-merge `fields` into the current identity and persist it
    ///
    /// Without an active session the merge starts from an empty record; the
    /// result is stored only if it has an email, under the student key when
    /// it carries `role: "Student"` on the public site, else the admin key.
    pub fn update_user(&self, fields: Map<String, Value>) -> Result<Session, AuthError> {
        let current = self.session();
        let merged = Identity::merge(current.identity(), &fields)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        merged.validate().map_err(|_| AuthError::email_required())?;

        let kind = current.kind().unwrap_or_else(|| {
            let wants_student = merged.role.as_deref() == Some(STUDENT_ROLE);
            if wants_student && self.config.profile.supports(SessionKind::Student) {
                SessionKind::Student
            } else {
                SessionKind::Admin
            }
        });
        if !self.config.profile.supports(kind) {
            return Err(AuthError::UnsupportedRole(kind));
        }

        let record = merged
            .to_record()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        self.storage
            .set_item(self.config.keys.identity_key(kind), &record)?;

        tracing::debug!(role = %kind, fields = fields.len(), "updated user");
        let session = Session::signed_in(kind, merged);
        self.publish(session.clone());
        Ok(session)
    }

    /// Replace the snapshot, keeping `loading` in step with pending logins
    ///
    /// Returns the previous snapshot.
    fn publish(&self, session: Session) -> Session {
        let mut previous = None;
        self.state.send_modify(|current| {
            let next = session.with_loading(self.login_pending());
            previous = Some(std::mem::replace(current, next));
        });
        previous.unwrap_or_default()
    }

    fn login_pending(&self) -> bool {
        self.logins_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Recompute `loading` from the pending-login count
    ///
    /// The count is read under the watch lock, so concurrent begin/end
    /// calls cannot leave a stale flag behind.
    fn refresh_loading(&self) {
        self.state.send_if_modified(|current| {
            let loading = self.login_pending();
            if current.loading() == loading {
                return false;
            }
            current.set_loading(loading);
            true
        });
    }

    // ==================== Cross-tab sync ====================

    /// React to a change made by another tab
    ///
    /// Returns true if the key belongs to the session and state was re-derived.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> bool {
        if !self.config.keys.contains(&event.key) {
            return false;
        }
        tracing::debug!(key = %event.key, removed = event.is_removal(), "session key changed elsewhere");
        self.reverify();
        true
    }

    /// Run the re-verification pass, then follow storage events until the
    /// store is dropped
    pub fn spawn_sync(self: &Arc<Self>) -> Result<JoinHandle<()>, StorageError> {
        let rx = self.storage.subscribe()?;
        let store = Arc::downgrade(self);
        Ok(tokio::spawn(sync_loop(store, rx)))
    }

    // ==================== OTP pass-through ====================

    fn otp_gateway(&self) -> Result<&Arc<dyn OtpGateway>, OtpError> {
        self.otp.as_ref().ok_or(OtpError::Unavailable)
    }

    pub async fn request_otp(&self, email: &str) -> Result<OtpReply, OtpError> {
        self.otp_gateway()?.request_otp(email).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<OtpReply, OtpError> {
        self.otp_gateway()?.verify_otp(email, otp).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<OtpReply, OtpError> {
        self.otp_gateway()?
            .reset_password(email, otp, new_password)
            .await
    }
}

/// Marks one admin login as pending for as long as it lives
///
/// Dropping the login future mid-await still clears the flag.
struct LoginInFlight<'a> {
    store: &'a SessionStore,
}

impl<'a> LoginInFlight<'a> {
    fn begin(store: &'a SessionStore) -> Self {
        store.logins_in_flight.fetch_add(1, Ordering::SeqCst);
        store.refresh_loading();
        Self { store }
    }
}

impl Drop for LoginInFlight<'_> {
    fn drop(&mut self) {
        self.store.logins_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.store.refresh_loading();
    }
}

async fn sync_loop(store: Weak<SessionStore>, mut rx: broadcast::Receiver<StorageEvent>) {
    // Let the caller finish wiring up before the first pass
    tokio::task::yield_now().await;
    match store.upgrade() {
        Some(store) => {
            store.reverify();
        }
        None => return,
    }

    loop {
        let received = rx.recv().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        match received {
            Ok(event) => {
                store.handle_storage_event(&event);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "storage events lagged, re-reading storage");
                store.reverify();
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("session sync stopped");
}
