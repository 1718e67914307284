//! Lock system routing each request to its document's lock manager.
//!
//! Locks live in one in-memory manager per document (plus one for the root),
//! owned by the document cache. Lock state is process-local and lost on
//! restart.

use crate::address::ResourceAddress;
use crate::filesystem::DocumentFs;
use dav_server::davpath::DavPath;
use dav_server::ls::{DavLock, DavLockSystem, LsFuture};
use dav_server::memls::MemLs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use xmltree::Element;

/// `DavLockSystem` backed by per-document `MemLs` instances.
///
/// Every path naming a document (any version token, any filename) maps to
/// the same entry in that document's manager, so a lock taken through one
/// path guards all of them. Locks handed back to the caller carry the
/// request path.
#[derive(Debug, Clone)]
pub struct DocumentLockSystem {
    fs: DocumentFs,
}

/// Key of the single resource inside each manager.
const LOCK_KEY: &str = "/resource";

/// A lock manager and the key to use within it.
struct Target {
    manager: Arc<MemLs>,
    key: DavPath,
}

impl DocumentLockSystem {
    pub fn new(fs: DocumentFs) -> Self {
        Self { fs }
    }

    /// The lock manager for `path`, or `None` if the document is unknown.
    async fn target(&self, path: &DavPath) -> Option<Target> {
        let addr = ResourceAddress::from_dav_path(path);
        let manager = match self.fs.lock_manager(&addr).await {
            Ok(manager) => manager,
            Err(e) => {
                debug!(addr = %addr, error = %e, "no lock manager");
                return None;
            }
        };
        // A manager guards exactly one resource. MemLs cannot release a lock
        // held on its tree root, so the key sits one level down.
        let key = DavPath::new(LOCK_KEY).ok()?;
        Some(Target { manager, key })
    }
}

/// Report `lock` at the path the client asked about.
fn at(mut lock: DavLock, path: &DavPath) -> DavLock {
    lock.path = path.clone();
    lock
}

/// Placeholder conflict returned when locking an unknown document.
fn denied(path: DavPath) -> DavLock {
    DavLock {
        token: String::new(),
        path,
        principal: None,
        owner: None,
        timeout_at: None,
        timeout: None,
        shared: false,
        deep: false,
    }
}

impl DavLockSystem for DocumentLockSystem {
    fn lock(
        &self,
        path: &DavPath,
        principal: Option<&str>,
        owner: Option<&Element>,
        timeout: Option<Duration>,
        shared: bool,
        deep: bool,
    ) -> LsFuture<'_, Result<DavLock, DavLock>> {
        let path = path.clone();
        let principal = principal.map(str::to_string);
        let owner = owner.cloned();
        Box::pin(async move {
            let Some(Target { manager, key }) = self.target(&path).await else {
                return Err(denied(path));
            };
            let result = manager
                .lock(&key, principal.as_deref(), owner.as_ref(), timeout, shared, deep)
                .await;
            trace!(path = %path, granted = result.is_ok(), "lock");
            result.map(|l| at(l, &path)).map_err(|l| at(l, &path))
        })
    }

    fn unlock(&self, path: &DavPath, token: &str) -> LsFuture<'_, Result<(), ()>> {
        let path = path.clone();
        let token = token.to_string();
        Box::pin(async move {
            match self.target(&path).await {
                Some(Target { manager, key }) => manager.unlock(&key, &token).await,
                None => Err(()),
            }
        })
    }

    fn refresh(
        &self,
        path: &DavPath,
        token: &str,
        timeout: Option<Duration>,
    ) -> LsFuture<'_, Result<DavLock, ()>> {
        let path = path.clone();
        let token = token.to_string();
        Box::pin(async move {
            match self.target(&path).await {
                Some(Target { manager, key }) => manager
                    .refresh(&key, &token, timeout)
                    .await
                    .map(|l| at(l, &path)),
                None => Err(()),
            }
        })
    }

    fn check(
        &self,
        path: &DavPath,
        principal: Option<&str>,
        ignore_principal: bool,
        deep: bool,
        submitted_tokens: Vec<&str>,
    ) -> LsFuture<'_, Result<(), DavLock>> {
        let path = path.clone();
        let principal = principal.map(str::to_string);
        let tokens: Vec<String> = submitted_tokens.into_iter().map(str::to_string).collect();
        Box::pin(async move {
            // Nothing can be locked on a document that does not exist.
            let Some(Target { manager, key }) = self.target(&path).await else {
                return Ok(());
            };
            let tokens = tokens.iter().map(String::as_str).collect();
            manager
                .check(&key, principal.as_deref(), ignore_principal, deep, tokens)
                .await
                .map_err(|l| at(l, &path))
        })
    }

    fn discover(&self, path: &DavPath) -> LsFuture<'_, Vec<DavLock>> {
        let path = path.clone();
        Box::pin(async move {
            match self.target(&path).await {
                Some(Target { manager, key }) => manager
                    .discover(&key)
                    .await
                    .into_iter()
                    .map(|l| at(l, &path))
                    .collect(),
                None => Vec::new(),
            }
        })
    }

    fn delete(&self, path: &DavPath) -> LsFuture<'_, Result<(), ()>> {
        let path = path.clone();
        Box::pin(async move {
            match self.target(&path).await {
                Some(Target { manager, key }) => manager.delete(&key).await,
                None => Ok(()),
            }
        })
    }
}
