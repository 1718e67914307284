//! Per-document dead property storage.

use dav_server::fs::DavProp;
use hyper::StatusCode;
use parking_lot::Mutex;
use std::collections::HashMap;

/// `(namespace, name)`
type PropKey = (Option<String>, String);

/// Dead WebDAV properties for one document, as set by PROPPATCH.
///
/// One instance exists per document for the life of the process; see
/// [`DocumentCache::property_manager`](crate::cache::DocumentCache::property_manager).
#[derive(Debug, Default)]
pub struct PropertyManager {
    props: Mutex<HashMap<PropKey, DavProp>>,
}

fn key(prop: &DavProp) -> PropKey {
    (prop.namespace.clone(), prop.name.clone())
}

fn without_value(prop: &DavProp) -> DavProp {
    DavProp {
        xml: None,
        ..prop.clone()
    }
}

impl PropertyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a PROPPATCH: `true` sets, `false` removes. Removing an absent
    /// property succeeds.
    pub fn patch(&self, patch: Vec<(bool, DavProp)>) -> Vec<(StatusCode, DavProp)> {
        let mut props = self.props.lock();
        patch
            .into_iter()
            .map(|(set, prop)| {
                let reported = without_value(&prop);
                if set {
                    props.insert(key(&prop), prop);
                } else {
                    props.remove(&key(&prop));
                }
                (StatusCode::OK, reported)
            })
            .collect()
    }

    /// All stored properties, with values only if `do_content`.
    pub fn list(&self, do_content: bool) -> Vec<DavProp> {
        self.props
            .lock()
            .values()
            .map(|p| if do_content { p.clone() } else { without_value(p) })
            .collect()
    }

    /// The raw XML value of one property.
    pub fn get(&self, prop: &DavProp) -> Option<Vec<u8>> {
        self.props.lock().get(&key(prop)).and_then(|p| p.xml.clone())
    }

    pub fn len(&self) -> usize {
        self.props.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.lock().is_empty()
    }
}
