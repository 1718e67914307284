//! Path resolution: WebDAV path to document address.
//!
//! Paths have the shape `/{document_id}/{version}/{anything...}`. The first
//! non-empty segment is the document ID, the second the version token; any
//! further segments (typically the filename an office client appends) are
//! ignored. Segments are taken as-is: no decoding, normalization or ID-shape
//! validation happens here.

use dav_server::davpath::DavPath;
use std::fmt;

/// Version token literal that selects the newest stored version.
pub const LATEST: &str = "latest";

/// Which stored version of a document a path refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionToken {
    Latest,
    Explicit(String),
}

impl VersionToken {
    /// A missing segment means latest.
    pub fn from_segment(segment: Option<&str>) -> Self {
        match segment {
            None | Some(LATEST) => VersionToken::Latest,
            Some(id) => VersionToken::Explicit(id.to_string()),
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, VersionToken::Latest)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionToken::Latest => f.write_str(LATEST),
            VersionToken::Explicit(id) => f.write_str(id),
        }
    }
}

/// A parsed WebDAV path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceAddress {
    /// `/`, the single directory.
    Root,
    Document {
        document_id: String,
        version: VersionToken,
    },
}

impl ResourceAddress {
    pub fn parse(path: &str) -> Self {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            None => ResourceAddress::Root,
            Some(document_id) => ResourceAddress::Document {
                document_id: document_id.to_string(),
                version: VersionToken::from_segment(segments.next()),
            },
        }
    }

    pub fn from_dav_path(path: &DavPath) -> Self {
        Self::parse(&path.as_url_string())
    }

    pub fn document(document_id: impl Into<String>, version: VersionToken) -> Self {
        ResourceAddress::Document {
            document_id: document_id.into(),
            version,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ResourceAddress::Root)
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            ResourceAddress::Root => None,
            ResourceAddress::Document { document_id, .. } => Some(document_id),
        }
    }

    pub fn version(&self) -> Option<&VersionToken> {
        match self {
            ResourceAddress::Root => None,
            ResourceAddress::Document { version, .. } => Some(version),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAddress::Root => f.write_str("/"),
            ResourceAddress::Document {
                document_id,
                version,
            } => write!(f, "/{document_id}/{version}"),
        }
    }
}
