// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::store::StoreError;

/// Fatal error conditions of an [import](super::import_from_io) run.
///
/// Ways with a missing or non-walkable `highway` tag are not errors;
/// they are only counted in the [ImportReport](super::ImportReport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element was recognized, but its attributes could not be interpreted,
    /// or the document ended in the middle of an element.
    #[error("malformed <{element}>: {reason}")]
    Malformed {
        element: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn malformed<R: ToString>(element: &'static str, reason: R) -> Self {
        Self::Malformed {
            element,
            reason: reason.to_string(),
        }
    }
}
