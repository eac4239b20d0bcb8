// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error taxonomy of the resource loader.

use super::{ResourceId, ResourceType};
use std::{error::Error, fmt, sync::Arc};

/// The error type handlers return from `load` and `open`.
pub type BoxedHandlerError = Box<dyn Error + Send + Sync>;

/// A handler failure, shared between every waiter of the failed request.
#[derive(Clone)]
pub struct HandlerError(Arc<dyn Error + Send + Sync>);

impl HandlerError {
    /// Creates a handler error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let boxed: BoxedHandlerError = message.into().into();
        Self::from(boxed)
    }
}

impl From<BoxedHandlerError> for HandlerError {
    fn from(error: BoxedHandlerError) -> Self {
        Self(Arc::from(error))
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Everything that can make a resource request fail.
///
/// The loader never retries; it only forwards the error to every request that
/// depends on the failed one.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    /// No handler is registered for the request's type.
    #[error("no resource handler registered for type '{resource_type}' (requested '{identifier}')")]
    HandlerMissing {
        /// The requested identifier.
        identifier: ResourceId,
        /// The type nobody handles.
        resource_type: ResourceType,
    },
    /// The handler's `load` step failed.
    #[error("failed to load '{identifier}': {source}")]
    LoadFailure {
        /// Canonical identifier of the failed request.
        identifier: ResourceId,
        /// The handler's error.
        source: HandlerError,
    },
    /// The handler's `open` step failed.
    #[error("failed to open '{identifier}': {source}")]
    OpenFailure {
        /// Canonical identifier of the failed request.
        identifier: ResourceId,
        /// The handler's error.
        source: HandlerError,
    },
    /// A request discovered while servicing `identifier` failed.
    #[error("dependency '{child}' of '{identifier}' failed: {source}")]
    ChildFailure {
        /// Canonical identifier of the ancestor that failed because of the child.
        identifier: ResourceId,
        /// Canonical identifier of the request that originally failed.
        child: ResourceId,
        /// The originating error.
        source: Box<LoaderError>,
    },
    /// A typed accessor found a resource of another type.
    #[error("resource '{identifier}' is a {actual}, not a {expected}")]
    TypeMismatch {
        /// The requested identifier.
        identifier: ResourceId,
        /// The type the caller asked for.
        expected: &'static str,
        /// The type that is actually stored.
        actual: &'static str,
    },
    /// Several top-level requests of one batch failed; errors are in request order.
    #[error("{}", summarize_batch(.0))]
    Batch(Vec<LoaderError>),
}

fn summarize_batch(errors: &[LoaderError]) -> String {
    match errors.first() {
        Some(first) => format!("{} requests failed, first: {first}", errors.len()),
        None => "no requests failed".to_string(),
    }
}

impl LoaderError {
    /// Wraps `error` as the failure of a descendant of `identifier`.
    ///
    /// A `ChildFailure` is unwrapped first, so the result always carries the
    /// originating error and the identifier of the request that produced it.
    pub fn child_of(identifier: ResourceId, error: LoaderError) -> Self {
        let source = match error {
            LoaderError::ChildFailure { source, .. } => *source,
            other => other,
        };
        LoaderError::ChildFailure {
            identifier,
            child: source.identifier().clone(),
            source: Box::new(source),
        }
    }

    /// Collapses a list of failures: one error is returned as-is, several as a `Batch`.
    pub fn from_many(mut errors: Vec<LoaderError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(LoaderError::Batch(errors)),
        }
    }

    /// The identifier this error is about. For a `Batch`, the first failure's identifier.
    pub fn identifier(&self) -> &ResourceId {
        match self {
            LoaderError::HandlerMissing { identifier, .. }
            | LoaderError::LoadFailure { identifier, .. }
            | LoaderError::OpenFailure { identifier, .. }
            | LoaderError::ChildFailure { identifier, .. }
            | LoaderError::TypeMismatch { identifier, .. } => identifier,
            LoaderError::Batch(errors) => errors
                .first()
                .map(LoaderError::identifier)
                .unwrap_or(&EMPTY_IDENTIFIER),
        }
    }

    /// The error that started it all, looking through `ChildFailure` wrappers.
    pub fn originating(&self) -> &LoaderError {
        match self {
            LoaderError::ChildFailure { source, .. } => source.originating(),
            other => other,
        }
    }

    /// Returns `true` when this error was raised by the request itself rather
    /// than propagated from a dependency.
    pub fn is_originating(&self) -> bool {
        !matches!(self, LoaderError::ChildFailure { .. } | LoaderError::Batch(_))
    }

    /// The individual failures: the batch members, or just this error.
    pub fn errors(&self) -> &[LoaderError] {
        match self {
            LoaderError::Batch(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

static EMPTY_IDENTIFIER: ResourceId = ResourceId::empty();

#[cfg(test)]
mod tests {
    use super::*;

    fn load_failure(identifier: &str) -> LoaderError {
        LoaderError::LoadFailure {
            identifier: identifier.into(),
            source: HandlerError::msg("An error occured"),
        }
    }

    #[test]
    fn child_failure_wraps_the_originating_error() {
        let inner = LoaderError::child_of("delay_1_1".into(), load_failure("error_1_2"));
        let outer = LoaderError::child_of("1_0".into(), inner);

        match &outer {
            LoaderError::ChildFailure {
                identifier, child, ..
            } => {
                assert_eq!(identifier.as_str(), "1_0");
                assert_eq!(child.as_str(), "error_1_2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(outer.originating(), LoaderError::LoadFailure { .. }));
        assert!(!outer.is_originating());
        assert_eq!(
            outer.to_string(),
            "dependency 'error_1_2' of '1_0' failed: failed to load 'error_1_2': An error occured"
        );
    }

    #[test]
    fn from_many_collapses_single_failures() {
        assert!(LoaderError::from_many(Vec::new()).is_none());

        let single = LoaderError::from_many(vec![load_failure("a")]).expect("one error");
        assert!(matches!(single, LoaderError::LoadFailure { .. }));

        let batch =
            LoaderError::from_many(vec![load_failure("a"), load_failure("b")]).expect("batch");
        assert_eq!(batch.errors().len(), 2);
        assert_eq!(batch.identifier().as_str(), "a");
        assert!(batch.to_string().starts_with("2 requests failed"));
    }

    #[test]
    fn handler_error_keeps_the_message() {
        let error = load_failure("textures/missing.png");
        match error {
            LoaderError::LoadFailure { source, .. } => {
                assert_eq!(source.to_string(), "An error occured")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
