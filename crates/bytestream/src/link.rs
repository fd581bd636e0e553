// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Formatter};

use tracing::{Level, event};

use crate::{BufferedSink, BufferedSource, Sink, Source, Unreadable, Unwritable};

/// A stand-in that a [`Link`] dispatches to while it is not bound to anything.
///
/// Implemented by the zero-sized sentinels [`Unreadable`] and [`Unwritable`].
pub trait Detached<T: ?Sized> {
    /// Views the sentinel as the linked interface.
    fn as_target(&mut self) -> &mut T;

    /// Views the sentinel as the linked interface, read-only.
    fn as_target_ref(&self) -> &T;
}

/// The slot through which a layer reaches its single upstream or downstream collaborator.
///
/// A link either borrows a collaborator for `'a` or dispatches to the poisoned sentinel `D`,
/// whose every transfer fails with [`Error::Uninitialized`][crate::Error::Uninitialized]. An
/// unbound layer is therefore inert rather than undefined, and callers never check for "no
/// collaborator" themselves.
///
/// Binding performs no I/O and may be repeated; the previous collaborator is released.
pub struct Link<'a, T: ?Sized + 'a, D> {
    bound: Option<&'a mut T>,
    detached: D,
}

impl<'a, T: ?Sized + 'a, D: Detached<T> + Default> Link<'a, T, D> {
    /// Creates a link that is not bound to anything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bound: None,
            detached: D::default(),
        }
    }

    /// Binds the link to `target`, releasing any previous collaborator.
    pub fn bind(&mut self, target: &'a mut T) {
        event!(Level::TRACE, message = "bound", rebound = self.bound.is_some());
        self.bound = Some(target);
    }

    /// Returns the link to the sentinel, handing back the collaborator it was bound to.
    pub fn unbind(&mut self) -> Option<&'a mut T> {
        self.bound.take()
    }

    /// Whether the link currently refers to a real collaborator.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The current collaborator, or the sentinel if unbound.
    pub fn target(&mut self) -> &mut T {
        match &mut self.bound {
            Some(target) => &mut **target,
            None => self.detached.as_target(),
        }
    }

    /// The current collaborator, or the sentinel if unbound, read-only.
    #[must_use]
    pub fn target_ref(&self) -> &T {
        match &self.bound {
            Some(target) => &**target,
            None => self.detached.as_target_ref(),
        }
    }
}

impl<'a, T: ?Sized + 'a, D: Detached<T> + Default> Default for Link<'a, T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, D> Debug for Link<'_, T, D> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("bound", &self.bound.is_some()).finish()
    }
}

/// Link from a buffer to the [`Source`] it pulls from.
pub type SourceLink<'a> = Link<'a, dyn Source + 'a, Unreadable>;

/// Link from a buffer to the [`Sink`] it flushes to.
pub type SinkLink<'a> = Link<'a, dyn Sink + 'a, Unwritable>;

/// Link from a transform to the [`BufferedSource`] whose window it forwards.
pub type BufferedSourceLink<'a> = Link<'a, dyn BufferedSource + 'a, Unreadable>;

/// Link from a transform to the [`BufferedSink`] whose window it forwards.
pub type BufferedSinkLink<'a> = Link<'a, dyn BufferedSink + 'a, Unwritable>;
