//! Internal disposal bag for instances owned by a scope.

use crate::error::{DiError, DiResult};
use crate::traits::{Disposer, DisposerKind};

/// Disposers in creation order; drained LIFO.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Disposer>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, disposer: Disposer) {
        self.entries.push(disposer);
    }

    /// Takes every entry out of the bag, most recent first.
    pub(crate) fn take_reverse(&mut self) -> Vec<Disposer> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Runs synchronous disposers in the given order.
///
/// Async-only entries cannot be honoured here: they are skipped and the first
/// one is reported after every synchronous entry has run.
pub(crate) fn run_sync(entries: Vec<Disposer>) -> DiResult<()> {
    let mut async_only = None;
    for disposer in entries {
        match &disposer.kind {
            DisposerKind::Sync(service) => service.dispose(),
            DisposerKind::Async(_) => {
                tracing::warn!(service = disposer.name, "async-only disposable skipped by synchronous dispose");
                async_only.get_or_insert(disposer.name);
            }
        }
    }
    match async_only {
        Some(name) => Err(DiError::AsyncDisposalRequired(name)),
        None => Ok(()),
    }
}

/// Runs every disposer in the given order, awaiting async ones.
pub(crate) async fn run_async(entries: Vec<Disposer>) {
    for disposer in entries {
        match &disposer.kind {
            DisposerKind::Sync(service) => service.dispose(),
            DisposerKind::Async(service) => service.dispose().await,
        }
    }
}
