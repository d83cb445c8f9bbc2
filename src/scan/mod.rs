// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Shared scan scaffolding: the bind -> global-init -> local-init ->
//! scan lifecycle every reader implements, expressed once as the
//! [`Reader`] trait and adapted to `duckdb`'s [`VTab`] trait by
//! [`ReaderVTab`].
//!
//! DuckDB's C API only distinguishes `bind` and a per-thread `init`; the
//! spec's three-way split additionally wants one piece of state ("global
//! init") created once and shared read-only across every worker thread.
//! This module produces that extra phase lazily, the first time any
//! worker's `init` runs, and caches it inside the bind data (which
//! DuckDB already keeps alive and shared for the whole scan).

pub mod chunk;
pub mod contig;
pub mod projection;

use std::sync::OnceLock;

use duckdb::core::{DataChunkHandle, LogicalTypeHandle};
use duckdb::vtab::{BindInfo, Free, FunctionInfo, InitInfo, VTab};

use crate::error::{Error, Result};
pub use projection::Projection;

/// A format reader's bind/global-init/local-init/scan lifecycle.
///
/// Implementors split state across three lifetimes: `BindState` is
/// shared immutable across all workers, `GlobalState` is shared with one
/// mutable field (typically a [`contig::ContigClaimer`]), and `LocalState`
/// is exclusively owned by one worker (file handle, header copy, index,
/// iterator, decode buffers).
pub trait Reader: Send + Sync + Sized + 'static {
    type BindState: Send + Sync + 'static;
    type GlobalState: Send + Sync + 'static;
    type LocalState: Send + 'static;

    /// Opens the file, reads its header, derives the schema via
    /// `bind.add_result_column`, and returns the bind state.
    fn bind(bind: &BindInfo) -> Result<Self::BindState>;

    /// Decides scan parallelism and builds any state shared read-mostly
    /// across workers (contig names, claim counter).
    fn global_init(bind: &Self::BindState) -> Result<Self::GlobalState>;

    /// Declared positional parameters (path is always parameter 0).
    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        None
    }

    /// Declared named options.
    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        None
    }

    /// `max_threads` this reader wants for the given bind state.
    /// The default of 1 is correct for every non-indexed or single-contig
    /// reader; indexed multi-contig readers override this.
    fn max_threads(_bind: &Self::BindState) -> usize {
        1
    }

    /// Opens a private file handle/header/index/iterator for one worker
    /// and captures its projection list.
    fn local_init(
        bind: &Self::BindState,
        global: &Self::GlobalState,
        projection: Projection,
    ) -> Result<Self::LocalState>;

    /// Fills up to one chunk's worth of rows. Returning with the chunk's
    /// length unset (0 rows) signals exhaustion to DuckDB.
    fn scan(
        bind: &Self::BindState,
        global: &Self::GlobalState,
        local: &mut Self::LocalState,
        output: &mut DataChunkHandle,
    ) -> Result<()>;
}

/// Bind data stored by DuckDB for the whole scan: the reader's own bind
/// state plus a lazily-built, shared global-init state.
pub struct BindData<R: Reader> {
    pub state: R::BindState,
    global: OnceLock<R::GlobalState>,
}

impl<R: Reader> Free for BindData<R> {}

impl<R: Reader> BindData<R> {
    fn global(&self) -> Result<&R::GlobalState> {
        if let Some(g) = self.global.get() {
            return Ok(g);
        }
        let g = R::global_init(&self.state)?;
        // `OnceLock::get_or_init`-style race is harmless here: every
        // worker computes the same value from the same immutable bind
        // state, so a redundant build is wasted work, never corruption.
        let _ = self.global.set(g);
        Ok(self
            .global
            .get()
            .expect("global-init state was just populated"))
    }
}

/// Per-thread init data: this worker's local state plus whether it has
/// observed exhaustion (so repeated `func` calls after EOF are cheap).
pub struct InitData<R: Reader> {
    pub state: R::LocalState,
    pub done: bool,
}

impl<R: Reader> Free for InitData<R> {}

/// Adapts a [`Reader`] implementation to `duckdb::vtab::VTab`.
pub struct ReaderVTab<R: Reader> {
    _marker: std::marker::PhantomData<R>,
}

impl<R: Reader> VTab for ReaderVTab<R> {
    type InitData = InitData<R>;
    type BindData = BindData<R>;

    fn bind(bind: &BindInfo) -> std::result::Result<Self::BindData, Box<dyn std::error::Error>> {
        let state = R::bind(bind)?;
        // Forwards this reader's computed thread budget to DuckDB itself;
        // without this call DuckDB always schedules a single worker and
        // `ContigClaimer`/`RecordSource::Contigs` never runs concurrently.
        bind.set_max_threads(R::max_threads(&state));
        Ok(BindData {
            state,
            global: OnceLock::new(),
        })
    }

    fn init(info: &InitInfo) -> std::result::Result<Self::InitData, Box<dyn std::error::Error>> {
        let bind_data = info
            .get_bind_data::<BindData<R>>()
            .ok_or_else(|| Error::Duckdb("missing bind data in local-init".into()))?;
        let global = bind_data.global()?;
        let projection = Projection::from_init_info(info);
        let state = R::local_init(&bind_data.state, global, projection)?;
        Ok(InitData { state, done: false })
    }

    fn func(
        func: &FunctionInfo,
        output: &mut DataChunkHandle,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let bind_data = func
            .get_bind_data::<BindData<R>>()
            .ok_or_else(|| Error::Duckdb("missing bind data in scan".into()))?;
        let init_data = func
            .get_init_data::<InitData<R>>()
            .ok_or_else(|| Error::Duckdb("missing init data in scan".into()))?;

        if init_data.done {
            output.set_len(0);
            return Ok(());
        }

        let global = bind_data.global()?;
        R::scan(&bind_data.state, global, &mut init_data.state, output)?;
        if output.len() == 0 {
            init_data.done = true;
        }
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        R::parameters()
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        R::named_parameters()
    }

    fn supports_pushdown() -> bool {
        true
    }
}
