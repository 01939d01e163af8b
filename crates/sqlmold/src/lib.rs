//! # sqlmold
//!
//! A dialect-aware query builder, struct binder and eager loader.
//!
//! ## Features
//!
//! - **Query model**: build SELECT / UPDATE / DELETE statements from
//!   composable [`qm`] modifiers, rendered per [`Dialect`]
//! - **Placeholder handling**: `?` markers become `$N` on indexed dialects;
//!   `IN ?` expands to one placeholder per argument (grouped for composite keys)
//! - **Struct binding**: result columns resolve once into compact field paths,
//!   cached per type and column list
//! - **Eager loading**: relationship paths like `"Comments.Author"` load in one
//!   batched call per level, with shared prefixes loaded once
//! - **Executor boundary**: runs on `tokio_postgres::Client`, `Transaction`, or
//!   anything implementing [`Executor`]; [`LoggingExecutor`] adds `tracing`
//!
//! ## Example
//!
//! ```ignore
//! use sqlmold::{Bindable, Dialect, Query, args, qm};
//!
//! #[derive(Debug, Default, Bindable)]
//! struct Video {
//!     id: i64,
//!     title: String,
//! }
//!
//! let mut q = Query::new(Dialect::postgres());
//! q.apply([
//!     qm::from("videos"),
//!     qm::where_in("id IN ?", args![1, 2, 3]),
//!     qm::order_by("id", args![]),
//! ]);
//!
//! let videos: Vec<Video> = q.bind_all(&client).await?;
//! ```

pub mod bind;
pub mod client;
pub mod dialect;
pub mod eager;
pub mod error;
pub mod ident;
pub mod monitor;
pub mod qm;
pub mod query;
pub mod row;
pub mod value;

pub use bind::{
    BindField, BindTarget, Bindable, FieldKind, FieldMut, FieldPath, FieldRef, NestedBind, Scan,
    bind_row_into, bind_rows, compile_mapping,
};
pub use client::Executor;
pub use dialect::Dialect;
pub use eager::{LoadState, Loader, Relationships, load_relationships};
pub use error::{OrmError, OrmResult};
pub use monitor::{LogConfig, LoggingExecutor};
pub use qm::{Mod, QueryMod};
pub use query::{
    ArgClause, BindMode, Join, JoinKind, Query, Statement, WhereKind, WherePredicate, build_query,
};
pub use row::Row;
pub use value::{FromValue, ToValue, Value};

// Re-export async_trait so `Loader` impls don't need a direct dependency.
pub use async_trait::async_trait;

#[cfg(feature = "derive")]
pub use sqlmold_derive::Bindable;
