//! Eager loading of relationships onto bound objects.
//!
//! A bindable type registers its relationships in a [`Relationships`]
//! registry: a name, a [`Loader`] that runs the extra query and attaches the
//! results, and an accessor to the populated field. Load paths such as
//! `"Comments.Author"` are then resolved segment by segment:
//!
//! - every segment costs one loader call for the whole batch of objects at
//!   that depth, no matter how many parents there are;
//! - a prefix shared by several paths (`"A.B"` and `"A.C"`) is loaded once;
//! - an unset to-one or empty to-many result ends that branch quietly.
//!
//! ```ignore
//! use sqlmold::eager::{Loader, Relationships};
//! use std::sync::LazyLock;
//!
//! static VIDEO_RELS: LazyLock<Relationships<Video>> = LazyLock::new(|| {
//!     Relationships::new()
//!         .to_one("User", UserLoader, |v: &mut Video| v.user.as_mut())
//!         .to_many("Tags", TagLoader, |v: &mut Video| &mut v.tags)
//! });
//! ```

use crate::bind::Bindable;
use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs the query for one relationship and attaches the results.
///
/// `targets` holds every object at the current depth; `singular` is true when
/// the top-level bind was for a single object and every relationship on the
/// way was to-one.
#[async_trait]
pub trait Loader<T>: Send + Sync {
    async fn load(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
    ) -> OrmResult<()>;
}

/// Type-erased relationship entry.
#[async_trait]
trait Relation<T>: Send + Sync {
    fn is_to_one(&self) -> bool;

    async fn load(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
    ) -> OrmResult<()>;

    /// Continue `segments` from `depth` on the objects this relationship populated.
    async fn descend(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
        segments: &[&str],
        depth: usize,
        state: &mut LoadState,
    ) -> OrmResult<()>;
}

struct ToOne<T, U, L> {
    loader: L,
    accessor: fn(&mut T) -> Option<&mut U>,
}

struct ToMany<T, U, L> {
    loader: L,
    accessor: fn(&mut T) -> &mut Vec<U>,
}

#[async_trait]
impl<T, U, L> Relation<T> for ToOne<T, U, L>
where
    T: Bindable,
    U: Bindable,
    L: Loader<T>,
{
    fn is_to_one(&self) -> bool {
        true
    }

    async fn load(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
    ) -> OrmResult<()> {
        self.loader.load(exec, singular, targets).await
    }

    async fn descend(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
        segments: &[&str],
        depth: usize,
        state: &mut LoadState,
    ) -> OrmResult<()> {
        let mut children: Vec<&mut U> = targets
            .iter_mut()
            .filter_map(|t| (self.accessor)(&mut **t))
            .collect();
        if children.is_empty() {
            return Ok(());
        }
        load_path(exec, segments, depth, singular, &mut children, state).await
    }
}

#[async_trait]
impl<T, U, L> Relation<T> for ToMany<T, U, L>
where
    T: Bindable,
    U: Bindable,
    L: Loader<T>,
{
    fn is_to_one(&self) -> bool {
        false
    }

    async fn load(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
    ) -> OrmResult<()> {
        self.loader.load(exec, singular, targets).await
    }

    async fn descend(
        &self,
        exec: &dyn Executor,
        singular: bool,
        targets: &mut [&mut T],
        segments: &[&str],
        depth: usize,
        state: &mut LoadState,
    ) -> OrmResult<()> {
        let mut children: Vec<&mut U> = targets
            .iter_mut()
            .flat_map(|t| (self.accessor)(&mut **t).iter_mut())
            .collect();
        if children.is_empty() {
            return Ok(());
        }
        load_path(exec, segments, depth, singular, &mut children, state).await
    }
}

/// Relationship loaders of one bindable type, looked up by name.
pub struct Relationships<T> {
    relations: HashMap<&'static str, Box<dyn Relation<T>>>,
}

impl<T: Bindable> Default for Relationships<T> {
    fn default() -> Self {
        Self {
            relations: HashMap::new(),
        }
    }
}

impl<T: Bindable> std::fmt::Debug for Relationships<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.relations.keys().collect();
        names.sort();
        f.debug_struct("Relationships")
            .field("names", &names)
            .finish()
    }
}

impl<T: Bindable> Relationships<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relationship holding at most one `U`.
    pub fn to_one<U, L>(
        mut self,
        name: &'static str,
        loader: L,
        accessor: fn(&mut T) -> Option<&mut U>,
    ) -> Self
    where
        U: Bindable,
        L: Loader<T> + 'static,
    {
        self.relations
            .insert(name, Box::new(ToOne { loader, accessor }));
        self
    }

    /// Register a relationship holding any number of `U`.
    pub fn to_many<U, L>(
        mut self,
        name: &'static str,
        loader: L,
        accessor: fn(&mut T) -> &mut Vec<U>,
    ) -> Self
    where
        U: Bindable,
        L: Loader<T> + 'static,
    {
        self.relations
            .insert(name, Box::new(ToMany { loader, accessor }));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    fn get(&self, name: &str) -> Option<&dyn Relation<T>> {
        self.relations.get(name).map(|r| r.as_ref())
    }
}

/// Dot-joined relationship prefixes already loaded during one top-level call.
#[derive(Debug, Default, Clone)]
pub struct LoadState {
    loaded: HashSet<String>,
}

impl LoadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, prefix: &str) -> bool {
        self.loaded.contains(prefix)
    }

    pub fn loaded_paths(&self) -> impl Iterator<Item = &str> {
        self.loaded.iter().map(String::as_str)
    }
}

/// Load every path in `paths` onto `targets`.
///
/// `singular` tells loaders whether the caller bound a single object.
pub async fn load_relationships<T: Bindable>(
    exec: &dyn Executor,
    paths: &[String],
    singular: bool,
    targets: &mut [&mut T],
) -> OrmResult<()> {
    let mut state = LoadState::new();
    load_relationships_with_state(exec, paths, singular, targets, &mut state).await
}

/// [`load_relationships`] with caller-owned memoization state.
pub async fn load_relationships_with_state<T: Bindable>(
    exec: &dyn Executor,
    paths: &[String],
    singular: bool,
    targets: &mut [&mut T],
    state: &mut LoadState,
) -> OrmResult<()> {
    if targets.is_empty() {
        return Ok(());
    }
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        load_path(exec, &segments, 0, singular, targets, state).await?;
    }
    Ok(())
}

fn load_path<'a, 'b: 'a, T: Bindable>(
    exec: &'a dyn Executor,
    segments: &'a [&'a str],
    depth: usize,
    singular: bool,
    targets: &'a mut [&'b mut T],
    state: &'a mut LoadState,
) -> BoxFuture<'a, OrmResult<()>> {
    Box::pin(async move {
        let name = segments[depth];
        let prefix = segments[..=depth].join(".");

        let registry = T::relationships().ok_or_else(|| {
            OrmError::config(format!(
                "failed to eager load {prefix}: {} has no relationships",
                std::any::type_name::<T>()
            ))
        })?;
        let relation = registry.get(name).ok_or_else(|| {
            OrmError::config(format!(
                "failed to eager load {prefix}: no loader registered for {name} on {}",
                std::any::type_name::<T>()
            ))
        })?;

        if state.loaded.contains(&prefix) {
            tracing::trace!(target: "sqlmold.eager", relationship = %prefix, "already loaded");
        } else {
            tracing::trace!(
                target: "sqlmold.eager",
                relationship = %prefix,
                targets = targets.len(),
                singular,
                "loading relationship"
            );
            relation
                .load(exec, singular, targets)
                .await
                .map_err(|e| e.in_relationship(name))?;
            state.loaded.insert(prefix);
        }

        if depth + 1 == segments.len() {
            return Ok(());
        }
        let singular = singular && relation.is_to_one();
        relation
            .descend(exec, singular, targets, segments, depth + 1, state)
            .await
    })
}

// ==================== loader helpers ====================

/// Distinct keys of `targets` in first-seen order, for building IN arguments.
pub fn distinct_keys<T, K>(targets: &[&mut T], key: impl Fn(&T) -> K) -> Vec<K>
where
    K: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    targets
        .iter()
        .map(|t| key(t))
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Attach each child to every target whose key matches (to-one).
pub fn attach_one<T, C, K>(
    targets: &mut [&mut T],
    children: Vec<C>,
    target_key: impl Fn(&T) -> K,
    child_key: impl Fn(&C) -> K,
    slot: impl Fn(&mut T) -> &mut Option<C>,
) where
    C: Clone,
    K: Eq + Hash,
{
    let by_key: HashMap<K, C> = children.into_iter().map(|c| (child_key(&c), c)).collect();
    for target in targets.iter_mut() {
        if let Some(child) = by_key.get(&target_key(target)) {
            *slot(target) = Some(child.clone());
        }
    }
}

/// Group children under every target whose key matches (to-many).
///
/// Children keep the order the query returned them in.
pub fn attach_many<T, C, K>(
    targets: &mut [&mut T],
    children: Vec<C>,
    target_key: impl Fn(&T) -> K,
    child_key: impl Fn(&C) -> K,
    slot: impl Fn(&mut T) -> &mut Vec<C>,
) where
    C: Clone,
    K: Eq + Hash,
{
    let mut by_key: HashMap<K, Vec<C>> = HashMap::new();
    for child in children {
        by_key.entry(child_key(&child)).or_default().push(child);
    }
    for target in targets.iter_mut() {
        if let Some(group) = by_key.get(&target_key(target)) {
            slot(target).extend(group.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        id: i64,
        parent: i64,
        children: Vec<(i64, &'static str)>,
        owner: Option<(i64, &'static str)>,
    }

    fn item(id: i64, parent: i64) -> Item {
        Item {
            id,
            parent,
            children: Vec::new(),
            owner: None,
        }
    }

    #[test]
    fn distinct_keys_keeps_first_seen_order() {
        let (mut a, mut b, mut c) = (item(1, 7), item(2, 3), item(3, 7));
        let targets = [&mut a, &mut b, &mut c];
        assert_eq!(distinct_keys(&targets, |i| i.parent), vec![7, 3]);
    }

    #[test]
    fn attach_many_groups_by_key() {
        let (mut a, mut b) = (item(1, 0), item(2, 0));
        let mut targets = [&mut a, &mut b];
        attach_many(
            &mut targets,
            vec![(1, "x"), (2, "y"), (1, "z")],
            |i| i.id,
            |c| c.0,
            |i| &mut i.children,
        );
        assert_eq!(a.children, vec![(1, "x"), (1, "z")]);
        assert_eq!(b.children, vec![(2, "y")]);
    }

    #[test]
    fn attach_one_shares_child_between_targets() {
        let (mut a, mut b, mut c) = (item(1, 5), item(2, 5), item(3, 6));
        let mut targets = [&mut a, &mut b, &mut c];
        attach_one(&mut targets, vec![(5, "bob")], |i| i.parent, |c| c.0, |i| &mut i.owner);
        assert_eq!(a.owner, Some((5, "bob")));
        assert_eq!(b.owner, Some((5, "bob")));
        assert_eq!(c.owner, None);
    }
}
