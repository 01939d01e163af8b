//! Column-to-field path compilation and application.

use super::{BindField, BindTarget, Bindable, FieldKind, FieldMut, FieldRef, Scan};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Location of a field inside a (possibly nested) bindable struct.
///
/// Each byte holds the field index at one nesting level, lowest byte first.
/// `0xFF` marks the end of the path, so a path holds at most
/// [`FieldPath::MAX_DEPTH`] levels with indices below 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPath(u64);

const SENTINEL: u64 = 0xFF;

impl FieldPath {
    pub const MAX_DEPTH: usize = 7;

    /// Encode a list of field indices, outermost first.
    pub fn from_indices(indices: &[usize]) -> OrmResult<Self> {
        if indices.is_empty() {
            return Err(OrmError::binding("field path must not be empty"));
        }
        if indices.len() > Self::MAX_DEPTH {
            return Err(OrmError::binding(format!(
                "field nesting depth {} exceeds the maximum of {}",
                indices.len(),
                Self::MAX_DEPTH
            )));
        }
        let mut raw = u64::MAX;
        for (level, &idx) in indices.iter().enumerate() {
            if idx as u64 >= SENTINEL {
                return Err(OrmError::binding(format!(
                    "field index {idx} is out of range (must be below 255)"
                )));
            }
            let shift = level * 8;
            raw &= !(SENTINEL << shift);
            raw |= (idx as u64) << shift;
        }
        Ok(Self(raw))
    }

    /// Field indices from the outermost level inward.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..8)
            .map(move |level| (self.0 >> (level * 8)) & SENTINEL)
            .take_while(|&b| b != SENTINEL)
            .map(|b| b as usize)
    }

    pub fn depth(self) -> usize {
        self.indices().count()
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Flatten a field table into `(dotted name, index trail)` pairs.
fn collect_paths(
    fields: &'static [BindField],
    prefix: &str,
    trail: &mut Vec<usize>,
    out: &mut Vec<(String, Vec<usize>)>,
) {
    for (idx, field) in fields.iter().enumerate() {
        trail.push(idx);
        let name = match (prefix.is_empty(), field.name.is_empty()) {
            (_, true) => prefix.to_string(),
            (true, false) => field.name.to_string(),
            (false, false) => format!("{prefix}.{}", field.name),
        };
        match field.kind {
            FieldKind::Scalar => out.push((name, trail.clone())),
            // Self-referential types would recurse forever; paths deeper
            // than the encoding allows can never be applied anyway.
            FieldKind::Nested(nested) if trail.len() < FieldPath::MAX_DEPTH => {
                collect_paths(nested(), &name, trail, out);
            }
            FieldKind::Nested(_) => {}
        }
        trail.pop();
    }
}

/// Resolve `columns` against `T`'s field table without consulting the cache.
///
/// Each column matches a full dotted path exactly, or else the first path
/// ending in `.column`. A column that matches nothing is a
/// [`OrmError::Binding`] naming it.
pub fn bind_mapping<T: Bindable>(columns: &[String]) -> OrmResult<Vec<FieldPath>> {
    let mut paths = Vec::new();
    collect_paths(T::bind_fields(), "", &mut Vec::new(), &mut paths);

    columns
        .iter()
        .map(|column| {
            let suffix = format!(".{column}");
            let (_, trail) = paths
                .iter()
                .find(|(name, _)| name == column)
                .or_else(|| paths.iter().find(|(name, _)| name.ends_with(&suffix)))
                .ok_or_else(|| {
                    OrmError::binding(format!(
                        "could not find struct field name in mapping: {column} (type {})",
                        std::any::type_name::<T>()
                    ))
                })?;
            FieldPath::from_indices(trail)
        })
        .collect()
}

type MappingCache = RwLock<HashMap<TypeId, HashMap<Vec<String>, Arc<[FieldPath]>>>>;

fn mapping_cache() -> &'static MappingCache {
    static CACHE: OnceLock<MappingCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Cached [`bind_mapping`], keyed by `(T, columns)`.
pub fn compile_mapping<T: Bindable>(columns: &[String]) -> OrmResult<Arc<[FieldPath]>> {
    let type_id = TypeId::of::<T>();
    {
        let cache = mapping_cache()
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(mapping) = cache.get(&type_id).and_then(|m| m.get(columns)) {
            return Ok(Arc::clone(mapping));
        }
    }

    tracing::trace!(
        target: "sqlmold.bind",
        ty = std::any::type_name::<T>(),
        columns = columns.len(),
        "compiling field mapping"
    );
    let mapping: Arc<[FieldPath]> = bind_mapping::<T>(columns)?.into();

    let mut cache = mapping_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let entry = cache
        .entry(type_id)
        .or_default()
        .entry(columns.to_vec())
        .or_insert(mapping);
    Ok(Arc::clone(entry))
}

/// Walk `path` on `target`, allocating nested optional structs as needed.
pub fn field_mut(target: &mut dyn BindTarget, path: FieldPath) -> OrmResult<&mut dyn Scan> {
    let mut current = target;
    let mut indices = path.indices().peekable();
    while let Some(idx) = indices.next() {
        let last = indices.peek().is_none();
        match current.field_mut(idx) {
            Some(FieldMut::Scalar(field)) if last => return Ok(field),
            Some(FieldMut::Nested(nested)) if !last => current = nested,
            _ => return Err(unreachable_field(path)),
        }
    }
    Err(unreachable_field(path))
}

/// Walk `path` on `target` for reading.
///
/// Returns `Ok(None)` when an optional nested struct on the way is unset.
/// Unlike [`field_mut`], nothing is allocated.
pub fn field_ref(target: &dyn BindTarget, path: FieldPath) -> OrmResult<Option<&dyn Scan>> {
    let mut current = target;
    let mut indices = path.indices().peekable();
    while let Some(idx) = indices.next() {
        let last = indices.peek().is_none();
        match current.field_ref(idx) {
            Some(FieldRef::Scalar(field)) if last => return Ok(Some(field)),
            Some(FieldRef::Nested(nested)) if !last => current = nested,
            None => return Ok(None),
            _ => return Err(unreachable_field(path)),
        }
    }
    Err(unreachable_field(path))
}

fn unreachable_field(path: FieldPath) -> OrmError {
    OrmError::binding(format!(
        "struct does not expose the field at path {:?}",
        path.indices().collect::<Vec<_>>()
    ))
}

/// Read the mapped fields of `target` in mapping order.
///
/// Fields behind an unset optional struct read as [`Value::Null`].
pub fn values_from_mapping(
    target: &dyn BindTarget,
    mapping: &[FieldPath],
) -> OrmResult<Vec<Value>> {
    mapping
        .iter()
        .map(|&path| Ok(field_ref(target, path)?.map_or(Value::Null, |f| f.get_value())))
        .collect()
}

/// Store one row into `target` using a compiled mapping.
pub fn scan_row(target: &mut dyn BindTarget, mapping: &[FieldPath], row: &Row) -> OrmResult<()> {
    if mapping.len() != row.len() {
        return Err(OrmError::binding(format!(
            "mapping has {} fields but row has {} columns",
            mapping.len(),
            row.len()
        )));
    }
    for ((&path, value), column) in mapping.iter().zip(row.values()).zip(row.columns()) {
        field_mut(target, path)?
            .set_value(value.clone())
            .map_err(|e| OrmError::decode(column.as_str(), e))?;
    }
    Ok(())
}

/// Bind `row` onto an existing `target`, overwriting the mapped fields.
pub fn bind_row_into<T: Bindable>(target: &mut T, row: &Row) -> OrmResult<()> {
    let mapping = compile_mapping::<T>(row.columns())?;
    scan_row(target, &mapping, row)
}

/// Bind every row into a new `T`, in row order.
pub fn bind_rows<T: Bindable>(rows: &[Row]) -> OrmResult<Vec<T>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let mapping = compile_mapping::<T>(first.columns())?;
    rows.iter()
        .map(|row| {
            let mut obj = T::default();
            scan_row(&mut obj, &mapping, row)?;
            Ok(obj)
        })
        .collect()
}
