use super::*;
use crate::error::OrmError;
use crate::row::Row;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
}

impl BindTarget for User {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>> {
        match idx {
            0 => Some(FieldMut::Scalar(&mut self.id)),
            1 => Some(FieldMut::Scalar(&mut self.name)),
            _ => None,
        }
    }

    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>> {
        match idx {
            0 => Some(FieldRef::Scalar(&self.id)),
            1 => Some(FieldRef::Scalar(&self.name)),
            _ => None,
        }
    }
}

impl Bindable for User {
    fn bind_fields() -> &'static [BindField] {
        static FIELDS: [BindField; 2] = [BindField::scalar("id"), BindField::scalar("name")];
        &FIELDS
    }
}

impl NestedBind for User {
    fn nested_fields() -> &'static [BindField] {
        User::bind_fields()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Stats {
    views: i64,
}

impl BindTarget for Stats {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>> {
        match idx {
            0 => Some(FieldMut::Scalar(&mut self.views)),
            _ => None,
        }
    }

    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>> {
        match idx {
            0 => Some(FieldRef::Scalar(&self.views)),
            _ => None,
        }
    }
}

impl Bindable for Stats {
    fn bind_fields() -> &'static [BindField] {
        static FIELDS: [BindField; 1] = [BindField::scalar("views")];
        &FIELDS
    }
}

impl NestedBind for Stats {
    fn nested_fields() -> &'static [BindField] {
        Stats::bind_fields()
    }
}

/// `id`, `title`, `users.*` (optional), flattened `views`, `editor.*` (boxed).
#[derive(Debug, Default, PartialEq)]
struct Video {
    id: i64,
    title: Option<String>,
    user: Option<User>,
    stats: Stats,
    editor: Box<User>,
}

impl BindTarget for Video {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>> {
        match idx {
            0 => Some(FieldMut::Scalar(&mut self.id)),
            1 => Some(FieldMut::Scalar(&mut self.title)),
            2 => Some(FieldMut::Nested(&mut self.user)),
            3 => Some(FieldMut::Nested(&mut self.stats)),
            4 => Some(FieldMut::Nested(&mut self.editor)),
            _ => None,
        }
    }

    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>> {
        match idx {
            0 => Some(FieldRef::Scalar(&self.id)),
            1 => Some(FieldRef::Scalar(&self.title)),
            2 => Some(FieldRef::Nested(&self.user)),
            3 => Some(FieldRef::Nested(&self.stats)),
            4 => Some(FieldRef::Nested(&self.editor)),
            _ => None,
        }
    }
}

impl Bindable for Video {
    fn bind_fields() -> &'static [BindField] {
        static FIELDS: [BindField; 5] = [
            BindField::scalar("id"),
            BindField::scalar("title"),
            BindField::nested("users", <Option<User> as NestedBind>::nested_fields),
            BindField::nested("", Stats::nested_fields),
            BindField::nested("editor", <Box<User> as NestedBind>::nested_fields),
        ];
        &FIELDS
    }
}

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn row(names: &[&str], values: Vec<Value>) -> Row {
    Row::new(Arc::from(cols(names)), values)
}

fn indices(path: FieldPath) -> Vec<usize> {
    path.indices().collect()
}

// ==================== FieldPath ====================

#[test]
fn test_field_path_encoding() {
    let path = FieldPath::from_indices(&[1, 2]).unwrap();
    assert_eq!(path.raw(), 0xFFFF_FFFF_FFFF_0201);
    assert_eq!(indices(path), vec![1, 2]);
    assert_eq!(path.depth(), 2);

    let deepest = FieldPath::from_indices(&[0; 7]).unwrap();
    assert_eq!(deepest.depth(), 7);
}

#[test]
fn test_field_path_limits() {
    assert!(matches!(FieldPath::from_indices(&[0; 8]), Err(OrmError::Binding(_))));
    assert!(matches!(FieldPath::from_indices(&[255]), Err(OrmError::Binding(_))));
    assert!(matches!(FieldPath::from_indices(&[]), Err(OrmError::Binding(_))));
    assert!(FieldPath::from_indices(&[254]).is_ok());
}

// ==================== mapping ====================

#[test]
fn test_exact_nested_and_flattened_paths() {
    let columns = cols(&["id", "title", "users.id", "users.name", "views", "editor.name"]);
    let mapping = bind_mapping::<Video>(&columns).unwrap();
    let got: Vec<Vec<usize>> = mapping.into_iter().map(indices).collect();
    assert_eq!(
        got,
        vec![vec![0], vec![1], vec![2, 0], vec![2, 1], vec![3, 0], vec![4, 1]]
    );
}

#[test]
fn test_suffix_match_for_bare_columns() {
    // `name` exists only nested; the first path ending in `.name` wins.
    let mapping = bind_mapping::<Video>(&cols(&["name"])).unwrap();
    assert_eq!(indices(mapping[0]), vec![2, 1]);

    // An exact top-level match beats a suffix match.
    let mapping = bind_mapping::<Video>(&cols(&["id"])).unwrap();
    assert_eq!(indices(mapping[0]), vec![0]);
}

#[test]
fn test_unknown_column_is_a_binding_error() {
    let err = bind_mapping::<Video>(&cols(&["id", "nope"])).unwrap_err();
    match err {
        OrmError::Binding(msg) => assert!(msg.contains("nope")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_compile_mapping_is_cached() {
    let columns = cols(&["id", "users.name"]);
    let a = compile_mapping::<Video>(&columns).unwrap();
    let b = compile_mapping::<Video>(&columns).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let other = compile_mapping::<User>(&cols(&["id", "name"])).unwrap();
    assert_eq!(other.len(), 2);
}

// ==================== applying ====================

#[test]
fn test_scan_row_allocates_nested() {
    let r = row(
        &["id", "title", "users.id", "users.name", "views"],
        vec![
            Value::Int(1),
            Value::Null,
            Value::Int(9),
            Value::Text("bob".into()),
            Value::Int(40),
        ],
    );
    let mut video = Video::default();
    bind_row_into(&mut video, &r).unwrap();

    assert_eq!(video.id, 1);
    assert_eq!(video.title, None);
    assert_eq!(
        video.user,
        Some(User {
            id: 9,
            name: "bob".into()
        })
    );
    assert_eq!(video.stats.views, 40);
}

#[test]
fn test_values_from_mapping_reads_null_through_unset_option() {
    let mapping = bind_mapping::<Video>(&cols(&["id", "users.name", "editor.id"])).unwrap();
    let mut video = Video {
        id: 3,
        ..Default::default()
    };
    video.editor.id = 8;

    let values = values_from_mapping(&video, &mapping).unwrap();
    assert_eq!(values, vec![Value::Int(3), Value::Null, Value::Int(8)]);
}

#[test]
fn test_field_mut_rejects_scalar_as_nested() {
    let mut video = Video::default();
    let bad = FieldPath::from_indices(&[0, 1]).unwrap();
    assert!(matches!(field_mut(&mut video, bad), Err(OrmError::Binding(_))));

    let bad = FieldPath::from_indices(&[2]).unwrap();
    assert!(matches!(field_mut(&mut video, bad), Err(OrmError::Binding(_))));
}

#[test]
fn test_decode_error_names_column() {
    let r = row(&["id"], vec![Value::Text("x".into())]);
    let err = bind_row_into(&mut User::default(), &r).unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "id"));
}

#[test]
fn test_scan_row_length_mismatch() {
    let mapping = bind_mapping::<User>(&cols(&["id"])).unwrap();
    let r = row(&["id", "name"], vec![Value::Int(1), Value::Text("a".into())]);
    assert!(scan_row(&mut User::default(), &mapping, &r).is_err());
}

#[test]
fn test_bind_rows_one_element_per_row() {
    let columns: Arc<[String]> = Arc::from(cols(&["id", "name"]));
    let rows = vec![
        Row::new(columns.clone(), vec![Value::Int(2), Value::Text("b".into())]),
        Row::new(columns, vec![Value::Int(1), Value::Text("a".into())]),
    ];
    let users: Vec<User> = bind_rows(&rows).unwrap();
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 1]);
    assert!(bind_rows::<User>(&[]).unwrap().is_empty());
}

#[test]
fn test_later_rows_overwrite_earlier_ones() {
    let mut user = User::default();
    let first = row(&["id", "name"], vec![Value::Int(1), Value::Text("a".into())]);
    bind_row_into(&mut user, &first).unwrap();
    bind_row_into(&mut user, &row(&["name"], vec![Value::Text("z".into())])).unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            name: "z".into()
        }
    );
}
