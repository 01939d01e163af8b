//! Derive macros for sqlmold
//!
//! Provides `#[derive(Bindable)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod bindable;

/// Derive `Bindable` (plus `BindTarget` and `NestedBind`) for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlmold::Bindable;
///
/// #[derive(Default, Bindable)]
/// #[bind(relationships = video_relationships)]
/// struct Video {
///     id: i64,
///     #[bind("video_title")]
///     title: String,
///     #[bind("users,bind")]
///     user: Option<User>,
///     #[bind("-")]
///     scratch: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[bind("name")]` - Bind the field to column `name` (default: the field
///   name in snake_case)
/// - `#[bind("name,bind")]` - Nested bindable struct; its columns are matched
///   as `name.column`
/// - `#[bind(",bind")]` - Nested bindable struct matched without a prefix
/// - `#[bind("-")]` - Never bound
/// - `#[bind(relationships = path)]` (struct) - `fn() -> &'static
///   Relationships<Self>` used for eager loading
#[proc_macro_derive(Bindable, attributes(bind))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bindable::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
