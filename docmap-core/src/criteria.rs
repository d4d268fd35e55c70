//! Queries written in entity property names.
//!
//! [`QueryCriteria`] is the declarative form accepted by
//! [`Collection::find`](crate::collection::Collection::find); [`Query`] is the chainable form
//! returned by [`Collection::query`](crate::collection::Collection::query). Both resolve each
//! property against the entity's registered fields before anything reaches the store, so a
//! misspelled property fails immediately. Dotted paths (`"metadata.lastSignIn"`) walk into the
//! nested models of map fields.
//!
//! # Cursor rules
//!
//! Cursors only apply when at least one ordering is given. When both an inclusive and an
//! exclusive cursor are supplied for the same edge, the inclusive one (`start_at`, `end_at`)
//! wins.
//!
//! # Example
//!
//! ```ignore
//! let recent = posts
//!     .find(Some(
//!         QueryCriteria::new()
//!             .where_("title", FieldOp::Eq, "Hello World!")
//!             .order_by("title", Some(Direction::Desc))
//!             .limit(10),
//!     ))
//!     .await?;
//! ```

use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::warn;

use crate::{
    backend::{QueryListener, RawQuerySnapshot, Subscription},
    collection::Collection,
    entity::Entity,
    error::{DocMapError, DocMapResult},
    query::{Direction, Expr, FieldOp, NativeQuery, validate_operand},
    registry::Repository,
    snapshot::{QuerySnapshot, SnapshotSink},
    value::Value,
};

/// A property, or a path of properties through nested map models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl<const N: usize> From<[&str; N]> for PropertyPath {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|segment| segment.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub property: PropertyPath,
    pub op: FieldOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub property: PropertyPath,
    /// Ascending when unset.
    pub direction: Option<Direction>,
}

/// A declarative query in entity property names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCriteria {
    pub filters: Vec<WhereClause>,
    pub order_by: Vec<OrderClause>,
    pub limit: Option<usize>,
    pub start_at: Option<Vec<Value>>,
    pub start_after: Option<Vec<Value>>,
    pub end_at: Option<Vec<Value>>,
    pub end_before: Option<Vec<Value>>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, property: impl Into<PropertyPath>, op: FieldOp, value: impl Into<Value>) -> Self {
        self.filters.push(WhereClause {
            property: property.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, property: impl Into<PropertyPath>, direction: Option<Direction>) -> Self {
        self.order_by.push(OrderClause { property: property.into(), direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_at(mut self, values: Vec<Value>) -> Self {
        self.start_at = Some(values);
        self
    }

    pub fn start_after(mut self, values: Vec<Value>) -> Self {
        self.start_after = Some(values);
        self
    }

    pub fn end_at(mut self, values: Vec<Value>) -> Self {
        self.end_at = Some(values);
        self
    }

    pub fn end_before(mut self, values: Vec<Value>) -> Self {
        self.end_before = Some(values);
        self
    }
}

/// Maps a property path to the dotted store field name.
///
/// # Errors
///
/// Returns [`DocMapError::UnknownProperty`] when a segment is not a registered field, or when a
/// segment other than the last is not a map field.
pub fn resolve_property(repository: &Arc<Repository>, property: &PropertyPath, collection: &str) -> DocMapResult<String> {
    let unknown = || DocMapError::UnknownProperty {
        property: property.to_string(),
        collection: collection.to_string(),
    };

    let mut names = Vec::with_capacity(property.segments().len());
    let mut current = repository.clone();
    let mut segments = property.segments().iter().peekable();

    while let Some(segment) = segments.next() {
        let field = current.field(segment).ok_or_else(unknown)?;
        names.push(field.name.clone());
        if segments.peek().is_some() {
            current = field.nested().cloned().ok_or_else(unknown)?;
        }
    }

    if names.is_empty() {
        return Err(unknown());
    }
    Ok(names.join("."))
}

/// Applies `criteria` to `base`, resolving every property against `repository`.
pub fn translate(repository: &Arc<Repository>, base: NativeQuery, criteria: QueryCriteria) -> DocMapResult<NativeQuery> {
    let collection = base.collection.to_string();
    let mut query = base;

    for clause in criteria.filters {
        let field = resolve_property(repository, &clause.property, &collection)?;
        validate_operand(clause.op, &clause.value)?;
        query = query.where_(Expr::field(field, clause.op, clause.value));
    }

    if criteria.order_by.is_empty() {
        let has_cursor = criteria.start_at.is_some()
            || criteria.start_after.is_some()
            || criteria.end_at.is_some()
            || criteria.end_before.is_some();
        if has_cursor {
            warn!(collection = %collection, "ignoring query cursors without an ordering");
        }
    } else {
        for clause in criteria.order_by {
            let field = resolve_property(repository, &clause.property, &collection)?;
            query = query.order_by(field, clause.direction.unwrap_or_default());
        }
        if let Some(values) = criteria.start_at {
            query = query.start_at(values);
        } else if let Some(values) = criteria.start_after {
            query = query.start_after(values);
        }
        if let Some(values) = criteria.end_at {
            query = query.end_at(values);
        } else if let Some(values) = criteria.end_before {
            query = query.end_before(values);
        }
    }

    if let Some(limit) = criteria.limit {
        query = query.limit(limit);
    }

    Ok(query)
}

/// A chainable query over a typed collection.
///
/// Every step resolves its property immediately and returns a new query.
pub struct Query<T> {
    collection: Collection<T>,
    native: NativeQuery,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            native: self.native.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("native", &self.native).finish()
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(collection: Collection<T>) -> Self {
        let native = NativeQuery::new(collection.path().clone());
        Self { collection, native, _entity: PhantomData }
    }

    /// The query in store field names.
    pub fn native(&self) -> &NativeQuery {
        &self.native
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    fn resolve(&self, property: impl Into<PropertyPath>) -> DocMapResult<String> {
        resolve_property(
            self.collection.handle().repository(),
            &property.into(),
            &self.native.collection.to_string(),
        )
    }

    fn with(self, native: NativeQuery) -> Self {
        Self { native, ..self }
    }

    pub fn where_(self, property: impl Into<PropertyPath>, op: FieldOp, value: impl Into<Value>) -> DocMapResult<Self> {
        let field = self.resolve(property)?;
        let value = value.into();
        validate_operand(op, &value)?;
        let native = self.native.clone().where_(Expr::field(field, op, value));
        Ok(self.with(native))
    }

    /// Orders by a property, ascending when `direction` is `None`.
    pub fn order_by(self, property: impl Into<PropertyPath>, direction: Option<Direction>) -> DocMapResult<Self> {
        let field = self.resolve(property)?;
        let native = self
            .native
            .clone()
            .order_by(field, direction.unwrap_or_default());
        Ok(self.with(native))
    }

    pub fn limit(self, limit: usize) -> Self {
        let native = self.native.clone().limit(limit);
        self.with(native)
    }

    pub fn start_at(self, values: Vec<Value>) -> Self {
        let native = self.native.clone().start_at(values);
        self.with(native)
    }

    pub fn start_after(self, values: Vec<Value>) -> Self {
        let native = self.native.clone().start_after(values);
        self.with(native)
    }

    pub fn end_at(self, values: Vec<Value>) -> Self {
        let native = self.native.clone().end_at(values);
        self.with(native)
    }

    pub fn end_before(self, values: Vec<Value>) -> Self {
        let native = self.native.clone().end_before(values);
        self.with(native)
    }

    /// Adds everything in `criteria` to this query.
    pub fn apply(self, criteria: QueryCriteria) -> DocMapResult<Self> {
        let native = translate(
            self.collection.handle().repository(),
            self.native.clone(),
            criteria,
        )?;
        Ok(self.with(native))
    }

    pub async fn get(&self) -> DocMapResult<QuerySnapshot<T>> {
        let raw = self
            .collection
            .handle()
            .connection()
            .backend()
            .run_query(&self.native)
            .await?;
        QuerySnapshot::from_raw(raw, self.collection.handle())
    }

    /// Listens to the query result. Listener errors are logged.
    pub async fn on_snapshot<F>(&self, on_next: F) -> DocMapResult<Subscription>
    where
        F: FnMut(QuerySnapshot<T>) + Send + 'static,
    {
        self.listen(on_next, SnapshotSink::new(None)).await
    }

    /// Listens to the query result, sending store and deserialization errors to `on_error`.
    pub async fn on_snapshot_with_error<F, E>(&self, on_next: F, on_error: E) -> DocMapResult<Subscription>
    where
        F: FnMut(QuerySnapshot<T>) + Send + 'static,
        E: FnMut(DocMapError) + Send + 'static,
    {
        self.listen(on_next, SnapshotSink::new(Some(Box::new(on_error))))
            .await
    }

    async fn listen<F>(&self, mut on_next: F, sink: SnapshotSink) -> DocMapResult<Subscription>
    where
        F: FnMut(QuerySnapshot<T>) + Send + 'static,
    {
        let collection = self.collection.handle().clone();
        let errors = sink.clone();
        let listener: QueryListener = Box::new(move |raw: RawQuerySnapshot| {
            match QuerySnapshot::from_raw(raw, &collection) {
                Ok(snapshot) => on_next(snapshot),
                Err(err) => errors.report(err),
            }
        });

        self.collection
            .handle()
            .connection()
            .backend()
            .listen_query(&self.native, listener, Some(sink.listener()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::FieldConversion,
        entity::{EntityBase, Model, ModelBinding},
        field::{FieldConfig, FieldValue, MapConfig},
        path::CollectionPath,
        query::{Cursor, OrderBy},
        registry::{CollectionConfig, Registry, Schema},
    };

    #[derive(Debug, Clone, Default)]
    struct Profile {
        last_seen: Option<String>,
    }

    impl Model for Profile {
        fn model_name() -> &'static str {
            "Profile"
        }

        fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
            schema.field("lastSeen", FieldConfig::default())?;
            Ok(())
        }

        fn read(&self, _: &str) -> FieldValue {
            self.last_seen.clone().into()
        }

        fn write(&mut self, _: &str, value: FieldValue) {
            self.last_seen = value.cast();
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Member {
        base: EntityBase,
        display_name: Option<String>,
        profile: Option<Profile>,
    }

    impl Model for Member {
        fn model_name() -> &'static str {
            "Member"
        }

        fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
            schema.root_collection(CollectionConfig::named("members"));
            schema
                .field("displayName", FieldConfig::default())?
                .map("profile", MapConfig::of::<Profile>())?;
            Ok(())
        }

        fn read(&self, property: &str) -> FieldValue {
            match property {
                "displayName" => self.display_name.clone().into(),
                "profile" => self.profile.clone().map(FieldValue::model).unwrap_or_default(),
                _ => FieldValue::Null,
            }
        }

        fn write(&mut self, property: &str, value: FieldValue) {
            match property {
                "displayName" => self.display_name = value.cast(),
                "profile" => self.profile = value.into_model(),
                _ => {}
            }
        }
    }

    impl Entity for Member {
        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EntityBase {
            &mut self.base
        }
    }

    fn repository() -> Arc<Repository> {
        let registry = Registry::new();
        registry
            .describe(ModelBinding::of::<Member>(), FieldConversion::ToSnakeCase)
            .unwrap();
        registry.get("Member").unwrap()
    }

    fn base() -> NativeQuery {
        NativeQuery::new(CollectionPath::root("members"))
    }

    #[test]
    fn resolves_properties_to_store_names() {
        let repository = repository();
        assert_eq!(
            resolve_property(&repository, &"displayName".into(), "/members").unwrap(),
            "display_name"
        );
        assert_eq!(
            resolve_property(&repository, &"profile.lastSeen".into(), "/members").unwrap(),
            "profile.last_seen"
        );
        assert_eq!(
            resolve_property(&repository, &["profile", "lastSeen"].into(), "/members").unwrap(),
            "profile.last_seen"
        );
    }

    #[test]
    fn unknown_properties_fail() {
        let repository = repository();
        let err = resolve_property(&repository, &"nonexistentProp".into(), "/members").unwrap_err();
        assert_eq!(err.to_string(), "Could not find property nonexistentProp in /members");

        assert!(resolve_property(&repository, &"displayName.first".into(), "/members").is_err());

        let criteria = QueryCriteria::new().where_("nope", FieldOp::Eq, "x");
        assert!(matches!(
            translate(&repository, base(), criteria),
            Err(DocMapError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn translates_filters_orderings_and_limit() {
        let criteria = QueryCriteria::new()
            .where_("displayName", FieldOp::Eq, "Ann")
            .order_by("displayName", None)
            .order_by("profile.lastSeen", Some(Direction::Desc))
            .limit(5);
        let query = translate(&repository(), base(), criteria).unwrap();

        assert_eq!(
            query.filter,
            Some(Expr::field("display_name".to_string(), FieldOp::Eq, Value::from("Ann")))
        );
        assert_eq!(
            query.order_by,
            vec![
                OrderBy { field: "display_name".to_string(), direction: Direction::Asc },
                OrderBy { field: "profile.last_seen".to_string(), direction: Direction::Desc },
            ]
        );
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn inclusive_cursors_win() {
        let criteria = QueryCriteria::new()
            .order_by("displayName", None)
            .start_at(vec!["a".into()])
            .start_after(vec!["b".into()])
            .end_at(vec!["y".into()])
            .end_before(vec!["z".into()]);
        let query = translate(&repository(), base(), criteria).unwrap();

        assert_eq!(query.start, Some(Cursor { values: vec!["a".into()], inclusive: true }));
        assert_eq!(query.end, Some(Cursor { values: vec!["y".into()], inclusive: true }));

        let criteria = QueryCriteria::new()
            .order_by("displayName", None)
            .start_after(vec!["b".into()])
            .end_before(vec!["z".into()]);
        let query = translate(&repository(), base(), criteria).unwrap();
        assert_eq!(query.start, Some(Cursor { values: vec!["b".into()], inclusive: false }));
        assert_eq!(query.end, Some(Cursor { values: vec!["z".into()], inclusive: false }));
    }

    #[test]
    fn cursors_without_ordering_are_dropped() {
        let criteria = QueryCriteria::new().start_at(vec!["a".into()]).limit(1);
        let query = translate(&repository(), base(), criteria).unwrap();
        assert!(query.start.is_none());
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn list_operators_require_arrays() {
        let criteria = QueryCriteria::new().where_("displayName", FieldOp::In, "Ann");
        assert!(matches!(
            translate(&repository(), base(), criteria),
            Err(DocMapError::InvalidQuery(_))
        ));
    }
}
