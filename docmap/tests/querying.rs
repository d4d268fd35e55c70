mod common;

use common::*;
use docmap::prelude::*;

fn titles(posts: &[Post]) -> Vec<&str> {
    posts
        .iter()
        .filter_map(|post| post.title.as_deref())
        .collect()
}

#[tokio::test]
async fn find_by_title_returns_exactly_the_match() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let found = posts
        .find(Some(QueryCriteria::new().where_("title", FieldOp::Eq, "Hello World!")))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), Some("hello-world"));
}

#[tokio::test]
async fn find_without_criteria_returns_the_whole_collection() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let found = posts.find(None).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn unknown_properties_fail_before_querying() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let err = posts
        .find(Some(QueryCriteria::new().where_("nonexistentProp", FieldOp::Eq, "x")))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find property nonexistentProp in /posts"
    );

    let err = posts
        .query()
        .where_("nonexistentProp", FieldOp::Eq, "x")
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn chained_queries_order_and_limit() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let snapshot = posts
        .query()
        .order_by("title", Some(Direction::Desc))
        .unwrap()
        .limit(1)
        .get()
        .await
        .unwrap();

    assert_eq!(snapshot.size(), 1);
    assert!(!snapshot.empty());
    assert_eq!(titles(snapshot.docs()), vec!["Hello World!"]);
    assert_eq!(snapshot.doc_changes().len(), 1);
    assert_eq!(snapshot.doc_changes()[0].kind, ChangeKind::Added);
}

#[tokio::test]
async fn cursors_page_through_ordered_results() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let after = posts
        .find(Some(
            QueryCriteria::new()
                .order_by("title", None)
                .start_after(vec![Value::from("Hello World 1")]),
        ))
        .await
        .unwrap();
    assert_eq!(titles(&after), vec!["Hello World!"]);

    let before = posts
        .find(Some(
            QueryCriteria::new()
                .order_by("title", None)
                .end_before(vec![Value::from("Hello World!")]),
        ))
        .await
        .unwrap();
    assert_eq!(titles(&before), vec!["Hello World 1"]);
}

#[tokio::test]
async fn at_cursors_win_over_after_and_before() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let found = posts
        .find(Some(
            QueryCriteria::new()
                .order_by("title", None)
                .start_at(vec![Value::from("Hello World 1")])
                .start_after(vec![Value::from("Hello World 1")])
                .end_at(vec![Value::from("Hello World!")])
                .end_before(vec![Value::from("Hello World!")]),
        ))
        .await
        .unwrap();

    assert_eq!(titles(&found), vec!["Hello World 1", "Hello World!"]);
}

#[tokio::test]
async fn cursors_without_ordering_are_ignored() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let found = posts
        .find(Some(QueryCriteria::new().start_after(vec![Value::from("zzz")])))
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn nested_map_properties_resolve_to_store_paths() {
    let (docmap, _) = setup().await;
    let authors = docmap.collection::<Author>().unwrap();

    let query = authors
        .query()
        .where_(["metadata", "receivePushNotifications"], FieldOp::Eq, true)
        .unwrap();
    assert_eq!(
        query.native().filter,
        Some(docmap::query::Filter::eq(
            "metadata.receive_push_notifications",
            true
        ))
    );

    let snapshot = query.get().await.unwrap();
    assert_eq!(snapshot.size(), 1);
    assert_eq!(snapshot.docs()[0].name.as_deref(), Some("John Doe"));

    let dotted = authors
        .find(Some(QueryCriteria::new().where_(
            "metadata.receivePushNotifications",
            FieldOp::Eq,
            false,
        )))
        .await
        .unwrap();
    assert!(dotted.is_empty());
}

#[tokio::test]
async fn list_operators_match_any_value() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let found = posts
        .query()
        .where_("title", FieldOp::In, vec!["Hello World 1", "Missing"])
        .unwrap()
        .get()
        .await
        .unwrap();
    assert_eq!(titles(found.docs()), vec!["Hello World 1"]);

    let err = posts
        .query()
        .where_("title", FieldOp::In, "Hello World 1")
        .unwrap_err();
    assert!(matches!(err, DocMapError::InvalidQuery(_)));
}

#[tokio::test]
async fn range_filters_combine() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();

    let snapshot = posts
        .query()
        .where_("posted", FieldOp::Gt, Timestamp::new(1_600_000_000, 0))
        .unwrap()
        .where_("posted", FieldOp::Lt, Timestamp::new(1_600_000_150, 0))
        .unwrap()
        .get()
        .await
        .unwrap();

    let ids = snapshot
        .iter()
        .filter_map(|post| post.id())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["hello-world"]);
}
