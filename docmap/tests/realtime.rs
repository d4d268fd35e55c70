mod common;

use common::*;
use docmap::{backend::StoreBackend, prelude::*};
use parking_lot::Mutex;
use std::sync::Arc;

type Seen<T> = Arc<Mutex<Vec<T>>>;

fn seen<T>() -> Seen<T> {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn document_listeners_follow_writes_until_unsubscribed() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();
    let titles = seen();
    let sink = titles.clone();

    let subscription = posts
        .doc("hello-world")
        .on_snapshot(move |snapshot: DocumentSnapshot<Post>| {
            sink.lock()
                .push(snapshot.doc().and_then(|post| post.title.clone()));
        })
        .await
        .unwrap();

    posts
        .update(&Post {
            base: EntityBase::with_id("hello-world"),
            title: Some("Changed".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    posts.remove("hello-world").await.unwrap();

    subscription.unsubscribe();
    posts
        .create(&Post {
            base: EntityBase::with_id("hello-world"),
            title: Some("Back".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        *titles.lock(),
        vec![Some("Hello World!".to_string()), Some("Changed".to_string()), None]
    );
}

#[tokio::test]
async fn document_snapshots_report_missing_documents() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();
    let states = seen();
    let sink = states.clone();

    let _subscription = posts
        .doc("upcoming")
        .on_snapshot(move |snapshot: DocumentSnapshot<Post>| {
            sink.lock().push((snapshot.exists(), snapshot.reference().id().to_string()));
        })
        .await
        .unwrap();

    posts
        .create(&Post {
            base: EntityBase::with_id("upcoming"),
            title: Some("Soon".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        *states.lock(),
        vec![(false, "upcoming".to_string()), (true, "upcoming".to_string())]
    );
}

#[tokio::test]
async fn query_listeners_receive_document_changes() {
    let (docmap, _) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();
    let changes = seen();
    let sink = changes.clone();

    let subscription = posts
        .query()
        .order_by("title", None)
        .unwrap()
        .on_snapshot(move |snapshot: QuerySnapshot<Post>| {
            let list = snapshot
                .doc_changes()
                .iter()
                .map(|change| {
                    (
                        change.kind,
                        change.doc.id().unwrap_or_default().to_string(),
                        change.old_index,
                        change.new_index,
                    )
                })
                .collect::<Vec<_>>();
            sink.lock().push((snapshot.size(), list));
        })
        .await
        .unwrap();

    posts
        .create(&Post {
            base: EntityBase::with_id("zed"),
            title: Some("Zed".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    posts.remove("hello-world-1").await.unwrap();
    subscription.unsubscribe();
    posts.remove("zed").await.unwrap();

    let changes = changes.lock();
    assert_eq!(changes.len(), 3);

    let (size, initial) = &changes[0];
    assert_eq!(*size, 2);
    assert!(initial.iter().all(|(kind, ..)| *kind == ChangeKind::Added));

    assert_eq!(
        changes[1],
        (3, vec![(ChangeKind::Added, "zed".to_string(), None, Some(2))])
    );

    let (size, removal) = &changes[2];
    assert_eq!(*size, 2);
    assert_eq!(
        removal[0],
        (ChangeKind::Removed, "hello-world-1".to_string(), Some(0), None)
    );
}

#[tokio::test]
async fn undecodable_documents_go_to_the_error_callback() {
    let (docmap, store) = setup().await;
    let posts = docmap.collection::<Post>().unwrap();
    let errors = seen();
    let error_sink = errors.clone();
    let sizes = seen();
    let size_sink = sizes.clone();

    let _subscription = posts
        .query()
        .on_snapshot_with_error(
            move |snapshot: QuerySnapshot<Post>| size_sink.lock().push(snapshot.size()),
            move |err: DocMapError| error_sink.lock().push(err.to_string()),
        )
        .await
        .unwrap();

    store
        .set_document(
            &path("posts/broken"),
            data(vec![
                ("title", Value::from("Broken")),
                ("author", Value::from("not a reference")),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(*sizes.lock(), vec![2]);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Invalid document"));
}
