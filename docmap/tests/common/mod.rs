#![allow(dead_code)]

use docmap::{
    backend::StoreBackend,
    memory::InMemoryStore,
    prelude::*,
    value::ValueMap,
};

#[derive(Debug, Clone, Default)]
pub struct Post {
    pub base: EntityBase,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<DocumentRef<Author>>,
    pub comments: Option<Collection<Comment>>,
    pub posted: Option<Timestamp>,
}

impl Model for Post {
    fn model_name() -> &'static str {
        "Post"
    }

    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
        schema.root_collection(CollectionConfig::named("posts"));
        schema
            .field("title", FieldConfig::default())?
            .field("body", FieldConfig::default())?
            .document_ref::<Author>("author", FieldConfig::default())?
            .sub_collection::<Comment>("comments", CollectionConfig::default())?
            .timestamp("posted", TimestampConfig::default().update_on_create(true))?;
        Ok(())
    }

    fn read(&self, property: &str) -> FieldValue {
        match property {
            "title" => self.title.clone().into(),
            "body" => self.body.clone().into(),
            "author" => self.author.clone().into(),
            "posted" => self.posted.into(),
            _ => FieldValue::Null,
        }
    }

    fn write(&mut self, property: &str, value: FieldValue) {
        match property {
            "title" => self.title = value.cast(),
            "body" => self.body = value.cast(),
            "author" => self.author = value.cast(),
            "comments" => self.comments = value.cast(),
            "posted" => self.posted = value.cast(),
            _ => {}
        }
    }
}

impl Entity for Post {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorPreferences {
    pub receive_push_notifications: Option<bool>,
    pub last_sign_in: Option<Timestamp>,
}

impl Model for AuthorPreferences {
    fn model_name() -> &'static str {
        "AuthorPreferences"
    }

    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
        schema
            .field(
                "receivePushNotifications",
                FieldConfig::named("receive_push_notifications"),
            )?
            .timestamp("lastSignIn", TimestampConfig::named("last_sign_in"))?;
        Ok(())
    }

    fn read(&self, property: &str) -> FieldValue {
        match property {
            "receivePushNotifications" => self.receive_push_notifications.into(),
            "lastSignIn" => self.last_sign_in.into(),
            _ => FieldValue::Null,
        }
    }

    fn write(&mut self, property: &str, value: FieldValue) {
        match property {
            "receivePushNotifications" => self.receive_push_notifications = value.cast(),
            "lastSignIn" => self.last_sign_in = value.cast(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Author {
    pub base: EntityBase,
    pub name: Option<String>,
    pub metadata: Option<AuthorPreferences>,
    pub favorited_comments: Vec<DocumentRef<Comment>>,
    pub location: Option<GeoPoint>,
    pub previous_locations: Vec<GeoPoint>,
}

impl Model for Author {
    fn model_name() -> &'static str {
        "Author"
    }

    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
        schema.root_collection(CollectionConfig::named("authors"));
        schema
            .field("name", FieldConfig::default())?
            .map("metadata", MapConfig::of::<AuthorPreferences>())?
            .document_ref::<Comment>("favoritedComments", FieldConfig::named("favorited_comments"))?
            .geo_point("location", FieldConfig::default())?
            .geo_point("previousLocations", FieldConfig::named("previous_locations"))?;
        Ok(())
    }

    fn read(&self, property: &str) -> FieldValue {
        match property {
            "name" => self.name.clone().into(),
            "metadata" => self
                .metadata
                .clone()
                .map(FieldValue::model)
                .unwrap_or_default(),
            "favoritedComments" => self.favorited_comments.clone().into(),
            "location" => self.location.into(),
            "previousLocations" => self.previous_locations.clone().into(),
            _ => FieldValue::Null,
        }
    }

    fn write(&mut self, property: &str, value: FieldValue) {
        match property {
            "name" => self.name = value.cast(),
            "metadata" => self.metadata = value.into_model(),
            "favoritedComments" => self.favorited_comments = value.cast().unwrap_or_default(),
            "location" => self.location = value.cast(),
            "previousLocations" => self.previous_locations = value.cast().unwrap_or_default(),
            _ => {}
        }
    }
}

impl Entity for Author {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct Comment {
    pub base: EntityBase,
    pub content: Option<String>,
    pub by: Option<String>,
    pub replies: Option<Collection<Reply>>,
}

impl Model for Comment {
    fn model_name() -> &'static str {
        "Comment"
    }

    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
        schema
            .field("content", FieldConfig::default())?
            .field("by", FieldConfig::default())?
            .sub_collection::<Reply>("replies", CollectionConfig::default())?;
        Ok(())
    }

    fn read(&self, property: &str) -> FieldValue {
        match property {
            "content" => self.content.clone().into(),
            "by" => self.by.clone().into(),
            _ => FieldValue::Null,
        }
    }

    fn write(&mut self, property: &str, value: FieldValue) {
        match property {
            "content" => self.content = value.cast(),
            "by" => self.by = value.cast(),
            "replies" => self.replies = value.cast(),
            _ => {}
        }
    }
}

impl Entity for Comment {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub base: EntityBase,
    pub content: Option<String>,
    pub by: Option<String>,
}

impl Model for Reply {
    fn model_name() -> &'static str {
        "Reply"
    }

    fn describe(schema: &mut Schema<'_>) -> DocMapResult<()> {
        schema
            .field("content", FieldConfig::default())?
            .field("by", FieldConfig::default())?;
        Ok(())
    }

    fn read(&self, property: &str) -> FieldValue {
        match property {
            "content" => self.content.clone().into(),
            "by" => self.by.clone().into(),
            _ => FieldValue::Null,
        }
    }

    fn write(&mut self, property: &str, value: FieldValue) {
        match property {
            "content" => self.content = value.cast(),
            "by" => self.by = value.cast(),
            _ => {}
        }
    }
}

impl Entity for Reply {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

pub const JOHN_DOE: &str = "authors/john-doe";
pub const HELLO_WORLD: &str = "posts/hello-world";
pub const HELLO_WORLD_1: &str = "posts/hello-world-1";
pub const FIRST_COMMENT: &str = "posts/hello-world/comments/first-comment";
pub const FIRST_REPLY: &str = "posts/hello-world/comments/first-comment/replies/first-reply";

pub fn path(path: &str) -> DocumentPath {
    DocumentPath::parse(path).unwrap()
}

pub fn data(pairs: Vec<(&str, Value)>) -> ValueMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Writes the shared fixture documents straight into the store.
pub async fn seed(store: &InMemoryStore) {
    let documents = vec![
        (
            JOHN_DOE,
            data(vec![
                ("name", Value::from("John Doe")),
                (
                    "metadata",
                    Value::Map(data(vec![
                        ("receive_push_notifications", Value::from(true)),
                        ("last_sign_in", Value::from(Timestamp::new(1_600_000_000, 0))),
                    ])),
                ),
                ("favorited_comments", Value::Array(vec![Value::from(path(FIRST_COMMENT))])),
                ("location", Value::from(GeoPoint::new(48.8566, 2.3522))),
                (
                    "previous_locations",
                    Value::Array(vec![
                        Value::from(GeoPoint::new(51.5074, -0.1278)),
                        Value::from(GeoPoint::new(40.7128, -74.006)),
                    ]),
                ),
            ]),
        ),
        (
            HELLO_WORLD,
            data(vec![
                ("title", Value::from("Hello World!")),
                ("body", Value::from("The first post.")),
                ("author", Value::from(path(JOHN_DOE))),
                ("posted", Value::from(Timestamp::new(1_600_000_100, 0))),
            ]),
        ),
        (
            HELLO_WORLD_1,
            data(vec![
                ("title", Value::from("Hello World 1")),
                ("body", Value::from("The second post.")),
                ("posted", Value::from(Timestamp::new(1_600_000_200, 0))),
            ]),
        ),
        (
            FIRST_COMMENT,
            data(vec![
                ("content", Value::from("Nice post")),
                ("by", Value::from("Jane")),
            ]),
        ),
        (
            FIRST_REPLY,
            data(vec![
                ("content", Value::from("Thanks")),
                ("by", Value::from("John")),
            ]),
        ),
    ];

    for (location, body) in documents {
        store.set_document(&path(location), body).await.unwrap();
    }
}

/// A connected, seeded instance with no conversion policy.
pub async fn setup() -> (DocMap, InMemoryStore) {
    setup_with(None).await
}

pub async fn setup_with(config: Option<DocMapConfig>) -> (DocMap, InMemoryStore) {
    let store = InMemoryStore::builder().build().await.unwrap();
    seed(&store).await;

    let docmap = DocMap::new();
    docmap.initialize(store.clone(), config);
    (docmap, store)
}
