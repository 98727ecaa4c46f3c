//! Shared entities and helpers for the integration tests

#![allow(dead_code)]

use repokit::{Entity, EntitySchema, FieldSchema, MemoryStore, Navigation, RepositoryContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Entity for Author {
    fn schema() -> EntitySchema {
        EntitySchema::for_type::<Self>().navigation(Navigation::collection::<Book>("books"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub year: i64,
    pub price: f64,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Entity for Book {
    fn schema() -> EntitySchema {
        EntitySchema::for_type::<Self>()
            .table("Books")
            .navigation(Navigation::reference::<Author>("author"))
            .navigation(Navigation::collection::<Review>("reviews"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: i64,
    pub book_id: i64,
    pub stars: i64,
    pub note: Option<String>,
}

impl Entity for Review {
    fn schema() -> EntitySchema {
        EntitySchema::for_type::<Self>().field(FieldSchema::new("note").column("comment"))
    }
}

/// Entity with audit fields stamped by `AuditInterceptor`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub modified_by: Option<String>,
}

impl Entity for Note {}

pub fn author(name: &str, country: &str) -> Author {
    Author {
        name: name.to_string(),
        country: country.to_string(),
        ..Default::default()
    }
}

pub fn book(title: &str, author_id: i64, year: i64, price: f64) -> Book {
    Book {
        title: title.to_string(),
        author_id,
        year,
        price,
        ..Default::default()
    }
}

pub fn review(book_id: i64, stars: i64, note: Option<&str>) -> Review {
    Review {
        book_id,
        stars,
        note: note.map(str::to_string),
        ..Default::default()
    }
}

/// Name of a database no other test uses
pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

pub fn memory_context(prefix: &str) -> Arc<RepositoryContext> {
    Arc::new(RepositoryContext::new(Arc::new(MemoryStore::new(&unique_name(prefix)))))
}
