//! Eager loading of navigations

mod common;

use common::*;
use repokit::{FetchStrategy, ModelError, QueryOptions, Repository, RepositoryContext};
use std::sync::Arc;

async fn library() -> Arc<RepositoryContext> {
    let context = memory_context("fetch");

    Repository::<Author, i64>::new(context.clone())
        .unwrap()
        .add_range(&[author("Herbert", "US"), author("Austen", "UK"), author("Nobody", "NZ")])
        .await
        .unwrap();
    Repository::<Book, i64>::new(context.clone())
        .unwrap()
        .add_range(&[
            book("Dune", 1, 1965, 9.5),
            book("Emma", 2, 1815, 4.0),
            book("Children of Dune", 1, 1976, 8.0),
        ])
        .await
        .unwrap();
    Repository::<Review, i64>::new(context.clone())
        .unwrap()
        .add_range(&[review(1, 5, Some("classic")), review(3, 3, None), review(1, 4, None)])
        .await
        .unwrap();

    context
}

#[tokio::test]
async fn test_reference_navigation() {
    let books = Repository::<Book, i64>::new(library().await).unwrap();

    let dune = books
        .find_with_fetch(&1, &FetchStrategy::new().include("author"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dune.author.as_ref().map(|a| a.name.as_str()), Some("Herbert"));

    // Without a fetch strategy the navigation keeps its default
    assert!(books.find(&1).await.unwrap().unwrap().author.is_none());
}

#[tokio::test]
async fn test_dangling_reference_is_empty() {
    let context = library().await;
    let books = Repository::<Book, i64>::new(context).unwrap();
    let orphan = books.add(&book("Orphan", 42, 2001, 1.0)).await.unwrap();

    let found = books
        .find_with_fetch(&orphan.id, &FetchStrategy::new().include("author"))
        .await
        .unwrap()
        .unwrap();
    assert!(found.author.is_none());
}

#[tokio::test]
async fn test_collection_navigation() {
    let authors = Repository::<Author, i64>::new(library().await).unwrap();

    let page = authors
        .find_all_where(&QueryOptions::new().fetch("books").order_by("id"))
        .await
        .unwrap();
    let counts: Vec<_> = page.result.iter().map(|a| a.books.len()).collect();
    assert_eq!(counts, vec![2, 1, 0]);
    assert_eq!(page.result[0].books[1].title, "Children of Dune");
}

#[tokio::test]
async fn test_nested_paths() {
    let authors = Repository::<Author, i64>::new(library().await).unwrap();

    let herbert = authors
        .find_with_fetch(&1, &FetchStrategy::new().include("books.reviews"))
        .await
        .unwrap()
        .unwrap();
    let stars: Vec<Vec<i64>> = herbert
        .books
        .iter()
        .map(|b| b.reviews.iter().map(|r| r.stars).collect())
        .collect();
    assert_eq!(stars, vec![vec![5, 4], vec![3]]);
    assert_eq!(herbert.books[0].reviews[0].note.as_deref(), Some("classic"));
}

#[tokio::test]
async fn test_filter_and_sort_through_fetched_navigation() {
    let books = Repository::<Book, i64>::new(library().await).unwrap();

    let from_us = books
        .find_all_where(
            &QueryOptions::new()
                .fetch("author")
                .where_eq("author.country", "US")
                .order_by_desc("year"),
        )
        .await
        .unwrap();
    let titles: Vec<_> = from_us.result.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Children of Dune", "Dune"]);

    let by_author = books
        .find_all_where(&QueryOptions::new().fetch("author").order_by("author.name").order_by("id"))
        .await
        .unwrap();
    assert_eq!(by_author.result[0].title, "Emma");
}

#[tokio::test]
async fn test_invalid_paths() {
    let books = Repository::<Book, i64>::new(library().await).unwrap();

    // Navigation paths need the navigation to be fetched
    assert!(matches!(
        books
            .count_where(&QueryOptions::new().where_eq("author.country", "US"))
            .await,
        Err(ModelError::Query(_))
    ));
    assert!(matches!(
        books
            .find_all_where(&QueryOptions::new().fetch("publisher"))
            .await,
        Err(ModelError::Query(_))
    ));
}
