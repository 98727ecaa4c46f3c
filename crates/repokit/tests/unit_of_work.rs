//! Units of work spanning several repositories

mod common;

use common::*;
use repokit::{ModelError, QueryOptions, Repository, RepositoryFactory, RepositoryOptions, UnitOfWork};

fn factory() -> RepositoryFactory {
    RepositoryFactory::new(
        RepositoryOptions::builder()
            .use_in_memory_database(&unique_name("uow"))
            .ignore_transaction_warning(true)
            .build(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_commit_spans_repositories() {
    let factory = factory();
    let uow = factory.create_unit_of_work().unwrap();

    let authors = uow.create::<Author, i64>().unwrap();
    let books = uow.create::<Book, i64>().unwrap();
    assert!(!authors.is_auto_commit());

    let herbert = authors.add(&author("Herbert", "US")).await.unwrap();
    let austen = authors.add(&author("Austen", "UK")).await.unwrap();
    assert_eq!((herbert.id, austen.id), (1, 2));

    books
        .add_range(&[book("Dune", herbert.id, 1965, 9.5), book("Emma", austen.id, 1815, 4.0)])
        .await
        .unwrap();

    // Staged work is not visible before the commit
    let outside = factory.create_read_only::<Book, i64>().unwrap();
    assert_eq!(outside.count().await.unwrap(), 0);
    assert!(uow.has_changes());

    assert_eq!(uow.commit().await.unwrap(), 4);
    assert_eq!(outside.count().await.unwrap(), 2);
    assert_eq!(factory.create_read_only::<Author, i64>().unwrap().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rollback_and_drop_discard() {
    let factory = factory();

    let uow = factory.create_unit_of_work().unwrap();
    uow.create::<Author, i64>()
        .unwrap()
        .add(&author("Herbert", "US"))
        .await
        .unwrap();
    uow.rollback().unwrap();

    {
        let dropped = factory.create_unit_of_work().unwrap();
        dropped
            .create::<Author, i64>()
            .unwrap()
            .add(&author("Austen", "UK"))
            .await
            .unwrap();
    }

    assert_eq!(factory.create_read_only::<Author, i64>().unwrap().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_commit_persists_nothing() {
    let factory = factory();
    let seeded = factory.create::<Author, i64>().unwrap();
    seeded.add(&author("Herbert", "US")).await.unwrap();

    let uow = factory.create_unit_of_work().unwrap();
    uow.create::<Book, i64>()
        .unwrap()
        .add(&book("Dune", 1, 1965, 9.5))
        .await
        .unwrap();
    uow.create::<Author, i64>()
        .unwrap()
        .add(&Author {
            id: 1,
            ..author("Impostor", "US")
        })
        .await
        .unwrap();

    assert!(matches!(uow.commit().await, Err(ModelError::DuplicateKey { .. })));
    assert_eq!(factory.create_read_only::<Book, i64>().unwrap().count().await.unwrap(), 0);
    assert_eq!(
        seeded.find(&1).await.unwrap().map(|a| a.name),
        Some("Herbert".to_string())
    );
}

#[tokio::test]
async fn test_updates_and_deletes_in_one_commit() {
    let factory = factory();
    let seeded = factory.create::<Book, i64>().unwrap();
    seeded
        .add_range(&[book("Dune", 1, 1965, 9.5), book("Emma", 2, 1815, 4.0), book("Ubik", 3, 1969, 7.0)])
        .await
        .unwrap();

    let uow = factory.create_unit_of_work().unwrap();
    let books = uow.create::<Book, i64>().unwrap();
    let mut dune = books.find(&1).await.unwrap().unwrap();
    dune.price = 11.0;
    books.update(&dune).await.unwrap();
    let removed = books
        .delete_where(&QueryOptions::new().where_lt("year", 1900))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(uow.commit().await.unwrap(), 2);

    let prices: Vec<_> = seeded.find_all().await.unwrap().into_iter().map(|b| (b.id, b.price)).collect();
    assert_eq!(prices, vec![(1, 11.0), (3, 7.0)]);
}

#[tokio::test]
async fn test_one_transaction_per_context() {
    let factory = factory();
    let context = factory.create_context().unwrap();

    let uow = UnitOfWork::new(context.clone()).unwrap();
    assert!(context.in_transaction());
    assert!(matches!(
        UnitOfWork::new(context.clone()),
        Err(ModelError::Transaction(_))
    ));

    uow.rollback().unwrap();
    assert!(!context.in_transaction());
    let again = UnitOfWork::new(context.clone()).unwrap();

    // Repositories over the same context can be made outside the unit of work too
    let direct = Repository::<Author, i64>::with_auto_commit(context, false).unwrap();
    direct.add(&author("Dick", "US")).await.unwrap();
    assert!(again.has_changes());
    assert_eq!(again.commit().await.unwrap(), 1);
}
