//! Repository behaviour over the flat-file stores

mod common;

use common::*;
use repokit::{FetchStrategy, FileFormat, ModelError, QueryOptions, RepositoryFactory, RepositoryOptions};
use std::path::Path;
use tempfile::TempDir;

fn factory(root: &Path, format: FileFormat) -> RepositoryFactory {
    RepositoryFactory::new(
        RepositoryOptions::builder()
            .use_file_database(root, format)
            .build(),
    )
    .unwrap()
}

async fn seed(factory: &RepositoryFactory) {
    let authors = factory.create::<Author, i64>().unwrap();
    authors
        .add_range(&[author("Herbert", "US"), author("Austen", "UK")])
        .await
        .unwrap();

    let books = factory.create::<Book, i64>().unwrap();
    books
        .add_range(&[
            book("Dune", 1, 1965, 9.5),
            book("Emma", 2, 1815, 4.0),
            book("Persuasion", 2, 1817, 5.0),
        ])
        .await
        .unwrap();

    let reviews = factory.create::<Review, i64>().unwrap();
    reviews
        .add_range(&[
            review(1, 5, Some("spice, \"must\" flow")),
            review(1, 4, None),
            review(2, 3, Some("witty")),
        ])
        .await
        .unwrap();
}

async fn assert_reopened(root: &Path, format: FileFormat) {
    // A fresh factory only sees what reached the files
    let reopened = factory(root, format);

    let books = reopened.create_read_only::<Book, i64>().unwrap();
    let all = books.find_all().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1], Book { id: 2, ..book("Emma", 2, 1815, 4.0) });

    let reviews = reopened.create_read_only::<Review, i64>().unwrap();
    let first = reviews.find(&1).await.unwrap().unwrap();
    assert_eq!(first.note.as_deref(), Some("spice, \"must\" flow"));
    assert_eq!(reviews.find(&2).await.unwrap().unwrap().note, None);

    let austen = reopened
        .create_read_only::<Author, i64>()
        .unwrap()
        .find_with_fetch(&2, &FetchStrategy::new().include("books"))
        .await
        .unwrap()
        .unwrap();
    let titles: Vec<_> = austen.books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Emma", "Persuasion"]);
}

async fn round_trip(format: FileFormat) -> TempDir {
    let dir = TempDir::new().unwrap();
    let factory = factory(dir.path(), format);
    seed(&factory).await;

    for table in ["Author", "Books", "Review"] {
        let file = dir.path().join(format!("{}.{}", table, format.extension()));
        assert!(file.exists(), "missing {}", file.display());
    }
    assert_reopened(dir.path(), format).await;
    dir
}

fn read(dir: &TempDir, table: &str, format: FileFormat) -> String {
    std::fs::read_to_string(dir.path().join(format!("{}.{}", table, format.extension()))).unwrap()
}

#[tokio::test]
async fn test_json_store_round_trip() {
    let dir = round_trip(FileFormat::Json).await;

    let text = read(&dir, "Books", FileFormat::Json);
    let rows: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(3));
    // Navigations are never written
    assert!(!text.contains("\"author\""));
    assert!(!text.contains("\"reviews\""));

    // Columns use their mapped names
    assert!(read(&dir, "Review", FileFormat::Json).contains("\"comment\""));
}

#[tokio::test]
async fn test_xml_store_round_trip() {
    let dir = round_trip(FileFormat::Xml).await;

    let text = read(&dir, "Books", FileFormat::Xml);
    assert!(text.contains("<ArrayOfBooks>"));
    assert!(text.contains("<title type=\"string\">Dune</title>"));
    let reviews = read(&dir, "Review", FileFormat::Xml);
    assert!(reviews.contains("<comment type=\"string\">spice, &quot;must&quot; flow</comment>"));
    assert!(reviews.contains("<comment type=\"null\"></comment>"));
}

#[tokio::test]
async fn test_csv_store_round_trip() {
    let dir = round_trip(FileFormat::Csv).await;

    let text = read(&dir, "Author", FileFormat::Csv);
    let header = text.lines().next().unwrap();
    assert_eq!(header, "id:number,name:string,country:string");
}

#[tokio::test]
async fn test_updates_and_deletes_are_persisted() {
    let dir = TempDir::new().unwrap();
    let factory = factory(dir.path(), FileFormat::Json);
    seed(&factory).await;

    let books = factory.create::<Book, i64>().unwrap();
    let mut dune = books.find(&1).await.unwrap().unwrap();
    dune.price = 12.0;
    books.update(&dune).await.unwrap();
    books.delete_by_key(&3).await.unwrap();

    let reopened = self::factory(dir.path(), FileFormat::Json);
    let books = reopened.create_read_only::<Book, i64>().unwrap();
    assert_eq!(books.count().await.unwrap(), 2);
    assert_eq!(books.find(&1).await.unwrap().map(|b| b.price), Some(12.0));
    assert!(!books.exists(&3).await.unwrap());
}

#[tokio::test]
async fn test_missing_files_read_as_empty() {
    let dir = TempDir::new().unwrap();
    let books = factory(&dir.path().join("not-yet"), FileFormat::Csv)
        .create_read_only::<Book, i64>()
        .unwrap();
    assert_eq!(books.count().await.unwrap(), 0);
    assert!(books.find_all_where(&QueryOptions::new().page(1)).await.unwrap().result.is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Books.json"), "{ not json").unwrap();

    let books = factory(dir.path(), FileFormat::Json)
        .create_read_only::<Book, i64>()
        .unwrap();
    assert!(matches!(books.count().await, Err(ModelError::Serialization(_))));
}

#[tokio::test]
async fn test_unit_of_work_needs_opt_in_for_files() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        factory(dir.path(), FileFormat::Xml).create_unit_of_work(),
        Err(ModelError::Unsupported(_))
    ));

    let lenient = RepositoryFactory::new(
        RepositoryOptions::builder()
            .use_xml_database(dir.path())
            .ignore_transaction_warning(true)
            .build(),
    )
    .unwrap();
    let uow = lenient.create_unit_of_work().unwrap();
    uow.create::<Author, i64>()
        .unwrap()
        .add(&author("Borges", "AR"))
        .await
        .unwrap();
    assert!(!dir.path().join("Author.xml").exists());
    assert_eq!(uow.commit().await.unwrap(), 1);
    assert!(dir.path().join("Author.xml").exists());
}
