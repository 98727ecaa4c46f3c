//! Query execution
//!
//! Pipeline: load set, resolve fetch paths, deserialize, filter, count, sort,
//! page. Results of queries with a fingerprint go through the query cache.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use super::RepositoryContext;
use crate::conventions::{metadata_of, EntityMetadata};
use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::query::{
    compare_values, lookup_path, FetchStrategy, OrderDirection, PagedQueryResult, QueryOptions,
    SortKey,
};

/// Sets whose rows end up in a result through the fetch paths, sorted
fn fetched_tables(metadata: &Arc<EntityMetadata>, paths: &[String]) -> ModelResult<Vec<String>> {
    let mut tables = Vec::new();
    for path in paths {
        let mut owner = Arc::clone(metadata);
        for segment in path.split('.') {
            let Some(navigation) = owner.navigation(segment) else {
                break;
            };
            let target = navigation.target()?;
            if !tables.contains(&target.table_name) {
                tables.push(target.table_name.clone());
            }
            owner = target;
        }
    }
    tables.sort();
    Ok(tables)
}

impl RepositoryContext {
    /// Matching entities after sorting and paging, with the unpaged total
    pub async fn find_all<T: Entity>(
        &self,
        options: &QueryOptions<T>,
    ) -> ModelResult<PagedQueryResult<Vec<T>>> {
        self.cached("find_all", options, || async {
            let (entities, total) = self.select(options, true).await?;
            Ok(PagedQueryResult::new(entities, total))
        })
        .await
    }

    /// First match in query order
    pub async fn find<T: Entity>(&self, options: &QueryOptions<T>) -> ModelResult<Option<T>> {
        self.cached("find", options, || async {
            let (entities, _) = self.select(options, true).await?;
            Ok(entities.into_iter().next())
        })
        .await
    }

    /// Entity whose primary key equals `key`, in key order
    pub async fn find_by_key<T: Entity>(
        &self,
        key: &[Value],
        fetch: &FetchStrategy<T>,
    ) -> ModelResult<Option<T>> {
        let metadata = metadata_of::<T>()?;
        if key.len() != metadata.primary_keys.len() {
            return Err(ModelError::KeyArity {
                entity: metadata.type_name.clone(),
                expected: metadata.primary_keys.len(),
                actual: key.len(),
            });
        }

        let options = metadata
            .primary_keys
            .iter()
            .zip(key)
            .fold(QueryOptions::new(), |options, (field, value)| {
                options.where_eq(field, value.clone())
            })
            .with_fetch_strategy(fetch.clone());
        self.find(&options).await
    }

    /// Number of matches; paging is ignored
    pub async fn count<T: Entity>(&self, options: &QueryOptions<T>) -> ModelResult<usize> {
        self.cached("count", options, || async {
            let (_, total) = self.select(options, false).await?;
            Ok(total)
        })
        .await
    }

    pub async fn exists<T: Entity>(&self, options: &QueryOptions<T>) -> ModelResult<bool> {
        Ok(self.count(options).await? > 0)
    }

    /// `find_all` projected through `selector`
    pub async fn find_all_as<T, R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        T: Entity,
        F: Fn(&T) -> R,
    {
        let page = self.find_all(options).await?;
        Ok(page.map(|entities| entities.iter().map(selector).collect()))
    }

    /// Page of matches keyed by `key_fn`; two entities with the same key are an error
    pub async fn to_dictionary<T, K, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        value_fn: VF,
    ) -> ModelResult<PagedQueryResult<HashMap<K, V>>>
    where
        T: Entity,
        K: Eq + Hash + std::fmt::Debug,
        KF: Fn(&T) -> K,
        VF: Fn(&T) -> V,
    {
        let page = self.find_all(options).await?;
        let mut dictionary = HashMap::with_capacity(page.result.len());
        for entity in &page.result {
            let key = key_fn(entity);
            if dictionary.contains_key(&key) {
                return Err(ModelError::Query(format!(
                    "duplicate dictionary key {:?} in '{}'",
                    key,
                    metadata_of::<T>()?.type_name
                )));
            }
            let value = value_fn(entity);
            dictionary.insert(key, value);
        }
        Ok(PagedQueryResult::new(dictionary, page.total))
    }

    /// Page of matches grouped by `key_fn`, groups in order of first
    /// appearance. `total` counts entities, not groups.
    pub async fn group_by<T, K, R, KF, RF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        result_fn: RF,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        T: Entity,
        K: PartialEq,
        KF: Fn(&T) -> K,
        RF: Fn(&K, &[T]) -> R,
    {
        let page = self.find_all(options).await?;
        let mut groups: Vec<(K, Vec<T>)> = Vec::new();
        for entity in page.result {
            let key = key_fn(&entity);
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(entity),
                None => groups.push((key, vec![entity])),
            }
        }
        let results = groups.iter().map(|(key, members)| result_fn(key, members)).collect();
        Ok(PagedQueryResult::new(results, page.total))
    }

    /// Raw SQL needs a relational store
    pub async fn execute_sql<T: Entity>(
        &self,
        sql: &str,
        _parameters: &[Value],
    ) -> ModelResult<Vec<T>> {
        Err(ModelError::Unsupported(format!(
            "SQL queries are not supported by store '{}': {}",
            self.store.describe(),
            sql
        )))
    }

    async fn cached<T, R, F, Fut>(
        &self,
        kind: &str,
        options: &QueryOptions<T>,
        compute: F,
    ) -> ModelResult<R>
    where
        T: Entity,
        R: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ModelResult<R>>,
    {
        let (Some(cache), Some(fingerprint)) = (&self.cache, options.fingerprint()) else {
            return compute().await;
        };

        let metadata = metadata_of::<T>()?;
        let fetched = fetched_tables(&metadata, options.fetch_strategy().paths())?;
        let table = &metadata.table_name;
        if let Some(hit) = cache.get::<R>(table, &fetched, kind, &fingerprint).await? {
            return Ok(hit);
        }
        let value = compute().await?;
        cache.put(table, &fetched, kind, &fingerprint, &value).await?;
        Ok(value)
    }

    /// Run the pipeline; `paged` applies sorting and paging
    pub(crate) async fn select<T: Entity>(
        &self,
        options: &QueryOptions<T>,
        paged: bool,
    ) -> ModelResult<(Vec<T>, usize)> {
        let metadata = metadata_of::<T>()?;
        options.validate(&metadata)?;

        let rows = self.store.load(&metadata).await?;
        let mut records: Vec<Value> = rows.iter().map(|row| metadata.from_storage(row)).collect();
        self.resolve_fetch(&metadata, &mut records, options.fetch_strategy().paths())
            .await?;

        let mut matches: Vec<(T, Value)> = Vec::with_capacity(records.len());
        for record in records {
            let entity: T = serde_json::from_value(record.clone())?;
            let keep = options
                .specification()
                .map(|spec| spec.is_satisfied_by(&entity, &record))
                .unwrap_or(true);
            if keep {
                matches.push((entity, record));
            }
        }
        let total = matches.len();

        tracing::debug!(
            context = %self.id,
            entity = %metadata.type_name,
            loaded = rows.len(),
            matched = total,
            "executed query"
        );

        if !paged {
            return Ok((matches.into_iter().map(|(entity, _)| entity).collect(), total));
        }

        let sorting: Vec<SortKey> = match (options.sorting(), options.paging()) {
            ([], Some(_)) => metadata
                .primary_keys
                .iter()
                .map(|key| SortKey {
                    path: key.clone(),
                    direction: OrderDirection::Asc,
                })
                .collect(),
            (keys, _) => keys.to_vec(),
        };
        if !sorting.is_empty() {
            matches.sort_by(|(_, a), (_, b)| compare_records(a, b, &sorting));
        }

        let entities = match options.paging() {
            Some(paging) => matches
                .into_iter()
                .skip(paging.skip())
                .take(paging.size)
                .map(|(entity, _)| entity)
                .collect(),
            None => matches.into_iter().map(|(entity, _)| entity).collect(),
        };
        Ok((entities, total))
    }
}

fn compare_records(a: &Value, b: &Value, sorting: &[SortKey]) -> Ordering {
    for key in sorting {
        let left = lookup_path(a, &key.path).unwrap_or(&Value::Null);
        let right = lookup_path(b, &key.path).unwrap_or(&Value::Null);
        let ordering = match key.direction {
            OrderDirection::Asc => compare_values(left, right),
            OrderDirection::Desc => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Specification;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct City {
        id: i64,
        name: String,
        country: String,
        population: i64,
    }

    impl Entity for City {}

    fn city(id: i64, name: &str, country: &str, population: i64) -> City {
        City {
            id,
            name: name.to_string(),
            country: country.to_string(),
            population,
        }
    }

    async fn seeded() -> RepositoryContext {
        let store = MemoryStore::new(&format!("query-{}", Uuid::new_v4()));
        let ctx = RepositoryContext::new(Arc::new(store));
        for c in [
            city(3, "Lyon", "FR", 513),
            city(1, "Paris", "FR", 2161),
            city(2, "Berlin", "DE", 3645),
            city(4, "Hamburg", "DE", 1841),
            city(5, "Nice", "FR", 342),
        ] {
            ctx.add(&c).await.unwrap();
        }
        ctx.save_changes().await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_filter_sort_page() {
        let ctx = seeded().await;
        let options = QueryOptions::<City>::new()
            .where_eq("country", "FR")
            .order_by_desc("population")
            .page_with(1, 2);

        let page = ctx.find_all(&options).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<&str> = page.result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Paris", "Lyon"]);

        let last = ctx.find_all(&options.clone().page_with(2, 2)).await.unwrap();
        assert_eq!(last.result.len(), 1);
        assert_eq!(last.result[0].name, "Nice");
    }

    #[tokio::test]
    async fn test_paging_defaults_to_key_order() {
        let ctx = seeded().await;
        let page = ctx.find_all(&QueryOptions::<City>::new().page(1)).await.unwrap();
        let ids: Vec<i64> = page.result.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // without paging, stored order is kept
        let all = ctx.find_all(&QueryOptions::<City>::new()).await.unwrap();
        assert_eq!(all.result[0].id, 3);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let ctx = seeded().await;
        let page = ctx.find_all(&QueryOptions::<City>::new().page_with(4, 2)).await.unwrap();
        assert!(page.result.is_empty());
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_find_by_key_and_counts() {
        let ctx = seeded().await;
        let berlin = ctx
            .find_by_key::<City>(&[Value::from(2)], &FetchStrategy::new())
            .await
            .unwrap();
        assert_eq!(berlin.map(|c| c.name), Some("Berlin".to_string()));
        assert!(ctx
            .find_by_key::<City>(&[Value::from(9)], &FetchStrategy::new())
            .await
            .unwrap()
            .is_none());

        let big = QueryOptions::from(Specification::predicate(|c: &City| c.population > 1000));
        assert_eq!(ctx.count(&big).await.unwrap(), 3);
        assert!(ctx.exists(&big.where_eq("country", "DE")).await.unwrap());

        let arity = ctx
            .find_by_key::<City>(&[Value::from(1), Value::from(2)], &FetchStrategy::new())
            .await;
        assert!(matches!(arity, Err(ModelError::KeyArity { .. })));
    }

    #[tokio::test]
    async fn test_projections() {
        let ctx = seeded().await;
        let all = QueryOptions::<City>::new().order_by("id");

        let names = ctx.find_all_as(&all, |c| c.name.clone()).await.unwrap();
        assert_eq!(names.result[0], "Paris");

        let by_name = ctx
            .to_dictionary(&all, |c| c.name.clone(), |c| c.population)
            .await
            .unwrap();
        assert_eq!(by_name.result.get("Nice"), Some(&342));

        let duplicate = ctx.to_dictionary(&all, |c| c.country.clone(), |c| c.id).await;
        assert!(matches!(duplicate, Err(ModelError::Query(_))));

        let groups = ctx
            .group_by(
                &all,
                |c| c.country.clone(),
                |country, cities| (country.clone(), cities.len()),
            )
            .await
            .unwrap();
        assert_eq!(groups.result, vec![("FR".to_string(), 3), ("DE".to_string(), 2)]);
        assert_eq!(groups.total, 5);
    }

    #[tokio::test]
    async fn test_invalid_queries() {
        let ctx = seeded().await;
        let bad_page = ctx.find_all(&QueryOptions::<City>::new().page(0)).await;
        assert!(matches!(bad_page, Err(ModelError::InvalidParameter(_))));

        let bad_sort = ctx.find_all(&QueryOptions::<City>::new().order_by("mayor")).await;
        assert!(matches!(bad_sort, Err(ModelError::Query(_))));

        let sql = ctx.execute_sql::<City>("SELECT * FROM City", &[]).await;
        assert!(matches!(sql, Err(ModelError::Unsupported(_))));
    }
}
