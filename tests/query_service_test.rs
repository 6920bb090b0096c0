use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use backoffice::QueryError;
use backoffice::auth::{AccessPolicy, RootOnly, StaticAuthorization, Unrestricted};
use backoffice::config::QuerySettings;
use backoffice::modules::fixtures::{sample_logs, sample_project_instances};
use backoffice::modules::logs::LogLevel;
use backoffice::modules::{Log, ProjectInstance, build_registry};
use backoffice::query::{
    Cancellation, EqualsFilter, ListRequest, OrderDirection, PaginationParameters, Predicate,
    Query, QueryOptions, QueryService, RangeFilter, SearchFilter, cancellation,
};
use backoffice::source::memory::MemorySource;

fn log_service(logs: Vec<Log>, root: bool) -> QueryService<Log> {
    let registry = Arc::new(build_registry().unwrap());
    let policy: Arc<dyn AccessPolicy<Log>> =
        Arc::new(RootOnly::new(Arc::new(StaticAuthorization { root })));
    QueryService::new(Arc::new(MemorySource::new(logs)), registry, policy)
}

fn project_service(rows: Vec<ProjectInstance>) -> QueryService<ProjectInstance> {
    let registry = Arc::new(build_registry().unwrap());
    QueryService::new(
        Arc::new(MemorySource::new(rows)),
        registry,
        Arc::new(Unrestricted),
    )
}

fn ids(page: &[Log]) -> Vec<i64> {
    page.iter().map(|l| l.id).collect()
}

fn request(options: QueryOptions, pagination: PaginationParameters) -> ListRequest {
    ListRequest::new(options, pagination)
}

#[tokio::test]
async fn root_sees_second_page_in_default_order() {
    let service = log_service(sample_logs(55), true);
    let page = service
        .list(
            &request(QueryOptions::new(), PaginationParameters::page(2, 20)),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_items, 55);
    assert_eq!(page.items.len(), 20);
    assert_eq!(ids(&page.items), (21..=40).collect::<Vec<_>>());
    assert_eq!(page.page_number, 2);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn non_root_sees_empty_page() {
    let service = log_service(sample_logs(55), false);
    let page = service
        .list(
            &request(QueryOptions::new(), PaginationParameters::page(2, 20)),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_items, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn non_root_search_cannot_widen_access() {
    let service = log_service(sample_logs(55), false);
    let options = QueryOptions::new().filter(SearchFilter::new("anything"));
    let page = service
        .list(
            &request(options, PaginationParameters::default()),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_items, 0);
}

#[tokio::test]
async fn non_root_get_by_id_is_absent() {
    let service = log_service(sample_logs(5), false);
    let found = service
        .get_by_id(3, None, &Cancellation::never())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn restriction_applies_to_caller_supplied_base_query() {
    let service = log_service(sample_logs(5), false);
    let base = Query::all().filter(Predicate::eq("id", 1).unwrap());
    let query = service.prepare_query(Some(base), None).await.unwrap();
    assert!(query.predicate().is_never());
}

#[tokio::test]
async fn get_by_id_returns_row_or_none() {
    let service = log_service(sample_logs(5), true);
    let cancel = Cancellation::never();

    let found = service.get_by_id(3, None, &cancel).await.unwrap();
    assert_eq!(found.map(|l| l.id), Some(3));

    let missing = service.get_by_id(99, None, &cancel).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn get_by_id_honours_filters() {
    let service = log_service(sample_logs(5), true);
    // Log 3 is a debug entry, so an error-level filter hides it.
    let options = QueryOptions::new().filter(EqualsFilter::new("level", "error"));
    let found = service
        .get_by_id(3, Some(&options), &Cancellation::never())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn filters_combine_conjunctively() {
    let logs = sample_logs(55);
    let expected: Vec<i64> = logs
        .iter()
        .filter(|l| l.message.to_lowercase().contains("batch 1"))
        .filter(|l| l.level == LogLevel::Error)
        .map(|l| l.id)
        .collect();

    let service = log_service(logs, true);
    let options = QueryOptions::new()
        .filter(SearchFilter::new("BATCH 1"))
        .filter(EqualsFilter::new("Level", "error"));
    let page = service
        .list(
            &request(options, PaginationParameters::page(1, 100)),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert_eq!(expected, vec![10, 14, 18]);
    assert_eq!(page.total_items, expected.len() as u64);
    assert_eq!(ids(&page.items), expected);
}

#[tokio::test]
async fn range_filter_is_inclusive() {
    let service = log_service(sample_logs(55), true);
    let options = QueryOptions::new().filter(RangeFilter::new("id").from(10).to(12));
    let page = service
        .list(
            &request(options, PaginationParameters::default()),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec![10, 11, 12]);
}

#[tokio::test]
async fn empty_search_term_matches_everything() {
    let service = log_service(sample_logs(55), true);
    let options = QueryOptions::new().filter(SearchFilter::new(""));
    let page = service
        .list(
            &request(options, PaginationParameters::default()),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_items, 55);
}

#[tokio::test]
async fn page_length_follows_total_and_skip() {
    let service = log_service(sample_logs(55), true);
    let query = service.prepare_query(None, None).await.unwrap();
    let cancel = Cancellation::never();

    for (pagination, expected_len) in [
        (PaginationParameters::page(1, 20), 20),
        (PaginationParameters::page(3, 20), 15),
        (PaginationParameters::page(4, 20), 0),
        (PaginationParameters::offset(50, 20), 5),
        (PaginationParameters::offset(60, 20), 0),
    ] {
        let page = service
            .execute_paginated_query(query.clone(), &pagination, Log::clone, &cancel)
            .await
            .unwrap();
        assert_eq!(page.items.len(), expected_len, "{pagination:?}");
        assert_eq!(page.total_items, 55, "{pagination:?}");
    }
}

#[tokio::test]
async fn page_size_is_capped_by_settings() {
    let service = log_service(sample_logs(55), true).with_settings(QuerySettings {
        default_page_size: 5,
        max_page_size: 8,
    });
    let cancel = Cancellation::never();
    let query = service.prepare_query(None, None).await.unwrap();

    let defaulted = service
        .execute_paginated_query(query.clone(), &PaginationParameters::page(1, 0), Log::clone, &cancel)
        .await
        .unwrap();
    assert_eq!(defaulted.items.len(), 5);

    let capped = service
        .execute_paginated_query(query, &PaginationParameters::page(1, 50), Log::clone, &cancel)
        .await
        .unwrap();
    assert_eq!(capped.items.len(), 8);
    assert_eq!(capped.page_size, 8);
}

#[tokio::test]
async fn descending_order_is_non_increasing() {
    let service = log_service(sample_logs(55), true);
    let options = QueryOptions::new().order_by("StartedAt", OrderDirection::Desc);
    let page = service
        .list(
            &request(options, PaginationParameters::page(1, 100)),
            Log::clone,
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 55);
    assert!(
        page.items
            .windows(2)
            .all(|pair| pair[0].started_at >= pair[1].started_at)
    );
}

#[tokio::test]
async fn order_by_unknown_field_is_rejected() {
    let service = log_service(sample_logs(3), true);
    let options = QueryOptions::new().order_by("shoe_size", OrderDirection::Asc);
    let err = service.prepare_query(None, Some(&options)).await.unwrap_err();
    assert!(matches!(err, QueryError::UnknownField { entity: "logs", .. }));
}

#[tokio::test]
async fn projector_runs_only_for_the_page() {
    let service = log_service(sample_logs(55), true);
    let calls = AtomicUsize::new(0);
    let page = service
        .list(
            &request(QueryOptions::new(), PaginationParameters::page(1, 7)),
            |log: &Log| {
                calls.fetch_add(1, Ordering::SeqCst);
                log.id
            },
            &Cancellation::never(),
        )
        .await
        .unwrap();
    assert_eq!(page.items, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn search_is_case_insensitive_across_fields() {
    let mut rows = sample_project_instances(6);
    rows[0].name = "Hello World".to_string();
    rows[1].notes = Some("said hello to the team".to_string());
    let service = project_service(rows);
    let cancel = Cancellation::never();

    for (term, expected) in [("hello", 2), ("WORLD", 1), ("HeLLo WoRLD", 1), ("absent", 0)] {
        let options = QueryOptions::new().filter(SearchFilter::new(term));
        let page = service
            .list(
                &request(options, PaginationParameters::default()),
                |p: &ProjectInstance| p.id,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(page.total_items, expected, "term {term:?}");
    }
}

#[tokio::test]
async fn cancelled_request_returns_no_partial_result() {
    let service = log_service(sample_logs(55), true);
    let (handle, cancel) = cancellation();
    handle.cancel();

    let result = service
        .list(
            &request(QueryOptions::new(), PaginationParameters::default()),
            Log::clone,
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(QueryError::Cancelled)));

    let result = service.get_by_id(1, None, &cancel).await;
    assert!(matches!(result, Err(QueryError::Cancelled)));
}
