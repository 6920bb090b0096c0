use std::sync::Arc;

use backoffice::auth::{AuthorizationProvider, Principal};
use backoffice::config::QuerySettings;
use backoffice::modules::fixtures::{
    sample_data_sets, sample_logs, sample_project_instances, sample_translations,
};
use backoffice::modules::{GetByIdQuery, Modules, Sources, build_registry};
use backoffice::query::{
    Cancellation, EqualsFilter, ListRequest, OrderDirection, PaginationParameters, QueryOptions,
    SearchFilter,
};
use backoffice::source::memory::MemorySource;

fn sources() -> Sources {
    Sources {
        logs: Arc::new(MemorySource::new(sample_logs(55))),
        project_instances: Arc::new(MemorySource::new(sample_project_instances(12))),
        translations: Arc::new(MemorySource::new(sample_translations(30))),
        data_sets: Arc::new(MemorySource::new(sample_data_sets(8))),
    }
}

fn modules(caller: Principal) -> Modules {
    let caller: Arc<dyn AuthorizationProvider> = Arc::new(caller);
    Modules::new(
        &sources(),
        Arc::new(build_registry().unwrap()),
        caller,
        QuerySettings::default(),
    )
}

#[tokio::test]
async fn logs_are_root_only() {
    let cancel = Cancellation::never();
    let request = ListRequest::new(QueryOptions::new(), PaginationParameters::page(1, 5));

    let admin = modules(Principal::new("alice").with_role("admin"));
    let page = admin.logs.list(&request, &cancel).await.unwrap();
    assert_eq!(page.total_items, 0);
    assert!(page.items.is_empty());
    let found = admin
        .logs
        .get_by_id(GetByIdQuery::new(1), &cancel)
        .await
        .unwrap();
    assert!(found.is_none());

    let root = modules(Principal::new("bob").with_role("ROOT"));
    let page = root.logs.list(&request, &cancel).await.unwrap();
    assert_eq!(page.total_items, 55);
    assert_eq!(page.items.len(), 5);
}

#[tokio::test]
async fn other_modules_are_open_to_everyone() {
    let cancel = Cancellation::never();
    let anonymous = modules(Principal::anonymous());
    let request = ListRequest::new(QueryOptions::new(), PaginationParameters::default());

    assert_eq!(
        anonymous
            .project_instances
            .list(&request, &cancel)
            .await
            .unwrap()
            .total_items,
        12
    );
    assert_eq!(
        anonymous
            .translations
            .list(&request, &cancel)
            .await
            .unwrap()
            .total_items,
        30
    );
    assert_eq!(
        anonymous
            .data_sets
            .list(&request, &cancel)
            .await
            .unwrap()
            .total_items,
        8
    );
}

#[tokio::test]
async fn translations_filter_by_culture_and_search() {
    let cancel = Cancellation::never();
    let anonymous = modules(Principal::anonymous());
    let options = QueryOptions::new()
        .filter(EqualsFilter::new("culture", "de-DE"))
        .filter(SearchFilter::new("label_1"))
        .order_by("id", OrderDirection::Desc);
    let page = anonymous
        .translations
        .list(&ListRequest::new(options, PaginationParameters::default()), &cancel)
        .await
        .unwrap();

    let expected: Vec<i64> = sample_translations(30)
        .into_iter()
        .filter(|t| t.culture == "de-DE" && t.key.contains("label_1"))
        .map(|t| t.id)
        .rev()
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(page.items.iter().map(|t| t.id).collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn get_by_id_returns_dto() {
    let cancel = Cancellation::never();
    let root = modules(Principal::new("root").with_role("root"));

    let log = root
        .logs
        .get_by_id(GetByIdQuery::new(4), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.id, 4);
    assert_eq!(log.duration_ms, Some(4_000));

    let id = sample_data_sets(8)[2].id;
    let data_set = root
        .data_sets
        .get_by_id(GetByIdQuery::new(id), &cancel)
        .await
        .unwrap();
    assert_eq!(data_set.map(|d| d.id), Some(id));
}

#[tokio::test]
async fn pages_serialize_in_camel_case() {
    let cancel = Cancellation::never();
    let root = modules(Principal::new("root").with_role("root"));
    let page = root
        .logs
        .list(
            &ListRequest::new(QueryOptions::new(), PaginationParameters::page(1, 2)),
            &cancel,
        )
        .await
        .unwrap();

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["totalItems"], 55);
    assert_eq!(json["pageSize"], 2);
    assert_eq!(json["totalPages"], 28);
    assert_eq!(json["items"][0]["id"], 1);
    assert_eq!(json["items"][0]["level"], "warning");
    assert!(json["items"][1]["durationMs"].is_number());
    assert!(json["items"][0]["durationMs"].is_null());
}

#[test]
fn pagination_deserializes_either_shape() {
    let page: PaginationParameters =
        serde_json::from_str(r#"{"pageNumber": 3, "pageSize": 25}"#).unwrap();
    assert_eq!(page, PaginationParameters::page(3, 25));

    let offset: PaginationParameters =
        serde_json::from_str(r#"{"skip": 40, "pageSize": 20}"#).unwrap();
    assert_eq!(offset, PaginationParameters::offset(40, 20));
}
