use common::query::{translate, ListParams, PageLimits};
use common::{IncidentPatch, IncidentQuery, NewIncident, Severity, Status};
use pretty_assertions::assert_eq;
use tracker_server::{Storage, StoreError};

fn new_incident(title: &str, service: &str, severity: Severity) -> NewIncident {
    NewIncident {
        title: title.to_string(),
        service: service.to_string(),
        severity,
        status: Status::Open,
        owner: None,
        summary: None,
    }
}

fn query(params: ListParams) -> IncidentQuery {
    translate(&params, PageLimits::default()).unwrap()
}

#[tokio::test]
async fn create_assigns_id_and_equal_timestamps() {
    let storage = Storage::in_memory().await.unwrap();
    let created = storage
        .create(new_incident("Disk space critical", "Storage Service", Severity::Sev2))
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(created.status, Status::Open);

    let fetched = storage.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_rejects_invalid_record_and_persists_nothing() {
    let storage = Storage::in_memory().await.unwrap();
    let err = storage
        .create(new_incident(&"x".repeat(256), "Auth", Severity::Sev1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(storage.count().await.unwrap(), 0);
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let storage = Storage::in_memory().await.unwrap();
    let mut new = new_incident("Failed deployment", "API Gateway", Severity::Sev3);
    new.owner = Some("mike@example.com".into());
    let created = storage.create(new).await.unwrap();

    let patch = IncidentPatch {
        status: Some(Status::Resolved),
        ..Default::default()
    };
    let updated = storage.update(&created.id, &patch).await.unwrap();

    assert_eq!(updated.status, Status::Resolved);
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.service, created.service);
    assert_eq!(updated.severity, created.severity);
    assert_eq!(updated.owner, created.owner);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn update_can_clear_owner() {
    let storage = Storage::in_memory().await.unwrap();
    let mut new = new_incident("Cache invalidation issue", "Cache Layer", Severity::Sev4);
    new.owner = Some("emma@example.com".into());
    let created = storage.create(new).await.unwrap();

    let patch = IncidentPatch {
        owner: Some(None),
        ..Default::default()
    };
    let updated = storage.update(&created.id, &patch).await.unwrap();
    assert_eq!(updated.owner, None);
}

#[tokio::test]
async fn missing_ids_are_not_found_and_store_is_untouched() {
    let storage = Storage::in_memory().await.unwrap();
    let created = storage
        .create(new_incident("Service unavailable", "User Service", Severity::Sev1))
        .await
        .unwrap();

    let patch = IncidentPatch {
        title: Some("renamed".into()),
        ..Default::default()
    };
    assert!(matches!(
        storage.update("missing", &patch).await,
        Err(StoreError::NotFound(id)) if id == "missing"
    ));
    assert!(matches!(storage.remove("missing").await, Err(StoreError::NotFound(_))));
    assert!(matches!(storage.get_by_id("missing").await, Err(StoreError::NotFound(_))));

    assert_eq!(storage.count().await.unwrap(), 1);
    assert_eq!(storage.get_by_id(&created.id).await.unwrap(), created);
}

#[tokio::test]
async fn remove_returns_record_and_deletes_it() {
    let storage = Storage::in_memory().await.unwrap();
    let created = storage
        .create(new_incident("Memory leak detected", "User Service", Severity::Sev2))
        .await
        .unwrap();

    let removed = storage.remove(&created.id).await.unwrap();
    assert_eq!(removed, created);
    assert!(matches!(storage.get_by_id(&created.id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn search_matches_title_service_or_owner_case_insensitively() {
    let storage = Storage::in_memory().await.unwrap();
    storage
        .create(new_incident("Payment processing errors", "Checkout", Severity::Sev1))
        .await
        .unwrap();
    storage
        .create(new_incident("Latency", "PAYMENT Service", Severity::Sev2))
        .await
        .unwrap();
    let mut by_owner = new_incident("Timeouts", "Auth Service", Severity::Sev3);
    by_owner.owner = Some("payments-oncall@example.com".into());
    storage.create(by_owner).await.unwrap();
    storage
        .create(new_incident("Disk full", "Storage Service", Severity::Sev4))
        .await
        .unwrap();

    let page = storage
        .list(&query(ListParams {
            search: Some("payment".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(page.meta.total, 3);
    assert_eq!(page.data.len(), 3);
    for incident in &page.data {
        let haystack = format!(
            "{} {} {}",
            incident.title,
            incident.service,
            incident.owner.clone().unwrap_or_default()
        )
        .to_lowercase();
        assert!(haystack.contains("payment"));
    }
}

#[tokio::test]
async fn search_and_service_filter_fold_non_ascii_case() {
    let storage = Storage::in_memory().await.unwrap();
    storage
        .create(new_incident("ÉCHEC DU PAIEMENT", "Paiements", Severity::Sev1))
        .await
        .unwrap();
    let other = storage
        .create(new_incident("Disk full", "Zahlungsdienst ÜBER", Severity::Sev2))
        .await
        .unwrap();

    let page = storage
        .list(&query(ListParams {
            search: Some("échec".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].title, "ÉCHEC DU PAIEMENT");

    let page = storage
        .list(&query(ListParams {
            service: Some("über".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].id, other.id);

    // Renaming keeps the folded copy in step.
    let patch = IncidentPatch {
        title: Some("Störung im Rechenzentrum".into()),
        owner: Some(Some("JÖRG@example.com".into())),
        ..Default::default()
    };
    storage.update(&other.id, &patch).await.unwrap();
    for needle in ["STÖRUNG", "jörg"] {
        let page = storage
            .list(&query(ListParams {
                search: Some(needle.into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1, "{needle}");
        assert_eq!(page.data[0].id, other.id);
    }
}

#[tokio::test]
async fn replaced_rows_are_searchable_case_insensitively() {
    let storage = Storage::in_memory().await.unwrap();
    let mut rng = rand::thread_rng();
    let mut generated = tracker_server::seed::generate(&mut rng, 3, chrono::Utc::now());
    generated[0].title = "ÅRSRAPPORT saknas".into();
    storage.replace_all(&generated).await.unwrap();

    let page = storage
        .list(&query(ListParams {
            search: Some("årsrapport".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert!(page.data.iter().any(|i| i.id == generated[0].id));
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let storage = Storage::in_memory().await.unwrap();
    storage
        .create(new_incident("CPU at 100%", "Compute", Severity::Sev2))
        .await
        .unwrap();
    storage
        .create(new_incident("CPU at 1000", "Compute", Severity::Sev2))
        .await
        .unwrap();

    let page = storage
        .list(&query(ListParams {
            search: Some("100%".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].title, "CPU at 100%");
}

#[tokio::test]
async fn filters_combine_with_and() {
    let storage = Storage::in_memory().await.unwrap();
    storage.create(new_incident("a", "API Gateway", Severity::Sev1)).await.unwrap();
    storage.create(new_incident("b", "API Gateway", Severity::Sev2)).await.unwrap();
    let mut resolved = new_incident("c", "Auth Service", Severity::Sev1);
    resolved.status = Status::Resolved;
    storage.create(resolved).await.unwrap();

    let page = storage
        .list(&query(ListParams {
            severity: Some("SEV1".into()),
            service: Some("gateway".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "a");

    let page = storage
        .list(&query(ListParams {
            status: Some("RESOLVED".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "c");
}

#[tokio::test]
async fn second_page_of_twenty_five() {
    let storage = Storage::in_memory().await.unwrap();
    for i in 1..=25 {
        storage
            .create(new_incident(&format!("Incident {i:02}"), "Database", Severity::Sev3))
            .await
            .unwrap();
    }

    let page = storage
        .list(&query(ListParams {
            page: Some("2".into()),
            limit: Some("10".into()),
            sort_by: Some("title".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    let titles: Vec<_> = page.data.iter().map(|i| i.title.clone()).collect();
    let expected: Vec<_> = (11..=20).map(|i| format!("Incident {i:02}")).collect();
    assert_eq!(titles, expected);
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.meta.limit, 10);
    assert_eq!(page.meta.total, 25);
    assert_eq!(page.meta.total_pages, 3);
}

#[tokio::test]
async fn status_sorts_in_lifecycle_order() {
    let storage = Storage::in_memory().await.unwrap();
    for (title, status) in [("r", Status::Resolved), ("o", Status::Open), ("m", Status::Mitigated)] {
        let mut new = new_incident(title, "Database", Severity::Sev3);
        new.status = status;
        storage.create(new).await.unwrap();
    }

    let page = storage
        .list(&query(ListParams {
            sort_by: Some("status".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        }))
        .await
        .unwrap();
    let statuses: Vec<_> = page.data.iter().map(|i| i.status).collect();
    assert_eq!(statuses, vec![Status::Open, Status::Mitigated, Status::Resolved]);
}

#[tokio::test]
async fn round_trip_returns_every_created_record() {
    let storage = Storage::in_memory().await.unwrap();
    let mut created = Vec::new();
    for i in 0..7 {
        let mut new = new_incident(&format!("Incident {i}"), "Email Service", Severity::ALL[i % 4]);
        new.summary = Some(format!("summary {i}"));
        created.push(storage.create(new).await.unwrap());
    }

    let page = storage.list(&IncidentQuery::all(50)).await.unwrap();
    assert_eq!(page.data.len(), 7);
    for incident in &created {
        assert!(page.data.contains(incident));
    }
}

#[tokio::test]
async fn open_counts_group_by_severity() {
    let storage = Storage::in_memory().await.unwrap();
    storage.create(new_incident("a", "s", Severity::Sev1)).await.unwrap();
    storage.create(new_incident("b", "s", Severity::Sev1)).await.unwrap();
    storage.create(new_incident("c", "s", Severity::Sev4)).await.unwrap();
    let mut mitigated = new_incident("d", "s", Severity::Sev2);
    mitigated.status = Status::Mitigated;
    storage.create(mitigated).await.unwrap();

    let counts = storage.open_counts().await.unwrap();
    assert_eq!((counts.sev1, counts.sev2, counts.sev3, counts.sev4), (2, 0, 0, 1));
    assert_eq!(counts.total(), 3);
}

#[tokio::test]
async fn replace_all_wipes_existing_rows() {
    let storage = Storage::in_memory().await.unwrap();
    storage.create(new_incident("old", "s", Severity::Sev1)).await.unwrap();

    let mut rng = rand::thread_rng();
    let generated = tracker_server::seed::generate(&mut rng, 150, chrono::Utc::now());
    let inserted = storage.replace_all(&generated).await.unwrap();

    assert_eq!(inserted, 150);
    assert_eq!(storage.count().await.unwrap(), 150);
    let first = storage.get_by_id(&generated[0].id).await.unwrap();
    assert_eq!(first, generated[0]);
}
