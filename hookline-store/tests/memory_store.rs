use std::time::Duration;

use hookline_core::{Condition, DispatchType, Execution, ExecutionTarget, ExecutionType, SigningKey, Target};
use hookline_store::{
    ActionStore, ExecutionQuery, ExecutionSearch, MemoryStore, Pagination, StoreError,
    TargetQuery, TargetSearch, TargetSortColumn, TextMatch,
};

const INSTANCE: &str = "inst-1";

fn target(id: &str, name: &str) -> Target {
    Target {
        id: id.to_string(),
        instance_id: INSTANCE.to_string(),
        name: name.to_string(),
        endpoint: format!("https://example.com/{id}").parse().unwrap(),
        timeout: Duration::from_secs(10),
        dispatch_type: DispatchType::Webhook,
        interrupt_on_error: false,
        signing_key: SigningKey::from_bytes(vec![1; 32]),
    }
}

fn method(m: &str) -> Condition {
    Condition::request_method(m).unwrap()
}

#[tokio::test]
async fn every_write_advances_the_instance_sequence() {
    let store = MemoryStore::new();
    assert_eq!(store.current_sequence(INSTANCE).await.unwrap(), 0);

    let d1 = store.create_target(&target("t1", "one")).await.unwrap();
    let d2 = store.create_target(&target("t2", "two")).await.unwrap();
    assert_eq!((d1.sequence, d2.sequence), (1, 2));

    let exec = Execution::new(method("/pkg.Svc/Method"), vec![ExecutionTarget::Target("t1".into())]);
    let d3 = store.put_execution(INSTANCE, &exec, 2).await.unwrap();
    assert_eq!(d3.sequence, 3);
    assert_eq!(d3.id, "request/pkg.Svc/Method");
    assert_eq!(store.current_sequence(INSTANCE).await.unwrap(), 3);
}

#[tokio::test]
async fn stale_sequence_is_a_conflict() {
    let store = MemoryStore::new();
    store.create_target(&target("t1", "one")).await.unwrap();
    let exec = Execution::new(method("/pkg.Svc/Method"), vec![ExecutionTarget::Target("t1".into())]);

    let err = store.put_execution(INSTANCE, &exec, 0).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert!(store.get_execution(INSTANCE, &exec.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn target_names_are_unique_per_instance() {
    let store = MemoryStore::new();
    store.create_target(&target("t1", "audit")).await.unwrap();
    let err = store.create_target(&target("t2", "audit")).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));

    let mut other = target("t2", "audit");
    other.instance_id = "inst-2".to_string();
    assert!(store.create_target(&other).await.is_ok());
}

#[tokio::test]
async fn update_checks_the_row_sequence() {
    let store = MemoryStore::new();
    let created = store.create_target(&target("t1", "one")).await.unwrap();
    store.create_target(&target("t2", "two")).await.unwrap();

    let mut changed = target("t1", "renamed");
    changed.timeout = Duration::from_secs(1);
    let updated = store.update_target(&changed, created.sequence).await.unwrap();
    assert_eq!(updated.creation_date, created.creation_date);

    let err = store.update_target(&changed, created.sequence).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let record = store.get_target(INSTANCE, "t1").await.unwrap().unwrap();
    assert_eq!(record.target.name, "renamed");
    assert_eq!(record.details.sequence, updated.sequence);
}

#[tokio::test]
async fn deleting_a_target_removes_its_references() {
    let store = MemoryStore::new();
    store.create_target(&target("t1", "one")).await.unwrap();
    store.create_target(&target("t2", "two")).await.unwrap();

    let a = Execution::new(
        method("/pkg.Svc/A"),
        vec![ExecutionTarget::Target("t1".into()), ExecutionTarget::Target("t2".into())],
    );
    let b = Execution::new(method("/pkg.Svc/B"), vec![ExecutionTarget::Target("t1".into())]);
    let seq = store.current_sequence(INSTANCE).await.unwrap();
    store.put_execution(INSTANCE, &a, seq).await.unwrap();
    store.put_execution(INSTANCE, &b, seq + 1).await.unwrap();

    let seq = store.current_sequence(INSTANCE).await.unwrap();
    let deletion = store.delete_target(INSTANCE, "t1", seq).await.unwrap();
    assert_eq!(
        deletion.affected_executions,
        vec!["request/pkg.Svc/A".to_string(), "request/pkg.Svc/B".to_string()]
    );

    let a = store.get_execution(INSTANCE, "request/pkg.Svc/A").await.unwrap().unwrap();
    assert_eq!(a.execution.targets, vec![ExecutionTarget::Target("t2".into())]);
    assert!(store.get_execution(INSTANCE, "request/pkg.Svc/B").await.unwrap().is_none());

    let snapshot = store.snapshot(INSTANCE).await.unwrap();
    assert_eq!(snapshot.target_ids.into_iter().collect::<Vec<_>>(), vec!["t2"]);
}

#[tokio::test]
async fn search_targets_filters_sorts_and_pages() {
    let store = MemoryStore::new();
    for (id, name) in [("t1", "audit-log"), ("t2", "Audit-Mail"), ("t3", "enrich")] {
        store.create_target(&target(id, name)).await.unwrap();
    }

    let by_name = TargetSearch {
        queries: vec![TargetQuery::Name {
            value: "audit".to_string(),
            method: TextMatch::StartsWithIgnoreCase,
        }],
        ..Default::default()
    };
    let res = store.search_targets(INSTANCE, &by_name).await.unwrap();
    assert_eq!(res.details.total_result, 2);
    assert_eq!(res.details.processed_sequence, 3);

    let sorted = TargetSearch {
        sort: TargetSortColumn::Name,
        page: Pagination {
            offset: 1,
            limit: 1,
            asc: false,
        },
        ..Default::default()
    };
    let res = store.search_targets(INSTANCE, &sorted).await.unwrap();
    assert_eq!(res.details.total_result, 3);
    let names: Vec<_> = res.items.iter().map(|r| r.target.name.as_str()).collect();
    assert_eq!(names, vec!["audit-log"]);

    let by_ids = TargetSearch {
        queries: vec![TargetQuery::InIds(vec!["t3".into(), "missing".into()])],
        ..Default::default()
    };
    let res = store.search_targets(INSTANCE, &by_ids).await.unwrap();
    assert_eq!(res.items.len(), 1);
    assert_eq!(res.items[0].target.id, "t3");
}

#[tokio::test]
async fn search_executions_by_type_target_and_include() {
    let store = MemoryStore::new();
    store.create_target(&target("t1", "one")).await.unwrap();
    let group = Condition::event_group("user").unwrap();
    let writes = [
        Execution::new(group.clone(), vec![ExecutionTarget::Target("t1".into())]),
        Execution::new(
            method("/pkg.Svc/Method"),
            vec![ExecutionTarget::Include(group.clone())],
        ),
        Execution::new(Condition::response_all(), vec![ExecutionTarget::Target("t1".into())]),
    ];
    for exec in &writes {
        let seq = store.current_sequence(INSTANCE).await.unwrap();
        store.put_execution(INSTANCE, exec, seq).await.unwrap();
    }

    let search = |queries| ExecutionSearch {
        queries,
        ..Default::default()
    };
    let ids = |res: hookline_store::SearchResult<hookline_store::ExecutionRecord>| {
        res.items.into_iter().map(|r| r.details.id).collect::<Vec<_>>()
    };

    let res = store
        .search_executions(INSTANCE, &search(vec![ExecutionQuery::Target("t1".into())]))
        .await
        .unwrap();
    assert_eq!(ids(res), vec!["event/user.*", "response"]);

    let res = store
        .search_executions(INSTANCE, &search(vec![ExecutionQuery::Include(group.id())]))
        .await
        .unwrap();
    assert_eq!(ids(res), vec!["request/pkg.Svc/Method"]);

    let res = store
        .search_executions(
            INSTANCE,
            &search(vec![
                ExecutionQuery::ExecutionType(ExecutionType::Response),
                ExecutionQuery::Target("t1".into()),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(ids(res), vec!["response"]);

    let res = store
        .search_executions(
            INSTANCE,
            &search(vec![ExecutionQuery::InConditions(vec!["response".into(), "event".into()])]),
        )
        .await
        .unwrap();
    assert_eq!(ids(res), vec!["response"]);
}

#[tokio::test]
async fn deleting_a_missing_execution_is_not_found() {
    let store = MemoryStore::new();
    let err = store.delete_execution(INSTANCE, "request", 0).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
