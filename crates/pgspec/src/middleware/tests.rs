use super::*;
use crate::error::SpecError;
use std::sync::Mutex;

struct Recording {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware<i32> for Recording {
    fn preprocess(&self, _criteria: &mut QueryCriteria) -> SpecResult<()> {
        self.log.lock().unwrap().push(format!("pre:{}", self.label));
        Ok(())
    }

    fn postprocess(&self, result: &mut QueryResultList<i32>, _criteria: &QueryCriteria) -> SpecResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("post:{}:{}", self.label, result.items.len()));
        result.items.push(0);
        Ok(())
    }
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner: QueryRunner<i32> = QueryRunner::new()
        .with(Recording {
            label: "a",
            log: log.clone(),
        })
        .with(Recording {
            label: "b",
            log: log.clone(),
        });

    let exec_log = log.clone();
    let mut criteria = QueryCriteria::new();
    let result = runner
        .run_with(&mut criteria, |_| async move {
            exec_log.lock().unwrap().push("exec".to_string());
            Ok(vec![1, 2])
        })
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["pre:a", "pre:b", "exec", "post:a:2", "post:b:3"]
    );
    assert_eq!(result.items, vec![1, 2, 0, 0]);
}

#[tokio::test]
async fn test_exec_sees_preprocessed_criteria() {
    let runner: QueryRunner<i32> = QueryRunner::new()
        .with(preprocess_fn(|c: &mut QueryCriteria| {
            c.take = Some(5);
            Ok(())
        }))
        .with(preprocess_fn(|c: &mut QueryCriteria| {
            c.take = c.take.map(|t| t * 2);
            Ok(())
        }));

    let mut criteria = QueryCriteria::new();
    let result = runner
        .run_with(&mut criteria, |c| async move { Ok(vec![c.take.unwrap_or_default() as i32]) })
        .await
        .unwrap();
    assert_eq!(result.items, vec![10]);
    assert_eq!(criteria.take, Some(10));
}

#[tokio::test]
async fn test_later_postprocess_observes_earlier_changes() {
    let runner = QueryRunner::new()
        .with(Pagination::new(2))
        .with(postprocess_fn(|result: &mut QueryResultList<i32>, _: &QueryCriteria| {
            let has_next = result.has_next();
            result.insert_extension("more", has_next)?;
            result.insert_extension("count", result.items.len())
        }));

    let mut criteria = QueryCriteria::new();
    let result = runner
        .run_with(&mut criteria, |c| async move {
            Ok((0..c.take.unwrap_or_default() as i32).collect())
        })
        .await
        .unwrap();
    assert_eq!(result.items, vec![0, 1]);
    assert_eq!(result.extension("more"), Some(&serde_json::json!(true)));
    assert_eq!(result.extension("count"), Some(&serde_json::json!(2)));
}

#[tokio::test]
async fn test_preprocess_error_skips_execution() {
    let runner: QueryRunner<i32> =
        QueryRunner::new().with(preprocess_fn(|_: &mut QueryCriteria| Err(SpecError::validation("bad page"))));

    let executed = Arc::new(Mutex::new(false));
    let flag = executed.clone();
    let mut criteria = QueryCriteria::new();
    let err = runner
        .run_with(&mut criteria, |_| async move {
            *flag.lock().unwrap() = true;
            Ok(vec![])
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SpecError::Validation(_)));
    assert!(!*executed.lock().unwrap());
}

#[tokio::test]
async fn test_execution_error_propagates() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner: QueryRunner<i32> = QueryRunner::new().with(Recording {
        label: "a",
        log: log.clone(),
    });

    let mut criteria = QueryCriteria::new();
    let err = runner
        .run_with(&mut criteria, |_| async { Err(SpecError::config("no source")) })
        .await
        .unwrap_err();
    assert!(err.is_config());
    assert_eq!(*log.lock().unwrap(), vec!["pre:a"]);
}

#[test]
fn test_runner_debug_lists_names() {
    let runner: QueryRunner<i32> = QueryRunner::new()
        .with(Pagination::default())
        .with(preprocess_fn(|_: &mut QueryCriteria| Ok(())));
    assert_eq!(runner.len(), 2);
    assert_eq!(format!("{runner:?}"), "[\"pagination\", \"preprocess_fn\"]");
}
