use std::sync::Arc;
use std::time::Duration;

use sftpflow_archive::ArchiveMover;
use sftpflow_fanout::{
    ArchiveSubscriber, BucketNotifier, EmailSubscriber, RecordingMailTransport, RedeliveryPolicy,
    Topic,
};
use sftpflow_providers::InMemoryObjectStore;

const TOPIC_ARN: &str = "arn:aws:sns:local:000000000000:sftp-uploads";

struct Pipeline {
    store: Arc<InMemoryObjectStore>,
    mail: Arc<RecordingMailTransport>,
    notifier: BucketNotifier,
    topic: Topic,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(InMemoryObjectStore::new());
    let mail = Arc::new(RecordingMailTransport::new());
    let mut topic = Topic::new(TOPIC_ARN).with_policy(RedeliveryPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
    });
    topic.subscribe(Arc::new(EmailSubscriber::new(
        vec!["ops@example.com".to_string()],
        mail.clone(),
    )));
    topic.subscribe(Arc::new(ArchiveSubscriber::new(ArchiveMover::new(
        store.clone(),
        "archive",
    ))));

    Pipeline {
        notifier: BucketNotifier::new("src", store.clone()),
        store,
        mail,
        topic,
    }
}

#[tokio::test]
async fn uploads_are_mailed_and_archived() {
    let Pipeline {
        store,
        mail,
        notifier,
        topic,
    } = pipeline();

    notifier
        .put_object(&topic, "home/alice/file 1.txt", b"first".to_vec())
        .await
        .expect("upload");
    notifier
        .put_object(&topic, "home/bob/a+b 100%.csv", b"second".to_vec())
        .await
        .expect("upload");

    let reports = topic.shutdown().await;
    for report in &reports {
        assert_eq!(report.delivered, 2, "{}", report.subscriber);
        assert!(report.dead_letters.is_empty());
    }

    assert!(store.list_keys("src").await.is_empty());
    assert_eq!(
        store.get_object("archive", "home/alice/file 1.txt").await,
        Some(b"first".to_vec())
    );
    assert_eq!(
        store.get_object("archive", "home/bob/a+b 100%.csv").await,
        Some(b"second".to_vec())
    );

    let sent = mail.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body.contains("home/alice/file 1.txt"));
}

#[tokio::test]
async fn archive_failure_does_not_affect_email_delivery() {
    let Pipeline {
        store,
        mail,
        notifier,
        topic,
    } = pipeline();
    store.fail_copy("home/alice/locked.txt").await;

    notifier
        .put_object(&topic, "home/alice/locked.txt", b"data".to_vec())
        .await
        .expect("upload");

    let reports = topic.shutdown().await;
    let archive = reports
        .iter()
        .find(|report| report.subscriber == "archive")
        .expect("archive report");
    assert_eq!(archive.redeliveries, 1);
    assert_eq!(archive.dead_letters.len(), 1);

    assert!(store.contains("src", "home/alice/locked.txt").await);
    assert_eq!(mail.sent().await.len(), 1);
}
