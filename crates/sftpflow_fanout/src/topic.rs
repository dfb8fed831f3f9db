use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sftpflow_contract::SnsMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

#[async_trait]
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &SnsMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RedeliveryPolicy {
    /// Total attempts per message, the first delivery included.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionReport {
    pub subscriber: String,
    pub delivered: usize,
    pub redeliveries: usize,
    pub dead_letters: Vec<SnsMessage>,
}

struct Subscription {
    name: String,
    sender: mpsc::UnboundedSender<SnsMessage>,
    worker: JoinHandle<SubscriptionReport>,
}

/// A pub/sub topic. Each subscription has its own queue and worker task, so a
/// subscriber that is slow or failing never holds up delivery to the others.
pub struct Topic {
    arn: String,
    policy: RedeliveryPolicy,
    subscriptions: Vec<Subscription>,
}

impl Topic {
    pub fn new(arn: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            policy: RedeliveryPolicy::default(),
            subscriptions: Vec::new(),
        }
    }

    /// Applies to subscriptions added afterwards.
    pub fn with_policy(mut self, policy: RedeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Must be called from within a tokio runtime.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let name = subscriber.name().to_string();
        let worker = tokio::spawn(run_subscription(subscriber, self.policy, receiver));
        info!(topic = %self.arn, subscriber = %name, "subscription added");
        self.subscriptions.push(Subscription {
            name,
            sender,
            worker,
        });
    }

    /// Queue `message` for every subscriber and return its message id.
    pub fn publish(&self, subject: Option<&str>, message: String) -> String {
        let message_id = Uuid::now_v7().to_string();
        let envelope = SnsMessage {
            message_id: Some(message_id.clone()),
            topic_arn: Some(self.arn.clone()),
            subject: subject.map(str::to_owned),
            timestamp: Some(Utc::now()),
            message,
        };

        for subscription in &self.subscriptions {
            if subscription.sender.send(envelope.clone()).is_err() {
                warn!(
                    subscriber = %subscription.name,
                    message_id = %message_id,
                    "subscription worker stopped, message dropped"
                );
            }
        }
        message_id
    }

    /// Close every queue, wait for the workers to drain them and return their reports.
    pub async fn shutdown(self) -> Vec<SubscriptionReport> {
        let mut reports = Vec::with_capacity(self.subscriptions.len());
        for Subscription {
            name,
            sender,
            worker,
        } in self.subscriptions
        {
            drop(sender);
            match worker.await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(subscriber = %name, error = %err, "subscription worker panicked");
                    reports.push(SubscriptionReport {
                        subscriber: name,
                        ..SubscriptionReport::default()
                    });
                }
            }
        }
        reports
    }
}

async fn run_subscription(
    subscriber: Arc<dyn Subscriber>,
    policy: RedeliveryPolicy,
    mut receiver: mpsc::UnboundedReceiver<SnsMessage>,
) -> SubscriptionReport {
    let mut report = SubscriptionReport {
        subscriber: subscriber.name().to_string(),
        ..SubscriptionReport::default()
    };
    let max_attempts = policy.max_attempts.max(1);

    while let Some(message) = receiver.recv().await {
        let message_id = message.message_id.clone().unwrap_or_default();
        let mut attempt = 1;
        loop {
            match subscriber.deliver(&message).await {
                Ok(()) => {
                    report.delivered += 1;
                    break;
                }
                Err(err) if attempt < max_attempts => {
                    warn!(
                        subscriber = %report.subscriber,
                        message_id = %message_id,
                        attempt,
                        error = %err,
                        "delivery failed, will redeliver"
                    );
                    report.redeliveries += 1;
                    attempt += 1;
                    tokio::time::sleep(policy.backoff).await;
                }
                Err(err) => {
                    error!(
                        subscriber = %report.subscriber,
                        message_id = %message_id,
                        attempts = attempt,
                        error = %err,
                        "delivery failed, dead-lettering message"
                    );
                    report.dead_letters.push(message);
                    break;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{RedeliveryPolicy, Subscriber, Topic};
    use async_trait::async_trait;
    use sftpflow_contract::SnsMessage;
    use tokio::sync::Mutex;

    struct Recorder {
        name: String,
        delay: Duration,
        failures_left: AtomicUsize,
        received: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(name: &str, delay: Duration, failures: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay,
                failures_left: AtomicUsize::new(failures),
                received: Mutex::new(Vec::new()),
            })
        }

        async fn received(&self) -> Vec<String> {
            self.received.lock().await.clone()
        }
    }

    #[async_trait]
    impl Subscriber for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, message: &SnsMessage) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("subscriber offline");
            }
            self.received.lock().await.push(message.message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_subscriber_gets_every_message() {
        let first = Recorder::new("first", Duration::ZERO, 0);
        let second = Recorder::new("second", Duration::ZERO, 0);
        let mut topic = Topic::new("arn:aws:sns:local:000000000000:uploads");
        topic.subscribe(first.clone());
        topic.subscribe(second.clone());

        let id_a = topic.publish(None, "a".to_string());
        let id_b = topic.publish(Some("upload"), "b".to_string());
        assert_ne!(id_a, id_b);

        let reports = topic.shutdown().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|report| report.delivered == 2));
        assert_eq!(first.received().await, vec!["a", "b"]);
        assert_eq!(second.received().await, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_subscriber_is_redelivered_then_dead_lettered() {
        let flaky = Recorder::new("flaky", Duration::ZERO, 1);
        let broken = Recorder::new("broken", Duration::ZERO, usize::MAX);
        let healthy = Recorder::new("healthy", Duration::ZERO, 0);

        let mut topic = Topic::new("arn:aws:sns:local:000000000000:uploads").with_policy(
            RedeliveryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(50),
            },
        );
        topic.subscribe(flaky.clone());
        topic.subscribe(broken.clone());
        topic.subscribe(healthy.clone());
        topic.publish(None, "payload".to_string());

        let reports = topic.shutdown().await;
        let flaky_report = &reports[0];
        assert_eq!((flaky_report.delivered, flaky_report.redeliveries), (1, 1));

        let broken_report = &reports[1];
        assert_eq!(broken_report.delivered, 0);
        assert_eq!(broken_report.redeliveries, 2);
        assert_eq!(broken_report.dead_letters.len(), 1);
        assert_eq!(broken_report.dead_letters[0].message, "payload");

        assert_eq!(healthy.received().await, vec!["payload"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_subscriber_does_not_block_others() {
        let slow = Recorder::new("slow", Duration::from_secs(10), 0);
        let fast = Recorder::new("fast", Duration::ZERO, 0);
        let mut topic = Topic::new("arn:aws:sns:local:000000000000:uploads");
        topic.subscribe(slow.clone());
        topic.subscribe(fast.clone());

        for body in ["1", "2", "3"] {
            topic.publish(None, body.to_string());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(fast.received().await, vec!["1", "2", "3"]);
        assert!(slow.received().await.is_empty());

        let reports = topic.shutdown().await;
        assert_eq!(reports[0].delivered, 3);
        assert_eq!(slow.received().await.len(), 3);
    }
}
