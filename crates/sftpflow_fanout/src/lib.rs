//! In-process stand-in for the bucket → topic → subscribers fan-out.

pub mod notifier;
pub mod subscribers;
pub mod topic;

pub use notifier::BucketNotifier;
pub use subscribers::{ArchiveSubscriber, Email, EmailSubscriber, MailTransport, RecordingMailTransport};
pub use topic::{RedeliveryPolicy, Subscriber, SubscriptionReport, Topic};
