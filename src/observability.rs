use biometrics::{Collector, Counter};

pub(crate) static PUBLISH_REQUESTS: Counter = Counter::new("reelpost.publish.requests");
pub(crate) static PUBLISH_ERRORS: Counter = Counter::new("reelpost.publish.errors");

pub(crate) static TOKEN_EXCHANGES: Counter = Counter::new("reelpost.auth.token_exchanges");
pub(crate) static TOKEN_REFRESHES: Counter = Counter::new("reelpost.auth.token_refreshes");
pub(crate) static AUTH_FLOWS_STARTED: Counter = Counter::new("reelpost.auth.flows_started");

pub(crate) static CALLBACK_REQUESTS: Counter = Counter::new("reelpost.listener.requests");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&PUBLISH_REQUESTS);
    collector.register_counter(&PUBLISH_ERRORS);

    collector.register_counter(&TOKEN_EXCHANGES);
    collector.register_counter(&TOKEN_REFRESHES);
    collector.register_counter(&AUTH_FLOWS_STARTED);

    collector.register_counter(&CALLBACK_REQUESTS);
}
