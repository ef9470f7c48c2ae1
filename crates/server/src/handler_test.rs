use super::*;

use parking_lot::Mutex;

type Calls = Arc<Mutex<Vec<String>>>;

enum Behavior {
    Ok,
    Fail,
    Panic,
}

struct Probe {
    name: &'static str,
    behavior: Behavior,
    calls: Calls,
}

impl Probe {
    fn new(name: &'static str, behavior: Behavior, calls: &Calls) -> Arc<dyn EventHandler> {
        Arc::new(Self {
            name,
            behavior,
            calls: Arc::clone(calls),
        })
    }
}

#[async_trait]
impl EventHandler for Probe {
    fn name(&self) -> &str {
        self.name
    }

    async fn initialize(&self, server: &str) {
        self.calls.lock().push(format!("{}:init:{server}", self.name));
    }

    async fn session_opened(&self, session: &SessionInfo) {
        self.calls
            .lock()
            .push(format!("{}:open:{}", self.name, session.id));
    }

    async fn event(
        &self,
        _session: &SessionInfo,
        event: &StructuredEvent,
    ) -> Result<(), HandlerError> {
        self.calls
            .lock()
            .push(format!("{}:event:{}", self.name, event.message));
        match self.behavior {
            Behavior::Ok => Ok(()),
            Behavior::Fail => Err(HandlerError::new("rejected")),
            Behavior::Panic => panic!("handler bug"),
        }
    }

    async fn session_closed(&self, session: &SessionInfo) {
        self.calls
            .lock()
            .push(format!("{}:close:{}", self.name, session.id));
    }

    async fn destroy(&self, server: &str) {
        self.calls
            .lock()
            .push(format!("{}:destroy:{server}", self.name));
    }
}

fn session() -> SessionInfo {
    SessionInfo {
        id: 7,
        server: Arc::from("tcp"),
        peer: "127.0.0.1:40000".into(),
    }
}

#[tokio::test]
async fn test_lifecycle_order() {
    let calls = Calls::default();
    let set = HandlerSet::new();
    set.add(Probe::new("a", Behavior::Ok, &calls));
    set.add(Probe::new("b", Behavior::Ok, &calls));
    let metrics = ServerMetrics::new();
    let session = session();

    set.initialize("tcp", &metrics).await;
    set.session_opened(&session, &metrics).await;
    set.dispatch(&session, &StructuredEvent::raw("hello"), &metrics)
        .await;
    set.session_closed(&session, &metrics).await;
    set.destroy("tcp", &metrics).await;

    assert_eq!(
        *calls.lock(),
        vec![
            "a:init:tcp",
            "b:init:tcp",
            "a:open:7",
            "b:open:7",
            "a:event:hello",
            "b:event:hello",
            "a:close:7",
            "b:close:7",
            "a:destroy:tcp",
            "b:destroy:tcp",
        ]
    );
    assert_eq!(metrics.snapshot().handler_errors, 0);
}

#[tokio::test]
async fn test_failures_and_panics_isolated() {
    let calls = Calls::default();
    let set = HandlerSet::new();
    set.add(Probe::new("failing", Behavior::Fail, &calls));
    set.add(Probe::new("panicking", Behavior::Panic, &calls));
    set.add(Probe::new("ok", Behavior::Ok, &calls));
    let metrics = ServerMetrics::new();

    set.dispatch(&session(), &StructuredEvent::raw("x"), &metrics)
        .await;

    assert_eq!(
        *calls.lock(),
        vec!["failing:event:x", "panicking:event:x", "ok:event:x"]
    );
    assert_eq!(metrics.snapshot().handler_errors, 2);
}

#[test]
fn test_add_remove() {
    let calls = Calls::default();
    let set = HandlerSet::new();
    set.add(Probe::new("a", Behavior::Ok, &calls));
    set.add(Probe::new("b", Behavior::Ok, &calls));

    let shared = set.clone();
    assert!(shared.remove("a"));
    assert!(!shared.remove("a"));
    assert_eq!(set.names(), vec!["b"]);

    set.clear();
    assert!(shared.is_empty());
}

#[tokio::test]
async fn test_channel_handler() {
    let (handler, mut rx) = ChannelEventHandler::new(4);
    let session = session();

    handler
        .event(&session, &StructuredEvent::raw("queued"))
        .await
        .unwrap();
    let received = rx.recv().await.unwrap();
    assert_eq!(received.session, session);
    assert_eq!(received.event.message, "queued");

    drop(rx);
    assert!(
        handler
            .event(&session, &StructuredEvent::raw("lost"))
            .await
            .is_err()
    );
}
