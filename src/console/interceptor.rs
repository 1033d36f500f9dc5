// tui-devconsole/src/console/interceptor.rs
//! Capture of the host's `INFO`, `WARN` and `ERROR` tracing events.
//!
//! Capture goes through [`ConsoleLayer`], a `tracing_subscriber` layer that
//! sits in the process-wide subscriber next to the host's own layers. The
//! layer forwards to whichever [`LogInterceptor`] is currently installed, so
//! events from every thread and runtime task reach the console while it is
//! open and nothing does once the interceptor is restored or dropped.
//!
//! Hosts that set up their own global subscriber add [`console_layer`] to
//! it. When nothing has been set globally by the time the first interceptor
//! is installed, a registry carrying only the console layer is installed.

use std::{
    fmt,
    sync::{
        LazyLock, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{
    Event, Subscriber, dispatcher,
    field::{Field, Visit},
};
use tracing_subscriber::{
    layer::{Context, Layer, SubscriberExt},
    registry,
};

use super::{Category, FilterState, Message};

/// Whether messages are filtered when they are captured or only when they
/// are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Store everything; the filter only decides what is shown.
    #[default]
    All,
    /// Store only messages matching the filter active when they are emitted.
    /// Anything else is gone for good, even after switching back to "all".
    MatchingFilter,
}

/// Where intercepted messages go.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: mpsc::UnboundedSender<Message>,
    filter: watch::Receiver<FilterState>,
    mode: CaptureMode,
}

impl CaptureSink {
    pub fn new(
        tx: mpsc::UnboundedSender<Message>,
        filter: watch::Receiver<FilterState>,
        mode: CaptureMode,
    ) -> Self {
        Self { tx, filter, mode }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Returns whether the message was forwarded.
    pub fn capture(&self, category: Category, payload: String) -> bool {
        if self.mode == CaptureMode::MatchingFilter && !self.filter.borrow().admits(category) {
            return false;
        }
        self.tx.send(Message::new(category, payload)).is_ok()
    }
}

/// Installed sinks, most recent last. Only the last one receives messages.
static CAPTURE_SLOT: LazyLock<RwLock<Vec<(u64, CaptureSink)>>> =
    LazyLock::new(|| RwLock::new(Vec::new()));

static NEXT_INSTALL: AtomicU64 = AtomicU64::new(1);

/// Forwards console-level events to the installed [`LogInterceptor`].
///
/// The layer has no filter of its own. Filters the host attaches to its
/// other layers (`Layer::with_filter`) do not affect what the console sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLayer {
    _private: (),
}

/// The layer to add to a host subscriber so the console can capture it.
pub fn console_layer() -> ConsoleLayer {
    ConsoleLayer::default()
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(category) = Category::from_level(event.metadata().level()) else {
            return;
        };
        let slot = CAPTURE_SLOT.read().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, sink)) = slot.last() {
            let mut payload = PayloadVisitor::default();
            event.record(&mut payload);
            sink.capture(category, payload.finish());
        }
    }
}

/// Builds a single-line payload: the `message` field first, then every
/// other field as `key=value`.
#[derive(Default)]
struct PayloadVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl PayloadVisitor {
    fn finish(self) -> String {
        self.message.into_iter().chain(self.fields).join(" ")
    }
}

impl Visit for PayloadVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

/// Owned interception of the process's logging. Capture stops when the
/// handle is restored or dropped.
///
/// When several interceptors are installed the newest one captures;
/// restoring it hands capture back to the one installed before it.
#[derive(Debug, Default)]
pub struct LogInterceptor {
    id: Option<u64>,
}

impl LogInterceptor {
    pub fn install(sink: CaptureSink) -> Self {
        if !dispatcher::has_been_set() {
            let subscriber = registry().with(console_layer());
            if tracing::subscriber::set_global_default(subscriber).is_ok() {
                tracing::debug!("console subscriber installed globally");
            }
        }
        let id = NEXT_INSTALL.fetch_add(1, Ordering::Relaxed);
        CAPTURE_SLOT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, sink));
        tracing::debug!(id, "console log interception installed");
        Self { id: Some(id) }
    }

    /// A handle that intercepts nothing.
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.id.is_some()
    }

    /// Stops this handle's capture. Safe to call any number of times;
    /// returns whether anything was restored.
    pub fn restore(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        CAPTURE_SLOT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(installed, _)| *installed != id);
        tracing::debug!(id, "console log interception restored");
        true
    }
}

impl Drop for LogInterceptor {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Serialises tests that install interceptors, since capture is
/// process-wide.
#[cfg(test)]
pub(crate) fn capture_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use tracing::{debug, error, info, warn};
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Harness {
        rx: mpsc::UnboundedReceiver<Message>,
        filter_tx: watch::Sender<FilterState>,
        sink: CaptureSink,
    }

    fn harness(mode: CaptureMode) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let (filter_tx, filter_rx) = watch::channel(FilterState::All);
        Harness {
            rx,
            filter_tx,
            sink: CaptureSink::new(tx, filter_rx, mode),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<(Category, String)> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push((message.category(), message.payload().to_string()));
        }
        out
    }

    #[test]
    fn captures_the_three_levels_only() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::All);
        let _interceptor = LogInterceptor::install(h.sink.clone());

        info!("hello");
        warn!("careful");
        error!("broken");
        debug!("noise");

        assert_eq!(
            drain(&mut h.rx),
            vec![
                (Category::Log, "hello".to_string()),
                (Category::Warn, "careful".to_string()),
                (Category::Error, "broken".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn captures_from_tasks_and_other_threads() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::All);
        let mut interceptor = LogInterceptor::install(h.sink.clone());

        info!("from installing thread");
        tokio::spawn(async { info!("from a runtime task") })
            .await
            .unwrap();
        std::thread::spawn(|| warn!("from a plain thread"))
            .join()
            .unwrap();

        assert_eq!(
            drain(&mut h.rx),
            vec![
                (Category::Log, "from installing thread".to_string()),
                (Category::Log, "from a runtime task".to_string()),
                (Category::Warn, "from a plain thread".to_string()),
            ]
        );

        interceptor.restore();
        std::thread::spawn(|| error!("after restore")).join().unwrap();
        assert!(drain(&mut h.rx).is_empty());
    }

    #[test]
    fn host_logging_still_receives_every_event() {
        let _capture = capture_lock();
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let host = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish()
            .with(console_layer());
        let _host = tracing::subscriber::set_default(host);

        let mut h = harness(CaptureMode::All);
        let mut interceptor = LogInterceptor::install(h.sink.clone());
        info!("passed through");
        assert!(buf.contents().contains("passed through"));
        assert_eq!(drain(&mut h.rx).len(), 1);

        assert!(interceptor.restore());
        info!("after restore");
        assert!(buf.contents().contains("after restore"));
        assert!(drain(&mut h.rx).is_empty());
    }

    #[test]
    fn host_layer_filters_do_not_limit_capture() {
        let _capture = capture_lock();
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let host = registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(move || writer.clone())
                    .with_ansi(false)
                    .with_filter(LevelFilter::WARN),
            )
            .with(console_layer());
        let _host = tracing::subscriber::set_default(host);

        let mut h = harness(CaptureMode::All);
        let _interceptor = LogInterceptor::install(h.sink.clone());
        info!("console only");
        warn!("both");

        let host_output = buf.contents();
        assert!(!host_output.contains("console only"));
        assert!(host_output.contains("both"));
        assert_eq!(
            drain(&mut h.rx),
            vec![
                (Category::Log, "console only".to_string()),
                (Category::Warn, "both".to_string()),
            ]
        );
    }

    #[test]
    fn restore_is_idempotent_and_safe_without_install() {
        let _capture = capture_lock();
        let mut never = LogInterceptor::inactive();
        assert!(!never.restore());
        assert!(!never.restore());

        let h = harness(CaptureMode::All);
        let mut interceptor = LogInterceptor::install(h.sink.clone());
        assert!(interceptor.is_installed());
        assert!(interceptor.restore());
        assert!(!interceptor.restore());
        assert!(!interceptor.is_installed());
    }

    #[test]
    fn dropping_the_handle_stops_capture() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::All);
        {
            let _interceptor = LogInterceptor::install(h.sink.clone());
            info!("inside");
        }
        info!("outside");
        assert_eq!(drain(&mut h.rx), vec![(Category::Log, "inside".to_string())]);
    }

    #[test]
    fn newest_interceptor_captures_until_restored() {
        let _capture = capture_lock();
        let mut outer = harness(CaptureMode::All);
        let mut inner = harness(CaptureMode::All);
        let _outer = LogInterceptor::install(outer.sink.clone());
        let mut nested = LogInterceptor::install(inner.sink.clone());

        info!("nested");
        nested.restore();
        info!("outer again");

        assert_eq!(drain(&mut inner.rx), vec![(Category::Log, "nested".to_string())]);
        assert_eq!(
            drain(&mut outer.rx),
            vec![(Category::Log, "outer again".to_string())]
        );
    }

    #[test]
    fn matching_filter_mode_drops_at_capture_time() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::MatchingFilter);
        let _interceptor = LogInterceptor::install(h.sink.clone());

        info!("hello");
        h.filter_tx.send_replace(FilterState::Only(Category::Error));
        info!("world");
        error!("kept");

        assert_eq!(
            drain(&mut h.rx),
            vec![
                (Category::Log, "hello".to_string()),
                (Category::Error, "kept".to_string()),
            ]
        );
    }

    #[test]
    fn all_mode_ignores_the_filter() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::All);
        let _interceptor = LogInterceptor::install(h.sink.clone());
        h.filter_tx.send_replace(FilterState::Only(Category::Error));
        info!("still stored");
        assert_eq!(drain(&mut h.rx).len(), 1);
    }

    #[test]
    fn fields_follow_the_message() {
        let _capture = capture_lock();
        let mut h = harness(CaptureMode::All);
        let _interceptor = LogInterceptor::install(h.sink.clone());
        info!(user = "ada", attempts = 3, "login");
        assert_eq!(
            drain(&mut h.rx),
            vec![(Category::Log, "login user=ada attempts=3".to_string())]
        );
    }
}
