//! The instrumented page: the rendered document plus the debugging snippet's
//! behaviour (toggle, channel to the observer, inspect mode, highlights).

pub mod inspect;

use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

pub use inspect::InspectMode;

use crate::channel::{methods, Channel, ChannelRequest, ChannelTransport, IncomingCall};
use crate::config::{DebuggerConfig, RequestConfig};
use crate::console::Console;
use crate::dom::{find_enclosing_token, parse_html, Document, DomId, HighlightState};
use crate::error::{DebuggerError, DebuggerResult};
use crate::session::SessionStorage;
use crate::types::{HighlightKind, Token};

pub const ACTIVATE_LABEL: &str = "Activate Fusion Debugger";
pub const DEACTIVATE_LABEL: &str = "Deactivate Fusion Debugger";

/// Opens the observer window for a page and hands back the transport to it.
pub trait WindowOpener: Send + Sync {
    fn open(&self, url: &str) -> DebuggerResult<Arc<dyn ChannelTransport>>;
}

/// Everything a page needs from its host.
#[derive(Clone)]
pub struct PageEnvironment {
    pub config: Arc<DebuggerConfig>,
    pub session: Arc<dyn SessionStorage>,
    pub opener: Arc<dyn WindowOpener>,
    pub console: Console,
}

/// Observer URL for a page: the page URL with the debugger argument added.
pub fn remote_url(page_url: &str, request: &RequestConfig) -> String {
    let separator = if page_url.contains('?') { '&' } else { '?' };
    format!("{page_url}{separator}{}=1", request.debugger_argument)
}

/// `scheme://host[:port]` of a URL; the URL itself if it has no scheme.
pub fn origin_of(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    url[..scheme_end + 3 + host_end].to_string()
}

pub struct InstrumentedPage {
    url: String,
    evaluation_trace: String,
    document: Document,
    highlights: HighlightState,
    inspect: InspectMode,
    channel: Option<Channel>,
    env: PageEnvironment,
}

impl InstrumentedPage {
    /// Parse `html` and reopen the channel if the session says the debugger
    /// was active. `evaluation_trace` is the trace JSON the snippet embeds.
    pub async fn load(
        html: &str,
        url: impl Into<String>,
        evaluation_trace: impl Into<String>,
        env: PageEnvironment,
    ) -> DebuggerResult<Self> {
        let mut page = Self {
            url: url.into(),
            evaluation_trace: evaluation_trace.into(),
            document: parse_html(html)?,
            highlights: HighlightState::new(env.config.highlight.clone()),
            inspect: InspectMode::new(env.config.channel.inspect_debounce),
            channel: None,
            env,
        };
        if page.env.session.contains(&page.env.config.channel.session_key) {
            debug!(url = %page.url, "debugger was active, reopening");
            page.open_channel().await?;
        }
        Ok(page)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn highlights(&self) -> &HighlightState {
        &self.highlights
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn is_inspecting(&self) -> bool {
        self.inspect.is_active()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_open() {
            DEACTIVATE_LABEL
        } else {
            ACTIVATE_LABEL
        }
    }

    pub fn origin(&self) -> String {
        origin_of(&self.url)
    }

    /// Open the observer, push the trace to it and start inspecting.
    pub async fn open_channel(&mut self) -> DebuggerResult<()> {
        if self.is_open() {
            return Ok(());
        }
        let config = self.env.config.clone();
        let transport = self
            .env
            .opener
            .open(&remote_url(&self.url, &config.request))?;
        self.env.session.set(&config.channel.session_key, "true");

        let channel = Channel::open(
            transport,
            config.channel.scope.clone(),
            self.origin(),
            self.env.console.clone(),
        );
        for method in methods::PAGE {
            channel.bind(method);
        }
        channel
            .call(&ChannelRequest::UpdateEvaluationTrace(
                self.evaluation_trace.clone(),
            ))
            .await?;
        self.channel = Some(channel);
        self.inspect.activate();
        debug!(url = %self.url, "debugger channel open");
        Ok(())
    }

    /// Close the observer and drop every trace of the session.
    pub async fn close_channel(&mut self) -> DebuggerResult<()> {
        let Some(channel) = self.channel.take() else {
            return Ok(());
        };
        self.env.session.remove(&self.env.config.channel.session_key);
        self.inspect.deactivate();
        self.highlights.clear_all(&mut self.document);
        channel.close().await
    }

    /// The page's activate/deactivate button.
    pub async fn toggle(&mut self) -> DebuggerResult<()> {
        if self.is_open() {
            self.close_channel().await
        } else {
            self.open_channel().await
        }
    }

    /// Apply a request received from the observer.
    pub fn dispatch(&mut self, request: &ChannelRequest) -> DebuggerResult<()> {
        match request {
            ChannelRequest::HighlightElement(token) => {
                self.highlight(*token, HighlightKind::Hover);
            }
            ChannelRequest::SelectElement(token) => {
                self.highlight(*token, HighlightKind::Selected);
            }
            ChannelRequest::UnhighlightElements => {
                self.highlights.clear(&mut self.document, HighlightKind::Hover);
            }
            ChannelRequest::ActivateInspectMode => self.inspect.activate(),
            ChannelRequest::DeactivateInspectMode => self.inspect.deactivate(),
            ChannelRequest::UpdateEvaluationTrace(_) => {
                return Err(DebuggerError::MethodNotFound(request.method().to_string()));
            }
        }
        Ok(())
    }

    /// Wait for the next observer request and apply it. `None` once the
    /// channel is closed or the observer went away.
    pub async fn serve_next(&mut self) -> DebuggerResult<Option<ChannelRequest>> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(None);
        };
        let Some(call) = channel.next_call().await else {
            return Ok(None);
        };
        self.answer(call).await.map(Some)
    }

    /// Apply every request that has already arrived.
    pub async fn serve_pending(&mut self) -> DebuggerResult<usize> {
        let mut served = 0;
        while let Some(call) = self.channel.as_mut().and_then(Channel::try_next_call) {
            self.answer(call).await?;
            served += 1;
        }
        Ok(served)
    }

    async fn answer(&mut self, call: IncomingCall) -> DebuggerResult<ChannelRequest> {
        let result = self.dispatch(&call.request);
        if let Some(channel) = self.channel.as_ref() {
            match &result {
                Ok(()) => channel.acknowledge(&call).await?,
                Err(error) => channel.reject(&call, error).await?,
            }
        }
        result.map(|()| call.request)
    }

    /// Pointer moved onto `target`. The lookup runs once the pointer rested
    /// for the debounce interval; see [`hover_settled`](Self::hover_settled).
    pub fn pointer_moved(&mut self, target: DomId) {
        if self.is_open() {
            self.inspect.pointer_moved(target, Instant::now());
        }
    }

    /// Wait out the debounce, then hover-highlight the token enclosing the
    /// last target and tell the observer.
    pub async fn hover_settled(&mut self) -> DebuggerResult<Option<Token>> {
        match self.inspect.settled().await {
            Some(target) => self.hover(target).await,
            None => Ok(None),
        }
    }

    /// Non-blocking variant of [`hover_settled`](Self::hover_settled).
    pub async fn poll_hover(&mut self) -> DebuggerResult<Option<Token>> {
        match self.inspect.poll(Instant::now()) {
            Some(target) => self.hover(target).await,
            None => Ok(None),
        }
    }

    async fn hover(&mut self, target: DomId) -> DebuggerResult<Option<Token>> {
        self.resolve_and_send(target, HighlightKind::Hover).await
    }

    /// Click on `target` while inspecting: select its enclosing token here
    /// and in the observer.
    pub async fn clicked(&mut self, target: DomId) -> DebuggerResult<Option<Token>> {
        if !self.is_open() || !self.inspect.is_active() {
            return Ok(None);
        }
        self.resolve_and_send(target, HighlightKind::Selected).await
    }

    async fn resolve_and_send(
        &mut self,
        target: DomId,
        kind: HighlightKind,
    ) -> DebuggerResult<Option<Token>> {
        let Some(token) = find_enclosing_token(&self.document, target, &self.env.console) else {
            return Ok(None);
        };
        self.highlight(token, kind);
        if let Some(channel) = self.channel.as_ref() {
            let request = match kind {
                HighlightKind::Hover => ChannelRequest::HighlightElement(token),
                HighlightKind::Selected => ChannelRequest::SelectElement(token),
            };
            channel.call(&request).await?;
        }
        Ok(Some(token))
    }

    fn highlight(&mut self, token: Token, kind: HighlightKind) -> usize {
        self.highlights
            .apply(&mut self.document, token, kind, &self.env.console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LocalTransport;
    use crate::console::{LogLevel, MemorySink};
    use crate::session::MemorySessionStorage;
    use std::sync::Mutex;
    use std::time::Duration;

    const HTML: &str = "<html><body>\
        <!--BEGIN_1--><div id=\"outer\"><!--BEGIN_2--><p id=\"inner\">hi</p><!--END_2--></div><!--END_1-->\
        <span id=\"plain\">x</span></body></html>";
    const URL: &str = "http://localhost:8081/en/home.html";

    /// Hands out one end of a local pair per open and keeps the other.
    #[derive(Default)]
    struct PairOpener {
        urls: Mutex<Vec<String>>,
        observers: Mutex<Vec<LocalTransport>>,
    }

    impl PairOpener {
        fn observer(&self) -> Arc<dyn ChannelTransport> {
            Arc::new(self.observers.lock().unwrap().remove(0))
        }
    }

    impl WindowOpener for PairOpener {
        fn open(&self, url: &str) -> DebuggerResult<Arc<dyn ChannelTransport>> {
            let (page, observer) = LocalTransport::pair();
            self.urls.lock().unwrap().push(url.to_string());
            self.observers.lock().unwrap().push(observer);
            Ok(Arc::new(page))
        }
    }

    struct Fixture {
        env: PageEnvironment,
        opener: Arc<PairOpener>,
        session: MemorySessionStorage,
        sink: Arc<MemorySink>,
    }

    fn fixture() -> Fixture {
        let opener = Arc::new(PairOpener::default());
        let session = MemorySessionStorage::new();
        let sink = Arc::new(MemorySink::new());
        let env = PageEnvironment {
            config: Arc::new(DebuggerConfig::default()),
            session: Arc::new(session.clone()),
            opener: opener.clone(),
            console: Console::new().with_sink(sink.clone()),
        };
        Fixture {
            env,
            opener,
            session,
            sink,
        }
    }

    fn observer_channel(opener: &PairOpener) -> Channel {
        let channel = Channel::open(
            opener.observer(),
            "neos-fusion-debugger",
            "http://localhost:8081",
            Console::new(),
        );
        for method in methods::OBSERVER {
            channel.bind(method);
        }
        channel
    }

    fn element(page: &InstrumentedPage, id: &str) -> DomId {
        page.document().element_by_id(id).unwrap()
    }

    #[test]
    fn url_helpers() {
        let request = RequestConfig::default();
        assert_eq!(
            remote_url(URL, &request),
            "http://localhost:8081/en/home.html?__neos-fusion-debugger=1"
        );
        assert_eq!(
            remote_url("http://h/p?a=1", &request),
            "http://h/p?a=1&__neos-fusion-debugger=1"
        );
        assert_eq!(origin_of(URL), "http://localhost:8081");
        assert_eq!(origin_of("https://example.com"), "https://example.com");
        assert_eq!(origin_of("https://example.com?x=1"), "https://example.com");
        assert_eq!(origin_of("about:blank"), "about:blank");
    }

    #[tokio::test]
    async fn open_pushes_trace_and_starts_inspecting() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{\"fullPath\":\"page\"}", f.env.clone())
            .await
            .unwrap();
        assert!(!page.is_open());
        assert_eq!(page.button_label(), ACTIVATE_LABEL);

        page.toggle().await.unwrap();
        assert!(page.is_open());
        assert!(page.is_inspecting());
        assert_eq!(page.button_label(), DEACTIVATE_LABEL);
        assert!(f.session.contains("neos-fusion-debugger-active"));
        assert_eq!(
            *f.opener.urls.lock().unwrap(),
            vec!["http://localhost:8081/en/home.html?__neos-fusion-debugger=1".to_string()]
        );

        let mut observer = observer_channel(&f.opener);
        let call = observer.next_call().await.unwrap();
        assert_eq!(
            call.request,
            ChannelRequest::UpdateEvaluationTrace("{\"fullPath\":\"page\"}".into())
        );
    }

    #[tokio::test]
    async fn load_reopens_when_session_flag_set() {
        let f = fixture();
        f.session.set("neos-fusion-debugger-active", "true");
        let page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        assert!(page.is_open());
        assert!(page.is_inspecting());
    }

    #[tokio::test]
    async fn close_clears_flag_highlights_and_inspect() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        page.open_channel().await.unwrap();
        page.dispatch(&ChannelRequest::SelectElement(2)).unwrap();
        page.dispatch(&ChannelRequest::HighlightElement(1)).unwrap();
        assert_eq!(page.highlights().marked(HighlightKind::Selected).len(), 1);

        page.toggle().await.unwrap();
        assert!(!page.is_open());
        assert!(!page.is_inspecting());
        assert!(!f.session.contains("neos-fusion-debugger-active"));
        assert!(page.highlights().marked(HighlightKind::Selected).is_empty());
        assert!(page.highlights().marked(HighlightKind::Hover).is_empty());
        let inner = element(&page, "inner");
        assert_eq!(page.document().attribute(inner, "class"), Some(""));
    }

    #[tokio::test]
    async fn dispatch_applies_observer_requests() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        let inner = element(&page, "inner");
        let outer = element(&page, "outer");

        page.dispatch(&ChannelRequest::HighlightElement(2)).unwrap();
        assert!(page.document().has_class(inner, "neos-fusion-debugger-highlighted"));
        page.dispatch(&ChannelRequest::HighlightElement(1)).unwrap();
        assert!(!page.document().has_class(inner, "neos-fusion-debugger-highlighted"));
        assert!(page.document().has_class(outer, "neos-fusion-debugger-highlighted"));
        page.dispatch(&ChannelRequest::UnhighlightElements).unwrap();
        assert!(!page.document().has_class(outer, "neos-fusion-debugger-highlighted"));

        page.dispatch(&ChannelRequest::ActivateInspectMode).unwrap();
        assert!(page.is_inspecting());
        page.dispatch(&ChannelRequest::DeactivateInspectMode).unwrap();
        assert!(!page.is_inspecting());

        assert!(matches!(
            page.dispatch(&ChannelRequest::UpdateEvaluationTrace("{}".into())),
            Err(DebuggerError::MethodNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_token_warns_on_console() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        page.dispatch(&ChannelRequest::SelectElement(99)).unwrap();
        assert_eq!(f.sink.at_level(LogLevel::Warn).len(), 1);
        assert!(page.highlights().marked(HighlightKind::Selected).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hover_is_debounced_and_forwarded() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        page.open_channel().await.unwrap();
        let mut observer = observer_channel(&f.opener);
        observer.next_call().await.unwrap();

        let inner_text = page.document().children(element(&page, "inner"))[0];
        let plain = element(&page, "plain");
        page.pointer_moved(plain);
        tokio::time::advance(Duration::from_millis(5)).await;
        page.pointer_moved(inner_text);
        assert_eq!(page.poll_hover().await.unwrap(), None);

        assert_eq!(page.hover_settled().await.unwrap(), Some(2));
        assert!(page
            .document()
            .has_class(element(&page, "inner"), "neos-fusion-debugger-highlighted"));
        let call = observer.next_call().await.unwrap();
        assert_eq!(call.request, ChannelRequest::HighlightElement(2));
    }

    #[tokio::test]
    async fn click_selects_and_forwards() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        let outer = element(&page, "outer");
        assert_eq!(page.clicked(outer).await.unwrap(), None);

        page.open_channel().await.unwrap();
        let mut observer = observer_channel(&f.opener);
        observer.next_call().await.unwrap();

        assert_eq!(page.clicked(outer).await.unwrap(), Some(1));
        assert!(page.document().has_class(outer, "neos-fusion-debugger-selected"));
        let call = observer.next_call().await.unwrap();
        assert_eq!(call.request, ChannelRequest::SelectElement(1));

        // Outside any span: nothing happens.
        let plain = element(&page, "plain");
        assert_eq!(page.clicked(plain).await.unwrap(), None);
        assert!(page.document().has_class(outer, "neos-fusion-debugger-selected"));
    }

    #[tokio::test]
    async fn serves_and_acknowledges_observer_calls() {
        let f = fixture();
        let mut page = InstrumentedPage::load(HTML, URL, "{}", f.env.clone()).await.unwrap();
        page.open_channel().await.unwrap();
        let observer = observer_channel(&f.opener);

        let ack = observer.call(&ChannelRequest::SelectElement(2)).await.unwrap();
        assert_eq!(
            page.serve_next().await.unwrap(),
            Some(ChannelRequest::SelectElement(2))
        );
        assert!(ack.received().await.unwrap().is_ok());
        assert!(page
            .document()
            .has_class(element(&page, "inner"), "neos-fusion-debugger-selected"));

        observer
            .notify(&ChannelRequest::DeactivateInspectMode)
            .await
            .unwrap();
        while page.serve_pending().await.unwrap() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!page.is_inspecting());
    }
}
