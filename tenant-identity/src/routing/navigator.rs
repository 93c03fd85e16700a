use std::sync::RwLock;

/// Where redirects go. The embedding application decides what "navigating"
/// means; the identity core only names the destination.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Navigator for headless clients: remembers the last destination and logs it.
#[derive(Debug, Default)]
pub struct LoggingNavigator {
    current: RwLock<Option<String>>,
}

impl LoggingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Navigator for LoggingNavigator {
    fn navigate(&self, url: &str) {
        tracing::info!(destination = %url, "Navigating");
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(url.to_string());
    }
}
