//! Pre/post logging stage.

use tracing::info;

use crate::error::BoxError;
use crate::exchange::Exchange;
use crate::filter::{Filter, Outcome};

/// Logs `pre-filter executed` before delegating and `post-filter executed`
/// once the inner call has settled. Never fails.
///
/// ```rust
/// use tollgate::{FilterRegistry, middleware::log::LogFilter};
///
/// let filters = FilterRegistry::new()
///     .with(LogFilter::new("second-global"), 1)
///     .with(LogFilter::new("third-global"), 2)
///     .with(LogFilter::new("fourth-global"), 3);
/// ```
pub struct LogFilter {
    name: String,
}

impl LogFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Filter for LogFilter {
    fn name(&self) -> &str { &self.name }

    fn pre(&self, exchange: &mut Exchange) -> Result<(), BoxError> {
        info!(stage = %self.name, exchange = exchange.id(), "pre-filter executed");
        Ok(())
    }

    fn post(&self, exchange: &mut Exchange, outcome: Outcome) -> Result<(), BoxError> {
        info!(stage = %self.name, exchange = exchange.id(), ?outcome, "post-filter executed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use http::Method;

    use super::*;
    use crate::{BoxError, Executor, FilterRegistry};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .filter(|l| l.contains("filter executed"))
                .map(str::to_owned)
                .collect()
        }
    }

    #[tokio::test]
    async fn logs_pre_and_post_in_onion_order() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let executor = Executor::new(FilterRegistry::new()
            .with(LogFilter::new("outer"), 1)
            .with(LogFilter::new("inner"), 2));
        let handler = |_: &mut Exchange| async { Ok::<_, BoxError>(()) };

        let mut ex = Exchange::new(Method::GET, "/orders");
        executor.execute(&mut ex, &handler).await.unwrap();

        let lines = capture.lines();
        assert_eq!(lines.len(), 4, "{lines:#?}");

        let expected = [
            ("pre-filter executed", "stage=outer"),
            ("pre-filter executed", "stage=inner"),
            ("post-filter executed", "stage=inner"),
            ("post-filter executed", "stage=outer"),
        ];
        let exchange = format!("exchange={}", ex.id());
        for (line, (message, stage)) in lines.iter().zip(expected) {
            assert!(line.contains(" INFO "), "{line}");
            assert!(line.contains(message), "{line}");
            assert!(line.contains(stage), "{line}");
            assert!(line.contains(&exchange), "{line}");
        }
        assert!(lines[2].contains("outcome=Success"), "{}", lines[2]);
        assert!(lines[3].contains("outcome=Success"), "{}", lines[3]);
    }
}
