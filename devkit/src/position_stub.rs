/*!
Mock de positionnement appareil
*/

use futures::future::BoxFuture;
use futures::FutureExt;
use hazardlite_core::{GeoPoint, PositionError, PositionProvider};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Script {
    At(f64, f64),
    Denied,
    TimedOut,
    Unsupported,
}

pub struct MockPositioning {
    script: Script,
    calls: AtomicUsize,
}

impl MockPositioning {
    fn scripted(script: Script) -> Self {
        Self { script, calls: AtomicUsize::new(0) }
    }

    pub fn at(lat: f64, lon: f64) -> Self {
        Self::scripted(Script::At(lat, lon))
    }

    pub fn denied() -> Self {
        Self::scripted(Script::Denied)
    }

    pub fn timed_out() -> Self {
        Self::scripted(Script::TimedOut)
    }

    /// Plateforme sans capacité de positionnement
    pub fn unsupported() -> Self {
        Self::scripted(Script::Unsupported)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PositionProvider for MockPositioning {
    fn is_supported(&self) -> bool {
        !matches!(self.script, Script::Unsupported)
    }

    fn current_position(&self) -> BoxFuture<'_, Result<GeoPoint, PositionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.clone();
        async move {
            match script {
                Script::At(lat, lon) => {
                    GeoPoint::new(lat, lon).map_err(|e| PositionError::Unavailable(e.to_string()))
                }
                Script::Denied => Err(PositionError::PermissionDenied),
                Script::TimedOut => Err(PositionError::Timeout),
                Script::Unsupported => Err(PositionError::Unavailable("no positioning hardware".into())),
            }
        }
        .boxed()
    }
}
